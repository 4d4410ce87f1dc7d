use rand::SeedableRng;
use rand_pcg::Pcg32;
use crate::format::it::{CellMemory, ItData, PatternReader, ORD_END, ORD_SKIP};
use crate::mixer::Mixer;
use crate::module::{Event, ModuleData};
use crate::player::{ChannelStatus, FormatPlayer, Options, PlayerData};
use crate::MAX_CHANNELS;
use super::host::Host;
use super::slave::Slave;
use super::{pitch, volume};
use super::volume::{PanInput, PAN_SURROUND};

/// Impulse Tracker replayer
///
/// Pattern channels (hosts) hold effect state and drive voices (slaves)
/// from a fixed pool. In instrument mode a host may leave several voices
/// playing through new note actions; in sample mode each host owns one
/// voice. Slots from `ECHO_BASE` up hold copies of cut voices that fade
/// out during one tick to avoid clicks.

pub const MAX_SLAVES: usize = 256;
pub const ECHO_BASE : usize = 192;

const RANDOM_SEED: u64 = 0x17_2e5a;
const MAX_ROW_REPEAT: u8 = 255;

pub struct ItPlayer {
    pub(super) hosts       : Vec<Host>,
    pub(super) slaves      : Vec<Slave>,
    pub(super) voices      : usize,
    pub(super) rng         : Pcg32,
    memory                 : [CellMemory; MAX_CHANNELS],
    reader                 : PatternReader,
    max_repeat             : usize,
    pub(super) channels    : usize,

    pub(super) instrument_mode: bool,
    pub(super) linear      : bool,
    pub(super) old_effects : bool,
    pub(super) link_gxx    : bool,
    stereo                 : bool,
    separation             : u8,
    mix_vol                : u8,

    pub(super) speed       : u8,
    pub(super) tempo       : u8,
    pub(super) gv          : u8,
    pub(super) tick        : usize,
    pub(super) frame       : usize,
    pub(super) row_delay   : u8,
    pub(super) row_delay_on: bool,

    pub(super) pos         : Option<usize>,
    pub(super) row         : usize,
    pattern                : usize,
    rows                   : usize,
    pub(super) jump_order  : Option<usize>,
    pub(super) break_row   : Option<usize>,
    pub(super) loop_jump   : Option<usize>,
    order_repeat           : Vec<usize>,
    row_repeat             : Vec<u8>,
    end                    : bool,

    initial_speed          : u8,
    initial_tempo          : u8,
    initial_gv             : u8,
    chn_pan                : [u8; MAX_CHANNELS],
    chn_vol                : [u8; MAX_CHANNELS],
}

impl ItPlayer {
    pub fn new(module: &ItData, options: Options) -> Self {
        let voices = if module.instrument_mode() {
            options.voices.max(1).min(ECHO_BASE)
        } else {
            MAX_CHANNELS
        };

        let mut player = ItPlayer {
            hosts          : Vec::new(),
            slaves         : vec![Slave::new(); MAX_SLAVES],
            voices,
            rng            : Pcg32::seed_from_u64(RANDOM_SEED),
            memory         : [CellMemory::default(); MAX_CHANNELS],
            reader         : PatternReader::new(),
            max_repeat     : options.max_repeat.max(1),
            channels       : module.channels.max(1).min(MAX_CHANNELS),
            instrument_mode: module.instrument_mode(),
            linear         : module.linear_slides(),
            old_effects    : module.old_effects(),
            link_gxx       : module.link_gxx(),
            stereo         : module.stereo(),
            separation     : module.separation.min(128),
            mix_vol        : module.mix_vol.min(128),
            speed          : 0,
            tempo          : 0,
            gv             : 0,
            tick           : 0,
            frame          : 0,
            row_delay      : 0,
            row_delay_on   : false,
            pos            : None,
            row            : 0,
            pattern        : 0,
            rows           : 0,
            jump_order     : None,
            break_row      : None,
            loop_jump      : None,
            order_repeat   : vec![0; module.orders.len()],
            row_repeat     : Vec::new(),
            end            : false,
            initial_speed  : if module.speed == 0 { 6 } else { module.speed },
            initial_tempo  : module.tempo.max(32),
            initial_gv     : module.global_vol.min(128),
            chn_pan        : module.chn_pan,
            chn_vol        : module.chn_vol,
        };
        player.restart();
        player
    }

    fn restart(&mut self) {
        self.hosts = (0..MAX_CHANNELS).map(|i| Host::new(self.chn_pan[i], self.chn_vol[i])).collect();
        for s in &mut self.slaves {
            *s = Slave::new();
        }
        self.memory = [CellMemory::default(); MAX_CHANNELS];
        self.reader = PatternReader::new();
        self.rng = Pcg32::seed_from_u64(RANDOM_SEED);
        self.speed = self.initial_speed;
        self.tempo = self.initial_tempo;
        self.gv = self.initial_gv;
        self.tick = 1;
        self.frame = 0;
        self.row_delay = 1;
        self.row_delay_on = false;
        self.pos = None;
        self.row = 0;
        self.pattern = 0;
        self.rows = 0;
        self.jump_order = None;
        self.break_row = None;
        self.loop_jump = None;
        for x in &mut self.order_repeat {
            *x = 0;
        }
        self.row_repeat.clear();
        self.end = false;
    }

    /// Slave linked to a host, if it is still playing.
    pub(super) fn live_slave(&self, h: usize) -> Option<usize> {
        let s = self.hosts[h].slave?;
        let slave = &self.slaves[s];
        if slave.on && !slave.disowned && slave.host == h {
            Some(s)
        } else {
            None
        }
    }

    /// Run one tick. Returns false once the song has ended.
    pub fn advance_tick(&mut self, module: &ItData) -> bool {
        if self.end {
            return false
        }

        self.release_voices();

        self.tick -= 1;
        if self.tick > 0 {
            self.frame += 1;
            for h in 0..self.channels {
                self.tick_host(module, h);
            }
        } else {
            self.tick = self.speed as usize;
            self.frame = 0;
            self.row_delay -= 1;
            if self.row_delay > 0 {
                // row delay: replay the commands only
                for h in 0..self.channels {
                    let e = self.hosts[h].cell;
                    if e.mask != 0 {
                        self.init_host(module, h, e, true);
                    }
                }
            } else {
                self.row_delay = 1;
                self.row_delay_on = false;
                if !self.next_row(module) {
                    debug!("end of song at {:?}/{}", self.pos, self.row);
                    self.end = true;
                    return false
                }
                self.process_row(module);
            }
        }

        self.update_slaves(module);
        true
    }

    // Stop voices that ended in the mixer and echo copies already played.
    fn release_voices(&mut self) {
        for i in 0..MAX_SLAVES {
            let s = &mut self.slaves[i];
            if !s.on {
                continue
            }
            if s.echo || s.voice.ended {
                s.on = false;
                let h = s.host;
                if !s.echo && self.hosts[h].slave == Some(i) {
                    self.hosts[h].slave = None;
                }
            }
        }
    }

    // Select the next row and order. Returns false at the end of the song.
    fn next_row(&mut self, module: &ItData) -> bool {
        let cur = self.pos.unwrap_or(0);

        let (order, row) = if let Some(row) = self.loop_jump.take() {
            self.jump_order = None;
            self.break_row = None;
            self.seek(module, row);
            return self.enter_row(row)
        } else if self.jump_order.is_some() || self.break_row.is_some() {
            let order = self.jump_order.take().unwrap_or(cur + 1);
            let row = self.break_row.take().unwrap_or(0);
            (order, row)
        } else {
            match self.pos {
                None => (0, 0),
                Some(pos) => {
                    if self.row + 1 < self.rows {
                        let row = self.row + 1;
                        return self.enter_row(row)
                    }
                    (pos + 1, 0)
                }
            }
        };

        self.enter_order(module, order, row)
    }

    fn enter_order(&mut self, module: &ItData, order: usize, row: usize) -> bool {
        let mut order = order;
        let pattern = loop {
            match module.orders.get(order) {
                None | Some(&ORD_END) => return false,
                Some(&ORD_SKIP) => order += 1,
                Some(&p) => break p as usize,
            }
        };

        if self.order_repeat[order] >= self.max_repeat {
            debug!("order {} already played {} times", order, self.order_repeat[order]);
            return false
        }
        self.order_repeat[order] += 1;

        self.pos = Some(order);
        self.pattern = pattern;
        self.rows = module.pattern_rows(pattern);
        self.row_repeat = vec![0; self.rows];
        for host in &mut self.hosts {
            host.reset_loop();
        }

        let row = if row < self.rows { row } else { 0 };
        self.seek(module, row);
        self.enter_row(row)
    }

    fn enter_row(&mut self, row: usize) -> bool {
        self.row = row;
        match self.row_repeat.get_mut(row) {
            Some(count) => {
                if *count >= MAX_ROW_REPEAT {
                    debug!("row {} repeated too many times", row);
                    return false
                }
                *count += 1;
                true
            }
            None => false,
        }
    }

    // Position the pattern decoder at the start of a row, decoding the
    // rows before it with fresh memory.
    fn seek(&mut self, module: &ItData, row: usize) {
        self.memory = [CellMemory::default(); MAX_CHANNELS];
        self.reader = PatternReader::new();
        for _ in 0..row {
            self.read_cells(module);
        }
    }

    fn read_cells(&mut self, module: &ItData) -> [Event; MAX_CHANNELS] {
        let mut cells = [Event::new(); MAX_CHANNELS];
        let data: &[u8] = match module.pattern(self.pattern) {
            Some(p) => &p.data,
            None    => &[],
        };
        if let Err(e) = self.reader.read_row(data, &mut self.memory, |chn, ev| cells[chn] = ev) {
            warn!("pattern {} row {}: {}", self.pattern, self.row, e);
            self.reader.ofs = data.len();
        }
        cells
    }

    fn process_row(&mut self, module: &ItData) {
        let cells = self.read_cells(module);
        for h in 0..self.channels {
            let e = cells[h];
            let host = &mut self.hosts[h];
            host.clear_tick_effects();
            host.cell = e;
            if e.mask != 0 {
                self.init_host(module, h, e, false);
            }
        }
    }

    // Compute the final pitch, volume and pan of every playing voice.
    fn update_slaves(&mut self, module: &ItData) {
        for i in 0..MAX_SLAVES {
            if !self.slaves[i].on || self.slaves[i].echo {
                continue
            }

            let h = self.slaves[i].host;
            if !self.slaves[i].disowned {
                let host = &self.hosts[h];
                let s = &mut self.slaves[i];
                s.vol = host.vol;
                s.chn_vol = host.chn_vol;
                s.pan = if host.surround { PAN_SURROUND } else { host.pan };
            }

            self.update_slave(module, i);
        }

        for i in 0..MAX_SLAVES {
            self.slaves[i].clear_modulation();
        }
    }

    fn update_slave(&mut self, module: &ItData, i: usize) {
        let linear = self.linear;
        let gv = self.gv as i32;
        let stereo = self.stereo;
        let separation = self.separation;
        let s = &mut self.slaves[i];

        let smp = match module.samples.get(s.smp) {
            Some(smp) => smp,
            None => {
                s.on = false;
                return
            }
        };
        let ins = s.ins.and_then(|x| module.instruments.get(x));

        let mut env_vol = 64;
        let mut env_pan = None;
        let mut env_pitch = 0;

        if let Some(ins) = ins {
            if s.vol_env_on {
                env_vol = s.vol_env.value().max(0).min(64);
                if !s.vol_env.advance(&ins.vol_env, s.note_off) {
                    if s.vol_env.value() <= 0 {
                        s.on = false;
                        return
                    }
                    s.start_fade();
                }
            }
            if s.pan_env_on {
                env_pan = Some(s.pan_env.value().max(-32).min(32));
                s.pan_env.advance(&ins.pan_env, s.note_off);
            }
            if s.pitch_env_on {
                let value = s.pitch_env.value().max(-32).min(32);
                if ins.pitch_env.is_filter() {
                    s.filter_mod = 256 + value * 8;
                } else {
                    env_pitch = value * 32;
                }
                s.pitch_env.advance(&ins.pitch_env, s.note_off);
            }
        }

        if s.fading {
            s.fade = s.fade.saturating_sub(s.fadeout);
            if s.fade == 0 {
                s.on = false;
                return
            }
        }

        // sample auto-vibrato
        let mut autovib = 0;
        if smp.vib_depth != 0 && smp.vib_speed != 0 {
            let depth = (smp.vib_depth as u32) << 8;
            s.autovib_amt = (s.autovib_amt + smp.vib_rate as u32).min(depth);
            s.autovib_pos = s.autovib_pos.wrapping_add(smp.vib_speed);
            autovib = pitch::waveform(smp.vib_wave, s.autovib_pos) * (s.autovib_amt >> 8) as i32 >> 6;
        }

        let freq = pitch::apply_delta(s.freq, s.vib_delta + autovib, linear);
        s.final_freq = pitch::linear_scale(freq, env_pitch + s.arp_delta);

        let vol = if s.tremor_mute { 0 } else { (s.vol as i32 + s.trem_delta).max(0).min(64) };
        s.final_vol = volume::final_volume(vol, s.chn_vol as i32, s.fade as i32, s.sample_gv as i32, env_vol, gv);

        s.final_pan = if !stereo {
            32
        } else {
            volume::final_pan(&PanInput {
                pan      : s.pan,
                panbrello: s.panb_delta,
                note     : s.note,
                ppc      : ins.map(|x| x.ppc).unwrap_or(60),
                pps      : ins.map(|x| x.pps).unwrap_or(0),
                env      : env_pan,
                sep      : separation,
            })
        };
    }

    pub(super) fn mix_voices(&mut self, module: &ItData, mixer: &mut Mixer) {
        let mix_vol = self.mix_vol as i32;
        for s in self.slaves.iter_mut().filter(|s| s.on) {
            let smp = match module.samples.get(s.smp) {
                Some(smp) => smp,
                None      => continue,
            };
            s.voice.set_frequency(s.final_freq, mixer.rate);
            let surround = s.final_pan == PAN_SURROUND;
            s.voice.set_gains(s.final_vol, s.final_pan, surround, mix_vol);
            s.voice.filter.setup(s.cutoff, s.resonance, s.filter_mod, mixer.rate);
            mixer.mix_voice(&mut s.voice, smp);
        }
    }

    pub(super) fn status(&self, module: &ItData, chn: usize) -> Option<ChannelStatus> {
        if chn >= self.channels {
            return None
        }
        let host = &self.hosts[chn];
        let slave = self.live_slave(chn).map(|s| &self.slaves[s]);

        let instrument_name = if self.instrument_mode {
            (host.ins as usize).checked_sub(1).and_then(|i| module.instruments.get(i)).map(|x| x.name.to_owned())
        } else {
            (host.ins as usize).checked_sub(1).and_then(|i| module.samples.get(i)).map(|x| x.name.to_owned())
        };

        Some(ChannelStatus {
            active         : slave.is_some(),
            note           : host.note,
            instrument     : host.ins as usize,
            instrument_name: instrument_name.unwrap_or_default(),
            volume         : slave.map(|s| (s.final_vol >> 9) as u8).unwrap_or(0),
            pan            : slave.map(|s| s.final_pan).unwrap_or(if host.surround { PAN_SURROUND } else { host.pan }),
            cell_text      : host.cell.to_string(),
        })
    }
}


// The module data arrives as a trait object, recover the IT data
fn it_data(module: &dyn ModuleData) -> Option<&ItData> {
    module.as_any().downcast_ref::<ItData>()
}

impl FormatPlayer for ItPlayer {
    fn start(&mut self, data: &mut PlayerData, module: &dyn ModuleData) {
        if let Some(m) = it_data(module) {
            data.set_initial(m.speed.max(1) as usize, m.tempo.max(32) as usize, m.global_vol as usize);
        }
        self.restart();
    }

    fn play(&mut self, data: &mut PlayerData, module: &dyn ModuleData) -> bool {
        let m = match it_data(module) {
            Some(m) => m,
            None    => return false,
        };

        let playing = self.advance_tick(m);
        data.pos = self.pos.unwrap_or(0);
        data.row = self.row;
        data.frame = self.frame;
        data.speed = self.speed as usize;
        data.tempo = self.tempo as usize;
        data.gvol = self.gv as usize;
        playing
    }

    fn mix(&mut self, module: &dyn ModuleData, mixer: &mut Mixer) {
        if let Some(m) = it_data(module) {
            self.mix_voices(m, mixer);
        }
    }

    fn channel_status(&self, module: &dyn ModuleData, chn: usize) -> Option<ChannelStatus> {
        self.status(it_data(module)?, chn)
    }

    fn channel_count(&self) -> usize {
        self.channels
    }

    fn reset(&mut self) {
        self.restart();
    }
}
