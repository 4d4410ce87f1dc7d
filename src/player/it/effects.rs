use rand::Rng;
use crate::format::it::ItData;
use crate::format::it::midi::{self, MacroAction, MacroContext};
use crate::mixer::filter::FILTER_MOD_NEUTRAL;
use crate::module::Event;
use crate::module::instrument::NewNoteAction;
use crate::module::sample::Waveform;
use super::pitch;
use super::player::ItPlayer;
use super::tables::{retrig_volume, VOLCOL_PORTA};
use super::volume::PAN_SURROUND;

pub const NOTE_OFF: u8 = 255;
pub const NOTE_CUT: u8 = 254;
pub const MAX_NOTE: u8 = 119;

/// Pattern effects, Axx to Zxx.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetSpeed,
    PositionJump,
    PatternBreak,
    VolumeSlide,
    PortaDown,
    PortaUp,
    TonePorta,
    Vibrato,
    Tremor,
    Arpeggio,
    VolSlideVibrato,
    VolSlideTonePorta,
    SetChannelVolume,
    ChannelVolumeSlide,
    SampleOffset,
    PanSlide,
    Retrig,
    Tremolo,
    Special,
    Tempo,
    FineVibrato,
    SetGlobalVolume,
    GlobalVolumeSlide,
    SetPan,
    Panbrello,
    MidiMacro,
}

impl Command {
    pub fn from_u8(fxt: u8) -> Option<Self> {
        Some(match fxt {
            1  => Command::SetSpeed,
            2  => Command::PositionJump,
            3  => Command::PatternBreak,
            4  => Command::VolumeSlide,
            5  => Command::PortaDown,
            6  => Command::PortaUp,
            7  => Command::TonePorta,
            8  => Command::Vibrato,
            9  => Command::Tremor,
            10 => Command::Arpeggio,
            11 => Command::VolSlideVibrato,
            12 => Command::VolSlideTonePorta,
            13 => Command::SetChannelVolume,
            14 => Command::ChannelVolumeSlide,
            15 => Command::SampleOffset,
            16 => Command::PanSlide,
            17 => Command::Retrig,
            18 => Command::Tremolo,
            19 => Command::Special,
            20 => Command::Tempo,
            21 => Command::FineVibrato,
            22 => Command::SetGlobalVolume,
            23 => Command::GlobalVolumeSlide,
            24 => Command::SetPan,
            25 => Command::Panbrello,
            26 => Command::MidiMacro,
            _  => return None,
        })
    }

    fn of(e: &Event) -> Option<Self> {
        if e.has_cmd() { Command::from_u8(e.fxt) } else { None }
    }
}

/// Volume column effects. Set volume and set pan are handled with the
/// note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeEffect {
    FineVolumeUp,
    FineVolumeDown,
    VolumeSlideUp,
    VolumeSlideDown,
    PortaDown,
    PortaUp,
    TonePorta,
    Vibrato,
}

impl VolumeEffect {
    pub fn decode(vol: u8) -> Option<(Self, u8)> {
        Some(match vol {
            65..=74   => (VolumeEffect::FineVolumeUp, vol - 65),
            75..=84   => (VolumeEffect::FineVolumeDown, vol - 75),
            85..=94   => (VolumeEffect::VolumeSlideUp, vol - 85),
            95..=104  => (VolumeEffect::VolumeSlideDown, vol - 95),
            105..=114 => (VolumeEffect::PortaDown, vol - 105),
            115..=124 => (VolumeEffect::PortaUp, vol - 115),
            193..=202 => (VolumeEffect::TonePorta, vol - 193),
            203..=212 => (VolumeEffect::Vibrato, vol - 203),
            _ => return None,
        })
    }

    fn of(e: &Event) -> Option<(Self, u8)> {
        if e.has_vol() { VolumeEffect::decode(e.vol) } else { None }
    }
}

/// Dxy style slide parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slide {
    Up(u8),
    Down(u8),
    FineUp(u8),
    FineDown(u8),
    Invalid,
}

impl Slide {
    pub fn decode(p: u8) -> Self {
        let (x, y) = (p >> 4, p & 0x0f);
        if y == 0 {
            Slide::Up(x)
        } else if x == 0 {
            Slide::Down(y)
        } else if y == 0x0f {
            Slide::FineUp(x)
        } else if x == 0x0f {
            Slide::FineDown(y)
        } else {
            Slide::Invalid
        }
    }

    /// Apply to a value. Fine slides happen on the first tick of the row,
    /// normal slides on the others.
    pub fn apply(self, val: u8, first_tick: bool, max: u8) -> u8 {
        let v = val as i32;
        let v = match (self, first_tick) {
            (Slide::Up(x), false)      |
            (Slide::FineUp(x), true)   => v + x as i32,
            (Slide::Down(x), false)    |
            (Slide::FineDown(x), true) => v - x as i32,
            _ => v,
        };
        v.max(0).min(max as i32) as u8
    }

    fn reverse(self) -> Self {
        match self {
            Slide::Up(x)       => Slide::Down(x),
            Slide::Down(x)     => Slide::Up(x),
            Slide::FineUp(x)   => Slide::FineDown(x),
            Slide::FineDown(x) => Slide::FineUp(x),
            Slide::Invalid     => Slide::Invalid,
        }
    }
}

// Effect memory: a zero parameter reuses the last non-zero value.
fn recall(mem: &mut u8, p: u8) -> u8 {
    if p != 0 {
        *mem = p;
    }
    *mem
}


impl ItPlayer {
    fn porta_memory(&mut self, h: usize) -> &mut u8 {
        let host = &mut self.hosts[h];
        if self.link_gxx { &mut host.mem_e } else { &mut host.mem_g }
    }

    /// Process a cell at the start of a row. `repeat` is set when a row
    /// delay plays the row again, only the command runs then.
    pub(super) fn init_host(&mut self, module: &ItData, h: usize, e: Event, repeat: bool) {
        if repeat {
            self.init_command(module, h, &e, true);
            return
        }

        if Command::of(&e) == Some(Command::Special) {
            let p = recall(&mut self.hosts[h].mem_s, e.fxp);
            if p >> 4 == 0x0d && p & 0x0f != 0 {
                let host = &mut self.hosts[h];
                host.delay_tick = Some(p & 0x0f);
                host.delayed = e;
                return
            }
        }

        self.init_cell(module, h, &e);
    }

    fn init_cell(&mut self, module: &ItData, h: usize, e: &Event) {
        let vfx = VolumeEffect::of(e);
        let porta = matches!(Command::of(e), Some(Command::TonePorta) | Some(Command::VolSlideTonePorta))
            || matches!(vfx, Some((VolumeEffect::TonePorta, _)));

        self.init_no_command(module, h, e, porta);
        if let Some((fx, x)) = vfx {
            self.init_volume_column(h, fx, x);
        }

        let note = e.has_note() && e.note <= MAX_NOTE;
        let vol_porta_or_vib = matches!(vfx, Some((VolumeEffect::TonePorta, _)) | Some((VolumeEffect::Vibrato, _)));
        if !(note && vol_porta_or_vib) {
            self.init_command(module, h, e, false);
        }
    }

    // Note, instrument and volume handling common to every cell.
    fn init_no_command(&mut self, module: &ItData, h: usize, e: &Event, porta: bool) {
        let ins_set = e.has_ins() && e.ins != 0 && self.valid_instrument(module, e.ins);
        if ins_set {
            self.hosts[h].ins = e.ins;
        }

        if e.has_note() {
            match e.note {
                NOTE_OFF => {
                    if let Some(s) = self.live_slave(h) {
                        self.note_off_slave(module, s);
                    }
                }
                NOTE_CUT => {
                    if let Some(s) = self.live_slave(h) {
                        self.echo(h, s);
                    }
                }
                0..=MAX_NOTE => {
                    if porta && self.live_slave(h).is_some() {
                        self.set_porta_target(module, h, e.note);
                        if ins_set {
                            self.reset_volume(module, h);
                        }
                    } else {
                        self.start_note(module, h, e.note, e);
                    }
                }
                _ => {
                    if let Some(s) = self.live_slave(h) {
                        self.slaves[s].start_fade();
                    }
                }
            }
        } else if ins_set {
            self.reset_volume(module, h);
        }

        if e.has_vol() {
            let host = &mut self.hosts[h];
            match e.vol {
                0..=64    => host.vol = e.vol,
                128..=192 => {
                    host.pan = e.vol - 128;
                    host.surround = false;
                }
                _ => (),
            }
        }
    }

    fn valid_instrument(&self, module: &ItData, ins: u8) -> bool {
        if self.instrument_mode {
            ins as usize <= module.instruments.len()
        } else {
            ins as usize <= module.samples.len()
        }
    }

    // Sample and keyboard note for a pattern note on the host's instrument.
    fn map_note(&self, module: &ItData, h: usize, note: u8) -> Option<(Option<usize>, usize, u8)> {
        let ins = (self.hosts[h].ins as usize).checked_sub(1)?;
        let (ins, smp, note) = if self.instrument_mode {
            let (smp, key) = module.instruments.get(ins)?.map_note(note)?;
            (Some(ins), smp - 1, key)
        } else {
            (None, ins, note)
        };
        if module.samples.get(smp)?.is_empty() {
            return None
        }
        Some((ins, smp, note))
    }

    // Instrument without a note: back to the sample's default volume.
    fn reset_volume(&mut self, module: &ItData, h: usize) {
        let smp = match self.live_slave(h) {
            Some(s) => Some(self.slaves[s].smp),
            None    => self.map_note(module, h, self.hosts[h].note).map(|x| x.1),
        };
        if let Some(smp) = smp.and_then(|x| module.samples.get(x)) {
            self.hosts[h].vol = smp.volume.min(64);
        }
    }

    fn set_porta_target(&mut self, module: &ItData, h: usize, note: u8) {
        let s = match self.live_slave(h) {
            Some(s) => s,
            None    => return,
        };
        let (smp, key) = match self.map_note(module, h, note) {
            Some((_, smp, key)) => (smp, key),
            None => (self.slaves[s].smp, note),
        };
        let rate = module.samples.get(smp).map(|x| x.rate).unwrap_or(0);

        let host = &mut self.hosts[h];
        host.porta_target = pitch::note_frequency(key, rate);
        host.note = note;
        let slave = &mut self.slaves[s];
        slave.note = key;
        slave.pattern_note = note;
    }

    /// Trigger a note on a new voice.
    fn start_note(&mut self, module: &ItData, h: usize, note: u8, e: &Event) {
        let (ins_idx, smp_idx, key) = match self.map_note(module, h, note) {
            Some(v) => v,
            None => {
                trace!("host {}: nothing to play for note {}", h, note);
                return
            }
        };
        let slot = match self.alloc(module, h, ins_idx, smp_idx, note) {
            Some(s) => s,
            None    => return,
        };

        let smp = &module.samples[smp_idx];
        let ins = ins_idx.and_then(|x| module.instruments.get(x));

        let host = &mut self.hosts[h];
        host.note = note;
        host.smp = smp_idx + 1;
        // only an instrument number reloads the default volume
        if e.has_vol() && e.vol <= 64 {
            host.vol = e.vol;
        } else if e.has_ins() && e.ins != 0 {
            host.vol = smp.volume.min(64);
        }
        if let Some(pan) = ins.and_then(|x| x.pan).or(smp.pan) {
            host.pan = pan.min(64);
            host.surround = false;
        }

        let s = &mut self.slaves[slot];
        s.ins = ins_idx;
        s.smp = smp_idx;
        s.note = key;
        s.pattern_note = note;
        s.freq = pitch::note_frequency(key, smp.rate);
        s.final_freq = s.freq;
        host.porta_target = s.freq;
        s.fade = 1024;
        s.filter_mod = FILTER_MOD_NEUTRAL;

        match ins {
            Some(ins) => {
                let mut sgv = smp.global_vol as i32 * ins.global_vol as i32 / 64;
                if ins.rand_vol > 0 {
                    let r = ins.rand_vol.min(100) as i32;
                    sgv += sgv * self.rng.random_range(-r..=r) / 100;
                }
                s.sample_gv = sgv.max(0).min(128) as u8;

                if ins.rand_pan > 0 && !host.surround {
                    let r = ins.rand_pan.min(64) as i32;
                    host.pan = (host.pan as i32 + self.rng.random_range(-r..=r)).max(0).min(64) as u8;
                }

                s.nna = ins.nna;
                s.fadeout = ins.fadeout;
                s.vol_env_on = ins.vol_env.enabled();
                s.pan_env_on = ins.pan_env.enabled();
                s.pitch_env_on = ins.pitch_env.enabled();
                s.vol_env.start(&ins.vol_env, false);
                s.pan_env.start(&ins.pan_env, false);
                s.pitch_env.start(&ins.pitch_env, false);
                s.cutoff = ins.cutoff.unwrap_or(host.cutoff);
                s.resonance = ins.resonance.unwrap_or(host.resonance);
            }
            None => {
                s.sample_gv = (smp.global_vol as u32 * 2).min(128) as u8;
                s.nna = NewNoteAction::Cut;
                s.cutoff = host.cutoff;
                s.resonance = host.resonance;
            }
        }

        s.vol = host.vol;
        s.chn_vol = host.chn_vol;
        s.pan = if host.surround { PAN_SURROUND } else { host.pan };
        s.voice.start(0);
    }

    fn init_volume_column(&mut self, h: usize, fx: VolumeEffect, x: u8) {
        match fx {
            VolumeEffect::FineVolumeUp | VolumeEffect::FineVolumeDown => {
                let host = &mut self.hosts[h];
                let x = recall(&mut host.mem_vol_ab, x);
                let slide = if fx == VolumeEffect::FineVolumeUp { Slide::FineUp(x) } else { Slide::FineDown(x) };
                host.vol = slide.apply(host.vol, true, 64);
            }
            VolumeEffect::VolumeSlideUp | VolumeEffect::VolumeSlideDown => {
                recall(&mut self.hosts[h].mem_vol_cd, x);
            }
            VolumeEffect::PortaDown | VolumeEffect::PortaUp => {
                if x != 0 {
                    self.hosts[h].mem_e = x * 4;
                }
            }
            VolumeEffect::TonePorta => {
                let speed = VOLCOL_PORTA[x as usize % VOLCOL_PORTA.len()];
                let speed = recall(self.porta_memory(h), speed);
                let host = &mut self.hosts[h];
                host.porta_speed = speed as u32 * 4;
                host.porta_on = true;
            }
            VolumeEffect::Vibrato => {
                let host = &mut self.hosts[h];
                if x != 0 {
                    host.vibrato.depth = x;
                }
                host.fine_vibrato = false;
                if !self.old_effects {
                    self.vibrato(h);
                }
            }
        }
        self.hosts[h].vol_fx = Some(fx);
    }

    // Trigger part of the pattern command. Commands that act on later
    // ticks stay armed in the host.
    fn init_command(&mut self, module: &ItData, h: usize, e: &Event, repeat: bool) {
        let cmd = match Command::of(e) {
            Some(c) => c,
            None    => return,
        };
        let p = e.fxp;
        let new_note = e.has_note() && e.note <= MAX_NOTE;
        self.hosts[h].cmd = Some(cmd);

        match cmd {
            Command::SetSpeed => {
                if !repeat && p > 0 {
                    self.speed = p;
                    self.tick = p as usize;
                }
            }
            Command::PositionJump => {
                if !repeat {
                    self.jump_order = Some(p as usize);
                }
            }
            Command::PatternBreak => {
                if !repeat {
                    self.break_row = Some(p as usize);
                }
            }
            Command::VolumeSlide => {
                recall(&mut self.hosts[h].mem_d, p);
                self.volume_slide(h, true);
            }
            Command::PortaDown | Command::PortaUp => {
                let p = recall(&mut self.hosts[h].mem_e, p);
                let delta = match p {
                    0xf0..=0xff => (p & 0x0f) as u32 * 4,
                    0xe0..=0xef => (p & 0x0f) as u32,
                    _ => 0,
                };
                if delta > 0 {
                    self.slide_pitch(h, delta, cmd == Command::PortaUp);
                }
            }
            Command::TonePorta => {
                let speed = recall(self.porta_memory(h), p);
                let host = &mut self.hosts[h];
                host.porta_speed = speed as u32 * 4;
                host.porta_on = true;
            }
            Command::Vibrato | Command::FineVibrato => {
                let host = &mut self.hosts[h];
                if p >> 4 != 0 {
                    host.vibrato.speed = p >> 4;
                }
                if p & 0x0f != 0 {
                    host.vibrato.depth = p & 0x0f;
                }
                host.fine_vibrato = cmd == Command::FineVibrato;
                if !self.old_effects {
                    self.vibrato(h);
                }
            }
            Command::Tremor => {
                recall(&mut self.hosts[h].mem_i, p);
                self.tremor(h);
            }
            Command::Arpeggio => {
                let host = &mut self.hosts[h];
                recall(&mut host.mem_j, p);
                host.arp_tick = 0;
            }
            Command::VolSlideVibrato => {
                recall(&mut self.hosts[h].mem_d, p);
                self.volume_slide(h, true);
                if !self.old_effects {
                    self.vibrato(h);
                }
            }
            Command::VolSlideTonePorta => {
                recall(&mut self.hosts[h].mem_d, p);
                self.volume_slide(h, true);
                let speed = *self.porta_memory(h);
                let host = &mut self.hosts[h];
                host.porta_speed = speed as u32 * 4;
                host.porta_on = true;
            }
            Command::SetChannelVolume => {
                if p <= 64 {
                    self.hosts[h].chn_vol = p;
                }
            }
            Command::ChannelVolumeSlide => {
                let host = &mut self.hosts[h];
                let p = recall(&mut host.mem_n, p);
                host.chn_vol = Slide::decode(p).apply(host.chn_vol, true, 64);
            }
            Command::SampleOffset => {
                let p = recall(&mut self.hosts[h].mem_o, p);
                if !repeat && new_note {
                    self.sample_offset(module, h, p);
                }
            }
            Command::PanSlide => {
                let host = &mut self.hosts[h];
                let p = recall(&mut host.mem_p, p);
                host.pan = Slide::decode(p).reverse().apply(host.pan, true, 64);
            }
            Command::Retrig => {
                let host = &mut self.hosts[h];
                recall(&mut host.mem_q, p);
                if new_note {
                    host.retrig_count = 0;
                }
            }
            Command::Tremolo => {
                let host = &mut self.hosts[h];
                if p >> 4 != 0 {
                    host.tremolo.speed = p >> 4;
                }
                if p & 0x0f != 0 {
                    host.tremolo.depth = p & 0x0f;
                }
            }
            Command::Special => self.init_special(module, h, p, repeat),
            Command::Tempo => {
                let p = recall(&mut self.hosts[h].mem_t, p);
                if p >= 0x20 {
                    self.tempo = p;
                }
            }
            Command::SetGlobalVolume => {
                if p <= 0x80 {
                    self.gv = p;
                }
            }
            Command::GlobalVolumeSlide => {
                let p = recall(&mut self.hosts[h].mem_w, p);
                self.gv = Slide::decode(p).apply(self.gv, true, 128);
            }
            Command::SetPan => {
                let host = &mut self.hosts[h];
                host.pan = ((p as u16 + 2) >> 2).min(64) as u8;
                host.surround = false;
            }
            Command::Panbrello => {
                let host = &mut self.hosts[h];
                if p >> 4 != 0 {
                    host.panbrello.speed = p >> 4;
                }
                if p & 0x0f != 0 {
                    host.panbrello.depth = p & 0x0f;
                }
            }
            Command::MidiMacro => self.midi_macro(module, h, p),
        }
    }

    fn init_special(&mut self, module: &ItData, h: usize, p: u8, repeat: bool) {
        let p = recall(&mut self.hosts[h].mem_s, p);
        let (x, y) = (p >> 4, p & 0x0f);
        let host = &mut self.hosts[h];

        match x {
            0x3 => host.vibrato.wave = Waveform::from_u8(y),
            0x4 => host.tremolo.wave = Waveform::from_u8(y),
            0x5 => host.panbrello.wave = Waveform::from_u8(y),
            0x6 => {
                if !repeat {
                    self.tick += y as usize;
                }
            }
            0x7 => self.instrument_control(module, h, y),
            0x8 => {
                host.pan = (y as u16 * 64 / 15) as u8;
                host.surround = false;
            }
            0x9 => match y {
                0 => host.surround = false,
                1 => host.surround = true,
                _ => (),
            },
            0xa => host.high_offset = y,
            0xb => {
                if !repeat {
                    self.pattern_loop(h, y);
                }
            }
            0xc => host.cut_tick = Some(y.max(1)),
            0xe => {
                if !repeat && !self.row_delay_on {
                    self.row_delay = y + 1;
                    self.row_delay_on = true;
                }
            }
            0xf => host.sfx = y as usize,
            _ => (),
        }
    }

    fn pattern_loop(&mut self, h: usize, y: u8) {
        let row = self.row;
        let host = &mut self.hosts[h];
        if y == 0 {
            host.loop_row = row;
        } else if host.loop_count == 0 {
            host.loop_count = y;
            self.loop_jump = Some(host.loop_row);
        } else {
            host.loop_count -= 1;
            if host.loop_count > 0 {
                self.loop_jump = Some(host.loop_row);
            } else {
                // a finished loop starts again after this row
                host.loop_row = row + 1;
            }
        }
    }

    // S7x: past note actions, new note action override, envelope switches.
    fn instrument_control(&mut self, module: &ItData, h: usize, y: u8) {
        match y {
            0x0..=0x2 => {
                let past: Vec<usize> = (0..self.voices)
                    .filter(|&i| { let s = &self.slaves[i]; s.on && s.disowned && s.host == h })
                    .collect();
                for i in past {
                    match y {
                        0 => self.slaves[i].on = false,
                        1 => self.note_off_slave(module, i),
                        _ => self.slaves[i].start_fade(),
                    }
                }
            }
            _ => {
                let s = match self.live_slave(h) {
                    Some(s) => s,
                    None    => return,
                };
                let ins = self.slaves[s].ins.and_then(|x| module.instruments.get(x));
                let slave = &mut self.slaves[s];
                match y {
                    0x3 => slave.nna = NewNoteAction::Cut,
                    0x4 => slave.nna = NewNoteAction::Continue,
                    0x5 => slave.nna = NewNoteAction::NoteOff,
                    0x6 => slave.nna = NewNoteAction::Fade,
                    0x7 => slave.vol_env_on = false,
                    0x8 => slave.vol_env_on = ins.map(|x| x.vol_env.enabled()).unwrap_or(false),
                    0x9 => slave.pan_env_on = false,
                    0xa => slave.pan_env_on = ins.map(|x| x.pan_env.enabled()).unwrap_or(false),
                    0xb => slave.pitch_env_on = false,
                    0xc => slave.pitch_env_on = ins.map(|x| x.pitch_env.enabled()).unwrap_or(false),
                    _ => (),
                }
            }
        }
    }

    fn sample_offset(&mut self, module: &ItData, h: usize, p: u8) {
        let s = match self.live_slave(h) {
            Some(s) => s,
            None    => return,
        };
        let size = module.samples.get(self.slaves[s].smp).map(|x| x.size).unwrap_or(0);
        let mut ofs = (p as usize) << 8 | (self.hosts[h].high_offset as usize) << 16;
        if ofs >= size {
            ofs = if self.old_effects { size.saturating_sub(1) } else { 0 };
        }
        self.slaves[s].voice.set_position(ofs);
    }

    fn midi_macro(&mut self, module: &ItData, h: usize, p: u8) {
        let host = &self.hosts[h];
        let ctx = MacroContext {
            param   : p & 0x7f,
            note    : host.note,
            velocity: host.vol,
            volume  : host.vol,
            pan     : host.pan,
            channel : h as u8,
        };
        let msg = midi::translate(module.midi.zxx_macro(host.sfx, p), &ctx);

        let slave = self.live_slave(h);
        let host = &mut self.hosts[h];
        match midi::interpret(&msg) {
            Some(MacroAction::SetCutoff(v)) => {
                host.cutoff = v;
                if let Some(s) = slave {
                    self.slaves[s].cutoff = v;
                }
            }
            Some(MacroAction::SetResonance(v)) => {
                host.resonance = v;
                if let Some(s) = slave {
                    self.slaves[s].resonance = v;
                }
            }
            None => trace!("macro {:02X?} ignored", msg),
        }
    }

    /// Continue the effects of the row on ticks after the first.
    pub(super) fn tick_host(&mut self, module: &ItData, h: usize) {
        let frame = self.frame;

        if self.hosts[h].cut_tick.map(usize::from) == Some(frame) {
            self.hosts[h].cut_tick = None;
            if let Some(s) = self.live_slave(h) {
                self.echo(h, s);
            }
        }

        if self.hosts[h].delay_tick.map(usize::from) == Some(frame) {
            let host = &mut self.hosts[h];
            host.delay_tick = None;
            let e = host.delayed;
            self.init_cell(module, h, &e);
            return
        }

        if self.hosts[h].porta_on {
            self.porta_step(h);
        }

        if let Some(fx) = self.hosts[h].vol_fx {
            let host = &mut self.hosts[h];
            match fx {
                VolumeEffect::VolumeSlideUp => host.vol = Slide::Up(host.mem_vol_cd).apply(host.vol, false, 64),
                VolumeEffect::VolumeSlideDown => host.vol = Slide::Down(host.mem_vol_cd).apply(host.vol, false, 64),
                VolumeEffect::PortaDown | VolumeEffect::PortaUp => {
                    let delta = host.mem_e as u32 * 4;
                    self.slide_pitch(h, delta, fx == VolumeEffect::PortaUp);
                }
                VolumeEffect::Vibrato => self.vibrato(h),
                _ => (),
            }
        }

        let cmd = match self.hosts[h].cmd {
            Some(cmd) => cmd,
            None      => return,
        };

        match cmd {
            Command::VolumeSlide => self.volume_slide(h, false),
            Command::PortaDown | Command::PortaUp => {
                let p = self.hosts[h].mem_e;
                if p < 0xe0 {
                    self.slide_pitch(h, p as u32 * 4, cmd == Command::PortaUp);
                }
            }
            Command::Vibrato | Command::FineVibrato => self.vibrato(h),
            Command::Tremor => self.tremor(h),
            Command::Arpeggio => self.arpeggio(h),
            Command::VolSlideVibrato => {
                self.volume_slide(h, false);
                self.vibrato(h);
            }
            Command::VolSlideTonePorta => self.volume_slide(h, false),
            Command::ChannelVolumeSlide => {
                let host = &mut self.hosts[h];
                host.chn_vol = Slide::decode(host.mem_n).apply(host.chn_vol, false, 64);
            }
            Command::PanSlide => {
                let host = &mut self.hosts[h];
                host.pan = Slide::decode(host.mem_p).reverse().apply(host.pan, false, 64);
            }
            Command::Retrig => self.retrig(h),
            Command::Tremolo => self.tremolo(h),
            Command::Panbrello => self.panbrello(h),
            Command::Tempo => {
                let p = self.hosts[h].mem_t;
                match p >> 4 {
                    0 => self.tempo = (self.tempo as i32 - (p & 0x0f) as i32).max(32) as u8,
                    1 => self.tempo = (self.tempo as u32 + (p & 0x0f) as u32).min(255) as u8,
                    _ => (),
                }
            }
            Command::GlobalVolumeSlide => {
                let p = self.hosts[h].mem_w;
                self.gv = Slide::decode(p).apply(self.gv, false, 128);
            }
            _ => (),
        }
    }

    fn volume_slide(&mut self, h: usize, first_tick: bool) {
        let host = &mut self.hosts[h];
        host.vol = Slide::decode(host.mem_d).apply(host.vol, first_tick, 64);
    }

    fn slide_pitch(&mut self, h: usize, delta: u32, up: bool) {
        let linear = self.linear;
        if let Some(s) = self.live_slave(h) {
            let slave = &mut self.slaves[s];
            slave.freq = if up {
                pitch::slide_up(slave.freq, delta, linear)
            } else {
                pitch::slide_down(slave.freq, delta, linear)
            };
        }
    }

    fn porta_step(&mut self, h: usize) {
        let linear = self.linear;
        let s = match self.live_slave(h) {
            Some(s) => s,
            None    => return,
        };
        let host = &mut self.hosts[h];
        if host.porta_target == 0 {
            host.porta_on = false;
            return
        }
        let (freq, done) = pitch::portamento(self.slaves[s].freq, host.porta_target, host.porta_speed, linear);
        self.slaves[s].freq = freq;
        if done {
            host.porta_on = false;
        }
    }

    fn vibrato(&mut self, h: usize) {
        let host = &mut self.hosts[h];
        let lfo = &mut host.vibrato;
        lfo.pos = lfo.pos.wrapping_add(lfo.speed.wrapping_mul(4));
        let mut depth = if host.fine_vibrato { lfo.depth as i32 } else { lfo.depth as i32 * 4 };
        if self.old_effects {
            depth *= 2;
        }
        let delta = pitch::waveform(lfo.wave, lfo.pos) * depth >> 6;
        if let Some(s) = self.live_slave(h) {
            self.slaves[s].vib_delta = delta;
        }
    }

    fn tremolo(&mut self, h: usize) {
        let lfo = &mut self.hosts[h].tremolo;
        lfo.pos = lfo.pos.wrapping_add(lfo.speed.wrapping_mul(4));
        let delta = pitch::waveform(lfo.wave, lfo.pos) * lfo.depth as i32 >> 5;
        if let Some(s) = self.live_slave(h) {
            self.slaves[s].trem_delta = delta;
        }
    }

    fn panbrello(&mut self, h: usize) {
        let lfo = &mut self.hosts[h].panbrello;
        lfo.pos = lfo.pos.wrapping_add(lfo.speed);
        let delta = pitch::waveform(lfo.wave, lfo.pos) * lfo.depth as i32 >> 5;
        if let Some(s) = self.live_slave(h) {
            self.slaves[s].panb_delta = delta;
        }
    }

    fn tremor(&mut self, h: usize) {
        let old = self.old_effects;
        let host = &mut self.hosts[h];
        let (on, off) = if old {
            ((host.mem_i >> 4).max(1), (host.mem_i & 0x0f).max(1))
        } else {
            ((host.mem_i >> 4) + 1, (host.mem_i & 0x0f) + 1)
        };
        if host.tremor_count == 0 {
            host.tremor_on = !host.tremor_on;
            host.tremor_count = if host.tremor_on { on } else { off };
        }
        host.tremor_count -= 1;
        let mute = !host.tremor_on;
        if let Some(s) = self.live_slave(h) {
            self.slaves[s].tremor_mute = mute;
        }
    }

    fn arpeggio(&mut self, h: usize) {
        let host = &mut self.hosts[h];
        host.arp_tick = (host.arp_tick + 1) % 3;
        let semitones = match host.arp_tick {
            0 => 0,
            1 => host.mem_j >> 4,
            _ => host.mem_j & 0x0f,
        };
        if let Some(s) = self.live_slave(h) {
            self.slaves[s].arp_delta = semitones as i32 * 64;
        }
    }

    fn retrig(&mut self, h: usize) {
        let host = &mut self.hosts[h];
        let (x, y) = (host.mem_q >> 4, host.mem_q & 0x0f);
        host.retrig_count += 1;
        if host.retrig_count < y.max(1) {
            return
        }
        host.retrig_count = 0;
        host.vol = retrig_volume(host.vol as i32, x) as u8;

        if let Some(s) = self.live_slave(h) {
            self.ramp_copy(h, s);
            // a released note keeps playing past its sustain loop
            let slave = &mut self.slaves[s];
            slave.voice.start(0);
            slave.voice.released = slave.note_off;
        }
    }
}
