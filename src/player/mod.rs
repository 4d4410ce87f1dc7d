mod scan;
pub mod it;

pub use self::scan::ScanData;

use std::cmp;
use crate::mixer::Mixer;
use crate::mixer::interpolator::Interpolator;
use crate::module::{Module, ModuleData};
use crate::{Error, MAX_RATE, MIN_RATE};

// For the player list

pub struct PlayerInfo {
    pub id         : &'static str,
    pub name       : &'static str,
    pub description: &'static str,
    pub author     : &'static str,
    pub accepts    : &'static [&'static str],
}

pub trait PlayerListEntry {
    fn info(&self) -> PlayerInfo;
    fn player(&self, module: &Module, options: Options) -> Result<Box<dyn FormatPlayer>, Error>;
}


// Trait for format-specific players

pub trait FormatPlayer: Send + Sync {
    fn start(&mut self, data: &mut PlayerData, module: &dyn ModuleData);
    /// Run one tick. Returns false when the song ends.
    fn play(&mut self, data: &mut PlayerData, module: &dyn ModuleData) -> bool;
    fn mix(&mut self, module: &dyn ModuleData, mixer: &mut Mixer);
    fn channel_status(&self, module: &dyn ModuleData, chn: usize) -> Option<ChannelStatus>;
    fn channel_count(&self) -> usize;
    fn reset(&mut self);
}


#[derive(Debug, Clone, Copy)]
pub struct Options {
    pub rate         : u32,
    pub interpolation: Interpolator,
    pub max_repeat   : usize,
    pub voices       : usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            rate         : 44100,
            interpolation: Interpolator::Spline,
            max_repeat   : 1,
            voices       : 192,
        }
    }
}


#[derive(Debug, Default)]
pub struct PlayerData {
    pub pos  : usize,
    pub row  : usize,
    pub frame: usize,
    pub speed: usize,
    pub tempo: usize,
    pub gvol : usize,
    pub time : f64,

    initial_speed: usize,
    initial_tempo: usize,
    initial_gvol : usize,
}

impl PlayerData {
    pub fn new() -> Self {
        Default::default()
    }

    /// Remember the values a restart goes back to.
    pub fn set_initial(&mut self, speed: usize, tempo: usize, gvol: usize) {
        self.initial_speed = speed;
        self.initial_tempo = tempo;
        self.initial_gvol = gvol;
        self.reset();
    }

    pub fn reset(&mut self) {
        self.pos   = 0;
        self.row   = 0;
        self.frame = 0;
        self.time  = 0.0;
        self.speed = self.initial_speed;
        self.tempo = self.initial_tempo;
        self.gvol  = self.initial_gvol;
    }
}


/// State of a pattern channel, for display.
#[derive(Debug, Clone, Default)]
pub struct ChannelStatus {
    pub active         : bool,
    pub note           : u8,
    pub instrument     : usize,
    pub instrument_name: String,
    pub volume         : u8,   // 0..64
    pub pan            : u8,   // 0..64, 100 is surround
    pub cell_text      : String,
}


pub struct Player {
    pub data     : PlayerData,
    id           : String,
    options      : Options,
    format_player: Box<dyn FormatPlayer>,
    mixer        : Mixer,
    loop_count   : usize,
    end          : bool,

    // for buffer fill
    consumed     : usize,
    in_size      : usize,
}

impl Player {
    pub fn find(module: &Module, player_id: &str, mut options: Options) -> Result<Self, Error> {
        let entry = Self::find_by_id(player_id)?;
        let info = entry.info();
        if !info.accepts.contains(&module.format_id) {
            return Err(Error::Format(format!("player {} does not accept {}", info.id, module.format_id)))
        }

        options.rate = options.rate.max(MIN_RATE).min(MAX_RATE);
        let mut format_player = entry.player(module, options)?;

        let mut data = PlayerData::new();
        format_player.start(&mut data, &*module.data);
        debug!("start player {}: speed={} tempo={}", info.id, data.speed, data.tempo);

        let mut mixer = Mixer::new(options.rate, options.interpolation);
        mixer.set_tempo(data.tempo);

        Ok(Player {
            data,
            id        : player_id.to_owned(),
            options,
            format_player,
            mixer,
            loop_count: 0,
            end       : false,
            consumed  : 0,
            in_size   : 0,
        })
    }

    pub fn list() -> Vec<Box<dyn PlayerListEntry>> {
        vec![
            Box::new(it::It),
        ]
    }

    pub fn find_by_id(player_id: &str) -> Result<Box<dyn PlayerListEntry>, Error> {
        for p in Self::list() {
            if player_id == p.info().id {
                return Ok(p)
            }
        }
        Err(Error::Format(format!("player {} not found", player_id)))
    }

    /// Compute the replay length by running a fresh copy of the player
    /// without mixing.
    pub fn scan(&self, module: &Module) -> ScanData {
        let mut fp = match Self::find_by_id(&self.id).and_then(|p| p.player(module, self.options)) {
            Ok(fp) => fp,
            Err(e) => {
                warn!("can't scan module: {}", e);
                return ScanData::new()
            }
        };
        scan::scan(&mut *fp, &*module.data)
    }

    fn restart(&mut self, module: &Module) {
        self.format_player.reset();
        self.data.reset();
        self.format_player.start(&mut self.data, &*module.data);
        self.end = false;
    }

    /// Play one tick into the internal buffer.
    pub fn play_frame(&mut self, module: &Module) -> &mut Self {
        if !self.format_player.play(&mut self.data, &*module.data) {
            self.end = true;
        }
        self.mixer.set_tempo(self.data.tempo);
        self.data.time += 2500.0 / self.data.tempo.max(1) as f64;
        self.mixer.clear();
        self.format_player.mix(&*module.data, &mut self.mixer);
        self.mixer.downmix();
        self
    }

    /// Render one tick and return the number of stereo frames it spans,
    /// or 0 at the end of the song. Without an output buffer the tick is
    /// only timed, not mixed.
    pub fn build_tick(&mut self, module: &Module, out: Option<&mut [i16]>) -> usize {
        if self.end {
            return 0
        }
        if !self.format_player.play(&mut self.data, &*module.data) {
            self.end = true;
            return 0
        }
        self.mixer.set_tempo(self.data.tempo);
        self.data.time += 2500.0 / self.data.tempo.max(1) as f64;

        let out = match out {
            Some(out) => out,
            None      => return self.mixer.framesize(),
        };

        self.mixer.clear();
        self.format_player.mix(&*module.data, &mut self.mixer);
        self.mixer.downmix();

        let buffer = self.mixer.buffer();
        let size = cmp::min(out.len(), buffer.len());
        out[..size].copy_from_slice(&buffer[..size]);
        self.mixer.framesize()
    }

    pub fn fill_buffer(&mut self, module: &Module, out_buffer: &mut [i16], loops: usize) {
        let mut filled = 0;
        let size = out_buffer.len();

        // Fill buffer
        while filled < size {
            // Check if buffer full
            if self.consumed == self.in_size {
                self.play_frame(module);

                // Check end of module
                if self.end {
                    if loops > 0 && self.loop_count < loops {
                        self.loop_count += 1;
                        debug!("restart replay, loop {}", self.loop_count);
                        self.restart(module);
                        continue
                    }

                    // Clear rest of the buffer
                    for x in &mut out_buffer[filled..] {
                        *x = 0;
                    }
                    self.consumed = 0;
                    self.in_size = 0;
                    return
                }

                self.consumed = 0;
                self.in_size = self.buffer().len();
                if self.in_size == 0 {
                    continue
                }
            }

            // Copy frame data to user buffer
            let copy_size = cmp::min(size - filled, self.in_size - self.consumed);
            out_buffer[filled..filled+copy_size].copy_from_slice(&self.buffer()[self.consumed..self.consumed+copy_size]);
            self.consumed += copy_size;
            filled += copy_size;
        }
    }

    pub fn end(&self) -> bool {
        self.end
    }

    pub fn info(&mut self, info: &mut FrameInfo) -> &mut Self {
        info.pos = self.data.pos;
        info.row = self.data.row;
        info.frame = self.data.frame;
        info.speed = self.data.speed;
        info.tempo = self.data.tempo;
        info.time = self.data.time;
        self
    }

    pub fn buffer(&self) -> &[i16] {
        self.mixer.buffer()
    }

    pub fn channel_count(&self) -> usize {
        self.format_player.channel_count()
    }

    pub fn channel_status(&self, module: &Module, chn: usize) -> Option<ChannelStatus> {
        self.format_player.channel_status(&*module.data, chn)
    }

    pub fn set_interpolator(&mut self, interp: Interpolator) {
        self.mixer.interp = interp;
    }
}


#[derive(Debug, Default)]
pub struct FrameInfo {
    pub pos  : usize,
    pub row  : usize,
    pub frame: usize,
    pub tempo: usize,
    pub speed: usize,
    pub time : f64,
}

impl FrameInfo {
    pub fn new() -> Self {
        Default::default()
    }
}
