#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

#[macro_use]
mod util;

pub mod format;
pub mod mixer;
pub mod module;
pub mod player;
pub use crate::player::{ChannelStatus, FrameInfo, Options};

use std::io::{self, Read};

pub const MAX_RATE     : u32 = 96000;
pub const MIN_RATE     : u32 = 4000;
pub const MIN_BPM      : u32 = 32;
// frame rate = (2 * bpm / 5) Hz
// frame size = sampling rate / frame rate
pub const MAX_FRAMESIZE: usize = (5 * MAX_RATE / (2 * MIN_BPM)) as usize;
pub const MAX_KEYS     : usize = 120;
pub const MAX_CHANNELS : usize = 64;


#[derive(Default)]
pub struct ModuleInfo {
    pub title      : String,
    pub format_id  : &'static str,
    pub description: String,
    pub creator    : String,
    pub channels   : usize,
    pub player     : &'static str,
    pub total_time : u32,
}

impl ModuleInfo {
    pub fn new() -> Self {
        Default::default()
    }
}


pub struct Oxit {
    pub module   : module::Module,
    pub player   : player::Player,
    pub player_id: String,
}

impl Oxit {
    pub fn new(b: &[u8], rate: u32, player_id: &str) -> Result<Self, Error> {
        let module = format::load(b, player_id)?;
        let id = (if player_id.is_empty() { module.player } else { player_id }).to_owned();

        let options = player::Options { rate, ..Default::default() };
        let player = player::Player::find(&module, &id, options)?;

        Ok(Oxit {
            module,
            player,
            player_id: id,
        })
    }

    /// Load a module from any byte source. The stream is consumed at load time only.
    pub fn from_reader<R: Read>(mut reader: R, rate: u32, player_id: &str) -> Result<Self, Error> {
        let mut b = Vec::new();
        reader.read_to_end(&mut b)?;
        Self::new(&b, rate, player_id)
    }

    pub fn module(&self) -> &module::Module {
        &self.module
    }

    pub fn player_info(&self) -> Result<player::PlayerInfo, Error> {
        Ok(player::Player::find_by_id(&self.player_id)?.info())
    }

    pub fn module_info(&mut self, mi: &mut ModuleInfo) -> &mut Self {
        mi.title = self.module.data.title().to_owned();
        mi.format_id = self.module.format_id;
        mi.description = self.module.description.to_owned();
        mi.creator = self.module.creator.to_owned();
        mi.channels = self.module.data.channels();
        mi.player = self.module.player;
        mi.total_time = self.player.scan(&self.module).time;
        self
    }

    pub fn frame_info(&mut self, info: &mut FrameInfo) -> &mut Self {
        self.player.info(info);
        self
    }

    pub fn play_frame(&mut self) -> &mut Self {
        self.player.play_frame(&self.module);
        self
    }

    pub fn build_tick(&mut self, out: Option<&mut [i16]>) -> usize {
        self.player.build_tick(&self.module, out)
    }

    pub fn fill_buffer(&mut self, out_buffer: &mut [i16], loops: usize) {
        self.player.fill_buffer(&self.module, out_buffer, loops);
    }

    pub fn buffer(&self) -> &[i16] {
        self.player.buffer()
    }

    pub fn channel_count(&self) -> usize {
        self.player.channel_count()
    }

    pub fn channel_status(&self, chn: usize) -> Option<ChannelStatus> {
        self.player.channel_status(&self.module, chn)
    }

    pub fn set_interpolator(&mut self, name: &str) -> Result<(), Error> {
        let interp = mixer::interpolator::Interpolator::from_name(name)
            .ok_or_else(|| Error::Format(format!("unknown interpolator {}", name)))?;
        self.player.set_interpolator(interp);
        Ok(())
    }
}


#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Format(String),
    #[error("{0}")]
    Load(&'static str),
    #[error("{0}")]
    Io(#[from] io::Error),
}
