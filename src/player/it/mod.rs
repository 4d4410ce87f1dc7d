mod alloc;
mod effects;
mod envelope;
mod host;
mod pitch;
mod player;
mod slave;
mod tables;
mod volume;

#[cfg(test)]
mod tests;

pub use self::player::ItPlayer;

use crate::format::it::ItData;
use crate::module::Module;
use crate::player::{FormatPlayer, Options, PlayerInfo, PlayerListEntry};
use crate::Error;

pub struct It;

impl PlayerListEntry for It {
   fn info(&self) -> PlayerInfo {
       PlayerInfo {
          id         : "it",
          name       : "Impulse Tracker replayer",
          description: "IT module replayer with new note actions and resonant filters",
          author     : "Claudio Matsuoka",
          accepts    : &[ "it" ],
       }
   }

   fn player(&self, module: &Module, options: Options) -> Result<Box<dyn FormatPlayer>, Error> {
       let data = module.data.as_any().downcast_ref::<ItData>()
           .ok_or_else(|| Error::Format("module data is not IT".to_owned()))?;
       Ok(Box::new(ItPlayer::new(data, options)))
   }
}
