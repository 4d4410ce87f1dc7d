use crate::module::Module;
use crate::player;
use crate::Error;

pub mod it;

// Supported formats

#[derive(PartialEq, Debug, Clone, Copy)]
pub enum Format {
    It,
}

pub struct ProbeInfo {
    pub format: Format,
    pub title : String,
}

// Trait for module loader

pub trait Loader {
    fn name(&self) -> &'static str;
    fn probe(&self, b: &[u8], player_id: &str) -> Result<ProbeInfo, Error>;
    fn load(self: Box<Self>, b: &[u8], info: ProbeInfo) -> Result<Module, Error>;
}


pub fn list() -> Vec<Box<dyn Loader>> {
    vec![
        Box::new(it::ItLoader),
    ]
}

pub fn load(b: &[u8], player_id: &str) -> Result<Module, Error> {

    for f in list() {
        debug!("Probing format: {}", f.name());

        let info = match f.probe(b, player_id) {
            Ok(val) => val,
            Err(_)  => continue,
        };

        info!("Probe ok, load format {:?} ({})", info.format, info.title);
        return f.load(b, info)
    }

    Err(Error::Format("unsupported module format".to_owned()))
}

/// Fail if a player was requested that doesn't accept this format.
pub fn check_accepted(player_id: &str, fmt: &str) -> Result<(), Error> {
    if player_id.is_empty() {
        return Ok(())
    }
    let entry = player::Player::find_by_id(player_id)?;
    if entry.info().accepts.contains(&fmt) {
        Ok(())
    } else {
        Err(Error::Format(format!("player {} does not accept {}", player_id, fmt)))
    }
}
