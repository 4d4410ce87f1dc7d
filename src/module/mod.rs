pub mod envelope;
pub mod event;
pub mod instrument;
pub mod sample;

pub use self::envelope::Envelope;
pub use self::event::Event;
pub use self::instrument::Instrument;
pub use self::sample::Sample;

use std::any::Any;
use std::fmt;

/// Format-independent view of the loaded module data.
pub trait ModuleData: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn title(&self) -> &str;
    fn channels(&self) -> usize;
    fn patterns(&self) -> usize;
    fn len(&self) -> usize;
    fn pattern_in_position(&self, pos: usize) -> Option<usize>;
    fn instruments(&self) -> Vec<String>;
    fn rows(&self, pat: usize) -> usize;
    fn event(&self, pat: usize, row: usize, chn: usize) -> Event;
    fn samples(&self) -> &[Sample];

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}


pub struct Module {
    pub format_id  : &'static str,
    pub description: String,
    pub creator    : String,
    pub player     : &'static str,
    pub data       : Box<dyn ModuleData>,
}

impl Module {
    pub fn title(&self) -> &str {
        self.data.title()
    }

    pub fn channels(&self) -> usize {
        self.data.channels()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.format_id, self.creator, self.data.title())
    }
}
