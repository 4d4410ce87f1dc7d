use crate::module::ModuleData;
use super::{FormatPlayer, PlayerData};

/// Result of a replay length scan.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanData {
    pub time : u32,    // milliseconds until the end of the song
    pub ticks: usize,
    pub pos  : usize,  // last position played
    pub row  : usize,
}

impl ScanData {
    pub fn new() -> Self {
        Default::default()
    }
}

/// Step a freshly created player until the song ends. Each tick lasts
/// 2.5 / tempo seconds.
pub fn scan(fp: &mut dyn FormatPlayer, module: &dyn ModuleData) -> ScanData {
    let mut data = PlayerData::new();
    fp.start(&mut data, module);

    let mut scan = ScanData::new();
    let mut millis = 0.0_f64;
    while fp.play(&mut data, module) {
        millis += 2500.0 / data.tempo.max(1) as f64;
        scan.ticks += 1;
        scan.pos = data.pos;
        scan.row = data.row;
    }
    scan.time = millis.round() as u32;

    debug!("scan: {} ticks, {} ms, end at {}/{}", scan.ticks, scan.time, scan.pos, scan.row);
    scan
}
