pub mod codec;
pub mod load;
pub mod midi;

pub use self::load::*;
pub use self::midi::MidiConfig;

use std::any::Any;
use crate::module::{event, Event, Instrument, ModuleData, Sample};
use crate::util::BinaryRead;
use crate::{Error, MAX_CHANNELS};

//                                 IT Module header
//          0   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
//        ,---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---.
//  0000: |'I'|'M'|'P'|'M'| Song Name, max 26 characters, includes NULL   |
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  0010: |.......................................................|PHiligt|
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  0020: |OrdNum |InsNum |SmpNum |PatNum | Cwt/v | Cmwt  | Flags |Special|
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  0030: |GV |MV |IS |IT |Sep|PWD|MsgLgth|Message Offset |   Reserved    |
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  0040: | Chnl Pan (64 bytes)...                                        |
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  0080: | Chnl Vol (64 bytes)...                                        |
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  00C0: | Orders, Length = OrdNum                                       |
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  xxxx: | 'Long' Offset of instruments, Length = InsNum*4               |
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  xxxx: | 'Long' Offset of samples headers, Length = SmpNum*4           |
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+
//  xxxx: | 'Long' Offset of patterns, Length = PatNum*4                  |
//        +---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+---+

pub const FLAG_STEREO     : u16 = 0x01;
pub const FLAG_VOL0_OPT   : u16 = 0x02;
pub const FLAG_INSTRUMENTS: u16 = 0x04;
pub const FLAG_LINEAR     : u16 = 0x08;
pub const FLAG_OLD_EFFECTS: u16 = 0x10;
pub const FLAG_LINK_GXX   : u16 = 0x20;

pub const SPECIAL_MESSAGE : u16 = 0x01;
pub const SPECIAL_HISTORY : u16 = 0x02;
pub const SPECIAL_MIDI_CFG: u16 = 0x08;

pub const ORD_SKIP: u8 = 254;
pub const ORD_END : u8 = 255;

pub const DEFAULT_ROWS: usize = 64;


pub struct ItData {
    pub song_name  : String,
    pub hilight    : u16,
    pub cwt_v      : u16,
    pub cmwt       : u16,
    pub flags      : u16,
    pub special    : u16,
    pub global_vol : u8,
    pub mix_vol    : u8,
    pub speed      : u8,
    pub tempo      : u8,
    pub separation : u8,
    pub pwd        : u8,
    pub chn_pan    : [u8; MAX_CHANNELS],
    pub chn_vol    : [u8; MAX_CHANNELS],
    pub orders     : Vec<u8>,
    pub instruments: Vec<Instrument>,
    pub samples    : Vec<Sample>,
    pub patterns   : Vec<ItPattern>,
    pub message    : String,
    pub midi       : MidiConfig,

    pub channels   : usize,
}

impl ItData {
    pub fn new() -> Self {
        ItData {
            song_name  : "".to_owned(),
            hilight    : 0x1004,
            cwt_v      : 0x0214,
            cmwt       : 0x0214,
            flags      : FLAG_STEREO | FLAG_LINEAR,
            special    : 0,
            global_vol : 128,
            mix_vol    : 48,
            speed      : 6,
            tempo      : 125,
            separation : 128,
            pwd        : 0,
            chn_pan    : [32; MAX_CHANNELS],
            chn_vol    : [64; MAX_CHANNELS],
            orders     : Vec::new(),
            instruments: Vec::new(),
            samples    : Vec::new(),
            patterns   : Vec::new(),
            message    : "".to_owned(),
            midi       : MidiConfig::default(),
            channels   : 1,
        }
    }

    pub fn stereo(&self) -> bool {
        self.flags & FLAG_STEREO != 0
    }

    pub fn instrument_mode(&self) -> bool {
        self.flags & FLAG_INSTRUMENTS != 0
    }

    pub fn linear_slides(&self) -> bool {
        self.flags & FLAG_LINEAR != 0
    }

    pub fn old_effects(&self) -> bool {
        self.flags & FLAG_OLD_EFFECTS != 0
    }

    pub fn link_gxx(&self) -> bool {
        self.flags & FLAG_LINK_GXX != 0
    }

    /// Pattern for an order entry, or `None` for the skip/end markers.
    pub fn order_pattern(&self, pos: usize) -> Option<usize> {
        match self.orders.get(pos) {
            Some(&ORD_SKIP) | Some(&ORD_END) | None => None,
            Some(&p) => Some(p as usize),
        }
    }

    pub fn pattern(&self, pat: usize) -> Option<&ItPattern> {
        self.patterns.get(pat)
    }

    /// Rows in a pattern. Patterns that don't exist play as empty 64-row
    /// patterns.
    pub fn pattern_rows(&self, pat: usize) -> usize {
        match self.patterns.get(pat) {
            Some(p) => p.rows,
            None    => DEFAULT_ROWS,
        }
    }
}

impl ModuleData for ItData {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn title(&self) -> &str {
        &self.song_name
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn patterns(&self) -> usize {
        self.patterns.len()
    }

    fn len(&self) -> usize {
        self.orders.len()
    }

    fn pattern_in_position(&self, pos: usize) -> Option<usize> {
        self.order_pattern(pos)
    }

    fn instruments(&self) -> Vec<String> {
        if self.instrument_mode() {
            self.instruments.iter().map(|x| x.name.to_owned()).collect::<Vec<String>>()
        } else {
            self.samples.iter().map(|x| x.name.to_owned()).collect::<Vec<String>>()
        }
    }

    fn rows(&self, pat: usize) -> usize {
        self.pattern_rows(pat)
    }

    fn event(&self, pat: usize, row: usize, chn: usize) -> Event {
        let p = match self.patterns.get(pat) {
            Some(p) => p,
            None    => return Event::new(),
        };

        let mut memory = [CellMemory::default(); MAX_CHANNELS];
        let mut reader = PatternReader::new();
        let mut e = Event::new();
        for r in 0..=row {
            let res = reader.read_row(&p.data, &mut memory, |c, ev| {
                if r == row && c == chn {
                    e = ev;
                }
            });
            if res.is_err() {
                break
            }
        }
        e
    }

    fn samples(&self) -> &[Sample] {
        &self.samples
    }
}


/// Packed pattern data, kept as in the file.
#[derive(Debug, Clone, Default)]
pub struct ItPattern {
    pub rows: usize,
    pub data: Vec<u8>,
}

impl ItPattern {
    pub fn new(rows: usize, data: Vec<u8>) -> Self {
        ItPattern { rows, data }
    }
}

const MASK_NOTE     : u8 = 0x01;
const MASK_INS      : u8 = 0x02;
const MASK_VOL      : u8 = 0x04;
const MASK_CMD      : u8 = 0x08;
const MASK_LAST_NOTE: u8 = 0x10;
const MASK_LAST_INS : u8 = 0x20;
const MASK_LAST_VOL : u8 = 0x40;
const MASK_LAST_CMD : u8 = 0x80;

/// Per-channel decoder memory ("repeat last" values of the packing scheme).
#[derive(Debug, Clone, Copy, Default)]
pub struct CellMemory {
    pub mask : u8,
    pub note : u8,
    pub ins  : u8,
    pub vol  : u8,
    pub cmd  : u8,
    pub param: u8,
}

/// Row-at-a-time decoder over a packed pattern stream. Every byte read is
/// bounds checked, so a truncated stream ends with an error instead of
/// running past the data.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternReader {
    pub ofs: usize,
}

impl PatternReader {
    pub fn new() -> Self {
        Default::default()
    }

    fn next(&mut self, data: &[u8]) -> Result<u8, Error> {
        let b = data.read8(self.ofs)?;
        self.ofs += 1;
        Ok(b)
    }

    /// Decode one row, calling `f(channel, event)` for each cell present.
    /// Reaching the end of the stream ends the row.
    pub fn read_row<F>(&mut self, data: &[u8], memory: &mut [CellMemory], mut f: F) -> Result<(), Error>
    where F: FnMut(usize, Event)
    {
        loop {
            if self.ofs >= data.len() {
                return Ok(())
            }
            let cv = self.next(data)?;
            if cv == 0 {
                return Ok(())
            }

            let chn = ((cv - 1) & 63) as usize;
            if chn >= memory.len() {
                return Err(Error::Load("pattern channel out of range"))
            }

            if cv & 0x80 != 0 {
                memory[chn].mask = self.next(data)?;
            }

            let m = &mut memory[chn];
            let mask = m.mask;
            let mut e = Event::new();

            if mask & MASK_NOTE != 0 {
                m.note = self.next(data)?;
            }
            if mask & MASK_INS != 0 {
                m.ins = self.next(data)?;
            }
            if mask & MASK_VOL != 0 {
                m.vol = self.next(data)?;
            }
            if mask & MASK_CMD != 0 {
                m.cmd = self.next(data)?;
                m.param = self.next(data)?;
            }

            if mask & (MASK_NOTE | MASK_LAST_NOTE) != 0 {
                e.mask |= event::HAS_NOTE;
                e.note = m.note;
            }
            if mask & (MASK_INS | MASK_LAST_INS) != 0 {
                e.mask |= event::HAS_INS;
                e.ins = m.ins;
            }
            if mask & (MASK_VOL | MASK_LAST_VOL) != 0 {
                e.mask |= event::HAS_VOL;
                e.vol = m.vol;
            }
            if mask & (MASK_CMD | MASK_LAST_CMD) != 0 {
                e.mask |= event::HAS_CMD;
                e.fxt = m.cmd;
                e.fxp = m.param;
            }

            f(chn, e);
        }
    }
}
