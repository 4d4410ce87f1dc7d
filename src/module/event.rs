use std::fmt;
use crate::util;

pub const HAS_NOTE: u8 = 0x01;
pub const HAS_INS : u8 = 0x02;
pub const HAS_VOL : u8 = 0x04;
pub const HAS_CMD : u8 = 0x08;

/// A single pattern cell. Fields are only meaningful when the matching
/// `HAS_*` bit is set in `mask`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Event {
    pub mask: u8,
    pub note: u8,
    pub ins : u8,
    pub vol : u8,
    pub fxt : u8,
    pub fxp : u8,
}

impl Event {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn has_note(&self) -> bool {
        self.mask & HAS_NOTE != 0
    }

    pub fn has_ins(&self) -> bool {
        self.mask & HAS_INS != 0
    }

    pub fn has_vol(&self) -> bool {
        self.mask & HAS_VOL != 0
    }

    pub fn has_cmd(&self) -> bool {
        self.mask & HAS_CMD != 0
    }
}

fn volume_text(vol: u8) -> String {
    match vol {
        0..=64    => format!("v{:02}", vol),
        65..=74   => format!("a{:02}", vol - 65),
        75..=84   => format!("b{:02}", vol - 75),
        85..=94   => format!("c{:02}", vol - 85),
        95..=104  => format!("d{:02}", vol - 95),
        105..=114 => format!("e{:02}", vol - 105),
        115..=124 => format!("f{:02}", vol - 115),
        128..=192 => format!("p{:02}", vol - 128),
        193..=202 => format!("g{:02}", vol - 193),
        203..=212 => format!("h{:02}", vol - 203),
        _         => "...".to_owned(),
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let note = if self.has_note() {
            util::note_name(self.note)
        } else {
            "...".to_owned()
        };

        let ins = if self.has_ins() && self.ins != 0 {
            format!("{:02}", self.ins)
        } else {
            "..".to_owned()
        };

        let vol = if self.has_vol() {
            volume_text(self.vol)
        } else {
            "...".to_owned()
        };

        let cmd = if self.has_cmd() && self.fxt >= 1 && self.fxt <= 26 {
            format!("{}{:02X}", (b'A' + self.fxt - 1) as char, self.fxp)
        } else {
            "...".to_owned()
        };

        write!(f, "{} {} {} {}", note, ins, vol, cmd)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_event() {
        let e = Event { mask: HAS_NOTE | HAS_INS | HAS_VOL | HAS_CMD, note: 60, ins: 1, vol: 64, fxt: 1, fxp: 6 };
        assert_eq!(e.to_string(), "C-5 01 v64 A06");

        let e = Event { mask: HAS_VOL | HAS_CMD, vol: 130, fxt: 19, fxp: 0xb3, ..Default::default() };
        assert_eq!(e.to_string(), "... .. p02 SB3");

        assert_eq!(Event::new().to_string(), "... .. ... ...");
    }
}
