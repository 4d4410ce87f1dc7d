use std::fmt;
use super::Envelope;
use crate::MAX_KEYS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewNoteAction {
    Cut,
    Continue,
    NoteOff,
    Fade,
}

impl NewNoteAction {
    pub fn from_u8(val: u8) -> Self {
        match val {
            1 => NewNoteAction::Continue,
            2 => NewNoteAction::NoteOff,
            3 => NewNoteAction::Fade,
            _ => NewNoteAction::Cut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateCheckType {
    Off,
    Note,
    Sample,
    Instrument,
}

impl DuplicateCheckType {
    pub fn from_u8(val: u8) -> Self {
        match val {
            1 => DuplicateCheckType::Note,
            2 => DuplicateCheckType::Sample,
            3 => DuplicateCheckType::Instrument,
            _ => DuplicateCheckType::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuplicateCheckAction {
    Cut,
    NoteOff,
    Fade,
}

impl DuplicateCheckAction {
    pub fn from_u8(val: u8) -> Self {
        match val {
            1 => DuplicateCheckAction::NoteOff,
            2 => DuplicateCheckAction::Fade,
            _ => DuplicateCheckAction::Cut,
        }
    }
}


#[derive(Clone)]
pub struct Keymap<T> {
    map: [T; MAX_KEYS]
}

impl<T: Copy> Keymap<T> {
    pub fn new(val: T) -> Self {
        Keymap { map: [val; MAX_KEYS] }
    }

    pub fn get(&self, key: usize) -> Option<&T> {
        self.map.get(key)
    }

    pub fn set(&mut self, key: usize, val: T) {
        if key < MAX_KEYS {
            self.map[key] = val;
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Keymap<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.map[..].fmt(formatter)
    }
}

/// Keyboard table entry: 1-based sample number (0 = none) and the note
/// actually played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleMap {
    pub sample: u8,
    pub note  : u8,
}


#[derive(Debug, Clone)]
pub struct Instrument {
    pub num       : usize,
    pub name      : String,
    pub filename  : String,
    pub nna       : NewNoteAction,
    pub dct       : DuplicateCheckType,
    pub dca       : DuplicateCheckAction,
    pub fadeout   : u16,
    pub pps       : i8,
    pub ppc       : u8,
    pub global_vol: u8,
    pub pan       : Option<u8>,
    pub rand_vol  : u8,
    pub rand_pan  : u8,
    pub cutoff    : Option<u8>,
    pub resonance : Option<u8>,
    pub keymap    : Keymap<SampleMap>,
    pub vol_env   : Envelope,
    pub pan_env   : Envelope,
    pub pitch_env : Envelope,
}

impl Instrument {
    pub fn new() -> Instrument {
        let mut keymap = Keymap::new(SampleMap::default());
        for i in 0..MAX_KEYS {
            keymap.set(i, SampleMap { sample: 0, note: i as u8 });
        }

        Instrument {
            num       : 0,
            name      : "".to_owned(),
            filename  : "".to_owned(),
            nna       : NewNoteAction::Cut,
            dct       : DuplicateCheckType::Off,
            dca       : DuplicateCheckAction::Cut,
            fadeout   : 0,
            pps       : 0,
            ppc       : 60,
            global_vol: 128,
            pan       : None,
            rand_vol  : 0,
            rand_pan  : 0,
            cutoff    : None,
            resonance : None,
            keymap,
            vol_env   : Envelope::new(),
            pan_env   : Envelope::new(),
            pitch_env : Envelope::new(),
        }
    }

    /// Sample number (1-based) and remapped note for a pattern note.
    pub fn map_note(&self, note: u8) -> Option<(usize, u8)> {
        let entry = self.keymap.get(note as usize)?;
        if entry.sample == 0 || entry.note as usize >= MAX_KEYS {
            return None
        }
        Some((entry.sample as usize, entry.note))
    }
}

impl Default for Instrument {
    fn default() -> Self {
        Instrument::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_note() {
        let mut ins = Instrument::new();
        ins.keymap.set(60, SampleMap { sample: 2, note: 72 });
        ins.keymap.set(61, SampleMap { sample: 1, note: 130 });
        assert_eq!(ins.map_note(60), Some((2, 72)));
        assert_eq!(ins.map_note(61), None);
        assert_eq!(ins.map_note(59), None);
        assert_eq!(ins.map_note(200), None);
    }

    #[test]
    fn test_policies_from_u8() {
        assert_eq!(NewNoteAction::from_u8(3), NewNoteAction::Fade);
        assert_eq!(NewNoteAction::from_u8(9), NewNoteAction::Cut);
        assert_eq!(DuplicateCheckType::from_u8(2), DuplicateCheckType::Sample);
        assert_eq!(DuplicateCheckAction::from_u8(1), DuplicateCheckAction::NoteOff);
    }
}
