use crate::util::BinaryRead;
use crate::Error;

const MACRO_SIZE : usize = 32;
const NUM_GLOBAL : usize = 9;
const NUM_SFX    : usize = 16;
const NUM_ZXX    : usize = 128;

/// Size of the embedded configuration block in the file.
pub const MIDI_CONFIG_SIZE: usize = (NUM_GLOBAL + NUM_SFX + NUM_ZXX) * MACRO_SIZE;

/// MIDI macro configuration: global, parametered (SFx) and fixed (Z80-ZFF)
/// macro strings.
#[derive(Debug, Clone)]
pub struct MidiConfig {
    pub global: Vec<String>,
    pub sfx   : Vec<String>,
    pub zxx   : Vec<String>,
}

impl Default for MidiConfig {
    fn default() -> Self {
        let mut sfx = vec![String::new(); NUM_SFX];
        sfx[0] = "F0F000z".to_owned();

        let mut zxx = vec![String::new(); NUM_ZXX];
        for (i, z) in zxx.iter_mut().take(16).enumerate() {
            *z = format!("F0F001{:02X}", i * 8);
        }

        MidiConfig {
            global: vec![String::new(); NUM_GLOBAL],
            sfx,
            zxx,
        }
    }
}

impl MidiConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn load(b: &[u8], ofs: usize) -> Result<Self, Error> {
        let mut cfg = MidiConfig {
            global: Vec::with_capacity(NUM_GLOBAL),
            sfx   : Vec::with_capacity(NUM_SFX),
            zxx   : Vec::with_capacity(NUM_ZXX),
        };

        let mut pos = ofs;
        for _ in 0..NUM_GLOBAL {
            cfg.global.push(b.read_string(pos, MACRO_SIZE)?);
            pos += MACRO_SIZE;
        }
        for _ in 0..NUM_SFX {
            cfg.sfx.push(b.read_string(pos, MACRO_SIZE)?);
            pos += MACRO_SIZE;
        }
        for _ in 0..NUM_ZXX {
            cfg.zxx.push(b.read_string(pos, MACRO_SIZE)?);
            pos += MACRO_SIZE;
        }

        Ok(cfg)
    }

    /// Macro string for a Zxx parameter, using the host's selected SFx
    /// macro below 0x80.
    pub fn zxx_macro(&self, sfx: usize, param: u8) -> &str {
        if param < 0x80 {
            self.sfx.get(sfx).map(|s| s.as_str()).unwrap_or("")
        } else {
            self.zxx.get((param - 0x80) as usize).map(|s| s.as_str()).unwrap_or("")
        }
    }
}


/// Values substituted for the variable letters of a macro string.
#[derive(Debug, Clone, Copy, Default)]
pub struct MacroContext {
    pub param   : u8,
    pub note    : u8,
    pub velocity: u8,
    pub volume  : u8,
    pub pan     : u8,
    pub channel : u8,
}

/// Translate a macro string to the MIDI bytes it sends.
pub fn translate(text: &str, ctx: &MacroContext) -> Vec<u8> {
    let mut out = Vec::new();
    let mut nibble: Option<u8> = None;

    for c in text.chars() {
        if let Some(d) = c.to_digit(16).filter(|_| c.is_ascii_digit() || c.is_ascii_uppercase()) {
            match nibble.take() {
                Some(hi) => out.push((hi << 4) | d as u8),
                None     => nibble = Some(d as u8),
            }
            continue
        }

        let value = match c {
            'z' => ctx.param & 0x7f,
            'n' => ctx.note & 0x7f,
            'v' => ctx.velocity & 0x7f,
            'u' => ctx.volume & 0x7f,
            'x' => ctx.pan & 0x7f,
            'c' => ctx.channel & 0x0f,
            _   => continue,
        };

        if let Some(hi) = nibble.take() {
            out.push(hi);
        }
        out.push(value);
    }

    if let Some(hi) = nibble {
        out.push(hi);
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacroAction {
    SetCutoff(u8),
    SetResonance(u8),
}

/// Internal device messages understood by the replayer. Anything else
/// would go to an external device and is dropped.
pub fn interpret(msg: &[u8]) -> Option<MacroAction> {
    match msg {
        [0xf0, 0xf0, 0x00, v, ..] => Some(MacroAction::SetCutoff(*v & 0x7f)),
        [0xf0, 0xf0, 0x01, v, ..] => Some(MacroAction::SetResonance(*v & 0x7f)),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_macros() {
        let cfg = MidiConfig::new();
        let ctx = MacroContext { param: 0x40, ..Default::default() };
        let msg = translate(cfg.zxx_macro(0, 0x40), &ctx);
        assert_eq!(msg, vec![0xf0, 0xf0, 0x00, 0x40]);
        assert_eq!(interpret(&msg), Some(MacroAction::SetCutoff(0x40)));

        let msg = translate(cfg.zxx_macro(0, 0x83), &ctx);
        assert_eq!(interpret(&msg), Some(MacroAction::SetResonance(0x18)));

        // unconfigured macros do nothing
        assert!(translate(cfg.zxx_macro(3, 0x10), &ctx).is_empty());
        assert_eq!(interpret(&translate(cfg.zxx_macro(0, 0x90), &ctx)), None);
    }

    #[test]
    fn test_translate_variables() {
        let ctx = MacroContext { note: 60, velocity: 100, channel: 3, ..Default::default() };
        assert_eq!(translate("9c n v", &ctx), vec![0x09, 3, 60, 100]);
        assert_eq!(translate("F0 F0 01 7F", &ctx), vec![0xf0, 0xf0, 0x01, 0x7f]);
    }

    #[test]
    fn test_load() {
        let mut b = vec![0_u8; MIDI_CONFIG_SIZE + 4];
        b[4 + NUM_GLOBAL * MACRO_SIZE..][..7].copy_from_slice(b"F0F001z");
        let cfg = MidiConfig::load(&b, 4).unwrap();
        assert_eq!(cfg.sfx[0], "F0F001z");
        assert_eq!(cfg.zxx.len(), NUM_ZXX);
        assert!(MidiConfig::load(&b, 5).is_err());
    }
}
