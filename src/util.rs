use byteorder::{ByteOrder, BigEndian, LittleEndian};
use crate::Error;

pub const NOTES: &[&str] = &[
    "C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-"
];

pub const C5_RATE: u32 = 8363;

#[macro_export]
macro_rules! magic4 {
    ( $a:expr, $b:expr, $c:expr, $d:expr ) => {
        (($a as u32) << 24) | (($b as u32) << 16) | (($c as u32) << 8) | ($d as u32)
    };
}

pub trait BinaryRead {
    fn read_string(&self, ofs: usize, size: usize) -> Result<String, Error>;
    fn read32b(&self, ofs: usize) -> Result<u32, Error>;
    fn read32l(&self, ofs: usize) -> Result<u32, Error>;
    fn read16l(&self, ofs: usize) -> Result<u16, Error>;
    fn read8(&self, ofs: usize) -> Result<u8, Error>;
    fn read8i(&self, ofs: usize) -> Result<i8, Error>;
    fn slice(&self, start: usize, size: usize) -> Result<&[u8], Error>;
}

impl BinaryRead for [u8] {
    fn read_string(&self, ofs: usize, size: usize) -> Result<String, Error> {
        let b = self.slice(ofs, size)?;
        let end = b.iter().position(|&x| x == 0).unwrap_or(size);
        Ok(String::from_utf8_lossy(&b[..end]).trim_end().to_string())
    }

    fn read32b(&self, ofs: usize) -> Result<u32, Error> {
        Ok(BigEndian::read_u32(self.slice(ofs, 4)?))
    }

    fn read32l(&self, ofs: usize) -> Result<u32, Error> {
        Ok(LittleEndian::read_u32(self.slice(ofs, 4)?))
    }

    fn read16l(&self, ofs: usize) -> Result<u16, Error> {
        Ok(LittleEndian::read_u16(self.slice(ofs, 2)?))
    }

    fn read8(&self, ofs: usize) -> Result<u8, Error> {
        check_buffer_size(self, ofs, 1)?;
        Ok(self[ofs])
    }

    fn read8i(&self, ofs: usize) -> Result<i8, Error> {
        check_buffer_size(self, ofs, 1)?;
        Ok(self[ofs] as i8)
    }

    fn slice(&self, start: usize, size: usize) -> Result<&[u8], Error> {
        check_buffer_size(self, start, size)?;
        Ok(&self[start..start + size])
    }
}

fn check_buffer_size(b: &[u8], ofs: usize, size: usize) -> Result<(), Error> {
    match ofs.checked_add(size) {
        Some(end) if end <= b.len() => Ok(()),
        _ => Err(Error::Load("short read")),
    }
}

/// Tracker-style note name, "C-5" for note 60.
pub fn note_name(note: u8) -> String {
    match note {
        0..=119 => format!("{}{}", NOTES[note as usize % 12], note / 12),
        254     => "^^^".to_owned(),
        255     => "===".to_owned(),
        _       => "~~~".to_owned(),
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_little_endian() {
        let b: &[u8] = &[0x34, 0x12, 0x78, 0x56, 0xff];
        assert_eq!(b.read16l(0).unwrap(), 0x1234);
        assert_eq!(b.read32l(0).unwrap(), 0x56781234);
        assert_eq!(b.read8i(4).unwrap(), -1);
    }

    #[test]
    fn test_short_read() {
        let b: &[u8] = &[1, 2, 3];
        assert!(b.read32l(0).is_err());
        assert!(b.read8(3).is_err());
        assert!(b.slice(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_read_string() {
        let b: &[u8] = b"song\0garbage";
        assert_eq!(b.read_string(0, 12).unwrap(), "song");
        assert_eq!(b.read32b(0).unwrap(), magic4!('s', 'o', 'n', 'g'));
    }

    #[test]
    fn test_note_name() {
        assert_eq!(note_name(60), "C-5");
        assert_eq!(note_name(61), "C#5");
        assert_eq!(note_name(255), "===");
        assert_eq!(note_name(254), "^^^");
        assert_eq!(note_name(200), "~~~");
    }
}
