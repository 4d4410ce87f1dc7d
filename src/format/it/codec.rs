// IT 2.14/2.15 sample compression
//
// Data is split in blocks of 0x8000 (8 bit) or 0x4000 (16 bit) samples,
// each prefixed with its packed length. Values are stored LSB first with
// a variable bit width; out-of-band values change the width. IT 2.15
// integrates the decoded values twice instead of once.

use crate::util::BinaryRead;
use crate::Error;

struct BitReader<'a> {
    buf   : &'a [u8],
    pos   : usize,
    bitbuf: u32,
    bitnum: u32,
}

impl<'a> BitReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        BitReader { buf, pos: 0, bitbuf: 0, bitnum: 0 }
    }

    fn read(&mut self, n: u32) -> Result<u32, Error> {
        let mut value = 0;
        for i in 0..n {
            if self.bitnum == 0 {
                self.bitbuf = self.buf.read8(self.pos)? as u32;
                self.pos += 1;
                self.bitnum = 8;
            }
            value |= (self.bitbuf & 1) << i;
            self.bitbuf >>= 1;
            self.bitnum -= 1;
        }
        Ok(value)
    }
}

// Read the packed length of the block at `ofs` and return its contents.
fn read_block(src: &[u8], ofs: usize) -> Result<&[u8], Error> {
    let size = src.read16l(ofs)? as usize;
    src.slice(ofs + 2, size)
}

fn next_width(value: u32, width: u32) -> u32 {
    if value < width { value } else { value + 1 }
}

/// Decompress `len` 8-bit samples. Returns the samples and the number of
/// source bytes consumed.
pub fn decompress8(src: &[u8], len: usize, it215: bool) -> Result<(Vec<i8>, usize), Error> {
    let mut out = Vec::with_capacity(len);
    let mut ofs = 0;

    while out.len() < len {
        let block = read_block(src, ofs)?;
        ofs += 2 + block.len();

        let mut r = BitReader::new(block);
        let blklen = (len - out.len()).min(0x8000);
        let mut width = 9;
        let mut d1 = 0_i8;
        let mut d2 = 0_i8;
        let mut pos = 0;

        while pos < blklen {
            let mut value = r.read(width)?;

            match width {
                1..=6 => {
                    if value == 1 << (width - 1) {
                        value = r.read(3)? + 1;
                        width = next_width(value, width);
                        continue
                    }
                }
                7..=8 => {
                    let border = (0xff >> (9 - width)) - 4;
                    if value > border && value <= border + 8 {
                        value -= border;
                        width = next_width(value, width);
                        continue
                    }
                }
                9 => {
                    if value & 0x100 != 0 {
                        width = (value + 1) & 0xff;
                        if width == 0 || width > 9 {
                            return Err(Error::Load("invalid bit width"))
                        }
                        continue
                    }
                }
                _ => return Err(Error::Load("invalid bit width")),
            }

            let v = if width < 8 {
                let shift = 8 - width;
                ((value << shift) as u8 as i8) >> shift
            } else {
                value as u8 as i8
            };

            d1 = d1.wrapping_add(v);
            d2 = d2.wrapping_add(d1);
            out.push(if it215 { d2 } else { d1 });
            pos += 1;
        }
    }

    Ok((out, ofs))
}

/// Decompress `len` 16-bit samples. Returns the samples and the number of
/// source bytes consumed.
pub fn decompress16(src: &[u8], len: usize, it215: bool) -> Result<(Vec<i16>, usize), Error> {
    let mut out = Vec::with_capacity(len);
    let mut ofs = 0;

    while out.len() < len {
        let block = read_block(src, ofs)?;
        ofs += 2 + block.len();

        let mut r = BitReader::new(block);
        let blklen = (len - out.len()).min(0x4000);
        let mut width = 17;
        let mut d1 = 0_i16;
        let mut d2 = 0_i16;
        let mut pos = 0;

        while pos < blklen {
            let mut value = r.read(width)?;

            match width {
                1..=6 => {
                    if value == 1 << (width - 1) {
                        value = r.read(4)? + 1;
                        width = next_width(value, width);
                        continue
                    }
                }
                7..=16 => {
                    let border = (0xffff >> (17 - width)) - 8;
                    if value > border && value <= border + 16 {
                        value -= border;
                        width = next_width(value, width);
                        continue
                    }
                }
                17 => {
                    if value & 0x10000 != 0 {
                        width = (value + 1) & 0xff;
                        if width == 0 || width > 17 {
                            return Err(Error::Load("invalid bit width"))
                        }
                        continue
                    }
                }
                _ => return Err(Error::Load("invalid bit width")),
            }

            let v = if width < 16 {
                let shift = 16 - width;
                ((value << shift) as u16 as i16) >> shift
            } else {
                value as u16 as i16
            };

            d1 = d1.wrapping_add(v);
            d2 = d2.wrapping_add(d1);
            out.push(if it215 { d2 } else { d1 });
            pos += 1;
        }
    }

    Ok((out, ofs))
}

/// Integrate delta-encoded 8-bit PCM in place.
pub fn delta8(data: &mut [i8]) {
    let mut acc = 0_i8;
    for x in data.iter_mut() {
        acc = acc.wrapping_add(*x);
        *x = acc;
    }
}

/// Integrate delta-encoded 16-bit PCM in place.
pub fn delta16(data: &mut [i16]) {
    let mut acc = 0_i16;
    for x in data.iter_mut() {
        acc = acc.wrapping_add(*x);
        *x = acc;
    }
}

/// 4-bit ADPCM: a 16-entry delta table followed by packed nibbles, low
/// nibble first. Returns the samples and the number of bytes consumed.
pub fn adpcm4(src: &[u8], len: usize) -> Result<(Vec<i8>, usize), Error> {
    let table = src.slice(0, 16)?;
    let packed = src.slice(16, (len + 1) / 2)?;

    let mut out = Vec::with_capacity(len);
    let mut acc = 0_i8;
    for &b in packed {
        for &nibble in &[b & 0x0f, b >> 4] {
            if out.len() >= len {
                break
            }
            acc = acc.wrapping_add(table[nibble as usize] as i8);
            out.push(acc);
        }
    }

    Ok((out, 16 + packed.len()))
}
