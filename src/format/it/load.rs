use crate::format::{self, Format, Loader, ProbeInfo};
use crate::format::it::*;
use crate::format::it::codec;
use crate::module::{Instrument, Module, Sample};
use crate::module::envelope::{self, Envelope, EnvelopeNode};
use crate::module::instrument::{DuplicateCheckAction, DuplicateCheckType, NewNoteAction, SampleMap};
use crate::module::sample::{LoopMode, Waveform};
use crate::util::{BinaryRead, C5_RATE};
use crate::{Error, MAX_CHANNELS, MAX_KEYS};

const MAX_INSTRUMENTS: usize = 255;
const MAX_SAMPLES    : usize = 255;
const MAX_PATTERNS   : usize = 240;
const MAX_ROWS       : usize = 200;
const MAX_SAMPLE_LEN : usize = 0x1000_0000;

const SMP_PRESENT   : u8 = 0x01;
const SMP_16BIT     : u8 = 0x02;
const SMP_STEREO    : u8 = 0x04;
const SMP_COMPRESSED: u8 = 0x08;
const SMP_LOOP      : u8 = 0x10;
const SMP_SUSTAIN   : u8 = 0x20;
const SMP_PINGPONG  : u8 = 0x40;
const SMP_SUSTAIN_PP: u8 = 0x80;

const CVT_SIGNED    : u8 = 0x01;
const CVT_DELTA     : u8 = 0x04;
const CVT_ADPCM     : u8 = 0xff;

#[derive(Clone, Copy)]
enum EnvelopeKind {
    Volume,
    Pan,
    Pitch,
}

/// Impulse Tracker module loader
pub struct ItLoader;

impl ItLoader {
    fn load_envelope(&self, b: &[u8], ofs: usize, kind: EnvelopeKind) -> Result<Envelope, Error> {
        let mut env = Envelope::new();
        env.flags = b.read8(ofs)?;
        let num = (b.read8(ofs + 1)? as usize).min(envelope::MAX_NODES);
        env.lpb = b.read8(ofs + 2)? as usize;
        env.lpe = b.read8(ofs + 3)? as usize;
        env.slb = b.read8(ofs + 4)? as usize;
        env.sle = b.read8(ofs + 5)? as usize;

        for i in 0..num {
            let value = b.read8i(ofs + 6 + i * 3)?;
            let tick = b.read16l(ofs + 7 + i * 3)?;
            let value = match kind {
                EnvelopeKind::Volume => value.max(0).min(64),
                _                    => value.max(-32).min(32),
            };
            env.nodes.push(EnvelopeNode { tick, value });
        }

        if !matches!(kind, EnvelopeKind::Pitch) {
            env.flags &= !envelope::ENV_FILTER;
        }

        env.sanity_check();
        Ok(env)
    }

    fn load_keyboard(&self, b: &[u8], ofs: usize, ins: &mut Instrument) -> Result<(), Error> {
        for i in 0..MAX_KEYS {
            let note = b.read8(ofs + i * 2)?;
            let sample = b.read8(ofs + i * 2 + 1)?;
            ins.keymap.set(i, SampleMap { sample, note });
        }
        Ok(())
    }

    // Instrument format saved by IT 2.00 and later
    fn load_instrument(&self, b: &[u8], i: usize, ofs: usize) -> Result<Instrument, Error> {
        if b.read32b(ofs)? != magic4!('I', 'M', 'P', 'I') {
            return Err(Error::Load("bad instrument magic"))
        }

        let mut ins = Instrument::new();
        ins.num        = i + 1;
        ins.filename   = b.read_string(ofs + 0x04, 12)?;
        ins.nna        = NewNoteAction::from_u8(b.read8(ofs + 0x11)?);
        ins.dct        = DuplicateCheckType::from_u8(b.read8(ofs + 0x12)?);
        ins.dca        = DuplicateCheckAction::from_u8(b.read8(ofs + 0x13)?);
        ins.fadeout    = b.read16l(ofs + 0x14)?.min(1024);
        ins.pps        = b.read8i(ofs + 0x16)?.max(-32).min(32);
        ins.ppc        = b.read8(ofs + 0x17)?.min(119);
        ins.global_vol = b.read8(ofs + 0x18)?.min(128);
        let dfp        = b.read8(ofs + 0x19)?;
        ins.pan        = if dfp & 0x80 == 0 { Some(dfp.min(64)) } else { None };
        ins.rand_vol   = b.read8(ofs + 0x1a)?.min(100);
        ins.rand_pan   = b.read8(ofs + 0x1b)?.min(64);
        ins.name       = b.read_string(ofs + 0x20, 26)?;
        let ifc        = b.read8(ofs + 0x3a)?;
        let ifr        = b.read8(ofs + 0x3b)?;
        ins.cutoff     = if ifc & 0x80 != 0 { Some(ifc & 0x7f) } else { None };
        ins.resonance  = if ifr & 0x80 != 0 { Some(ifr & 0x7f) } else { None };

        self.load_keyboard(b, ofs + 0x40, &mut ins)?;

        ins.vol_env   = self.load_envelope(b, ofs + 0x130, EnvelopeKind::Volume)?;
        ins.pan_env   = self.load_envelope(b, ofs + 0x182, EnvelopeKind::Pan)?;
        ins.pitch_env = self.load_envelope(b, ofs + 0x1d4, EnvelopeKind::Pitch)?;

        debug!("instrument {}: {:?} nna={:?} dct={:?}", ins.num, ins.name, ins.nna, ins.dct);

        Ok(ins)
    }

    // Instrument format of files compatible with IT 1.xx
    fn load_old_instrument(&self, b: &[u8], i: usize, ofs: usize) -> Result<Instrument, Error> {
        if b.read32b(ofs)? != magic4!('I', 'M', 'P', 'I') {
            return Err(Error::Load("bad instrument magic"))
        }

        let mut ins = Instrument::new();
        ins.num      = i + 1;
        ins.filename = b.read_string(ofs + 0x04, 12)?;
        let flags    = b.read8(ofs + 0x11)?;
        ins.fadeout  = (b.read16l(ofs + 0x18)? as u32 * 2).min(1024) as u16;
        ins.nna      = NewNoteAction::from_u8(b.read8(ofs + 0x1a)?);
        if b.read8(ofs + 0x1b)? != 0 {
            ins.dct = DuplicateCheckType::Note;
            ins.dca = DuplicateCheckAction::Cut;
        }
        ins.name     = b.read_string(ofs + 0x20, 26)?;

        self.load_keyboard(b, ofs + 0x40, &mut ins)?;

        let mut env = Envelope::new();
        env.flags = flags & (envelope::ENV_ON | envelope::ENV_LOOP | envelope::ENV_SUSTAIN);
        env.lpb = b.read8(ofs + 0x12)? as usize;
        env.lpe = b.read8(ofs + 0x13)? as usize;
        env.slb = b.read8(ofs + 0x14)? as usize;
        env.sle = b.read8(ofs + 0x15)? as usize;
        for n in 0..envelope::MAX_NODES {
            let tick = b.read8(ofs + 0x1f8 + n * 2)?;
            if tick == 0xff {
                break
            }
            let value = b.read8(ofs + 0x1f9 + n * 2)?.min(64) as i8;
            env.nodes.push(EnvelopeNode { tick: tick as u16, value });
        }
        env.sanity_check();
        ins.vol_env = env;

        debug!("old instrument {}: {:?}", ins.num, ins.name);

        Ok(ins)
    }

    fn load_sample(&self, b: &[u8], i: usize, ofs: usize) -> Result<Sample, Error> {
        if b.read32b(ofs)? != magic4!('I', 'M', 'P', 'S') {
            return Err(Error::Load("bad sample magic"))
        }

        let mut smp = Sample::new();
        smp.num         = i + 1;
        smp.filename    = b.read_string(ofs + 0x04, 12)?;
        smp.global_vol  = b.read8(ofs + 0x11)?.min(64);
        let flags       = b.read8(ofs + 0x12)?;
        smp.volume      = b.read8(ofs + 0x13)?.min(64);
        smp.name        = b.read_string(ofs + 0x14, 26)?;
        let cvt         = b.read8(ofs + 0x2e)?;
        let dfp         = b.read8(ofs + 0x2f)?;
        smp.pan         = if dfp & 0x80 != 0 { Some((dfp & 0x7f).min(64)) } else { None };
        let length      = b.read32l(ofs + 0x30)? as usize;
        smp.loop_start  = b.read32l(ofs + 0x34)? as usize;
        smp.loop_end    = b.read32l(ofs + 0x38)? as usize;
        smp.rate        = match b.read32l(ofs + 0x3c)? {
                              0 => C5_RATE,
                              r => r.min(9_999_999),
                          };
        smp.sloop_start = b.read32l(ofs + 0x40)? as usize;
        smp.sloop_end   = b.read32l(ofs + 0x44)? as usize;
        let ptr         = b.read32l(ofs + 0x48)? as usize;
        smp.vib_speed   = b.read8(ofs + 0x4c)?.min(64);
        smp.vib_depth   = b.read8(ofs + 0x4d)?.min(64);
        smp.vib_rate    = b.read8(ofs + 0x4e)?;
        smp.vib_wave    = Waveform::from_u8(b.read8(ofs + 0x4f)?);

        smp.loop_mode = loop_mode(flags & SMP_LOOP != 0, flags & SMP_PINGPONG != 0);
        smp.sloop_mode = loop_mode(flags & SMP_SUSTAIN != 0, flags & SMP_SUSTAIN_PP != 0);

        if flags & SMP_PRESENT == 0 || length == 0 {
            smp.sanity_check();
            return Ok(smp)
        }

        match self.load_sample_data(b, ptr, length, flags, cvt) {
            Ok((data, channels)) => smp.store(data, channels),
            Err(e) => {
                warn!("sample {}: can't load data: {}", smp.num, e);
                smp.store(Vec::new(), 1);
            }
        }

        debug!("sample {}: {:?} size={} rate={} loop={:?}", smp.num, smp.name, smp.size, smp.rate, smp.loop_mode);

        Ok(smp)
    }

    // Decode sample data to interleaved 16-bit frames.
    fn load_sample_data(&self, b: &[u8], ptr: usize, length: usize, flags: u8, cvt: u8) -> Result<(Vec<i16>, usize), Error> {
        if length > MAX_SAMPLE_LEN {
            return Err(Error::Load("sample too long"))
        }

        let channels = if flags & SMP_STEREO != 0 { 2 } else { 1 };
        let is16 = flags & SMP_16BIT != 0;
        let mut src = b.slice(ptr, b.len().saturating_sub(ptr))?;
        let mut planes: Vec<Vec<i16>> = Vec::with_capacity(channels);

        for _ in 0..channels {
            let (plane, used) = if flags & SMP_COMPRESSED != 0 {
                let it215 = cvt & CVT_DELTA != 0;
                if is16 {
                    codec::decompress16(src, length, it215)?
                } else {
                    let (d, used) = codec::decompress8(src, length, it215)?;
                    (d.iter().map(|&x| (x as i16) << 8).collect(), used)
                }
            } else if cvt == CVT_ADPCM && !is16 {
                let (d, used) = codec::adpcm4(src, length)?;
                (d.iter().map(|&x| (x as i16) << 8).collect(), used)
            } else if is16 {
                let raw = src.slice(0, length * 2)?;
                let mut d = raw.chunks(2).map(|x| u16::from_le_bytes([x[0], x[1]])).map(|x| {
                    if cvt & CVT_SIGNED != 0 { x as i16 } else { (x ^ 0x8000) as i16 }
                }).collect::<Vec<i16>>();
                if cvt & CVT_DELTA != 0 {
                    codec::delta16(&mut d);
                }
                (d, length * 2)
            } else {
                let raw = src.slice(0, length)?;
                let mut d = raw.iter().map(|&x| {
                    if cvt & CVT_SIGNED != 0 { x as i8 } else { (x ^ 0x80) as i8 }
                }).collect::<Vec<i8>>();
                if cvt & CVT_DELTA != 0 {
                    codec::delta8(&mut d);
                }
                (d.iter().map(|&x| (x as i16) << 8).collect(), length)
            };

            planes.push(plane);
            src = &src[used.min(src.len())..];
        }

        if channels == 1 {
            return Ok((planes.remove(0), 1))
        }

        let mut data = Vec::with_capacity(length * 2);
        for i in 0..length {
            data.push(planes[0][i]);
            data.push(planes[1][i]);
        }
        Ok((data, 2))
    }

    fn load_pattern(&self, b: &[u8], ofs: usize) -> Result<ItPattern, Error> {
        let size = b.read16l(ofs)? as usize;
        let rows = b.read16l(ofs + 2)? as usize;
        if rows == 0 || rows > MAX_ROWS {
            return Err(Error::Load("invalid number of rows"))
        }
        let data = b.slice(ofs + 8, size.min(b.len().saturating_sub(ofs + 8)))?;
        if data.len() < size {
            warn!("pattern data truncated ({} of {} bytes)", data.len(), size);
        }
        Ok(ItPattern::new(rows, data.to_vec()))
    }

    fn read_pointers(&self, b: &[u8], ofs: usize, num: usize) -> Result<Vec<usize>, Error> {
        let mut v = Vec::with_capacity(num);
        for i in 0..num {
            v.push(b.read32l(ofs + i * 4)? as usize);
        }
        Ok(v)
    }
}

fn loop_mode(on: bool, pingpong: bool) -> LoopMode {
    match (on, pingpong) {
        (true, false) => LoopMode::Forward,
        (true, true)  => LoopMode::PingPong,
        _             => LoopMode::None,
    }
}

// Highest channel referenced by any pattern, plus one.
fn used_channels(patterns: &[ItPattern]) -> usize {
    let mut max = 0;
    for p in patterns {
        let mut memory = [CellMemory::default(); MAX_CHANNELS];
        let mut reader = PatternReader::new();
        for _ in 0..p.rows {
            if reader.read_row(&p.data, &mut memory, |c, _| max = max.max(c + 1)).is_err() {
                break
            }
        }
    }
    max.max(1)
}

fn creator_name(cwt: u16) -> String {
    let ver_major = (cwt & 0xf00) >> 8;
    let ver_minor = cwt & 0x0ff;
    match cwt >> 12 {
        0 => format!("Impulse Tracker {}.{:02x}", ver_major, ver_minor),
        1 => "Schism Tracker".to_owned(),
        5 => format!("OpenMPT {}.{:02x}", ver_major, ver_minor),
        6 => format!("BeRoTracker {}.{:02x}", ver_major, ver_minor),
        _ => format!("unknown ({:04x})", cwt),
    }
}

impl Loader for ItLoader {
    fn name(&self) -> &'static str {
        "Impulse Tracker IT"
    }

    fn probe(&self, b: &[u8], player_id: &str) -> Result<ProbeInfo, Error> {
        if b.len() < 0xc0 {
            return Err(Error::Format(format!("file too short ({})", b.len())));
        }

        if b.read32b(0)? == magic4!('I', 'M', 'P', 'M') {
            format::check_accepted(player_id, "it")?;
            Ok(ProbeInfo{format: Format::It, title: b.read_string(4, 26)?})
        } else {
            Err(Error::Format("bad magic".to_owned()))
        }
    }

    fn load(self: Box<Self>, b: &[u8], info: ProbeInfo) -> Result<Module, Error> {
        if info.format != Format::It {
            return Err(Error::Format("unsupported format".to_owned()));
        }

        let song_name = b.read_string(0x04, 26)?;
        let hilight   = b.read16l(0x1e)?;
        let ord_num   = b.read16l(0x20)? as usize;
        let ins_num   = b.read16l(0x22)? as usize;
        let smp_num   = b.read16l(0x24)? as usize;
        let pat_num   = b.read16l(0x26)? as usize;
        let cwt_v     = b.read16l(0x28)?;
        let cmwt      = b.read16l(0x2a)?;
        let flags     = b.read16l(0x2c)?;
        let special   = b.read16l(0x2e)?;
        let gv        = b.read8(0x30)?.min(128);
        let mv        = b.read8(0x31)?.min(128);
        let is        = b.read8(0x32)?;
        let it        = b.read8(0x33)?;
        let sep       = b.read8(0x34)?.min(128);
        let pwd       = b.read8(0x35)?;
        let msg_len   = b.read16l(0x36)? as usize;
        let msg_ofs   = b.read32l(0x38)? as usize;

        if ins_num > MAX_INSTRUMENTS || smp_num > MAX_SAMPLES || pat_num > MAX_PATTERNS {
            return Err(Error::Format(format!("invalid header: {} instruments, {} samples, {} patterns",
                ins_num, smp_num, pat_num)));
        }

        let mut chn_pan = [0_u8; MAX_CHANNELS];
        let mut chn_vol = [0_u8; MAX_CHANNELS];
        chn_pan.copy_from_slice(b.slice(0x40, MAX_CHANNELS)?);
        for (i, v) in b.slice(0x80, MAX_CHANNELS)?.iter().enumerate() {
            chn_vol[i] = (*v).min(64);
        }

        // Orders
        let orders = b.slice(0xc0, ord_num)?.to_vec();
        let mut ofs = 0xc0 + ord_num;

        // Instrument, sample and pattern pointers
        let ins_ptr = self.read_pointers(b, ofs, ins_num)?;
        ofs += ins_num * 4;
        let smp_ptr = self.read_pointers(b, ofs, smp_num)?;
        ofs += smp_num * 4;
        let pat_ptr = self.read_pointers(b, ofs, pat_num)?;
        ofs += pat_num * 4;

        // Edit history
        if special & SPECIAL_HISTORY != 0 {
            let num = b.read16l(ofs)? as usize;
            ofs += 2 + num * 8;
        }

        let midi = if special & SPECIAL_MIDI_CFG != 0 {
            match MidiConfig::load(b, ofs) {
                Ok(cfg) => cfg,
                Err(e)  => {
                    warn!("can't load MIDI configuration: {}", e);
                    MidiConfig::new()
                }
            }
        } else {
            MidiConfig::new()
        };

        let message = if special & SPECIAL_MESSAGE != 0 && msg_len > 0 {
            match b.slice(msg_ofs, msg_len) {
                Ok(m)  => {
                    let end = m.iter().position(|&x| x == 0).unwrap_or(m.len());
                    String::from_utf8_lossy(&m[..end]).replace('\r', "\n")
                }
                Err(_) => {
                    warn!("song message out of range");
                    String::new()
                }
            }
        } else {
            String::new()
        };

        // Load instruments
        let mut instruments = Vec::<Instrument>::with_capacity(ins_num);
        for (i, &p) in ins_ptr.iter().enumerate() {
            let res = if cmwt < 0x200 {
                self.load_old_instrument(b, i, p)
            } else {
                self.load_instrument(b, i, p)
            };
            let ins = match res {
                Ok(ins) => ins,
                Err(e)  => {
                    warn!("instrument {}: {}", i + 1, e);
                    Instrument { num: i + 1, ..Instrument::new() }
                }
            };
            instruments.push(ins);
        }

        // Load samples
        let mut samples = Vec::<Sample>::with_capacity(smp_num);
        for (i, &p) in smp_ptr.iter().enumerate() {
            let smp = match self.load_sample(b, i, p) {
                Ok(smp) => smp,
                Err(e)  => {
                    warn!("sample {}: {}", i + 1, e);
                    let mut smp = Sample::new();
                    smp.num = i + 1;
                    smp
                }
            };
            samples.push(smp);
        }

        // Load patterns
        let mut patterns = Vec::<ItPattern>::with_capacity(pat_num);
        for (i, &p) in pat_ptr.iter().enumerate() {
            let pat = if p == 0 {
                ItPattern::new(DEFAULT_ROWS, Vec::new())
            } else {
                match self.load_pattern(b, p) {
                    Ok(pat) => pat,
                    Err(e)  => {
                        warn!("pattern {}: {}", i, e);
                        ItPattern::new(DEFAULT_ROWS, Vec::new())
                    }
                }
            };
            debug!("pattern {}: {} rows, {} bytes", i, pat.rows, pat.data.len());
            patterns.push(pat);
        }

        let channels = used_channels(&patterns);

        let data = ItData {
            song_name,
            hilight,
            cwt_v,
            cmwt,
            flags,
            special,
            global_vol : gv,
            mix_vol    : mv,
            speed      : if is == 0 { 6 } else { is },
            tempo      : if it < 32 { 125 } else { it },
            separation : sep,
            pwd,
            chn_pan,
            chn_vol,
            orders,
            instruments,
            samples,
            patterns,
            message,
            midi,
            channels,
        };

        let m = Module {
            format_id  : "it",
            description: format!("Impulse Tracker IT (cmwt {}.{:02x})", cmwt >> 8, cmwt & 0xff),
            creator    : creator_name(cwt_v),
            player     : "it",
            data       : Box::new(data),
        };

        Ok(m)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleData;

    fn put16(b: &mut [u8], ofs: usize, v: u16) {
        b[ofs..ofs + 2].copy_from_slice(&v.to_le_bytes());
    }

    fn put32(b: &mut [u8], ofs: usize, v: u32) {
        b[ofs..ofs + 4].copy_from_slice(&v.to_le_bytes());
    }

    // Small sample-mode file: 2 orders, 1 sample, 1 pattern.
    fn build_module(flags: u16, special: u16, cmwt: u16) -> Vec<u8> {
        let mut b = vec![0_u8; 0x400];
        b[0..4].copy_from_slice(b"IMPM");
        b[4..8].copy_from_slice(b"test");
        put16(&mut b, 0x20, 2);
        put16(&mut b, 0x22, 0);
        put16(&mut b, 0x24, 1);
        put16(&mut b, 0x26, 1);
        put16(&mut b, 0x28, 0x0214);
        put16(&mut b, 0x2a, cmwt);
        put16(&mut b, 0x2c, flags);
        put16(&mut b, 0x2e, special);
        b[0x30] = 128;
        b[0x31] = 48;
        b[0x32] = 3;
        b[0x33] = 150;
        b[0x34] = 128;
        for i in 0..64 {
            b[0x40 + i] = 32;
            b[0x80 + i] = 64;
        }
        b[0xc0] = 0;
        b[0xc1] = 255;
        put32(&mut b, 0xc2, 0x100);     // sample
        put32(&mut b, 0xc6, 0x200);     // pattern

        // sample header
        let s = 0x100;
        b[s..s + 4].copy_from_slice(b"IMPS");
        b[s + 0x11] = 64;
        b[s + 0x12] = SMP_PRESENT | SMP_LOOP;
        b[s + 0x13] = 48;
        b[s + 0x14..s + 0x18].copy_from_slice(b"beep");
        b[s + 0x2e] = CVT_SIGNED;
        put32(&mut b, s + 0x30, 4);
        put32(&mut b, s + 0x34, 0);
        put32(&mut b, s + 0x38, 4);
        put32(&mut b, s + 0x3c, 0);
        put32(&mut b, s + 0x48, 0x180);
        b[0x180..0x184].copy_from_slice(&[0x10, 0xf0, 0x7f, 0x80]);

        // pattern: 2 rows, chn 3 note C-5 sample 1
        let p = 0x200;
        let data = [0x83, 0x03, 60, 1, 0, 0];
        put16(&mut b, p, data.len() as u16);
        put16(&mut b, p + 2, 2);
        b[p + 8..p + 8 + data.len()].copy_from_slice(&data);

        b
    }

    fn load(b: &[u8]) -> Module {
        let loader = Box::new(ItLoader);
        let info = loader.probe(b, "").unwrap();
        loader.load(b, info).unwrap()
    }

    #[test]
    fn test_probe() {
        let b = build_module(FLAG_STEREO, 0, 0x214);
        let info = ItLoader.probe(&b, "").unwrap();
        assert_eq!(info.format, Format::It);
        assert_eq!(info.title, "test");

        let mut bad = b.clone();
        bad[0] = b'X';
        assert!(ItLoader.probe(&bad, "").is_err());
        assert!(ItLoader.probe(&b[..0x80], "").is_err());
    }

    #[test]
    fn test_load_sample_mode() {
        let b = build_module(FLAG_STEREO | FLAG_LINEAR, 0, 0x214);
        let m = load(&b);
        assert_eq!(m.format_id, "it");
        assert_eq!(m.creator, "Impulse Tracker 2.14");
        let data = m.data.as_any().downcast_ref::<ItData>().unwrap();

        assert!(!data.instrument_mode());
        assert!(data.linear_slides());
        assert_eq!(data.speed, 3);
        assert_eq!(data.tempo, 150);
        assert_eq!(data.orders, vec![0, 255]);
        assert_eq!(data.channels(), 3);

        let smp = &data.samples[0];
        assert_eq!(smp.name, "beep");
        assert_eq!(smp.rate, C5_RATE);
        assert_eq!(smp.volume, 48);
        assert_eq!(smp.loop_mode, LoopMode::Forward);
        assert_eq!(smp.data().to_vec(), vec![0x1000_i16, -0x1000, 0x7f00, -0x8000]);

        let e = data.event(0, 0, 2);
        assert!(e.has_note() && e.has_ins());
        assert_eq!(e.note, 60);
        assert!(!data.event(0, 1, 2).has_note());
    }

    #[test]
    fn test_corrupt_sample_is_loaded_empty() {
        let mut b = build_module(FLAG_STEREO, 0, 0x214);
        put32(&mut b, 0x148, 0xfffff0);     // data pointer past end of file
        let m = load(&b);
        let data = m.data.as_any().downcast_ref::<ItData>().unwrap();
        assert!(data.samples[0].is_empty());
        assert_eq!(data.patterns.len(), 1);
    }

    #[test]
    fn test_message_and_midi_config() {
        let mut b = build_module(FLAG_STEREO, SPECIAL_MESSAGE | SPECIAL_MIDI_CFG, 0x214);
        b.resize(0x3000, 0);
        // MIDI config right after the pointers
        b[0xca..0xca + 4].copy_from_slice(b"FF00");
        b[0xca + 32 * 9..0xca + 32 * 9 + 7].copy_from_slice(b"F0F001z");
        put16(&mut b, 0x36, 5);
        put32(&mut b, 0x38, 0x2000);
        b[0x2000..0x2005].copy_from_slice(b"hi\rho");

        let m = load(&b);
        let data = m.data.as_any().downcast_ref::<ItData>().unwrap();
        assert_eq!(data.message, "hi\nho");
        assert_eq!(data.midi.global[0], "FF00");
        assert_eq!(data.midi.sfx[0], "F0F001z");
    }

    #[test]
    fn test_instrument_envelopes() {
        let mut b = build_module(FLAG_STEREO | FLAG_INSTRUMENTS, 0, 0x214);
        b.resize(0x800, 0);
        // move pointer table to make room for one instrument
        put16(&mut b, 0x22, 1);
        put32(&mut b, 0xc2, 0x400);
        put32(&mut b, 0xc6, 0x100);
        put32(&mut b, 0xca, 0x200);

        let i = 0x400;
        b[i..i + 4].copy_from_slice(b"IMPI");
        b[i + 0x11] = 3;                // NNA fade
        b[i + 0x12] = 1;                // DCT note
        put16(&mut b, i + 0x14, 256);
        b[i + 0x18] = 128;
        b[i + 0x19] = 0x80 | 20;        // no default pan
        b[i + 0x3a] = 0x80 | 100;
        for k in 0..120 {
            b[i + 0x40 + k * 2] = k as u8;
            b[i + 0x41 + k * 2] = 1;
        }
        let e = i + 0x130;
        b[e] = envelope::ENV_ON | envelope::ENV_SUSTAIN;
        b[e + 1] = 2;
        b[e + 4] = 0;
        b[e + 5] = 0;
        b[e + 6] = 64;
        put16(&mut b, e + 7, 0);
        b[e + 9] = 100;                 // clamped to 64
        put16(&mut b, e + 10, 10);
        b[i + 0x1d4] = envelope::ENV_ON | envelope::ENV_FILTER;

        let m = load(&b);
        let data = m.data.as_any().downcast_ref::<ItData>().unwrap();
        let ins = &data.instruments[0];
        assert_eq!(ins.nna, NewNoteAction::Fade);
        assert_eq!(ins.dct, DuplicateCheckType::Note);
        assert_eq!(ins.fadeout, 256);
        assert_eq!(ins.pan, None);
        assert_eq!(ins.cutoff, Some(100));
        assert_eq!(ins.resonance, None);
        assert_eq!(ins.map_note(60), Some((1, 60)));
        assert_eq!(ins.vol_env.nodes.len(), 2);
        assert_eq!(ins.vol_env.nodes[1].value, 64);
        assert!(ins.vol_env.has_sustain());
        assert!(ins.pitch_env.is_filter());
        assert!(!ins.pitch_env.enabled());
    }

    #[test]
    fn test_old_instrument() {
        let mut b = build_module(FLAG_STEREO | FLAG_INSTRUMENTS, 0, 0x100);
        b.resize(0x800, 0);
        put16(&mut b, 0x22, 1);
        put32(&mut b, 0xc2, 0x400);
        put32(&mut b, 0xc6, 0x100);
        put32(&mut b, 0xca, 0x200);

        let i = 0x400;
        b[i..i + 4].copy_from_slice(b"IMPI");
        b[i + 0x11] = envelope::ENV_ON;
        put16(&mut b, i + 0x18, 100);
        b[i + 0x1b] = 1;
        b[i + 0x20..i + 0x23].copy_from_slice(b"old");
        b[i + 0x1f8..i + 0x1fe].copy_from_slice(&[0, 64, 20, 0, 0xff, 0]);

        let m = load(&b);
        let data = m.data.as_any().downcast_ref::<ItData>().unwrap();
        let ins = &data.instruments[0];
        assert_eq!(ins.name, "old");
        assert_eq!(ins.fadeout, 200);
        assert_eq!(ins.dct, DuplicateCheckType::Note);
        assert_eq!(ins.vol_env.nodes.len(), 2);
        assert!(ins.vol_env.enabled());
    }

    #[test]
    fn test_compressed_stereo_sample() {
        // two 1-sample blocks at width 9: left = 5, right = -3
        let left = [2_u8, 0, 0x05, 0x00];
        let right = [2_u8, 0, 0xfd, 0x00];
        let mut src = left.to_vec();
        src.extend(&right);

        let mut b = vec![0_u8; 0x10];
        b.extend(&src);
        let (data, channels) = ItLoader.load_sample_data(&b, 0x10, 1, SMP_PRESENT | SMP_STEREO | SMP_COMPRESSED, CVT_SIGNED).unwrap();
        assert_eq!(channels, 2);
        assert_eq!(data, vec![5 << 8, -3 << 8]);
    }
}
