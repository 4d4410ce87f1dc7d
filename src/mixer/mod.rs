use crate::mixer::filter::Filter;
use crate::mixer::interpolator::Interpolator;
use crate::module::sample::{LoopMode, Sample};
use crate::MAX_FRAMESIZE;

pub mod filter;
pub mod interpolator;

pub const SMIX_SHIFT: usize = 16;
const SMIX_MASK     : i64 = 0xffff;
const LIM16_HI      : i32 = 32767;
const LIM16_LO      : i32 = -32768;
const MAX_STEP      : u32 = 32 << SMIX_SHIFT;

/// Maximum voice gain, matching the range of the final volume.
pub const MAX_GAIN: i32 = 32768;


/// Mixer-side state of a playing voice: resampling position, loop
/// direction, output gains and filter history.
#[derive(Debug, Clone, Default)]
pub struct Voice {
    pub pos     : i64,   // 16.16 frames
    pub step    : u32,   // 16.16 frames per output frame
    pub reverse : bool,
    pub released: bool,  // sustain loop left
    pub vol_l   : i32,
    pub vol_r   : i32,
    pub ramp_out: bool,
    pub ended   : bool,
    pub filter  : Filter,
}

impl Voice {
    pub fn new() -> Self {
        Default::default()
    }

    /// Restart playback at frame `pos`.
    pub fn start(&mut self, pos: usize) {
        self.pos = (pos as i64) << SMIX_SHIFT;
        self.reverse = false;
        self.released = false;
        self.ramp_out = false;
        self.ended = false;
        self.filter.reset();
    }

    pub fn position(&self) -> usize {
        (self.pos >> SMIX_SHIFT).max(0) as usize
    }

    pub fn set_position(&mut self, pos: usize) {
        self.pos = (pos as i64) << SMIX_SHIFT;
    }

    pub fn set_frequency(&mut self, freq: u32, rate: u32) {
        if rate == 0 {
            self.step = 0;
            return
        }
        self.step = (((freq as u64) << SMIX_SHIFT) / rate as u64).min(u32::MAX as u64) as u32;
    }

    /// Set output gains from volume (0..32768), pan (0..64) and song mix
    /// volume (0..128). Surround plays both sides with the right channel
    /// phase inverted.
    pub fn set_gains(&mut self, vol: i32, pan: u8, surround: bool, mix_vol: i32) {
        let gain = vol.max(0).min(MAX_GAIN) * mix_vol / 128;
        if surround {
            self.vol_l = gain / 2;
            self.vol_r = -gain / 2;
        } else {
            let pan = pan.min(64) as i32;
            self.vol_l = gain * (64 - pan) / 64;
            self.vol_r = gain * pan / 64;
        }
    }
}


// Frame at position `k` following the active loop, zero outside the
// sample.
fn tap(smp: &Sample, k: i64, chn: usize, mode: LoopMode, ls: i64, le: i64) -> i32 {
    let len = le - ls;
    let k = if k >= le && len > 0 {
        match mode {
            LoopMode::Forward  => ls + (k - le) % len,
            LoopMode::PingPong => le - 1 - (k - le).min(len - 1),
            LoopMode::None     => k,
        }
    } else {
        k
    };
    if k < 0 {
        return 0
    }
    smp.frame(k as usize, chn)
}


pub struct Mixer {
    pub rate  : u32,
    pub interp: Interpolator,
    framesize : usize,
    buf32     : Vec<i32>,
    buffer    : Vec<i16>,
}

impl Mixer {
    pub fn new(rate: u32, interp: Interpolator) -> Self {
        Mixer {
            rate,
            interp,
            framesize: 0,
            buf32    : vec![0; MAX_FRAMESIZE * 2],
            buffer   : vec![0; MAX_FRAMESIZE * 2],
        }
    }

    /// Frames per tick: rate * 2.5 / tempo.
    pub fn set_tempo(&mut self, tempo: usize) {
        if tempo == 0 {
            return
        }
        self.framesize = (self.rate as usize * 5 / (tempo * 2)).min(MAX_FRAMESIZE);
    }

    pub fn framesize(&self) -> usize {
        self.framesize
    }

    pub fn clear(&mut self) {
        for x in &mut self.buf32[..self.framesize * 2] {
            *x = 0;
        }
    }

    /// Resample one voice into the accumulation buffer. Voices moving
    /// faster than 32 source frames per output frame are stopped.
    pub fn mix_voice(&mut self, v: &mut Voice, smp: &Sample) {
        if v.ended {
            return
        }
        if smp.is_empty() {
            v.ended = true;
            return
        }
        if v.step > MAX_STEP {
            debug!("voice step too large ({:#x}), cut", v.step);
            v.ended = true;
            return
        }

        let size = self.framesize;
        for i in 0..size {
            let (mode, ls, le) = smp.active_loop(v.released);
            let (ls, le) = (ls as i64, le as i64);

            let idx = v.pos >> SMIX_SHIFT;
            if idx >= le || idx < 0 {
                if mode == LoopMode::None {
                    v.ended = true;
                    break
                }
                // loop changed under the voice (sustain released)
                v.pos = ls << SMIX_SHIFT;
                v.reverse = false;
                continue
            }

            let frac = (v.pos & SMIX_MASK) as i32;
            let mut out = [0_i32; 2];
            for (c, o) in out.iter_mut().enumerate() {
                let taps = [
                    tap(smp, idx - 1, c, mode, ls, le),
                    tap(smp, idx, c, mode, ls, le),
                    tap(smp, idx + 1, c, mode, ls, le),
                    tap(smp, idx + 2, c, mode, ls, le),
                ];
                let x = self.interp.get_sample(&taps, frac);
                *o = v.filter.process(x, c);
            }

            let (mut gl, mut gr) = (v.vol_l as i64, v.vol_r as i64);
            if v.ramp_out {
                let left = (size - i) as i64;
                gl = gl * left / size as i64;
                gr = gr * left / size as i64;
            }
            self.buf32[i * 2] += ((out[0] as i64 * gl) >> SMIX_SHIFT) as i32;
            self.buf32[i * 2 + 1] += ((out[1] as i64 * gr) >> SMIX_SHIFT) as i32;

            if v.reverse {
                v.pos -= v.step as i64;
            } else {
                v.pos += v.step as i64;
            }

            let idx = v.pos >> SMIX_SHIFT;
            match mode {
                LoopMode::None => {
                    if idx >= le {
                        v.ended = true;
                        break
                    }
                }
                LoopMode::Forward => {
                    if idx >= le {
                        let len = (le - ls) << SMIX_SHIFT;
                        v.pos = (ls << SMIX_SHIFT) + (v.pos - (le << SMIX_SHIFT)) % len;
                    }
                }
                LoopMode::PingPong => {
                    if !v.reverse && idx >= le {
                        v.reverse = true;
                        v.pos = ((le << SMIX_SHIFT) * 2 - v.pos - 1).max(ls << SMIX_SHIFT);
                    } else if v.reverse && idx < ls {
                        v.reverse = false;
                        v.pos = ((ls << SMIX_SHIFT) * 2 - v.pos).min((le << SMIX_SHIFT) - 1);
                    }
                }
            }
        }

        if v.ramp_out {
            v.ended = true;
        }
    }

    pub fn downmix(&mut self) {
        let size = self.framesize * 2;
        for i in 0..size {
            let smp = self.buf32[i];
            self.buffer[i] = if smp > LIM16_HI {
                LIM16_HI as i16
            } else if smp < LIM16_LO {
                LIM16_LO as i16
            } else {
                smp as i16
            };
        }
    }

    pub fn buffer(&self) -> &[i16] {
        // *2 because we're stereo
        &self.buffer[..self.framesize * 2]
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn square_sample(size: usize, mode: LoopMode) -> Sample {
        let mut smp = Sample::new();
        smp.loop_mode = mode;
        smp.loop_start = 0;
        smp.loop_end = size;
        let data = (0..size).map(|i| if i < size / 2 { 16000 } else { -16000 }).collect();
        smp.store(data, 1);
        smp
    }

    #[test]
    fn test_framesize() {
        let mut m = Mixer::new(44100, Interpolator::Nearest);
        m.set_tempo(125);
        assert_eq!(m.framesize(), 882);
        m.set_tempo(32);
        assert_eq!(m.framesize(), 3445);
    }

    #[test]
    fn test_unlooped_voice_ends() {
        let smp = square_sample(100, LoopMode::None);
        let mut m = Mixer::new(8000, Interpolator::Nearest);
        m.set_tempo(125);
        let mut v = Voice::new();
        v.start(0);
        v.set_frequency(8000, 8000);
        v.set_gains(MAX_GAIN, 32, false, 128);
        m.clear();
        m.mix_voice(&mut v, &smp);
        m.downmix();
        assert!(v.ended);
        let buf = m.buffer();
        assert_eq!(buf[0], 4000);
        assert_eq!(buf[1], 4000);
        assert_eq!(buf[2 * 150], 0);
    }

    #[test]
    fn test_forward_loop_keeps_playing() {
        let smp = square_sample(64, LoopMode::Forward);
        let mut m = Mixer::new(8000, Interpolator::Linear);
        m.set_tempo(125);
        let mut v = Voice::new();
        v.start(0);
        v.set_frequency(12345, 8000);
        v.set_gains(MAX_GAIN, 0, false, 128);
        for _ in 0..10 {
            m.clear();
            m.mix_voice(&mut v, &smp);
            assert!(!v.ended);
            assert!(v.position() < 64);
        }
        m.downmix();
        assert!(m.buffer().iter().step_by(2).any(|&x| x != 0));
        assert!(m.buffer().iter().skip(1).step_by(2).all(|&x| x == 0));
    }

    #[test]
    fn test_pingpong_stays_inside_loop() {
        let smp = square_sample(50, LoopMode::PingPong);
        let mut m = Mixer::new(8000, Interpolator::Spline);
        m.set_tempo(125);
        let mut v = Voice::new();
        v.start(0);
        v.set_frequency(20000, 8000);
        v.set_gains(MAX_GAIN, 32, false, 128);
        let mut reversed = false;
        for _ in 0..20 {
            m.clear();
            m.mix_voice(&mut v, &smp);
            reversed |= v.reverse;
            assert!(v.position() < 50);
        }
        assert!(reversed);
        assert!(!v.ended);
    }

    #[test]
    fn test_fast_voice_is_cut() {
        let smp = square_sample(100, LoopMode::Forward);
        let mut m = Mixer::new(8000, Interpolator::Nearest);
        m.set_tempo(125);
        let mut v = Voice::new();
        v.start(0);
        v.set_frequency(8000 * 33, 8000);
        m.mix_voice(&mut v, &smp);
        assert!(v.ended);
    }

    #[test]
    fn test_ramp_out_fades_to_silence() {
        let smp = square_sample(100, LoopMode::Forward);
        let mut m = Mixer::new(8000, Interpolator::Nearest);
        m.set_tempo(125);
        let mut v = Voice::new();
        v.start(0);
        v.set_frequency(100, 8000);
        v.set_gains(MAX_GAIN, 0, false, 128);
        v.ramp_out = true;
        m.clear();
        m.mix_voice(&mut v, &smp);
        m.downmix();
        let buf = m.buffer();
        let n = m.framesize();
        assert_eq!(buf[0], 8000);
        assert!(buf[(n - 1) * 2].abs() < 100);
        assert!(v.ended);
    }
}
