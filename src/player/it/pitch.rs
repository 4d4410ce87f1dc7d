// Pitch arithmetic. Slide amounts are in 1/768 octave units (64 per
// semitone); Amiga slides apply them to the equivalent period instead.

use crate::module::sample::Waveform;
use super::tables::{FINE_SINE, LINEAR_DOWN, LINEAR_UP, PITCH_TABLE, RAMP_DOWN, RANDOM, SQUARE};

const AMIGA_C: u64 = 1712 * 8363;
const MAX_FREQ: u64 = 0x7fff_ffff;
const MAX_DELTA: u32 = 1024;

pub fn note_frequency(note: u8, c5: u32) -> u32 {
    let note = (note as usize).min(PITCH_TABLE.len() - 1);
    ((c5 as u64 * PITCH_TABLE[note]) >> 16).min(MAX_FREQ) as u32
}

/// Scale a frequency by 2^(delta/768).
pub fn linear_scale(freq: u32, delta: i32) -> u32 {
    if delta >= 0 {
        let d = (delta as u32).min(MAX_DELTA) as usize;
        ((freq as u64 * LINEAR_UP[d] as u64) >> 16).min(MAX_FREQ) as u32
    } else {
        let d = (delta.unsigned_abs()).min(MAX_DELTA) as usize;
        ((freq as u64 * LINEAR_DOWN[d] as u64) >> 16) as u32
    }
}

pub fn slide_up(freq: u32, delta: u32, linear: bool) -> u32 {
    if linear {
        return linear_scale(freq, delta.min(MAX_DELTA) as i32)
    }
    let fd = freq as u64 * delta as u64;
    if fd >= AMIGA_C {
        return MAX_FREQ as u32
    }
    (AMIGA_C * freq as u64 / (AMIGA_C - fd)).min(MAX_FREQ) as u32
}

pub fn slide_down(freq: u32, delta: u32, linear: bool) -> u32 {
    if linear {
        return linear_scale(freq, -(delta.min(MAX_DELTA) as i32))
    }
    let fd = freq as u64 * delta as u64;
    (AMIGA_C * freq as u64 / (AMIGA_C + fd)) as u32
}

/// Apply a signed pitch offset using the module's slide arithmetic.
pub fn apply_delta(freq: u32, delta: i32, linear: bool) -> u32 {
    if delta >= 0 {
        slide_up(freq, delta as u32, linear)
    } else {
        slide_down(freq, delta.unsigned_abs(), linear)
    }
}

/// One portamento step toward `target`. Returns the new frequency and
/// whether the target was reached.
pub fn portamento(freq: u32, target: u32, delta: u32, linear: bool) -> (u32, bool) {
    if freq < target {
        let f = slide_up(freq, delta, linear).max(freq + 1);
        if f >= target { (target, true) } else { (f, false) }
    } else if freq > target {
        let f = slide_down(freq, delta, linear).min(freq - 1);
        if f <= target { (target, true) } else { (f, false) }
    } else {
        (target, true)
    }
}

pub fn waveform(wave: Waveform, pos: u8) -> i32 {
    let i = pos as usize;
    (match wave {
        Waveform::Sine     => FINE_SINE[i],
        Waveform::RampDown => RAMP_DOWN[i],
        Waveform::Square   => SQUARE[i],
        Waveform::Random   => RANDOM[i],
    }) as i32
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_frequency() {
        assert_eq!(note_frequency(60, 8363), 8363);
        assert_eq!(note_frequency(72, 8363), 16726);
        assert_eq!(note_frequency(48, 8000), 4000);
    }

    #[test]
    fn test_linear_slides() {
        assert_eq!(slide_up(8000, 768, true), 16000);
        assert_eq!(slide_down(8000, 768, true), 4000);
        assert_eq!(apply_delta(8000, 0, true), 8000);
    }

    #[test]
    fn test_amiga_slides() {
        let f = slide_up(8363, 4, false);
        assert!(f > 8363);
        let g = slide_down(f, 4, false);
        assert!(g <= 8363 && g >= 8362);
        assert_eq!(slide_up(0x100000, 0xff * 4, false), MAX_FREQ as u32);
    }

    fn converge(start: u32, target: u32, delta: u32, linear: bool) -> usize {
        let mut f = start;
        for n in 1..10000 {
            let (nf, done) = portamento(f, target, delta, linear);
            if start < target {
                assert!(nf > f && nf <= target);
            } else {
                assert!(nf < f && nf >= target);
            }
            f = nf;
            if done {
                assert_eq!(f, target);
                return n
            }
        }
        panic!("no convergence");
    }

    #[test]
    fn test_portamento_converges() {
        for &linear in &[true, false] {
            let up = converge(8363, 16726, 16, linear);
            let down = converge(16726, 8363, 16, linear);
            assert!(up > 1 && up < 100, "{} steps", up);
            assert!(down > 1 && down < 100, "{} steps", down);
            // tiny slides still make progress
            assert!(converge(100, 110, 1, linear) <= 10);
        }
    }
}
