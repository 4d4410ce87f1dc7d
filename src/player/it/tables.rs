use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

pub const WAVE_SIZE: usize = 256;

const RANDOM_SEED: u64 = 0x1d_2b3c;

lazy_static! {
    pub static ref FINE_SINE: [i8; WAVE_SIZE] = {
        let mut t = [0_i8; WAVE_SIZE];
        for (i, x) in t.iter_mut().enumerate() {
            *x = (64.0 * (2.0 * std::f64::consts::PI * i as f64 / WAVE_SIZE as f64).sin()).round() as i8;
        }
        t
    };

    pub static ref RAMP_DOWN: [i8; WAVE_SIZE] = {
        let mut t = [0_i8; WAVE_SIZE];
        for (i, x) in t.iter_mut().enumerate() {
            *x = (64 - (i as i32) / 2) as i8;
        }
        t
    };

    pub static ref SQUARE: [i8; WAVE_SIZE] = {
        let mut t = [0_i8; WAVE_SIZE];
        for (i, x) in t.iter_mut().enumerate() {
            *x = if i < WAVE_SIZE / 2 { 64 } else { 0 };
        }
        t
    };

    // Fixed seed so that playback is reproducible
    pub static ref RANDOM: [i8; WAVE_SIZE] = {
        let mut rng = Pcg32::seed_from_u64(RANDOM_SEED);
        let mut t = [0_i8; WAVE_SIZE];
        for x in t.iter_mut() {
            *x = rng.random_range(-64..=64);
        }
        t
    };

    // 2^(i/768) and 2^(-i/768) in 16.16 fixed point
    pub static ref LINEAR_UP: [u32; 1025] = {
        let mut t = [0_u32; 1025];
        for (i, x) in t.iter_mut().enumerate() {
            *x = (65536.0 * 2.0_f64.powf(i as f64 / 768.0)).round() as u32;
        }
        t
    };

    pub static ref LINEAR_DOWN: [u32; 1025] = {
        let mut t = [0_u32; 1025];
        for (i, x) in t.iter_mut().enumerate() {
            *x = (65536.0 * 2.0_f64.powf(-(i as f64) / 768.0)).round() as u32;
        }
        t
    };

    // Frequency ratio of each note to C-5, 16.16 fixed point
    pub static ref PITCH_TABLE: [u64; 120] = {
        let mut t = [0_u64; 120];
        for (i, x) in t.iter_mut().enumerate() {
            *x = (65536.0 * 2.0_f64.powf((i as f64 - 60.0) / 12.0)).round() as u64;
        }
        t
    };
}

// Volume column tone portamento speeds
pub const VOLCOL_PORTA: [u8; 10] = [0, 1, 4, 8, 16, 32, 64, 96, 128, 255];

// Qxy retrigger volume change
pub fn retrig_volume(vol: i32, x: u8) -> i32 {
    let v = match x {
        0x1 => vol - 1,
        0x2 => vol - 2,
        0x3 => vol - 4,
        0x4 => vol - 8,
        0x5 => vol - 16,
        0x6 => vol * 2 / 3,
        0x7 => vol / 2,
        0x9 => vol + 1,
        0xa => vol + 2,
        0xb => vol + 4,
        0xc => vol + 8,
        0xd => vol + 16,
        0xe => vol * 3 / 2,
        0xf => vol * 2,
        _   => vol,
    };
    v.max(0).min(64)
}
