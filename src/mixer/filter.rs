use std::f64::consts::PI;

/// Neutral value of the cutoff modifier (no envelope modulation).
pub const FILTER_MOD_NEUTRAL: i32 = 256;

/// Two-pole resonant low-pass filter, one history per output channel.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    pub enabled: bool,
    fg         : f64,
    fb0        : f64,
    fb1        : f64,
    y1         : [f64; 2],
    y2         : [f64; 2],
}

impl Filter {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reset(&mut self) {
        self.y1 = [0.0; 2];
        self.y2 = [0.0; 2];
    }

    /// Compute coefficients for cutoff and resonance in 0..127. The
    /// modifier scales the cutoff, 256 leaves it unchanged.
    pub fn setup(&mut self, cutoff: u8, resonance: u8, modifier: i32, rate: u32) {
        let cutoff = cutoff.min(127) as i32;
        let resonance = resonance.min(127) as f64;
        let modifier = modifier.max(0).min(2 * FILTER_MOD_NEUTRAL);

        // A fully open filter with no resonance is bypassed.
        if cutoff >= 127 && resonance == 0.0 && modifier >= FILTER_MOD_NEUTRAL {
            self.enabled = false;
            return
        }

        let computed = (cutoff * (modifier + FILTER_MOD_NEUTRAL)) as f64;
        let mut fc = 110.0 * 2.0_f64.powf(0.25 + computed / (24.0 * 512.0));
        fc = fc.min(rate as f64 / 2.0).max(120.0);
        fc *= 2.0 * PI / rate as f64;

        let dmpfac = 10.0_f64.powf(-resonance * (24.0 / 128.0) / 20.0);
        let mut d = (1.0 - 2.0 * dmpfac) * fc;
        if d > 2.0 {
            d = 2.0;
        }
        d = (2.0 * dmpfac - d) / fc;
        let e = (1.0 / fc) * (1.0 / fc);

        self.fg = 1.0 / (1.0 + d + e);
        self.fb0 = (d + e + e) / (1.0 + d + e);
        self.fb1 = -e / (1.0 + d + e);
        self.enabled = true;
    }

    pub fn process(&mut self, x: i32, chn: usize) -> i32 {
        if !self.enabled {
            return x
        }

        let y = x as f64 * self.fg + self.y1[chn] * self.fb0 + self.y2[chn] * self.fb1;
        let y = y.max(-65536.0).min(65535.0);
        self.y2[chn] = self.y1[chn];
        self.y1[chn] = y;
        y as i32
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_filter_is_bypassed() {
        let mut f = Filter::new();
        f.setup(127, 0, FILTER_MOD_NEUTRAL, 44100);
        assert!(!f.enabled);
        assert_eq!(f.process(1234, 0), 1234);
    }

    #[test]
    fn test_lowpass_converges_on_dc() {
        let mut f = Filter::new();
        f.setup(40, 0, FILTER_MOD_NEUTRAL, 44100);
        assert!(f.enabled);
        let mut y = 0;
        for _ in 0..20000 {
            y = f.process(10000, 0);
        }
        assert!((y - 10000).abs() < 50, "dc output {}", y);
        // the other channel history is untouched
        assert_eq!(f.y1[1], 0.0);
    }

    #[test]
    fn test_lowpass_attenuates_nyquist() {
        let mut f = Filter::new();
        f.setup(20, 0, FILTER_MOD_NEUTRAL, 44100);
        let mut peak = 0;
        for i in 0..4000 {
            let x = if i % 2 == 0 { 10000 } else { -10000 };
            let y = f.process(x, 0);
            if i > 2000 {
                peak = peak.max(y.abs());
            }
        }
        assert!(peak < 500, "peak {}", peak);
    }
}
