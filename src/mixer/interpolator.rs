use crate::mixer::SMIX_SHIFT;

/// Interpolation taps are the frames at positions -1, 0, +1 and +2
/// relative to the current sample position.
pub trait Interpolate {
    fn name() -> &'static str;
    fn get_sample(&self, i: &[i32; 4], frac: i32) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolator {
    Nearest,
    Linear,
    Spline,
}

impl Interpolator {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "nearest" => Some(Interpolator::Nearest),
            "linear"  => Some(Interpolator::Linear),
            "spline"  => Some(Interpolator::Spline),
            _         => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match *self {
            Interpolator::Nearest => Nearest::name(),
            Interpolator::Linear  => Linear::name(),
            Interpolator::Spline  => Spline::name(),
        }
    }

    pub fn get_sample(&self, i: &[i32; 4], frac: i32) -> i32 {
        match *self {
            Interpolator::Nearest => Nearest.get_sample(i, frac),
            Interpolator::Linear  => Linear.get_sample(i, frac),
            Interpolator::Spline  => Spline.get_sample(i, frac),
        }
    }
}

impl Default for Interpolator {
    fn default() -> Self {
        Interpolator::Spline
    }
}


// Nearest neighbor interpolator
pub struct Nearest;

impl Interpolate for Nearest {
    fn name() -> &'static str {
        "nearest neighbor"
    }

    fn get_sample(&self, i: &[i32; 4], _frac: i32) -> i32 {
        i[1]
    }
}


// Linear interpolator
pub struct Linear;

impl Interpolate for Linear {
    fn name() -> &'static str {
        "linear"
    }

    fn get_sample(&self, i: &[i32; 4], frac: i32) -> i32 {
        let l1 = i[1];
        let dt = i[2] - l1;
        l1 + (((frac >> 1) * dt) >> (SMIX_SHIFT - 1))
    }
}


// Catmull-Rom spline interpolator
pub struct Spline;

impl Interpolate for Spline {
    fn name() -> &'static str {
        "cubic spline"
    }

    fn get_sample(&self, i: &[i32; 4], frac: i32) -> i32 {
        let (p0, p1, p2, p3) = (i[0] as i64, i[1] as i64, i[2] as i64, i[3] as i64);
        let f = frac as i64;

        let a = -p0 + 3 * p1 - 3 * p2 + p3;
        let b = 2 * p0 - 5 * p1 + 4 * p2 - p3;
        let c = p2 - p0;
        let d = 2 * p1;

        let mut r = (a * f) >> SMIX_SHIFT;
        r = ((r + b) * f) >> SMIX_SHIFT;
        r = ((r + c) * f) >> SMIX_SHIFT;
        ((r + d) / 2) as i32
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    const TAPS: [i32; 4] = [0, 0x1000, 0x4000, 0x7000];

    #[test]
    fn test_interpolate_nearest() {
        let interp = Nearest;
        assert_eq!(interp.get_sample(&TAPS, 0), 0x1000);
        assert_eq!(interp.get_sample(&TAPS, 32767), 0x1000);
        assert_eq!(interp.get_sample(&TAPS, 65535), 0x1000);
    }

    #[test]
    fn test_interpolate_linear() {
        let interp = Linear;
        assert_eq!(interp.get_sample(&TAPS, 0), 0x1000);
        assert_eq!(interp.get_sample(&TAPS, 32768), 0x2800);
        assert_eq!(interp.get_sample(&TAPS, 65535), 0x3fff);
    }

    #[test]
    fn test_interpolate_spline() {
        let interp = Spline;
        assert_eq!(interp.get_sample(&TAPS, 0), 0x1000);

        // a straight line stays a straight line
        let line = [0, 0x1000, 0x2000, 0x3000];
        assert_eq!(interp.get_sample(&line, 32768), 0x1800);
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Interpolator::from_name("linear"), Some(Interpolator::Linear));
        assert_eq!(Interpolator::from_name("cubic"), None);
        assert_eq!(Interpolator::default().name(), "cubic spline");
    }
}
