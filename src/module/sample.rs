use crate::util::C5_RATE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    None,
    Forward,
    PingPong,
}

impl Default for LoopMode {
    fn default() -> Self {
        LoopMode::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    RampDown,
    Square,
    Random,
}

impl Waveform {
    pub fn from_u8(val: u8) -> Self {
        match val & 3 {
            0 => Waveform::Sine,
            1 => Waveform::RampDown,
            2 => Waveform::Square,
            _ => Waveform::Random,
        }
    }
}

impl Default for Waveform {
    fn default() -> Self {
        Waveform::Sine
    }
}

/// Decoded sample. PCM frames are always stored as signed 16-bit, stereo
/// samples are interleaved.
#[derive(Debug, Clone)]
pub struct Sample {
    pub num         : usize,
    pub name        : String,
    pub filename    : String,
    pub channels    : usize,
    pub size        : usize,
    pub loop_start  : usize,
    pub loop_end    : usize,
    pub loop_mode   : LoopMode,
    pub sloop_start : usize,
    pub sloop_end   : usize,
    pub sloop_mode  : LoopMode,
    pub rate        : u32,
    pub volume      : u8,
    pub global_vol  : u8,
    pub pan         : Option<u8>,
    pub vib_speed   : u8,
    pub vib_depth   : u8,
    pub vib_rate    : u8,
    pub vib_wave    : Waveform,
    data            : Vec<i16>,
}

impl Sample {
    pub fn new() -> Sample {
        Sample {
            num         : 0,
            name        : "".to_owned(),
            filename    : "".to_owned(),
            channels    : 1,
            size        : 0,
            loop_start  : 0,
            loop_end    : 0,
            loop_mode   : LoopMode::None,
            sloop_start : 0,
            sloop_end   : 0,
            sloop_mode  : LoopMode::None,
            rate        : C5_RATE,
            volume      : 64,
            global_vol  : 64,
            pan         : None,
            vib_speed   : 0,
            vib_depth   : 0,
            vib_rate    : 0,
            vib_wave    : Waveform::Sine,
            data        : Vec::new(),
        }
    }

    /// Store decoded frames. `data` holds `size * channels` values.
    pub fn store(&mut self, data: Vec<i16>, channels: usize) {
        self.channels = channels.max(1);
        self.size = data.len() / self.channels;
        self.data = data;
        self.sanity_check();
    }

    pub fn data(&self) -> &[i16] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Value of channel `chn` at frame `pos`, zero outside the sample.
    pub fn frame(&self, pos: usize, chn: usize) -> i32 {
        if pos >= self.size {
            return 0
        }
        let chn = if chn >= self.channels { 0 } else { chn };
        self.data[pos * self.channels + chn] as i32
    }

    pub fn sanity_check(&mut self) {
        if self.loop_end > self.size {
            self.loop_end = self.size;
        }
        if self.loop_start >= self.loop_end {
            self.loop_mode = LoopMode::None;
        }
        if self.sloop_end > self.size {
            self.sloop_end = self.size;
        }
        if self.sloop_start >= self.sloop_end {
            self.sloop_mode = LoopMode::None;
        }
    }

    /// Loop in effect for a voice: the sustain loop while the note is held,
    /// the normal loop afterwards.
    pub fn active_loop(&self, released: bool) -> (LoopMode, usize, usize) {
        if !released && self.sloop_mode != LoopMode::None {
            (self.sloop_mode, self.sloop_start, self.sloop_end)
        } else if self.loop_mode != LoopMode::None {
            (self.loop_mode, self.loop_start, self.loop_end)
        } else {
            (LoopMode::None, 0, self.size)
        }
    }
}

impl Default for Sample {
    fn default() -> Self {
        Sample::new()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanity_check_disables_bad_loops() {
        let mut smp = Sample::new();
        smp.loop_mode = LoopMode::Forward;
        smp.loop_start = 50;
        smp.loop_end = 200;
        smp.sloop_mode = LoopMode::PingPong;
        smp.sloop_start = 10;
        smp.sloop_end = 10;
        smp.store(vec![0; 100], 1);
        assert_eq!(smp.loop_end, 100);
        assert_eq!(smp.loop_mode, LoopMode::Forward);
        assert_eq!(smp.sloop_mode, LoopMode::None);
    }

    #[test]
    fn test_active_loop() {
        let mut smp = Sample::new();
        smp.loop_mode = LoopMode::Forward;
        smp.loop_start = 0;
        smp.loop_end = 80;
        smp.sloop_mode = LoopMode::PingPong;
        smp.sloop_start = 20;
        smp.sloop_end = 40;
        smp.store(vec![0; 100], 1);
        assert_eq!(smp.active_loop(false), (LoopMode::PingPong, 20, 40));
        assert_eq!(smp.active_loop(true), (LoopMode::Forward, 0, 80));
    }

    #[test]
    fn test_stereo_frames() {
        let mut smp = Sample::new();
        smp.store(vec![1, -1, 2, -2], 2);
        assert_eq!(smp.size, 2);
        assert_eq!(smp.frame(1, 0), 2);
        assert_eq!(smp.frame(1, 1), -2);
        assert_eq!(smp.frame(2, 0), 0);
    }
}
