use crate::module::Event;
use crate::module::sample::Waveform;
use super::effects::{Command, VolumeEffect};

/// LFO state shared by vibrato, tremolo and panbrello.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lfo {
    pub speed: u8,
    pub depth: u8,
    pub pos  : u8,
    pub wave : Waveform,
}

/// Per pattern channel state: the last cell, effect memory and the
/// commands that keep running on the following ticks.
#[derive(Debug, Clone)]
pub struct Host {
    pub cell        : Event,
    pub slave       : Option<usize>,
    pub note        : u8,           // last pattern note
    pub ins         : u8,           // last instrument, 1-based
    pub smp         : usize,        // sample of the last note, 1-based

    pub vol         : u8,
    pub chn_vol     : u8,
    pub pan         : u8,
    pub surround    : bool,

    // running effects
    pub cmd         : Option<Command>,
    pub vol_fx      : Option<VolumeEffect>,

    // effect memory
    pub mem_d       : u8,
    pub mem_e       : u8,
    pub mem_g       : u8,
    pub mem_i       : u8,
    pub mem_j       : u8,
    pub mem_n       : u8,
    pub mem_o       : u8,
    pub mem_p       : u8,
    pub mem_q       : u8,
    pub mem_s       : u8,
    pub mem_t       : u8,
    pub mem_w       : u8,
    pub mem_vol_ab  : u8,
    pub mem_vol_cd  : u8,
    pub high_offset : u8,

    pub porta_target: u32,
    pub porta_speed : u32,
    pub porta_on    : bool,

    pub vibrato     : Lfo,
    pub tremolo     : Lfo,
    pub panbrello   : Lfo,
    pub fine_vibrato: bool,

    pub tremor_count: u8,
    pub tremor_on   : bool,
    pub arp_tick    : u8,
    pub retrig_count: u8,

    pub loop_row    : usize,
    pub loop_count  : u8,

    pub cut_tick    : Option<u8>,
    pub delay_tick  : Option<u8>,
    pub delayed     : Event,

    pub sfx         : usize,
    pub cutoff      : u8,
    pub resonance   : u8,
}

impl Host {
    pub fn new(pan: u8, chn_vol: u8) -> Self {
        let surround = pan & 0x7f == 100;
        Host {
            cell        : Event::new(),
            slave       : None,
            note        : 0,
            ins         : 0,
            smp         : 0,
            vol         : 64,
            chn_vol     : chn_vol.min(64),
            pan         : if surround { 32 } else { (pan & 0x7f).min(64) },
            surround,
            cmd         : None,
            vol_fx      : None,
            mem_d       : 0,
            mem_e       : 0,
            mem_g       : 0,
            mem_i       : 0,
            mem_j       : 0,
            mem_n       : 0,
            mem_o       : 0,
            mem_p       : 0,
            mem_q       : 0,
            mem_s       : 0,
            mem_t       : 0,
            mem_w       : 0,
            mem_vol_ab  : 0,
            mem_vol_cd  : 0,
            high_offset : 0,
            porta_target: 0,
            porta_speed : 0,
            porta_on    : false,
            vibrato     : Lfo::default(),
            tremolo     : Lfo::default(),
            panbrello   : Lfo::default(),
            fine_vibrato: false,
            tremor_count: 0,
            tremor_on   : true,
            arp_tick    : 0,
            retrig_count: 0,
            loop_row    : 0,
            loop_count  : 0,
            cut_tick    : None,
            delay_tick  : None,
            delayed     : Event::new(),
            sfx         : 0,
            cutoff      : 127,
            resonance   : 0,
        }
    }

    /// Stop the effects updated on ticks after the first.
    pub fn clear_tick_effects(&mut self) {
        self.cmd = None;
        self.vol_fx = None;
        self.porta_on = false;
        self.cut_tick = None;
        self.delay_tick = None;
    }

    pub fn reset_loop(&mut self) {
        self.loop_row = 0;
        self.loop_count = 0;
    }
}
