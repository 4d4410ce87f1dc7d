use crate::mixer;
use crate::module::instrument::NewNoteAction;
use super::envelope::EnvelopeCursor;

/// A voice from the pool. Voices reference their host, instrument and
/// sample by index.
#[derive(Debug, Clone)]
pub struct Slave {
    pub on          : bool,
    pub host        : usize,
    pub disowned    : bool,
    pub echo        : bool,
    pub ins         : Option<usize>,
    pub smp         : usize,
    pub note        : u8,         // note played, after keyboard mapping
    pub pattern_note: u8,         // note in the pattern
    pub nna         : NewNoteAction,

    pub freq        : u32,        // base frequency after slides
    pub final_freq  : u32,
    pub vib_delta   : i32,        // vibrato, 1/768 octave
    pub arp_delta   : i32,        // arpeggio, 1/768 octave

    pub vol         : u8,         // 0..64
    pub trem_delta  : i32,
    pub tremor_mute : bool,
    pub chn_vol     : u8,         // 0..64
    pub sample_gv   : u8,         // 0..128
    pub fade        : u16,        // 0..1024
    pub fadeout     : u16,
    pub fading      : bool,
    pub note_off    : bool,
    pub final_vol   : i32,

    pub pan         : u8,
    pub panb_delta  : i32,
    pub final_pan   : u8,

    pub vol_env     : EnvelopeCursor,
    pub pan_env     : EnvelopeCursor,
    pub pitch_env   : EnvelopeCursor,
    pub vol_env_on  : bool,
    pub pan_env_on  : bool,
    pub pitch_env_on: bool,

    pub cutoff      : u8,
    pub resonance   : u8,
    pub filter_mod  : i32,

    pub autovib_pos : u8,
    pub autovib_amt : u32,        // depth, 8.8 fixed point

    pub voice       : mixer::Voice,
}

impl Slave {
    pub fn new() -> Self {
        Slave {
            on          : false,
            host        : 0,
            disowned    : false,
            echo        : false,
            ins         : None,
            smp         : 0,
            note        : 0,
            pattern_note: 0,
            nna         : NewNoteAction::Cut,
            freq        : 0,
            final_freq  : 0,
            vib_delta   : 0,
            arp_delta   : 0,
            vol         : 0,
            trem_delta  : 0,
            tremor_mute : false,
            chn_vol     : 64,
            sample_gv   : 128,
            fade        : 1024,
            fadeout     : 0,
            fading      : false,
            note_off    : false,
            final_vol   : 0,
            pan         : 32,
            panb_delta  : 0,
            final_pan   : 32,
            vol_env     : EnvelopeCursor::new(),
            pan_env     : EnvelopeCursor::new(),
            pitch_env   : EnvelopeCursor::new(),
            vol_env_on  : false,
            pan_env_on  : false,
            pitch_env_on: false,
            cutoff      : 127,
            resonance   : 0,
            filter_mod  : mixer::filter::FILTER_MOD_NEUTRAL,
            autovib_pos : 0,
            autovib_amt : 0,
            voice       : mixer::Voice::new(),
        }
    }

    /// Release the sustain loops of envelopes and sample.
    pub fn release(&mut self) {
        self.note_off = true;
        self.voice.released = true;
    }

    pub fn start_fade(&mut self) {
        self.fading = true;
    }

    /// Clear per-tick modulation set by host effects.
    pub fn clear_modulation(&mut self) {
        self.vib_delta = 0;
        self.arp_delta = 0;
        self.trem_delta = 0;
        self.panb_delta = 0;
        self.tremor_mute = false;
    }
}

impl Default for Slave {
    fn default() -> Self {
        Slave::new()
    }
}
