pub const PAN_SURROUND: u8 = 100;
pub const MAX_FINAL_VOLUME: i32 = 32768;

/// Final mix volume in 0..32768 from volume (0-64), channel volume (0-64),
/// fadeout (0-1024), sample global volume (0-128), volume envelope (0-64)
/// and song global volume (0-128).
pub fn final_volume(vol: i32, chn_vol: i32, fade: i32, sgv: i32, env: i32, gv: i32) -> i32 {
    let mut v = vol.max(0).min(64) * chn_vol.max(0).min(64);
    v = v * fade.max(0).min(1024) / 128;
    v = v * sgv.max(0).min(128) / 128;
    v = v * env.max(0).min(64) / 64;
    v = v * gv.max(0).min(128) / 128;
    v.min(MAX_FINAL_VOLUME)
}

pub struct PanInput {
    pub pan      : u8,           // 0..64 or surround
    pub panbrello: i32,
    pub note     : u8,
    pub ppc      : u8,
    pub pps      : i8,
    pub env      : Option<i32>,  // -32..32
    pub sep      : u8,           // 0..128
}

/// Final pan in 0..64, surround passes through unchanged.
pub fn final_pan(p: &PanInput) -> u8 {
    if p.pan == PAN_SURROUND {
        return PAN_SURROUND
    }

    let mut pan = (p.pan as i32 + p.panbrello).max(0).min(64);

    if p.pps != 0 {
        pan += (p.note as i32 - p.ppc as i32) * p.pps as i32 / 8;
        pan = pan.max(0).min(64);
    }

    if let Some(env) = p.env {
        pan += (32 - (pan - 32).abs()) * env / 32;
        pan = pan.max(0).min(64);
    }

    pan = 32 + (pan - 32) * p.sep as i32 / 128;
    pan.max(0).min(64) as u8
}
