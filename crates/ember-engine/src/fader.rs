//! Fader curve and pan law shared by the master section and MIDI control.
//!
//! The gain curve resembles an analog console fader: exponential over most of
//! the travel, cut to silence near the bottom, with a snap zone around unity
//! so automation lands on exactly 1.0.

const FADER_FACTOR_A: f32 = 0.002;
const FADER_FACTOR_B: f32 = 6.908;

/// Fader position below which the output is fully muted.
pub const FADER_CUTOFF: f32 = 0.006;
/// Gain window around 1.0 that snaps to unity.
pub const FADER_SNAP_UNITY: f32 = 0.0066;
/// Fader position that maps to a gain of exactly 1.0.
pub const FADER_UNITY: f32 = 0.811024;

/// Maps a linear fader position (0..1) to a gain multiplier in 0..~2 (+6 dB).
pub fn fader_to_gain(fader: f32) -> f32 {
    if fader < FADER_CUTOFF {
        return 0.0;
    }
    let gain = FADER_FACTOR_A * (FADER_FACTOR_B * fader.clamp(0.0, 1.0).sqrt()).exp();
    if (gain - 1.0).abs() < FADER_SNAP_UNITY {
        return 1.0;
    }
    gain
}

/// Inverse of [`fader_to_gain`].
pub fn gain_to_fader(gain: f32) -> f32 {
    if gain <= 0.0 {
        return 0.0;
    }
    let fader = ((gain.clamp(0.0, 2.0) / FADER_FACTOR_A).ln() / FADER_FACTOR_B)
        .powi(2)
        .clamp(0.0, 1.0);
    if fader < FADER_CUTOFF {
        return 0.0;
    }
    fader
}

/// Maps a pan fader (0..1, 0.5 = center) to per-channel scale factors.
pub fn pan_gains(pan: f32) -> (f32, f32) {
    let pan = pan.clamp(0.0, 1.0);
    ((1.0 - pan).sqrt(), pan.sqrt())
}
