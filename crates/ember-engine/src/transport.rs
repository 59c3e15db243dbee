use core::sync::atomic::{AtomicU32, Ordering};

use atomic_float::AtomicF32;

/// Host timing state shared between the audio and control threads.
///
/// The tempo is updated from the host transport and from MIDI tempo meta
/// events; readers always get the last known value, clamped to at least
/// 1 BPM so downstream divisions stay well defined.
#[derive(Debug)]
pub struct Transport {
    bpm: AtomicF32,
    sample_rate: AtomicU32,
}

impl Transport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_rate(sample_rate: u32) -> Self {
        Self {
            bpm: AtomicF32::new(120.0),
            sample_rate: AtomicU32::new(sample_rate),
        }
    }

    pub fn bpm(&self) -> f32 {
        self.bpm.load(Ordering::Relaxed).max(1.0)
    }

    pub fn set_bpm(&self, bpm: f32) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm.store(bpm, Ordering::Relaxed);
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    pub fn set_sample_rate(&self, sample_rate: u32) {
        if sample_rate > 0 {
            self.sample_rate.store(sample_rate, Ordering::Relaxed);
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::with_sample_rate(44_100)
    }
}
