//! Per-callback orchestration of the synthesis path.

use std::sync::Arc;

use ember_midi::MidiEvent;
use tracing::debug;

use crate::adapter::FrameAdapter;
use crate::buffer::AudioBuffer;
use crate::fader;
use crate::params::ParamStore;
use crate::sched::MidiScheduler;

/// Drives one host audio callback: frame-adapted synthesis with per-frame
/// MIDI windows, master gain and pan, and peak metering. Owned by the audio
/// thread; everything shared lives in the [`ParamStore`].
pub struct BlockRenderer {
    store: Arc<ParamStore>,
    adapter: FrameAdapter,
    scheduler: MidiScheduler,
}

impl BlockRenderer {
    pub fn new(store: Arc<ParamStore>) -> Self {
        Self {
            store,
            adapter: FrameAdapter::new(),
            scheduler: MidiScheduler::new(),
        }
    }

    pub fn store(&self) -> &Arc<ParamStore> {
        &self.store
    }

    /// Called before playback starts or when the host reconfigures.
    pub fn prepare(&mut self, sample_rate: u32) {
        debug!(sample_rate, "preparing renderer");
        self.store.transport().set_sample_rate(sample_rate);
        self.store.lock().voice.set_sample_rate(sample_rate);
        self.store.set_delays_from_tempo(None);
    }

    /// Renders one host block. `events` must be ordered by sample offset and
    /// scoped to this block.
    pub fn process_block(&mut self, buffer: &mut AudioBuffer, events: &[MidiEvent]) {
        buffer.clear();
        let requested = buffer.len() as u32;

        // The engine is stereo-only; anything else gets cleared output.
        let mut consumed = 0u32;
        if let Some((left, right)) = buffer.stereo_mut() {
            consumed = self
                .adapter
                .fill(&self.store, &mut self.scheduler, events, left, right);
        }

        // Events past the last per-frame window (adapter leftovers meant no
        // new frame was rendered, or the tail of the block) still have to
        // land this callback.
        self.scheduler
            .dispatch(&self.store, events, consumed, requested);

        if let Some((left, right)) = buffer.stereo_mut() {
            let gain = self.store.master_gain();
            let (pan_left, pan_right) = fader::pan_gains(self.store.master_pan());
            let gain_left = gain * pan_left;
            let gain_right = gain * pan_right;
            for sample in left.iter_mut() {
                *sample *= gain_left;
            }
            for sample in right.iter_mut() {
                *sample *= gain_right;
            }

            if self.store.metering_enabled() {
                self.store.set_meter_level(0, peak(left));
                self.store.set_meter_level(1, peak(right));
            }
        }
    }
}

fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
}
