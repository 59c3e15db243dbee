//! Bridges the voice engine's fixed synthesis frame to arbitrary host block
//! sizes.
//!
//! The voice engine only renders whole [`FRAME_LEN`] frames. Hosts request
//! whatever block length they like, including sub-frame sizes, so leftover
//! samples are kept here between callbacks and drained first. Output is
//! always identical for a given sample stream no matter how the host splits
//! it into callbacks.

use ember_midi::MidiEvent;

use crate::params::ParamStore;
use crate::sched::MidiScheduler;
use crate::voice::FRAME_LEN;

pub struct FrameAdapter {
    left: Box<[f32; FRAME_LEN]>,
    right: Box<[f32; FRAME_LEN]>,
    /// Samples rendered but not yet handed to the host; the read position
    /// within the internal frame is `FRAME_LEN - available`.
    available: usize,
}

impl FrameAdapter {
    pub fn new() -> Self {
        Self {
            left: Box::new([0.0; FRAME_LEN]),
            right: Box::new([0.0; FRAME_LEN]),
            available: 0,
        }
    }

    /// Mixes `dest_l.len()` samples into the destination slices, rendering
    /// internal frames on demand. Each freshly rendered frame first receives
    /// the MIDI events that fall inside its sample span, so event timing is
    /// preserved across the frame/block mismatch.
    ///
    /// Returns the end of the event window consumed so far, i.e. the number
    /// of samples covered by per-frame dispatch.
    pub fn fill(
        &mut self,
        store: &ParamStore,
        scheduler: &mut MidiScheduler,
        events: &[MidiEvent],
        dest_l: &mut [f32],
        dest_r: &mut [f32],
    ) -> u32 {
        debug_assert_eq!(dest_l.len(), dest_r.len());

        let mut pos = 0;
        let mut remaining = dest_l.len();
        let mut window_start = 0u32;

        while remaining > 0 {
            if self.available == 0 {
                // One bounded critical section per frame: zero the scratch
                // buffers, apply this frame's events, render.
                let mut core = store.lock();
                self.left.fill(0.0);
                self.right.fill(0.0);
                scheduler.dispatch_locked(
                    &mut core,
                    store,
                    events,
                    window_start,
                    FRAME_LEN as u32,
                );
                let crate::params::RenderCore { values, voice } = &mut *core;
                voice.render(values, &mut self.left, &mut self.right);
                drop(core);

                window_start += FRAME_LEN as u32;
                self.available = FRAME_LEN;
            }

            let offset = FRAME_LEN - self.available;
            let count = remaining.min(self.available);
            for i in 0..count {
                dest_l[pos + i] += self.left[offset + i];
                dest_r[pos + i] += self.right[offset + i];
            }
            pos += count;
            remaining -= count;
            self.available -= count;
        }

        window_start
    }
}

impl Default for FrameAdapter {
    fn default() -> Self {
        Self::new()
    }
}
