/// Non-interleaved audio buffer handed to the block renderer.
///
/// The engine itself is stereo-only; other channel counts are representable
/// so a renderer can clear them and skip synthesis defensively.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, len: usize) -> Self {
        Self {
            channels: (0..num_channels).map(|_| vec![0.0; len]).collect(),
        }
    }

    pub fn stereo(len: usize) -> Self {
        Self::new(2, len)
    }

    pub fn clear(&mut self) {
        for channel in &mut self.channels {
            channel.fill(0.0);
        }
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.channels
            .first()
            .map(|channel| channel.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channel_mut(&mut self, index: usize) -> &mut [f32] {
        &mut self.channels[index]
    }

    /// Mutable left/right pair, or `None` when the buffer is not stereo.
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        if self.channels.len() != 2 {
            return None;
        }
        let (left, right) = self.channels.split_at_mut(1);
        Some((&mut left[0], &mut right[0]))
    }
}
