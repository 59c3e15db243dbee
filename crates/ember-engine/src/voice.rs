use crate::params::PARAM_COUNT;

/// Number of stereo samples the voice engine produces per invocation.
///
/// The engine always renders whole frames of this size; the frame adapter
/// bridges to whatever block length the host asks for.
pub const FRAME_LEN: usize = 256;

/// Modulation value meaning "no modulation applied".
pub const MOD_NEUTRAL: f32 = 1.0;

/// Contract between the engine core and the synthesis subsystem.
///
/// Implementations own all voice state (oscillators, envelopes, effects) and
/// are driven exclusively from the audio thread while the render lock is
/// held. `render` must mix exactly [`FRAME_LEN`] samples per channel into the
/// provided buffers, which the caller has already zeroed.
pub trait VoiceEngine: Send {
    fn note_on(&mut self, note: u8, velocity: u8);
    fn note_off(&mut self, note: u8);
    fn all_notes_off(&mut self);

    /// Applies a pitch wheel position, both components in [-1, 1].
    fn pitch_bend(&mut self, semitones: f32, cents: f32);

    fn render(
        &mut self,
        params: &[f32; PARAM_COUNT],
        left: &mut [f32; FRAME_LEN],
        right: &mut [f32; FRAME_LEN],
    );

    fn set_sample_rate(&mut self, _sample_rate: u32) {}

    /// Instantaneous modulation value of the most recently triggered voice
    /// for the given modulation-matrix output, or `None` while no voice is
    /// playing. [`MOD_NEUTRAL`] means the matrix applies no modulation.
    fn modulation(&self, _output: usize) -> Option<f32> {
        None
    }
}
