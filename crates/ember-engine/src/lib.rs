//! EmberSynth Engine
//! =================
//! Real-time core of the EmberSynth instrument: a cross-thread parameter
//! store with UI change detection, tempo-synced delay resolution, MIDI event
//! scheduling with sample-window timing, fixed-frame synthesis adapted to
//! arbitrary host block sizes, and a persistent program bank.
//!
//! The synthesis algorithm itself is behind the [`VoiceEngine`] trait; this
//! crate owns everything around it.

pub mod adapter;
pub mod bank;
pub mod buffer;
pub mod fader;
pub mod grid;
pub mod params;
pub mod render;
pub mod sched;
pub mod state;
pub mod transport;
pub mod voice;

pub use adapter::FrameAdapter;
pub use bank::paths::PresetPaths;
pub use bank::program::Program;
pub use bank::{BankError, BankNotification, PresetBank};
pub use buffer::AudioBuffer;
pub use params::{ParamStore, PARAM_COUNT, PARAM_NAMES, PROGRAM_COUNT};
pub use render::BlockRenderer;
pub use sched::MidiScheduler;
pub use state::{load_session_state, save_session_state};
pub use transport::Transport;
pub use voice::{VoiceEngine, FRAME_LEN};
