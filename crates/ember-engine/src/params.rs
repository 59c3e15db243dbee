//! Parameter store shared between the audio-render and control threads.
//!
//! The bulk parameter array and the voice engine live behind a single render
//! lock; everything the audio thread needs in its per-block hot path (master
//! gain and pan, meter levels, the staged program-change request) is kept in
//! lock-free atomics so a slow control thread can never stall it there. A
//! per-parameter dirty vector lets a polling UI learn what changed without
//! touching the render path.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use atomic_float::AtomicF32;
use parking_lot::{Mutex, MutexGuard};

use crate::fader;
use crate::grid;
use crate::transport::Transport;
use crate::voice::{VoiceEngine, MOD_NEUTRAL};

pub const PARAM_COUNT: usize = 40;

/// Number of addressable program slots (8 MIDI banks of 128).
pub const PROGRAM_COUNT: usize = 1024;

pub const DELAY_LEFT: usize = 36;
pub const DELAY_RIGHT: usize = 37;
pub const DELAY_LEFT_GRID: usize = 38;
pub const DELAY_RIGHT_GRID: usize = 39;

/// Host-visible parameter names, also used as keys in program files.
pub const PARAM_NAMES: [&str; PARAM_COUNT] = [
    "OscVolume",
    "OscShape",
    "OscDetune",
    "OscOctave",
    "OscSpread",
    "OscGlide",
    "SubVolume",
    "SubShape",
    "NoiseVolume",
    "NoiseColor",
    "FilterCutoff",
    "FilterResonance",
    "FilterDrive",
    "FilterEnvAmount",
    "AmpAttack",
    "AmpDecay",
    "AmpSustain",
    "AmpRelease",
    "FilterAttack",
    "FilterDecay",
    "FilterSustain",
    "FilterRelease",
    "Lfo1Rate",
    "Lfo1Depth",
    "Lfo1Shape",
    "Lfo2Rate",
    "Lfo2Depth",
    "Lfo2Shape",
    "ModWheelAmount",
    "PitchBendRange",
    "ChorusAmount",
    "ChorusRate",
    "ReverbMix",
    "ReverbSize",
    "DelayWet",
    "DelayFeedback",
    "DelayLeft",
    "DelayRight",
    "DelayLeftGrid",
    "DelayRightGrid",
];

pub const PARAM_DEFAULTS: [f32; PARAM_COUNT] = [
    0.8, 0.5, 0.5, 0.5, 0.0, // oscillator
    0.0, 0.0, 0.0, 0.0, 0.5, // sub + noise
    1.0, 0.0, 0.0, 0.5, 0.0, // filter + amp attack
    0.5, 1.0, 0.1, 0.0, 0.5, // envelopes
    1.0, 0.1, 0.5, 0.0, 0.0, // envelopes + lfo1
    0.5, 0.0, 0.0, 0.5, 0.2, // lfo2 + performance
    0.0, 0.3, 0.0, 0.5, 0.0, // chorus + reverb + delay wet
    0.3, 0.25, 0.25, 0.0, 0.0, // delay times and grids
];

/// The two trailing grid selectors are meta parameters: they steer other
/// parameters rather than sounding themselves, which hosts need to know for
/// automation purposes.
pub fn is_meta_parameter(index: usize) -> bool {
    index >= PARAM_COUNT - 2
}

pub fn param_name(index: usize) -> &'static str {
    PARAM_NAMES[index]
}

pub fn param_index(name: &str) -> Option<usize> {
    PARAM_NAMES.iter().position(|candidate| *candidate == name)
}

/// Everything guarded by the render lock: the live parameter array and the
/// voice engine's mutable state.
pub struct RenderCore {
    pub values: [f32; PARAM_COUNT],
    pub voice: Box<dyn VoiceEngine>,
}

pub struct ParamStore {
    core: Mutex<RenderCore>,
    dirty: [AtomicBool; PARAM_COUNT],
    any_dirty: AtomicBool,
    program_switched: AtomicBool,
    // Hot-path scalars: read every block on the audio thread, so they must
    // never contend with control-thread disk I/O.
    master_gain: AtomicF32,
    master_pan: AtomicF32,
    meter_levels: [AtomicF32; 2],
    metering: AtomicBool,
    requested_program: AtomicU32,
    program_change_pending: AtomicBool,
    transport: Arc<Transport>,
}

impl ParamStore {
    pub fn new(voice: Box<dyn VoiceEngine>, transport: Arc<Transport>) -> Self {
        Self {
            core: Mutex::new(RenderCore {
                values: PARAM_DEFAULTS,
                voice,
            }),
            dirty: std::array::from_fn(|_| AtomicBool::new(false)),
            any_dirty: AtomicBool::new(false),
            program_switched: AtomicBool::new(false),
            master_gain: AtomicF32::new(1.0),
            master_pan: AtomicF32::new(0.5),
            meter_levels: std::array::from_fn(|_| AtomicF32::new(0.0)),
            metering: AtomicBool::new(false),
            requested_program: AtomicU32::new(0),
            program_change_pending: AtomicBool::new(false),
            transport,
        }
    }

    /// Acquires the render lock.
    pub fn lock(&self) -> MutexGuard<'_, RenderCore> {
        self.core.lock()
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn get(&self, index: usize) -> f32 {
        debug_assert!(index < PARAM_COUNT, "parameter index {index} out of range");
        if index >= PARAM_COUNT {
            return 0.0;
        }
        self.core.lock().values[index]
    }

    pub fn set(&self, index: usize, value: f32) {
        let mut core = self.core.lock();
        self.set_locked(&mut core, index, value);
    }

    pub(crate) fn set_locked(&self, core: &mut RenderCore, index: usize, value: f32) {
        debug_assert!(index < PARAM_COUNT, "parameter index {index} out of range");
        if index >= PARAM_COUNT {
            return;
        }

        core.values[index] = value;
        self.dirty[index].store(true, Ordering::Relaxed);

        // Grid selectors overwrite their paired delay time so the UI never
        // shows a stale value; moving a delay slider by hand drops its grid
        // back to "free" so the next tempo change leaves it alone.
        match index {
            DELAY_LEFT_GRID => {
                let resolved = self.delay_from_grid(core, DELAY_LEFT, value, None);
                core.values[DELAY_LEFT] = resolved;
                self.dirty[DELAY_LEFT].store(true, Ordering::Relaxed);
            }
            DELAY_RIGHT_GRID => {
                let resolved = self.delay_from_grid(core, DELAY_RIGHT, value, None);
                core.values[DELAY_RIGHT] = resolved;
                self.dirty[DELAY_RIGHT].store(true, Ordering::Relaxed);
            }
            DELAY_LEFT => {
                core.values[DELAY_LEFT_GRID] = 0.0;
                self.dirty[DELAY_LEFT_GRID].store(true, Ordering::Relaxed);
            }
            DELAY_RIGHT => {
                core.values[DELAY_RIGHT_GRID] = 0.0;
                self.dirty[DELAY_RIGHT_GRID].store(true, Ordering::Relaxed);
            }
            _ => {}
        }

        self.any_dirty.store(true, Ordering::Relaxed);
    }

    fn delay_from_grid(
        &self,
        core: &RenderCore,
        delay_index: usize,
        grid_value: f32,
        bpm: Option<f32>,
    ) -> f32 {
        let bpm = bpm.unwrap_or_else(|| self.transport.bpm());
        grid::resolve_delay(core.values[delay_index], grid_value, bpm)
    }

    /// Re-resolves both tempo-synced delay channels, e.g. at start of
    /// playback or on a tempo meta event. `bpm` falls back to the transport's
    /// last known tempo.
    pub fn set_delays_from_tempo(&self, bpm: Option<f32>) {
        let mut core = self.core.lock();
        self.set_delays_from_tempo_locked(&mut core, bpm);
    }

    pub(crate) fn set_delays_from_tempo_locked(&self, core: &mut RenderCore, bpm: Option<f32>) {
        for (delay, grid_param) in [(DELAY_RIGHT, DELAY_RIGHT_GRID), (DELAY_LEFT, DELAY_LEFT_GRID)]
        {
            let grid_value = core.values[grid_param];
            if grid_value > 0.0 {
                let resolved = self.delay_from_grid(core, delay, grid_value, bpm);
                core.values[delay] = resolved;
                self.dirty[delay].store(true, Ordering::Relaxed);
            }
        }
    }

    /// Overwrites the full live array without touching dirty flags; used by
    /// program switches and session restore, which refresh the UI wholesale.
    pub fn apply_values(&self, values: &[f32; PARAM_COUNT]) {
        self.core.lock().values = *values;
    }

    pub fn snapshot(&self) -> [f32; PARAM_COUNT] {
        self.core.lock().values
    }

    pub fn is_dirty(&self, index: usize) -> bool {
        debug_assert!(index < PARAM_COUNT, "parameter index {index} out of range");
        if index >= PARAM_COUNT {
            return false;
        }
        self.dirty[index].load(Ordering::Relaxed)
    }

    pub fn is_any_dirty(&self) -> bool {
        self.any_dirty.load(Ordering::Relaxed)
    }

    /// Clears (or, with `dirty = true`, raises) every dirty flag in one pass.
    /// Passing `true` forces a full UI refresh after a program switch.
    pub fn reset_dirty(&self, dirty: bool) {
        for flag in &self.dirty {
            flag.store(dirty, Ordering::Relaxed);
        }
        self.program_switched.store(dirty, Ordering::Relaxed);
        self.any_dirty.store(dirty, Ordering::Relaxed);
    }

    pub fn was_program_switched(&self) -> bool {
        self.program_switched.load(Ordering::Relaxed)
    }

    /// Raises only the coarse any-dirty flag, for changes that live outside
    /// the parameter array (master volume/pan, tempo-driven updates).
    pub(crate) fn mark_any_dirty(&self) {
        self.any_dirty.store(true, Ordering::Relaxed);
    }

    /// Instantaneous modulation contribution for a modulation-matrix output,
    /// from the most recently triggered voice; 0 while nothing plays or when
    /// the matrix sits at its neutral value.
    pub fn resolve_modulation(&self, output: usize) -> f32 {
        let core = self.core.lock();
        match core.voice.modulation(output) {
            Some(value) if value != MOD_NEUTRAL => value,
            _ => 0.0,
        }
    }

    /// Master volume as fader position 0..1.
    pub fn master_volume(&self) -> f32 {
        fader::gain_to_fader(self.master_gain.load(Ordering::Relaxed))
    }

    /// Sets master volume from a fader position 0..1.
    pub fn set_master_volume(&self, position: f32) {
        self.master_gain
            .store(fader::fader_to_gain(position.clamp(0.0, 1.0)), Ordering::Relaxed);
    }

    /// Linear master gain for the render path.
    pub fn master_gain(&self) -> f32 {
        self.master_gain.load(Ordering::Relaxed)
    }

    /// Master pan fader 0..1, 0.5 = center.
    pub fn master_pan(&self) -> f32 {
        self.master_pan.load(Ordering::Relaxed)
    }

    pub fn set_master_pan(&self, pan: f32) {
        self.master_pan.store(pan.clamp(0.0, 1.0), Ordering::Relaxed);
    }

    pub fn metering_enabled(&self) -> bool {
        self.metering.load(Ordering::Relaxed)
    }

    pub fn set_metering(&self, enabled: bool) {
        self.metering.store(enabled, Ordering::Relaxed);
    }

    /// Peak level of the given channel over the last rendered block.
    pub fn meter_level(&self, channel: usize) -> f32 {
        self.meter_levels
            .get(channel)
            .map(|level| level.load(Ordering::Relaxed))
            .unwrap_or(0.0)
    }

    pub(crate) fn set_meter_level(&self, channel: usize, level: f32) {
        if let Some(slot) = self.meter_levels.get(channel) {
            slot.store(level, Ordering::Relaxed);
        }
    }

    /// Stages a program change from the audio thread. The actual switch may
    /// touch disk, so it runs on the control thread; see
    /// [`take_requested_program`](Self::take_requested_program).
    pub(crate) fn request_program(&self, index: usize) {
        let clamped = index.min(PROGRAM_COUNT - 1) as u32;
        self.requested_program.store(clamped, Ordering::Relaxed);
        self.program_change_pending.store(true, Ordering::Release);
    }

    /// Consumes a staged program-change request, if any. Called from the
    /// control thread's poll cycle.
    pub fn take_requested_program(&self) -> Option<usize> {
        if self.program_change_pending.swap(false, Ordering::Acquire) {
            Some(self.requested_program.load(Ordering::Relaxed) as usize)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::FRAME_LEN;

    struct SilentVoice;

    impl VoiceEngine for SilentVoice {
        fn note_on(&mut self, _note: u8, _velocity: u8) {}
        fn note_off(&mut self, _note: u8) {}
        fn all_notes_off(&mut self) {}
        fn pitch_bend(&mut self, _semitones: f32, _cents: f32) {}
        fn render(
            &mut self,
            _params: &[f32; PARAM_COUNT],
            _left: &mut [f32; FRAME_LEN],
            _right: &mut [f32; FRAME_LEN],
        ) {
        }
    }

    struct ModVoice {
        playing: bool,
        value: f32,
    }

    impl VoiceEngine for ModVoice {
        fn note_on(&mut self, _note: u8, _velocity: u8) {}
        fn note_off(&mut self, _note: u8) {}
        fn all_notes_off(&mut self) {}
        fn pitch_bend(&mut self, _semitones: f32, _cents: f32) {}
        fn render(
            &mut self,
            _params: &[f32; PARAM_COUNT],
            _left: &mut [f32; FRAME_LEN],
            _right: &mut [f32; FRAME_LEN],
        ) {
        }
        fn modulation(&self, _output: usize) -> Option<f32> {
            self.playing.then_some(self.value)
        }
    }

    fn store() -> ParamStore {
        ParamStore::new(Box::new(SilentVoice), Arc::new(Transport::new()))
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = store();
        for index in 0..PARAM_COUNT {
            if index == DELAY_LEFT_GRID || index == DELAY_RIGHT_GRID {
                continue;
            }
            store.set(index, 0.625);
            assert_eq!(store.get(index), 0.625);
        }
    }

    #[test]
    fn setting_grid_overwrites_paired_delay() {
        let store = store();
        store.reset_dirty(false);

        let value = 7.0 / grid::DELAY_GRID_COUNT as f32; // 1/8 note
        store.set(DELAY_LEFT_GRID, value);

        // 120 BPM default: 250 ms normalized.
        let expected = 250.0 / grid::MAX_DELAY_MS;
        assert!((store.get(DELAY_LEFT) - expected).abs() < 1e-6);
        assert!(store.is_dirty(DELAY_LEFT));
        assert!(store.is_dirty(DELAY_LEFT_GRID));
        assert!(store.is_any_dirty());
    }

    #[test]
    fn setting_delay_resets_paired_grid_to_free() {
        let store = store();
        store.set(DELAY_RIGHT_GRID, 10.0 / grid::DELAY_GRID_COUNT as f32);
        store.reset_dirty(false);

        store.set(DELAY_RIGHT, 0.33);
        assert_eq!(store.get(DELAY_RIGHT), 0.33);
        assert_eq!(store.get(DELAY_RIGHT_GRID), 0.0);
        assert!(store.is_dirty(DELAY_RIGHT));
        assert!(store.is_dirty(DELAY_RIGHT_GRID));
    }

    #[test]
    fn tempo_change_skips_free_delays() {
        let store = store();
        store.set(DELAY_LEFT, 0.1);
        store.reset_dirty(false);

        store.set_delays_from_tempo(Some(60.0));
        assert_eq!(store.get(DELAY_LEFT), 0.1);
        assert!(!store.is_dirty(DELAY_LEFT));
    }

    #[test]
    fn tempo_change_recomputes_synced_delays() {
        let store = store();
        store.set(DELAY_LEFT_GRID, 7.0 / grid::DELAY_GRID_COUNT as f32);
        store.reset_dirty(false);

        store.set_delays_from_tempo(Some(60.0)); // 1/8 at 60 BPM = 500 ms
        assert!((store.get(DELAY_LEFT) - 500.0 / grid::MAX_DELAY_MS).abs() < 1e-6);
        assert!(store.is_dirty(DELAY_LEFT));
    }

    #[test]
    fn reset_dirty_true_forces_full_refresh() {
        let store = store();
        store.reset_dirty(true);
        assert!(store.is_any_dirty());
        assert!(store.was_program_switched());
        assert!((0..PARAM_COUNT).all(|index| store.is_dirty(index)));

        store.reset_dirty(false);
        assert!(!store.is_any_dirty());
        assert!(!store.was_program_switched());
        assert!((0..PARAM_COUNT).all(|index| !store.is_dirty(index)));
    }

    #[test]
    fn modulation_is_zero_without_playing_voice() {
        let silent = ParamStore::new(
            Box::new(ModVoice {
                playing: false,
                value: 0.7,
            }),
            Arc::new(Transport::new()),
        );
        assert_eq!(silent.resolve_modulation(0), 0.0);

        let neutral = ParamStore::new(
            Box::new(ModVoice {
                playing: true,
                value: MOD_NEUTRAL,
            }),
            Arc::new(Transport::new()),
        );
        assert_eq!(neutral.resolve_modulation(0), 0.0);

        let active = ParamStore::new(
            Box::new(ModVoice {
                playing: true,
                value: 0.7,
            }),
            Arc::new(Transport::new()),
        );
        assert_eq!(active.resolve_modulation(0), 0.7);
    }

    #[test]
    fn master_volume_unity_round_trip() {
        let store = store();
        store.set_master_volume(fader::FADER_UNITY);
        assert_eq!(store.master_gain(), 1.0);
        assert!((store.master_volume() - fader::FADER_UNITY).abs() < 5e-3);
    }

    #[test]
    fn requested_program_is_consumed_once() {
        let store = store();
        assert_eq!(store.take_requested_program(), None);

        store.request_program(2000);
        assert_eq!(store.take_requested_program(), Some(PROGRAM_COUNT - 1));
        assert_eq!(store.take_requested_program(), None);
    }

    #[test]
    fn meta_parameters_are_the_grid_selectors() {
        assert!(is_meta_parameter(DELAY_LEFT_GRID));
        assert!(is_meta_parameter(DELAY_RIGHT_GRID));
        assert!(!is_meta_parameter(DELAY_LEFT));
        assert!(!is_meta_parameter(0));
    }

    #[test]
    fn name_table_is_consistent() {
        assert_eq!(param_index("FilterCutoff"), Some(10));
        assert_eq!(param_index("DelayRightGrid"), Some(DELAY_RIGHT_GRID));
        assert_eq!(param_index("NoSuchParam"), None);
        for (index, name) in PARAM_NAMES.iter().enumerate() {
            assert_eq!(param_index(name), Some(index));
        }
    }
}
