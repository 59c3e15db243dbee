//! Dispatches timed MIDI events into the voice engine and parameter store.
//!
//! Events are delivered exactly once: callers pass disjoint, half-open
//! sample windows `[window_start, window_start + window_len)` and only the
//! events inside the window are acted on. Bank-select state is latched in
//! the scheduler and combined with a later program change into a single
//! program index staged for the control thread.

use ember_midi::{
    bpm_from_seconds_per_quarter, controller, pitch_wheel_components, EventKind, MidiEvent,
};

use crate::fader::FADER_UNITY;
use crate::params::{ParamStore, RenderCore, PROGRAM_COUNT};

/// Walks sample-offset-ordered event lists and applies them. Owns the MIDI
/// bank-select scratch registers, which arrive as separate controllers ahead
/// of the program change that uses them.
#[derive(Debug, Default)]
pub struct MidiScheduler {
    bank_msb: u8,
    bank_lsb: u8,
}

impl MidiScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatches every event inside the window, taking the render lock for
    /// the duration. Events outside the window are left for later calls.
    pub fn dispatch(
        &mut self,
        store: &ParamStore,
        events: &[MidiEvent],
        window_start: u32,
        window_len: u32,
    ) {
        let mut core = store.lock();
        self.dispatch_locked(&mut core, store, events, window_start, window_len);
    }

    /// Dispatch variant for callers already holding the render lock.
    pub(crate) fn dispatch_locked(
        &mut self,
        core: &mut RenderCore,
        store: &ParamStore,
        events: &[MidiEvent],
        window_start: u32,
        window_len: u32,
    ) {
        let window_end = window_start as u64 + window_len as u64;

        for event in events {
            if (event.offset as u64) < window_start as u64 {
                continue;
            }
            if event.offset as u64 >= window_end {
                break;
            }

            match event.kind {
                EventKind::NoteOn { note, velocity } => core.voice.note_on(note, velocity),
                EventKind::NoteOff { note } => core.voice.note_off(note),
                EventKind::AllNotesOff => core.voice.all_notes_off(),
                EventKind::PitchWheel { lsb, msb } => {
                    let (semitones, cents) = pitch_wheel_components(lsb, msb);
                    core.voice.pitch_bend(semitones, cents);
                }
                EventKind::TempoChange { seconds_per_quarter } => {
                    let bpm = bpm_from_seconds_per_quarter(seconds_per_quarter) as f32;
                    store.transport().set_bpm(bpm);
                    store.set_delays_from_tempo_locked(core, Some(bpm));
                    store.mark_any_dirty();
                }
                EventKind::Controller { number, value } => {
                    self.controller(core, store, number, value)
                }
                EventKind::ProgramChange { program } => {
                    store.request_program(self.program_index(program));
                }
            }
        }
    }

    fn controller(&mut self, core: &mut RenderCore, store: &ParamStore, number: u8, value: u8) {
        match number {
            controller::RESET_ALL_CONTROLLERS => {
                core.voice.pitch_bend(0.0, 0.0);
                store.set_master_volume(FADER_UNITY);
                store.set_master_pan(0.5);
                store.mark_any_dirty();
            }
            controller::VOLUME => {
                store.set_master_volume(value as f32 / 127.0);
                store.mark_any_dirty();
            }
            controller::PAN => {
                store.set_master_pan(value as f32 / 127.0);
                store.mark_any_dirty();
            }
            controller::BANK_SELECT_MSB => self.bank_msb = value,
            controller::BANK_SELECT_LSB => self.bank_lsb = value,
            controller::PROGRAM_SELECT => {
                store.request_program(self.program_index(value));
            }
            _ => {}
        }
    }

    fn program_index(&self, program: u8) -> usize {
        let bank = self.bank_msb as usize * 128 + self.bank_lsb as usize;
        (bank * 128 + program as usize).min(PROGRAM_COUNT - 1)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::grid;
    use crate::params::{DELAY_LEFT, DELAY_LEFT_GRID, PARAM_COUNT};
    use crate::transport::Transport;
    use crate::voice::{VoiceEngine, FRAME_LEN};

    #[derive(Default)]
    struct LogVoice {
        log: Arc<Mutex<Vec<String>>>,
    }

    impl VoiceEngine for LogVoice {
        fn note_on(&mut self, note: u8, velocity: u8) {
            self.log.lock().push(format!("on {note} {velocity}"));
        }
        fn note_off(&mut self, note: u8) {
            self.log.lock().push(format!("off {note}"));
        }
        fn all_notes_off(&mut self) {
            self.log.lock().push("all-off".into());
        }
        fn pitch_bend(&mut self, semitones: f32, cents: f32) {
            self.log.lock().push(format!("bend {semitones:.2} {cents:.2}"));
        }
        fn render(
            &mut self,
            _params: &[f32; PARAM_COUNT],
            _left: &mut [f32; FRAME_LEN],
            _right: &mut [f32; FRAME_LEN],
        ) {
        }
    }

    fn store() -> (Arc<ParamStore>, Arc<Mutex<Vec<String>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let voice = LogVoice {
            log: Arc::clone(&log),
        };
        let store = Arc::new(ParamStore::new(
            Box::new(voice),
            Arc::new(Transport::new()),
        ));
        (store, log)
    }

    fn note_on(offset: u32, note: u8) -> MidiEvent {
        MidiEvent::from_raw(offset, [0x90, note, 100]).unwrap()
    }

    #[test]
    fn disjoint_windows_deliver_each_event_exactly_once() {
        let (store, log) = store();
        let mut scheduler = MidiScheduler::new();
        let events = vec![note_on(10, 60), note_on(300, 61), note_on(700, 62)];

        scheduler.dispatch(&store, &events, 256, 256);
        assert_eq!(*log.lock(), vec!["on 61 100"]);

        scheduler.dispatch(&store, &events, 0, 256);
        scheduler.dispatch(&store, &events, 512, 512);
        assert_eq!(*log.lock(), vec!["on 61 100", "on 60 100", "on 62 100"]);
    }

    #[test]
    fn note_and_wheel_events_reach_the_voice() {
        let (store, log) = store();
        let mut scheduler = MidiScheduler::new();
        let events = vec![
            note_on(0, 60),
            MidiEvent::from_raw(1, [0x80, 60, 0]).unwrap(),
            MidiEvent::from_raw(2, [0xB0, controller::ALL_NOTES_OFF, 0]).unwrap(),
            MidiEvent::from_raw(3, [0xE0, 64, 127]).unwrap(),
        ];
        scheduler.dispatch(&store, &events, 0, 64);

        let log = log.lock();
        assert_eq!(log[0], "on 60 100");
        assert_eq!(log[1], "off 60");
        assert_eq!(log[2], "all-off");
        assert!(log[3].starts_with("bend 1.00"));
    }

    #[test]
    fn volume_and_pan_controllers_update_atomics() {
        let (store, _log) = store();
        let mut scheduler = MidiScheduler::new();
        store.reset_dirty(false);

        let events = vec![
            MidiEvent::from_raw(0, [0xB0, controller::VOLUME, 127]).unwrap(),
            MidiEvent::from_raw(1, [0xB0, controller::PAN, 0]).unwrap(),
        ];
        scheduler.dispatch(&store, &events, 0, 64);

        assert!((store.master_volume() - 1.0).abs() < 1e-3);
        assert_eq!(store.master_pan(), 0.0);
        assert!(store.is_any_dirty());
    }

    #[test]
    fn reset_all_controllers_restores_unity_and_center() {
        let (store, log) = store();
        let mut scheduler = MidiScheduler::new();
        store.set_master_volume(0.2);
        store.set_master_pan(0.9);
        store.reset_dirty(false);

        let events =
            vec![MidiEvent::from_raw(0, [0xB0, controller::RESET_ALL_CONTROLLERS, 0]).unwrap()];
        scheduler.dispatch(&store, &events, 0, 64);

        assert_eq!(store.master_gain(), 1.0);
        assert_eq!(store.master_pan(), 0.5);
        assert!(store.is_any_dirty());
        assert!(log.lock()[0].starts_with("bend 0.00 0.00"));
    }

    #[test]
    fn bank_select_combines_with_program_change() {
        let (store, _log) = store();
        let mut scheduler = MidiScheduler::new();

        let events = vec![
            MidiEvent::from_raw(0, [0xB0, controller::BANK_SELECT_MSB, 0]).unwrap(),
            MidiEvent::from_raw(1, [0xB0, controller::BANK_SELECT_LSB, 3]).unwrap(),
            MidiEvent::from_raw(2, [0xC0, 5, 0]).unwrap(),
        ];
        scheduler.dispatch(&store, &events, 0, 64);

        assert_eq!(store.take_requested_program(), Some(3 * 128 + 5));
    }

    #[test]
    fn program_select_controller_is_clamped() {
        let (store, _log) = store();
        let mut scheduler = MidiScheduler::new();

        let events = vec![
            MidiEvent::from_raw(0, [0xB0, controller::BANK_SELECT_MSB, 9]).unwrap(),
            MidiEvent::from_raw(1, [0xB0, controller::PROGRAM_SELECT, 40]).unwrap(),
        ];
        scheduler.dispatch(&store, &events, 0, 64);

        assert_eq!(store.take_requested_program(), Some(PROGRAM_COUNT - 1));
    }

    #[test]
    fn tempo_event_retunes_synced_delays() {
        let (store, _log) = store();
        let mut scheduler = MidiScheduler::new();
        store.set(DELAY_LEFT_GRID, 7.0 / grid::DELAY_GRID_COUNT as f32);
        store.reset_dirty(false);

        // 0.25 s/quarter = 240 BPM; 1/8 note = 125 ms.
        let events = vec![MidiEvent::tempo(0, 0.25)];
        scheduler.dispatch(&store, &events, 0, 64);

        assert!((store.get(DELAY_LEFT) - 125.0 / grid::MAX_DELAY_MS).abs() < 1e-6);
        assert_eq!(store.transport().bpm(), 240.0);
        assert!(store.is_any_dirty());
    }
}
