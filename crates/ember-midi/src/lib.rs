//! MIDI event model for the EmberSynth engine.
//!
//! Events carry a sample offset relative to the start of the host block they
//! arrived in. The engine expects event lists in non-decreasing offset order,
//! which is what every host delivers.

use serde::{Deserialize, Serialize};

/// Controller numbers the engine reacts to.
pub mod controller {
    pub const BANK_SELECT_MSB: u8 = 0;
    pub const VOLUME: u8 = 7;
    pub const PAN: u8 = 10;
    pub const BANK_SELECT_LSB: u8 = 32;
    /// Program selection for surfaces that can only send control changes.
    pub const PROGRAM_SELECT: u8 = 35;
    pub const RESET_ALL_CONTROLLERS: u8 = 121;
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// A timed MIDI event within one host block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiEvent {
    /// Sample offset from the start of the host block.
    pub offset: u32,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    NoteOn { note: u8, velocity: u8 },
    NoteOff { note: u8 },
    AllNotesOff,
    Controller { number: u8, value: u8 },
    ProgramChange { program: u8 },
    PitchWheel { lsb: u8, msb: u8 },
    /// Tempo meta event as found in standard MIDI files.
    TempoChange { seconds_per_quarter: f64 },
}

impl MidiEvent {
    pub fn new(offset: u32, kind: EventKind) -> Self {
        Self { offset, kind }
    }

    /// Decodes a channel-voice message from its raw bytes.
    ///
    /// Returns `None` for message types the engine does not consume
    /// (aftertouch, sysex fragments and the like).
    pub fn from_raw(offset: u32, data: [u8; 3]) -> Option<Self> {
        EventKind::from_raw(data).map(|kind| Self { offset, kind })
    }

    /// Builds a tempo meta event.
    pub fn tempo(offset: u32, seconds_per_quarter: f64) -> Self {
        Self {
            offset,
            kind: EventKind::TempoChange {
                seconds_per_quarter,
            },
        }
    }
}

impl EventKind {
    pub fn from_raw(data: [u8; 3]) -> Option<Self> {
        let status = data[0] & 0xF0;
        match status {
            0x80 => Some(EventKind::NoteOff { note: data[1] }),
            // Note-on with velocity zero is a note-off by convention.
            0x90 if data[2] == 0 => Some(EventKind::NoteOff { note: data[1] }),
            0x90 => Some(EventKind::NoteOn {
                note: data[1],
                velocity: data[2],
            }),
            0xB0 if data[1] == controller::ALL_NOTES_OFF => Some(EventKind::AllNotesOff),
            0xB0 => Some(EventKind::Controller {
                number: data[1],
                value: data[2],
            }),
            0xC0 => Some(EventKind::ProgramChange { program: data[1] }),
            0xE0 => Some(EventKind::PitchWheel {
                lsb: data[1] & 0x7F,
                msb: data[2] & 0x7F,
            }),
            _ => None,
        }
    }
}

/// Splits a 14-bit pitch wheel value into coarse and fine components, each
/// mapped to [-1, 1]. The coarse part selects semitones, the fine part cents.
pub fn pitch_wheel_components(lsb: u8, msb: u8) -> (f32, f32) {
    let semitones = ((msb as f32 / 127.0) - 0.5) * 2.0;
    let cents = ((lsb as f32 / 127.0) - 0.5) * 2.0;
    (semitones, cents)
}

/// Converts a tempo meta event payload into beats per minute.
pub fn bpm_from_seconds_per_quarter(seconds_per_quarter: f64) -> f64 {
    60.0 / seconds_per_quarter
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_note_messages() {
        assert_eq!(
            MidiEvent::from_raw(3, [0x90, 60, 100]).unwrap().kind,
            EventKind::NoteOn {
                note: 60,
                velocity: 100
            }
        );
        assert_eq!(
            EventKind::from_raw([0x80, 60, 0]).unwrap(),
            EventKind::NoteOff { note: 60 }
        );
    }

    #[test]
    fn note_on_with_zero_velocity_is_note_off() {
        assert_eq!(
            EventKind::from_raw([0x90, 64, 0]).unwrap(),
            EventKind::NoteOff { note: 64 }
        );
    }

    #[test]
    fn controller_123_is_all_notes_off() {
        assert_eq!(
            EventKind::from_raw([0xB0, 123, 0]).unwrap(),
            EventKind::AllNotesOff
        );
        assert_eq!(
            EventKind::from_raw([0xB1, 7, 90]).unwrap(),
            EventKind::Controller {
                number: 7,
                value: 90
            }
        );
    }

    #[test]
    fn ignores_unhandled_status_bytes() {
        assert!(EventKind::from_raw([0xA0, 60, 20]).is_none());
        assert!(EventKind::from_raw([0xD0, 4, 0]).is_none());
    }

    #[test]
    fn pitch_wheel_center_is_neutral() {
        // 0x2000 center: msb 64, lsb 0.
        let (semi, cents) = pitch_wheel_components(0, 64);
        assert!(semi.abs() < 0.01);
        assert_eq!(cents, -1.0);

        let (semi, _) = pitch_wheel_components(0, 127);
        assert_eq!(semi, 1.0);
        let (semi, _) = pitch_wheel_components(0, 0);
        assert_eq!(semi, -1.0);
    }

    #[test]
    fn tempo_conversion() {
        assert_eq!(bpm_from_seconds_per_quarter(0.5), 120.0);
    }
}
