//! Session data types

use chrono::NaiveDateTime;

use crate::skeleton::{CalibrationMap, Player, SensorMap};
use crate::types::Record;

/// State of the record/playback engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayState {
    /// Nothing recording or playing
    #[default]
    Stop,
    /// Appending live records to a new track
    Record,
    /// Replaying the current track against the clock
    Play,
    /// Playback frozen at the current position
    Pause,
}

impl PlayState {
    /// Check if currently recording
    pub fn is_recording(&self) -> bool {
        matches!(self, PlayState::Record)
    }

    /// Check if playing or paused on a track
    pub fn is_playback(&self) -> bool {
        matches!(self, PlayState::Play | PlayState::Pause)
    }

    /// Display name for the state
    pub fn display_name(&self) -> &'static str {
        match self {
            PlayState::Stop => "Stopped",
            PlayState::Record => "Recording",
            PlayState::Play => "Playing",
            PlayState::Pause => "Paused",
        }
    }
}

/// Begin, end and duration of a track's records, in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackDetails {
    pub begin: f64,
    pub end: f64,
    pub duration: f64,
}

/// A recorded sequence of records with the session context it was taken in
#[derive(Debug, Clone, Default)]
pub struct Track {
    /// Track name
    pub name: String,
    /// Length in seconds, set by [`Track::finalize`]
    pub length: f64,
    /// Wall-clock time the recording started
    pub start_time: Option<NaiveDateTime>,
    /// Records in arrival order
    pub sequence: Vec<Record>,
    /// Calibration in effect when recorded
    pub calibration: CalibrationMap,
    /// Sensor assignment in effect when recorded
    pub sensor_map: SensorMap,
    /// Player wearing the garment
    pub player: Option<Player>,
}

impl Track {
    /// Create an empty track
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Time of the first record
    pub fn first_time(&self) -> f64 {
        self.sequence.first().map(|r| r.time).unwrap_or(0.0)
    }

    /// Time of `record` relative to the first record
    pub fn relative_time(&self, record: &Record) -> f64 {
        record.time - self.first_time()
    }

    /// Shift every record so the first is at 0.0 and set the length.
    ///
    /// Returns `false` if the length came out negative; the track is kept
    /// either way.
    pub fn finalize(&mut self) -> bool {
        let (Some(first), Some(last)) = (self.sequence.first(), self.sequence.last()) else {
            self.length = 0.0;
            tracing::warn!("Track {} has no records", self.name);
            return true;
        };
        let start = first.time;
        self.length = last.time - start;

        for record in &mut self.sequence {
            record.time -= start;
        }

        if self.length < 0.0 {
            tracing::warn!(
                "Track {} has negative length {:.3}s, records are out of order",
                self.name,
                self.length
            );
            return false;
        }
        true
    }

    /// Whether the computed length is non-negative
    pub fn is_consistent(&self) -> bool {
        self.length >= 0.0
    }

    /// Begin, end and duration of the records
    pub fn details(&self) -> Option<TrackDetails> {
        let begin = self.sequence.first()?.time;
        let end = self.sequence.last()?.time;
        Some(TrackDetails {
            begin,
            end,
            duration: end - begin,
        })
    }
}
