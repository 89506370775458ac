//! Record/playback engine
//!
//! [`RecPlay`] records live batches into a new track and replays stored
//! tracks paced against a [`Clock`]. It is driven once per tick by the
//! session: `record` while recording, `play` while playing or paused.
//!
//! The playback cursor is the index of the next record to deliver. During
//! uninterrupted playback every record is returned by exactly one `play`
//! call. While paused, `play` returns the last few records at or before the
//! paused time so the caller always has a frame to show.

use std::io::{BufRead, Write};

use crate::error::{Result, SaError};
use crate::stream::Skipped;
use crate::types::Record;

use super::clock::{Clock, SystemClock};
use super::tracklist::{read_tracklist, write_track};
use super::types::{PlayState, Track};

/// Default number of records returned by `play` while paused
pub const PAUSED_WINDOW: usize = 10;

/// Record/playback engine
#[derive(Debug)]
pub struct RecPlay<C: Clock = SystemClock> {
    clock: C,
    /// Finalized tracks
    tracks: Vec<Track>,
    /// Track being recorded
    recording: Option<Track>,
    /// Index of the track being played
    current: Option<usize>,
    /// Playback position in seconds from the first record
    elapsed: f64,
    /// Clock time corresponding to elapsed == 0
    start: f64,
    /// Index of the next record to deliver
    cursor: usize,
    state: PlayState,
    state_changed: bool,
    next_track_number: usize,
    paused_window: usize,
}

impl Default for RecPlay<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl RecPlay<SystemClock> {
    /// Create an engine paced by the wall clock
    pub fn new() -> Self {
        Self::with_clock(SystemClock::default())
    }
}

impl<C: Clock> RecPlay<C> {
    /// Create an engine paced by `clock`
    pub fn with_clock(clock: C) -> Self {
        let start = clock.now();
        Self {
            clock,
            tracks: Vec::new(),
            recording: None,
            current: None,
            elapsed: 0.0,
            start,
            cursor: 0,
            state: PlayState::Stop,
            state_changed: false,
            next_track_number: 1,
            paused_window: PAUSED_WINDOW,
        }
    }

    /// Set how many records `play` returns while paused
    pub fn set_paused_window(&mut self, depth: usize) {
        self.paused_window = depth.max(1);
    }

    /// Current state
    pub fn state(&self) -> PlayState {
        self.state
    }

    /// Whether an accepted transition has not been observed yet
    pub fn state_changed(&self) -> bool {
        self.state_changed
    }

    /// Acknowledge the last state change
    pub fn clear_state_changed(&mut self) {
        self.state_changed = false;
    }

    /// Stored tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Track being recorded
    pub fn recording(&self) -> Option<&Track> {
        self.recording.as_ref()
    }

    /// Mutable access to the track being recorded, for stamping metadata
    pub fn recording_mut(&mut self) -> Option<&mut Track> {
        self.recording.as_mut()
    }

    /// Track selected for playback
    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    /// Index of the track selected for playback
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Index of the next record to deliver
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Playback position in seconds
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Playback position as a fraction of the track length
    pub fn progress(&self) -> f64 {
        match self.current_track() {
            Some(track) if track.length > 0.0 => (self.elapsed / track.length).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Request a state transition.
    ///
    /// Returns `true` if the transition was accepted. Moving between play and
    /// pause is accepted without raising the state-changed flag.
    pub fn set_state(&mut self, new: PlayState) -> bool {
        if self.state == new {
            return false;
        }

        let raise_flag = match (self.state, new) {
            (_, PlayState::Record) => {
                self.begin_recording();
                true
            }
            (PlayState::Record, PlayState::Stop) => {
                self.end_recording();
                self.reset();
                true
            }
            (_, PlayState::Stop) => true,
            (PlayState::Play, PlayState::Pause) => {
                self.elapsed = self.current_elapsed();
                false
            }
            (PlayState::Pause, PlayState::Play) => {
                self.start = self.clock.now() - self.elapsed;
                false
            }
            (PlayState::Record, PlayState::Play | PlayState::Pause) => {
                self.end_recording();
                self.reset();
                true
            }
            (PlayState::Stop, PlayState::Play | PlayState::Pause) => {
                if self.current_track().is_none() {
                    tracing::warn!("Cannot start playback: no track selected");
                    return false;
                }
                self.reset();
                true
            }
            (PlayState::Play | PlayState::Pause, _) => true,
        };

        tracing::info!(
            "Playback state {} -> {}",
            self.state.display_name(),
            new.display_name()
        );
        self.state = new;
        self.state_changed |= raise_flag;
        true
    }

    /// Append a batch to the track being recorded. Returns the number of
    /// records taken.
    pub fn record(&mut self, batch: &[Record]) -> usize {
        match self.recording.as_mut() {
            Some(track) if self.state == PlayState::Record => {
                track.sequence.extend_from_slice(batch);
                batch.len()
            }
            _ => 0,
        }
    }

    /// Records newly due for this tick
    pub fn play(&mut self) -> Vec<Record> {
        match self.state {
            PlayState::Pause => self.paused_frame(),
            PlayState::Play => self.advance(),
            _ => Vec::new(),
        }
    }

    /// Move the playback position to `fraction` of the track length.
    ///
    /// A NaN or infinite fraction leaves the position unchanged.
    pub fn scrub_to(&mut self, fraction: f64) {
        if !fraction.is_finite() {
            tracing::warn!("Ignoring scrub to non-finite position {}", fraction);
            return;
        }
        let Some(track) = self.current_track() else {
            return;
        };
        let elapsed = fraction.clamp(0.0, 1.0) * track.length.max(0.0);
        let cursor = first_after(track, elapsed);

        self.elapsed = elapsed;
        self.cursor = cursor;
        self.start = self.clock.now() - elapsed;
    }

    /// Go back to the beginning of the current track
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.elapsed = 0.0;
        self.start = self.clock.now();
    }

    /// Make a stored track current, paused at its start
    pub fn select_track(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(SaError::NoTrack {
                index,
                count: self.tracks.len(),
            });
        }
        if self.state == PlayState::Record {
            self.end_recording();
        }
        self.current = Some(index);
        self.reset();
        if self.state != PlayState::Pause {
            self.state = PlayState::Pause;
            self.state_changed = true;
        }
        Ok(())
    }

    /// Add a finalized track to the stored list
    pub fn add_track(&mut self, track: Track) {
        self.tracks.push(track);
    }

    /// Replace the stored tracks with those read from `reader`.
    ///
    /// On error the engine is left untouched. Returns the skipped lines.
    pub fn load_tracklist<R: BufRead>(&mut self, reader: R) -> Result<Vec<Skipped>> {
        let read = read_tracklist(reader)?;
        tracing::info!("Loaded {} tracks", read.tracks.len());
        self.tracks = read.tracks;
        self.current = None;
        if self.state.is_playback() {
            self.state = PlayState::Stop;
            self.state_changed = true;
        }
        self.reset();
        Ok(read.skipped)
    }

    /// Write every stored track to `writer`
    pub fn write_tracklist<W: Write>(&self, writer: &mut W) -> Result<usize> {
        let mut written = 0;
        for track in &self.tracks {
            written += write_track(writer, track)?;
        }
        Ok(written)
    }

    fn begin_recording(&mut self) {
        if self.recording.is_some() {
            self.end_recording();
        }
        let mut track = Track::new(format!("Track_{}", self.next_track_number));
        self.next_track_number += 1;
        track.start_time = Some(chrono::Local::now().naive_local());
        tracing::info!("Recording {}", track.name);
        self.recording = Some(track);
    }

    fn end_recording(&mut self) {
        let Some(mut track) = self.recording.take() else {
            return;
        };
        track.finalize();
        tracing::info!(
            "Finished {}: {} records, {:.3}s",
            track.name,
            track.len(),
            track.length
        );
        self.tracks.push(track);
        self.current = Some(self.tracks.len() - 1);
    }

    fn current_elapsed(&self) -> f64 {
        let length = self.current_track().map(|t| t.length).unwrap_or(0.0);
        (self.clock.now() - self.start).min(length.max(0.0))
    }

    fn paused_frame(&mut self) -> Vec<Record> {
        self.start = self.clock.now() - self.elapsed;
        let Some(track) = self.current.and_then(|i| self.tracks.get(i)) else {
            return Vec::new();
        };
        let end = first_after(track, self.elapsed);
        let begin = end.saturating_sub(self.paused_window);
        self.cursor = end;
        track.sequence[begin..end].to_vec()
    }

    fn advance(&mut self) -> Vec<Record> {
        let Some(index) = self.current.filter(|i| *i < self.tracks.len()) else {
            return Vec::new();
        };

        let length = self.tracks[index].length.max(0.0);
        let mut elapsed = self.clock.now() - self.start;
        if elapsed >= length {
            elapsed = length;
            tracing::debug!("Reached end of {}", self.tracks[index].name);
            self.state = PlayState::Pause;
        }
        self.elapsed = elapsed;

        let track = &self.tracks[index];
        let due = track.sequence[self.cursor.min(track.len())..]
            .iter()
            .take_while(|r| track.relative_time(r) <= elapsed)
            .count();
        let from = self.cursor.min(track.len());
        self.cursor = from + due;
        track.sequence[from..self.cursor].to_vec()
    }
}

/// Index of the first record later than `elapsed` seconds into the track
fn first_after(track: &Track, elapsed: f64) -> usize {
    track
        .sequence
        .iter()
        .position(|r| track.relative_time(r) > elapsed)
        .unwrap_or(track.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::clock::ManualClock;

    fn engine_with_track(times: &[f64]) -> (RecPlay<ManualClock>, ManualClock) {
        let clock = ManualClock::new(100.0);
        let mut engine = RecPlay::with_clock(clock.clone());
        let mut track = Track::new("Test");
        track.sequence = times
            .iter()
            .map(|t| Record::euler(*t, 1, 0.0, 0.0, 0.0))
            .collect();
        track.finalize();
        engine.add_track(track);
        engine.select_track(0).unwrap();
        engine.clear_state_changed();
        (engine, clock)
    }

    fn times(records: &[Record]) -> Vec<f64> {
        records.iter().map(|r| r.time).collect()
    }

    #[test]
    fn test_record_then_stop_finalizes() {
        let clock = ManualClock::new(0.0);
        let mut engine = RecPlay::with_clock(clock);

        assert!(engine.set_state(PlayState::Record));
        assert!(engine.state_changed());
        engine.clear_state_changed();

        let batch = vec![
            Record::euler(10.0, 1, 0.0, 0.0, 0.0),
            Record::euler(10.5, 1, 0.0, 0.0, 0.0),
        ];
        assert_eq!(engine.record(&batch), 2);
        // Verbatim until finalize
        assert_eq!(engine.recording().unwrap().sequence[0].time, 10.0);

        assert!(engine.set_state(PlayState::Stop));
        assert!(engine.state_changed());
        assert_eq!(engine.tracks().len(), 1);
        assert_eq!(engine.tracks()[0].name, "Track_1");
        assert_eq!(engine.tracks()[0].sequence[0].time, 0.0);
        assert_eq!(engine.tracks()[0].length, 0.5);
        assert!(engine.tracks()[0].start_time.is_some());
        assert_eq!(engine.cursor(), 0);
    }

    #[test]
    fn test_tracks_are_auto_named() {
        let mut engine = RecPlay::with_clock(ManualClock::new(0.0));
        for _ in 0..3 {
            engine.set_state(PlayState::Record);
            engine.record(&[Record::euler(0.0, 1, 0.0, 0.0, 0.0)]);
            engine.set_state(PlayState::Stop);
        }
        let names: Vec<_> = engine.tracks().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Track_1", "Track_2", "Track_3"]);
    }

    #[test]
    fn test_record_ignored_when_not_recording() {
        let mut engine = RecPlay::with_clock(ManualClock::new(0.0));
        assert_eq!(engine.record(&[Record::euler(0.0, 1, 0.0, 0.0, 0.0)]), 0);
    }

    #[test]
    fn test_record_to_play_starts_from_zero() {
        let clock = ManualClock::new(0.0);
        let mut engine = RecPlay::with_clock(clock.clone());
        engine.set_state(PlayState::Record);
        engine.record(&[
            Record::euler(3.0, 1, 0.0, 0.0, 0.0),
            Record::euler(4.0, 1, 0.0, 0.0, 0.0),
        ]);
        clock.advance(7.0);

        assert!(engine.set_state(PlayState::Play));
        assert!(engine.state_changed());
        assert_eq!(engine.current_index(), Some(0));

        let first = engine.play();
        assert_eq!(times(&first), vec![0.0]);
    }

    #[test]
    fn test_play_without_track_is_rejected() {
        let mut engine = RecPlay::with_clock(ManualClock::new(0.0));
        assert!(!engine.set_state(PlayState::Play));
        assert_eq!(engine.state(), PlayState::Stop);
        assert!(!engine.state_changed());
    }

    #[test]
    fn test_play_pause_does_not_raise_flag() {
        let (mut engine, _clock) = engine_with_track(&[0.0, 1.0]);
        assert!(engine.set_state(PlayState::Play));
        assert!(!engine.state_changed());
        assert!(engine.set_state(PlayState::Pause));
        assert!(!engine.state_changed());
        assert!(!engine.set_state(PlayState::Pause));
    }

    #[test]
    fn test_paced_delivery() {
        let (mut engine, clock) = engine_with_track(&[0.0, 0.5, 1.0, 1.5, 2.0]);
        engine.set_state(PlayState::Play);

        assert_eq!(times(&engine.play()), vec![0.0]);
        clock.advance(0.6);
        assert_eq!(times(&engine.play()), vec![0.5]);
        clock.advance(0.1);
        assert!(engine.play().is_empty());
        clock.advance(0.9);
        assert_eq!(times(&engine.play()), vec![1.0, 1.5]);
        assert_eq!(engine.cursor(), 4);

        clock.advance(10.0);
        assert_eq!(times(&engine.play()), vec![2.0]);
        assert_eq!(engine.state(), PlayState::Pause);
        assert_eq!(engine.elapsed(), 2.0);
        assert_eq!(engine.progress(), 1.0);
    }

    #[test]
    fn test_pause_resume_keeps_cursor() {
        let (mut engine, clock) = engine_with_track(&[0.0, 0.5, 1.0, 1.5, 2.0]);
        engine.set_state(PlayState::Play);
        clock.advance(1.2);
        engine.play();
        let cursor = engine.cursor();

        engine.set_state(PlayState::Pause);
        engine.play();
        engine.set_state(PlayState::Play);
        assert_eq!(engine.cursor(), cursor);
        assert!(engine.play().is_empty());

        clock.advance(0.4);
        assert_eq!(times(&engine.play()), vec![1.5]);
    }

    #[test]
    fn test_pause_holds_position_while_clock_runs() {
        let (mut engine, clock) = engine_with_track(&[0.0, 0.5, 1.0, 1.5, 2.0]);
        engine.set_state(PlayState::Play);
        clock.advance(0.7);
        engine.play();

        engine.set_state(PlayState::Pause);
        clock.advance(5.0);
        assert_eq!(times(&engine.play()), vec![0.0, 0.5]);

        engine.set_state(PlayState::Play);
        clock.advance(0.4);
        assert_eq!(times(&engine.play()), vec![1.0]);
    }

    #[test]
    fn test_paused_window_is_bounded() {
        let timeline: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let (mut engine, _clock) = engine_with_track(&timeline);
        engine.scrub_to(0.5);

        let frame = engine.play();
        assert_eq!(frame.len(), 10);
        assert!(frame.iter().all(|r| r.time <= engine.elapsed() + 1e-9));
        assert!((frame.last().unwrap().time - 2.4).abs() < 1e-9);
    }

    #[test]
    fn test_scrub_while_playing_continues_from_new_position() {
        let (mut engine, clock) = engine_with_track(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        engine.set_state(PlayState::Play);
        engine.play();

        engine.scrub_to(0.5);
        assert!(engine.play().is_empty());
        clock.advance(1.5);
        assert_eq!(times(&engine.play()), vec![3.0]);
    }

    #[test]
    fn test_scrub_to_non_finite_is_ignored() {
        let (mut engine, clock) = engine_with_track(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        engine.set_state(PlayState::Play);
        engine.play();
        clock.advance(1.0);
        assert_eq!(times(&engine.play()), vec![1.0]);

        engine.scrub_to(f64::NAN);
        engine.scrub_to(f64::INFINITY);
        assert_eq!(engine.elapsed(), 1.0);
        assert_eq!(engine.cursor(), 2);

        clock.advance(1.0);
        assert_eq!(times(&engine.play()), vec![2.0]);
    }

    #[test]
    fn test_select_track_pauses_at_start() {
        let (mut engine, _clock) = engine_with_track(&[0.0, 1.0]);
        engine.set_state(PlayState::Play);
        engine.set_state(PlayState::Stop);
        engine.clear_state_changed();

        engine.select_track(0).unwrap();
        assert_eq!(engine.state(), PlayState::Pause);
        assert!(engine.state_changed());
        assert_eq!(engine.elapsed(), 0.0);
        assert!(matches!(
            engine.select_track(5),
            Err(SaError::NoTrack { index: 5, count: 1 })
        ));
    }

    #[test]
    fn test_record_to_pause_keeps_recording() {
        let mut engine = RecPlay::with_clock(ManualClock::new(0.0));
        engine.set_state(PlayState::Record);
        engine.record(&[Record::euler(2.0, 1, 0.0, 0.0, 0.0)]);
        assert!(engine.set_state(PlayState::Pause));
        assert_eq!(engine.tracks().len(), 1);
        assert_eq!(times(&engine.play()), vec![0.0]);
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_exactly_once_delivery(
            gaps in prop::collection::vec(0u32..200, 1..60),
            steps in prop::collection::vec(1u32..150, 1..200)
        ) {
            let mut t = 0.0;
            let timeline: Vec<f64> = gaps
                .iter()
                .map(|g| {
                    t += *g as f64 / 1000.0;
                    t
                })
                .collect();
            let (mut engine, clock) = engine_with_track(&timeline);
            engine.set_state(PlayState::Play);

            let mut delivered = engine.play();
            for step in &steps {
                clock.advance(*step as f64 / 1000.0);
                if engine.state() != PlayState::Play {
                    break;
                }
                delivered.extend(engine.play());
            }
            clock.advance(1000.0);
            if engine.state() == PlayState::Play {
                delivered.extend(engine.play());
            }

            let expected = engine.current_track().unwrap().sequence.clone();
            prop_assert_eq!(delivered, expected);
        }
    }
}
