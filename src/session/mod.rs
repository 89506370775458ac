//! Session recording and playback module
//!
//! This module records live sensor batches into tracks, persists track lists
//! and plays tracks back against a clock.
//!
//! # Features
//!
//! - Record live batches into auto-named tracks
//! - Save and load track lists in the line-based track format
//! - Play back at real time with pause, resume and scrubbing
//! - Inject a [`ManualClock`] for deterministic pacing

pub mod clock;
pub mod recplay;
pub mod tracklist;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use recplay::RecPlay;
pub use tracklist::{load_tracklist, read_tracklist, save_tracklist, write_track, TrackListRead};
pub use types::{PlayState, Track, TrackDetails};
