//! Integration tests for track playback
//!
//! These tests drive stored tracks through the engine and the session:
//! - Every record reaches the caller exactly once during a full replay
//! - Pausing holds the position while the clock keeps running
//! - Scrubbing while paused shows a bounded frame at the new position

mod common;

use sa_analyzer::config::AppConfig;
use sa_analyzer::motion::{Motion, MotionGenerator};
use sa_analyzer::session::{ManualClock, PlayState, RecPlay};
use sa_analyzer::{AnalyzerSession, Body, Record, ViewState};

use common::assert_float_eq;
use common::builders::TrackBuilder;

fn session_with(track: sa_analyzer::Track) -> (AnalyzerSession<ManualClock>, ManualClock) {
    let clock = ManualClock::new(50.0);
    let mut session = AnalyzerSession::with_clock(&AppConfig::default(), clock.clone());
    session.recplay_mut().add_track(track);
    session.recplay_mut().select_track(0).unwrap();
    (session, clock)
}

#[test]
fn test_full_replay_delivers_every_record_once() {
    let track = MotionGenerator::new(0.02, 1.6).generate(Motion::BicepCurl, 1.0);
    let expected = track.sequence.clone();
    let (mut session, clock) = session_with(track);
    session.set_play_state(PlayState::Play);

    let mut delivered: Vec<Record> = Vec::new();
    for _ in 0..500 {
        let out = session.tick(None);
        delivered.extend(out.records);
        if session.recplay().state() == PlayState::Pause {
            break;
        }
        clock.advance(0.017);
    }

    assert_eq!(session.view_state(), ViewState::Playback);
    assert_eq!(session.recplay().state(), PlayState::Pause);
    assert_eq!(delivered, expected);
}

#[test]
fn test_pause_and_resume_through_session() {
    let track = TrackBuilder::new("Steps")
        .default_sensors()
        .ticks(5, &[0.0, 0.5, 1.0, 1.5, 2.0])
        .build();
    let (mut session, clock) = session_with(track);
    session.set_play_state(PlayState::Play);

    assert_eq!(session.tick(None).records.len(), 1);
    clock.advance(0.7);
    assert_eq!(session.tick(None).records.len(), 1);

    session.set_play_state(PlayState::Pause);
    clock.advance(30.0);
    let frame = session.tick(None);
    let times: Vec<f64> = frame.records.iter().map(|r| r.time).collect();
    assert_eq!(times, vec![0.0, 0.5]);
    assert_float_eq(session.recplay().elapsed(), 0.7, 1e-9);

    session.set_play_state(PlayState::Play);
    assert!(session.tick(None).records.is_empty());
    clock.advance(0.4);
    let resumed = session.tick(None);
    assert_eq!(resumed.records.len(), 1);
    assert_eq!(resumed.records[0].time, 1.0);
}

#[test]
fn test_scrub_while_paused_shows_bounded_frame() {
    let times: Vec<f64> = (0..=50).map(|i| i as f64 * 0.1).collect();
    let track = TrackBuilder::new("Five").ticks(5, &times).build();
    assert_float_eq(track.length, 5.0, 1e-9);

    let clock = ManualClock::new(0.0);
    let mut engine = RecPlay::with_clock(clock.clone());
    engine.add_track(track);
    engine.select_track(0).unwrap();
    engine.scrub_to(0.5);

    let frame = engine.play();
    assert_eq!(frame.len(), 10);
    assert!(frame.iter().all(|r| r.time <= 2.5 + 1e-9));
    assert!(frame.last().unwrap().time > 2.3);

    // Holding still keeps the same frame
    clock.advance(3.0);
    assert_eq!(engine.play(), frame);
    assert_float_eq(engine.progress(), 0.5, 1e-9);
}

#[test]
fn test_replay_applies_track_sensor_map() {
    // Sensor 40 only exists in the track's own map
    let track = TrackBuilder::new("Custom")
        .sensor(40, "Spine")
        .euler(0.0, 40, [90.0, 0.0, 0.0])
        .build();
    let (mut session, _clock) = session_with(track);

    // Selecting pauses at the start, which still shows the first frame
    let frame = session.tick(None);
    assert_eq!(frame.records.len(), 1);

    let rest = Body::new(1.6).world_positions()["Spine"];
    let spine = frame
        .positions
        .iter()
        .find(|(name, _)| name == "Spine")
        .map(|(_, p)| *p)
        .unwrap();
    assert!((spine - rest).norm() > 1.0);
}
