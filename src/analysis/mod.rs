//! Track analysis
//!
//! Extract time series from recorded tracks for offline inspection:
//! - Field values of one segment over time
//! - Message rates per sensor
//! - Segment positions, by replaying the track through a body
//!
//! Numerical helpers for those series live in [`integrate`].

pub mod integrate;

pub use integrate::{
    angular_velocity, cumulative_integration, tidy_angles, to_earth_frame, velocity,
    VelocitySeries,
};

use nalgebra::Vector3;

use crate::session::Track;
use crate::skeleton::{Body, PoseAccumulator};
use crate::types::RecordKind;

/// Height used when a track carries no player
const FALLBACK_HEIGHT: f64 = 1.6;

/// A sampled series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    pub time: Vec<f64>,
    pub value: Vec<f64>,
}

impl Series {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Values of `field` (e.g. `angle_X`) from every record of `segment`'s sensor
pub fn data_series(track: &Track, segment: &str, field: &str) -> Series {
    let mut series = Series::default();
    for record in &track.sequence {
        let mapped = record
            .sensor()
            .and_then(|s| track.sensor_map.get(&s))
            .is_some_and(|name| name == segment);
        if !mapped {
            continue;
        }
        if let Some(value) = record.fields.get_f64(field) {
            series.time.push(record.time);
            series.value.push(value);
        }
    }
    series
}

/// Instantaneous message rate (Hz) of one kind from one sensor.
///
/// Each point is stamped with the later of the two records it spans.
pub fn message_rate(track: &Track, kind: RecordKind, sensor: i64) -> Series {
    let mut series = Series::default();
    let mut previous: Option<f64> = None;
    for record in &track.sequence {
        if record.kind != kind || record.sensor() != Some(sensor) {
            continue;
        }
        if let Some(prev) = previous {
            let delta = record.time - prev;
            if delta > 0.0 {
                series.time.push(record.time);
                series.value.push(1.0 / delta);
            }
        }
        previous = Some(record.time);
    }
    series
}

/// World position of `segment` at every record that moves it.
///
/// Each record is applied on its own, so the other segments sit at their
/// parent's orientation.
pub fn position_series(track: &Track, segment: &str) -> Vec<(f64, Vector3<f64>)> {
    let height = track
        .player
        .as_ref()
        .map(|p| p.height)
        .unwrap_or(FALLBACK_HEIGHT);
    let mut body = Body::new(height);
    body.apply_calibration(&track.calibration);

    let mut out = Vec::new();
    for record in &track.sequence {
        let mut pose = PoseAccumulator::new();
        pose.absorb(std::slice::from_ref(record), &track.sensor_map);
        body.apply_pose_update(&pose.updates());
        if !pose.contains(segment) {
            continue;
        }
        let position = body
            .world_positions_ordered()
            .into_iter()
            .find(|(name, _)| *name == segment)
            .map(|(_, p)| p);
        if let Some(position) = position {
            out.push((record.time, position));
        }
    }
    out
}
