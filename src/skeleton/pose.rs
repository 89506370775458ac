//! Folding decoded records into pose updates

use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::types::{Record, RecordKind};

use super::body::PoseUpdate;

/// Sensor id to segment name
pub type SensorMap = BTreeMap<i64, String>;

/// Segments held at zero while no sensor is streaming
pub const IDLE_SEGMENTS: &[&str] = &[
    "RightLowerarm",
    "RightUpperarm",
    "Spine",
    "LeftLowerarm",
    "LeftUpperarm",
];

/// Persistent set of absolute segment angles.
///
/// Each Euler-angle record overwrites the angles of the segment its sensor
/// is assigned to; segments not mentioned keep their last value.
#[derive(Debug, Clone, Default)]
pub struct PoseAccumulator {
    angles: BTreeMap<String, Vector3<f64>>,
    root: Option<(Vector3<f64>, Vector3<f64>)>,
}

impl PoseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulator with the idle segments zeroed
    pub fn with_defaults() -> Self {
        let mut acc = Self::new();
        acc.reset();
        acc
    }

    /// Forget everything and go back to the idle set
    pub fn reset(&mut self) {
        self.angles = IDLE_SEGMENTS
            .iter()
            .map(|name| (name.to_string(), Vector3::zeros()))
            .collect();
        self.root = None;
    }

    /// Fold a batch into the pose. Returns the number of records used.
    pub fn absorb(&mut self, records: &[Record], sensors: &SensorMap) -> usize {
        let mut used = 0;
        for record in records {
            if record.kind != RecordKind::EulerAngles {
                continue;
            }
            let (Some(sensor), Some(angles)) = (record.sensor(), record.angles()) else {
                continue;
            };
            match sensors.get(&sensor) {
                Some(segment) => {
                    self.angles.insert(segment.clone(), angles);
                    used += 1;
                }
                None => tracing::debug!("No segment assigned to sensor {}", sensor),
            }
        }
        used
    }

    /// Set the body translation and rotation sent with the next update
    pub fn set_root(&mut self, translation: Vector3<f64>, rotation: Vector3<f64>) {
        self.root = Some((translation, rotation));
    }

    /// Current angles of a segment
    pub fn get(&self, segment: &str) -> Option<Vector3<f64>> {
        self.angles.get(segment).copied()
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.angles.contains_key(segment)
    }

    /// The pose as a body update
    pub fn updates(&self) -> Vec<PoseUpdate> {
        let mut updates = Vec::with_capacity(self.angles.len() + 1);
        if let Some((translation, rotation)) = self.root {
            updates.push(PoseUpdate::Root {
                translation,
                rotation,
            });
        }
        updates.extend(self.angles.iter().map(|(name, angles)| PoseUpdate::Segment {
            name: name.clone(),
            angles: *angles,
        }));
        updates
    }
}
