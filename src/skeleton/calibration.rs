//! Calibration capture
//!
//! After a trigger the [`Calibrator`] waits for the wearer to settle, then
//! averages the Euler angles of every mapped segment over a capture window.

use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::types::{Record, RecordKind};

use super::pose::SensorMap;

/// Segment name to calibration angles (degrees)
pub type CalibrationMap = BTreeMap<String, Vector3<f64>>;

/// Progress of a calibration run
#[derive(Debug, Clone, PartialEq)]
pub enum CalibrationPhase {
    /// Still inside the settle period
    Waiting { remaining: f64 },
    /// Averaging samples
    Capturing { samples: usize },
    /// Finished with the averaged angles
    Complete(CalibrationMap),
}

/// One calibration run
#[derive(Debug, Clone)]
pub struct Calibrator {
    start: f64,
    wait: f64,
    capture: f64,
    sums: BTreeMap<String, (usize, Vector3<f64>)>,
}

impl Calibrator {
    /// Start a run at clock time `start` (seconds)
    pub fn new(start: f64, wait: f64, capture: f64) -> Self {
        Self {
            start,
            wait,
            capture,
            sums: BTreeMap::new(),
        }
    }

    /// Feed a batch at clock time `now`
    pub fn feed(&mut self, records: &[Record], sensors: &SensorMap, now: f64) -> CalibrationPhase {
        let delta = now - self.start;
        if delta <= self.wait {
            return CalibrationPhase::Waiting {
                remaining: self.wait - delta,
            };
        }
        for record in records.iter().filter(|r| r.kind == RecordKind::EulerAngles) {
            let (Some(sensor), Some(angles)) = (record.sensor(), record.angles()) else {
                continue;
            };
            let Some(segment) = sensors.get(&sensor) else {
                continue;
            };
            let entry = self
                .sums
                .entry(segment.clone())
                .or_insert((0, Vector3::zeros()));
            entry.0 += 1;
            entry.1 += angles;
        }

        // The batch that closes the window still counts
        if delta >= self.wait + self.capture {
            let averaged = self
                .sums
                .iter()
                .map(|(segment, (count, sum))| (segment.clone(), sum / *count as f64))
                .collect();
            tracing::info!("Calibration complete for {} segments", self.sums.len());
            return CalibrationPhase::Complete(averaged);
        }
        CalibrationPhase::Capturing {
            samples: self.sums.values().map(|(count, _)| count).sum(),
        }
    }
}
