//! Synthetic motion tracks
//!
//! Generates simple, repeatable movements (squat, folding arms, bicep curl,
//! bow) as tracks in the same shape a garment recording has, for exercising
//! playback and the skeleton without hardware.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::config::DEFAULT_SENSORS;
use crate::session::Track;
use crate::skeleton::{Player, SensorMap};
use crate::types::{FieldValue, Fields, Record, RecordKind};

/// Default sample period in seconds
pub const DEFAULT_TIME_STEP: f64 = 0.02;

/// Available movements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    /// Knees and ankles bend together
    Squat,
    /// Upper and lower arms swing across the chest
    FoldArms,
    /// Forearms and hands curl, twice
    BicepCurl,
    /// Spine bends forward, twice
    Bow,
}

impl Motion {
    pub fn all() -> &'static [Motion] {
        &[Motion::Squat, Motion::FoldArms, Motion::BicepCurl, Motion::Bow]
    }

    /// Track name used for this movement
    pub fn label(&self) -> &'static str {
        match self {
            Motion::Squat => "Squat",
            Motion::FoldArms => "Fold_Arms",
            Motion::BicepCurl => "Bicep_Curl",
            Motion::Bow => "Bow_2X",
        }
    }

    fn repetitions(&self) -> usize {
        match self {
            Motion::BicepCurl | Motion::Bow => 2,
            Motion::Squat | Motion::FoldArms => 1,
        }
    }
}

impl fmt::Display for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Motion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "").replace('-', "").as_str() {
            "squat" => Ok(Motion::Squat),
            "foldarms" => Ok(Motion::FoldArms),
            "bicepcurl" => Ok(Motion::BicepCurl),
            "bow" | "bow2x" => Ok(Motion::Bow),
            other => Err(format!("unknown motion: {}", other)),
        }
    }
}

/// Which axis carries the moving angle
#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
}

/// Builds motion tracks for one player
#[derive(Debug, Clone)]
pub struct MotionGenerator {
    time_step: f64,
    player: Player,
}

impl Default for MotionGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TIME_STEP, 1.6)
    }
}

impl MotionGenerator {
    pub fn new(time_step: f64, height: f64) -> Self {
        Self {
            time_step,
            player: Player::new("Marvin", "standard", height),
        }
    }

    /// Generate one movement lasting `period` seconds per repetition
    pub fn generate(&self, motion: Motion, period: f64) -> Track {
        let mut track = Track::new(motion.label());
        track.player = Some(self.player.snapshot());
        track.sensor_map = DEFAULT_SENSORS
            .iter()
            .map(|(id, name)| (*id, name.to_string()))
            .collect::<SensorMap>();
        track.start_time = Some(chrono::Local::now().naive_local());

        if matches!(motion, Motion::BicepCurl | Motion::Bow) {
            // Arms hang down
            track.sequence.push(angle_record(0.0, 2, Axis::X, 0.0, 90.0));
            track.sequence.push(angle_record(0.0, 6, Axis::X, 0.0, -90.0));
        }

        let steps = ((period / self.time_step) as usize).max(1);
        for rep in 0..motion.repetitions() {
            let offset = rep as f64 * period;
            for i in 0..=steps {
                let frac = i as f64 / steps as f64;
                let time = round_to(offset + frac * period, 3);
                let swing = (frac * PI).sin();
                push_frame(&mut track.sequence, motion, time, swing);
            }
        }

        track.finalize();
        track
    }
}

fn push_frame(sequence: &mut Vec<Record>, motion: Motion, time: f64, swing: f64) {
    match motion {
        Motion::Squat => {
            let knee = -90.0 * swing;
            for (sensor, angle) in [(8, knee), (12, knee), (9, -knee), (13, -knee)] {
                sequence.push(angle_record(time, sensor, Axis::X, angle, 0.0));
            }
        }
        Motion::FoldArms => {
            let shoulder = 90.0 * swing;
            for (sensor, angle) in [(2, shoulder), (6, -shoulder), (3, shoulder), (4, -shoulder)] {
                sequence.push(angle_record(time, sensor, Axis::Y, angle, 0.0));
            }
        }
        Motion::BicepCurl => {
            let elbow = -90.0 * swing;
            for sensor in [3, 4, 15, 16] {
                sequence.push(angle_record(time, sensor, Axis::X, elbow, 0.0));
            }
        }
        Motion::Bow => {
            sequence.push(angle_record(time, 5, Axis::X, 90.0 * swing, 0.0));
        }
    }
}

/// Euler record with fields in capture order: Z first, then the moving
/// axis, then the remaining one
fn angle_record(time: f64, sensor: i64, axis: Axis, angle: f64, z: f64) -> Record {
    let angle = round_to(angle, 2);
    let (first, second) = match axis {
        Axis::X => (("angle_X", angle), ("angle_Y", 0.0)),
        Axis::Y => (("angle_Y", angle), ("angle_X", 0.0)),
    };
    let fields = Fields::new()
        .with("sensor", FieldValue::Int(sensor))
        .with("angle_Z", FieldValue::Float(z))
        .with(first.0, FieldValue::Float(first.1))
        .with(second.0, FieldValue::Float(second.1));
    Record::new(RecordKind::EulerAngles, time, fields)
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}
