//! Core data types for SA-Analyzer
//!
//! This module contains the fundamental record types produced by the
//! decoders and consumed by the skeleton, the record/playback engine and
//! the views.
//!
//! # Main Types
//!
//! - [`RecordKind`] - Closed set of message kinds the garment emits
//! - [`FieldValue`] - A typed field value (float, int or text)
//! - [`Fields`] - Insertion-ordered field name to value mapping
//! - [`Record`] - One decoded, timestamped sensor message
//!
//! # Field Typing
//!
//! Values read back from track files are typed by field name:
//! `angle_*`, `acc_*` and the quaternion components `qw..qz` are floats,
//! `sensor` and `cal` are integers, and everything else is kept as text.
//! This matches the types the wire decoder produces, so decoded records
//! survive a write and read of a track file unchanged.

use std::fmt;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Number of decimals used when writing record times
pub const TIME_DECIMALS: usize = 3;

/// Number of decimals used when writing float field values.
///
/// Quaternion components are written at full precision instead.
pub const VALUE_DECIMALS: usize = 2;

/// Kind of message carried by a [`Record`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Absolute Euler angles (angle_X, angle_Y, angle_Z) in degrees
    EulerAngles,
    /// Raw quaternion from the sensor (qw, qx, qy, qz)
    Quaternion,
    /// Sensor-frame Euler angles (angle_x, angle_y, angle_z)
    SensorEuler,
    /// Sensor calibration status (cal)
    CalibrationStatus,
    /// Linear acceleration (acc_X, acc_Y, acc_Z)
    LinearAcceleration,
    /// Legacy quaternion-derived Euler angles, never written back to files
    LegacyQuatEuler,
}

impl RecordKind {
    /// Get all record kinds
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::EulerAngles,
            RecordKind::Quaternion,
            RecordKind::SensorEuler,
            RecordKind::CalibrationStatus,
            RecordKind::LinearAcceleration,
            RecordKind::LegacyQuatEuler,
        ]
    }

    /// Tag used for this kind in track files
    pub fn tag(&self) -> &'static str {
        match self {
            RecordKind::EulerAngles => "SA_EUL_ANG",
            RecordKind::Quaternion => "SA_BNO_QUA",
            RecordKind::SensorEuler => "SA_BNO_EUL",
            RecordKind::CalibrationStatus => "SA_BNO_CAL",
            RecordKind::LinearAcceleration => "SA_ACC_LIN",
            RecordKind::LegacyQuatEuler => "SA_BNO_QEU",
        }
    }

    /// Look up a kind from its file tag
    pub fn from_tag(tag: &str) -> Option<RecordKind> {
        Self::all().iter().copied().find(|kind| kind.tag() == tag)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    /// Parse a raw token using the field-name typing table.
    ///
    /// Returns `None` when a numeric field does not hold a number.
    pub fn parse(name: &str, raw: &str) -> Option<FieldValue> {
        let raw = raw.trim();
        if is_float_field(name) {
            raw.parse().ok().map(FieldValue::Float)
        } else if is_int_field(name) {
            raw.parse().ok().map(FieldValue::Int)
        } else {
            Some(FieldValue::Text(raw.to_string()))
        }
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Float(v) => Some(*v),
            FieldValue::Int(v) => Some(*v as f64),
            FieldValue::Text(_) => None,
        }
    }

    /// Integer view of the value, if it is an integer
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Float(v) => write!(f, "{:.*}", VALUE_DECIMALS, v),
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

fn is_float_field(name: &str) -> bool {
    name.starts_with("angle_") || name.starts_with("acc_") || is_quaternion_field(name)
}

fn is_int_field(name: &str) -> bool {
    matches!(name, "sensor" | "cal")
}

fn is_quaternion_field(name: &str) -> bool {
    matches!(name, "qw" | "qx" | "qy" | "qz")
}

/// Insertion-ordered mapping of field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fields(Vec<(String, FieldValue)>);

impl Fields {
    /// Create an empty field set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field, keeping the original position on replace
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((name, value)),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.insert(name, value);
        self
    }

    /// Get a field by name
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Get a numeric field as f64
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(FieldValue::as_f64)
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One decoded, timestamped sensor message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Message kind
    pub kind: RecordKind,
    /// Time in seconds
    pub time: f64,
    /// Typed payload
    pub fields: Fields,
}

impl Record {
    /// Create a new record
    pub fn new(kind: RecordKind, time: f64, fields: Fields) -> Self {
        Self { kind, time, fields }
    }

    /// Create an Euler-angle record for a sensor
    pub fn euler(time: f64, sensor: i64, x: f64, y: f64, z: f64) -> Self {
        let fields = Fields::new()
            .with("sensor", FieldValue::Int(sensor))
            .with("angle_X", FieldValue::Float(x))
            .with("angle_Y", FieldValue::Float(y))
            .with("angle_Z", FieldValue::Float(z));
        Self::new(RecordKind::EulerAngles, time, fields)
    }

    /// Sensor id, if the record carries one
    pub fn sensor(&self) -> Option<i64> {
        self.fields.get("sensor").and_then(FieldValue::as_i64)
    }

    /// Absolute angles (angle_X, angle_Y, angle_Z) in degrees
    pub fn angles(&self) -> Option<Vector3<f64>> {
        Some(Vector3::new(
            self.fields.get_f64("angle_X")?,
            self.fields.get_f64("angle_Y")?,
            self.fields.get_f64("angle_Z")?,
        ))
    }

    /// Convert a legacy quaternion-Euler record into an Euler-angle record
    pub fn to_euler_angles(&self) -> Option<Record> {
        if self.kind != RecordKind::LegacyQuatEuler {
            return None;
        }
        let sensor = self.sensor()?;
        Some(Record::euler(
            self.time,
            sensor,
            self.fields.get_f64("angle_x")?,
            self.fields.get_f64("angle_y")?,
            self.fields.get_f64("angle_z")?,
        ))
    }

    /// Serialize as a track-file data line (without the newline)
    pub fn to_line(&self) -> String {
        let mut line = format!("{},{:.*}", self.kind.tag(), TIME_DECIMALS, self.time);
        for (name, value) in self.fields.iter() {
            line.push(',');
            line.push_str(name);
            line.push(',');
            match value {
                // Shortest representation that parses back to the same f64
                FieldValue::Float(v) if is_quaternion_field(name) => line.push_str(&v.to_string()),
                _ => line.push_str(&value.to_string()),
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags_round_trip() {
        for kind in RecordKind::all() {
            assert_eq!(RecordKind::from_tag(kind.tag()), Some(*kind));
        }
        assert_eq!(RecordKind::from_tag("SA_UNKNOWN"), None);
    }

    #[test]
    fn test_field_typing() {
        assert_eq!(
            FieldValue::parse("angle_X", " 10.5"),
            Some(FieldValue::Float(10.5))
        );
        assert_eq!(
            FieldValue::parse("acc_Z", "-1"),
            Some(FieldValue::Float(-1.0))
        );
        assert_eq!(FieldValue::parse("sensor", "5"), Some(FieldValue::Int(5)));
        assert_eq!(
            FieldValue::parse("label", "bowl"),
            Some(FieldValue::Text("bowl".to_string()))
        );
        assert_eq!(FieldValue::parse("sensor", "five"), None);
    }

    #[test]
    fn test_wire_payload_typing() {
        assert_eq!(
            FieldValue::parse("qw", "0.7071"),
            Some(FieldValue::Float(0.7071))
        );
        assert_eq!(FieldValue::parse("qz", "-1"), Some(FieldValue::Float(-1.0)));
        assert_eq!(FieldValue::parse("cal", "3"), Some(FieldValue::Int(3)));
        assert_eq!(FieldValue::parse("cal", "3.5"), None);
    }

    #[test]
    fn test_quaternion_line_keeps_precision() {
        let fields = Fields::new()
            .with("sensor", FieldValue::Int(1))
            .with("qw", FieldValue::Float(0.70710678))
            .with("qx", FieldValue::Float(0.0))
            .with("qy", FieldValue::Float(-0.125))
            .with("qz", FieldValue::Float(0.70710678));
        let record = Record::new(RecordKind::Quaternion, 1.0, fields);
        assert_eq!(
            record.to_line(),
            "SA_BNO_QUA,1.000,sensor,1,qw,0.70710678,qx,0,qy,-0.125,qz,0.70710678"
        );
    }

    #[test]
    fn test_fields_preserve_order_on_replace() {
        let mut fields = Fields::new()
            .with("sensor", FieldValue::Int(1))
            .with("angle_X", FieldValue::Float(0.0));
        fields.insert("sensor", FieldValue::Int(2));

        let names: Vec<_> = fields.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["sensor", "angle_X"]);
        assert_eq!(fields.get("sensor"), Some(&FieldValue::Int(2)));
    }

    #[test]
    fn test_record_line_formatting() {
        let record = Record::euler(1.2, 5, 10.0, 0.0, -5.25);
        assert_eq!(
            record.to_line(),
            "SA_EUL_ANG,1.200,sensor,5,angle_X,10.00,angle_Y,0.00,angle_Z,-5.25"
        );
    }

    #[test]
    fn test_legacy_conversion() {
        let fields = Fields::new()
            .with("sensor", FieldValue::Int(3))
            .with("angle_x", FieldValue::Float(1.0))
            .with("angle_y", FieldValue::Float(2.0))
            .with("angle_z", FieldValue::Float(3.0));
        let legacy = Record::new(RecordKind::LegacyQuatEuler, 0.5, fields);

        let converted = legacy.to_euler_angles().unwrap();
        assert_eq!(converted.kind, RecordKind::EulerAngles);
        assert_eq!(converted.angles(), Some(Vector3::new(1.0, 2.0, 3.0)));
        assert!(Record::euler(0.0, 1, 0.0, 0.0, 0.0)
            .to_euler_angles()
            .is_none());
    }
}
