//! Garment datagram decoder
//!
//! A datagram holds one or more sub-records, each terminated by `;`:
//!
//! ```text
//! SE,5,1200,10.00,0.00,-5.25;AC,5,1200,0.01,0.02,9.81;
//! ```
//!
//! | Code | Kind         | Items | Payload                 |
//! |------|--------------|-------|-------------------------|
//! | `SQ` | `SA_BNO_QUA` | 7     | qw, qx, qy, qz          |
//! | `SE` | `SA_EUL_ANG` | 6     | angle_X, angle_Y, angle_Z |
//! | `SO` | `SA_BNO_EUL` | 6     | angle_x, angle_y, angle_z |
//! | `CL` | `SA_BNO_CAL` | 4     | cal (integer)           |
//! | `AC` | `SA_ACC_LIN` | 6     | acc_X, acc_Y, acc_Z     |
//!
//! Item 1 is the sensor id and item 2 the sensor time in milliseconds.

use crate::types::{FieldValue, Fields, Record, RecordKind};

use super::{Decoded, SkipReason, Skipped};

struct WireFormat {
    code: &'static str,
    kind: RecordKind,
    payload: &'static [&'static str],
    integer_payload: bool,
}

const FORMATS: &[WireFormat] = &[
    WireFormat {
        code: "SQ",
        kind: RecordKind::Quaternion,
        payload: &["qw", "qx", "qy", "qz"],
        integer_payload: false,
    },
    WireFormat {
        code: "SE",
        kind: RecordKind::EulerAngles,
        payload: &["angle_X", "angle_Y", "angle_Z"],
        integer_payload: false,
    },
    WireFormat {
        code: "SO",
        kind: RecordKind::SensorEuler,
        payload: &["angle_x", "angle_y", "angle_z"],
        integer_payload: false,
    },
    WireFormat {
        code: "CL",
        kind: RecordKind::CalibrationStatus,
        payload: &["cal"],
        integer_payload: true,
    },
    WireFormat {
        code: "AC",
        kind: RecordKind::LinearAcceleration,
        payload: &["acc_X", "acc_Y", "acc_Z"],
        integer_payload: false,
    },
];

impl WireFormat {
    fn arity(&self) -> usize {
        3 + self.payload.len()
    }
}

/// Decode a datagram given as raw bytes (invalid UTF-8 is replaced)
pub fn decode_datagram_bytes(datagram: &[u8]) -> Decoded {
    decode_datagram(&String::from_utf8_lossy(datagram))
}

/// Decode every `;`-terminated sub-record in `datagram`.
///
/// Bad sub-records are skipped and reported; the remaining sub-records are
/// still decoded.
pub fn decode_datagram(datagram: &str) -> Decoded {
    let mut decoded = Decoded::default();
    let mut parts: Vec<&str> = datagram.split(';').collect();
    // Text after the final `;` is not a complete sub-record
    let tail = parts.pop().unwrap_or_default();

    for (unit, part) in parts.iter().enumerate() {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match decode_sub_record(part) {
            Ok(record) => decoded.records.push(record),
            Err(reason) => {
                tracing::debug!("Skipping sub-record {}: {}", part, reason);
                decoded.skipped.push(Skipped {
                    unit,
                    text: part.to_string(),
                    reason,
                });
            }
        }
    }

    if !tail.trim().is_empty() {
        decoded.skipped.push(Skipped {
            unit: parts.len(),
            text: tail.trim().to_string(),
            reason: SkipReason::Unterminated,
        });
    }

    decoded
}

fn decode_sub_record(part: &str) -> Result<Record, SkipReason> {
    let items: Vec<&str> = part.split(',').map(str::trim).collect();
    let code = items[0];
    let format = FORMATS
        .iter()
        .find(|f| f.code == code)
        .ok_or_else(|| SkipReason::UnknownCode(part.to_string()))?;

    if items.len() != format.arity() {
        return Err(SkipReason::WrongArity {
            code: code.to_string(),
            expected: format.arity(),
            found: items.len(),
        });
    }

    let sensor: i64 = parse(items[1], "sensor")?;
    let millis: f64 = parse(items[2], "time")?;

    let mut fields = Fields::new().with("sensor", FieldValue::Int(sensor));
    for (name, raw) in format.payload.iter().zip(&items[3..]) {
        let value = if format.integer_payload {
            FieldValue::Int(parse(raw, name)?)
        } else {
            FieldValue::Float(parse(raw, name)?)
        };
        fields.insert(*name, value);
    }

    Ok(Record::new(format.kind, millis / 1000.0, fields))
}

fn parse<T: std::str::FromStr>(raw: &str, field: &str) -> Result<T, SkipReason> {
    raw.parse().map_err(|_| SkipReason::BadValue {
        field: field.to_string(),
        value: raw.to_string(),
    })
}
