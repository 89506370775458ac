//! Track-file data line decoder
//!
//! A data line is `KIND,time,name1,value1,name2,value2,...`. Items are
//! trimmed, so captures with stray spaces (`angle_Z,90.0 ,angle_X`) decode.
//! Values are typed by field name, see [`FieldValue::parse`].

use crate::types::{FieldValue, Fields, Record, RecordKind};

use super::SkipReason;

/// Split a line into trimmed comma-separated items
pub fn split_items(line: &str) -> Vec<&str> {
    line.split(',').map(str::trim).collect()
}

/// Decode one data line into a [`Record`]
pub fn decode_line(line: &str) -> Result<Record, SkipReason> {
    decode_items(&split_items(line))
}

/// Decode a line that has already been split into items
pub fn decode_items(items: &[&str]) -> Result<Record, SkipReason> {
    let tag = items.first().copied().unwrap_or_default();
    let kind = RecordKind::from_tag(tag)
        .ok_or_else(|| SkipReason::UnknownCode(tag.to_string()))?;

    let raw_time = items.get(1).copied().unwrap_or_default();
    let time: f64 = raw_time.parse().map_err(|_| SkipReason::BadValue {
        field: "time".to_string(),
        value: raw_time.to_string(),
    })?;

    let mut fields = Fields::new();
    for pair in items[2..].chunks(2) {
        let name = pair[0];
        let Some(raw) = pair.get(1) else {
            return Err(SkipReason::DanglingField(name.to_string()));
        };
        let value = FieldValue::parse(name, raw).ok_or_else(|| SkipReason::BadValue {
            field: name.to_string(),
            value: raw.to_string(),
        })?;
        fields.insert(name, value);
    }

    Ok(Record::new(kind, time, fields))
}
