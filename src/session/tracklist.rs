//! Track-list file format
//!
//! A track list is a sequence of tracks, each introduced by header lines:
//!
//! ```text
//! SA_Track,Track_1
//! SA_Player,Marvin,standard,1.6
//! SA_SensorDict,2,RightUpperarm,5,Spine
//! SA_Calibrate,Spine,[1.5 0 -2]
//! SA_Time,2022-05-15 10:33:31.000000
//! SA_EUL_ANG,0.000,sensor,5,angle_X,10.00,angle_Y,0.00,angle_Z,-5.25
//! ```
//!
//! Any line whose first item is a record tag is a data line for the current
//! track. Unknown headers and undecodable lines are skipped and reported.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;
use nalgebra::Vector3;

use crate::error::{Result, ResultExt};
use crate::skeleton::Player;
use crate::stream::line::{decode_items, split_items};
use crate::stream::{SkipReason, Skipped};
use crate::types::RecordKind;

use super::types::Track;

const TRACK_TAG: &str = "SA_Track";
const PLAYER_TAG: &str = "SA_Player";
const SENSOR_DICT_TAG: &str = "SA_SensorDict";
const CALIBRATE_TAG: &str = "SA_Calibrate";
const TIME_TAG: &str = "SA_Time";

/// Format used when writing the start time
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Formats accepted when reading the start time
const TIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%d/%m/%Y %H:%M:%S"];

/// Outcome of reading a track list
#[derive(Debug, Default)]
pub struct TrackListRead {
    /// Tracks in file order, each finalized
    pub tracks: Vec<Track>,
    /// Lines that could not be used
    pub skipped: Vec<Skipped>,
    /// Names of tracks that finalized with a negative length
    pub inconsistent: Vec<String>,
}

/// Write one track. Returns the number of data lines written.
pub fn write_track<W: Write + ?Sized>(writer: &mut W, track: &Track) -> Result<usize> {
    writeln!(writer, "{},{}", TRACK_TAG, track.name)?;

    if let Some(player) = &track.player {
        writeln!(writer, "{}", player.descriptor())?;
    }

    let mut line = String::from(SENSOR_DICT_TAG);
    for (sensor, segment) in &track.sensor_map {
        line.push_str(&format!(",{},{}", sensor, segment));
    }
    writeln!(writer, "{}", line)?;

    let mut line = String::from(CALIBRATE_TAG);
    for (segment, angles) in &track.calibration {
        line.push_str(&format!(
            ",{},[{} {} {}]",
            segment, angles.x, angles.y, angles.z
        ));
    }
    writeln!(writer, "{}", line)?;

    match track.start_time {
        Some(time) => writeln!(writer, "{},{}", TIME_TAG, time.format(TIME_FORMAT))?,
        None => writeln!(writer, "{},", TIME_TAG)?,
    }

    let legacy = RecordKind::LegacyQuatEuler.tag();
    let mut written = 0;
    for record in &track.sequence {
        let line = record.to_line();
        if line.contains(legacy) {
            continue;
        }
        writeln!(writer, "{}", line)?;
        written += 1;
    }
    Ok(written)
}

/// Read every track from `reader`.
///
/// Fails only on I/O errors; bad lines end up in [`TrackListRead::skipped`].
pub fn read_tracklist<R: BufRead>(reader: R) -> Result<TrackListRead> {
    let mut read = TrackListRead::default();
    let mut current: Option<Track> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = index + 1;
        if line.trim().is_empty() {
            continue;
        }
        let items = split_items(&line);
        let skip = |reason: SkipReason| Skipped {
            unit: line_no,
            text: line.trim().to_string(),
            reason,
        };

        if items[0] == TRACK_TAG {
            if let Some(track) = current.take() {
                finish(track, &mut read);
            }
            let name = items.get(1).copied().unwrap_or_default();
            current = Some(Track::new(name));
            continue;
        }

        let Some(track) = current.as_mut() else {
            read.skipped.push(skip(SkipReason::Orphan));
            continue;
        };

        let outcome = match items[0] {
            PLAYER_TAG => read_player(&items).map(|player| track.player = Some(player)),
            SENSOR_DICT_TAG => read_sensor_dict(&items, track),
            CALIBRATE_TAG => read_calibration(&items, track),
            TIME_TAG => {
                track.start_time = read_time(items.get(1).copied().unwrap_or_default());
                Ok(())
            }
            tag if RecordKind::from_tag(tag).is_some() => {
                decode_items(&items).map(|record| track.sequence.push(record))
            }
            tag => {
                tracing::debug!("Skipping unknown header {} on line {}", tag, line_no);
                Err(SkipReason::UnknownCode(tag.to_string()))
            }
        };

        if let Err(reason) = outcome {
            tracing::warn!("Skipping line {}: {}", line_no, reason);
            read.skipped.push(skip(reason));
        }
    }

    if let Some(track) = current.take() {
        finish(track, &mut read);
    }
    Ok(read)
}

fn finish(mut track: Track, read: &mut TrackListRead) {
    if !track.finalize() {
        read.inconsistent.push(track.name.clone());
    }
    read.tracks.push(track);
}

fn read_player(items: &[&str]) -> std::result::Result<Player, SkipReason> {
    let [_, name, model, height, ..] = items else {
        return Err(SkipReason::WrongArity {
            code: PLAYER_TAG.to_string(),
            expected: 4,
            found: items.len(),
        });
    };
    let height = height.parse().map_err(|_| SkipReason::BadValue {
        field: "height".to_string(),
        value: height.to_string(),
    })?;
    Ok(Player::new(*name, model, height))
}

/// Sensor dictionaries may be split over several lines; entries merge.
fn read_sensor_dict(items: &[&str], track: &mut Track) -> std::result::Result<(), SkipReason> {
    for pair in pairs(items) {
        let [sensor, segment] = pair else {
            return Err(SkipReason::DanglingField(pair[0].to_string()));
        };
        let id = sensor.parse().map_err(|_| SkipReason::BadValue {
            field: "sensor".to_string(),
            value: sensor.to_string(),
        })?;
        track.sensor_map.insert(id, segment.to_string());
    }
    Ok(())
}

fn read_calibration(items: &[&str], track: &mut Track) -> std::result::Result<(), SkipReason> {
    for pair in pairs(items) {
        let [segment, raw] = pair else {
            return Err(SkipReason::DanglingField(pair[0].to_string()));
        };
        let angles = parse_bracketed(raw).ok_or_else(|| SkipReason::BadValue {
            field: segment.to_string(),
            value: raw.to_string(),
        })?;
        track.calibration.insert(segment.to_string(), angles);
    }
    Ok(())
}

/// Name/value pairs after the tag, ignoring a trailing empty item
fn pairs<'a>(items: &'a [&'a str]) -> impl Iterator<Item = &'a [&'a str]> {
    let body = match items.split_first() {
        Some((_, rest)) if rest.last() == Some(&"") => &rest[..rest.len() - 1],
        Some((_, rest)) => rest,
        None => &[],
    };
    body.chunks(2)
}

/// Parse `[x y z]`
fn parse_bracketed(raw: &str) -> Option<Vector3<f64>> {
    let inner = raw.trim().strip_prefix('[')?.strip_suffix(']')?;
    let values: Vec<f64> = inner
        .split_whitespace()
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match values.as_slice() {
        [x, y, z] => Some(Vector3::new(*x, *y, *z)),
        _ => None,
    }
}

fn read_time(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let parsed = TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok());
    if parsed.is_none() {
        tracing::debug!("Unrecognised start time {}", raw);
    }
    parsed
}

/// Read a track list from a file
pub fn load_tracklist(path: &Path) -> Result<TrackListRead> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open track list {}", path.display()))?;
    read_tracklist(BufReader::new(file))
        .with_context(|| format!("Failed to read track list {}", path.display()))
}

/// Write tracks to a file, replacing it. Returns the number of data lines.
pub fn save_tracklist(path: &Path, tracks: &[Track]) -> Result<usize> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create track list {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;
    for track in tracks {
        written += write_track(&mut writer, track)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write track list {}", path.display()))?;
    Ok(written)
}
