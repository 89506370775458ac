//! Sensor frame decoding
//!
//! Two encodings coexist:
//!
//! - **Wire** ([`wire`]): a datagram packs several `;`-terminated sub-records
//!   of the form `code,sensor,ms_time,values...`.
//! - **Track file** ([`line`]): one record per line,
//!   `KIND,time,field1,value1,field2,value2,...`.
//!
//! Neither decoder fails as a whole. Malformed units are skipped, described
//! in the returned [`Skipped`] list and decoding continues with the rest.
//!
//! Datagrams come from an external, non-blocking [`DatagramSource`]; the
//! session drains every pending datagram on each tick.

pub mod line;
pub mod wire;

pub use line::decode_line;
pub use wire::{decode_datagram, decode_datagram_bytes};

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;

use crate::types::Record;

/// Why a sub-record or line was skipped
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// Wrong number of comma-separated items for the message code
    #[error("wrong number of parameters for {code}, expecting {expected} got {found}")]
    WrongArity {
        code: String,
        expected: usize,
        found: usize,
    },

    /// Message code or kind tag not in the known set
    #[error("unknown item: {0}")]
    UnknownCode(String),

    /// A numeric token could not be parsed
    #[error("invalid value `{value}` for {field}")]
    BadValue { field: String, value: String },

    /// A field name with no value after it
    #[error("field `{0}` has no value")]
    DanglingField(String),

    /// Trailing data with no terminating `;`
    #[error("unterminated sub-record")]
    Unterminated,

    /// A track-file line that appears before any track header
    #[error("line outside of a track")]
    Orphan,
}

/// A unit the decoder could not turn into a [`Record`]
#[derive(Debug, Clone, PartialEq)]
pub struct Skipped {
    /// Position of the unit in its batch (sub-record index or line number)
    pub unit: usize,
    /// Raw text of the unit
    pub text: String,
    /// Why it was skipped
    pub reason: SkipReason,
}

impl fmt::Display for Skipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} `{}`: {}", self.unit, self.text, self.reason)
    }
}

/// Result of decoding a batch: everything that decoded plus what did not
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoded {
    pub records: Vec<Record>,
    pub skipped: Vec<Skipped>,
}

impl Decoded {
    /// Fold another batch into this one
    pub fn extend(&mut self, other: Decoded) {
        self.records.extend(other.records);
        self.skipped.extend(other.skipped);
    }
}

/// Running totals of decoder activity, for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeStats {
    /// Datagrams received
    pub datagrams: u64,
    /// Records successfully decoded
    pub records: u64,
    /// Units skipped
    pub skipped: u64,
}

impl DecodeStats {
    /// Account for one decoded batch
    pub fn absorb(&mut self, decoded: &Decoded) {
        self.records += decoded.records.len() as u64;
        self.skipped += decoded.skipped.len() as u64;
    }
}

/// Non-blocking producer of raw datagrams
///
/// Implementations must return `Ok(None)` immediately when nothing is
/// pending so a tick is never stalled.
pub trait DatagramSource {
    /// Take the next pending datagram, if any
    fn poll_datagram(&mut self) -> std::io::Result<Option<Vec<u8>>>;
}

/// In-memory datagram queue, used for captured streams and tests
#[derive(Debug, Default, Clone)]
pub struct QueueSource {
    pending: VecDeque<Vec<u8>>,
}

impl QueueSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a datagram
    pub fn push(&mut self, datagram: impl Into<Vec<u8>>) {
        self.pending.push_back(datagram.into());
    }

    /// Number of queued datagrams
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl DatagramSource for QueueSource {
    fn poll_datagram(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        Ok(self.pending.pop_front())
    }
}

/// Drain every pending datagram from `source` and decode them in order.
///
/// The raw datagrams are handed to `on_raw` before decoding so callers can
/// log them. A source error ends the drain for this call; whatever was
/// decoded before it is still returned.
pub fn drain_source(
    source: &mut dyn DatagramSource,
    stats: &mut DecodeStats,
    mut on_raw: impl FnMut(&[u8]),
) -> Decoded {
    let mut batch = Decoded::default();
    loop {
        match source.poll_datagram() {
            Ok(Some(datagram)) => {
                stats.datagrams += 1;
                on_raw(&datagram);
                let decoded = decode_datagram_bytes(&datagram);
                stats.absorb(&decoded);
                batch.extend(decoded);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Datagram source error: {}", e);
                break;
            }
        }
    }
    batch
}
