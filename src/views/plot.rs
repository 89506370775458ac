//! Time-windowed series for live plots

use std::collections::VecDeque;

use crate::skeleton::SensorMap;
use crate::types::{Record, RecordKind};

/// Default seconds of history kept per series
pub const DEFAULT_BUFFER_SECS: f64 = 5.0;

const AXES: [&str; 3] = ["X", "Y", "Z"];

/// Field prefix plotted for a record kind
fn quantity(kind: RecordKind) -> Option<&'static str> {
    match kind {
        RecordKind::EulerAngles => Some("angle"),
        RecordKind::LinearAcceleration => Some("acc"),
        _ => None,
    }
}

/// One selected series, named `<segment>_<field>` (e.g. `Spine_angle_X`)
#[derive(Debug, Clone)]
pub struct PlotSeries {
    name: String,
    segment: String,
    field: String,
    samples: VecDeque<(f64, f64)>,
}

impl PlotSeries {
    /// Create a series from its option name. Returns `None` for names
    /// without a `<segment>_<field>` shape.
    pub fn new(name: &str) -> Option<Self> {
        let (segment, field) = name.split_once('_')?;
        if segment.is_empty() || field.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            segment: segment.to_string(),
            field: field.to_string(),
            samples: VecDeque::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples with times relative to the newest one (so all `<= 0`),
    /// restricted to the buffer window
    pub fn window(&self, buffer: f64) -> Vec<(f64, f64)> {
        let Some(&(newest, _)) = self.samples.back() else {
            return Vec::new();
        };
        self.samples
            .iter()
            .map(|(t, v)| (t - newest, *v))
            .filter(|(t, _)| *t > -buffer)
            .collect()
    }

    fn push(&mut self, time: f64, value: f64, buffer: f64) {
        self.samples.push_back((time, value));
        while let Some(&(oldest, _)) = self.samples.front() {
            if time - oldest > buffer {
                self.samples.pop_front();
            } else {
                break;
            }
        }
    }

    fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Option list and selected series for the real-time graph
#[derive(Debug, Clone)]
pub struct PlotView {
    options: Vec<String>,
    series: Vec<PlotSeries>,
    buffer: f64,
}

impl Default for PlotView {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SECS)
    }
}

impl PlotView {
    pub fn new(buffer: f64) -> Self {
        Self {
            options: Vec::new(),
            series: Vec::new(),
            buffer,
        }
    }

    /// Series names that can be selected
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Currently selected series
    pub fn series(&self) -> &[PlotSeries] {
        &self.series
    }

    pub fn buffer(&self) -> f64 {
        self.buffer
    }

    /// Add the three axis options for the record's segment and quantity.
    ///
    /// Returns `true` if the option list grew.
    pub fn refresh_options(&mut self, record: &Record, sensors: &SensorMap) -> bool {
        let Some(quantity) = quantity(record.kind) else {
            return false;
        };
        let Some(segment) = record.sensor().and_then(|s| sensors.get(&s)) else {
            return false;
        };
        let first = format!("{}_{}_{}", segment, quantity, AXES[0]);
        if self.options.contains(&first) {
            return false;
        }
        self.options.extend(
            AXES.iter()
                .map(|axis| format!("{}_{}_{}", segment, quantity, axis)),
        );
        true
    }

    /// Make `selected` the set of plotted series, keeping the history of
    /// series that stay selected
    pub fn select(&mut self, selected: &[&str]) {
        self.series.retain(|s| selected.contains(&s.name.as_str()));
        for name in selected {
            if self.series.iter().any(|s| s.name == *name) {
                continue;
            }
            match PlotSeries::new(name) {
                Some(series) => self.series.push(series),
                None => tracing::debug!("Ignoring malformed plot name {}", name),
            }
        }
    }

    /// Feed a record into the selected series it belongs to
    pub fn update(&mut self, record: &Record, sensors: &SensorMap) {
        let Some(quantity) = quantity(record.kind) else {
            return;
        };
        let Some(segment) = record.sensor().and_then(|s| sensors.get(&s)) else {
            return;
        };
        for series in &mut self.series {
            if series.segment != *segment || !series.field.starts_with(quantity) {
                continue;
            }
            if let Some(value) = record.fields.get_f64(&series.field) {
                series.push(record.time, value, self.buffer);
            }
        }
    }

    /// Process a batch. Returns `true` if the option list grew.
    pub fn absorb(&mut self, records: &[Record], sensors: &SensorMap) -> bool {
        let mut grew = false;
        for record in records {
            grew |= self.refresh_options(record, sensors);
            self.update(record, sensors);
        }
        grew
    }

    /// Empty every selected series
    pub fn clear_data(&mut self) {
        self.series.iter_mut().for_each(PlotSeries::clear);
    }

    /// Forget options and selection
    pub fn clear(&mut self) {
        self.options.clear();
        self.series.clear();
    }
}
