//! Filtered data table

use crate::types::{Fields, Record, RecordKind};

/// Default row cap
pub const DEFAULT_MAX_ROWS: usize = 400;

/// Latest record seen for one (kind, sensor) pair
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow {
    pub kind: RecordKind,
    pub sensor: Option<i64>,
    pub time: f64,
    pub fields: Fields,
}

impl DataRow {
    /// Row as display cells: kind, time, then name/value pairs
    pub fn cells(&self) -> Vec<String> {
        let mut cells = vec![self.kind.tag().to_string(), format!("{:.2}", self.time)];
        for (name, value) in self.fields.iter() {
            cells.push(name.to_string());
            cells.push(value.to_string());
        }
        cells
    }
}

/// Option list of kinds and sensors, one active filter, and a row per
/// matching (kind, sensor)
#[derive(Debug, Clone)]
pub struct DataView {
    options: Vec<String>,
    filter: Option<String>,
    rows: Vec<DataRow>,
    max_rows: usize,
}

impl Default for DataView {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROWS)
    }
}

fn sensor_option(sensor: i64) -> String {
    format!("Sensor_{}", sensor)
}

impl DataView {
    pub fn new(max_rows: usize) -> Self {
        Self {
            options: Vec::new(),
            filter: None,
            rows: Vec::new(),
            max_rows,
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn rows(&self) -> &[DataRow] {
        &self.rows
    }

    /// Add the record's kind and sensor to the options. Returns `true` if
    /// the list grew.
    pub fn refresh_options(&mut self, record: &Record) -> bool {
        let mut grew = false;
        let tag = record.kind.tag();
        if !self.options.iter().any(|o| o == tag) {
            self.options.push(tag.to_string());
            grew = true;
        }
        if let Some(sensor) = record.sensor() {
            let option = sensor_option(sensor);
            if !self.options.contains(&option) {
                self.options.push(option);
                grew = true;
            }
        }
        grew
    }

    /// Show only records matching `item` (a kind tag or `Sensor_N`).
    ///
    /// Changing the filter empties the table.
    pub fn set_filter(&mut self, item: &str) -> bool {
        if self.filter.as_deref() == Some(item) {
            tracing::debug!("{} is already the data view filter", item);
            return false;
        }
        self.filter = Some(item.to_string());
        self.rows.clear();
        true
    }

    /// Whether `record` passes the filter
    pub fn matches(&self, record: &Record) -> bool {
        let Some(filter) = self.filter.as_deref() else {
            return false;
        };
        filter == record.kind.tag()
            || record
                .sensor()
                .is_some_and(|sensor| filter == sensor_option(sensor))
    }

    /// Process a batch. Returns `true` if the option list grew.
    pub fn update(&mut self, records: &[Record]) -> bool {
        let mut grew = false;
        for record in records {
            grew |= self.refresh_options(record);
            if self.matches(record) {
                self.upsert(record);
            }
        }
        grew
    }

    fn upsert(&mut self, record: &Record) {
        let sensor = record.sensor();
        let row = DataRow {
            kind: record.kind,
            sensor,
            time: record.time,
            fields: record.fields.clone(),
        };
        match self
            .rows
            .iter()
            .position(|r| r.kind == record.kind && r.sensor == sensor)
        {
            Some(index) => self.rows[index] = row,
            None if self.rows.len() < self.max_rows => self.rows.push(row),
            None => {}
        }
    }

    /// Forget options, filter and rows
    pub fn clear(&mut self) {
        self.options.clear();
        self.filter = None;
        self.rows.clear();
    }
}
