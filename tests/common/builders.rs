//! Test data builders for creating test objects

use sa_analyzer::config::DEFAULT_SENSORS;
use sa_analyzer::skeleton::{Player, SensorMap};
use sa_analyzer::{Record, Track};

/// Builder for creating test Tracks
pub struct TrackBuilder {
    name: String,
    records: Vec<Record>,
    sensor_map: SensorMap,
    player: Option<Player>,
}

impl TrackBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            records: Vec::new(),
            sensor_map: SensorMap::new(),
            player: None,
        }
    }

    /// Use the garment's default sensor assignment
    pub fn default_sensors(mut self) -> Self {
        self.sensor_map = DEFAULT_SENSORS
            .iter()
            .map(|(id, name)| (*id, name.to_string()))
            .collect();
        self
    }

    pub fn sensor(mut self, id: i64, segment: &str) -> Self {
        self.sensor_map.insert(id, segment.to_string());
        self
    }

    pub fn player(mut self, name: &str, height: f64) -> Self {
        self.player = Some(Player::new(name, "standard", height));
        self
    }

    /// Add an Euler-angle record
    pub fn euler(mut self, time: f64, sensor: i64, angles: [f64; 3]) -> Self {
        self.records
            .push(Record::euler(time, sensor, angles[0], angles[1], angles[2]));
        self
    }

    /// Add one zero-angle record per time
    pub fn ticks(mut self, sensor: i64, times: &[f64]) -> Self {
        for &time in times {
            self.records.push(Record::euler(time, sensor, 0.0, 0.0, 0.0));
        }
        self
    }

    pub fn build(self) -> Track {
        let mut track = Track::new(self.name);
        track.sequence = self.records;
        track.sensor_map = self.sensor_map;
        track.player = self.player;
        track.finalize();
        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_builder() {
        let track = TrackBuilder::new("test")
            .sensor(5, "Spine")
            .ticks(5, &[1.0, 1.5, 3.0])
            .build();

        assert_eq!(track.name, "test");
        assert_eq!(track.len(), 3);
        assert_eq!(track.length, 2.0);
        assert_eq!(track.sensor_map.get(&5).map(String::as_str), Some("Spine"));
    }
}
