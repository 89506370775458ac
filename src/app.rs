//! Analyzer session
//!
//! [`AnalyzerSession`] owns everything one garment session needs: the
//! record/playback engine, the player and its body, the sensor assignment,
//! calibration, the accumulated pose and the live views. The caller drives it
//! with [`AnalyzerSession::tick`] at a fixed period and passes in whatever
//! datagram source is connected.

use std::fmt;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use nalgebra::Vector3;

use crate::config::AppConfig;
use crate::error::{Result, ResultExt};
use crate::session::{save_tracklist, Clock, PlayState, RecPlay, SystemClock};
use crate::skeleton::{
    CalibrationMap, CalibrationPhase, Calibrator, Player, PoseAccumulator, SensorMap,
};
use crate::stream::{drain_source, DatagramSource, DecodeStats, Decoded, Skipped};
use crate::types::Record;
use crate::views::{DataView, PlotView};

/// What the session is doing with incoming data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewState {
    /// No garment connected; the pose is held at rest
    #[default]
    Idle,
    /// Live data drives the pose and views
    Streaming,
    /// Live data feeds a calibration run
    Calibrate,
    /// Live data is recorded as well as shown
    Record,
    /// A stored track drives the pose; live data is discarded
    Playback,
}

/// Raw datagram log, one datagram per line
pub struct RawLog {
    writer: Box<dyn Write>,
}

impl RawLog {
    pub fn new(writer: impl Write + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Log to a new file at `path`
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create raw log {}", path.display()))?;
        Ok(Self::new(file))
    }

    fn write(&mut self, datagram: &[u8]) {
        let result = self
            .writer
            .write_all(datagram)
            .and_then(|_| self.writer.write_all(b"\n"));
        if let Err(e) = result {
            tracing::warn!("Failed to write raw log: {}", e);
        }
    }
}

impl fmt::Debug for RawLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawLog").finish_non_exhaustive()
    }
}

/// Result of one tick
#[derive(Debug, Clone, Default)]
pub struct TickOutput {
    /// Records that drove this tick (live or played back)
    pub records: Vec<Record>,
    /// Live units the decoder could not use
    pub skipped: Vec<Skipped>,
    /// World position of every segment, in forest order
    pub positions: Vec<(String, Vector3<f64>)>,
    /// The engine changed state since the previous tick
    pub state_changed: bool,
}

/// One garment session
#[derive(Debug)]
pub struct AnalyzerSession<C: Clock + Clone = SystemClock> {
    clock: C,
    view: ViewState,
    recplay: RecPlay<C>,
    player: Player,
    sensor_map: SensorMap,
    calibration: CalibrationMap,
    pose: PoseAccumulator,
    calibrator: Option<Calibrator>,
    calibration_wait: f64,
    calibration_capture: f64,
    plot: PlotView,
    table: DataView,
    stats: DecodeStats,
    raw_log: Option<RawLog>,
    connected: bool,
}

impl AnalyzerSession<SystemClock> {
    /// Create a session paced by the wall clock
    pub fn new(config: &AppConfig) -> Self {
        Self::with_clock(config, SystemClock::default())
    }
}

impl<C: Clock + Clone> AnalyzerSession<C> {
    /// Create a session paced by `clock`
    pub fn with_clock(config: &AppConfig, clock: C) -> Self {
        let mut recplay = RecPlay::with_clock(clock.clone());
        recplay.set_paused_window(config.playback.window_depth);

        Self {
            clock,
            view: ViewState::Idle,
            recplay,
            player: config.player.build(),
            sensor_map: config.sensor_map(),
            calibration: CalibrationMap::new(),
            pose: PoseAccumulator::with_defaults(),
            calibrator: None,
            calibration_wait: config.calibration.wait_secs,
            calibration_capture: config.calibration.capture_secs,
            plot: PlotView::new(config.views.plot_buffer_secs),
            table: DataView::new(config.views.max_rows),
            stats: DecodeStats::default(),
            raw_log: None,
            connected: false,
        }
    }

    pub fn view_state(&self) -> ViewState {
        self.view
    }

    pub fn recplay(&self) -> &RecPlay<C> {
        &self.recplay
    }

    pub fn recplay_mut(&mut self) -> &mut RecPlay<C> {
        &mut self.recplay
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn sensor_map(&self) -> &SensorMap {
        &self.sensor_map
    }

    pub fn calibration(&self) -> &CalibrationMap {
        &self.calibration
    }

    pub fn plot(&self) -> &PlotView {
        &self.plot
    }

    pub fn plot_mut(&mut self) -> &mut PlotView {
        &mut self.plot
    }

    pub fn table(&self) -> &DataView {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut DataView {
        &mut self.table
    }

    /// Decoder totals since the session started
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Replace the player; the pose starts again from rest
    pub fn set_player(&mut self, player: Player) {
        self.player = player;
        self.pose.reset();
    }

    /// Note whether a garment is connected. An idle session starts streaming
    /// on the next tick once connected.
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
        if !connected && matches!(self.view, ViewState::Streaming | ViewState::Calibrate) {
            self.view = ViewState::Idle;
            self.calibrator = None;
        }
    }

    /// Log every raw datagram from now on
    pub fn set_raw_log(&mut self, log: Option<RawLog>) {
        self.raw_log = log;
    }

    /// Begin a calibration run on the live stream
    pub fn start_calibration(&mut self) {
        tracing::info!(
            "Calibrating in {:.0}s for {:.0}s",
            self.calibration_wait,
            self.calibration_capture
        );
        self.calibrator = Some(Calibrator::new(
            self.clock.now(),
            self.calibration_wait,
            self.calibration_capture,
        ));
        self.view = ViewState::Calibrate;
    }

    /// Request a record/playback transition
    pub fn set_play_state(&mut self, state: PlayState) -> bool {
        self.recplay.set_state(state)
    }

    /// Replace the stored tracks with those in a track-list file
    pub fn load_tracks(&mut self, path: &Path) -> Result<Vec<Skipped>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open track list {}", path.display()))?;
        self.recplay
            .load_tracklist(BufReader::new(file))
            .with_context(|| format!("Failed to read track list {}", path.display()))
    }

    /// Save the stored tracks to a track-list file
    pub fn save_tracks(&self, path: &Path) -> Result<usize> {
        save_tracklist(path, self.recplay.tracks())
    }

    /// Run one tick.
    ///
    /// Every pending datagram is drained from `source`, so no burst is left
    /// behind for the next tick.
    pub fn tick(&mut self, source: Option<&mut dyn DatagramSource>) -> TickOutput {
        let mut out = TickOutput::default();

        if self.recplay.state_changed() {
            self.on_state_change();
            self.recplay.clear_state_changed();
            out.state_changed = true;
        }

        let live = match source {
            Some(source) => {
                let raw_log = &mut self.raw_log;
                drain_source(source, &mut self.stats, |raw| {
                    if let Some(log) = raw_log.as_mut() {
                        log.write(raw);
                    }
                })
            }
            None => Decoded::default(),
        };
        out.skipped = live.skipped;

        match self.view {
            ViewState::Idle => {
                self.pose.reset();
                if self.connected {
                    tracing::info!("Garment connected, streaming");
                    self.view = ViewState::Streaming;
                }
            }
            ViewState::Streaming => {
                self.observe(&live.records);
                out.records = live.records;
            }
            ViewState::Calibrate => self.calibrate(&live.records),
            ViewState::Record => {
                self.recplay.record(&live.records);
                self.observe(&live.records);
                out.records = live.records;
            }
            ViewState::Playback => {
                if !live.records.is_empty() {
                    tracing::trace!(
                        "Discarding {} live records during playback",
                        live.records.len()
                    );
                }
                let played = self.recplay.play();
                let sensors = self
                    .recplay
                    .current_track()
                    .map(|t| &t.sensor_map)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(&self.sensor_map);
                observe(&mut self.pose, &mut self.plot, &mut self.table, &played, sensors);
                out.records = played;
            }
        }

        self.player.body.apply_pose_update(&self.pose.updates());
        out.positions = self
            .player
            .body
            .world_positions_ordered()
            .into_iter()
            .map(|(name, position)| (name.to_string(), position))
            .collect();
        out
    }

    fn on_state_change(&mut self) {
        self.plot.clear_data();
        match self.recplay.state() {
            PlayState::Record => {
                self.view = ViewState::Record;
                if let Some(track) = self.recplay.recording_mut() {
                    track.calibration = self.calibration.clone();
                    track.player = Some(self.player.snapshot());
                    track.sensor_map = self.sensor_map.clone();
                }
            }
            PlayState::Play | PlayState::Pause => {
                self.view = ViewState::Playback;
                if let Some(track) = self.recplay.current_track() {
                    self.calibration = track.calibration.clone();
                }
            }
            PlayState::Stop => self.view = ViewState::Idle,
        }
    }

    fn observe(&mut self, records: &[Record]) {
        observe(
            &mut self.pose,
            &mut self.plot,
            &mut self.table,
            records,
            &self.sensor_map,
        );
    }

    fn calibrate(&mut self, records: &[Record]) {
        let Some(calibrator) = self.calibrator.as_mut() else {
            self.view = ViewState::Streaming;
            return;
        };
        if let CalibrationPhase::Complete(map) =
            calibrator.feed(records, &self.sensor_map, self.clock.now())
        {
            self.calibration.extend(map);
            self.player.body.apply_calibration(&self.calibration);
            self.calibrator = None;
            self.view = ViewState::Streaming;
        }
    }
}

fn observe(
    pose: &mut PoseAccumulator,
    plot: &mut PlotView,
    table: &mut DataView,
    records: &[Record],
    sensors: &SensorMap,
) {
    if records.is_empty() {
        return;
    }
    table.update(records);
    plot.absorb(records, sensors);
    pose.absorb(records, sensors);
}
