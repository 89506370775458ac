//! SA-Analyzer - Command Line Entry Point
//!
//! Inspect, decode, replay and generate garment tracks without the live
//! garment attached.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sa_analyzer::{
    config::AppConfig,
    motion::{Motion, MotionGenerator, DEFAULT_TIME_STEP},
    session::{load_tracklist, save_tracklist, ManualClock, PlayState},
    stream::{decode_datagram, DecodeStats},
    AnalyzerSession,
};

#[derive(Parser, Debug)]
#[command(name = "sa-analyzer", version, about = "Sensor garment motion analyzer")]
struct Cli {
    /// Config file (defaults to the app data directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to daily files in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Summarise the tracks in a track-list file
    Inspect { file: PathBuf },

    /// Decode a capture (one datagram per line) into JSON records
    Decode { capture: PathBuf },

    /// Replay a track, printing segment positions as JSON lines
    Replay {
        file: PathBuf,

        /// Track index within the file
        #[arg(long, default_value_t = 0)]
        track: usize,

        /// Only print this segment
        #[arg(long)]
        segment: Option<String>,

        /// Do not wait between ticks
        #[arg(long)]
        fast: bool,
    },

    /// Write synthetic motion tracks to a track-list file
    Generate {
        file: PathBuf,

        /// Motions to generate (all when omitted)
        #[arg(long = "motion")]
        motions: Vec<Motion>,

        /// Seconds per repetition
        #[arg(long, default_value_t = 2.0)]
        period: f64,

        /// Seconds between samples
        #[arg(long, default_value_t = DEFAULT_TIME_STEP)]
        step: f64,
    },
}

fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "sa-analyzer.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sa_analyzer=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.log_dir.as_deref());

    let config = AppConfig::load_or_default(cli.config.as_deref());

    match cli.command {
        Command::Inspect { file } => inspect(&file),
        Command::Decode { capture } => decode(&capture),
        Command::Replay {
            file,
            track,
            segment,
            fast,
        } => replay(&config, &file, track, segment.as_deref(), fast),
        Command::Generate {
            file,
            motions,
            period,
            step,
        } => generate(&config, &file, &motions, period, step),
    }
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let read = load_tracklist(file)?;
    for skipped in &read.skipped {
        tracing::warn!("Skipped line {}", skipped);
    }
    for name in &read.inconsistent {
        tracing::warn!("Track {} has records out of time order", name);
    }

    println!("{}: {} tracks", file.display(), read.tracks.len());
    for (index, track) in read.tracks.iter().enumerate() {
        println!("[{}] {}", index, track.name);
        println!("    records:  {}", track.len());
        match track.details() {
            Some(details) => println!(
                "    time:     {:.3}s to {:.3}s ({:.3}s)",
                details.begin, details.end, details.duration
            ),
            None => println!("    time:     empty"),
        }
        if let Some(start) = track.start_time {
            println!("    started:  {}", start);
        }
        if let Some(player) = &track.player {
            println!("    player:   {}", player.descriptor());
        }
        println!("    sensors:  {}", track.sensor_map.len());
        if !track.calibration.is_empty() {
            let segments: Vec<&str> = track.calibration.keys().map(String::as_str).collect();
            println!("    calibrated: {}", segments.join(", "));
        }
    }
    Ok(())
}

fn decode(capture: &Path) -> anyhow::Result<()> {
    let file = File::open(capture)
        .with_context(|| format!("Failed to open capture {}", capture.display()))?;

    let mut stats = DecodeStats::default();
    for line in BufReader::new(file).lines() {
        let line = line.context("Failed to read capture")?;
        if line.trim().is_empty() {
            continue;
        }
        stats.datagrams += 1;
        let decoded = decode_datagram(&line);
        stats.absorb(&decoded);
        for skipped in &decoded.skipped {
            tracing::warn!("Datagram {}: skipped {}", stats.datagrams, skipped);
        }
        for record in &decoded.records {
            println!("{}", serde_json::to_string(record)?);
        }
    }

    tracing::info!(
        "Decoded {} records from {} datagrams, {} skipped",
        stats.records,
        stats.datagrams,
        stats.skipped
    );
    Ok(())
}

#[derive(Serialize)]
struct Frame<'a> {
    time: f64,
    records: usize,
    positions: Vec<SegmentPosition<'a>>,
}

#[derive(Serialize)]
struct SegmentPosition<'a> {
    segment: &'a str,
    position: [f64; 3],
}

fn replay(
    config: &AppConfig,
    file: &Path,
    index: usize,
    segment: Option<&str>,
    fast: bool,
) -> anyhow::Result<()> {
    let clock = ManualClock::new(0.0);
    let mut session = AnalyzerSession::with_clock(config, clock.clone());
    session.load_tracks(file)?;

    session
        .recplay_mut()
        .select_track(index)
        .with_context(|| format!("Cannot replay {}", file.display()))?;
    let track = &session.recplay().tracks()[index];
    let track_len = track.len();
    if let Some(player) = track.player.clone() {
        session.set_player(player);
    }
    if let Some(segment) = segment {
        session.player().body.require_segment(segment)?;
    }
    session.set_play_state(PlayState::Play);

    let tick = Duration::from_millis(config.playback.tick_ms.max(1));
    loop {
        let out = session.tick(None);
        if !out.records.is_empty() {
            let frame = Frame {
                time: session.recplay().elapsed(),
                records: out.records.len(),
                positions: out
                    .positions
                    .iter()
                    .filter(|(name, _)| segment.map_or(true, |s| name.as_str() == s))
                    .map(|(name, p)| SegmentPosition {
                        segment: name,
                        position: [p.x, p.y, p.z],
                    })
                    .collect(),
            };
            println!("{}", serde_json::to_string(&frame)?);
        }

        let recplay = session.recplay();
        if recplay.state() == PlayState::Pause && recplay.cursor() >= track_len {
            break;
        }
        clock.advance(tick.as_secs_f64());
        if !fast {
            std::thread::sleep(tick);
        }
    }

    tracing::info!("Replay finished");
    Ok(())
}

fn generate(
    config: &AppConfig,
    file: &Path,
    motions: &[Motion],
    period: f64,
    step: f64,
) -> anyhow::Result<()> {
    if period <= 0.0 || step <= 0.0 {
        bail!("period and step must be positive");
    }
    let motions = if motions.is_empty() {
        Motion::all()
    } else {
        motions
    };

    let generator = MotionGenerator::new(step, config.player.height);
    let tracks: Vec<_> = motions
        .iter()
        .map(|motion| generator.generate(*motion, period))
        .collect();
    let lines = save_tracklist(file, &tracks)?;
    tracing::info!(
        "Wrote {} tracks ({} records) to {}",
        tracks.len(),
        lines,
        file.display()
    );
    Ok(())
}
