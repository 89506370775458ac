//! # SA-Analyzer: Sensor Garment Motion Analyzer
//!
//! Decodes the orientation stream of a sensor garment, drives an articulated
//! body model from it, records sessions into tracks and replays them.
//!
//! ## Architecture
//!
//! - **Stream**: Decodes garment datagrams and track-file lines into records
//! - **Skeleton**: Segment forest, pose accumulation and calibration
//! - **Session**: Record/playback engine and the track-list file format
//! - **Views**: Rolling plot series and the filtered data table
//! - **App**: [`AnalyzerSession`] ties the above into one periodic tick
//!
//! ## Configuration
//!
//! Settings (player, sensor assignment, timing) are read from
//! `config.toml` in the platform data directory under `sa-analyzer`:
//!
//! - **Linux**: `~/.local/share/sa-analyzer/`
//! - **macOS**: `~/Library/Application Support/sa-analyzer/`
//! - **Windows**: `%APPDATA%\sa-analyzer\`
//!
//! ## Example
//!
//! ```ignore
//! use sa_analyzer::{AnalyzerSession, AppConfig, PlayState, QueueSource};
//!
//! let config = AppConfig::load_or_default(None);
//! let mut session = AnalyzerSession::new(&config);
//! session.set_connected(true);
//!
//! let mut source = QueueSource::new();
//! source.push("SE,5,1200,10.00,0.00,-5.25;");
//! session.set_play_state(PlayState::Record);
//! let out = session.tick(Some(&mut source));
//! for (segment, position) in out.positions {
//!     println!("{segment}: {position}");
//! }
//! ```

pub mod analysis;
pub mod app;
pub mod config;
pub mod error;
pub mod motion;
pub mod session;
pub mod skeleton;
pub mod stream;
pub mod types;
pub mod views;

// Re-export commonly used types
pub use app::{AnalyzerSession, RawLog, TickOutput, ViewState};
pub use config::AppConfig;
pub use error::{Result, SaError};
pub use motion::{Motion, MotionGenerator};
pub use session::{PlayState, RecPlay, Track};
pub use skeleton::{Body, Player, PoseUpdate};
pub use stream::{DatagramSource, QueueSource};
pub use types::{FieldValue, Fields, Record, RecordKind};
