//! Skeleton model
//!
//! Forward kinematics for the wearer: a [`Body`] of rigid segments whose
//! rotations compose down fixed root chains, owned by a [`Player`]. Decoded
//! Euler-angle records reach the body through a [`PoseAccumulator`].

pub mod body;
pub mod calibration;
pub mod player;
pub mod pose;
pub mod rotation;

pub use body::{Body, PoseUpdate, Segment, SegmentId};
pub use calibration::{CalibrationMap, CalibrationPhase, Calibrator};
pub use player::{Player, PlayerModel};
pub use pose::{PoseAccumulator, SensorMap};
pub use rotation::rotation_matrix;
