//! Articulated body model
//!
//! The body is a fixed forest of rigid segments stored in an arena. Each
//! segment keeps its parent index and its ordered child indices, so the tree
//! can be walked without shared ownership.
//!
//! A pose update composes rotations down every root chain, parent before
//! child: a segment named in the update gets `R(angles) · R(parent)`, any
//! other segment inherits its parent's composed rotation unchanged. World
//! offsets are the composed rotation applied to the height-scaled rest
//! offset. Positions accumulate offsets down each chain starting from the
//! body translation.

use std::collections::HashMap;

use nalgebra::{Matrix3, Vector3};

use crate::error::{Result, SaError};

use super::calibration::CalibrationMap;
use super::rotation::rotation_matrix;

/// Height multiplier for the body origin above the ground
pub const ORIGIN_HEIGHT: f64 = 57.0;

/// Topology and unit rest offsets, in forest order (parent before child).
///
/// Offsets are multiplied by the player height. Left and right limbs are
/// mirrored in x.
const SEGMENT_TABLE: &[(&str, Option<&str>, [f64; 3])] = &[
    ("Spine", None, [0.0, 24.8, 0.0]),
    ("RightShoulder", Some("Spine"), [-11.0, 0.0, 0.0]),
    ("RightUpperarm", Some("RightShoulder"), [-18.8, 0.0, 0.0]),
    ("RightLowerarm", Some("RightUpperarm"), [-14.5, 0.0, 0.0]),
    ("RightHand", Some("RightLowerarm"), [-10.8, 0.0, 0.0]),
    ("LeftShoulder", Some("Spine"), [11.0, 0.0, 0.0]),
    ("LeftUpperarm", Some("LeftShoulder"), [18.8, 0.0, 0.0]),
    ("LeftLowerarm", Some("LeftUpperarm"), [14.5, 0.0, 0.0]),
    ("LeftHand", Some("LeftLowerarm"), [10.8, 0.0, 0.0]),
    ("Head", Some("Spine"), [0.0, 18.2, 0.0]),
    ("RightHip", None, [-5.2, -4.0, 0.0]),
    ("RightKnee", Some("RightHip"), [0.0, -24.5, 0.0]),
    ("RightAnkle", Some("RightKnee"), [0.0, -26.5, 0.0]),
    ("RightFoot", Some("RightAnkle"), [0.0, -2.0, 10.0]),
    ("LeftHip", None, [5.2, -4.0, 0.0]),
    ("LeftKnee", Some("LeftHip"), [0.0, -24.5, 0.0]),
    ("LeftAnkle", Some("LeftKnee"), [0.0, -26.5, 0.0]),
    ("LeftFoot", Some("LeftAnkle"), [0.0, -2.0, 10.0]),
];

/// Index of a segment in the body arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentId(pub usize);

/// One rigid link of the skeleton
#[derive(Debug, Clone)]
pub struct Segment {
    /// Unique segment name
    pub name: String,
    /// Parent segment, `None` for the head of a root chain
    pub parent: Option<SegmentId>,
    /// Children in construction order
    pub children: Vec<SegmentId>,
    /// Height-scaled offset in the rest pose
    pub rest_offset: Vector3<f64>,
    /// Rest offset transformed by the composed rotation
    pub offset: Vector3<f64>,
    /// Composed rotation from the last pose update
    pub rotation: Matrix3<f64>,
    /// Absolute angles (degrees) last applied to this segment
    pub angles: Option<Vector3<f64>>,
    /// Calibration angles (degrees); stored but not applied to the pose
    pub calibration: Vector3<f64>,
}

/// A single entry of a pose update
#[derive(Debug, Clone, PartialEq)]
pub enum PoseUpdate {
    /// Move and orient the whole body
    Root {
        /// Translation added to the body origin
        translation: Vector3<f64>,
        /// Absolute body rotation in degrees
        rotation: Vector3<f64>,
    },
    /// Absolute orientation of one segment in degrees
    Segment { name: String, angles: Vector3<f64> },
}

impl PoseUpdate {
    /// Convenience constructor for a segment update
    pub fn segment(name: impl Into<String>, angles: [f64; 3]) -> Self {
        PoseUpdate::Segment {
            name: name.into(),
            angles: Vector3::from(angles),
        }
    }
}

/// The articulated body of a player
#[derive(Debug, Clone)]
pub struct Body {
    segments: Vec<Segment>,
    roots: Vec<SegmentId>,
    /// Depth-first traversal, root chain by root chain
    order: Vec<SegmentId>,
    /// Origin the root translation is applied to
    origin: Vector3<f64>,
    /// Current body translation (origin + root delta)
    translation: Vector3<f64>,
    /// Absolute body rotation in degrees
    rotation: Vector3<f64>,
    /// Body-level calibration in degrees
    calibration: Vector3<f64>,
}

impl Body {
    /// Build the standard topology scaled to `height` (metres)
    pub fn new(height: f64) -> Self {
        let mut segments: Vec<Segment> = Vec::with_capacity(SEGMENT_TABLE.len());
        let mut roots = Vec::new();

        for (index, (name, parent_name, unit)) in SEGMENT_TABLE.iter().enumerate() {
            let id = SegmentId(index);
            let parent = parent_name.and_then(|p| {
                segments
                    .iter()
                    .position(|s| s.name == p)
                    .map(SegmentId)
            });
            match parent {
                Some(parent) => segments[parent.0].children.push(id),
                None => roots.push(id),
            }

            let rest_offset = Vector3::from(*unit) * height;
            segments.push(Segment {
                name: (*name).to_string(),
                parent,
                children: Vec::new(),
                rest_offset,
                offset: rest_offset,
                rotation: Matrix3::identity(),
                angles: None,
                calibration: Vector3::zeros(),
            });
        }

        let origin = Vector3::new(0.0, ORIGIN_HEIGHT * height, 0.0);
        let mut body = Self {
            segments,
            roots,
            order: Vec::new(),
            origin,
            translation: origin,
            rotation: Vector3::zeros(),
            calibration: Vector3::zeros(),
        };
        body.order = body.depth_first();
        body
    }

    fn depth_first(&self) -> Vec<SegmentId> {
        let mut order = Vec::with_capacity(self.segments.len());
        let mut stack: Vec<SegmentId> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.segments[id.0].children.iter().rev().copied());
        }
        order
    }

    /// Number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Heads of the root chains
    pub fn roots(&self) -> &[SegmentId] {
        &self.roots
    }

    /// Segments in forest order
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.order.iter().map(|id| &self.segments[id.0])
    }

    /// Get a segment by id
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(id.0)
    }

    /// Find a segment by name, searching root chain by root chain
    pub fn lookup_segment(&self, name: &str) -> Option<&Segment> {
        self.segment_id(name).map(|id| &self.segments[id.0])
    }

    /// Like [`Body::lookup_segment`], failing on names outside the skeleton
    pub fn require_segment(&self, name: &str) -> Result<&Segment> {
        self.lookup_segment(name)
            .ok_or_else(|| SaError::UnknownSegment(name.to_string()))
    }

    /// Find a segment id by name
    pub fn segment_id(&self, name: &str) -> Option<SegmentId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.segments[id.0].name == name)
    }

    /// Current body translation
    pub fn translation(&self) -> Vector3<f64> {
        self.translation
    }

    /// Current absolute body rotation (degrees)
    pub fn rotation(&self) -> Vector3<f64> {
        self.rotation
    }

    /// Apply a sparse set of absolute orientations.
    ///
    /// Returns the number of segment entries that matched a segment; unknown
    /// names are ignored.
    pub fn apply_pose_update(&mut self, updates: &[PoseUpdate]) -> usize {
        let mut segment_angles: HashMap<&str, Vector3<f64>> = HashMap::new();
        for update in updates {
            match update {
                PoseUpdate::Root {
                    translation,
                    rotation,
                } => {
                    self.translation = self.origin + translation;
                    self.rotation = *rotation;
                }
                PoseUpdate::Segment { name, angles } => {
                    segment_angles.insert(name.as_str(), *angles);
                }
            }
        }

        let base =
            rotation_matrix(&self.calibration).transpose() * rotation_matrix(&self.rotation);

        let mut matched = 0;
        for index in 0..self.order.len() {
            let id = self.order[index];
            let parent_rotation = self.segments[id.0]
                .parent
                .map(|p| self.segments[p.0].rotation)
                .unwrap_or(base);

            let segment = &mut self.segments[id.0];
            match segment_angles.get(segment.name.as_str()) {
                Some(angles) => {
                    segment.angles = Some(*angles);
                    segment.rotation = rotation_matrix(angles) * parent_rotation;
                    matched += 1;
                }
                None => segment.rotation = parent_rotation,
            }
            segment.offset = segment.rotation * segment.rest_offset;
        }

        let unknown = segment_angles.len() - matched;
        if unknown > 0 {
            tracing::debug!("Ignored {} pose entries for unknown segments", unknown);
        }
        matched
    }

    /// Store calibration angles per segment.
    ///
    /// Calibration is kept on the segments but is not folded into the
    /// composed rotation.
    pub fn apply_calibration(&mut self, calibration: &CalibrationMap) {
        for segment in &mut self.segments {
            if let Some(angles) = calibration.get(&segment.name) {
                segment.calibration = *angles;
            }
        }
    }

    /// World position of the end of every segment
    pub fn world_positions(&self) -> HashMap<String, Vector3<f64>> {
        self.world_positions_ordered()
            .into_iter()
            .map(|(name, pos)| (name.to_string(), pos))
            .collect()
    }

    /// World positions in forest order
    pub fn world_positions_ordered(&self) -> Vec<(&str, Vector3<f64>)> {
        let mut positions: Vec<Vector3<f64>> = vec![Vector3::zeros(); self.segments.len()];
        let mut out = Vec::with_capacity(self.segments.len());
        for id in &self.order {
            let segment = &self.segments[id.0];
            let base = segment
                .parent
                .map(|p| positions[p.0])
                .unwrap_or(self.translation);
            positions[id.0] = base + segment.offset;
            out.push((segment.name.as_str(), positions[id.0]));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_vec_eq(a: &Vector3<f64>, b: &Vector3<f64>) {
        assert!((a - b).norm() < 1e-9, "{:?} != {:?}", a, b);
    }

    #[test]
    fn test_topology() {
        let body = Body::new(1.0);
        assert_eq!(body.segment_count(), 18);
        assert_eq!(body.roots().len(), 3);

        let names: Vec<_> = body.segments().map(|s| s.name.as_str()).collect();
        assert_eq!(names[0], "Spine");
        assert_eq!(names[9], "Head");
        assert_eq!(names[10], "RightHip");
        assert_eq!(names[14], "LeftHip");

        let spine = body.lookup_segment("Spine").unwrap();
        let children: Vec<_> = spine
            .children
            .iter()
            .map(|id| body.segment(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(children, vec!["RightShoulder", "LeftShoulder", "Head"]);
        assert!(body.lookup_segment("Tail").is_none());
    }

    #[test]
    fn test_require_segment_reports_unknown_names() {
        let body = Body::new(1.0);
        assert_eq!(body.require_segment("Head").unwrap().name, "Head");
        match body.require_segment("Tail") {
            Err(SaError::UnknownSegment(name)) => assert_eq!(name, "Tail"),
            other => panic!("unexpected result {:?}", other.map(|s| &s.name)),
        }
    }

    #[test]
    fn test_rest_offsets_are_height_scaled_and_mirrored() {
        let body = Body::new(1.6);
        assert_vec_eq(
            &body.lookup_segment("Spine").unwrap().rest_offset,
            &Vector3::new(0.0, 24.8 * 1.6, 0.0),
        );
        assert_vec_eq(
            &body.lookup_segment("RightUpperarm").unwrap().rest_offset,
            &Vector3::new(-18.8 * 1.6, 0.0, 0.0),
        );
        assert_vec_eq(
            &body.lookup_segment("LeftUpperarm").unwrap().rest_offset,
            &Vector3::new(18.8 * 1.6, 0.0, 0.0),
        );
        assert_vec_eq(&body.translation(), &Vector3::new(0.0, 57.0 * 1.6, 0.0));
    }

    #[test]
    fn test_rest_pose_positions() {
        let body = Body::new(1.0);
        let positions = body.world_positions();
        assert_vec_eq(&positions["Spine"], &Vector3::new(0.0, 81.8, 0.0));
        assert_vec_eq(&positions["Head"], &Vector3::new(0.0, 100.0, 0.0));
        assert_vec_eq(&positions["RightHand"], &Vector3::new(-55.1, 81.8, 0.0));
        assert_vec_eq(&positions["LeftFoot"], &Vector3::new(5.2, 0.0, 10.0));
    }

    #[test]
    fn test_child_composes_with_parent_rotation() {
        let mut body = Body::new(1.0);
        let parent = Vector3::new(0.0, 0.0, 30.0);
        let child = Vector3::new(0.0, 45.0, 0.0);
        body.apply_pose_update(&[
            PoseUpdate::segment("RightUpperarm", [0.0, 0.0, 30.0]),
            PoseUpdate::segment("RightLowerarm", [0.0, 45.0, 0.0]),
        ]);

        let upper = body.lookup_segment("RightUpperarm").unwrap();
        let lower = body.lookup_segment("RightLowerarm").unwrap();
        let hand = body.lookup_segment("RightHand").unwrap();

        let upper_rot = rotation_matrix(&parent);
        let lower_rot = rotation_matrix(&child) * upper_rot;
        assert!((upper.rotation - upper_rot).norm() < 1e-12);
        assert!((lower.rotation - lower_rot).norm() < 1e-12);
        // Absent segments inherit the parent's composed rotation
        assert!((hand.rotation - lower_rot).norm() < 1e-12);
        assert_vec_eq(&lower.offset, &(lower_rot * lower.rest_offset));
    }

    #[test]
    fn test_absent_segment_reverts_to_parent_rotation() {
        let mut body = Body::new(1.0);
        body.apply_pose_update(&[PoseUpdate::segment("Head", [90.0, 0.0, 0.0])]);
        assert!(body.lookup_segment("Head").unwrap().rotation != Matrix3::identity());

        body.apply_pose_update(&[]);
        assert_eq!(
            body.lookup_segment("Head").unwrap().rotation,
            Matrix3::identity()
        );
        // The last applied angles stay recorded on the segment
        assert_eq!(
            body.lookup_segment("Head").unwrap().angles,
            Some(Vector3::new(90.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_spine_update_leaves_independent_chain() {
        let mut body = Body::new(1.6);
        body.apply_pose_update(&[PoseUpdate::segment("Spine", [0.0, 0.0, 0.0])]);
        let before = body.world_positions();

        body.apply_pose_update(&[PoseUpdate::segment("Spine", [0.0, 90.0, 0.0])]);
        let after = body.world_positions();

        assert!((before["RightShoulder"] - after["RightShoulder"]).norm() > 1.0);
        assert!((before["LeftHand"] - after["LeftHand"]).norm() > 1.0);
        assert_vec_eq(&before["RightHip"], &after["RightHip"]);
        assert_vec_eq(&before["LeftFoot"], &after["LeftFoot"]);
    }

    #[test]
    fn test_spine_tilt_moves_spine_end() {
        let mut body = Body::new(1.6);
        let before = body.world_positions()["Spine"];
        body.apply_pose_update(&[PoseUpdate::segment("Spine", [90.0, 0.0, 0.0])]);
        let after = body.world_positions()["Spine"];
        assert_vec_eq(
            &after,
            &(body.translation() + Vector3::new(0.0, 0.0, 24.8 * 1.6)),
        );
        assert!((before - after).norm() > 1.0);
    }

    #[test]
    fn test_root_update_moves_and_rotates_body() {
        let mut body = Body::new(1.0);
        body.apply_pose_update(&[PoseUpdate::Root {
            translation: Vector3::new(1.0, 2.0, 3.0),
            rotation: Vector3::new(0.0, 0.0, 90.0),
        }]);
        assert_vec_eq(&body.translation(), &Vector3::new(1.0, 59.0, 3.0));

        // RightHip rest (-5.2, -4, 0) rotated 90 degrees about z
        let hip = body.world_positions()["RightHip"];
        assert_vec_eq(&hip, &(Vector3::new(1.0, 59.0, 3.0) + Vector3::new(4.0, -5.2, 0.0)));
    }

    #[test]
    fn test_world_positions_are_idempotent() {
        let mut body = Body::new(1.7);
        body.apply_pose_update(&[
            PoseUpdate::segment("LeftUpperarm", [10.0, 20.0, 30.0]),
            PoseUpdate::segment("RightKnee", [-45.0, 0.0, 0.0]),
        ]);
        let first = body
            .world_positions_ordered()
            .into_iter()
            .map(|(n, p)| (n.to_string(), p))
            .collect::<Vec<_>>();
        let second = body
            .world_positions_ordered()
            .into_iter()
            .map(|(n, p)| (n.to_string(), p))
            .collect::<Vec<_>>();
        assert_eq!(first, second);
    }

    #[test]
    fn test_calibration_is_stored_but_inert() {
        let mut body = Body::new(1.0);
        let update = [PoseUpdate::segment("Spine", [20.0, 0.0, 0.0])];
        body.apply_pose_update(&update);
        let uncalibrated = body.world_positions();

        let mut calibration = CalibrationMap::new();
        calibration.insert("Spine".to_string(), Vector3::new(5.0, 5.0, 5.0));
        body.apply_calibration(&calibration);
        body.apply_pose_update(&update);

        assert_eq!(
            body.lookup_segment("Spine").unwrap().calibration,
            Vector3::new(5.0, 5.0, 5.0)
        );
        assert_eq!(body.world_positions(), uncalibrated);
    }

    #[test]
    fn test_unknown_segments_are_ignored() {
        let mut body = Body::new(1.0);
        let matched = body.apply_pose_update(&[
            PoseUpdate::segment("Tail", [1.0, 2.0, 3.0]),
            PoseUpdate::segment("Head", [1.0, 2.0, 3.0]),
        ]);
        assert_eq!(matched, 1);
    }
}
