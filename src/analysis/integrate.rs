//! Numerical helpers over sampled series
//!
//! All helpers take parallel slices of samples and times. Mismatched lengths
//! are logged and yield `None`.

use nalgebra::Vector3;

use crate::skeleton::rotation::sensor_to_earth;

fn same_len(a: usize, b: usize, what: &str) -> bool {
    if a != b {
        tracing::warn!("{}: {} samples but {} times", what, a, b);
        return false;
    }
    true
}

/// Running trapezoidal integral of `x` over `t`, starting at 0.0
pub fn cumulative_integration(x: &[f64], t: &[f64]) -> Option<Vec<f64>> {
    if !same_len(x.len(), t.len(), "cumulative_integration") || x.len() < 2 {
        return None;
    }
    let mut total = 0.0;
    let mut out = Vec::with_capacity(x.len());
    out.push(total);
    for i in 1..x.len() {
        total += (t[i] - t[i - 1]) * (x[i] + x[i - 1]) / 2.0;
        out.push(total);
    }
    Some(out)
}

/// Rate of change between consecutive angle samples (degrees per second)
pub fn angular_velocity(a: &[f64], t: &[f64]) -> Option<Vec<f64>> {
    if !same_len(a.len(), t.len(), "angular_velocity") {
        return None;
    }
    Some(
        a.windows(2)
            .zip(t.windows(2))
            .map(|(a, t)| (a[1] - a[0]) / (t[1] - t[0]))
            .collect(),
    )
}

/// Velocity between consecutive positions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocitySeries {
    /// Per-axis velocity, scaled by the unit conversion
    pub components: Vec<Vector3<f64>>,
    /// Magnitude of each velocity
    pub speed: Vec<f64>,
}

/// Component velocity and speed from a position series. `conversion`
/// scales position units (e.g. `0.01` for centimetres to metres).
pub fn velocity(positions: &[Vector3<f64>], t: &[f64], conversion: f64) -> Option<VelocitySeries> {
    if !same_len(positions.len(), t.len(), "velocity") {
        return None;
    }
    let components: Vec<Vector3<f64>> = positions
        .windows(2)
        .zip(t.windows(2))
        .map(|(p, t)| (p[1] - p[0]) * (conversion / (t[1] - t[0])))
        .collect();
    let speed = components.iter().map(|v| v.norm()).collect();
    Some(VelocitySeries { components, speed })
}

/// Remove ±180° wrap-arounds so a turning angle stays continuous.
///
/// A sign change larger than 90° between neighbours is treated as a wrap
/// and shifted by a full turn.
pub fn tidy_angles(angles: &[f64]) -> Vec<f64> {
    let mut out: Vec<f64> = Vec::with_capacity(angles.len());
    for &angle in angles {
        let tidy = match out.last() {
            Some(&prev) if (prev >= 0.0) == (angle < 0.0) && (angle - prev).abs() > 90.0 => {
                if angle > 0.0 {
                    angle - 360.0
                } else {
                    angle + 360.0
                }
            }
            _ => angle,
        };
        out.push(tidy);
    }
    out
}

/// Rotate sensor-frame vectors into the earth frame using each sample's
/// absolute angles
pub fn to_earth_frame(
    vectors: &[Vector3<f64>],
    angles: &[Vector3<f64>],
) -> Option<Vec<Vector3<f64>>> {
    if !same_len(vectors.len(), angles.len(), "to_earth_frame") {
        return None;
    }
    Some(
        vectors
            .iter()
            .zip(angles)
            .map(|(v, a)| sensor_to_earth(v, a))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrates_constant_and_ramp() {
        let t = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(
            cumulative_integration(&[2.0, 2.0, 2.0, 2.0], &t),
            Some(vec![0.0, 2.0, 4.0, 6.0])
        );
        assert_eq!(
            cumulative_integration(&[0.0, 1.0, 2.0, 3.0], &t),
            Some(vec![0.0, 0.5, 2.0, 4.5])
        );
        assert_eq!(cumulative_integration(&[1.0], &[0.0]), None);
        assert_eq!(cumulative_integration(&[1.0, 2.0], &[0.0]), None);
    }

    #[test]
    fn test_angular_velocity() {
        assert_eq!(
            angular_velocity(&[0.0, 10.0, 40.0], &[0.0, 0.5, 1.0]),
            Some(vec![20.0, 60.0])
        );
    }

    #[test]
    fn test_velocity_and_speed() {
        let positions = [Vector3::zeros(), Vector3::new(300.0, 400.0, 0.0)];
        let series = velocity(&positions, &[0.0, 2.0], 0.01).unwrap();
        assert!((series.components[0] - Vector3::new(1.5, 2.0, 0.0)).norm() < 1e-12);
        assert!((series.speed[0] - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_tidy_angles_unwraps_crossing() {
        assert_eq!(
            tidy_angles(&[170.0, -170.0, -160.0]),
            vec![170.0, 190.0, 200.0]
        );
        assert_eq!(tidy_angles(&[-175.0, 179.0]), vec![-175.0, -181.0]);
        // Small crossings near zero are real motion
        assert_eq!(tidy_angles(&[5.0, -5.0]), vec![5.0, -5.0]);
    }

    #[test]
    fn test_earth_frame_length_mismatch() {
        assert!(to_earth_frame(&[Vector3::zeros()], &[]).is_none());
        let out = to_earth_frame(&[Vector3::x()], &[Vector3::zeros()]).unwrap();
        assert_eq!(out[0], Vector3::x());
    }
}
