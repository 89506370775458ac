//! Rotation helpers
//!
//! [`rotation_matrix`] is the one used on the pose path. The remaining
//! functions convert between sensor representations and are used by the
//! analysis code only.

use nalgebra::{Matrix3, Vector3};

/// Tolerance used when checking orthonormality
const ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// Rotation matrix for Euler angles in degrees.
///
/// Right-handed elementary rotations composed as `Rx · Ry · Rz`.
pub fn rotation_matrix(angles: &Vector3<f64>) -> Matrix3<f64> {
    let (sx, cx) = angles.x.to_radians().sin_cos();
    let (sy, cy) = angles.y.to_radians().sin_cos();
    let (sz, cz) = angles.z.to_radians().sin_cos();

    #[rustfmt::skip]
    let rot_x = Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, cx,  -sx,
        0.0, sx,  cx,
    );
    #[rustfmt::skip]
    let rot_y = Matrix3::new(
        cy,  0.0, sy,
        0.0, 1.0, 0.0,
        -sy, 0.0, cy,
    );
    #[rustfmt::skip]
    let rot_z = Matrix3::new(
        cz,  -sz, 0.0,
        sz,  cz,  0.0,
        0.0, 0.0, 1.0,
    );

    rot_x * rot_y * rot_z
}

/// Check that `m` is orthonormal (`mᵀ·m ≈ I`)
pub fn is_rotation_matrix(m: &Matrix3<f64>) -> bool {
    (Matrix3::identity() - m.transpose() * m).norm() < ORTHONORMAL_TOLERANCE
}

/// Recover (x, y, z) angles in radians from a rotation matrix.
///
/// Uses the `Rz · Ry · Rx` decomposition, falling back to `z = 0` near
/// gimbal lock. Returns `None` if `m` is not a rotation.
pub fn matrix_to_euler(m: &Matrix3<f64>) -> Option<Vector3<f64>> {
    if !is_rotation_matrix(m) {
        return None;
    }

    let sy = (m[(0, 0)] * m[(0, 0)] + m[(1, 0)] * m[(1, 0)]).sqrt();
    let angles = if sy >= ORTHONORMAL_TOLERANCE {
        Vector3::new(
            m[(2, 1)].atan2(m[(2, 2)]),
            (-m[(2, 0)]).atan2(sy),
            m[(1, 0)].atan2(m[(0, 0)]),
        )
    } else {
        Vector3::new(
            (-m[(1, 2)]).atan2(m[(1, 1)]),
            (-m[(2, 0)]).atan2(sy),
            0.0,
        )
    };
    Some(angles)
}

/// Convert a unit quaternion to (roll, pitch, yaw) in degrees
pub fn quaternion_to_euler_degrees(w: f64, x: f64, y: f64, z: f64) -> Vector3<f64> {
    let ysqr = y * y;

    let t0 = 2.0 * (w * x + y * z);
    let t1 = 1.0 - 2.0 * (x * x + ysqr);
    let roll = t0.atan2(t1).to_degrees();

    let t2 = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0);
    let pitch = t2.asin().to_degrees();

    let t3 = 2.0 * (w * z + x * y);
    let t4 = 1.0 - 2.0 * (ysqr + z * z);
    let yaw = t3.atan2(t4).to_degrees();

    Vector3::new(roll, pitch, yaw)
}

/// Rotate a sensor-frame vector into the earth frame using the sensor's
/// absolute angles (degrees)
pub fn sensor_to_earth(vector: &Vector3<f64>, angles: &Vector3<f64>) -> Vector3<f64> {
    rotation_matrix(angles).transpose() * vector
}
