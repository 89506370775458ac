//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use nalgebra::Vector3;

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert two vectors are approximately equal
pub fn assert_vec_eq(a: &Vector3<f64>, b: &Vector3<f64>, epsilon: f64) {
    assert!(
        (a - b).norm() < epsilon,
        "Expected {:?} to be approximately equal to {:?} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
