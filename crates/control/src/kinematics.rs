//! Wheel-space ↔ body-space transforms.
//!
//! Everything here is a pure function of the wheel placements, evaluated
//! once at construction. The forward map takes a body twist to per-wheel
//! rotation rates; the inverse map takes per-wheel rotation deltas back to a
//! body-frame displacement, by least squares when the measuring wheel set is
//! redundant.

use crate::ConfigError;
use nalgebra::DMatrix;
use types::{Twist, WheelPose};

/// Per-wheel forward vector: its dot product with a body twist
/// (vx, vy, omega) is the wheel's rotation rate in rotations per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelVector {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

/// One row of the left inverse of the stacked forward vectors: its dot
/// product with the per-wheel rotation deltas gives one component of the
/// body-frame displacement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelVectorInv {
    pub x: f64,
    pub y: f64,
    pub theta: f64,
}

/// Forward vector of one wheel from its placement.
///
/// The contact-point velocity under a twist is (vx, vy) + omega·(-pos_y,
/// pos_x); projecting onto the roll direction (cos h, sin h) and dividing by
/// the circumference yields rotations per second.
pub fn wheel_vector(wheel: &WheelPose) -> WheelVector {
    let circumference = 2.0 * std::f64::consts::PI * wheel.radius;
    let x = wheel.heading.cos() / circumference;
    let y = wheel.heading.sin() / circumference;

    WheelVector {
        x,
        y,
        theta: wheel.x * y - wheel.y * x,
    }
}

/// Rotation rate of one wheel under a body twist (rotations/second).
pub fn wheel_speed(vector: &WheelVector, twist: &Twist) -> f64 {
    vector.x * twist.vx + vector.y * twist.vy + vector.theta * twist.omega
}

/// Left inverse of the stacked forward vectors of `wheels`.
///
/// Plain matrix inverse for three wheels; for a redundant set the
/// Moore-Penrose pseudo-inverse through the 3×3 Gram matrix, which solves
/// the rotation deltas in the least-squares sense. Degenerate placements
/// (rank < 3) fail here, before any task starts.
pub fn wheel_vectors_inv(wheels: &[WheelPose]) -> Result<Vec<WheelVectorInv>, ConfigError> {
    if wheels.len() < 3 {
        return Err(ConfigError::TooFewWheels(wheels.len()));
    }
    for wheel in wheels {
        if !(wheel.radius > 0.0) || !wheel.radius.is_finite() {
            return Err(ConfigError::InvalidWheelRadius(wheel.radius));
        }
    }

    let n = wheels.len();
    let mut w = DMatrix::<f64>::zeros(n, 3);
    for (i, wheel) in wheels.iter().enumerate() {
        let v = wheel_vector(wheel);
        w[(i, 0)] = v.x;
        w[(i, 1)] = v.y;
        w[(i, 2)] = v.theta;
    }

    let inv = if n == 3 {
        w.try_inverse().ok_or(ConfigError::SingularWheelMatrix)?
    } else {
        let gram = w.transpose() * &w;
        let gram_inv = gram
            .try_inverse()
            .ok_or(ConfigError::SingularWheelMatrix)?;
        gram_inv * w.transpose()
    };

    if inv.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::SingularWheelMatrix);
    }

    Ok((0..n)
        .map(|i| WheelVectorInv {
            x: inv[(0, i)],
            y: inv[(1, i)],
            theta: inv[(2, i)],
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;
    use types::layout;

    const CIRCUMFERENCE: f64 = 2.0 * PI * layout::WHEEL_RADIUS;

    #[test]
    fn test_forward_vector_default_front_wheel() {
        let v = wheel_vector(&layout::front());
        // Rolls along +X at (0, +tread): full x contribution, none from y,
        // tangential theta term.
        assert!((v.x - 1.0 / CIRCUMFERENCE).abs() < 1e-9);
        assert!(v.y.abs() < 1e-9);
        assert!((v.theta + layout::TREAD_RADIUS / CIRCUMFERENCE).abs() < 1e-9);
    }

    #[test]
    fn test_measuring_wheels_ignore_rotation() {
        // Both axis wheels sit at the origin, so chassis rotation does not
        // turn them.
        let x = wheel_vector(&layout::measuring_x());
        let y = wheel_vector(&layout::measuring_y());
        assert!(x.theta.abs() < 1e-12);
        assert!(y.theta.abs() < 1e-12);
        assert!((x.x - 1.0 / CIRCUMFERENCE).abs() < 1e-9);
        assert!((y.y - 1.0 / CIRCUMFERENCE).abs() < 1e-9);
    }

    #[test]
    fn test_inverse_roundtrip_three_wheels() {
        let wheels = layout::drive_wheels();
        let vectors: Vec<_> = wheels.iter().map(wheel_vector).collect();
        let inverse = wheel_vectors_inv(&wheels).unwrap();

        let twist = Twist::new(0.8, -0.3, 1.7);
        let rates: Vec<f64> = vectors.iter().map(|v| wheel_speed(v, &twist)).collect();

        let vx: f64 = rates.iter().zip(&inverse).map(|(r, i)| r * i.x).sum();
        let vy: f64 = rates.iter().zip(&inverse).map(|(r, i)| r * i.y).sum();
        let omega: f64 = rates.iter().zip(&inverse).map(|(r, i)| r * i.theta).sum();

        assert!((vx - twist.vx).abs() < 1e-9);
        assert!((vy - twist.vy).abs() < 1e-9);
        assert!((omega - twist.omega).abs() < 1e-9);
    }

    #[test]
    fn test_unit_rotation_roundtrip_three_wheels() {
        // Push one rotation on the front wheel only: the reconstructed body
        // delta must map back to exactly (1, 0, 0) rotations.
        let wheels = layout::drive_wheels();
        let vectors: Vec<_> = wheels.iter().map(wheel_vector).collect();
        let inverse = wheel_vectors_inv(&wheels).unwrap();

        let deltas = [1.0, 0.0, 0.0];
        let dx: f64 = deltas.iter().zip(&inverse).map(|(d, i)| d * i.x).sum();
        let dy: f64 = deltas.iter().zip(&inverse).map(|(d, i)| d * i.y).sum();
        let dtheta: f64 = deltas.iter().zip(&inverse).map(|(d, i)| d * i.theta).sum();

        let twist = Twist::new(dx, dy, dtheta);
        for (k, v) in vectors.iter().enumerate() {
            let expected = if k == 0 { 1.0 } else { 0.0 };
            assert!(
                (wheel_speed(v, &twist) - expected).abs() < 1e-9,
                "wheel {k} reconstruction off"
            );
        }
    }

    #[test]
    fn test_pseudo_inverse_five_wheels_consistent() {
        // Redundant set: deltas generated by a real twist must reconstruct
        // that twist exactly (they lie in the column space).
        let wheels = layout::measuring_wheels();
        let vectors: Vec<_> = wheels.iter().map(wheel_vector).collect();
        let inverse = wheel_vectors_inv(&wheels).unwrap();

        let twist = Twist::new(-0.4, 1.1, 0.6);
        let rates: Vec<f64> = vectors.iter().map(|v| wheel_speed(v, &twist)).collect();

        let vx: f64 = rates.iter().zip(&inverse).map(|(r, i)| r * i.x).sum();
        let vy: f64 = rates.iter().zip(&inverse).map(|(r, i)| r * i.y).sum();
        let omega: f64 = rates.iter().zip(&inverse).map(|(r, i)| r * i.theta).sum();

        assert!((vx - twist.vx).abs() < 1e-9);
        assert!((vy - twist.vy).abs() < 1e-9);
        assert!((omega - twist.omega).abs() < 1e-9);
    }

    #[test]
    fn test_singular_placement_rejected() {
        // Three parallel wheels cannot observe lateral motion.
        let wheels = [
            WheelPose::new(0.0, 0.1, 0.0, 0.03),
            WheelPose::new(0.0, 0.0, 0.0, 0.03),
            WheelPose::new(0.0, -0.1, 0.0, 0.03),
        ];
        assert!(matches!(
            wheel_vectors_inv(&wheels),
            Err(ConfigError::SingularWheelMatrix)
        ));
    }

    #[test]
    fn test_too_few_and_bad_radius_rejected() {
        assert!(matches!(
            wheel_vectors_inv(&[layout::front(), layout::rear_left()]),
            Err(ConfigError::TooFewWheels(2))
        ));

        let mut wheels = layout::drive_wheels();
        wheels[1].radius = 0.0;
        assert!(matches!(
            wheel_vectors_inv(&wheels),
            Err(ConfigError::InvalidWheelRadius(_))
        ));
    }
}
