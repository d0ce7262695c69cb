//! Hardware provider traits for the omni motion core.
//!
//! The controllers talk to encoders, motors and the optional IMU only
//! through the narrow traits here. Real drivers and the simulator implement
//! them; nothing above this layer touches pins, PWM or I²C.

use thiserror::Error;

pub mod quadrature;

pub use quadrature::{Edge, QuadratureDecoder};

#[derive(Error, Debug)]
pub enum MotorError {
    #[error("duty write failed: {0}")]
    Write(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ImuError {
    #[error("IMU read failed: {0}")]
    Read(String),
    #[error("IMU not initialized")]
    NotInitialized,
}

/// Incremental rotary encoder.
///
/// The count is a signed accumulation of quadrature edges since power-on.
/// It is never reset by the motion core; consumers work on count deltas.
/// Implementations guard the count with their own lock so the edge handler
/// and the periodic tasks can share one instance.
pub trait Encoder: Send + Sync {
    /// Accumulated signed edge count.
    fn count(&self) -> i64;

    /// Counts per wheel rotation (already doubled in dual-edge mode).
    fn resolution(&self) -> i64;

    /// Accumulated wheel rotations.
    fn rotations(&self) -> f64 {
        self.count_to_rotations(self.count())
    }

    fn count_to_rotations(&self, count: i64) -> f64 {
        count as f64 / self.resolution() as f64
    }

    fn rotations_to_count(&self, rotations: f64) -> i64 {
        (rotations * self.resolution() as f64) as i64
    }
}

/// Brushed DC motor behind a PWM + direction driver.
pub trait DcMotor: Send {
    /// Command a signed duty ratio in [-1, 1]. Sign selects direction,
    /// magnitude the PWM duty. Polarity inversion is the provider's job.
    fn set_duty(&mut self, duty: f64) -> Result<(), MotorError>;

    /// Last commanded duty ratio.
    fn duty(&self) -> f64;

    fn stop(&mut self) -> Result<(), MotorError> {
        self.set_duty(0.0)
    }
}

/// Absolute-yaw IMU, used by the fused odometry variant.
pub trait Imu: Send {
    /// Yaw in degrees, positive counter-clockwise. The reported value is
    /// normalized by the sensor; consumers should work on deltas.
    fn yaw_degrees(&mut self) -> Result<f64, ImuError>;

    /// Re-zero the yaw origin at the current heading.
    fn reset_yaw(&mut self) -> Result<(), ImuError>;
}
