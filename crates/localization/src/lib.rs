//! Wheel odometry and pose estimation for the omni platform.
//!
//! Provides:
//! - [`WheelOdometry`] — dead reckoning from the measuring-wheel encoders
//! - [`ImuWheelOdometry`] — the same translation integration with heading
//!   taken from an IMU

use control::ConfigError;
use hal::ImuError;
use thiserror::Error;
use types::Pose;

mod fused;
mod odometry;

pub use fused::ImuWheelOdometry;
pub use odometry::{MeasuringWheel, WheelOdometry};

/// Pose source the controller drives against.
///
/// Implementations own their integrator state for their whole lifetime and
/// take `&self` everywhere, so one instance can be shared between the
/// odometry task and readers.
pub trait Odometry: Send + Sync {
    /// Consistent snapshot of the current field-frame pose.
    fn pose(&self) -> Pose;

    /// Override the pose (initial calibration). Encoder baselines are not
    /// touched: the next update integrates from the same count deltas.
    fn set_pose(&self, pose: Pose);

    /// Integrate the encoder motion accumulated since the previous update.
    fn update(&self);
}

#[derive(Error, Debug)]
pub enum OdometryInitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("IMU unavailable at startup: {0}")]
    Imu(#[from] ImuError),
}
