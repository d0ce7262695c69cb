//! Closed-loop wheel control for the omni chassis.
//!
//! - [`pid`] — generic discrete PID core
//! - [`kinematics`] — wheel-space ↔ body-space transforms
//! - [`duty`] — per-wheel rate-to-duty inner loop
//! - [`wheel`] — three-wheel controller with shape-preserving saturation

use thiserror::Error;

pub mod duty;
pub mod kinematics;
pub mod pid;
pub mod wheel;

pub use duty::DutyController;
pub use kinematics::{WheelVector, WheelVectorInv, wheel_speed, wheel_vector, wheel_vectors_inv};
pub use pid::Pid;
pub use wheel::{MotorWheel, WheelController};

/// Construction-time configuration failures. None of these are recoverable
/// at runtime; a controller that fails to construct starts no tasks.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("wheel radius must be positive, got {0}")]
    InvalidWheelRadius(f64),
    #[error("control frequency must be positive, got {0}")]
    InvalidFrequency(f64),
    #[error("need at least 3 measuring wheels, got {0}")]
    TooFewWheels(usize),
    #[error("wheel matrix is singular; check wheel placements")]
    SingularWheelMatrix,
}
