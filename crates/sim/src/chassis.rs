//! The assembled simulation rig.

use crate::{OmniPhysics, SimEncoder, SimMotor};
use control::ConfigError;
use hal::DcMotor;
use tracing::debug;
use types::{Pose, WheelPose};

/// Full chassis simulation: three motors in, five encoder counts out.
///
/// Each tick reads the duties the controller last commanded, advances the
/// physics, and feeds the resulting rotations into the encoders — the same
/// loop the real electronics close through the field.
pub struct SimChassis {
    motors: [SimMotor; 3],
    encoders: Vec<SimEncoder>,
    physics: OmniPhysics,
}

impl SimChassis {
    /// `encoder_resolution` is the native counts per rotation of every
    /// encoder; `max_rps` the wheel rate at full duty.
    pub fn new(
        drive_wheels: [WheelPose; 3],
        measuring_wheels: Vec<WheelPose>,
        encoder_resolution: i64,
        max_rps: f64,
    ) -> Result<Self, ConfigError> {
        let physics = OmniPhysics::new(drive_wheels, measuring_wheels.clone(), max_rps)?;
        let encoders = measuring_wheels
            .iter()
            .map(|_| SimEncoder::new(encoder_resolution, false))
            .collect();

        debug!(
            wheels = measuring_wheels.len(),
            resolution = encoder_resolution,
            "sim chassis ready"
        );

        Ok(Self {
            motors: [SimMotor::new(), SimMotor::new(), SimMotor::new()],
            encoders,
            physics,
        })
    }

    /// Handle to drive motor `i` (controller side).
    pub fn motor(&self, i: usize) -> SimMotor {
        self.motors[i].clone()
    }

    /// Handle to encoder `i`, in measuring-wheel order.
    pub fn encoder(&self, i: usize) -> SimEncoder {
        self.encoders[i].clone()
    }

    pub fn encoder_count(&self) -> usize {
        self.encoders.len()
    }

    /// Advance the world by `dt` seconds.
    pub fn tick(&mut self, dt: f64) {
        let duties = [
            self.motors[0].duty(),
            self.motors[1].duty(),
            self.motors[2].duty(),
        ];
        let rotations = self.physics.step(duties, dt);
        for (encoder, rotation) in self.encoders.iter().zip(rotations) {
            encoder.add_rotations(rotation);
        }
    }

    /// Ground-truth pose, for comparing against the estimator.
    pub fn true_pose(&self) -> Pose {
        self.physics.pose()
    }
}
