//! Forward simulation of the three-omni chassis.

use control::kinematics::{WheelVector, WheelVectorInv, wheel_speed, wheel_vector,
    wheel_vectors_inv};
use control::ConfigError;
use types::{Pose, Twist, WheelPose};

/// Kinematic chassis model: duties in, exact pose and wheel rotations out.
///
/// The motor model is a direct map from duty to wheel rate (`max_rps` at
/// full rail, no dynamics). The three drive-wheel rates are folded into a
/// body twist through the drive-matrix inverse; the twist is held constant
/// over each step and integrated in closed form, so the simulated pose
/// carries no integration error of its own.
pub struct OmniPhysics {
    drive_vectors: [WheelVector; 3],
    drive_inv: Vec<WheelVectorInv>,
    measuring_vectors: Vec<WheelVector>,
    pose: Pose,
    twist: Twist,
    /// Wheel rate at |duty| = 1, in rotations/second.
    max_rps: f64,
}

impl OmniPhysics {
    pub fn new(
        drive_wheels: [WheelPose; 3],
        measuring_wheels: Vec<WheelPose>,
        max_rps: f64,
    ) -> Result<Self, ConfigError> {
        let drive_inv = wheel_vectors_inv(&drive_wheels)?;
        for wheel in &measuring_wheels {
            if !(wheel.radius > 0.0) || !wheel.radius.is_finite() {
                return Err(ConfigError::InvalidWheelRadius(wheel.radius));
            }
        }
        Ok(Self {
            drive_vectors: [
                wheel_vector(&drive_wheels[0]),
                wheel_vector(&drive_wheels[1]),
                wheel_vector(&drive_wheels[2]),
            ],
            drive_inv,
            measuring_vectors: measuring_wheels.iter().map(wheel_vector).collect(),
            pose: Pose::default(),
            twist: Twist::default(),
            max_rps,
        })
    }

    /// Advance one step of `dt` seconds under the given drive duties.
    ///
    /// Returns the rotation increment of every measuring wheel over the
    /// step; with a constant twist the wheel rates are constant, so these
    /// are exact.
    pub fn step(&mut self, duties: [f64; 3], dt: f64) -> Vec<f64> {
        let rates = duties.map(|d| d.clamp(-1.0, 1.0) * self.max_rps);

        // Wheel rates back to the body twist they produce.
        self.twist = Twist::new(
            rates.iter().zip(&self.drive_inv).map(|(r, i)| r * i.x).sum(),
            rates.iter().zip(&self.drive_inv).map(|(r, i)| r * i.y).sum(),
            rates
                .iter()
                .zip(&self.drive_inv)
                .map(|(r, i)| r * i.theta)
                .sum(),
        );

        let rotations = self
            .measuring_vectors
            .iter()
            .map(|v| wheel_speed(v, &self.twist) * dt)
            .collect();

        self.integrate(dt);

        rotations
    }

    /// Closed-form pose update for a twist held constant over `dt`.
    fn integrate(&mut self, dt: f64) {
        let Twist { vx, vy, omega } = self.twist;
        let theta = self.pose.theta;

        let (db_x, db_y) = if omega.abs() < 1e-9 {
            (vx * dt, vy * dt)
        } else {
            // Body-frame chord of the arc swept at constant (vx, vy, omega)
            let dtheta = omega * dt;
            (
                (vx * dtheta.sin() + vy * (dtheta.cos() - 1.0)) / omega,
                (vx * (1.0 - dtheta.cos()) + vy * dtheta.sin()) / omega,
            )
        };

        let (sin, cos) = theta.sin_cos();
        self.pose.x += db_x * cos - db_y * sin;
        self.pose.y += db_x * sin + db_y * cos;
        self.pose.theta += self.twist.omega * dt;
    }

    /// Ground-truth pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Drive-wheel forward vectors, in controller order.
    pub fn drive_vectors(&self) -> &[WheelVector; 3] {
        &self.drive_vectors
    }
}
