//! Dead reckoning from the measuring-wheel encoders.

use crate::Odometry;
use control::kinematics::{WheelVectorInv, wheel_vectors_inv};
use control::ConfigError;
use hal::Encoder;
use std::sync::Mutex;
use tracing::trace;
use types::{Pose, WheelPose};

/// One encoder-bearing wheel handed to the odometry at construction.
pub struct MeasuringWheel {
    pub wheel: WheelPose,
    pub encoder: Box<dyn Encoder>,
}

struct OdometryState {
    pose: Pose,
    last_counts: Vec<i64>,
}

/// Field-frame pose integrator over N ≥ 3 measuring wheels.
///
/// Every update reads all encoder counts as one batch, converts the count
/// deltas to a body-frame displacement through the inverse wheel vectors,
/// and rotates that displacement into the field frame at the mid-step
/// heading θ + Δθ/2 — second-order accurate for a constant body twist over
/// the interval, which matters at the rates this runs at.
///
/// Counts and pose live behind one mutex so readers always see a snapshot
/// where both advanced together. Encoder reads happen outside the lock;
/// an edge handler blocked on its counter can never stall a pose reader.
pub struct WheelOdometry {
    encoders: Vec<Box<dyn Encoder>>,
    wheel_vectors_inv: Vec<WheelVectorInv>,
    state: Mutex<OdometryState>,
}

impl WheelOdometry {
    /// Fails on degenerate wheel placements (rank < 3) or fewer than three
    /// wheels; there is no runtime failure path after that.
    pub fn new(measuring_wheels: Vec<MeasuringWheel>) -> Result<Self, ConfigError> {
        let poses: Vec<WheelPose> = measuring_wheels.iter().map(|m| m.wheel).collect();
        let wheel_vectors_inv = wheel_vectors_inv(&poses)?;

        let encoders: Vec<Box<dyn Encoder>> =
            measuring_wheels.into_iter().map(|m| m.encoder).collect();

        // Baseline the counts now: motion before construction is calibration
        // offset, not displacement.
        let last_counts = encoders.iter().map(|e| e.count()).collect();

        Ok(Self {
            encoders,
            wheel_vectors_inv,
            state: Mutex::new(OdometryState {
                pose: Pose::default(),
                last_counts,
            }),
        })
    }
}

impl Odometry for WheelOdometry {
    fn pose(&self) -> Pose {
        self.state.lock().unwrap().pose
    }

    fn set_pose(&self, pose: Pose) {
        self.state.lock().unwrap().pose = pose;
    }

    fn update(&self) {
        // Batch-read every encoder before taking the state lock.
        let counts: Vec<i64> = self.encoders.iter().map(|e| e.count()).collect();

        let mut state = self.state.lock().unwrap();

        let mut dx = 0.0;
        let mut dy = 0.0;
        let mut dtheta = 0.0;
        for (i, count) in counts.iter().enumerate() {
            let delta = self.encoders[i].count_to_rotations(count - state.last_counts[i]);
            state.last_counts[i] = *count;

            let inv = &self.wheel_vectors_inv[i];
            dx += delta * inv.x;
            dy += delta * inv.y;
            dtheta += delta * inv.theta;
        }

        // Mid-step heading for the body→field rotation.
        let heading = state.pose.theta + dtheta / 2.0;
        let (sin, cos) = heading.sin_cos();
        state.pose.x += dx * cos - dy * sin;
        state.pose.y += dx * sin + dy * cos;
        state.pose.theta += dtheta;

        trace!(
            x = state.pose.x,
            y = state.pose.y,
            theta = state.pose.theta,
            "odometry update"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim::SimEncoder;
    use std::f64::consts::PI;
    use types::layout;

    fn five_wheel_odometry() -> (Vec<SimEncoder>, WheelOdometry) {
        let encoders: Vec<SimEncoder> = (0..5).map(|_| SimEncoder::new(2048, false)).collect();
        let wheels = layout::measuring_wheels()
            .iter()
            .zip(&encoders)
            .map(|(wheel, encoder)| MeasuringWheel {
                wheel: *wheel,
                encoder: Box::new(encoder.clone()),
            })
            .collect();
        let odometry = WheelOdometry::new(wheels).unwrap();
        (encoders, odometry)
    }

    #[test]
    fn test_no_motion_no_drift() {
        let (_encoders, odometry) = five_wheel_odometry();
        for _ in 0..1000 {
            odometry.update();
        }
        assert_eq!(odometry.pose(), Pose::default());
    }

    #[test]
    fn test_pure_x_translation() {
        let (encoders, odometry) = five_wheel_odometry();
        let circumference = 2.0 * PI * layout::WHEEL_RADIUS;

        // One rotation of everything that rolls along +X moves the chassis
        // one circumference forward: front wheel and measuring-X roll fully,
        // the rear wheels roll by their -1/2 projection.
        encoders[0].add_rotations(1.0);
        encoders[1].add_rotations(-0.5);
        encoders[2].add_rotations(-0.5);
        encoders[3].add_rotations(1.0);
        odometry.update();

        let pose = odometry.pose();
        assert!((pose.x - circumference).abs() < 1e-3);
        assert!(pose.y.abs() < 1e-3);
        assert!(pose.theta.abs() < 1e-3);
    }

    #[test]
    fn test_displacement_rotates_with_heading() {
        // The same body-frame motion lands differently in the field frame
        // depending on the heading, but with identical magnitude.
        let (encoders, odometry) = five_wheel_odometry();
        encoders[0].add_rotations(1.0);
        encoders[1].add_rotations(-0.5);
        encoders[2].add_rotations(-0.5);
        encoders[3].add_rotations(1.0);
        odometry.update();
        let straight = odometry.pose();

        let (encoders, odometry) = five_wheel_odometry();
        odometry.set_pose(Pose::new(3.0, -2.0, PI / 2.0));
        encoders[0].add_rotations(1.0);
        encoders[1].add_rotations(-0.5);
        encoders[2].add_rotations(-0.5);
        encoders[3].add_rotations(1.0);
        odometry.update();
        let rotated = odometry.pose();

        let mag_a = (straight.x.powi(2) + straight.y.powi(2)).sqrt();
        let dx = rotated.x - 3.0;
        let dy = rotated.y + 2.0;
        let mag_b = (dx.powi(2) + dy.powi(2)).sqrt();
        assert!((mag_a - mag_b).abs() < 1e-6);
        // At 90° heading, body +X is field +Y
        assert!(dx.abs() < 1e-3);
        assert!((dy - mag_b).abs() < 1e-6);
    }

    #[test]
    fn test_set_pose_keeps_count_baseline() {
        let (encoders, odometry) = five_wheel_odometry();

        // Motion accumulates, then the pose is overridden before the next
        // update: the override must not replay the pre-override motion...
        encoders[3].add_rotations(1.0);
        encoders[0].add_rotations(1.0);
        encoders[1].add_rotations(-0.5);
        encoders[2].add_rotations(-0.5);
        odometry.update();

        odometry.set_pose(Pose::default());
        odometry.update();
        assert_eq!(odometry.pose(), Pose::default());
    }

    #[test]
    fn test_construction_baselines_existing_counts() {
        let encoders: Vec<SimEncoder> = (0..5).map(|_| SimEncoder::new(2048, false)).collect();
        encoders[3].add_rotations(7.0);

        let wheels = layout::measuring_wheels()
            .iter()
            .zip(&encoders)
            .map(|(wheel, encoder)| MeasuringWheel {
                wheel: *wheel,
                encoder: Box::new(encoder.clone()),
            })
            .collect();
        let odometry = WheelOdometry::new(wheels).unwrap();

        odometry.update();
        assert_eq!(odometry.pose(), Pose::default());
    }

    #[test]
    fn test_mid_step_heading_beats_start_of_step() {
        // Drive a quarter circle in a handful of coarse steps; the mid-step
        // rotation keeps the endpoint error far below the step angle.
        let (encoders, odometry) = five_wheel_odometry();
        let vectors: Vec<_> = layout::measuring_wheels()
            .iter()
            .map(|w| control::kinematics::wheel_vector(w))
            .collect();

        // Body twist: 1 m/s forward while turning 1 rad/s, 16 steps of π/32 s
        let steps = 16;
        let dt = PI / 2.0 / steps as f64;
        for _ in 0..steps {
            for (encoder, v) in encoders.iter().zip(&vectors) {
                encoder.add_rotations((v.x * 1.0 + v.theta * 1.0) * dt);
            }
            odometry.update();
        }

        // Exact endpoint of that arc: (sin θ, 1 - cos θ) at θ = π/2
        let pose = odometry.pose();
        assert!((pose.theta - PI / 2.0).abs() < 1e-3);
        assert!((pose.x - 1.0).abs() < 5e-3);
        assert!((pose.y - 1.0).abs() < 5e-3);
    }

    #[test]
    fn test_three_wheel_set_reconstructs_unit_rotation() {
        // Measuring with only the three drive-wheel positions: pushing one
        // rotation on the front wheel must land on a body delta that the
        // forward map sends back to exactly (1, 0, 0) rotations.
        let encoders: Vec<SimEncoder> = (0..3).map(|_| SimEncoder::new(2048, false)).collect();
        let wheels: Vec<MeasuringWheel> = layout::drive_wheels()
            .iter()
            .zip(&encoders)
            .map(|(wheel, encoder)| MeasuringWheel {
                wheel: *wheel,
                encoder: Box::new(encoder.clone()),
            })
            .collect();
        let odometry = WheelOdometry::new(wheels).unwrap();

        encoders[0].add_rotations(1.0);
        odometry.update();

        let pose = odometry.pose();
        // Recompose through the forward vectors; theta is small enough here
        // that the field/body frame difference stays inside the tolerance.
        let twist = types::Twist::new(pose.x, pose.y, pose.theta);
        let rates: Vec<f64> = layout::drive_wheels()
            .iter()
            .map(|w| control::kinematics::wheel_speed(&control::kinematics::wheel_vector(w), &twist))
            .collect();
        assert!((rates[0] - 1.0).abs() < 2e-2);
        assert!(rates[1].abs() < 2e-2);
        assert!(rates[2].abs() < 2e-2);
    }
}
