//! Wheel odometry with IMU heading.

use crate::odometry::MeasuringWheel;
use crate::{Odometry, OdometryInitError};
use control::kinematics::{WheelVectorInv, wheel_vectors_inv};
use hal::{Encoder, Imu};
use std::sync::Mutex;
use tracing::warn;
use types::{Pose, WheelPose, wrap_angle};

struct FusedState {
    pose: Pose,
    last_counts: Vec<i64>,
    last_yaw: f64,
}

/// Wheel odometry with the heading delta replaced by the IMU's.
///
/// Translation still integrates through the wheel inverse vectors; the
/// gyro-fused yaw is immune to wheel slip during rotation. The IMU reports
/// a normalized yaw in degrees, so consecutive readings are differenced and
/// unwrapped across the ±180° seam before integrating.
///
/// An IMU read failure mid-run falls back to the wheel-derived heading
/// delta for that update and is logged; a failure at construction is fatal.
pub struct ImuWheelOdometry {
    encoders: Vec<Box<dyn Encoder>>,
    wheel_vectors_inv: Vec<WheelVectorInv>,
    imu: Mutex<Box<dyn Imu>>,
    state: Mutex<FusedState>,
}

impl ImuWheelOdometry {
    pub fn new(
        measuring_wheels: Vec<MeasuringWheel>,
        mut imu: Box<dyn Imu>,
    ) -> Result<Self, OdometryInitError> {
        let poses: Vec<WheelPose> = measuring_wheels.iter().map(|m| m.wheel).collect();
        let wheel_vectors_inv = wheel_vectors_inv(&poses)?;

        let encoders: Vec<Box<dyn Encoder>> =
            measuring_wheels.into_iter().map(|m| m.encoder).collect();
        let last_counts = encoders.iter().map(|e| e.count()).collect();

        imu.reset_yaw()?;
        let last_yaw = imu.yaw_degrees()?;

        Ok(Self {
            encoders,
            wheel_vectors_inv,
            imu: Mutex::new(imu),
            state: Mutex::new(FusedState {
                pose: Pose::default(),
                last_counts,
                last_yaw,
            }),
        })
    }
}

impl Odometry for ImuWheelOdometry {
    fn pose(&self) -> Pose {
        self.state.lock().unwrap().pose
    }

    fn set_pose(&self, pose: Pose) {
        self.state.lock().unwrap().pose = pose;
    }

    fn update(&self) {
        // Both sensors are sampled before the state lock, same as the pure
        // wheel integrator.
        let counts: Vec<i64> = self.encoders.iter().map(|e| e.count()).collect();
        let yaw = self.imu.lock().unwrap().yaw_degrees();

        let mut state = self.state.lock().unwrap();

        let mut dx = 0.0;
        let mut dy = 0.0;
        let mut wheel_dtheta = 0.0;
        for (i, count) in counts.iter().enumerate() {
            let delta = self.encoders[i].count_to_rotations(count - state.last_counts[i]);
            state.last_counts[i] = *count;

            let inv = &self.wheel_vectors_inv[i];
            dx += delta * inv.x;
            dy += delta * inv.y;
            wheel_dtheta += delta * inv.theta;
        }

        let dtheta = match yaw {
            Ok(yaw) => {
                // Unwrap the normalized reading across the ±180° seam.
                let delta = wrap_angle((yaw - state.last_yaw).to_radians());
                state.last_yaw = yaw;
                delta
            }
            Err(e) => {
                warn!(?e, "IMU read failed, using wheel heading delta");
                wheel_dtheta
            }
        };

        let heading = state.pose.theta + dtheta / 2.0;
        let (sin, cos) = heading.sin_cos();
        state.pose.x += dx * cos - dy * sin;
        state.pose.y += dx * sin + dy * cos;
        state.pose.theta += dtheta;
    }
}
