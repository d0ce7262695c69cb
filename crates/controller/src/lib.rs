//! Top-level pose controller.
//!
//! Owns the odometry and the wheel controller and runs the two periodic
//! loops: a fast odometry tick and a control tick at the pose gain's
//! declared rate. Started from within a tokio runtime.

use control::WheelController;
use localization::Odometry;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use types::{Pose, WheelDuties, wrap_angle};

/// Default odometry integration period.
pub const DEFAULT_ODOMETRY_PERIOD: Duration = Duration::from_millis(5);

/// Task configuration for [`PoseController`].
#[derive(Debug, Clone)]
pub struct PoseControllerConfig {
    /// Odometry integration period
    pub odometry_period: Duration,
    /// Wrap the heading error into (-π, π] before the pose PID. Off by
    /// default: a target many turns away then unwinds the long way, which
    /// is what an accumulated multi-turn heading asks for.
    pub wrap_heading_error: bool,
}

impl Default for PoseControllerConfig {
    fn default() -> Self {
        Self {
            odometry_period: DEFAULT_ODOMETRY_PERIOD,
            wrap_heading_error: false,
        }
    }
}

/// Drives the estimated pose toward the commanded target.
///
/// The control task snapshots the target and the pose under their own
/// locks, never holding either while the wheel controller runs its tick.
/// A control tick may therefore act on a pose up to one odometry period
/// old; keeping the two loops independent keeps odometry jitter out of the
/// control cadence.
pub struct PoseController {
    odometry: Arc<dyn Odometry>,
    wheel_controller: Arc<Mutex<WheelController>>,
    target: Arc<Mutex<Pose>>,
    odometry_task: JoinHandle<()>,
    control_task: JoinHandle<()>,
}

impl PoseController {
    /// Starts the odometry and control tasks immediately. Must be called
    /// from within a tokio runtime.
    pub fn start(
        odometry: Box<dyn Odometry>,
        wheel_controller: WheelController,
        config: PoseControllerConfig,
    ) -> Self {
        let control_period = Duration::from_secs_f64(1.0 / wheel_controller.frequency());

        let odometry: Arc<dyn Odometry> = Arc::from(odometry);
        let wheel_controller = Arc::new(Mutex::new(wheel_controller));
        let target = Arc::new(Mutex::new(Pose::default()));

        info!(
            odometry_period_ms = config.odometry_period.as_millis() as u64,
            control_period_ms = control_period.as_millis() as u64,
            "starting pose controller tasks"
        );

        let odometry_task = tokio::spawn({
            let odometry = Arc::clone(&odometry);
            let period = config.odometry_period;
            async move {
                let mut interval = tokio::time::interval(period);
                loop {
                    interval.tick().await;
                    odometry.update();
                }
            }
        });

        let control_task = tokio::spawn({
            let odometry = Arc::clone(&odometry);
            let wheel_controller = Arc::clone(&wheel_controller);
            let target = Arc::clone(&target);
            let wrap = config.wrap_heading_error;
            async move {
                let mut interval = tokio::time::interval(control_period);
                loop {
                    interval.tick().await;

                    let target = *target.lock().unwrap();
                    let pose = odometry.pose();
                    let mut error = target - pose;
                    if wrap {
                        error.theta = wrap_angle(error.theta);
                    }

                    wheel_controller.lock().unwrap().update_motors(error);
                }
            }
        });

        Self {
            odometry,
            wheel_controller,
            target,
            odometry_task,
            control_task,
        }
    }

    /// Overwrite the target pose. Takes effect on the next control tick.
    pub fn set_target(&self, pose: Pose) {
        debug!(x = pose.x, y = pose.y, theta = pose.theta, "new target");
        *self.target.lock().unwrap() = pose;
    }

    pub fn target(&self) -> Pose {
        *self.target.lock().unwrap()
    }

    /// Override the current pose estimate (initial calibration).
    pub fn set_pose(&self, pose: Pose) {
        self.odometry.set_pose(pose);
    }

    /// Latest pose estimate.
    pub fn pose(&self) -> Pose {
        self.odometry.pose()
    }

    /// Last committed motor duties.
    pub fn duties(&self) -> WheelDuties {
        self.wheel_controller.lock().unwrap().duties()
    }

    /// Stops both tasks and leaves the motors at zero duty.
    pub fn stop(&self) {
        self.odometry_task.abort();
        self.control_task.abort();
        self.wheel_controller.lock().unwrap().zero_outputs();
        info!("pose controller stopped");
    }
}

impl Drop for PoseController {
    fn drop(&mut self) {
        self.odometry_task.abort();
        self.control_task.abort();
        // A dropped controller must not leave the motors powered.
        if let Ok(mut wc) = self.wheel_controller.lock() {
            wc.zero_outputs();
        }
    }
}
