//! Three-wheel controller: pose error in, motor duties out.

use crate::ConfigError;
use crate::duty::DutyController;
use crate::kinematics::{WheelVector, wheel_speed, wheel_vector};
use crate::pid::{Pid, PosePid};
use hal::DcMotor;
use tracing::{error, trace, warn};
use types::{PidGain, Pose, Twist, WheelDuties, WheelPose};

/// Number of driven wheels on the chassis.
pub const DRIVE_WHEELS: usize = 3;

/// One drive wheel assembly handed to the controller at construction.
pub struct MotorWheel {
    pub wheel: WheelPose,
    pub encoder: Box<dyn hal::Encoder>,
    pub motor: Box<dyn DcMotor>,
    /// Inner rate-loop gain for this wheel's motor.
    pub gain: PidGain,
}

/// Turns a pose error into per-wheel duty commands.
///
/// Pipeline per tick: rate estimates → pose PID → target body twist →
/// per-wheel target rates → wheel-speed rescale → per-wheel duty loops →
/// duty rescale → motor writes. Both rescale stages multiply all three
/// wheels by one scalar, so saturation never rotates the commanded motion
/// direction.
///
/// Saturation does not freeze the PID integrators; under sustained
/// saturation the pose integral keeps accumulating and unwinds through the
/// same rescaled path once the error collapses.
pub struct WheelController {
    wheel_vectors: [WheelVector; DRIVE_WHEELS],
    motors: [Box<dyn DcMotor>; DRIVE_WHEELS],
    duty_controllers: [DutyController; DRIVE_WHEELS],
    pose_pid: PosePid,
    /// Per-wheel speed ceiling in rotations/second.
    max_wheel_speed: f64,
    /// Duty magnitude ceiling, at most 1.0.
    max_duty: f64,
}

impl WheelController {
    pub fn new(
        motor_wheels: [MotorWheel; DRIVE_WHEELS],
        pose_gain: PidGain,
        max_wheel_speed: f64,
        max_duty: f64,
    ) -> Result<Self, ConfigError> {
        if !(pose_gain.frequency > 0.0) || !pose_gain.frequency.is_finite() {
            return Err(ConfigError::InvalidFrequency(pose_gain.frequency));
        }

        let mut wheel_vectors = [WheelVector {
            x: 0.0,
            y: 0.0,
            theta: 0.0,
        }; DRIVE_WHEELS];
        let mut motors = Vec::with_capacity(DRIVE_WHEELS);
        let mut duty_controllers = Vec::with_capacity(DRIVE_WHEELS);

        for (i, mw) in motor_wheels.into_iter().enumerate() {
            if !(mw.wheel.radius > 0.0) || !mw.wheel.radius.is_finite() {
                return Err(ConfigError::InvalidWheelRadius(mw.wheel.radius));
            }
            // Inner loops run at the same declared rate as the pose loop;
            // the duty integration in DutyController depends on it.
            let gain = PidGain {
                frequency: pose_gain.frequency,
                ..mw.gain
            };
            wheel_vectors[i] = wheel_vector(&mw.wheel);
            duty_controllers.push(DutyController::new(mw.encoder, gain)?);
            motors.push(mw.motor);
        }

        let motors: [Box<dyn DcMotor>; DRIVE_WHEELS] = match motors.try_into() {
            Ok(m) => m,
            Err(_) => unreachable!("exactly {DRIVE_WHEELS} motors collected"),
        };
        let duty_controllers: [DutyController; DRIVE_WHEELS] = match duty_controllers.try_into() {
            Ok(d) => d,
            Err(_) => unreachable!("exactly {DRIVE_WHEELS} duty controllers collected"),
        };

        Ok(Self {
            wheel_vectors,
            motors,
            duty_controllers,
            pose_pid: Pid::new(pose_gain),
            max_wheel_speed,
            max_duty: max_duty.min(1.0),
        })
    }

    /// Declared control rate in Hz (the pose-loop gain's frequency).
    pub fn frequency(&self) -> f64 {
        self.pose_pid.frequency()
    }

    /// One control step toward cancelling `error`.
    pub fn update_motors(&mut self, error: Pose) {
        // Encoder reads come first so every wheel's rate estimate covers the
        // same tick interval.
        for ctrl in &mut self.duty_controllers {
            ctrl.update_current_rps();
        }

        if error.is_nan() {
            warn!("NaN in pose error, zeroing outputs");
            self.zero_outputs();
            return;
        }

        // Pose PID output is read directly as a body velocity command.
        let raw = self.pose_pid.calculate(error);
        let twist = Twist::new(raw.x, raw.y, raw.theta);

        let speeds = self.target_wheel_speeds(&twist);

        let mut duties = [0.0; DRIVE_WHEELS];
        for (i, ctrl) in self.duty_controllers.iter_mut().enumerate() {
            ctrl.set_target_rps(speeds[i]);
            duties[i] = ctrl.calculate_duty();
        }

        // Any wheel past the duty ceiling shrinks all of them by the same
        // factor, keeping the duty ratios intact.
        let peak = duties.iter().fold(self.max_duty, |m, d| m.max(d.abs()));
        if peak > self.max_duty {
            for duty in &mut duties {
                *duty *= self.max_duty / peak;
            }
        }

        if duties.iter().any(|d| d.is_nan()) {
            warn!("NaN in duty computation, zeroing outputs");
            self.zero_outputs();
            return;
        }

        for (i, duty) in duties.iter().enumerate() {
            // A failed write is logged and skipped; the committed duty still
            // advances so the loop stays in sync with its own command
            // history rather than blocking on a flaky driver.
            if let Err(e) = self.motors[i].set_duty(*duty) {
                error!(wheel = i, ?e, "duty write failed");
            }
            self.duty_controllers[i].set_last_duty(*duty);
        }

        trace!(
            vx = twist.vx,
            vy = twist.vy,
            omega = twist.omega,
            front = duties[0],
            rear_left = duties[1],
            rear_right = duties[2],
            "control tick"
        );
    }

    /// Per-wheel target rates for `twist`, rescaled so no wheel exceeds the
    /// speed ceiling. One shared factor preserves the motion direction;
    /// clamping wheels individually would rotate it.
    fn target_wheel_speeds(&self, twist: &Twist) -> [f64; DRIVE_WHEELS] {
        let mut speeds = [0.0; DRIVE_WHEELS];
        for (i, vector) in self.wheel_vectors.iter().enumerate() {
            speeds[i] = wheel_speed(vector, twist);
        }

        let peak = speeds.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        if peak > self.max_wheel_speed {
            let ratio = self.max_wheel_speed / peak;
            for speed in &mut speeds {
                *speed *= ratio;
            }
        }

        speeds
    }

    /// Zero every motor output and all integrator state. Used for NaN
    /// recovery and on shutdown.
    pub fn zero_outputs(&mut self) {
        self.pose_pid.reset();
        for (i, ctrl) in self.duty_controllers.iter_mut().enumerate() {
            ctrl.reset();
            if let Err(e) = self.motors[i].set_duty(0.0) {
                error!(wheel = i, ?e, "zero-duty write failed");
            }
        }
    }

    /// Last committed duties, for status reporting.
    pub fn duties(&self) -> WheelDuties {
        WheelDuties {
            front: self.duty_controllers[0].last_duty(),
            rear_left: self.duty_controllers[1].last_duty(),
            rear_right: self.duty_controllers[2].last_duty(),
        }
    }
}
