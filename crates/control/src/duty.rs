//! Per-wheel inner loop: rotation-rate error in, duty out.

use crate::ConfigError;
use crate::pid::Pid;
use hal::Encoder;
use types::PidGain;

/// Rate-incremental duty controller for one wheel.
///
/// The PID output is a duty delta per second; dividing by the control
/// frequency and accumulating onto the previous duty makes the loop hold, at
/// steady state, whatever duty keeps the wheel at its target rate.
///
/// Duty clamping is deliberately not done here: clamping a single wheel
/// would break the speed ratio between the wheels, so the enclosing
/// controller rescales the whole set instead.
pub struct DutyController {
    encoder: Box<dyn Encoder>,
    pid: Pid<f64>,
    target_rps: f64,
    current_rps: f64,
    last_rotation: f64,
    last_duty: f64,
}

impl DutyController {
    pub fn new(encoder: Box<dyn Encoder>, gain: PidGain) -> Result<Self, ConfigError> {
        if !(gain.frequency > 0.0) || !gain.frequency.is_finite() {
            return Err(ConfigError::InvalidFrequency(gain.frequency));
        }

        // Baseline the rotation reading so a wheel that moved before
        // construction does not produce a phantom rate spike.
        let last_rotation = encoder.rotations();

        Ok(Self {
            encoder,
            pid: Pid::new(gain),
            target_rps: 0.0,
            current_rps: 0.0,
            last_rotation,
            last_duty: 0.0,
        })
    }

    /// Backward-difference rate estimate at the declared control frequency.
    ///
    /// Called once per control tick, never against measured wall time: the
    /// declared rate is what the PID gains were tuned at.
    pub fn update_current_rps(&mut self) {
        let rotation = self.encoder.rotations();
        self.current_rps = (rotation - self.last_rotation) * self.pid.frequency();
        self.last_rotation = rotation;
    }

    /// Latest rate estimate in rotations/second.
    pub fn current_rps(&self) -> f64 {
        self.current_rps
    }

    /// Target rate in rotations/second.
    pub fn set_target_rps(&mut self, target_rps: f64) {
        self.target_rps = target_rps;
    }

    /// One inner-loop step: the next duty before controller-level rescaling.
    ///
    /// Does not store the result; the enclosing controller commits the
    /// post-rescale value through [`set_last_duty`](Self::set_last_duty).
    pub fn calculate_duty(&mut self) -> f64 {
        let output = self.pid.calculate(self.target_rps - self.current_rps);
        self.last_duty + output / self.pid.frequency()
    }

    /// Commit the duty actually commanded to the motor this tick.
    pub fn set_last_duty(&mut self, duty: f64) {
        self.last_duty = duty;
    }

    pub fn last_duty(&self) -> f64 {
        self.last_duty
    }

    /// Zero the integrated duty and the PID accumulator (fault recovery and
    /// shutdown path).
    pub fn reset(&mut self) {
        self.pid.reset();
        self.last_duty = 0.0;
        self.target_rps = 0.0;
    }
}
