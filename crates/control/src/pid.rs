//! Generic discrete PID core.
//!
//! One implementation serves both loop layers: the per-wheel rate loops run
//! it over `f64`, the pose loop over [`Pose`] componentwise. No dynamic
//! dispatch; the operand is a type parameter.

use std::ops::{Add, Mul, Sub};
use types::{PidGain, Pose};

/// Operand of the PID core: componentwise addition plus scaling by f64.
pub trait PidOperand:
    Copy + Default + Add<Output = Self> + Sub<Output = Self> + Mul<f64, Output = Self>
{
}

impl<T> PidOperand for T where
    T: Copy + Default + Add<Output = T> + Sub<Output = T> + Mul<f64, Output = T>
{
}

/// Discrete PID at a fixed, declared control rate.
///
/// The integral term is scaled by 1/f and the derivative term by f, so kp,
/// ki and kd keep their meaning when the loop rate changes. There is no
/// internal anti-windup clamp: the enclosing controller handles saturation
/// by rescaling its outputs.
#[derive(Debug, Clone)]
pub struct Pid<T: PidOperand> {
    gain: PidGain,
    integral: T,
    prev_error: T,
}

impl<T: PidOperand> Pid<T> {
    pub fn new(gain: PidGain) -> Self {
        Self {
            gain,
            integral: T::default(),
            prev_error: T::default(),
        }
    }

    /// One control step: actuation for `error`.
    ///
    /// u = kp·e + (ki/f)·I + kd·f·(e − e_prev), with the accumulator and the
    /// error memory updated afterwards.
    pub fn calculate(&mut self, error: T) -> T {
        let f = self.gain.frequency;
        let output = error * self.gain.kp
            + self.integral * (self.gain.ki / f)
            + (error - self.prev_error) * (self.gain.kd * f);

        self.prev_error = error;
        self.integral = self.integral + error;

        output
    }

    /// Clears the integral accumulator.
    ///
    /// The previous-error memory is kept: the first step after a reset sees
    /// the derivative of the error against the last pre-reset value.
    pub fn reset(&mut self) {
        self.integral = T::default();
    }

    pub fn gain(&self) -> PidGain {
        self.gain
    }

    /// Declared control rate in Hz.
    pub fn frequency(&self) -> f64 {
        self.gain.frequency
    }
}

/// The pose loop runs the same core componentwise over (x, y, theta).
pub type PosePid = Pid<Pose>;
