//! Simulated DC motor.

use hal::{DcMotor, MotorError};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

struct Inner {
    duty: Mutex<f64>,
    fail_writes: AtomicBool,
}

/// Motor that just remembers the commanded duty.
///
/// Handles are cheap clones sharing one state, so the physics can read what
/// the controller commanded. `set_fail_writes` injects transport failures
/// for exercising the controller's skip-and-continue path.
#[derive(Clone)]
pub struct SimMotor {
    inner: Arc<Inner>,
}

impl SimMotor {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                duty: Mutex::new(0.0),
                fail_writes: AtomicBool::new(false),
            }),
        }
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl Default for SimMotor {
    fn default() -> Self {
        Self::new()
    }
}

impl DcMotor for SimMotor {
    fn set_duty(&mut self, duty: f64) -> Result<(), MotorError> {
        if self.inner.fail_writes.load(Ordering::Relaxed) {
            return Err(MotorError::Write("injected sim failure".into()));
        }
        *self.inner.duty.lock().unwrap() = duty.clamp(-1.0, 1.0);
        Ok(())
    }

    fn duty(&self) -> f64 {
        *self.inner.duty.lock().unwrap()
    }
}
