//! Simulated quadrature encoder.

use hal::{Encoder, QuadratureDecoder};
use std::sync::{Arc, Mutex};

struct Inner {
    decoder: QuadratureDecoder,
    /// Sub-count remainder carried between fractional advances, so slow
    /// motion is not lost to quantization.
    residual: f64,
}

/// Encoder whose count is advanced by the physics instead of by edges.
///
/// Counts pass through the same [`QuadratureDecoder`] core a hardware edge
/// handler would feed. Handles are cheap clones sharing one counter, which
/// mirrors an encoder being read by both the odometry and the control task.
#[derive(Clone)]
pub struct SimEncoder {
    inner: Arc<Mutex<Inner>>,
    resolution: i64,
}

impl SimEncoder {
    /// `resolution` is the native counts per rotation; `dual` doubles it the
    /// way dual-edge decoding does.
    pub fn new(resolution: i64, dual: bool) -> Self {
        let decoder = QuadratureDecoder::new(resolution, true, dual);
        let resolution = decoder.resolution();
        Self {
            inner: Arc::new(Mutex::new(Inner {
                decoder,
                residual: 0.0,
            })),
            resolution,
        }
    }

    /// Advance the wheel by a (possibly fractional) number of rotations.
    pub fn add_rotations(&self, rotations: f64) {
        let mut inner = self.inner.lock().unwrap();
        let counts = rotations * self.resolution as f64 + inner.residual;
        let whole = counts.trunc();
        inner.residual = counts - whole;
        inner.decoder.add_count(whole as i64);
    }
}

impl Encoder for SimEncoder {
    fn count(&self) -> i64 {
        self.inner.lock().unwrap().decoder.count()
    }

    fn resolution(&self) -> i64 {
        self.resolution
    }
}
