//! Cross-crate scenario tests for the omni motion core.
//!
//! The tests live in `tests/`; this library only carries the shared rig
//! builders.

use control::{MotorWheel, WheelController};
use hal::{DcMotor, Encoder};
use localization::{MeasuringWheel, WheelOdometry};
use sim::{SimChassis, SimEncoder};
use types::{PidGain, layout};

/// Standard five-encoder chassis at 2048 counts per rotation, 10 rps rail.
pub fn sim_chassis() -> SimChassis {
    SimChassis::new(
        layout::drive_wheels(),
        layout::measuring_wheels().to_vec(),
        2048,
        10.0,
    )
    .expect("default geometry is non-degenerate")
}

/// Wheel odometry over all of the chassis' encoders.
pub fn odometry_for(chassis: &SimChassis) -> WheelOdometry {
    let wheels = layout::measuring_wheels()
        .iter()
        .enumerate()
        .map(|(i, wheel)| MeasuringWheel {
            wheel: *wheel,
            encoder: Box::new(chassis.encoder(i)) as Box<dyn Encoder>,
        })
        .collect();
    WheelOdometry::new(wheels).expect("default geometry is non-degenerate")
}

/// Wheel controller wired to the chassis' drive motors and encoders.
pub fn wheel_controller_for(
    chassis: &SimChassis,
    pose_gain: PidGain,
    motor_gain: PidGain,
) -> WheelController {
    let drive = layout::drive_wheels();
    let motor_wheels = [0, 1, 2].map(|i| MotorWheel {
        wheel: drive[i],
        encoder: Box::new(chassis.encoder(i)) as Box<dyn Encoder>,
        motor: Box::new(chassis.motor(i)) as Box<dyn DcMotor>,
        gain: motor_gain,
    });
    WheelController::new(motor_wheels, pose_gain, 10.0, 1.0)
        .expect("default geometry is non-degenerate")
}

/// Odometry fed by direct encoder handles (no physics), for analytic tests.
pub fn analytic_rig() -> (Vec<SimEncoder>, WheelOdometry) {
    let encoders: Vec<SimEncoder> = (0..5).map(|_| SimEncoder::new(2048, false)).collect();
    let wheels = layout::measuring_wheels()
        .iter()
        .zip(&encoders)
        .map(|(wheel, encoder)| MeasuringWheel {
            wheel: *wheel,
            encoder: Box::new(encoder.clone()) as Box<dyn Encoder>,
        })
        .collect();
    let odometry = WheelOdometry::new(wheels).expect("default geometry is non-degenerate");
    (encoders, odometry)
}
