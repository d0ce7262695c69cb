//! Shared types and chassis geometry for the omni platform.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::ops::{Add, Mul, Sub};

/// 2D pose in the field frame (meters, radians).
///
/// `theta` is not wrapped: continuous rotation accumulates past ±π so that
/// multi-turn motion stays observable. Use [`wrap_angle`] at the point where
/// a bounded angle is actually wanted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// X position in meters
    pub x: f64,
    /// Y position in meters
    pub y: f64,
    /// Heading in radians (positive = counter-clockwise)
    pub theta: f64,
}

impl Pose {
    pub const fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.theta]
    }

    pub fn from_array(arr: [f64; 3]) -> Self {
        Self {
            x: arr[0],
            y: arr[1],
            theta: arr[2],
        }
    }

    /// True if any component is NaN.
    pub fn is_nan(&self) -> bool {
        self.x.is_nan() || self.y.is_nan() || self.theta.is_nan()
    }
}

impl Add for Pose {
    type Output = Pose;
    fn add(self, rhs: Pose) -> Pose {
        Pose::new(self.x + rhs.x, self.y + rhs.y, self.theta + rhs.theta)
    }
}

impl Sub for Pose {
    type Output = Pose;
    fn sub(self, rhs: Pose) -> Pose {
        Pose::new(self.x - rhs.x, self.y - rhs.y, self.theta - rhs.theta)
    }
}

impl Mul<f64> for Pose {
    type Output = Pose;
    fn mul(self, rhs: f64) -> Pose {
        Pose::new(self.x * rhs, self.y * rhs, self.theta * rhs)
    }
}

/// Body-frame velocity command: linear (m/s) and angular (rad/s).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Twist {
    /// Linear velocity along body X in m/s
    pub vx: f64,
    /// Linear velocity along body Y in m/s
    pub vy: f64,
    /// Angular velocity in rad/s (positive = counter-clockwise)
    pub omega: f64,
}

impl Twist {
    pub const fn new(vx: f64, vy: f64, omega: f64) -> Self {
        Self { vx, vy, omega }
    }
}

/// Placement of one wheel on the chassis.
///
/// The heading is the roll direction: the direction in which positive wheel
/// rotation drives the contact point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelPose {
    /// Contact point X in the body frame (meters)
    pub x: f64,
    /// Contact point Y in the body frame (meters)
    pub y: f64,
    /// Roll direction in radians
    pub heading: f64,
    /// Wheel radius in meters
    pub radius: f64,
}

impl WheelPose {
    pub const fn new(x: f64, y: f64, heading: f64, radius: f64) -> Self {
        Self {
            x,
            y,
            heading,
            radius,
        }
    }
}

/// Discrete PID gains with the control rate they were tuned at.
///
/// The frequency scales the integral and derivative terms so the gains keep
/// their meaning when the loop rate changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGain {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Control rate in Hz
    pub frequency: f64,
}

impl PidGain {
    pub const fn new(kp: f64, ki: f64, kd: f64, frequency: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            frequency,
        }
    }
}

/// Duty ratios commanded to the three drive motors, each in [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WheelDuties {
    pub front: f64,
    pub rear_left: f64,
    pub rear_right: f64,
}

impl WheelDuties {
    pub fn as_array(&self) -> [f64; 3] {
        [self.front, self.rear_left, self.rear_right]
    }

    pub fn from_array(arr: [f64; 3]) -> Self {
        Self {
            front: arr[0],
            rear_left: arr[1],
            rear_right: arr[2],
        }
    }
}

/// Wrap an angle into (-π, π].
pub fn wrap_angle(angle: f64) -> f64 {
    let mut a = angle;
    while a > PI {
        a -= 2.0 * PI;
    }
    while a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Default chassis geometry: three tangential drive omnis at 120° spacing
/// plus two free-rolling measuring wheels on the body axes.
pub mod layout {
    use super::WheelPose;
    use std::f64::consts::PI;

    /// Distance from the chassis center to each drive wheel contact (meters).
    pub const TREAD_RADIUS: f64 = 0.210;
    /// Drive and measuring wheel radius (meters).
    pub const WHEEL_RADIUS: f64 = 0.030;

    const SQRT3_HALF: f64 = 0.866_025_403_784_438_6;

    /// Front wheel: on the +Y axis, rolling along +X.
    pub const fn front() -> WheelPose {
        WheelPose::new(0.0, TREAD_RADIUS, 0.0, WHEEL_RADIUS)
    }

    /// Rear-left wheel: 120° around from the front, roll direction rotated
    /// to stay tangential.
    pub const fn rear_left() -> WheelPose {
        WheelPose::new(
            -SQRT3_HALF * TREAD_RADIUS,
            -TREAD_RADIUS / 2.0,
            2.0 * PI / 3.0,
            WHEEL_RADIUS,
        )
    }

    /// Rear-right wheel: 240° around from the front.
    pub const fn rear_right() -> WheelPose {
        WheelPose::new(
            SQRT3_HALF * TREAD_RADIUS,
            -TREAD_RADIUS / 2.0,
            4.0 * PI / 3.0,
            WHEEL_RADIUS,
        )
    }

    /// Free-rolling measuring wheel on the body X axis.
    pub const fn measuring_x() -> WheelPose {
        WheelPose::new(0.0, 0.0, 0.0, WHEEL_RADIUS)
    }

    /// Free-rolling measuring wheel on the body Y axis.
    pub const fn measuring_y() -> WheelPose {
        WheelPose::new(0.0, 0.0, PI / 2.0, WHEEL_RADIUS)
    }

    /// The three drive wheels in controller order (front, rear-left,
    /// rear-right).
    pub fn drive_wheels() -> [WheelPose; 3] {
        drive_wheels_with(TREAD_RADIUS, WHEEL_RADIUS)
    }

    /// All five encoder-bearing wheels in odometry order: the drive wheels
    /// followed by the two measuring wheels.
    pub fn measuring_wheels() -> [WheelPose; 5] {
        measuring_wheels_with(TREAD_RADIUS, WHEEL_RADIUS)
    }

    /// Drive wheel set for a non-default chassis size: same 120° tangential
    /// arrangement, scaled to the given tread and wheel radii.
    pub fn drive_wheels_with(tread_radius: f64, wheel_radius: f64) -> [WheelPose; 3] {
        [
            WheelPose::new(0.0, tread_radius, 0.0, wheel_radius),
            WheelPose::new(
                -SQRT3_HALF * tread_radius,
                -tread_radius / 2.0,
                2.0 * PI / 3.0,
                wheel_radius,
            ),
            WheelPose::new(
                SQRT3_HALF * tread_radius,
                -tread_radius / 2.0,
                4.0 * PI / 3.0,
                wheel_radius,
            ),
        ]
    }

    /// Measuring wheel set for a non-default chassis size.
    pub fn measuring_wheels_with(tread_radius: f64, wheel_radius: f64) -> [WheelPose; 5] {
        let [front, rear_left, rear_right] = drive_wheels_with(tread_radius, wheel_radius);
        [
            front,
            rear_left,
            rear_right,
            WheelPose::new(0.0, 0.0, 0.0, wheel_radius),
            WheelPose::new(0.0, 0.0, PI / 2.0, wheel_radius),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_sub_is_componentwise() {
        let a = Pose::new(3.0, -1.0, 0.5);
        let b = Pose::new(1.0, 1.0, 2.0);
        let d = a - b;
        assert_eq!(d, Pose::new(2.0, -2.0, -1.5));
    }

    #[test]
    fn test_theta_not_wrapped_by_ops() {
        let a = Pose::new(0.0, 0.0, 3.0 * PI);
        let b = Pose::new(0.0, 0.0, -3.0 * PI);
        assert_eq!((a - b).theta, 6.0 * PI);
    }

    #[test]
    fn test_wrap_angle_range() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(-3.0 * PI) - PI).abs() < 1e-12);
        assert!((wrap_angle(0.5) - 0.5).abs() < 1e-12);
        // 270° of error wraps to -90°
        assert!((wrap_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_default_layout_is_tangential() {
        // Roll directions of the drive wheels are perpendicular to their
        // radius vectors, so the chassis can spin in place.
        for wheel in layout::drive_wheels() {
            let radial = (wheel.x.powi(2) + wheel.y.powi(2)).sqrt();
            assert!((radial - layout::TREAD_RADIUS).abs() < 1e-12);
            let dot = wheel.x * wheel.heading.cos() + wheel.y * wheel.heading.sin();
            assert!(dot.abs() < 1e-9, "roll direction not tangential: {dot}");
        }
    }
}
