//! omnid — motion-control daemon for the three-omni chassis.

use anyhow::{Context, Result, bail};
use clap::Parser;
use control::{MotorWheel, WheelController};
use controller::{PoseController, PoseControllerConfig};
use localization::{MeasuringWheel, WheelOdometry};
use serde::Deserialize;
use sim::SimChassis;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};
use types::{PidGain, Pose, layout};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    chassis: ChassisFileConfig,
    control: ControlFileConfig,
    odometry: OdometryFileConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ChassisFileConfig {
    /// Distance from chassis center to the drive wheel contacts (m)
    tread_radius: f64,
    /// Wheel radius (m)
    wheel_radius: f64,
    /// Encoder counts per wheel rotation
    encoder_resolution: i64,
    /// Simulated wheel rate at full duty (rotations/s)
    max_rps: f64,
}

impl Default for ChassisFileConfig {
    fn default() -> Self {
        Self {
            tread_radius: layout::TREAD_RADIUS,
            wheel_radius: layout::WHEEL_RADIUS,
            encoder_resolution: 2048,
            max_rps: 10.0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ControlFileConfig {
    motor_kp: f64,
    motor_ki: f64,
    motor_kd: f64,
    pose_kp: f64,
    pose_ki: f64,
    pose_kd: f64,
    /// Control loop rate (Hz)
    frequency: f64,
    /// Per-wheel speed ceiling (rotations/s)
    max_wheel_speed: f64,
    /// Duty magnitude ceiling
    max_duty: f64,
    /// Wrap the heading error into (-π, π]
    wrap_heading_error: bool,
}

impl Default for ControlFileConfig {
    fn default() -> Self {
        Self {
            motor_kp: 0.7,
            motor_ki: 0.0,
            motor_kd: 0.0,
            pose_kp: 0.1,
            pose_ki: 0.0,
            pose_kd: 0.0,
            frequency: 50.0,
            max_wheel_speed: 10.0,
            max_duty: 1.0,
            wrap_heading_error: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OdometryFileConfig {
    /// Odometry integration period (ms)
    period_ms: u64,
}

impl Default for OdometryFileConfig {
    fn default() -> Self {
        Self { period_ms: 5 }
    }
}

impl FileConfig {
    fn load(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: FileConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            Ok(FileConfig::default())
        }
    }
}

#[derive(Parser)]
#[command(name = "omnid", about = "Omni chassis motion daemon")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/omni.toml")]
    config: PathBuf,

    /// Run against the simulated chassis (no hardware)
    #[arg(long)]
    sim: bool,

    /// Startup target pose as "x,y,theta" (meters, meters, radians)
    #[arg(long, default_value = "10,0,0")]
    target: String,
}

fn parse_target(value: &str) -> Result<Pose> {
    let parts: Vec<f64> = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .with_context(|| format!("bad target '{value}', expected x,y,theta"))?;
    if parts.len() != 3 {
        bail!("bad target '{value}', expected three components");
    }
    Ok(Pose::new(parts[0], parts[1], parts[2]))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("omnid=info".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    let config = FileConfig::load(&args.config)?;
    let target = parse_target(&args.target)?;

    if !args.sim {
        // Drive-level providers are wired in by the board bring-up build;
        // this binary only ships the simulation backend.
        bail!("no hardware backend available, run with --sim");
    }

    info!("Starting omnid in SIMULATION mode");

    let drive_wheels =
        layout::drive_wheels_with(config.chassis.tread_radius, config.chassis.wheel_radius);
    let measuring_wheels =
        layout::measuring_wheels_with(config.chassis.tread_radius, config.chassis.wheel_radius);

    let chassis = SimChassis::new(
        drive_wheels,
        measuring_wheels.to_vec(),
        config.chassis.encoder_resolution,
        config.chassis.max_rps,
    )?;

    let motor_gain = PidGain::new(
        config.control.motor_kp,
        config.control.motor_ki,
        config.control.motor_kd,
        config.control.frequency,
    );
    let pose_gain = PidGain::new(
        config.control.pose_kp,
        config.control.pose_ki,
        config.control.pose_kd,
        config.control.frequency,
    );

    let motor_wheels = [0, 1, 2].map(|i| MotorWheel {
        wheel: drive_wheels[i],
        encoder: Box::new(chassis.encoder(i)) as Box<dyn hal::Encoder>,
        motor: Box::new(chassis.motor(i)) as Box<dyn hal::DcMotor>,
        gain: motor_gain,
    });
    let wheel_controller = WheelController::new(
        motor_wheels,
        pose_gain,
        config.control.max_wheel_speed,
        config.control.max_duty,
    )?;

    let measuring = measuring_wheels
        .iter()
        .enumerate()
        .map(|(i, wheel)| MeasuringWheel {
            wheel: *wheel,
            encoder: Box::new(chassis.encoder(i)) as Box<dyn hal::Encoder>,
        })
        .collect();
    let odometry = WheelOdometry::new(measuring)?;

    // Keep encoder handles for the status printout
    let encoders: Vec<_> = (0..chassis.encoder_count())
        .map(|i| chassis.encoder(i))
        .collect();

    let controller = PoseController::start(
        Box::new(odometry),
        wheel_controller,
        PoseControllerConfig {
            odometry_period: Duration::from_millis(config.odometry.period_ms),
            wrap_heading_error: config.control.wrap_heading_error,
        },
    );
    controller.set_target(target);
    info!(
        x = target.x,
        y = target.y,
        theta = target.theta,
        "driving to target"
    );

    // Simulation world task: tick the chassis at the odometry rate
    let chassis = Arc::new(Mutex::new(chassis));
    let world = tokio::spawn({
        let chassis = Arc::clone(&chassis);
        let dt = config.odometry.period_ms as f64 / 1000.0;
        async move {
            let mut interval = tokio::time::interval(Duration::from_secs_f64(dt));
            loop {
                interval.tick().await;
                chassis.lock().unwrap().tick(dt);
            }
        }
    });

    // Status loop until ctrl-c
    let mut status_interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = status_interval.tick() => {
                let pose = controller.pose();
                let duties = controller.duties();
                let counts: Vec<i64> = encoders.iter().map(|e| hal::Encoder::count(e)).collect();
                info!(
                    x = pose.x,
                    y = pose.y,
                    theta = pose.theta,
                    front = duties.front,
                    rear_left = duties.rear_left,
                    rear_right = duties.rear_right,
                    counts = ?counts,
                    "status"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    world.abort();
    controller.stop();
    Ok(())
}
