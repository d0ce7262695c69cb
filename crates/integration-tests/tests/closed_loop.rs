//! Full-pipeline convergence: PoseController against the simulated chassis.

use approx::assert_abs_diff_eq;
use controller::{PoseController, PoseControllerConfig};
use integration_tests::{odometry_for, sim_chassis, wheel_controller_for};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use types::{PidGain, Pose};

const CONTROL_HZ: f64 = 50.0;
const SIM_DT: f64 = 0.005;

/// Spawn the simulation world ticking at 200 Hz on the paused test clock.
fn spawn_world(chassis: Arc<Mutex<sim::SimChassis>>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs_f64(SIM_DT));
        loop {
            interval.tick().await;
            // Fixed nominal dt keeps the physics deterministic under the
            // paused clock.
            chassis.lock().unwrap().tick(SIM_DT);
        }
    })
}

fn start_controller(chassis: &sim::SimChassis, pose_kp: f64) -> PoseController {
    let wheel_controller = wheel_controller_for(
        chassis,
        PidGain::new(pose_kp, 0.0, 0.0, CONTROL_HZ),
        PidGain::new(0.7, 0.0, 0.0, CONTROL_HZ),
    );
    let odometry = odometry_for(chassis);
    PoseController::start(
        Box::new(odometry),
        wheel_controller,
        PoseControllerConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn test_converges_to_translation_target() {
    let chassis = Arc::new(Mutex::new(sim_chassis()));
    let controller = start_controller(&chassis.lock().unwrap(), 1.0);
    let world = spawn_world(Arc::clone(&chassis));

    let target = Pose::new(1.0, 0.5, 0.0);
    controller.set_target(target);

    tokio::time::sleep(Duration::from_secs(20)).await;

    let pose = controller.pose();
    assert_abs_diff_eq!(pose.x, target.x, epsilon = 0.02);
    assert_abs_diff_eq!(pose.y, target.y, epsilon = 0.02);
    assert_abs_diff_eq!(pose.theta, target.theta, epsilon = 0.02);

    // The estimate agrees with the simulated ground truth
    let truth = chassis.lock().unwrap().true_pose();
    assert_abs_diff_eq!(pose.x, truth.x, epsilon = 0.02);
    assert_abs_diff_eq!(pose.y, truth.y, epsilon = 0.02);

    world.abort();
    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_converges_to_combined_target() {
    let chassis = Arc::new(Mutex::new(sim_chassis()));
    let controller = start_controller(&chassis.lock().unwrap(), 1.0);
    let world = spawn_world(Arc::clone(&chassis));

    // Translate and rotate at once; the holonomic chassis does both
    let target = Pose::new(-0.5, 0.8, 1.2);
    controller.set_target(target);

    tokio::time::sleep(Duration::from_secs(25)).await;

    let pose = controller.pose();
    assert_abs_diff_eq!(pose.x, target.x, epsilon = 0.03);
    assert_abs_diff_eq!(pose.y, target.y, epsilon = 0.03);
    assert_abs_diff_eq!(pose.theta, target.theta, epsilon = 0.03);

    world.abort();
    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_retarget_mid_motion() {
    let chassis = Arc::new(Mutex::new(sim_chassis()));
    let controller = start_controller(&chassis.lock().unwrap(), 1.0);
    let world = spawn_world(Arc::clone(&chassis));

    controller.set_target(Pose::new(2.0, 0.0, 0.0));
    tokio::time::sleep(Duration::from_secs(2)).await;

    // Overwrite the target mid-flight; the controller follows greedily
    let target = Pose::new(0.2, -0.3, 0.0);
    controller.set_target(target);
    tokio::time::sleep(Duration::from_secs(20)).await;

    let pose = controller.pose();
    assert_abs_diff_eq!(pose.x, target.x, epsilon = 0.03);
    assert_abs_diff_eq!(pose.y, target.y, epsilon = 0.03);

    world.abort();
    controller.stop();
}

#[tokio::test(start_paused = true)]
async fn test_holds_position_once_settled() {
    let chassis = Arc::new(Mutex::new(sim_chassis()));
    let controller = start_controller(&chassis.lock().unwrap(), 1.0);
    let world = spawn_world(Arc::clone(&chassis));

    let target = Pose::new(0.4, 0.0, 0.0);
    controller.set_target(target);
    tokio::time::sleep(Duration::from_secs(15)).await;
    let settled = controller.pose();

    tokio::time::sleep(Duration::from_secs(5)).await;
    let later = controller.pose();

    assert_abs_diff_eq!(settled.x, later.x, epsilon = 5e-3);
    assert_abs_diff_eq!(settled.y, later.y, epsilon = 5e-3);
    assert_abs_diff_eq!(settled.theta, later.theta, epsilon = 5e-3);

    world.abort();
    controller.stop();
}
