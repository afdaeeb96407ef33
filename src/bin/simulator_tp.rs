use morse_teleport::{
    pose::Pose, services::ServiceClient, testing::scenario::ScenarioConfig,
    testing::teleport::TeleportController,
};

/// usage: simulator_tp <x> <y> <z> [<yaw> <pitch> <roll>]
#[tokio::main]
async fn main() {
    morse_teleport::init_logging();

    let values: Vec<f64> = std::env::args()
        .skip(1)
        .map(|arg| arg.parse().expect("pose values must be numbers"))
        .collect();
    let pose = match values[..] {
        [x, y, z] => Pose::new(x, y, z, 0., 0., 0.),
        [x, y, z, yaw, pitch, roll] => Pose::new(x, y, z, yaw, pitch, roll),
        _ => {
            eprintln!("usage: simulator_tp <x> <y> <z> [<yaw> <pitch> <roll>]");
            std::process::exit(2);
        }
    };

    let config = ScenarioConfig::from_env();
    let mut services = ServiceClient::connect(config.host, config.service_port)
        .await
        .expect("couldn't connect to the simulator services");
    let mut teleport = TeleportController::open(&mut services, config.host, &config.teleport_stream)
        .await
        .expect("couldn't connect to the teleport actuator");
    teleport
        .send_pose(&pose)
        .await
        .expect("couldn't tp robot in simulator");
}
