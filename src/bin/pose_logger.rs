use morse_teleport::{
    services::ServiceClient, stream::PoseStream, testing::scenario::ScenarioConfig,
};

#[tokio::main]
async fn main() {
    morse_teleport::init_logging();

    let config = ScenarioConfig::from_env();
    let mut services = ServiceClient::connect(config.host, config.service_port)
        .await
        .expect("couldn't connect to the simulator services");
    let mut pose_stream = PoseStream::open(&mut services, config.host, &config.pose_stream)
        .await
        .expect("couldn't subscribe to the pose stream");
    while !pose_stream.is_closed() {
        match pose_stream.get().await {
            Ok(pose) => {
                dbg!(pose);
            }
            Err(e) => {
                eprintln!("stream {} stopped: {:?}", pose_stream.name(), e);
                break;
            }
        }
    }
}
