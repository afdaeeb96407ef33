mod common;

use common::{Distortion, FakeSimulator};
use morse_teleport::{
    pose::{Pose, PoseField},
    services::{ServiceClient, ServiceError},
    stream::{PoseStream, StreamError},
    testing::{
        scenario::{ScenarioConfig, ScenarioError, TeleportScenario, INITIAL_POSE},
        teleport::TeleportController,
    },
};
use std::{
    net::{IpAddr, Ipv4Addr},
    time::Duration,
};

fn config_for(sim: &FakeSimulator) -> ScenarioConfig {
    ScenarioConfig {
        host: Ipv4Addr::LOCALHOST.into(),
        service_port: sim.service_port,
        settle_delay: Duration::from_millis(100),
        read_timeout: Some(Duration::from_secs(2)),
        rounds: 2,
        rng_seed: Some(1234),
        ..Default::default()
    }
}

#[tokio::test]
async fn teleports_are_reflected_by_the_pose_stream() {
    let sim = FakeSimulator::start(INITIAL_POSE, Distortion::default()).await;
    let mut scenario = TeleportScenario::new(config_for(&sim));

    let report = scenario.run().await.expect("scenario should pass");

    assert_eq!(report.checks.len(), 1 + 2 * 3);
    assert_eq!(report.checks[0].expected, INITIAL_POSE);
    let last = report.checks.last().expect("at least one check");
    assert_eq!(sim.current_pose(), last.expected);
}

#[tokio::test]
async fn offset_teleport_is_reported_on_z() {
    let sim = FakeSimulator::start(INITIAL_POSE, Distortion { z_offset: 0.5 }).await;
    let mut scenario = TeleportScenario::new(config_for(&sim));

    match scenario.run().await {
        Err(ScenarioError::PoseMismatch {
            step, mismatches, ..
        }) => {
            assert_eq!(step, 1);
            let fields: Vec<_> = mismatches.iter().map(|m| m.field).collect();
            assert_eq!(fields, vec![PoseField::Z]);
            assert!((mismatches[0].delta - 0.5).abs() < 1e-9);
        }
        other => panic!("expected a z mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn wrong_starting_pose_fails_before_teleporting() {
    let start = Pose::new(0., 0., 0.5, 0., 0., 0.);
    let sim = FakeSimulator::start(start, Distortion::default()).await;
    let mut scenario = TeleportScenario::new(config_for(&sim));

    match scenario.run().await {
        Err(e @ ScenarioError::PoseMismatch { step: 0, .. }) => {
            let message = e.to_string();
            assert!(message.contains("step 0"), "{}", message);
            assert!(message.contains("x: expected 10.0000"), "{}", message);
        }
        other => panic!("expected an initial pose mismatch, got {:?}", other),
    }
    assert_eq!(sim.current_pose(), start);
}

#[tokio::test]
async fn unknown_stream_fails_the_port_lookup() {
    let sim = FakeSimulator::start(INITIAL_POSE, Distortion::default()).await;
    let mut scenario = TeleportScenario::new(ScenarioConfig {
        pose_stream: "Odometry".to_owned(),
        ..config_for(&sim)
    });

    assert!(matches!(
        scenario.run().await,
        Err(ScenarioError::StreamError(StreamError::PortLookupError(
            ServiceError::Failed { .. }
        )))
    ));
}

#[tokio::test]
async fn services_resolve_stream_ports() {
    let sim = FakeSimulator::start(INITIAL_POSE, Distortion::default()).await;
    let mut services = ServiceClient::connect(Ipv4Addr::LOCALHOST, sim.service_port)
        .await
        .expect("couldn't reach fake services");

    assert_eq!(
        services.get_stream_port("Pose").await.expect("known stream"),
        sim.pose_port
    );
    assert_eq!(
        services
            .get_stream_port("Motion_Controller")
            .await
            .expect("known stream"),
        sim.teleport_port
    );
    assert_eq!(
        services.list_streams().await.expect("stream list"),
        vec!["Pose".to_owned(), "Motion_Controller".to_owned()]
    );
    assert!(matches!(
        services.call("robot", "dance", &[]).await,
        Err(ServiceError::Failed { .. })
    ));
    services
        .reset_objects()
        .await
        .expect("reset should succeed");
    services.quit().await.expect("quit tolerates a closed socket");
}

#[tokio::test]
async fn controller_and_stream_work_without_the_scenario() {
    let sim = FakeSimulator::start(INITIAL_POSE, Distortion::default()).await;
    let host: IpAddr = Ipv4Addr::LOCALHOST.into();
    let mut services = ServiceClient::connect(host, sim.service_port)
        .await
        .expect("couldn't reach fake services");
    let mut pose_stream = PoseStream::open(&mut services, host, "Pose")
        .await
        .expect("couldn't subscribe");
    let mut teleport = TeleportController::open(&mut services, host, "Motion_Controller")
        .await
        .expect("couldn't connect to the actuator");

    let first = pose_stream
        .get_timeout(Duration::from_secs(2))
        .await
        .expect("initial sample");
    assert!(first.approx_eq(&INITIAL_POSE, 1e-9));

    teleport
        .tp(-3., 4., 12., 0., 0., 1.)
        .await
        .expect("teleport should be sent");
    tokio::time::sleep(Duration::from_millis(100)).await;
    let moved = pose_stream
        .get_timeout(Duration::from_secs(2))
        .await
        .expect("sample after teleport");
    assert!(moved.approx_eq(&Pose::new(-3., 4., 12., 0., 0., 1.), 1e-9));
}
