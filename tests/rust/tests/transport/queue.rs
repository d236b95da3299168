//! Outbound queueing while disconnected

use std::time::Duration;

use pretty_assertions::assert_eq;
use streammux_core::ClientConfig;
use tests::async_helpers::{wait_for, DEFAULT_TIMEOUT};
use tests::backend::{expect_silence, next_frame, next_type};
use tests::fixtures::test_config;
use tests::{Command, TestBackend};

#[tokio::test]
async fn test_commands_sent_before_connect_arrive_in_order() {
    let mut backend = TestBackend::start();
    let router = backend.router();
    backend.listener().refuse_next(1);

    router.send(&Command::new("NewRelicRequest", "available"));
    router.send(&Command::new("NewRelicRequest", "isSupportedJavaVersion"));
    router.send(&Command::new("NewRelicRequest", "isProjectEnabled"));

    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "available");
    assert_eq!(next_type(&mut peer).await, "isSupportedJavaVersion");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");

    backend.shutdown().await;
}

#[tokio::test]
async fn test_commands_sent_between_connections_are_flushed_on_reopen() {
    let mut backend = TestBackend::start();
    let router = backend.router();

    let peer = backend.accept().await;
    backend.listener().refuse_next(3);
    peer.close();
    assert!(wait_for(DEFAULT_TIMEOUT, || !router.is_connected()).await);

    router.send(
        &Command::new("AppDynamicsRequest", "generateFiles").with("location", "/work/project"),
    );
    router.send(&Command::new("AppDynamicsRequest", "isProjectEnabled"));

    let mut peer = backend.accept().await;
    let first = next_frame(&mut peer).await;
    assert_eq!(first["request"], "AppDynamicsRequest");
    assert_eq!(first["type"], "generateFiles");
    assert_eq!(first["location"], "/work/project");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");
    expect_silence(&mut peer, Duration::from_millis(30)).await;

    backend.shutdown().await;
}

#[tokio::test]
async fn test_full_queue_drops_oldest_frames() {
    let config = ClientConfig {
        outbound_queue_capacity: 2,
        ..test_config()
    };
    let mut backend = TestBackend::with_config(config);
    let router = backend.router();
    backend.listener().refuse_next(1);

    for command_type in ["first", "second", "third", "fourth"] {
        router.send(&Command::new("NewRelicRequest", command_type));
    }

    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "third");
    assert_eq!(next_type(&mut peer).await, "fourth");
    expect_silence(&mut peer, Duration::from_millis(30)).await;

    backend.shutdown().await;
}
