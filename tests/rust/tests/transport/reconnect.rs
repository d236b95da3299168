//! Reconnect and connection state

use std::time::Duration;

use pretty_assertions::assert_eq;
use streammux_core::ConnectionState;
use streammux_monitoring::AppDynamicsController;
use tests::async_helpers::{wait_for, DEFAULT_TIMEOUT};
use tests::backend::{expect_silence, next_type};
use tests::fixtures::memory_settings;
use tests::{Filter, Recorder, TestBackend};

#[tokio::test]
async fn test_refused_connects_are_retried() {
    let mut backend = TestBackend::start();
    backend.listener().refuse_next(2);

    let _peer = backend.accept().await;

    assert_eq!(backend.listener().attempts(), 3);
    assert!(wait_for(DEFAULT_TIMEOUT, || backend.router().is_connected()).await);
    backend.shutdown().await;
}

#[tokio::test]
async fn test_connection_state_follows_link() {
    let mut backend = TestBackend::start();
    let router = backend.router();
    let mut states = router.watch_connection();

    let peer = backend.accept().await;
    assert!(wait_for(DEFAULT_TIMEOUT, || router.connection_state() == ConnectionState::Connected).await);
    let _ = states.borrow_and_update();

    backend.listener().refuse_next(u32::MAX);
    peer.fail("reset by peer");
    tokio::time::timeout(DEFAULT_TIMEOUT, states.changed())
        .await
        .unwrap()
        .unwrap();
    assert!(!router.is_connected());
    assert_eq!(router.connection_state(), ConnectionState::Reconnecting);

    backend.shutdown().await;
    assert_eq!(router.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reopen_is_dispatched_to_opted_in_subscribers() {
    let mut backend = TestBackend::start();
    let router = backend.router();
    let reopened = Recorder::new();
    let everything = Recorder::new();
    router.subscribe(Filter::stream_reopened(), reopened.handler());
    router.subscribe(Filter::any(), everything.handler());

    let peer = backend.accept().await;
    // The first open is not a reopen
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(reopened.is_empty());

    peer.close();
    let _peer = backend.accept().await;

    assert!(wait_for(DEFAULT_TIMEOUT, || reopened.len() == 1).await);
    assert!(everything.is_empty());
    backend.shutdown().await;
}

#[tokio::test]
async fn test_controller_requeries_once_per_reopen() {
    let mut backend = TestBackend::start();
    let settings = memory_settings();
    let controller = AppDynamicsController::new(backend.router(), &settings, None)
        .await
        .unwrap();
    controller.start();

    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "isAvailable");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");
    expect_silence(&mut peer, Duration::from_millis(50)).await;

    for _ in 0..2 {
        peer.close();
        peer = backend.accept().await;
        assert_eq!(next_type(&mut peer).await, "isAvailable");
        assert_eq!(next_type(&mut peer).await, "isProjectEnabled");
        expect_silence(&mut peer, Duration::from_millis(50)).await;
    }

    backend.shutdown().await;
}
