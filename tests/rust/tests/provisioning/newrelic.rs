//! New Relic provisioning flows

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use streammux_monitoring::{NewRelicController, Progress, ProvisioningError, ProvisioningState};
use tests::async_helpers::{wait_for, DEFAULT_TIMEOUT};
use tests::backend::{next_frame, next_type};
use tests::fixtures::{memory_settings, valid_license_key};
use tests::frames;
use tests::{MemoryPeer, TestBackend};

async fn started(backend: &mut TestBackend) -> (NewRelicController, MemoryPeer) {
    let controller = NewRelicController::new(backend.router(), &memory_settings(), None)
        .await
        .unwrap();
    controller.start();

    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "available");
    assert_eq!(next_type(&mut peer).await, "isSupportedJavaVersion");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");
    (controller, peer)
}

#[tokio::test]
async fn test_unavailable_agent_is_provisioned_after_key_is_saved() {
    let mut backend = TestBackend::start();
    let (controller, mut peer) = started(&mut backend).await;
    assert_eq!(controller.state(), ProvisioningState::CheckingAvailability);

    peer.send_json(&frames::legacy_newrelic("availableResponse", false));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::AwaitingConfig).await);
    assert!(!controller.view().config_saved);

    controller.set_license_key(&valid_license_key()).await.unwrap();
    assert_eq!(controller.state(), ProvisioningState::Validating);
    assert!(controller.license_key_saved());

    controller.provision().unwrap();
    let frame = next_frame(&mut peer).await;
    assert_eq!(frame, json!({ "request": "NewRelicRequest", "type": "provision" }));

    peer.send_json(&frames::progress_percent(40.0));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::ReceivingProgress).await);
    let view = controller.view();
    assert_eq!(view.progress, Some(Progress::Percent(40.0)));
    assert_eq!(view.progress_description.as_deref(), Some("40%"));

    peer.send_json(&frames::status(json!({ "type": "downloadComplete" })));
    assert!(wait_for(DEFAULT_TIMEOUT, || {
        controller.view().progress_description.as_deref() == Some("Download complete")
    })
    .await);

    peer.send_json(&frames::status(json!({ "type": "complete" })));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Complete).await);
    assert!(controller.view().available);

    backend.shutdown().await;
}

#[tokio::test]
async fn test_failed_provision_can_be_retried() {
    let mut backend = TestBackend::start();
    let (controller, mut peer) = started(&mut backend).await;
    controller.set_license_key(&valid_license_key()).await.unwrap();
    peer.send_json(&frames::available("newrelic", false));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Validating).await);

    assert!(matches!(
        controller.retry(),
        Err(ProvisioningError::InvalidTransition { action: "retry", .. })
    ));

    controller.provision().unwrap();
    assert_eq!(next_type(&mut peer).await, "provision");
    peer.send_json(&frames::status(json!({ "type": "provisioningError", "message": "disk full" })));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Error).await);
    assert_eq!(
        controller.view().error_message.as_deref(),
        Some("Error provisioning New Relic: disk full")
    );

    controller.retry().unwrap();
    assert_eq!(next_type(&mut peer).await, "provision");
    assert_eq!(controller.state(), ProvisioningState::Provisioning);
    assert_eq!(controller.view().error_message, None);

    backend.shutdown().await;
}

#[tokio::test]
async fn test_connection_loss_fails_in_flight_provision() {
    let mut backend = TestBackend::start();
    let (controller, mut peer) = started(&mut backend).await;
    controller.set_license_key(&valid_license_key()).await.unwrap();
    peer.send_json(&frames::available("newrelic", false));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Validating).await);

    controller.provision().unwrap();
    assert_eq!(next_type(&mut peer).await, "provision");
    peer.close();

    let mut peer = backend.accept().await;
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Error).await);
    assert_eq!(
        controller.view().error_message.as_deref(),
        Some("Error provisioning New Relic: connection lost during provisioning")
    );
    // Error is terminal for the reopen; only the queries go out again
    assert_eq!(next_type(&mut peer).await, "available");
    peer.send_json(&frames::available("newrelic", true));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.view().available).await);
    assert_eq!(controller.state(), ProvisioningState::Error);

    // A late status from the dead flow changes nothing
    peer.send_json(&frames::status(json!({ "type": "complete" })));
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(controller.state(), ProvisioningState::Error);

    backend.shutdown().await;
}

#[tokio::test]
async fn test_rejected_key_after_save_still_allows_provision() {
    let mut backend = TestBackend::start();
    let (controller, mut peer) = started(&mut backend).await;
    controller.set_license_key(&valid_license_key()).await.unwrap();
    peer.send_json(&frames::available("newrelic", false));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Validating).await);

    assert!(matches!(
        controller.set_license_key("too-short").await,
        Err(ProvisioningError::Validation(_))
    ));
    assert_eq!(controller.license_key(), valid_license_key());
    assert!(controller.view().config_saved);
    assert_eq!(controller.state(), ProvisioningState::Validating);

    controller.provision().unwrap();
    assert_eq!(next_type(&mut peer).await, "provision");

    backend.shutdown().await;
}

#[tokio::test]
async fn test_project_commands_carry_key_and_location() {
    let mut backend = TestBackend::start();
    let (controller, mut peer) = started(&mut backend).await;

    assert!(matches!(
        controller.enable_project("petclinic"),
        Err(ProvisioningError::Validation(_))
    ));

    controller.set_license_key(&valid_license_key()).await.unwrap();
    controller.enable_project("petclinic").unwrap();
    let frame = next_frame(&mut peer).await;
    assert_eq!(frame["type"], "enable");
    assert_eq!(frame["key"], valid_license_key());
    assert_eq!(frame["name"], "petclinic");

    controller.generate_files("/work/petclinic");
    let frame = next_frame(&mut peer).await;
    assert_eq!(frame["type"], "generateFiles");
    assert_eq!(frame["location"], "/work/petclinic");
    assert_eq!(frame["info"], "");

    peer.send_json(&frames::monitoring(
        "newrelic",
        json!({ "type": "isSupportedJavaVersionResult", "result": true, "version": "21" }),
    ));
    peer.send_json(&frames::monitoring("newrelic", json!({ "type": "projectEnabled" })));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.view().project_enabled).await);
    let java = controller.supported_java_version();
    assert!(java.result);
    assert_eq!(java.version, "21");

    backend.shutdown().await;
}
