//! AppDynamics provisioning flows

use pretty_assertions::assert_eq;
use serde_json::json;
use streammux_monitoring::{AppDynamicsConfig, AppDynamicsController, ProvisioningError, ProvisioningState};
use tests::async_helpers::{wait_for, DEFAULT_TIMEOUT};
use tests::backend::{next_frame, next_type};
use tests::fixtures::{memory_settings, valid_appdynamics_config};
use tests::frames;
use tests::TestBackend;

#[tokio::test]
async fn test_configure_then_provision_to_completion() {
    let mut backend = TestBackend::start();
    let settings = memory_settings();
    let controller = AppDynamicsController::new(backend.router(), &settings, None)
        .await
        .unwrap();
    controller.start();

    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "isAvailable");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");

    peer.send_json(&frames::available("appdynamics", false));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::AwaitingConfig).await);
    let view = controller.view();
    assert!(!view.available);
    assert!(view.invalid_fields.contains(&"hostName"));
    assert!(view.invalid_fields.contains(&"accessKey"));

    let broken = AppDynamicsConfig {
        port: 70_000,
        ..valid_appdynamics_config()
    };
    assert!(matches!(
        controller.configure(broken).await,
        Err(ProvisioningError::Validation(e)) if e.fields == vec!["port".to_string()]
    ));
    assert_eq!(controller.state(), ProvisioningState::AwaitingConfig);

    controller.configure(valid_appdynamics_config()).await.unwrap();
    assert_eq!(controller.state(), ProvisioningState::Validating);
    assert!(controller.configured());

    controller.provision("admin", "s3cret!").unwrap();
    let frame = next_frame(&mut peer).await;
    assert_eq!(
        frame,
        json!({
            "request": "AppDynamicsRequest",
            "type": "provision",
            "username": "admin",
            "password": "s3cret!",
        })
    );

    peer.send_json(&frames::status(json!({ "type": "progress", "percent": 0, "bytes": 4096 })));
    assert!(wait_for(DEFAULT_TIMEOUT, || {
        controller.view().progress_description.as_deref() == Some("4096 bytes")
    })
    .await);

    peer.send_json(&frames::status(json!({ "type": "complete" })));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Complete).await);
    assert!(controller.view().available);

    // Once complete, further status events are not ours
    assert_eq!(backend.router().subscription_count(), 2);
    backend.shutdown().await;
}

#[tokio::test]
async fn test_configuration_survives_controller_restart() {
    let mut backend = TestBackend::start();
    let settings = memory_settings();
    {
        let controller = AppDynamicsController::new(backend.router(), &settings, None)
            .await
            .unwrap();
        controller.configure(valid_appdynamics_config()).await.unwrap();
    }

    let controller = AppDynamicsController::new(backend.router(), &settings, None)
        .await
        .unwrap();
    assert_eq!(controller.config(), valid_appdynamics_config());
    assert!(controller.view().config_saved);

    controller.reset_credentials().await.unwrap();
    let config = controller.config();
    assert_eq!(config.account_name, "");
    assert_eq!(config.access_key, "");
    assert_eq!(config.host_name, "controller.example.com");
    assert!(!controller.configured());

    let _peer = backend.accept().await;
    backend.shutdown().await;
}

#[tokio::test]
async fn test_generate_files_carries_full_config() {
    let mut backend = TestBackend::start();
    let settings = memory_settings();
    let controller = AppDynamicsController::new(backend.router(), &settings, None)
        .await
        .unwrap();
    controller.start();
    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "isAvailable");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");
    peer.send_json(&frames::available("appdynamics", true));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Idle).await);
    assert!(controller.view().available);

    assert!(controller.enable_project("/work/shop").is_err());

    controller.configure(valid_appdynamics_config()).await.unwrap();
    controller.enable_project("/work/shop").unwrap();
    assert!(controller.view().project_enabled);

    let frame = next_frame(&mut peer).await;
    assert_eq!(frame["type"], "generateFiles");
    assert_eq!(frame["location"], "/work/shop");
    assert_eq!(frame["applicationName"], "n/a");
    assert_eq!(frame["nodeName"], "activator-test");
    assert_eq!(frame["hostName"], "controller.example.com");
    assert_eq!(frame["port"], 443);
    assert_eq!(frame["sslEnabled"], true);

    controller.deprovision().unwrap();
    assert_eq!(next_type(&mut peer).await, "deprovision");
    peer.send_json(&frames::monitoring("appdynamics", json!({ "type": "deprovisioned" })));
    assert!(wait_for(DEFAULT_TIMEOUT, || !controller.view().available).await);

    backend.shutdown().await;
}

#[tokio::test]
async fn test_reply_in_response_envelope_is_routed() {
    let mut backend = TestBackend::start();
    let settings = memory_settings();
    let controller = AppDynamicsController::new(backend.router(), &settings, None)
        .await
        .unwrap();
    controller.start();
    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "isAvailable");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");

    peer.send_json(&frames::appdynamics_response(
        json!({ "type": "availableResponse", "result": false }),
    ));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::AwaitingConfig).await);

    peer.send_json(&frames::appdynamics_response(json!({ "type": "projectEnabled" })));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.view().project_enabled).await);

    backend.shutdown().await;
}

#[tokio::test]
async fn test_rejected_edit_after_save_still_allows_provision() {
    let mut backend = TestBackend::start();
    let settings = memory_settings();
    let controller = AppDynamicsController::new(backend.router(), &settings, None)
        .await
        .unwrap();
    controller.start();
    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "isAvailable");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");

    controller.configure(valid_appdynamics_config()).await.unwrap();
    peer.send_json(&frames::available("appdynamics", false));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Validating).await);

    let edit = AppDynamicsConfig {
        access_key: "short".to_string(),
        ..valid_appdynamics_config()
    };
    assert!(matches!(
        controller.configure(edit).await,
        Err(ProvisioningError::Validation(e)) if e.fields == vec!["accessKey".to_string()]
    ));
    assert_eq!(controller.config(), valid_appdynamics_config());
    let view = controller.view();
    assert_eq!(view.state, ProvisioningState::Validating);
    assert!(view.config_saved);
    assert!(view.invalid_fields.is_empty());

    controller.provision("admin", "s3cret!").unwrap();
    assert_eq!(next_type(&mut peer).await, "provision");
    assert_eq!(controller.state(), ProvisioningState::Provisioning);

    backend.shutdown().await;
}

#[tokio::test]
async fn test_reopen_after_complete_only_refreshes_availability() {
    let mut backend = TestBackend::start();
    let settings = memory_settings();
    let controller = AppDynamicsController::new(backend.router(), &settings, None)
        .await
        .unwrap();
    controller.configure(valid_appdynamics_config()).await.unwrap();
    controller.start();
    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "isAvailable");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");
    peer.send_json(&frames::available("appdynamics", false));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Validating).await);

    controller.provision("admin", "s3cret!").unwrap();
    assert_eq!(next_type(&mut peer).await, "provision");
    peer.send_json(&frames::status(json!({ "type": "complete" })));
    assert!(wait_for(DEFAULT_TIMEOUT, || controller.state() == ProvisioningState::Complete).await);
    assert!(controller.view().available);

    peer.close();
    let mut peer = backend.accept().await;
    assert_eq!(next_type(&mut peer).await, "isAvailable");
    assert_eq!(next_type(&mut peer).await, "isProjectEnabled");
    assert_eq!(controller.state(), ProvisioningState::Complete);

    peer.send_json(&frames::available("appdynamics", false));
    assert!(wait_for(DEFAULT_TIMEOUT, || !controller.view().available).await);
    let view = controller.view();
    assert_eq!(view.state, ProvisioningState::Complete);
    assert_eq!(view.error_message, None);

    backend.shutdown().await;
}
