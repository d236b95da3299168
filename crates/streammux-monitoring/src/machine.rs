//! Generic provisioning state machine
//!
//! One machine per integration. It owns the integration's subscriptions,
//! reacts to inbound events and turns user actions into exactly one outbound
//! command each. Inbound events only ever mutate local state; the exceptions
//! are the status-stream cleanup on `complete`/`provisioningError` and the
//! resume queries after `StreamReopened`.
//!
//! ```text
//! Idle ──check──► CheckingAvailability ──available=false──► AwaitingConfig
//!  ▲                    │ available=true                      │ config valid
//!  │                    ▼                                     ▼
//!  │                  Idle                               Validating
//!  │                                                          │ provision
//!  │   reset                                                  ▼
//!  ├──────────── Complete ◄──complete── ReceivingProgress ◄── Provisioning
//!  └──────────── Error    ◄──provisioningError──┘               │
//!                  └───────────────retry────────────────────────┘
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use streammux_core::{
    Command, Event, EventRouter, Filter, HandlerResult, SubscriptionId, ValidationReport,
};
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::error::ProvisioningError;
use crate::integration::Integration;
use crate::session::{describe_status, Progress, ProvisioningState, ProvisioningView, Session};

struct Inner<I: Integration> {
    integration: I,
    router: EventRouter,
    session: Mutex<Session>,
    view: watch::Sender<ProvisioningView>,
    timeout: Option<Duration>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
}

impl<I: Integration> Drop for Inner<I> {
    fn drop(&mut self) {
        for id in self.subscriptions.get_mut().drain(..) {
            self.router.unsubscribe(id);
        }
        if let Some(id) = self.session.get_mut().status_subscription.take() {
            self.router.unsubscribe(id);
        }
    }
}

/// Provisioning workflow for one integration. Cheap to clone.
pub struct ProvisioningMachine<I: Integration> {
    inner: Arc<Inner<I>>,
}

impl<I: Integration> Clone for ProvisioningMachine<I> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I: Integration> ProvisioningMachine<I> {
    /// Create an idle machine. Nothing is subscribed or sent until `start`.
    ///
    /// With a `timeout`, a provision that has not finished in time moves to
    /// `Error`.
    pub fn new(integration: I, router: EventRouter, timeout: Option<Duration>) -> Self {
        let session = Session::new();
        let (view, _) = watch::channel(session.view(integration.name()));
        Self {
            inner: Arc::new(Inner {
                integration,
                router,
                session: Mutex::new(session),
                view,
                timeout,
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn integration(&self) -> &I {
        &self.inner.integration
    }

    pub fn router(&self) -> &EventRouter {
        &self.inner.router
    }

    pub fn state(&self) -> ProvisioningState {
        self.inner.session.lock().state
    }

    pub fn view(&self) -> ProvisioningView {
        self.inner.view.borrow().clone()
    }

    /// Receiver notified on every view change
    pub fn watch(&self) -> watch::Receiver<ProvisioningView> {
        self.inner.view.subscribe()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Subscribe to the integration's events and issue the initial queries.
    ///
    /// Calling `start` again has no effect.
    pub fn start(&self) {
        if !self.inner.subscriptions.lock().is_empty() {
            debug!(integration = self.name(), "[Provisioning] Already started");
            return;
        }

        let events = self.subscribe(self.inner.integration.events(), Self::on_event);
        let reopened = self.subscribe(Filter::stream_reopened(), |machine, _| {
            machine.on_stream_reopened();
            Ok(())
        });
        self.inner.subscriptions.lock().extend([events, reopened]);

        info!(integration = self.name(), "[Provisioning] Started");
        self.resume();
    }

    /// Drop every subscription this machine holds
    pub fn stop(&self) {
        let ids: Vec<_> = self.inner.subscriptions.lock().drain(..).collect();
        let status = self.update(|s| s.status_subscription.take());
        for id in ids.into_iter().chain(status) {
            self.inner.router.unsubscribe(id);
        }
        info!(integration = self.name(), "[Provisioning] Stopped");
    }

    // =========================================================================
    // User actions
    // =========================================================================

    /// Ask the backend whether the integration is available
    pub fn check_availability(&self) -> Result<(), ProvisioningError> {
        self.update(|s| {
            if s.state.is_in_flight() {
                return Err(self.invalid("check availability", s.state));
            }
            enter_availability_check(s);
            Ok(())
        })?;
        self.send_query(self.inner.integration.availability_query());
        Ok(())
    }

    /// Record the validation report of the configuration currently saved.
    ///
    /// Moves `AwaitingConfig` to `Validating` once every saved field passes,
    /// and back again if a saved field stops passing. Sends nothing.
    pub fn record_config(&self, report: ValidationReport) {
        let valid = report.is_valid();
        let invalid = report.invalid_fields();
        self.update(|s| {
            s.report = report;
            match (s.state, valid) {
                (ProvisioningState::AwaitingConfig, true) => s.state = ProvisioningState::Validating,
                (ProvisioningState::Validating, false) => s.state = ProvisioningState::AwaitingConfig,
                _ => {}
            }
        });
        if !valid {
            debug!(integration = self.name(), fields = ?invalid, "[Provisioning] Saved configuration incomplete");
        }
    }

    /// Send `command` to start provisioning. Only allowed from `Validating`.
    pub fn provision(&self, command: Command) -> Result<(), ProvisioningError> {
        self.begin_provision(command, "provision", ProvisioningState::Validating)
    }

    /// Send `command` again after a failure. Only allowed from `Error`.
    pub fn retry(&self, command: Command) -> Result<(), ProvisioningError> {
        self.begin_provision(command, "retry", ProvisioningState::Error)
    }

    /// Forget progress and errors and return to `Idle`. Sends nothing.
    pub fn reset(&self) {
        let status = self.update(|s| {
            s.state = ProvisioningState::Idle;
            s.clear_progress();
            s.flow += 1;
            s.status_subscription.take()
        });
        if let Some(id) = status {
            self.inner.router.unsubscribe(id);
        }
    }

    /// Set the project-enabled flag locally
    pub fn set_project_enabled(&self, enabled: bool) {
        self.update(|s| s.project_enabled = enabled);
    }

    /// Send an integration command outside the provisioning flow
    pub fn send(&self, command: &Command) {
        self.inner.router.send(command);
    }

    // =========================================================================
    // Inbound
    // =========================================================================

    fn on_event(&self, event: &Event) -> HandlerResult {
        let event_type = event.event_type();
        match event_type {
            "availableResponse" => {
                let result = event
                    .bool_attr("result")
                    .ok_or_else(|| anyhow!("availableResponse without a boolean result"))?;
                self.update(|s| {
                    s.available = result;
                    if s.state == ProvisioningState::CheckingAvailability {
                        s.state = if result {
                            ProvisioningState::Idle
                        } else if s.report.is_valid() {
                            ProvisioningState::Validating
                        } else {
                            ProvisioningState::AwaitingConfig
                        };
                    }
                });
            }
            "provisioned" => self.update(|s| s.available = true),
            "deprovisioned" => self.update(|s| s.available = false),
            "projectEnabled" => self.update(|s| s.project_enabled = true),
            t if t == self.inner.integration.project_enabled_reply() => {
                let result = event.bool_attr("result").unwrap_or(false);
                self.update(|s| s.project_enabled = result);
            }
            other => {
                trace!(integration = self.name(), event_type = other, "[Provisioning] Ignoring event");
            }
        }
        Ok(())
    }

    fn on_status(&self, event: &Event) -> HandlerResult {
        let name = self.name();
        let finished = self.update(|s| {
            if !s.state.is_in_flight() {
                return None;
            }
            match event.event_type() {
                "progress" => {
                    if let Some(progress) = Progress::from_event(event) {
                        s.progress = Some(progress);
                        s.progress_description = Some(progress.to_string());
                    }
                    s.state = ProvisioningState::ReceivingProgress;
                    None
                }
                "complete" => {
                    s.state = ProvisioningState::Complete;
                    s.available = true;
                    s.progress_description = Some(describe_status("complete").to_string());
                    s.status_subscription.take()
                }
                "provisioningError" => {
                    let message = event.str_attr("message").unwrap_or("unknown error");
                    fail(s, name, message);
                    s.status_subscription.take()
                }
                status => {
                    s.progress_description = Some(describe_status(status).to_string());
                    s.state = ProvisioningState::ReceivingProgress;
                    None
                }
            }
        });

        if let Some(id) = finished {
            self.inner.router.unsubscribe(id);
        }
        Ok(())
    }

    fn on_stream_reopened(&self) {
        let name = self.name();
        let lost = self.update(|s| {
            if s.state.is_in_flight() {
                fail(s, name, "connection lost during provisioning");
                s.flow += 1;
                return s.status_subscription.take();
            }
            None
        });
        if let Some(id) = lost {
            warn!(integration = name, "[Provisioning] Connection lost while provisioning");
            self.inner.router.unsubscribe(id);
        }
        self.resume();
    }

    fn on_timeout(&self, flow: u64) {
        let name = self.name();
        let expired = self.update(|s| {
            if s.flow != flow || !s.state.is_in_flight() {
                return None;
            }
            fail(s, name, "provisioning timed out");
            s.status_subscription.take()
        });
        if let Some(id) = expired {
            warn!(integration = name, "[Provisioning] Timed out");
            self.inner.router.unsubscribe(id);
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn name(&self) -> &'static str {
        self.inner.integration.name()
    }

    fn invalid(&self, action: &'static str, state: ProvisioningState) -> ProvisioningError {
        ProvisioningError::InvalidTransition {
            integration: self.name(),
            action,
            state,
        }
    }

    /// Re-issue the state queries, entering `CheckingAvailability` where it applies
    fn resume(&self) {
        self.update(enter_availability_check);
        for query in self.inner.integration.initial_queries() {
            self.send_query(query);
        }
    }

    fn send_query(&self, command_type: &str) {
        self.inner
            .router
            .send(&self.inner.integration.command(command_type));
    }

    fn begin_provision(
        &self,
        command: Command,
        action: &'static str,
        from: ProvisioningState,
    ) -> Result<(), ProvisioningError> {
        let flow = self.update(|s| {
            if s.state != from {
                return Err(self.invalid(action, s.state));
            }
            s.report.clone().into_result()?;
            s.flow += 1;
            s.state = ProvisioningState::Provisioning;
            s.clear_progress();
            Ok(s.flow)
        })?;

        // Subscribe before sending so no status event can be missed
        let id = self.subscribe(self.inner.integration.status_events(), Self::on_status);
        let stale = self.update(|s| {
            if s.flow == flow {
                s.status_subscription.replace(id)
            } else {
                Some(id)
            }
        });
        if let Some(stale) = stale {
            self.inner.router.unsubscribe(stale);
        }

        info!(
            integration = self.name(),
            command_type = command.command_type(),
            "[Provisioning] Provisioning started"
        );
        self.inner.router.send(&command);
        self.arm_timeout(flow);
        Ok(())
    }

    fn arm_timeout(&self, flow: u64) {
        let Some(timeout) = self.inner.timeout else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(integration = self.name(), "[Provisioning] No runtime, provisioning timeout disabled");
            return;
        };

        let weak = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(machine) = Self::upgrade(&weak) {
                machine.on_timeout(flow);
            }
        });
    }

    fn subscribe(
        &self,
        filter: Filter,
        handler: fn(&Self, &Event) -> HandlerResult,
    ) -> SubscriptionId {
        let weak = Arc::downgrade(&self.inner);
        self.inner.router.subscribe(filter, move |event| match Self::upgrade(&weak) {
            Some(machine) => handler(&machine, event),
            None => Ok(()),
        })
    }

    fn upgrade(weak: &Weak<Inner<I>>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    /// Apply `f` to the session and publish the resulting view
    fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let name = self.name();
        let mut session = self.inner.session.lock();
        let before = session.state;
        let result = f(&mut session);
        let view = session.view(name);

        if before != view.state {
            info!(integration = name, from = %before, to = %view.state, "[Provisioning] State changed");
        }
        self.inner.view.send_if_modified(|current| {
            if *current == view {
                false
            } else {
                *current = view;
                true
            }
        });
        result
    }
}

fn enter_availability_check(s: &mut Session) {
    if matches!(
        s.state,
        ProvisioningState::Idle
            | ProvisioningState::AwaitingConfig
            | ProvisioningState::Validating
            | ProvisioningState::CheckingAvailability
    ) {
        s.state = ProvisioningState::CheckingAvailability;
    }
}

fn fail(s: &mut Session, integration: &str, reason: &str) {
    let message = format!("Error provisioning {}: {}", integration, reason);
    s.state = ProvisioningState::Error;
    s.progress_description = Some(message.clone());
    s.error_message = Some(message);
}
