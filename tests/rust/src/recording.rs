use std::sync::Arc;

use parking_lot::Mutex;
use streammux_core::{Diagnostic, Event, HandlerResult};

/// Records every event its handler receives
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> impl Fn(&Event) -> HandlerResult + Send + Sync + 'static {
        let events = self.events.clone();
        move |event| {
            events.lock().push(event.clone());
            Ok(())
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    /// Event types in delivery order
    pub fn types(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|e| e.event_type().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Records diagnostics
#[derive(Clone, Default)]
pub struct DiagnosticRecorder {
    diagnostics: Arc<Mutex<Vec<Diagnostic>>>,
}

impl DiagnosticRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler(&self) -> impl Fn(&Diagnostic) + Send + Sync + 'static {
        let diagnostics = self.diagnostics.clone();
        move |diagnostic| diagnostics.lock().push(diagnostic.clone())
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.lock().len()
    }
}
