//! Boundary to the instrumentation engine that actually records traces.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The instrumentation engine.
///
/// The engine owns the in-progress trace; perfgate only opens and closes
/// spans on it and collects the finished trace as opaque bytes.
pub trait Engine: Send + Sync {
    /// Whether the engine is loaded and able to record.
    fn is_available(&self) -> bool;

    /// Open a span.
    fn start_span(&self, name: &str);

    /// Attach an attribute to the current trace.
    fn set_attribute(&self, key: &str, value: &str);

    /// Close a span. `false` means there was nothing to close and no trace
    /// should be delivered.
    fn stop_span(&self, name: &str) -> bool;

    /// Take the finished trace, leaving the engine empty.
    fn take_trace(&self) -> Vec<u8>;
}

impl<E: Engine + ?Sized> Engine for Arc<E> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn start_span(&self, name: &str) {
        (**self).start_span(name)
    }

    fn set_attribute(&self, key: &str, value: &str) {
        (**self).set_attribute(key, value)
    }

    fn stop_span(&self, name: &str) -> bool {
        (**self).stop_span(name)
    }

    fn take_trace(&self) -> Vec<u8> {
        (**self).take_trace()
    }
}

#[derive(Debug, Default, Serialize)]
struct MemoryTrace {
    spans: Vec<String>,
    attributes: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    open: Vec<String>,
    trace: MemoryTrace,
}

/// In-process engine that records span names and attributes.
///
/// The trace is rendered as JSON. Useful where no native engine is loaded
/// and in tests.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    state: Mutex<MemoryState>,
}

impl MemoryEngine {
    /// Empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of spans currently open.
    pub fn open_spans(&self) -> Vec<String> {
        self.state.lock().open.clone()
    }
}

impl Engine for MemoryEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn start_span(&self, name: &str) {
        let mut state = self.state.lock();
        state.open.push(name.to_string());
        state.trace.spans.push(name.to_string());
    }

    fn set_attribute(&self, key: &str, value: &str) {
        self.state
            .lock()
            .trace
            .attributes
            .insert(key.to_string(), value.to_string());
    }

    fn stop_span(&self, name: &str) -> bool {
        let mut state = self.state.lock();
        match state.open.iter().rposition(|s| s == name) {
            Some(pos) => {
                state.open.remove(pos);
                true
            }
            None => false,
        }
    }

    fn take_trace(&self) -> Vec<u8> {
        let trace = std::mem::take(&mut self.state.lock().trace);
        // MemoryTrace holds only strings; encoding cannot fail.
        serde_json::to_vec(&trace).unwrap_or_default()
    }
}
