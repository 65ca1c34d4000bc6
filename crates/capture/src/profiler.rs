//! Profiler and the scoped capture session it hands out.

use crate::engine::Engine;
use crate::error::{CaptureError, CaptureResult};
use crate::subject::Subject;
use perfgate_buffer::{BufferBackend, TraceBuffer};
use perfgate_core::{CapturePolicy, Config, RecordId};
use perfgate_delivery::{Delivered, DeliveryError, Sender, TraceSink};
use rand::Rng;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What happened to a finished trace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Submitted to the collector
    Sent,
    /// Stored in the buffer for a later drain pass
    Stored(RecordId),
    /// The engine had no span to stop; nothing was delivered
    Skipped,
    /// Delivery failed and the trace was dropped
    Lost,
}

/// Decides which units of work are captured and routes finished traces.
///
/// Built once from a [`Config`]; cheap to share by reference across
/// concurrent units of work.
pub struct Profiler<E, S, B = BufferBackend>
where
    E: Engine,
    S: Sender,
    B: TraceBuffer,
{
    policy: CapturePolicy,
    engine: E,
    sink: TraceSink<S, B>,
    defaults: Vec<(&'static str, String)>,
    debug: bool,
    log_errors: bool,
}

impl<E, S, B> Profiler<E, S, B>
where
    E: Engine,
    S: Sender,
    B: TraceBuffer,
{
    /// Profiler for `config`. Filter patterns are compiled here.
    pub fn new(config: &Config, engine: E, sink: TraceSink<S, B>) -> CaptureResult<Self> {
        let policy = CapturePolicy::from_config(config)?;
        let defaults = vec![
            ("hostname", local_hostname()),
            ("environment", config.environment.clone()),
            ("app_version", config.app_version.clone()),
        ];
        Ok(Self {
            policy,
            engine,
            sink,
            defaults,
            debug: config.debug,
            log_errors: config.log_errors,
        })
    }

    /// The engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The sink finished traces go to.
    pub fn sink(&self) -> &TraceSink<S, B> {
        &self.sink
    }

    /// Start capturing `subject` if the decision says so.
    ///
    /// `Ok(None)` means the subject is not captured. A subject that should be
    /// captured while the engine is unavailable is an error.
    pub fn begin(
        &self,
        subject: &Subject,
        subject_override: Option<bool>,
    ) -> CaptureResult<Option<CaptureSession<'_, E, S, B>>> {
        self.begin_with(subject, subject_override, &mut rand::thread_rng())
    }

    /// [`Profiler::begin`] with an explicit RNG for the sampling draw.
    pub fn begin_with<R: Rng + ?Sized>(
        &self,
        subject: &Subject,
        subject_override: Option<bool>,
        rng: &mut R,
    ) -> CaptureResult<Option<CaptureSession<'_, E, S, B>>> {
        let components = subject.components();
        if !self
            .policy
            .should_capture_with(subject.kind(), components.as_slice(), subject_override, rng)
        {
            return Ok(None);
        }
        if !self.engine.is_available() {
            return Err(CaptureError::EngineUnavailable);
        }

        let span = subject.span_name();
        self.engine.start_span(&span);
        debug!(span = %span, "capture started");

        let mut attributes = BTreeMap::new();
        for (key, value) in self.defaults.iter().cloned().chain(subject.attributes()) {
            attributes.insert(key.to_string(), value);
        }
        Ok(Some(CaptureSession {
            profiler: self,
            span,
            attributes,
            finished: false,
        }))
    }

    fn lost(&self, error: DeliveryError) -> CaptureResult<Delivery> {
        if self.debug {
            return Err(error.into());
        }
        if self.log_errors {
            warn!(error = %error, "trace delivery failed, trace dropped");
        }
        Ok(Delivery::Lost)
    }
}

/// One unit of work being captured.
///
/// Call [`CaptureSession::finish`] or [`CaptureSession::fail`] when the work
/// ends. Dropping the session without either closes the span and discards
/// the trace.
pub struct CaptureSession<'p, E, S, B>
where
    E: Engine,
    S: Sender,
    B: TraceBuffer,
{
    profiler: &'p Profiler<E, S, B>,
    span: String,
    attributes: BTreeMap<String, String>,
    finished: bool,
}

impl<'p, E, S, B> CaptureSession<'p, E, S, B>
where
    E: Engine,
    S: Sender,
    B: TraceBuffer,
{
    /// Span name of this session.
    pub fn span(&self) -> &str {
        &self.span
    }

    /// Attribute value, if set.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set or replace an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Record the HTTP response status.
    pub fn set_status_code(&mut self, status: u16) {
        self.set_attribute("http_status_code", status.to_string());
    }

    /// Record a process exit code.
    pub fn set_exit_code(&mut self, code: i32) {
        self.set_attribute("exit_code", code.to_string());
    }

    /// Record an exception message.
    pub fn set_exception(&mut self, message: impl Into<String>) {
        self.set_attribute("exception", message);
    }

    /// Stop the span and deliver the trace.
    pub fn finish(mut self) -> CaptureResult<Delivery> {
        self.finished = true;
        let profiler = self.profiler;
        let engine = &profiler.engine;
        for (key, value) in &self.attributes {
            engine.set_attribute(key, value);
        }
        if !engine.stop_span(&self.span) {
            debug!(span = %self.span, "no span to stop, nothing delivered");
            return Ok(Delivery::Skipped);
        }

        let payload = engine.take_trace();
        match profiler.sink.deliver(&payload) {
            Ok(Delivered::Sent) => Ok(Delivery::Sent),
            Ok(Delivered::Stored(id)) => {
                debug!(span = %self.span, id = %id, "trace stored");
                Ok(Delivery::Stored(id))
            }
            Err(e) => profiler.lost(e),
        }
    }

    /// Record `message` as the exception and finish.
    pub fn fail(mut self, message: impl Into<String>) -> CaptureResult<Delivery> {
        self.set_exception(message);
        self.finish()
    }
}

impl<'p, E, S, B> Drop for CaptureSession<'p, E, S, B>
where
    E: Engine,
    S: Sender,
    B: TraceBuffer,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let engine = &self.profiler.engine;
        if engine.stop_span(&self.span) {
            engine.take_trace();
        }
        if self.profiler.log_errors {
            warn!(span = %self.span, "capture session dropped before finish, trace discarded");
        }
    }
}

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_default()
}
