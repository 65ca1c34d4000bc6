//! Submission of one trace payload to the remote collector.

use crate::error::SendError;
use perfgate_core::{Config, ConfigError};
use std::sync::Arc;
use std::time::Duration;

/// Submit one opaque trace payload.
///
/// Implementations apply their own per-call timeout; a sender that blocks
/// forever stalls the whole drain pass.
pub trait Sender: Send + Sync {
    /// Submit `payload`. `Ok` means the collector confirmed receipt.
    fn submit(&self, payload: &[u8]) -> Result<(), SendError>;
}

impl<S: Sender + ?Sized> Sender for Arc<S> {
    fn submit(&self, payload: &[u8]) -> Result<(), SendError> {
        (**self).submit(payload)
    }
}

impl<S: Sender + ?Sized> Sender for &S {
    fn submit(&self, payload: &[u8]) -> Result<(), SendError> {
        (**self).submit(payload)
    }
}

/// Adapts a closure into a [`Sender`].
pub struct FnSender<F>(F);

impl<F> Sender for FnSender<F>
where
    F: Fn(&[u8]) -> Result<(), SendError> + Send + Sync,
{
    fn submit(&self, payload: &[u8]) -> Result<(), SendError> {
        (self.0)(payload)
    }
}

/// Wrap a closure as a [`Sender`].
pub fn sender_fn<F>(f: F) -> FnSender<F>
where
    F: Fn(&[u8]) -> Result<(), SendError> + Send + Sync,
{
    FnSender(f)
}

/// Posts each payload as an `application/octet-stream` body.
pub struct HttpSender {
    agent: ureq::Agent,
    endpoint: String,
    api_key: Option<String>,
}

impl std::fmt::Debug for HttpSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSender")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpSender {
    /// Sender posting to `endpoint` with the given per-request timeout.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Build from `[sending]`; the endpoint is required.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let endpoint = config
            .sending
            .endpoint
            .clone()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ConfigError::MissingSetting("sending.endpoint"))?;
        if config.sending.timeout == 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        Ok(Self::new(
            endpoint,
            config.sending.api_key.clone(),
            Duration::from_secs(config.sending.timeout),
        ))
    }

    /// Collector endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Sender for HttpSender {
    fn submit(&self, payload: &[u8]) -> Result<(), SendError> {
        let mut request = self
            .agent
            .post(&self.endpoint)
            .set("Content-Type", "application/octet-stream");
        if let Some(key) = &self.api_key {
            request = request.set("x-api-key", key);
        }
        match request.send_bytes(payload) {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(status, _)) => Err(SendError::Rejected { status }),
            Err(ureq::Error::Transport(t)) => Err(SendError::Transport(t.to_string())),
        }
    }
}
