//! The boundary between a session and the transport that performs I/O.
//!
//! A transport accepts request descriptions, hands back a [`TaskId`] and
//! then reports progress through a [`TransportDelegate`]. For one task the
//! callbacks are serialised and completion comes after all data; distinct
//! tasks are unordered.

use crate::base::neterror::NetError;
use crate::config::CachePolicy;
use crate::http::headers::Headers;
use crate::tls::trust::{ChallengeDisposition, TrustChallenge};
use bytes::Bytes;
use http::Method;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Transport-assigned task handle, unique while the task is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Everything a transport needs to perform one request.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub url: Url,
    pub method: Method,
    pub headers: Headers,
    pub body: Bytes,
    /// Idle timeout: connection setup, response headers and each body chunk.
    pub timeout: Duration,
    pub allow_cookies: bool,
    pub allow_cellular: bool,
    pub cache_policy: CachePolicy,
}

/// Status line and headers of an HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: Headers,
    /// MIME type the transport inferred, used when `Content-Type` is absent.
    pub mime_hint: Option<String>,
}

/// What a task completed with, short of a fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportResponse {
    Http(ResponseHead),
    /// A response of some other protocol, described for diagnostics.
    Unsupported(String),
}

/// Terminal outcome of a task: a response, or the fault that ended it.
pub type TaskOutcome = Result<TransportResponse, io::Error>;

/// Whether the transport should keep a task running after a data chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDisposition {
    Continue,
    Cancel,
}

/// A callback-driven HTTP transport.
pub trait Transport: Send + Sync {
    /// Create a suspended task. Callbacks start only after [`resume`].
    ///
    /// [`resume`]: Transport::resume
    fn create_task(
        &self,
        request: TransportRequest,
        delegate: Arc<dyn TransportDelegate>,
    ) -> Result<TaskId, NetError>;

    fn resume(&self, id: TaskId);

    /// Abort a task. Its completion is still reported, with a fault.
    fn cancel(&self, id: TaskId);
}

/// Receiver of a transport's per-task callbacks.
pub trait TransportDelegate: Send + Sync {
    /// Decide whether a TLS handshake may proceed.
    fn on_challenge(&self, challenge: &TrustChallenge) -> ChallengeDisposition;

    /// Decide whether to follow a redirect; `None` delivers the redirect
    /// response itself.
    fn on_redirect(
        &self,
        id: TaskId,
        response: &ResponseHead,
        new_request: TransportRequest,
    ) -> Option<TransportRequest>;

    fn on_data(&self, id: TaskId, chunk: Bytes) -> DataDisposition;

    /// Called exactly once per resumed task.
    fn on_complete(&self, id: TaskId, outcome: TaskOutcome);
}
