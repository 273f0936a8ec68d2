//! Routes transport callbacks to the registry and the security handler.

use crate::session::taskregistry::TaskRegistry;
use crate::session::transport::{
    DataDisposition, ResponseHead, TaskId, TaskOutcome, TransportDelegate, TransportRequest,
};
use crate::tls::pinning::SecurityHandler;
use crate::tls::trust::{ChallengeDisposition, TrustChallenge};
use bytes::Bytes;
use std::sync::Arc;

/// Decides whether a redirect is followed; `None` stops at the redirect.
pub type RedirectHandler =
    Arc<dyn Fn(&ResponseHead, TransportRequest) -> Option<TransportRequest> + Send + Sync>;

/// The [`TransportDelegate`] of a [`NetworkSession`].
///
/// [`NetworkSession`]: crate::session::NetworkSession
pub struct SessionDelegate {
    registry: TaskRegistry,
    security_handler: Option<Arc<dyn SecurityHandler>>,
    redirect_handler: Option<RedirectHandler>,
}

impl SessionDelegate {
    pub fn new(
        security_handler: Option<Arc<dyn SecurityHandler>>,
        redirect_handler: Option<RedirectHandler>,
    ) -> Self {
        Self {
            registry: TaskRegistry::new(),
            security_handler,
            redirect_handler,
        }
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }
}

impl TransportDelegate for SessionDelegate {
    fn on_challenge(&self, challenge: &TrustChallenge) -> ChallengeDisposition {
        match &self.security_handler {
            Some(handler) => handler.resolve_challenge(challenge),
            None => ChallengeDisposition::PerformDefaultHandling,
        }
    }

    fn on_redirect(
        &self,
        id: TaskId,
        response: &ResponseHead,
        new_request: TransportRequest,
    ) -> Option<TransportRequest> {
        let Some(handler) = &self.redirect_handler else {
            return Some(new_request);
        };
        let decision = handler(response, new_request);
        if decision.is_none() {
            tracing::debug!(task = %id, status = response.status, "Redirect declined");
        }
        decision
    }

    fn on_data(&self, id: TaskId, chunk: Bytes) -> DataDisposition {
        self.registry.on_data(id, &chunk)
    }

    fn on_complete(&self, id: TaskId, outcome: TaskOutcome) {
        self.registry.on_completion(id, outcome);
    }
}
