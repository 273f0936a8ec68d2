//! Network session - submits requests to a transport and tracks them.
//!
//! A session bundles the defaults at the bottom of the configuration
//! cascade, the transport, and the delegate that turns transport callbacks
//! into resolved futures. Sessions are cheap to clone; clones share state.

use crate::base::neterror::NetError;
use crate::config::SessionConfig;
use crate::http::request::HttpRequest;
use crate::http::response::HttpResponse;
use crate::session::promise::{pair, ResponseFuture};
use crate::session::sessiondelegate::{RedirectHandler, SessionDelegate};
use crate::session::transport::{Transport, TransportDelegate};
use crate::tls::pinning::SecurityHandler;
use crate::transport::{HyperTransport, TransportConfig};
use std::sync::Arc;

/// Executes [`HttpRequest`]s and resolves one [`ResponseFuture`] per request.
#[derive(Clone)]
pub struct NetworkSession {
    config: Arc<SessionConfig>,
    transport: Arc<dyn Transport>,
    delegate: Arc<SessionDelegate>,
}

impl NetworkSession {
    /// Session with default configuration over a [`HyperTransport`].
    pub fn new() -> Result<Self, NetError> {
        Self::builder().build()
    }

    pub fn builder() -> NetworkSessionBuilder {
        NetworkSessionBuilder::default()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Number of submitted requests whose completion has not been reported.
    pub fn active_tasks(&self) -> usize {
        self.delegate.registry().len()
    }

    /// Submit a request.
    ///
    /// The task is registered before the transport is resumed, so no
    /// callback can observe a missing entry. Cancelling the returned future
    /// aborts the transport task.
    pub fn execute(&self, request: HttpRequest) -> ResponseFuture<HttpResponse> {
        let delegate: Arc<dyn TransportDelegate> = self.delegate.clone();
        let id = match self.transport.create_task(request.transport_request(), delegate) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "Transport rejected request");
                return ResponseFuture::failed(e);
            }
        };

        let (promise, future) = pair();
        self.delegate.registry().register(id, promise.clone());

        let transport = Arc::downgrade(&self.transport);
        promise.on_cancel(move || {
            if let Some(transport) = transport.upgrade() {
                tracing::debug!(task = %id, "Cancelling task");
                transport.cancel(id);
            }
        });

        tracing::debug!(
            task = %id,
            method = %request.method,
            url = %request.url,
            timeout_ms = request.timeout.as_millis() as u64,
            "Submitting request"
        );
        self.transport.resume(id);
        future
    }
}

impl std::fmt::Debug for NetworkSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkSession")
            .field("config", &self.config)
            .field("active_tasks", &self.active_tasks())
            .finish()
    }
}

/// Builder for [`NetworkSession`].
#[derive(Default)]
pub struct NetworkSessionBuilder {
    config: SessionConfig,
    transport: Option<Arc<dyn Transport>>,
    security_handler: Option<Arc<dyn SecurityHandler>>,
    redirect_handler: Option<RedirectHandler>,
}

impl NetworkSessionBuilder {
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a custom transport instead of [`HyperTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Answer TLS challenges with `handler`; without one the transport
    /// validates against the platform trust store.
    pub fn security_handler(mut self, handler: Arc<dyn SecurityHandler>) -> Self {
        self.security_handler = Some(handler);
        self
    }

    pub fn redirect_handler(mut self, handler: RedirectHandler) -> Self {
        self.redirect_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<NetworkSession, NetError> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new(TransportConfig {
                resource_timeout: self.config.resource_timeout,
                ..TransportConfig::default()
            })?),
        };

        Ok(NetworkSession {
            config: Arc::new(self.config),
            transport,
            delegate: Arc::new(SessionDelegate::new(
                self.security_handler,
                self.redirect_handler,
            )),
        })
    }
}
