//! Server definitions and the call pipeline.
//!
//! `call` runs: endpoint request translation, cascade resolution, request
//! construction, submission, and response translation. A failure before
//! submission yields an already-failed future without touching the
//! transport.

use crate::base::neterror::NetError;
use crate::config::{ParameterSet, ResolvedOptions};
use crate::http::request::HttpRequest;
use crate::service::endpoint::{Endpoint, EndpointRequest};
use crate::session::networksession::NetworkSession;
use crate::session::promise::ResponseFuture;
use url::Url;

/// A base URL plus the server level of the configuration cascade.
pub trait Server {
    fn session(&self) -> &NetworkSession;

    fn url(&self) -> &Url;

    /// Server level of the configuration cascade.
    fn parameters(&self) -> ParameterSet {
        ParameterSet::inherit()
    }

    /// Call `endpoint` with a typed request value.
    fn call<E: Endpoint>(&self, endpoint: &E, request: E::Request) -> ResponseFuture<E::Response> {
        match endpoint.endpoint_request(request) {
            Ok(endpoint_request) => self.make(endpoint, endpoint_request),
            Err(e) => {
                tracing::debug!(path = %endpoint.path(), error = %e, "Endpoint request construction failed");
                ResponseFuture::failed(e)
            }
        }
    }

    /// Submit a prepared [`EndpointRequest`] and translate its response.
    fn make<E: Endpoint>(
        &self,
        endpoint: &E,
        endpoint_request: EndpointRequest,
    ) -> ResponseFuture<E::Response> {
        let request = match self.http_request(endpoint, endpoint_request) {
            Ok(request) => request,
            Err(e) => return ResponseFuture::failed(e),
        };
        let endpoint = endpoint.clone();
        self.session()
            .execute(request)
            .map(move |response| endpoint.response(response))
    }

    /// Build the effective [`HttpRequest`] for a call.
    fn http_request<E: Endpoint>(
        &self,
        endpoint: &E,
        endpoint_request: EndpointRequest,
    ) -> Result<HttpRequest, NetError> {
        let url = join_path(self.url(), &endpoint_request.path)?;
        let options = ResolvedOptions::resolve(
            &endpoint.parameters(),
            &self.parameters(),
            self.session().config(),
        );
        Ok(HttpRequest::new(url, endpoint_request.task)
            .with_query(endpoint_request.query)
            .with_options(options))
    }
}

/// Append the `/`-separated segments of `path` to `base`.
pub fn join_path(base: &Url, path: &str) -> Result<Url, NetError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| NetError::InvalidUrl(format!("{base} cannot be a base URL")))?;
        segments
            .pop_if_empty()
            .extend(path.split('/').filter(|segment| !segment.is_empty()));
    }
    Ok(url)
}

/// A [`Server`] described by plain values.
#[derive(Debug, Clone)]
pub struct ServerDefinition {
    session: NetworkSession,
    url: Url,
    parameters: ParameterSet,
}

impl ServerDefinition {
    pub fn new(session: NetworkSession, url: Url) -> Self {
        Self {
            session,
            url,
            parameters: ParameterSet::inherit(),
        }
    }

    /// Parse `url` and build a server for it.
    pub fn parse(session: NetworkSession, url: &str) -> Result<Self, NetError> {
        let url = Url::parse(url).map_err(|e| NetError::InvalidUrl(format!("{url}: {e}")))?;
        Ok(Self::new(session, url))
    }

    pub fn with_parameters(mut self, parameters: ParameterSet) -> Self {
        self.parameters = parameters;
        self
    }
}

impl Server for ServerDefinition {
    fn session(&self) -> &NetworkSession {
        &self.session
    }

    fn url(&self) -> &Url {
        &self.url
    }

    fn parameters(&self) -> ParameterSet {
        self.parameters.clone()
    }
}
