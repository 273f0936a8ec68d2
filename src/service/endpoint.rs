//! Endpoint definitions: typed request/response translation for one path.

use crate::base::neterror::NetError;
use crate::config::ParameterSet;
use crate::http::query::QueryParameters;
use crate::http::request::RequestTask;
use crate::http::response::HttpResponse;

/// A callable operation of a server.
///
/// Implementors translate a typed request value into an [`EndpointRequest`]
/// and a raw [`HttpResponse`] into a typed response. Either translation may
/// fail.
pub trait Endpoint: Clone + Send + Sync + 'static {
    type Request;
    type Response: Send + 'static;

    /// Path relative to the server URL.
    fn path(&self) -> &str;

    /// Endpoint level of the configuration cascade.
    fn parameters(&self) -> ParameterSet {
        ParameterSet::inherit()
    }

    fn endpoint_request(&self, request: Self::Request) -> Result<EndpointRequest, NetError>;

    fn response(&self, response: HttpResponse) -> Result<Self::Response, NetError>;
}

/// Path, query and method/body of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    pub path: String,
    pub query: QueryParameters,
    pub task: RequestTask,
}

impl EndpointRequest {
    pub fn new(path: impl Into<String>, task: RequestTask) -> Self {
        Self {
            path: path.into(),
            query: QueryParameters::new(),
            task,
        }
    }

    /// Request for `endpoint`'s own path.
    pub fn to<E: Endpoint>(endpoint: &E, task: RequestTask) -> Self {
        Self::new(endpoint.path(), task)
    }

    pub fn with_query(mut self, query: QueryParameters) -> Self {
        self.query = query;
        self
    }
}
