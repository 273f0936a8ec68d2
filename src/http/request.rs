//! Outgoing request description.

use crate::config::{CachePolicy, ResolvedOptions};
use crate::http::body::HttpBody;
use crate::http::headers::Headers;
use crate::http::query::{append_query, QueryParameters};
use crate::session::transport::TransportRequest;
use http::Method;
use std::time::Duration;
use url::Url;

/// Method and body of a call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTask {
    Get,
    Head,
    Delete,
    Post(HttpBody),
    Put(HttpBody),
    Patch(HttpBody),
}

impl RequestTask {
    pub fn method(&self) -> Method {
        match self {
            RequestTask::Get => Method::GET,
            RequestTask::Head => Method::HEAD,
            RequestTask::Delete => Method::DELETE,
            RequestTask::Post(_) => Method::POST,
            RequestTask::Put(_) => Method::PUT,
            RequestTask::Patch(_) => Method::PATCH,
        }
    }

    pub fn body(&self) -> HttpBody {
        match self {
            RequestTask::Get | RequestTask::Head | RequestTask::Delete => HttpBody::Empty,
            RequestTask::Post(body) | RequestTask::Put(body) | RequestTask::Patch(body) => {
                body.clone()
            }
        }
    }
}

/// A fully specified request, ready to hand to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub url: Url,
    pub query: QueryParameters,
    pub headers: Headers,
    pub method: Method,
    pub body: HttpBody,
    pub timeout: Duration,
    pub allow_cookies: bool,
    pub allow_cellular: bool,
    pub cache_policy: CachePolicy,
}

impl HttpRequest {
    /// Request with default options: 60 s timeout, cookies and cellular
    /// allowed, local cache ignored.
    pub fn new(url: Url, task: RequestTask) -> Self {
        Self {
            url,
            query: QueryParameters::new(),
            headers: Headers::new(),
            method: task.method(),
            body: task.body(),
            timeout: Duration::from_secs(60),
            allow_cookies: true,
            allow_cellular: true,
            cache_policy: CachePolicy::Ignore,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(url, RequestTask::Get)
    }

    pub fn with_query(mut self, query: QueryParameters) -> Self {
        self.query = query;
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Apply cascaded options.
    pub fn with_options(mut self, options: ResolvedOptions) -> Self {
        self.timeout = options.timeout;
        self.headers = options.headers;
        self.allow_cookies = options.allow_cookies;
        self.allow_cellular = options.allow_cellular;
        self.cache_policy = options.cache_policy;
        self
    }

    /// URL including the encoded query.
    pub fn full_url(&self) -> Url {
        append_query(&self.url, &self.query)
    }

    /// Explicit headers with body-derived headers merged over them.
    pub fn effective_headers(&self) -> Headers {
        let mut headers = self.headers.clone();
        headers.extend(self.body.headers());
        headers
    }

    /// Lower into the description consumed by a [`Transport`].
    ///
    /// [`Transport`]: crate::session::transport::Transport
    pub fn transport_request(&self) -> TransportRequest {
        TransportRequest {
            url: self.full_url(),
            method: self.method.clone(),
            headers: self.effective_headers(),
            body: self.body.data(),
            timeout: self.timeout,
            allow_cookies: self.allow_cookies,
            allow_cellular: self.allow_cellular,
            cache_policy: self.cache_policy,
        }
    }
}
