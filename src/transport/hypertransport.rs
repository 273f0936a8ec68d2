//! Callback-driven transport over hyper's HTTP/1.1 client connection.
//!
//! Each task runs as one tokio task on a runtime owned by the transport, so
//! callbacks of one task are serialised while distinct tasks run
//! concurrently. Only the task itself reports completion; cancellation is a
//! signal the task observes.

use crate::base::neterror::NetError;
use crate::config::CachePolicy;
use crate::http::headers::{header_value, Headers};
use crate::session::transport::{
    DataDisposition, ResponseHead, TaskId, TaskOutcome, Transport, TransportDelegate,
    TransportRequest, TransportResponse,
};
use crate::transport::connectjob::ConnectJob;
use crate::transport::cookiejar::CookieJar;
use crate::transport::httpcache::{CacheEntry, HttpCache};
use crate::transport::TransportConfig;
use bytes::{Bytes, BytesMut};
use dashmap::DashMap;
use http::{HeaderMap, Method, Request};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper_util::rt::TokioIo;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::Notify;
use url::Url;

enum TaskSlot {
    Suspended {
        request: TransportRequest,
        delegate: Arc<dyn TransportDelegate>,
    },
    Running {
        cancel: Arc<Notify>,
        delegate: Arc<dyn TransportDelegate>,
    },
}

/// State shared by every running task.
struct Inner {
    config: TransportConfig,
    cookies: CookieJar,
    cache: HttpCache,
}

enum CacheLookup {
    Hit(CacheEntry),
    Revalidate(CacheEntry),
    Miss,
}

/// [`Transport`] backed by tokio, BoringSSL and hyper.
pub struct HyperTransport {
    runtime: Option<Runtime>,
    handle: Handle,
    next_id: AtomicU64,
    tasks: Arc<DashMap<TaskId, TaskSlot>>,
    inner: Arc<Inner>,
}

impl HyperTransport {
    /// Start the callback runtime.
    pub fn new(config: TransportConfig) -> Result<Self, NetError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(config.worker_threads.max(1))
            .thread_name("netcall-callbacks")
            .enable_all()
            .build()
            .map_err(|e| NetError::Runtime(e.to_string()))?;
        let handle = runtime.handle().clone();

        Ok(Self {
            runtime: Some(runtime),
            handle,
            next_id: AtomicU64::new(0),
            tasks: Arc::new(DashMap::new()),
            inner: Arc::new(Inner {
                cache: HttpCache::with_limits(config.cache_max_entries, config.cache_max_bytes),
                cookies: CookieJar::new(),
                config,
            }),
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.inner.config
    }

    pub fn cookies(&self) -> &CookieJar {
        &self.inner.cookies
    }

    pub fn cache(&self) -> &HttpCache {
        &self.inner.cache
    }

    /// Tasks created and not yet completed.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Transport for HyperTransport {
    fn create_task(
        &self,
        request: TransportRequest,
        delegate: Arc<dyn TransportDelegate>,
    ) -> Result<TaskId, NetError> {
        match request.url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(NetError::InvalidUrl(format!(
                    "unsupported scheme '{other}' in {}",
                    request.url
                )))
            }
        }
        if request.url.host_str().is_none() {
            return Err(NetError::InvalidUrl(format!("{} has no host", request.url)));
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.tasks
            .insert(id, TaskSlot::Suspended { request, delegate });
        Ok(id)
    }

    fn resume(&self, id: TaskId) {
        let cancel = Arc::new(Notify::new());
        let (request, delegate) = {
            let Some(mut slot) = self.tasks.get_mut(&id) else {
                tracing::debug!(task = %id, "Resume for unknown task");
                return;
            };
            let TaskSlot::Suspended { delegate, .. } = &*slot else {
                return;
            };
            let running = TaskSlot::Running {
                cancel: Arc::clone(&cancel),
                delegate: Arc::clone(delegate),
            };
            match std::mem::replace(&mut *slot, running) {
                TaskSlot::Suspended { request, delegate } => (request, delegate),
                TaskSlot::Running { .. } => return,
            }
        };

        let tasks = Arc::clone(&self.tasks);
        let inner = Arc::clone(&self.inner);
        self.handle.spawn(async move {
            let resource_timeout = inner.config.resource_timeout;
            let outcome = tokio::select! {
                result = tokio::time::timeout(
                    resource_timeout,
                    inner.perform(id, request, delegate.as_ref()),
                ) => result.unwrap_or_else(|_| {
                    Err(io::Error::new(io::ErrorKind::TimedOut, "resource timeout exceeded"))
                }),
                _ = cancel.notified() => Err(cancelled_error()),
            };

            if tasks.remove(&id).is_some() {
                match &outcome {
                    Ok(_) => tracing::debug!(task = %id, "Task finished"),
                    Err(e) => tracing::debug!(task = %id, error = %e, "Task failed"),
                }
                delegate.on_complete(id, outcome);
            }
        });
    }

    fn cancel(&self, id: TaskId) {
        let suspended = self
            .tasks
            .remove_if(&id, |_, slot| matches!(slot, TaskSlot::Suspended { .. }));
        if let Some((_, TaskSlot::Suspended { delegate, .. })) = suspended {
            self.handle.spawn(async move {
                delegate.on_complete(id, Err(cancelled_error()));
            });
            return;
        }

        if let Some(slot) = self.tasks.get(&id) {
            if let TaskSlot::Running { cancel, .. } = &*slot {
                cancel.notify_one();
            }
        }
    }
}

impl Drop for HyperTransport {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }

        // Tasks that never got to report completion still owe one.
        let ids: Vec<TaskId> = self.tasks.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, slot)) = self.tasks.remove(&id) {
                let (TaskSlot::Suspended { delegate, .. } | TaskSlot::Running { delegate, .. }) =
                    slot;
                delegate.on_complete(
                    id,
                    Err(io::Error::new(io::ErrorKind::Interrupted, "transport shut down")),
                );
            }
        }
    }
}

impl Inner {
    /// Run one task to its terminal outcome, following redirects.
    async fn perform(
        &self,
        id: TaskId,
        mut request: TransportRequest,
        delegate: &dyn TransportDelegate,
    ) -> TaskOutcome {
        let mut redirects = 0usize;

        loop {
            let revalidating = match self.cache_lookup(&request)? {
                CacheLookup::Hit(entry) => return self.deliver_cached(id, &request, entry, delegate),
                CacheLookup::Revalidate(entry) => Some(entry),
                CacheLookup::Miss => None,
            };
            let conditional = revalidating
                .as_ref()
                .map(CacheEntry::conditional_headers)
                .unwrap_or_default();

            let response = self.send(&request, conditional, delegate).await?;
            let (parts, body) = response.into_parts();

            if request.allow_cookies {
                for value in parts.headers.get_all(http::header::SET_COOKIE) {
                    if let Ok(value) = value.to_str() {
                        self.cookies.store_from_response(&request.url, value);
                    }
                }
            }

            let head = ResponseHead {
                status: parts.status.as_u16(),
                headers: flatten_headers(&parts.headers),
                mime_hint: mime_hint(&request.url),
            };

            if head.status == 304 && revalidating.is_some() {
                if let Some(entry) =
                    self.cache
                        .update_from_not_modified(&request.url, &request.method, &head.headers)
                {
                    return self.deliver_cached(id, &request, entry, delegate);
                }
            }

            if let Some(next) = redirect_request(&request, &head) {
                if redirects >= self.config.max_redirects {
                    return Err(io::Error::other(format!(
                        "too many redirects (max {})",
                        self.config.max_redirects
                    )));
                }
                if let Some(next) = delegate.on_redirect(id, &head, next) {
                    tracing::debug!(
                        task = %id,
                        status = head.status,
                        from = %request.url,
                        to = %next.url,
                        "Following redirect"
                    );
                    request = next;
                    redirects += 1;
                    continue;
                }
            }

            let cacheable = request.method == Method::GET && (200..300).contains(&head.status);
            let collected = self
                .stream_body(id, body, request.timeout, delegate, cacheable)
                .await?;
            if let Some(data) = collected {
                self.cache
                    .store(&request.url, &request.method, head.status, &head.headers, data);
            }
            return Ok(TransportResponse::Http(head));
        }
    }

    fn cache_lookup(&self, request: &TransportRequest) -> io::Result<CacheLookup> {
        let url = &request.url;
        let method = &request.method;
        let lookup = match request.cache_policy {
            CachePolicy::Ignore => CacheLookup::Miss,
            CachePolicy::UseProtocolPolicy => match self.cache.get_any(url, method) {
                Some(entry) if entry.is_fresh() => CacheLookup::Hit(entry),
                Some(entry) if entry.needs_revalidation() => CacheLookup::Revalidate(entry),
                _ => CacheLookup::Miss,
            },
            CachePolicy::ReturnCacheElseLoad => self
                .cache
                .get_any(url, method)
                .map_or(CacheLookup::Miss, CacheLookup::Hit),
            CachePolicy::ReturnCacheDontLoad => match self.cache.get_any(url, method) {
                Some(entry) => CacheLookup::Hit(entry),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("no cached response for {url}"),
                    ))
                }
            },
        };
        Ok(lookup)
    }

    fn deliver_cached(
        &self,
        id: TaskId,
        request: &TransportRequest,
        entry: CacheEntry,
        delegate: &dyn TransportDelegate,
    ) -> TaskOutcome {
        tracing::debug!(task = %id, url = %request.url, "Serving response from cache");
        if !entry.body.is_empty() && delegate.on_data(id, entry.body) == DataDisposition::Cancel {
            return Err(cancelled_error());
        }
        Ok(TransportResponse::Http(ResponseHead {
            status: entry.status,
            headers: entry.headers,
            mime_hint: mime_hint(&request.url),
        }))
    }

    /// Connect, send the request and wait for the response head.
    async fn send(
        &self,
        request: &TransportRequest,
        extra_headers: Headers,
        delegate: &dyn TransportDelegate,
    ) -> io::Result<http::Response<Incoming>> {
        let socket = ConnectJob::connect(&request.url, request.timeout, delegate).await?;
        let (mut sender, conn) = http1::handshake::<_, Full<Bytes>>(TokioIo::new(socket))
            .await
            .map_err(hyper_io_error)?;

        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "Connection closed with error");
            }
        });

        let http_request = self.build_request(request, extra_headers)?;
        tokio::time::timeout(request.timeout, sender.send_request(http_request))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "timed out waiting for response"))?
            .map_err(hyper_io_error)
    }

    fn build_request(
        &self,
        request: &TransportRequest,
        extra_headers: Headers,
    ) -> io::Result<Request<Full<Bytes>>> {
        let url = &request.url;
        let host = url
            .host_str()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "URL has no host"))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let target = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };

        let mut builder = Request::builder()
            .method(request.method.clone())
            .uri(target)
            .header(http::header::HOST, authority);
        for (name, value) in request.headers.iter().chain(extra_headers.iter()) {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if header_value(&request.headers, "User-Agent").is_none() {
            if let Some(user_agent) = &self.config.user_agent {
                builder = builder.header(http::header::USER_AGENT, user_agent.as_str());
            }
        }
        if request.allow_cookies && header_value(&request.headers, "Cookie").is_none() {
            if let Some(cookies) = self.cookies.cookie_header(url) {
                builder = builder.header(http::header::COOKIE, cookies);
            }
        }

        builder
            .body(Full::new(request.body.clone()))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }

    /// Forward body frames to the delegate, each within the idle timeout.
    ///
    /// Returns the whole body when `collect` is set.
    async fn stream_body(
        &self,
        id: TaskId,
        mut body: Incoming,
        idle_timeout: Duration,
        delegate: &dyn TransportDelegate,
        collect: bool,
    ) -> io::Result<Option<Bytes>> {
        let mut collected = collect.then(BytesMut::new);
        while let Some(frame) = tokio::time::timeout(idle_timeout, body.frame())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "timed out reading body"))?
        {
            let frame = frame.map_err(hyper_io_error)?;
            let Ok(data) = frame.into_data() else {
                continue;
            };
            if data.is_empty() {
                continue;
            }
            if let Some(buffer) = collected.as_mut() {
                buffer.extend_from_slice(&data);
            }
            if delegate.on_data(id, data) == DataDisposition::Cancel {
                tracing::debug!(task = %id, "Delegate aborted body");
                return Err(cancelled_error());
            }
        }
        Ok(collected.map(BytesMut::freeze))
    }
}

fn cancelled_error() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "cancelled")
}

/// The follow-up request for a redirect response, if it is one.
fn redirect_request(request: &TransportRequest, head: &ResponseHead) -> Option<TransportRequest> {
    if !matches!(head.status, 301 | 302 | 303 | 307 | 308) {
        return None;
    }
    let location = header_value(&head.headers, "Location")?;
    let url = request.url.join(location).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let mut next = request.clone();
    let becomes_get = (head.status == 303 && request.method != Method::HEAD)
        || (matches!(head.status, 301 | 302) && request.method == Method::POST);
    if becomes_get {
        next.method = Method::GET;
        next.body = Bytes::new();
        next.headers.retain(|name, _| {
            !name.eq_ignore_ascii_case("Content-Type") && !name.eq_ignore_ascii_case("Content-Length")
        });
    }
    if url.origin() != request.url.origin() {
        next.headers.retain(|name, _| {
            !name.eq_ignore_ascii_case("Authorization") && !name.eq_ignore_ascii_case("Cookie")
        });
    }
    next.url = url;
    Some(next)
}

/// Collapse repeated header fields into one comma-separated value.
fn flatten_headers(map: &HeaderMap) -> Headers {
    let mut headers = Headers::with_capacity(map.keys_len());
    for name in map.keys() {
        let values: Vec<&str> = map
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        if !values.is_empty() {
            headers.insert(name.as_str().to_string(), values.join(", "));
        }
    }
    headers
}

/// MIME type guessed from the URL's file extension.
fn mime_hint(url: &Url) -> Option<String> {
    let last = url.path_segments()?.last()?;
    let (_, extension) = last.rsplit_once('.')?;
    let mime = match extension.to_ascii_lowercase().as_str() {
        "json" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "txt" => "text/plain",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "pdf" => "application/pdf",
        _ => return None,
    };
    Some(mime.to_string())
}

fn hyper_io_error(error: hyper::Error) -> io::Error {
    let cause = std::error::Error::source(&error).and_then(|s| s.downcast_ref::<io::Error>());
    if let Some(cause) = cause {
        return io::Error::new(cause.kind(), error.to_string());
    }
    let kind = if error.is_timeout() {
        io::ErrorKind::TimedOut
    } else if error.is_incomplete_message() || error.is_closed() || error.is_canceled() {
        io::ErrorKind::ConnectionAborted
    } else {
        io::ErrorKind::Other
    };
    io::Error::new(kind, error)
}
