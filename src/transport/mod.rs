//! Concrete transport: tokio + BoringSSL + hyper HTTP/1.1.
//!
//! - [`HyperTransport`]: the [`Transport`] used by default sessions
//! - [`CookieJar`] / [`HttpCache`]: per-transport cookie and response state
//!
//! [`Transport`]: crate::session::transport::Transport

pub mod connectjob;
pub mod cookiejar;
pub mod httpcache;
pub mod hypertransport;

pub use cookiejar::CookieJar;
pub use httpcache::{CacheEntry, HttpCache};
pub use hypertransport::HyperTransport;

use std::time::Duration;

/// Configuration options for [`HyperTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Upper bound for a whole task, redirects included.
    pub resource_timeout: Duration,

    /// Redirects followed before a task fails.
    pub max_redirects: usize,

    /// Maximum number of cached responses.
    pub cache_max_entries: usize,

    /// Maximum total size of cached bodies.
    pub cache_max_bytes: usize,

    /// Worker threads of the callback runtime.
    pub worker_threads: usize,

    /// `User-Agent` sent when a request has none.
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            resource_timeout: Duration::from_secs(60 * 60 * 24 * 7),
            max_redirects: 20,
            cache_max_entries: 1000,
            cache_max_bytes: 50 * 1024 * 1024,
            worker_threads: 2,
            user_agent: Some(concat!("netcall/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}
