//! In-memory HTTP response cache.
//!
//! Honours `Cache-Control` (`max-age`, `no-store`, `no-cache`) and keeps
//! `ETag`/`Last-Modified` validators for conditional revalidation. Which
//! entries a request may use is decided by its [`CachePolicy`].
//!
//! [`CachePolicy`]: crate::config::CachePolicy

use crate::http::headers::{header_value, Headers};
use bytes::Bytes;
use dashmap::DashMap;
use http::Method;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use url::Url;

/// URL (without fragment) plus method.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    url: String,
    method: Method,
}

impl CacheKey {
    pub fn new(url: &Url, method: &Method) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            url: url.into(),
            method: method.clone(),
        }
    }
}

/// A stored response.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: u16,
    pub headers: Headers,
    pub body: Bytes,
    pub cached_at: Instant,
    /// Freshness lifetime from `max-age`.
    pub ttl: Option<Duration>,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
}

impl CacheEntry {
    pub fn is_fresh(&self) -> bool {
        match self.ttl {
            Some(ttl) => self.cached_at.elapsed() < ttl,
            None => false,
        }
    }

    /// Stale but revalidatable with a conditional request.
    pub fn needs_revalidation(&self) -> bool {
        !self.is_fresh() && (self.etag.is_some() || self.last_modified.is_some())
    }

    /// Conditional request headers built from the validators.
    pub fn conditional_headers(&self) -> Headers {
        let mut headers = Headers::new();
        if let Some(etag) = &self.etag {
            headers.insert("If-None-Match".to_string(), etag.clone());
        }
        if let Some(last_modified) = &self.last_modified {
            headers.insert("If-Modified-Since".to_string(), last_modified.clone());
        }
        headers
    }
}

/// Thread-safe response cache with entry and byte limits.
pub struct HttpCache {
    entries: DashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    current_size: AtomicUsize,
    max_size_bytes: usize,
}

impl Default for HttpCache {
    fn default() -> Self {
        Self::with_limits(1000, 50 * 1024 * 1024)
    }
}

impl HttpCache {
    pub fn with_limits(max_entries: usize, max_size_bytes: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            current_size: AtomicUsize::new(0),
            max_size_bytes,
        }
    }

    /// Fresh entry only.
    pub fn get(&self, url: &Url, method: &Method) -> Option<CacheEntry> {
        self.get_any(url, method).filter(CacheEntry::is_fresh)
    }

    /// Any stored entry, stale or not.
    pub fn get_any(&self, url: &Url, method: &Method) -> Option<CacheEntry> {
        if !is_cacheable_method(method) {
            return None;
        }
        self.entries
            .get(&CacheKey::new(url, method))
            .map(|entry| entry.clone())
    }

    /// Store a response if its status and `Cache-Control` permit it.
    pub fn store(&self, url: &Url, method: &Method, status: u16, headers: &Headers, body: Bytes) {
        if !is_cacheable_method(method) || !(200..300).contains(&status) {
            return;
        }
        if body.len() > self.max_size_bytes {
            return;
        }

        let cache_control = parse_cache_control(headers);
        if cache_control.no_store {
            return;
        }
        let ttl = if cache_control.no_cache {
            None
        } else {
            cache_control.max_age.map(Duration::from_secs)
        };

        let entry = CacheEntry {
            status,
            headers: headers.clone(),
            body,
            cached_at: Instant::now(),
            ttl,
            etag: header_value(headers, "ETag").map(str::to_string),
            last_modified: header_value(headers, "Last-Modified").map(str::to_string),
        };

        let key = CacheKey::new(url, method);
        self.remove_by_key(&key);
        self.maybe_evict(entry.body.len());
        self.current_size.fetch_add(entry.body.len(), Ordering::Relaxed);
        self.entries.insert(key, entry);
    }

    /// Refresh an entry from a `304 Not Modified` response and return it.
    pub fn update_from_not_modified(
        &self,
        url: &Url,
        method: &Method,
        headers: &Headers,
    ) -> Option<CacheEntry> {
        let key = CacheKey::new(url, method);
        let mut entry = self.entries.get_mut(&key)?;

        for name in ["Cache-Control", "ETag", "Expires", "Date", "Last-Modified"] {
            if let Some(value) = header_value(headers, name) {
                entry.headers.retain(|k, _| !k.eq_ignore_ascii_case(name));
                entry.headers.insert(name.to_string(), value.to_string());
            }
        }
        if let Some(max_age) = parse_cache_control(headers).max_age {
            entry.ttl = Some(Duration::from_secs(max_age));
        }
        if let Some(etag) = header_value(headers, "ETag") {
            entry.etag = Some(etag.to_string());
        }
        entry.cached_at = Instant::now();
        Some(entry.clone())
    }

    pub fn remove(&self, url: &Url, method: &Method) {
        self.remove_by_key(&CacheKey::new(url, method));
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.current_size.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.current_size.load(Ordering::Relaxed)
    }

    fn maybe_evict(&self, new_entry_size: usize) {
        while self.entries.len() >= self.max_entries && !self.entries.is_empty() {
            self.evict_oldest();
        }
        while self.current_size.load(Ordering::Relaxed) + new_entry_size > self.max_size_bytes
            && !self.entries.is_empty()
        {
            self.evict_oldest();
        }
    }

    fn evict_oldest(&self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().cached_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = oldest {
            self.remove_by_key(&key);
        }
    }

    fn remove_by_key(&self, key: &CacheKey) {
        if let Some((_, entry)) = self.entries.remove(key) {
            self.current_size
                .fetch_sub(entry.body.len(), Ordering::Relaxed);
        }
    }
}

fn is_cacheable_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

#[derive(Debug, Default)]
struct CacheControl {
    no_store: bool,
    no_cache: bool,
    max_age: Option<u64>,
}

fn parse_cache_control(headers: &Headers) -> CacheControl {
    let mut cc = CacheControl::default();
    let Some(value) = header_value(headers, "Cache-Control") else {
        return cc;
    };

    for directive in value.split(',') {
        let directive = directive.trim().to_ascii_lowercase();
        if directive == "no-store" {
            cc.no_store = true;
        } else if directive == "no-cache" {
            cc.no_cache = true;
        } else if let Some(age) = directive.strip_prefix("max-age=") {
            cc.max_age = age.trim_matches('"').parse().ok();
        }
    }
    cc
}
