//! In-memory cookie jar used when a request allows cookies.
//!
//! Cookies are keyed by their (lowercased) domain. Host-only cookies match
//! only their exact host; domain cookies also match subdomains.

use cookie::time::OffsetDateTime;
use cookie::{Cookie, Expiration};
use dashmap::DashMap;
use url::Url;

#[derive(Debug, Clone)]
struct StoredCookie {
    name: String,
    value: String,
    path: String,
    host_only: bool,
    secure: bool,
    expires_at: Option<OffsetDateTime>,
}

impl StoredCookie {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }

    fn matches_path(&self, request_path: &str) -> bool {
        if request_path == self.path {
            return true;
        }
        request_path.starts_with(&self.path)
            && (self.path.ends_with('/') || request_path[self.path.len()..].starts_with('/'))
    }
}

/// Thread-safe cookie storage.
#[derive(Debug, Default)]
pub struct CookieJar {
    store: DashMap<String, Vec<StoredCookie>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `Set-Cookie` value received from `url` and store it.
    ///
    /// Cookies whose `Domain` attribute does not cover the host are dropped.
    pub fn store_from_response(&self, url: &Url, set_cookie: &str) {
        let Some(host) = url.host_str().map(str::to_ascii_lowercase) else {
            return;
        };
        let parsed = match Cookie::parse(set_cookie) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "Ignoring malformed Set-Cookie");
                return;
            }
        };

        let (domain, host_only) = match parsed.domain() {
            Some(domain) => {
                let domain = domain.trim_start_matches('.').to_ascii_lowercase();
                if !domain_matches(&host, &domain) {
                    tracing::debug!(host = %host, domain = %domain, "Rejecting cookie for foreign domain");
                    return;
                }
                (domain, false)
            }
            None => (host.clone(), true),
        };

        let now = OffsetDateTime::now_utc();
        let expires_at = match (parsed.max_age(), parsed.expires()) {
            (Some(max_age), _) => Some(now + max_age),
            (None, Some(Expiration::DateTime(at))) => Some(at),
            _ => None,
        };

        let cookie = StoredCookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            path: parsed
                .path()
                .filter(|p| p.starts_with('/'))
                .map(str::to_string)
                .unwrap_or_else(|| default_path(url)),
            host_only,
            secure: parsed.secure().unwrap_or(false),
            expires_at,
        };

        let mut cookies = self.store.entry(domain).or_default();
        cookies.retain(|c| !(c.name == cookie.name && c.path == cookie.path));
        // An already-expired cookie only deletes its predecessor.
        if !cookie.is_expired(now) {
            cookies.push(cookie);
        }
    }

    /// `Cookie` header value for a request to `url`, if any cookie applies.
    pub fn cookie_header(&self, url: &Url) -> Option<String> {
        let host = url.host_str()?.to_ascii_lowercase();
        let secure = url.scheme() == "https";
        let path = url.path();
        let now = OffsetDateTime::now_utc();

        let mut pairs = Vec::new();
        for domain in candidate_domains(&host) {
            let Some(mut cookies) = self.store.get_mut(&domain) else {
                continue;
            };
            cookies.retain(|c| !c.is_expired(now));
            for cookie in cookies.iter() {
                if cookie.host_only && domain != host {
                    continue;
                }
                if cookie.secure && !secure {
                    continue;
                }
                if !cookie.matches_path(path) {
                    continue;
                }
                pairs.push(format!("{}={}", cookie.name, cookie.value));
            }
        }

        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Number of stored cookies.
    pub fn len(&self) -> usize {
        self.store.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.store.clear();
    }
}

/// `host` and each parent domain with at least two labels.
fn candidate_domains(host: &str) -> Vec<String> {
    let mut domains = vec![host.to_string()];
    let parts: Vec<&str> = host.split('.').collect();
    for i in 1..parts.len().saturating_sub(1) {
        domains.push(parts[i..].join("."));
    }
    domains
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain || host.ends_with(&format!(".{domain}"))
}

/// Directory of the request path, per RFC 6265 section 5.1.4.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
