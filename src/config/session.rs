//! Session defaults and cascade resolution of the five per-call options.

use crate::config::parameter::{cascade, ConfigurationParameter};
use crate::http::headers::Headers;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a request may use locally cached responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Follow the response's Cache-Control freshness rules.
    UseProtocolPolicy,
    /// Never answer from the local cache.
    #[default]
    Ignore,
    /// Answer from the cache even when stale, load otherwise.
    ReturnCacheElseLoad,
    /// Answer from the cache or fail; never load.
    ReturnCacheDontLoad,
}

/// Session-wide defaults, the least specific level of the cascade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle timeout applied to each request.
    pub request_timeout: Duration,

    /// Upper bound for a whole request including its body.
    pub resource_timeout: Duration,

    /// Headers sent with every request.
    pub headers: Headers,

    pub allow_cookies: bool,

    pub allow_cellular: bool,

    pub cache_policy: CachePolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            resource_timeout: Duration::from_secs(60 * 60 * 24 * 7),
            headers: Headers::new(),
            allow_cookies: true,
            allow_cellular: true,
            cache_policy: CachePolicy::Ignore,
        }
    }
}

/// The five cascaded parameters of one configuration level.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    pub timeout: ConfigurationParameter<Duration>,
    pub headers: ConfigurationParameter<Headers>,
    pub allow_cookies: ConfigurationParameter<bool>,
    pub allow_cellular: ConfigurationParameter<bool>,
    pub cache_policy: ConfigurationParameter<CachePolicy>,
}

impl ParameterSet {
    /// All five parameters set to `Inherit`.
    pub fn inherit() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: ConfigurationParameter<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_headers(mut self, headers: ConfigurationParameter<Headers>) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_allow_cookies(mut self, allow: ConfigurationParameter<bool>) -> Self {
        self.allow_cookies = allow;
        self
    }

    pub fn with_allow_cellular(mut self, allow: ConfigurationParameter<bool>) -> Self {
        self.allow_cellular = allow;
        self
    }

    pub fn with_cache_policy(mut self, policy: ConfigurationParameter<CachePolicy>) -> Self {
        self.cache_policy = policy;
        self
    }
}

/// Merge parameter that unions header maps, local entries winning.
pub fn merge_headers(local: Headers) -> ConfigurationParameter<Headers> {
    ConfigurationParameter::merge(local, |mut parent, local| {
        parent.extend(local);
        parent
    })
}

/// Effective options of one call.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOptions {
    pub timeout: Duration,
    pub headers: Headers,
    pub allow_cookies: bool,
    pub allow_cellular: bool,
    pub cache_policy: CachePolicy,
}

impl ResolvedOptions {
    /// Resolve endpoint → server → session for all five options.
    pub fn resolve(endpoint: &ParameterSet, server: &ParameterSet, session: &SessionConfig) -> Self {
        Self {
            timeout: cascade(&endpoint.timeout, &server.timeout, session.request_timeout),
            headers: cascade(&endpoint.headers, &server.headers, session.headers.clone()),
            allow_cookies: cascade(
                &endpoint.allow_cookies,
                &server.allow_cookies,
                session.allow_cookies,
            ),
            allow_cellular: cascade(
                &endpoint.allow_cellular,
                &server.allow_cellular,
                session.allow_cellular,
            ),
            cache_policy: cascade(
                &endpoint.cache_policy,
                &server.cache_policy,
                session.cache_policy,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert!(config.allow_cookies);
        assert!(config.allow_cellular);
        assert_eq!(config.cache_policy, CachePolicy::Ignore);
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_all_inherit_yields_session_values() {
        let mut session = SessionConfig::default();
        session.headers = headers(&[("Accept", "*/*")]);

        let resolved = ResolvedOptions::resolve(&ParameterSet::inherit(), &ParameterSet::inherit(), &session);
        assert_eq!(resolved.timeout, session.request_timeout);
        assert_eq!(resolved.headers, session.headers);
        assert_eq!(resolved.cache_policy, CachePolicy::Ignore);
    }

    #[test]
    fn test_server_timeout_override() {
        let server =
            ParameterSet::inherit().with_timeout(ConfigurationParameter::Override(Duration::from_secs(30)));
        let resolved = ResolvedOptions::resolve(&ParameterSet::inherit(), &server, &SessionConfig::default());
        assert_eq!(resolved.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_header_merge_across_levels() {
        let mut session = SessionConfig::default();
        session.headers = headers(&[("User-Agent", "session"), ("Accept", "*/*")]);

        let server = ParameterSet::inherit().with_headers(merge_headers(headers(&[("X-Server", "1")])));
        let endpoint = ParameterSet::inherit()
            .with_headers(merge_headers(headers(&[("Accept", "application/json")])));

        let resolved = ResolvedOptions::resolve(&endpoint, &server, &session);
        assert_eq!(
            resolved.headers,
            headers(&[
                ("User-Agent", "session"),
                ("Accept", "application/json"),
                ("X-Server", "1"),
            ])
        );
    }

    #[test]
    fn test_endpoint_override_beats_server_override() {
        let server = ParameterSet::inherit()
            .with_allow_cookies(ConfigurationParameter::Override(false))
            .with_cache_policy(ConfigurationParameter::Override(CachePolicy::UseProtocolPolicy));
        let endpoint = ParameterSet::inherit().with_allow_cookies(ConfigurationParameter::Override(true));

        let resolved = ResolvedOptions::resolve(&endpoint, &server, &SessionConfig::default());
        assert!(resolved.allow_cookies);
        assert_eq!(resolved.cache_policy, CachePolicy::UseProtocolPolicy);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"allow_cookies": false, "cache_policy": "return_cache_else_load"}"#)
                .unwrap();
        assert!(!config.allow_cookies);
        assert_eq!(config.cache_policy, CachePolicy::ReturnCacheElseLoad);
        assert_eq!(config.request_timeout, Duration::from_secs(60));
    }
}
