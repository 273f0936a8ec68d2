//! Host matching for pinning rules.

use crate::base::neterror::NetError;
use regex::Regex;

/// Which hosts a pinning rule applies to.
#[derive(Debug, Clone)]
pub enum HostAssociation {
    /// Pattern searched for in the host name; anchor it to match whole hosts.
    HostRegex(Regex),
    HostList(Vec<String>),
    SingleHost(String),
}

impl HostAssociation {
    /// Compile a host pattern.
    ///
    /// A host is associated when the pattern matches anywhere in it, so
    /// `example\.com` also covers `api.example.com`. Use `^` and `$` to
    /// restrict a rule to exact hosts.
    pub fn regex(pattern: &str) -> Result<Self, NetError> {
        Regex::new(pattern)
            .map(HostAssociation::HostRegex)
            .map_err(|e| NetError::InvalidHostPattern(format!("{pattern}: {e}")))
    }

    pub fn hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        HostAssociation::HostList(hosts.into_iter().map(Into::into).collect())
    }

    pub fn host(host: impl Into<String>) -> Self {
        HostAssociation::SingleHost(host.into())
    }

    /// Whether this association covers `host`.
    pub fn is_associated_with(&self, host: &str) -> bool {
        match self {
            HostAssociation::HostRegex(regex) => regex.is_match(host),
            HostAssociation::HostList(hosts) => hosts.iter().any(|h| h == host),
            HostAssociation::SingleHost(single) => single == host,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_list() {
        let assoc = HostAssociation::hosts(["a.com", "b.com"]);
        assert!(assoc.is_associated_with("a.com"));
        assert!(assoc.is_associated_with("b.com"));
        assert!(!assoc.is_associated_with("c.com"));
    }

    #[test]
    fn test_single_host() {
        let assoc = HostAssociation::host("a.com");
        assert!(assoc.is_associated_with("a.com"));
        assert!(!assoc.is_associated_with("b.com"));
        assert!(!assoc.is_associated_with("sub.a.com"));
    }

    #[test]
    fn test_regex_searches_host() {
        let assoc = HostAssociation::regex(r".*\.example\.com").unwrap();
        assert!(assoc.is_associated_with("api.example.com"));
        assert!(!assoc.is_associated_with("example.com"));

        let domain = HostAssociation::regex(r"example\.com").unwrap();
        assert!(domain.is_associated_with("example.com"));
        assert!(domain.is_associated_with("api.example.com"));
        assert!(!domain.is_associated_with("example.org"));
    }

    #[test]
    fn test_regex_anchors_are_honoured() {
        let assoc = HostAssociation::regex(r"^(a\.com|b\.com)$").unwrap();
        assert!(assoc.is_associated_with("b.com"));
        assert!(!assoc.is_associated_with("xa.com"));
        assert!(!assoc.is_associated_with("b.com.x"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            HostAssociation::regex("(unclosed"),
            Err(NetError::InvalidHostPattern(_))
        ));
    }
}
