//! Server trust evaluation and TLS challenge types.
//!
//! A [`TrustChallenge`] is raised by the transport once the peer's chain is
//! known. The session answers it with a [`ChallengeDisposition`]; the
//! transport aborts the handshake unless the answer lets it proceed.

use crate::tls::certificate::Certificate;
use boring::error::ErrorStack;
use boring::nid::Nid;
use boring::stack::{Stack, StackRef};
use boring::x509::store::X509StoreBuilder;
use boring::x509::{X509Ref, X509StoreContext, X509};
use std::fmt;
use std::sync::Arc;

/// Outcome of evaluating a chain against a set of anchors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustResult {
    /// Trusted and explicitly confirmed.
    Proceed,
    /// Trusted without further confirmation.
    Unspecified,
    /// Explicitly distrusted.
    Deny,
    /// Untrusted, but the failure could be overridden (bad name, unknown anchor).
    RecoverableTrustFailure,
    FatalTrustFailure,
    /// The chain could not be evaluated at all.
    Invalid,
}

impl TrustResult {
    pub fn is_trusted(&self) -> bool {
        matches!(self, TrustResult::Proceed | TrustResult::Unspecified)
    }
}

/// The peer's presented chain and the means to evaluate it.
pub trait ServerTrust: Send + Sync {
    /// Presented certificates, leaf first.
    fn certificates(&self) -> &[Certificate];

    /// Evaluate the chain for `host` against exactly `anchors`.
    fn evaluate(&self, host: &str, anchors: &[Certificate]) -> TrustResult;
}

/// Credential presented when a challenge is answered positively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub chain: Vec<Certificate>,
}

impl Credential {
    pub fn for_trust(trust: &dyn ServerTrust) -> Self {
        Self {
            chain: trust.certificates().to_vec(),
        }
    }
}

/// Answer to a [`TrustChallenge`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChallengeDisposition {
    UseCredential(Credential),
    /// Let the transport validate against the platform trust store.
    PerformDefaultHandling,
    CancelAuthenticationChallenge,
}

/// A server-trust challenge for one host.
#[derive(Clone)]
pub struct TrustChallenge {
    pub host: String,
    pub server_trust: Option<Arc<dyn ServerTrust>>,
}

impl TrustChallenge {
    pub fn new(host: impl Into<String>, server_trust: Option<Arc<dyn ServerTrust>>) -> Self {
        Self {
            host: host.into(),
            server_trust,
        }
    }
}

impl fmt::Debug for TrustChallenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrustChallenge")
            .field("host", &self.host)
            .field(
                "chain_len",
                &self.server_trust.as_ref().map(|t| t.certificates().len()),
            )
            .finish()
    }
}

/// BoringSSL-backed [`ServerTrust`] over a presented chain.
#[derive(Debug, Clone)]
pub struct PeerTrust {
    certificates: Vec<Certificate>,
}

impl PeerTrust {
    pub fn new(certificates: Vec<Certificate>) -> Self {
        Self { certificates }
    }

    /// Capture the chain presented during a handshake.
    ///
    /// A certificate that cannot be re-encoded empties the whole chain, so
    /// no later certificate ever stands in for the leaf.
    pub fn from_chain(chain: &StackRef<X509>) -> Self {
        let certificates = chain
            .iter()
            .map(Certificate::from_x509)
            .collect::<Result<Vec<_>, _>>()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Dropping unreadable peer chain");
                Vec::new()
            });
        Self { certificates }
    }

    /// Evaluate against the system trust store.
    pub fn evaluate_default(&self, host: &str) -> TrustResult {
        self.verify(host, None)
    }

    fn verify(&self, host: &str, anchors: Option<&[Certificate]>) -> TrustResult {
        let Some(leaf) = self.certificates.first().and_then(Certificate::to_x509) else {
            return TrustResult::Invalid;
        };

        match verify_chain(&leaf, &self.certificates[1..], anchors) {
            Ok(true) => {}
            Ok(false) => return TrustResult::RecoverableTrustFailure,
            Err(e) => {
                tracing::debug!(host = %host, error = %e, "Chain evaluation failed");
                return TrustResult::Invalid;
            }
        }

        if matches_host(&leaf, host) {
            TrustResult::Unspecified
        } else {
            tracing::debug!(host = %host, "Certificate does not cover host");
            TrustResult::RecoverableTrustFailure
        }
    }
}

impl ServerTrust for PeerTrust {
    fn certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    fn evaluate(&self, host: &str, anchors: &[Certificate]) -> TrustResult {
        self.verify(host, Some(anchors))
    }
}

/// Run X.509 path validation. `None` anchors means the system store.
fn verify_chain(
    leaf: &X509Ref,
    intermediates: &[Certificate],
    anchors: Option<&[Certificate]>,
) -> Result<bool, ErrorStack> {
    let mut builder = X509StoreBuilder::new()?;
    match anchors {
        Some(anchors) => {
            let mut seen: Vec<&[u8]> = Vec::with_capacity(anchors.len());
            for anchor in anchors {
                if seen.contains(&anchor.der()) {
                    continue;
                }
                seen.push(anchor.der());
                if let Some(cert) = anchor.to_x509() {
                    builder.add_cert(cert)?;
                }
            }
        }
        None => builder.set_default_paths()?,
    }
    let store = builder.build();

    let mut chain = Stack::new()?;
    for cert in intermediates.iter().filter_map(Certificate::to_x509) {
        chain.push(cert)?;
    }

    let mut context = X509StoreContext::new()?;
    context.init(&store, leaf, &chain, |ctx| ctx.verify_cert())
}

/// Match the leaf's DNS names (SAN, falling back to CN) against `host`.
fn matches_host(leaf: &X509Ref, host: &str) -> bool {
    let host = host.trim_end_matches('.');

    if let Some(names) = leaf.subject_alt_names() {
        let dns_names: Vec<&str> = names.iter().filter_map(|name| name.dnsname()).collect();
        if !dns_names.is_empty() {
            return dns_names.iter().any(|name| dns_name_matches(name, host));
        }
    }

    leaf.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .filter_map(|entry| entry.data().as_utf8().ok())
        .any(|cn| dns_name_matches(&cn, host))
}

/// Compare a certificate DNS name to a host; `*.` covers exactly one label.
fn dns_name_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.');
    if let Some(suffix) = pattern.strip_prefix("*.") {
        match host.split_once('.') {
            Some((label, rest)) => !label.is_empty() && rest.eq_ignore_ascii_case(suffix),
            None => false,
        }
    } else {
        pattern.eq_ignore_ascii_case(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dns_name_matching() {
        assert!(dns_name_matches("api.example.com", "API.example.com"));
        assert!(dns_name_matches("*.example.com", "api.example.com"));
        assert!(!dns_name_matches("*.example.com", "example.com"));
        assert!(!dns_name_matches("*.example.com", "a.b.example.com"));
        assert!(!dns_name_matches("example.com", "example.org"));
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        let trust = PeerTrust::new(Vec::new());
        assert_eq!(trust.evaluate("a.com", &[]), TrustResult::Invalid);
        assert_eq!(trust.evaluate_default("a.com"), TrustResult::Invalid);
    }

    #[test]
    fn test_trusted_results() {
        assert!(TrustResult::Proceed.is_trusted());
        assert!(TrustResult::Unspecified.is_trusted());
        assert!(!TrustResult::RecoverableTrustFailure.is_trusted());
        assert!(!TrustResult::Invalid.is_trusted());
    }
}
