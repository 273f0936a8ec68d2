//! Certificate pinning for server-trust challenges.
//!
//! The handler is opt-in and fails closed: any host it cannot positively
//! vouch for is cancelled. Applications that want platform trust simply do
//! not install it.

use crate::tls::certificate::Certificate;
use crate::tls::container::PinningCertificateContainer;
use crate::tls::trust::{ChallengeDisposition, Credential, TrustChallenge};

/// Answers server-trust challenges on behalf of a session.
pub trait SecurityHandler: Send + Sync {
    fn resolve_challenge(&self, challenge: &TrustChallenge) -> ChallengeDisposition;
}

/// Pins hosts to the certificates of the containers associated with them.
///
/// In strict mode the presented chain must validate against exactly the
/// pinned certificates as anchors. Otherwise the leaf certificate must be
/// byte-identical to one of them.
#[derive(Debug, Clone)]
pub struct CertificatePinningHandler {
    containers: Vec<PinningCertificateContainer>,
    validate_server_trust: bool,
}

impl CertificatePinningHandler {
    pub fn new(containers: Vec<PinningCertificateContainer>, validate_server_trust: bool) -> Self {
        Self {
            containers,
            validate_server_trust,
        }
    }

    /// Handler comparing only the presented leaf certificate.
    pub fn leaf(containers: Vec<PinningCertificateContainer>) -> Self {
        Self::new(containers, false)
    }

    /// Handler validating the full chain against the pinned anchors.
    pub fn strict(containers: Vec<PinningCertificateContainer>) -> Self {
        Self::new(containers, true)
    }

    pub fn validates_server_trust(&self) -> bool {
        self.validate_server_trust
    }

    /// Certificates of every container associated with `host`, in
    /// container order.
    pub fn candidates(&self, host: &str) -> Vec<&Certificate> {
        self.containers
            .iter()
            .filter(|container| container.is_associated_with(host))
            .flat_map(|container| container.certificates.iter())
            .collect()
    }
}

impl SecurityHandler for CertificatePinningHandler {
    fn resolve_challenge(&self, challenge: &TrustChallenge) -> ChallengeDisposition {
        let host = challenge.host.as_str();

        if self.containers.is_empty() {
            tracing::debug!(host = %host, "No pinning containers configured, cancelling");
            return ChallengeDisposition::CancelAuthenticationChallenge;
        }

        let Some(trust) = challenge
            .server_trust
            .as_deref()
            .filter(|trust| !trust.certificates().is_empty())
        else {
            tracing::debug!(host = %host, "No evaluable server trust, cancelling");
            return ChallengeDisposition::CancelAuthenticationChallenge;
        };

        let candidates = self.candidates(host);
        if candidates.is_empty() {
            tracing::debug!(host = %host, "No pinning rule for host, cancelling");
            return ChallengeDisposition::CancelAuthenticationChallenge;
        }

        let trusted = if self.validate_server_trust {
            let anchors: Vec<Certificate> = candidates.into_iter().cloned().collect();
            let result = trust.evaluate(host, &anchors);
            tracing::debug!(host = %host, result = ?result, "Evaluated chain against pinned anchors");
            result.is_trusted()
        } else {
            let leaf = &trust.certificates()[0];
            candidates.iter().any(|pinned| pinned.der() == leaf.der())
        };

        if trusted {
            tracing::debug!(host = %host, "Pinned certificate accepted");
            ChallengeDisposition::UseCredential(Credential::for_trust(trust))
        } else {
            tracing::warn!(host = %host, "Pinned certificate mismatch, cancelling");
            ChallengeDisposition::CancelAuthenticationChallenge
        }
    }
}
