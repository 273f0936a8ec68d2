//! TLS trust material, host associations and certificate pinning.

pub mod association;
pub mod certificate;
pub mod container;
pub mod pinning;
pub mod trust;

pub use association::HostAssociation;
pub use certificate::{load_bundle, Certificate};
pub use container::PinningCertificateContainer;
pub use pinning::{CertificatePinningHandler, SecurityHandler};
pub use trust::{
    ChallengeDisposition, Credential, PeerTrust, ServerTrust, TrustChallenge, TrustResult,
};
