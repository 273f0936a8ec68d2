//! Pinning rules: a host association plus its trusted certificates.

use crate::base::neterror::NetError;
use crate::tls::association::HostAssociation;
use crate::tls::certificate::{load_bundle, Certificate};
use std::path::Path;
use std::sync::Arc;

/// Certificates trusted for the hosts of one [`HostAssociation`].
///
/// Read-only after construction; clones share the certificate list.
#[derive(Debug, Clone)]
pub struct PinningCertificateContainer {
    pub association: HostAssociation,
    pub certificates: Arc<[Certificate]>,
}

impl PinningCertificateContainer {
    pub fn new(association: HostAssociation, certificates: Vec<Certificate>) -> Self {
        Self {
            association,
            certificates: certificates.into(),
        }
    }

    /// Build a container from every certificate of a bundle directory.
    pub fn from_bundle(
        association: HostAssociation,
        dir: impl AsRef<Path>,
    ) -> Result<Self, NetError> {
        Ok(Self::new(association, load_bundle(dir)?))
    }

    pub fn is_associated_with(&self, host: &str) -> bool {
        self.association.is_associated_with(host)
    }
}
