//! Trusted certificate material.

use crate::base::neterror::NetError;
use boring::x509::{X509Ref, X509};
use bytes::Bytes;
use std::fmt;
use std::fs;
use std::path::Path;

/// File extensions read from a certificate bundle, compared case-insensitively.
pub const BUNDLE_EXTENSIONS: [&str; 3] = ["cer", "crt", "der"];

/// A DER-encoded X.509 certificate.
///
/// Equality is byte equality of the encoding.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    der: Bytes,
}

impl Certificate {
    /// Wrap DER bytes after checking they parse as X.509.
    pub fn from_der(der: impl Into<Bytes>) -> Result<Self, NetError> {
        let der = der.into();
        X509::from_der(&der).map_err(|e| NetError::certificate_load("<der>", e))?;
        Ok(Self { der })
    }

    /// Parse every certificate in a PEM document.
    pub fn from_pem(pem: &[u8]) -> Result<Vec<Self>, NetError> {
        let stack = X509::stack_from_pem(pem).map_err(|e| NetError::certificate_load("<pem>", e))?;
        if stack.is_empty() {
            return Err(NetError::certificate_load("<pem>", "no certificates found"));
        }
        stack.iter().map(|cert| Self::from_x509(cert)).collect()
    }

    pub(crate) fn from_x509(cert: &X509Ref) -> Result<Self, NetError> {
        let der = cert
            .to_der()
            .map_err(|e| NetError::certificate_load("<x509>", e))?;
        Ok(Self { der: der.into() })
    }

    /// Raw DER encoding.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub(crate) fn to_x509(&self) -> Option<X509> {
        X509::from_der(&self.der).ok()
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Load every certificate of a bundle directory.
///
/// Files ending in `.cer`, `.crt` or `.der` are parsed as DER and then as
/// PEM; files that are neither are skipped. Entries are visited in file name
/// order.
pub fn load_bundle(dir: impl AsRef<Path>) -> Result<Vec<Certificate>, NetError> {
    let dir = dir.as_ref();
    let dir_display = dir.display().to_string();
    let entries = fs::read_dir(dir).map_err(|e| NetError::certificate_load(&dir_display, e))?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_bundle_extension(path))
        .collect();
    paths.sort();

    let mut certificates = Vec::new();
    for path in paths {
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable certificate file");
                continue;
            }
        };

        if let Ok(cert) = Certificate::from_der(data.clone()) {
            certificates.push(cert);
            continue;
        }
        match Certificate::from_pem(&data) {
            Ok(mut certs) => certificates.append(&mut certs),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping invalid certificate file");
            }
        }
    }

    tracing::debug!(bundle = %dir_display, count = certificates.len(), "Loaded certificate bundle");
    Ok(certificates)
}

fn has_bundle_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            BUNDLE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_is_rejected() {
        assert!(matches!(
            Certificate::from_der(Bytes::from_static(b"not a certificate")),
            Err(NetError::CertificateLoad { .. })
        ));
        assert!(Certificate::from_pem(b"-----BEGIN NOTHING-----").is_err());
    }

    #[test]
    fn test_extension_filter() {
        assert!(has_bundle_extension(Path::new("a/root.CER")));
        assert!(has_bundle_extension(Path::new("leaf.crt")));
        assert!(has_bundle_extension(Path::new("leaf.Der")));
        assert!(!has_bundle_extension(Path::new("leaf.pem")));
        assert!(!has_bundle_extension(Path::new("README")));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let result = load_bundle("/nonexistent/netcall/bundle");
        assert!(matches!(result, Err(NetError::CertificateLoad { .. })));
    }
}
