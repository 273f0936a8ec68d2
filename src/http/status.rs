//! Response status codes.

use http::StatusCode;
use std::fmt;

/// A response status, either a registered code or the raw value of an
/// unrecognised one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpStatusCode {
    Known(StatusCode),
    Unknown(u16),
}

impl HttpStatusCode {
    pub fn from_u16(code: u16) -> Self {
        match StatusCode::from_u16(code) {
            Ok(status) if status.canonical_reason().is_some() => HttpStatusCode::Known(status),
            _ => HttpStatusCode::Unknown(code),
        }
    }

    /// Numeric value as received.
    pub fn as_u16(&self) -> u16 {
        match self {
            HttpStatusCode::Known(status) => status.as_u16(),
            HttpStatusCode::Unknown(code) => *code,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, HttpStatusCode::Known(_))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.as_u16())
    }

    pub fn reason(&self) -> Option<&'static str> {
        match self {
            HttpStatusCode::Known(status) => status.canonical_reason(),
            HttpStatusCode::Unknown(_) => None,
        }
    }
}

impl fmt::Display for HttpStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{} {}", self.as_u16(), reason),
            None => write!(f, "{} <unknown status code>", self.as_u16()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        let ok = HttpStatusCode::from_u16(200);
        assert_eq!(ok, HttpStatusCode::Known(StatusCode::OK));
        assert!(ok.is_success());
        assert_eq!(ok.to_string(), "200 OK");
        assert!(HttpStatusCode::from_u16(404).is_known());
    }

    #[test]
    fn test_unknown_codes_keep_raw_value() {
        for code in [0, 99, 299, 599, 1000] {
            let status = HttpStatusCode::from_u16(code);
            assert_eq!(status, HttpStatusCode::Unknown(code));
            assert_eq!(status.as_u16(), code);
        }
        assert!(HttpStatusCode::Unknown(299).is_success());
    }
}
