//! Completed response handed to the caller.

use crate::base::neterror::NetError;
use crate::http::body::HttpBody;
use crate::http::headers::{header_value, ContentType, Headers, CONTENT_TYPE};
use crate::http::status::HttpStatusCode;
use crate::session::transport::ResponseHead;
use bytes::Bytes;

/// Status, headers and body of a completed request.
///
/// Produced once per request and owned by the caller after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: HttpStatusCode,
    pub headers: Headers,
    pub body: HttpBody,
}

impl HttpResponse {
    /// Build a response from its head and the accumulated body bytes.
    ///
    /// The content type comes from the `Content-Type` header, falling back
    /// to the transport's MIME hint when the header is absent.
    pub fn from_head(head: ResponseHead, data: Option<Bytes>) -> Self {
        let content_type = header_value(&head.headers, CONTENT_TYPE)
            .or(head.mime_hint.as_deref())
            .and_then(ContentType::parse);
        Self {
            status: HttpStatusCode::from_u16(head.status),
            body: HttpBody::from_data(data, content_type),
            headers: head.headers,
        }
    }

    pub fn status(&self) -> HttpStatusCode {
        self.status
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        header_value(&self.headers, name)
    }

    pub fn bytes(&self) -> Bytes {
        self.body.data()
    }

    pub fn text(&self) -> Result<String, NetError> {
        self.body.text()
    }

    #[cfg(feature = "json")]
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        self.body.decode_json()
    }

    /// Fail with [`NetError::UnexpectedStatus`] unless the status is 2xx.
    pub fn error_for_status(self) -> Result<Self, NetError> {
        if self.status.is_success() {
            Ok(self)
        } else {
            Err(NetError::UnexpectedStatus(self.status.as_u16()))
        }
    }
}
