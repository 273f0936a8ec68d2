//! Request and response bodies tagged with their media type.

use crate::base::neterror::NetError;
use crate::http::headers::{Charset, ContentType, Headers, CONTENT_TYPE};
use bytes::Bytes;

const OCTET_STREAM: &str = "application/octet-stream";

/// Body bytes plus the media type they are sent or received as.
///
/// Every non-empty variant derives exactly one `Content-Type` header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HttpBody {
    #[default]
    Empty,
    /// Bytes of an unrecognised media type.
    Undefined(Bytes),
    Plain(Bytes, Charset),
    Json(Bytes, Charset),
    Xml(Bytes, Charset),
    UrlEncoded(Bytes, Charset),
    Html(Bytes, Charset),
    ImageJpeg(Bytes),
    ImagePng(Bytes),
    Pdf(Bytes),
}

impl HttpBody {
    /// Build a body from raw bytes and an optional content type.
    ///
    /// Missing bytes always give [`HttpBody::Empty`]; bytes without a
    /// content type give [`HttpBody::Undefined`].
    pub fn from_data(data: Option<Bytes>, content_type: Option<ContentType>) -> Self {
        let Some(data) = data else {
            return HttpBody::Empty;
        };
        match content_type {
            None => HttpBody::Undefined(data),
            Some(ContentType::Plain(charset)) => HttpBody::Plain(data, charset),
            Some(ContentType::Html(charset)) => HttpBody::Html(data, charset),
            Some(ContentType::Json(charset)) => HttpBody::Json(data, charset),
            Some(ContentType::Xml(charset)) => HttpBody::Xml(data, charset),
            Some(ContentType::FormUrlEncoded(charset)) => HttpBody::UrlEncoded(data, charset),
            Some(ContentType::ImageJpeg) => HttpBody::ImageJpeg(data),
            Some(ContentType::ImagePng) => HttpBody::ImagePng(data),
            Some(ContentType::Pdf) => HttpBody::Pdf(data),
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        HttpBody::Plain(Bytes::from(text.into()), Charset::Utf8)
    }

    /// Serialize `value` as a UTF-8 JSON body.
    #[cfg(feature = "json")]
    pub fn json<T: serde::Serialize>(value: &T) -> Result<Self, NetError> {
        let data =
            serde_json::to_vec(value).map_err(|e| NetError::Serialization(e.to_string()))?;
        Ok(HttpBody::Json(Bytes::from(data), Charset::Utf8))
    }

    /// Form-encode `pairs` as an url-encoded body.
    pub fn form<K, V, I>(pairs: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        HttpBody::UrlEncoded(Bytes::from(encoded), Charset::Utf8)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, HttpBody::Empty)
    }

    /// Raw bytes, empty for [`HttpBody::Empty`].
    pub fn data(&self) -> Bytes {
        match self {
            HttpBody::Empty => Bytes::new(),
            HttpBody::Undefined(data)
            | HttpBody::Plain(data, _)
            | HttpBody::Json(data, _)
            | HttpBody::Xml(data, _)
            | HttpBody::UrlEncoded(data, _)
            | HttpBody::Html(data, _)
            | HttpBody::ImageJpeg(data)
            | HttpBody::ImagePng(data)
            | HttpBody::Pdf(data) => data.clone(),
        }
    }

    pub fn content_type(&self) -> Option<ContentType> {
        match self {
            HttpBody::Empty | HttpBody::Undefined(_) => None,
            HttpBody::Plain(_, charset) => Some(ContentType::Plain(*charset)),
            HttpBody::Json(_, charset) => Some(ContentType::Json(*charset)),
            HttpBody::Xml(_, charset) => Some(ContentType::Xml(*charset)),
            HttpBody::UrlEncoded(_, charset) => Some(ContentType::FormUrlEncoded(*charset)),
            HttpBody::Html(_, charset) => Some(ContentType::Html(*charset)),
            HttpBody::ImageJpeg(_) => Some(ContentType::ImageJpeg),
            HttpBody::ImagePng(_) => Some(ContentType::ImagePng),
            HttpBody::Pdf(_) => Some(ContentType::Pdf),
        }
    }

    /// Headers derived from the body.
    pub fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        let value = match self {
            HttpBody::Empty => return headers,
            HttpBody::Undefined(_) => OCTET_STREAM.to_string(),
            other => match other.content_type() {
                Some(content_type) => content_type.header_value(),
                None => return headers,
            },
        };
        headers.insert(CONTENT_TYPE.to_string(), value);
        headers
    }

    /// Decode the body as text in its declared charset.
    pub fn text(&self) -> Result<String, NetError> {
        let data = self.data();
        match self.content_type().and_then(|ct| ct.charset()) {
            // ISO-8859-1 bytes are the first 256 code points.
            Some(Charset::IsoLatin1) => Ok(data.iter().map(|&b| b as char).collect()),
            Some(Charset::IsoLatin2) => {
                let (text, malformed) =
                    encoding_rs::ISO_8859_2.decode_without_bom_handling(&data);
                if malformed {
                    return Err(NetError::InvalidResponse(
                        "body is not valid ISO-8859-2".to_string(),
                    ));
                }
                Ok(text.into_owned())
            }
            Some(Charset::Ascii) if !data.is_ascii() => Err(NetError::InvalidResponse(
                "body is not valid ASCII".to_string(),
            )),
            _ => String::from_utf8(data.to_vec())
                .map_err(|e| NetError::InvalidResponse(format!("body is not valid UTF-8: {e}"))),
        }
    }

    /// Deserialize a JSON body.
    #[cfg(feature = "json")]
    pub fn decode_json<T: serde::de::DeserializeOwned>(&self) -> Result<T, NetError> {
        serde_json::from_slice(&self.data()).map_err(|e| NetError::Deserialization(e.to_string()))
    }
}
