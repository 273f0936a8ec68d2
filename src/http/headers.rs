//! Header maps, typed headers and content-type negotiation.
//!
//! Header keys are stored exactly as given (case-sensitive map); lookups that
//! must follow HTTP semantics use [`header_value`].

use std::collections::HashMap;
use std::fmt;

/// Header map of a request or response.
pub type Headers = HashMap<String, String>;

pub const CONTENT_TYPE: &str = "Content-Type";

/// Case-insensitive lookup of a header value.
pub fn header_value<'a>(headers: &'a Headers, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Typed header helper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Header {
    UserAgent(String),
    Accept(String),
    AcceptCharset(String),
    Authorization(String),
    ContentType(ContentType),
    Custom { key: String, value: String },
}

impl Header {
    pub fn key(&self) -> &str {
        match self {
            Header::UserAgent(_) => "User-Agent",
            Header::Accept(_) => "Accept",
            Header::AcceptCharset(_) => "Accept-Charset",
            Header::Authorization(_) => "Authorization",
            Header::ContentType(_) => CONTENT_TYPE,
            Header::Custom { key, .. } => key,
        }
    }

    pub fn value(&self) -> String {
        match self {
            Header::UserAgent(value)
            | Header::Accept(value)
            | Header::AcceptCharset(value)
            | Header::Authorization(value) => value.clone(),
            Header::ContentType(content_type) => content_type.header_value(),
            Header::Custom { value, .. } => value.clone(),
        }
    }
}

/// Extension for inserting typed headers into a [`Headers`] map.
pub trait HeadersExt {
    fn set_header(&mut self, header: Header);
}

impl HeadersExt for Headers {
    fn set_header(&mut self, header: Header) {
        self.insert(header.key().to_string(), header.value());
    }
}

/// Build a header map from typed headers; later entries win.
pub fn headers_from<I: IntoIterator<Item = Header>>(headers: I) -> Headers {
    let mut map = Headers::new();
    for header in headers {
        map.set_header(header);
    }
    map
}

/// Character encodings understood in `charset=` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Ascii,
    Utf8,
    IsoLatin1,
    IsoLatin2,
}

impl Charset {
    /// Parse a charset name, `None` when unrecognised.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().trim_matches('"').to_ascii_lowercase();
        match name.as_str() {
            "ascii" | "us-ascii" => Some(Charset::Ascii),
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "iso/iec 8859-1" | "iso-8859-1" | "latin1" => Some(Charset::IsoLatin1),
            "iso/iec 8859-2" | "iso-8859-2" | "latin2" => Some(Charset::IsoLatin2),
            _ => None,
        }
    }

    /// Canonical name used in header values.
    pub fn name(&self) -> &'static str {
        match self {
            Charset::Ascii => "ascii",
            Charset::Utf8 => "utf-8",
            Charset::IsoLatin1 => "iso-8859-1",
            Charset::IsoLatin2 => "iso-8859-2",
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Media types with a dedicated body variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Plain(Charset),
    Html(Charset),
    ImageJpeg,
    ImagePng,
    Pdf,
    Json(Charset),
    Xml(Charset),
    FormUrlEncoded(Charset),
}

impl ContentType {
    /// Render the `Content-Type` header value.
    pub fn header_value(&self) -> String {
        match self {
            ContentType::Plain(charset) => format!("text/plain; charset={charset}"),
            ContentType::Html(charset) => format!("text/html; charset={charset}"),
            ContentType::ImageJpeg => "image/jpeg".to_string(),
            ContentType::ImagePng => "image/png".to_string(),
            ContentType::Pdf => "application/pdf".to_string(),
            ContentType::Json(charset) => format!("application/json; charset={charset}"),
            ContentType::Xml(charset) => format!("application/xml; charset={charset}"),
            ContentType::FormUrlEncoded(charset) => {
                format!("application/x-www-form-urlencoded; charset={charset}")
            }
        }
    }

    pub fn charset(&self) -> Option<Charset> {
        match self {
            ContentType::Plain(charset)
            | ContentType::Html(charset)
            | ContentType::Json(charset)
            | ContentType::Xml(charset)
            | ContentType::FormUrlEncoded(charset) => Some(*charset),
            ContentType::ImageJpeg | ContentType::ImagePng | ContentType::Pdf => None,
        }
    }

    /// Parse a `Content-Type` header value or a bare MIME type.
    ///
    /// Text types default to ISO-8859-1 and application types to UTF-8 when
    /// the charset is absent or unrecognised.
    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.to_ascii_lowercase();
        let charset = header_charset(&lower).and_then(Charset::from_name);

        if lower.contains("text/plain") {
            Some(ContentType::Plain(charset.unwrap_or(Charset::IsoLatin1)))
        } else if lower.contains("text/html") {
            Some(ContentType::Html(charset.unwrap_or(Charset::IsoLatin1)))
        } else if lower.contains("image/jpeg") {
            Some(ContentType::ImageJpeg)
        } else if lower.contains("image/png") {
            Some(ContentType::ImagePng)
        } else if lower.contains("application/pdf") {
            Some(ContentType::Pdf)
        } else if lower.contains("application/json") {
            Some(ContentType::Json(charset.unwrap_or(Charset::Utf8)))
        } else if lower.contains("application/xml") {
            Some(ContentType::Xml(charset.unwrap_or(Charset::Utf8)))
        } else if lower.contains("application/x-www-form-urlencoded") {
            Some(ContentType::FormUrlEncoded(charset.unwrap_or(Charset::Utf8)))
        } else {
            None
        }
    }
}

/// Extract the `charset=` parameter of a header value.
fn header_charset(value: &str) -> Option<&str> {
    let (_, rest) = value.split_once("charset=")?;
    Some(rest.split(';').next().unwrap_or(rest))
}
