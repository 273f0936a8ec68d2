//! HTTP message model: headers, bodies, requests, responses and status codes.

pub mod body;
pub mod headers;
pub mod query;
pub mod request;
pub mod response;
pub mod status;

// Re-exports for convenience
pub use body::HttpBody;
pub use headers::{Charset, ContentType, Header, Headers, HeadersExt};
pub use query::{QueryParameters, QueryValue};
pub use request::{HttpRequest, RequestTask};
pub use response::HttpResponse;
pub use status::HttpStatusCode;
