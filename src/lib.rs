//! # netcall
//!
//! Typed HTTP calls over a callback-driven transport.
//!
//! A call is described by an [`Endpoint`] (path, task, response decoding) and
//! issued against a [`Server`] (base URL plus a [`NetworkSession`]). Options
//! such as timeout, headers and cache policy cascade from endpoint to server
//! to session configuration. Every call hands back a [`ResponseFuture`] that
//! completes exactly once, with the decoded response or a [`NetError`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use netcall::http::{HttpResponse, RequestTask};
//! use netcall::service::{Endpoint, EndpointRequest, Server, ServerDefinition};
//! use netcall::{NetError, NetworkSession};
//!
//! #[derive(Clone)]
//! struct Items;
//!
//! impl Endpoint for Items {
//!     type Request = ();
//!     type Response = Vec<String>;
//!
//!     fn path(&self) -> &str {
//!         "items"
//!     }
//!
//!     fn endpoint_request(&self, _: ()) -> Result<EndpointRequest, NetError> {
//!         Ok(EndpointRequest::to(self, RequestTask::Get))
//!     }
//!
//!     fn response(&self, response: HttpResponse) -> Result<Vec<String>, NetError> {
//!         response.error_for_status()?.json()
//!     }
//! }
//!
//! let server = ServerDefinition::parse(NetworkSession::new()?, "https://svc.example")?;
//! let items = server.call(&Items, ()).await?;
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error type and I/O fault classification
//! - [`config`] - Configuration parameters and their cascade
//! - [`http`] - Headers, bodies, requests, responses and status codes
//! - [`service`] - Endpoint and server abstractions
//! - [`session`] - Network session, response futures and task registry
//! - [`tls`] - Certificates, host associations and certificate pinning
//! - [`transport`] - Default transport over tokio, BoringSSL and hyper

pub mod base;
pub mod config;
pub mod http;
pub mod service;
pub mod session;
pub mod tls;
pub mod transport;

pub use base::NetError;
pub use config::{ConfigurationParameter, SessionConfig};
pub use service::{Endpoint, Server, ServerDefinition};
pub use session::{NetworkSession, ResponseFuture};
