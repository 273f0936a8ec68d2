//! Endpoints and servers: typed calls over a [`NetworkSession`].
//!
//! [`NetworkSession`]: crate::session::NetworkSession

pub mod endpoint;
pub mod server;

pub use endpoint::{Endpoint, EndpointRequest};
pub use server::{join_path, Server, ServerDefinition};
