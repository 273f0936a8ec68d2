//! Sessions: request submission and completion tracking.
//!
//! - [`NetworkSession`]: submits requests and hands back futures
//! - [`TaskRegistry`]: pending state per transport task
//! - [`Transport`]: the consumed transport boundary

pub mod networksession;
pub mod promise;
pub mod sessiondelegate;
pub mod taskregistry;
pub mod transport;

pub use networksession::{NetworkSession, NetworkSessionBuilder};
pub use promise::{pair, Promise, ResponseFuture};
pub use sessiondelegate::{RedirectHandler, SessionDelegate};
pub use taskregistry::{PendingTask, TaskRegistry};
pub use transport::{
    DataDisposition, ResponseHead, TaskId, TaskOutcome, Transport, TransportDelegate,
    TransportRequest, TransportResponse,
};
