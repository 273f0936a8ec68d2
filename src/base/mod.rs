//! Base types and error handling.
//!
//! - [`NetError`]: the single error type surfaced through every future
//! - [`IoResultExt`]: classification of transport I/O faults

pub mod context;
pub mod neterror;

pub use context::{classify_io_error, IoResultExt};
pub use neterror::{ErrorKind, NetError};
