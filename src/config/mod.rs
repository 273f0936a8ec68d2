//! Per-call option resolution.
//!
//! Endpoint, server and session each contribute to the effective timeout,
//! headers, cookie policy, cellular policy and cache policy of a call.

pub mod parameter;
pub mod session;

pub use parameter::{cascade, ConfigurationParameter, MergeFn};
pub use session::{merge_headers, CachePolicy, ParameterSet, ResolvedOptions, SessionConfig};
