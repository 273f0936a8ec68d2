//! Ergonomic error context helpers.
//!
//! Transports report faults as [`io::Error`]; these helpers fold them into
//! the closed transport taxonomy of [`NetError`].

use crate::base::neterror::NetError;
use std::io;

/// Classify a transport fault.
///
/// Timeouts and connectivity losses get dedicated variants, everything else
/// is carried as [`NetError::Unknown`] with the optional `note`.
pub fn classify_io_error(error: io::Error, note: Option<String>) -> NetError {
    match error.kind() {
        io::ErrorKind::TimedOut => NetError::RequestTimeout,
        io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::ConnectionRefused
        | io::ErrorKind::NotConnected
        | io::ErrorKind::BrokenPipe
        | io::ErrorKind::UnexpectedEof => NetError::NoConnection,
        _ => NetError::unknown(error, note),
    }
}

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Classify an IO error raised while talking to `host`.
    ///
    /// # Example
    /// ```ignore
    /// use netcall::base::IoResultExt;
    ///
    /// let stream = TcpStream::connect(addr).await
    ///     .transport_context("example.com")?;
    /// ```
    fn transport_context(self, host: &str) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn transport_context(self, host: &str) -> Result<T, NetError> {
        self.map_err(|e| classify_io_error(e, Some(format!("while talking to {host}"))))
    }
}
