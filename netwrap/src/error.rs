//! Classification of the errors connections and listeners report.
//!
//! Operations report [`std::io::Error`]. Implementations attach [`DeadlineExceeded`] or [`Closed`] as the inner
//! error so callers can tell these cases apart no matter which layer produced them.

use std::io;

/// An operation did not complete before its deadline.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("i/o deadline exceeded")]
pub struct DeadlineExceeded;

impl From<DeadlineExceeded> for io::Error {
    fn from(error: DeadlineExceeded) -> Self {
        io::Error::new(io::ErrorKind::TimedOut, error)
    }
}

/// An operation was attempted on, or interrupted by, a closed connection or listener.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("use of closed network connection")]
pub struct Closed;

impl From<Closed> for io::Error {
    fn from(error: Closed) -> Self {
        io::Error::new(io::ErrorKind::NotConnected, error)
    }
}

/// Returns whether `error` means an operation timed out.
///
/// This is true for every [`DeadlineExceeded`] error, and also for other timeouts such as the
/// [`io::ErrorKind::WouldBlock`] std sockets return on Unix when a socket timeout elapses.
pub fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    ) || is_deadline_exceeded(error)
}

/// Returns whether `error` was caused by an exceeded deadline.
pub fn is_deadline_exceeded(error: &io::Error) -> bool {
    error
        .get_ref()
        .is_some_and(|inner| inner.is::<DeadlineExceeded>())
}

/// Returns whether `error` was caused by using a closed connection or listener.
pub fn is_closed(error: &io::Error) -> bool {
    error.get_ref().is_some_and(|inner| inner.is::<Closed>())
}
