//! Per-operation overrides for stream connections and listeners.
//!
//! [`connection::wrap`] and [`listener::wrap`] take an existing [`Connection`] or [`Listener`] and return a value of
//! the same capability in which every operation either forwards to the original or runs a replacement function.
//! Which one is decided once, when the wrapper is built.
//!
//! ```
//! use futures::FutureExt;
//! use netwrap::connection::{self, Connection};
//!
//! fn count_written<C: Connection + 'static>(
//!     connection: C,
//!     written: std::sync::Arc<std::sync::atomic::AtomicUsize>,
//! ) -> impl Connection {
//!     connection::wrap(
//!         connection,
//!         [connection::on_write(move |inner: &C, buffer| {
//!             let written = written.clone();
//!             async move {
//!                 let count = inner.write(buffer).await?;
//!                 written.fetch_add(count, std::sync::atomic::Ordering::Relaxed);
//!                 Ok(count)
//!             }
//!             .boxed()
//!         })],
//!     )
//! }
//! ```
//!
//! # Features
//!
//! - `test-suites`: Ready-made async tests for implementations of the traits. Default: disabled.

#![forbid(unsafe_code)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod address;
pub mod connection;
mod error;
pub mod listener;

#[doc(hidden)]
#[cfg(feature = "test-suites")]
pub mod test_suite;

pub use address::Address;
pub use connection::{BoxConnection, Connection, ConnectionExt};
pub use error::{Closed, DeadlineExceeded, is_closed, is_deadline_exceeded, is_timeout};
pub use listener::Listener;
