//! Std implementations of the netwrap connection and listener traits.
//!
//! This provides TCP connections and listeners as well as in-memory pipes, using Tokio. All of them support
//! deadlines and unblock pending operations when closed, as documented on [`netwrap::Connection`] and
//! [`netwrap::Listener`].

#![forbid(unsafe_code)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod deadline;
pub mod net;
