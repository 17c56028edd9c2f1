//! Connection listeners and the listener wrapper.
//!
//! To get started, see [`Listener`] and [`wrap`].

use std::io;
use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{Address, BoxConnection};

mod wrapped;

pub use wrapped::{
    AcceptFn, AddressFn, CloseFn, Override, WrappedListener, on_accept, on_address, on_close, wrap,
};

/// A listener for stream connections.
///
/// # Example
///
/// ```no_run
/// use netwrap::{Connection, Listener};
///
/// async fn serve(listener: impl Listener) -> std::io::Result<()> {
///     loop {
///         let connection = listener.accept().await?;
///         println!("accepted {}", connection.remote_address());
///         connection.close()?;
///     }
/// }
/// ```
pub trait Listener: core::fmt::Debug + Send + Sync {
    /// Waits for and returns the next connection to the listener.
    fn accept(&self) -> BoxFuture<'_, io::Result<BoxConnection>>;

    /// Closes the listener.
    ///
    /// Any pending [`accept`](Self::accept) is unblocked and returns an error.
    fn close(&self) -> io::Result<()>;

    /// Returns the listener's network address.
    fn address(&self) -> Address;
}

impl<T: Listener + ?Sized> Listener for Box<T> {
    fn accept(&self) -> BoxFuture<'_, io::Result<BoxConnection>> {
        (**self).accept()
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }

    fn address(&self) -> Address {
        (**self).address()
    }
}

impl<T: Listener + ?Sized> Listener for Arc<T> {
    fn accept(&self) -> BoxFuture<'_, io::Result<BoxConnection>> {
        (**self).accept()
    }

    fn close(&self) -> io::Result<()> {
        (**self).close()
    }

    fn address(&self) -> Address {
        (**self).address()
    }
}
