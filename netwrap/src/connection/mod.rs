//! Stream connections and the connection wrapper.
//!
//! To get started, see [`Connection`] and [`wrap`].

use std::io;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::Address;

mod wrapped;

pub use wrapped::{
    CloseFn, LocalAddressFn, Override, ReadFn, RemoteAddressFn, SetDeadlineFn, SetReadDeadlineFn,
    SetWriteDeadlineFn, WrappedConnection, WriteFn, on_close, on_local_address, on_read,
    on_remote_address, on_set_deadline, on_set_read_deadline, on_set_write_deadline, on_write,
    wrap,
};

/// A type-erased [`Connection`], as returned by [`Listener::accept`](crate::Listener::accept).
pub type BoxConnection = Box<dyn Connection>;

/// A bidirectional byte-stream connection.
///
/// Every method takes `&self` so that [`close`](Self::close) and the deadline setters can be called while a
/// [`read`](Self::read) or [`write`](Self::write) is pending on another task.
///
/// # Example
///
/// ```no_run
/// use netwrap::{Connection, ConnectionExt};
///
/// async fn echo(connection: impl Connection) -> std::io::Result<()> {
///     let mut buffer = [0u8; 1024];
///     loop {
///         match connection.read(&mut buffer).await? {
///             0 => break, // Connection closed.
///             read => connection.write_all(&buffer[..read]).await?,
///         }
///     }
///     connection.close()
/// }
/// ```
pub trait Connection: core::fmt::Debug + Send + Sync {
    /// Reads data from the connection into `buffer`.
    ///
    /// Returns the number of bytes read, `0` once the stream is exhausted.
    /// Waits until at least one byte is available, an error occurs or a deadline elapses, see
    /// [`set_deadline`](Self::set_deadline) and [`set_read_deadline`](Self::set_read_deadline).
    fn read<'a>(&'a self, buffer: &'a mut [u8]) -> BoxFuture<'a, io::Result<usize>>;

    /// Writes data from `buffer` to the connection.
    ///
    /// Returns the number of bytes written, which may be less than `buffer.len()`.
    /// May wait under backpressure or until a deadline elapses, see [`set_deadline`](Self::set_deadline) and
    /// [`set_write_deadline`](Self::set_write_deadline).
    fn write<'a>(&'a self, buffer: &'a [u8]) -> BoxFuture<'a, io::Result<usize>>;

    /// Closes the connection.
    ///
    /// Any pending [`read`](Self::read) or [`write`](Self::write) is unblocked and returns an error.
    fn close(&self) -> io::Result<()>;

    /// Returns the local network address, [`Address::Unknown`] if not known.
    fn local_address(&self) -> Address;

    /// Returns the remote network address, [`Address::Unknown`] if not known.
    fn remote_address(&self) -> Address;

    /// Sets the read and write deadlines of the connection.
    ///
    /// Equivalent to calling both [`set_read_deadline`](Self::set_read_deadline) and
    /// [`set_write_deadline`](Self::set_write_deadline).
    ///
    /// A deadline is an absolute time after which I/O operations fail instead of waiting. The deadline applies to
    /// all future and pending I/O, not just the immediately following call to `read` or `write`. After a deadline
    /// has been exceeded, the connection can be refreshed by setting a deadline in the future.
    ///
    /// If the deadline is exceeded, I/O operations return an error carrying
    /// [`DeadlineExceeded`](crate::DeadlineExceeded), for which [`is_timeout`](crate::is_timeout) and
    /// [`is_deadline_exceeded`](crate::is_deadline_exceeded) return `true`. Note that `is_timeout` also returns
    /// `true` for other timeouts even if no deadline has been exceeded.
    ///
    /// An idle timeout can be implemented by repeatedly extending the deadline after successful reads or writes.
    ///
    /// `None` means I/O operations do not time out.
    fn set_deadline(&self, deadline: Option<Instant>) -> io::Result<()>;

    /// Sets the deadline for future reads and any currently pending read.
    ///
    /// `None` means reads do not time out.
    fn set_read_deadline(&self, deadline: Option<Instant>) -> io::Result<()>;

    /// Sets the deadline for future writes and any currently pending write.
    ///
    /// Even if a write times out, some of the data may have been written.
    /// `None` means writes do not time out.
    fn set_write_deadline(&self, deadline: Option<Instant>) -> io::Result<()>;
}

macro_rules! forward_connection {
    () => {
        fn read<'a>(&'a self, buffer: &'a mut [u8]) -> BoxFuture<'a, io::Result<usize>> {
            (**self).read(buffer)
        }

        fn write<'a>(&'a self, buffer: &'a [u8]) -> BoxFuture<'a, io::Result<usize>> {
            (**self).write(buffer)
        }

        fn close(&self) -> io::Result<()> {
            (**self).close()
        }

        fn local_address(&self) -> Address {
            (**self).local_address()
        }

        fn remote_address(&self) -> Address {
            (**self).remote_address()
        }

        fn set_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
            (**self).set_deadline(deadline)
        }

        fn set_read_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
            (**self).set_read_deadline(deadline)
        }

        fn set_write_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
            (**self).set_write_deadline(deadline)
        }
    };
}

impl<T: Connection + ?Sized> Connection for Box<T> {
    forward_connection!();
}

impl<T: Connection + ?Sized> Connection for Arc<T> {
    forward_connection!();
}

/// Utility methods for all [`Connection`] types.
pub trait ConnectionExt: Connection {
    /// Writes all of `buffer`, issuing as many writes as needed.
    fn write_all<'a>(&'a self, buffer: &'a [u8]) -> BoxFuture<'a, io::Result<()>> {
        async move {
            let mut buffer = buffer;
            while !buffer.is_empty() {
                match self.write(buffer).await? {
                    0 => return Err(io::ErrorKind::WriteZero.into()),
                    written => buffer = &buffer[written..],
                }
            }
            Ok(())
        }
        .boxed()
    }

    /// Fills all of `buffer`, issuing as many reads as needed.
    ///
    /// Fails with [`io::ErrorKind::UnexpectedEof`] if the stream ends first.
    fn read_exact<'a>(&'a self, buffer: &'a mut [u8]) -> BoxFuture<'a, io::Result<()>> {
        async move {
            let mut filled = 0;
            while filled < buffer.len() {
                match self.read(&mut buffer[filled..]).await? {
                    0 => return Err(io::ErrorKind::UnexpectedEof.into()),
                    read => filled += read,
                }
            }
            Ok(())
        }
        .boxed()
    }
}

impl<T: Connection + ?Sized> ConnectionExt for T {}
