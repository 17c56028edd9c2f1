//! In-memory connection pairs.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use netwrap::{Address, Closed};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::deadline::{Deadline, guarded};

/// Number of writes a pipe buffers before writers wait for the reader.
pub const DEFAULT_CAPACITY: usize = 16;

/// Creates a connected pair of in-memory connections, see [`pipe_with_capacity`].
pub fn pipe() -> (PipeConnection, PipeConnection) {
    pipe_with_capacity(DEFAULT_CAPACITY)
}

/// Creates a connected pair of in-memory connections.
///
/// Data written to one end can be read from the other. Each direction buffers up to `capacity` writes, further
/// writes wait until the reader catches up. A `capacity` of `0` is treated as `1`.
pub fn pipe_with_capacity(capacity: usize) -> (PipeConnection, PipeConnection) {
    let capacity = capacity.max(1);
    let (first_sender, first_receiver) = mpsc::channel(capacity);
    let (second_sender, second_receiver) = mpsc::channel(capacity);
    let first_closed = CancellationToken::new();
    let second_closed = CancellationToken::new();

    let first = PipeConnection::new(
        first_sender,
        second_receiver,
        first_closed.clone(),
        second_closed.clone(),
    );
    let second = PipeConnection::new(second_sender, first_receiver, second_closed, first_closed);
    (first, second)
}

#[derive(Debug)]
struct Incoming {
    receiver: mpsc::Receiver<Vec<u8>>,
    /// Remainder of a chunk that did not fit into the last read.
    pending: Vec<u8>,
}

/// One end of an in-memory pipe created by [`pipe`].
///
/// Reading after the peer closed returns buffered data, then end of stream. Writing after the peer closed fails with
/// [`io::ErrorKind::BrokenPipe`]. Dropping an end closes it.
#[derive(Debug)]
pub struct PipeConnection {
    incoming: tokio::sync::Mutex<Incoming>,
    outgoing: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
    closing: AtomicBool,
    closed: CancellationToken,
    peer_closed: CancellationToken,
    read_deadline: Deadline,
    write_deadline: Deadline,
}

impl PipeConnection {
    fn new(
        sender: mpsc::Sender<Vec<u8>>,
        receiver: mpsc::Receiver<Vec<u8>>,
        closed: CancellationToken,
        peer_closed: CancellationToken,
    ) -> Self {
        Self {
            incoming: tokio::sync::Mutex::new(Incoming {
                receiver,
                pending: Vec::new(),
            }),
            outgoing: Mutex::new(Some(sender)),
            closing: AtomicBool::new(false),
            closed,
            peer_closed,
            read_deadline: Deadline::new(),
            write_deadline: Deadline::new(),
        }
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed.is_cancelled() {
            return Err(Closed.into());
        }
        Ok(())
    }

    fn sender(&self) -> io::Result<mpsc::Sender<Vec<u8>>> {
        self.outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Closed.into())
    }
}

impl Drop for PipeConnection {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

impl netwrap::Connection for PipeConnection {
    fn read<'a>(&'a self, buffer: &'a mut [u8]) -> BoxFuture<'a, io::Result<usize>> {
        guarded(&self.closed, &self.read_deadline, async move {
            if buffer.is_empty() {
                return Ok(0);
            }

            let mut incoming = self.incoming.lock().await;
            if incoming.pending.is_empty() {
                match incoming.receiver.recv().await {
                    Some(chunk) => incoming.pending = chunk,
                    // The peer closed its end.
                    None => return Ok(0),
                }
            }

            let read = buffer.len().min(incoming.pending.len());
            buffer[..read].copy_from_slice(&incoming.pending[..read]);
            incoming.pending.drain(..read);
            Ok(read)
        })
        .boxed()
    }

    fn write<'a>(&'a self, buffer: &'a [u8]) -> BoxFuture<'a, io::Result<usize>> {
        guarded(&self.closed, &self.write_deadline, async move {
            if buffer.is_empty() {
                return Ok(0);
            }

            let sender = self.sender()?;
            tokio::select! {
                biased;
                () = self.peer_closed.cancelled() => Err(io::ErrorKind::BrokenPipe.into()),
                result = sender.send(buffer.to_vec()) => match result {
                    Ok(()) => Ok(buffer.len()),
                    Err(_) => Err(io::ErrorKind::BrokenPipe.into()),
                },
            }
        })
        .boxed()
    }

    fn close(&self) -> io::Result<()> {
        if self.closing.swap(true, Ordering::AcqRel) {
            return Err(Closed.into());
        }
        self.closed.cancel();
        // Dropping the sender lets the peer drain what was written and then see end of stream.
        self.outgoing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        tracing::debug!("closing pipe");
        Ok(())
    }

    fn local_address(&self) -> Address {
        Address::Pipe
    }

    fn remote_address(&self) -> Address {
        Address::Pipe
    }

    fn set_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
        self.check_open()?;
        self.read_deadline.set(deadline);
        self.write_deadline.set(deadline);
        Ok(())
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
        self.check_open()?;
        self.read_deadline.set(deadline);
        Ok(())
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
        self.check_open()?;
        self.write_deadline.set(deadline);
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;
    use std::time::{Duration, Instant};

    use netwrap::{Address, Connection, ConnectionExt, is_closed, is_deadline_exceeded};

    use super::{pipe, pipe_with_capacity};

    #[tokio::test]
    async fn short_reads_keep_the_remainder() {
        let (client, server) = pipe();
        client.write_all(b"hello world").await.unwrap();

        let mut buffer = [0u8; 5];
        assert_eq!(server.read(&mut buffer).await.unwrap(), 5);
        assert_eq!(&buffer, b"hello");

        let mut rest = [0u8; 16];
        let read = server.read(&mut rest).await.unwrap();
        assert_eq!(&rest[..read], b" world");
    }

    #[tokio::test]
    async fn buffered_data_is_readable_after_peer_closed() {
        let (client, server) = pipe();
        client.write_all(b"last words").await.unwrap();
        client.close().unwrap();

        let mut buffer = [0u8; 10];
        server.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"last words");
        assert_eq!(server.read(&mut buffer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn writing_to_closed_peer_is_a_broken_pipe() {
        let (client, server) = pipe();
        server.close().unwrap();

        let error = client.write(b"anyone?").await.unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn dropping_an_end_closes_it() {
        let (client, server) = pipe();
        drop(server);

        let mut buffer = [0u8; 4];
        assert_eq!(client.read(&mut buffer).await.unwrap(), 0);
        assert_eq!(
            client.write(b"gone").await.unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
    }

    #[tokio::test]
    async fn full_pipe_write_times_out() {
        let (client, _server) = pipe_with_capacity(1);
        client.write_all(b"fills the buffer").await.unwrap();

        client
            .set_write_deadline(Some(Instant::now() + Duration::from_millis(20)))
            .unwrap();
        let error = client.write(b"waits").await.unwrap_err();
        assert!(is_deadline_exceeded(&error));

        client.set_write_deadline(None).unwrap();
        assert!(client.set_read_deadline(None).is_ok());
    }

    #[tokio::test]
    async fn operations_after_close_fail_with_closed() {
        let (client, _server) = pipe();
        client.close().unwrap();

        let mut buffer = [0u8; 4];
        assert!(is_closed(&client.read(&mut buffer).await.unwrap_err()));
        assert!(is_closed(&client.write(b"late").await.unwrap_err()));
        assert!(is_closed(&client.set_deadline(None).unwrap_err()));
        assert!(is_closed(&client.close().unwrap_err()));
    }

    #[test]
    fn both_ends_report_pipe_addresses() {
        let (client, server) = pipe();
        assert_eq!(client.local_address(), Address::Pipe);
        assert_eq!(server.remote_address(), Address::Pipe);
    }
}
