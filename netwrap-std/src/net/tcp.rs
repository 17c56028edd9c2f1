//! TCP connection and listener implementation for the std platform.

use std::io::{self, ErrorKind};
use std::net::Shutdown;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use netwrap::{Address, BoxConnection, Closed};
use tokio::net::ToSocketAddrs;
use tokio_util::sync::CancellationToken;

use crate::deadline::{Deadline, guarded};

/// Active TCP connection for reading and writing data.
///
/// Closing shuts down both directions of the stream; the socket itself is released when the connection is dropped.
#[derive(Debug)]
pub struct TcpConnection {
    stream: tokio::net::TcpStream,
    local: Address,
    remote: Address,
    closing: AtomicBool,
    closed: CancellationToken,
    read_deadline: Deadline,
    write_deadline: Deadline,
}

impl TcpConnection {
    /// Connects to a remote TCP server.
    pub async fn connect(address: impl ToSocketAddrs) -> io::Result<Self> {
        let stream = tokio::net::TcpStream::connect(address).await?;
        let connection = Self::from(stream);
        tracing::debug!(local = %connection.local, remote = %connection.remote, "connected");
        Ok(connection)
    }

    fn check_open(&self) -> io::Result<()> {
        if self.closed.is_cancelled() {
            return Err(Closed.into());
        }
        Ok(())
    }
}

impl From<tokio::net::TcpStream> for TcpConnection {
    fn from(stream: tokio::net::TcpStream) -> Self {
        let to_address = |address: io::Result<std::net::SocketAddr>| {
            address.map_or(Address::Unknown, Address::Tcp)
        };
        Self {
            local: to_address(stream.local_addr()),
            remote: to_address(stream.peer_addr()),
            stream,
            closing: AtomicBool::new(false),
            closed: CancellationToken::new(),
            read_deadline: Deadline::new(),
            write_deadline: Deadline::new(),
        }
    }
}

impl netwrap::Connection for TcpConnection {
    fn read<'a>(&'a self, buffer: &'a mut [u8]) -> BoxFuture<'a, io::Result<usize>> {
        guarded(&self.closed, &self.read_deadline, async move {
            loop {
                self.stream.readable().await?;
                match self.stream.try_read(buffer) {
                    Err(error) if error.kind() == ErrorKind::WouldBlock => continue,
                    result => return result,
                }
            }
        })
        .boxed()
    }

    fn write<'a>(&'a self, buffer: &'a [u8]) -> BoxFuture<'a, io::Result<usize>> {
        guarded(&self.closed, &self.write_deadline, async move {
            loop {
                self.stream.writable().await?;
                match self.stream.try_write(buffer) {
                    Err(error) if error.kind() == ErrorKind::WouldBlock => continue,
                    result => return result,
                }
            }
        })
        .boxed()
    }

    fn close(&self) -> io::Result<()> {
        if self.closing.swap(true, Ordering::AcqRel) {
            return Err(Closed.into());
        }
        self.closed.cancel();
        tracing::debug!(local = %self.local, remote = %self.remote, "closing connection");

        match socket2::SockRef::from(&self.stream).shutdown(Shutdown::Both) {
            // The peer may already have torn the connection down.
            Err(error) if error.kind() == ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }

    fn local_address(&self) -> Address {
        self.local
    }

    fn remote_address(&self) -> Address {
        self.remote
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

/// TCP listener accepting [`TcpConnection`]s.
#[derive(Debug)]
pub struct TcpListener {
    listener: Mutex<Option<Arc<tokio::net::TcpListener>>>,
    address: Address,
    closed: CancellationToken,
}

impl TcpListener {
    /// Binds a listener to `address`.
    ///
    /// Port `0` binds to an automatically assigned port, see [`netwrap::Listener::address`].
    pub async fn bind(address: impl ToSocketAddrs) -> io::Result<Self> {
        let listener = tokio::net::TcpListener::bind(address).await?;
        let listener = Self::from(listener);
        tracing::debug!(address = %listener.address, "listening");
        Ok(listener)
    }

    fn listener(&self) -> io::Result<Arc<tokio::net::TcpListener>> {
        self.listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Closed.into())
    }
}

impl From<tokio::net::TcpListener> for TcpListener {
    fn from(listener: tokio::net::TcpListener) -> Self {
        Self {
            address: listener
                .local_addr()
                .map_or(Address::Unknown, Address::Tcp),
            listener: Mutex::new(Some(Arc::new(listener))),
            closed: CancellationToken::new(),
        }
    }
}

impl netwrap::Listener for TcpListener {
    fn accept(&self) -> BoxFuture<'_, io::Result<BoxConnection>> {
        async move {
            let listener = self.listener()?;
            tokio::select! {
                biased;
                () = self.closed.cancelled() => Err(Closed.into()),
                result = listener.accept() => {
                    let (stream, remote) = result?;
                    tracing::debug!(address = %self.address, %remote, "accepted connection");
                    Ok(Box::new(TcpConnection::from(stream)) as BoxConnection)
                }
            }
        }
        .boxed()
    }

    fn close(&self) -> io::Result<()> {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if listener.is_none() {
            return Err(Closed.into());
        }
        self.closed.cancel();
        tracing::debug!(address = %self.address, "closing listener");
        Ok(())
    }

    fn address(&self) -> Address {
        self.address
    }
}
