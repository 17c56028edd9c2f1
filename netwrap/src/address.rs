//! Network addresses reported by connections and listeners.

use std::fmt::{self, Display, Formatter};
use std::net::SocketAddr;

/// The address one end of a connection, or a listener, is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Address {
    /// TCP socket with IP and port.
    Tcp(SocketAddr),

    /// One end of an in-memory pipe.
    Pipe,

    /// The transport does not know its address.
    Unknown,
}

impl Address {
    /// Returns the name of the network, e.g. `"tcp"`.
    pub fn network(&self) -> &'static str {
        match self {
            Address::Tcp(_) => "tcp",
            Address::Pipe => "pipe",
            Address::Unknown => "unknown",
        }
    }

    /// Returns the socket address if this is an IP based address.
    pub fn as_socket_addr(&self) -> Option<SocketAddr> {
        match self {
            Address::Tcp(address) => Some(*address),
            Address::Pipe | Address::Unknown => None,
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Address::Tcp(address) => address.fmt(f),
            Address::Pipe | Address::Unknown => f.write_str(self.network()),
        }
    }
}

impl From<SocketAddr> for Address {
    fn from(address: SocketAddr) -> Self {
        Address::Tcp(address)
    }
}
