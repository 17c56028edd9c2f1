//! Network implementations for TCP and in-memory pipes.

pub mod pipe;
pub mod tcp;

pub use pipe::{PipeConnection, pipe, pipe_with_capacity};
pub use tcp::{TcpConnection, TcpListener};
