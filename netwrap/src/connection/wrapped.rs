//! The connection wrapper.

use std::io;
use std::time::Instant;

use futures::future::BoxFuture;

use crate::Address;
use crate::connection::Connection;

/// A functional [`Connection::read`] implementation.
pub type ReadFn<C> = Box<
    dyn for<'a> Fn(&'a C, &'a mut [u8]) -> BoxFuture<'a, io::Result<usize>> + Send + Sync,
>;

/// A functional [`Connection::write`] implementation.
pub type WriteFn<C> =
    Box<dyn for<'a> Fn(&'a C, &'a [u8]) -> BoxFuture<'a, io::Result<usize>> + Send + Sync>;

/// A functional [`Connection::close`] implementation.
pub type CloseFn<C> = Box<dyn Fn(&C) -> io::Result<()> + Send + Sync>;

/// A functional [`Connection::local_address`] implementation.
pub type LocalAddressFn<C> = Box<dyn Fn(&C) -> Address + Send + Sync>;

/// A functional [`Connection::remote_address`] implementation.
pub type RemoteAddressFn<C> = Box<dyn Fn(&C) -> Address + Send + Sync>;

/// A functional [`Connection::set_deadline`] implementation.
pub type SetDeadlineFn<C> = Box<dyn Fn(&C, Option<Instant>) -> io::Result<()> + Send + Sync>;

/// A functional [`Connection::set_read_deadline`] implementation.
pub type SetReadDeadlineFn<C> = Box<dyn Fn(&C, Option<Instant>) -> io::Result<()> + Send + Sync>;

/// A functional [`Connection::set_write_deadline`] implementation.
pub type SetWriteDeadlineFn<C> = Box<dyn Fn(&C, Option<Instant>) -> io::Result<()> + Send + Sync>;

/// A [`Connection`] whose operations are each bound to either the inner connection's method or an override.
///
/// Created by [`wrap`]. Every function receives the inner connection as its first argument, so an override can still
/// call through to the original behavior.
pub struct WrappedConnection<C> {
    inner: C,

    on_read: ReadFn<C>,
    on_write: WriteFn<C>,
    on_close: CloseFn<C>,
    on_local_address: LocalAddressFn<C>,
    on_remote_address: RemoteAddressFn<C>,
    on_set_deadline: SetDeadlineFn<C>,
    on_set_read_deadline: SetReadDeadlineFn<C>,
    on_set_write_deadline: SetWriteDeadlineFn<C>,
}

impl<C> WrappedConnection<C> {
    /// Returns a reference to the inner connection.
    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    /// Consumes the wrapper, returning the inner connection and dropping all overrides.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: core::fmt::Debug> core::fmt::Debug for WrappedConnection<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WrappedConnection")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

enum Slot<C> {
    Read(ReadFn<C>),
    Write(WriteFn<C>),
    Close(CloseFn<C>),
    LocalAddress(LocalAddressFn<C>),
    RemoteAddress(RemoteAddressFn<C>),
    SetDeadline(SetDeadlineFn<C>),
    SetReadDeadline(SetReadDeadlineFn<C>),
    SetWriteDeadline(SetWriteDeadlineFn<C>),
}

impl<C> Slot<C> {
    fn name(&self) -> &'static str {
        match self {
            Slot::Read(_) => "read",
            Slot::Write(_) => "write",
            Slot::Close(_) => "close",
            Slot::LocalAddress(_) => "local_address",
            Slot::RemoteAddress(_) => "remote_address",
            Slot::SetDeadline(_) => "set_deadline",
            Slot::SetReadDeadline(_) => "set_read_deadline",
            Slot::SetWriteDeadline(_) => "set_write_deadline",
        }
    }
}

/// An override for one operation of a wrapped [`Connection`].
///
/// Created by the `on_*` functions of this module and consumed by [`wrap`].
pub struct Override<C>(Slot<C>);

impl<C> Override<C> {
    fn apply(self, wrapped: &mut WrappedConnection<C>) {
        tracing::trace!(slot = self.0.name(), "overriding connection operation");
        match self.0 {
            Slot::Read(function) => wrapped.on_read = function,
            Slot::Write(function) => wrapped.on_write = function,
            Slot::Close(function) => wrapped.on_close = function,
            Slot::LocalAddress(function) => wrapped.on_local_address = function,
            Slot::RemoteAddress(function) => wrapped.on_remote_address = function,
            Slot::SetDeadline(function) => wrapped.on_set_deadline = function,
            Slot::SetReadDeadline(function) => wrapped.on_set_read_deadline = function,
            Slot::SetWriteDeadline(function) => wrapped.on_set_write_deadline = function,
        }
    }
}

impl<C> core::fmt::Debug for Override<C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Override").field(&self.0.name()).finish()
    }
}

/// Overrides the inner connection's [`Connection::read`].
pub fn on_read<C, F>(function: F) -> Override<C>
where
    F: for<'a> Fn(&'a C, &'a mut [u8]) -> BoxFuture<'a, io::Result<usize>> + Send + Sync + 'static,
{
    Override(Slot::Read(Box::new(function)))
}

/// Overrides the inner connection's [`Connection::write`].
pub fn on_write<C, F>(function: F) -> Override<C>
where
    F: for<'a> Fn(&'a C, &'a [u8]) -> BoxFuture<'a, io::Result<usize>> + Send + Sync + 'static,
{
    Override(Slot::Write(Box::new(function)))
}

/// Overrides the inner connection's [`Connection::close`].
pub fn on_close<C, F>(function: F) -> Override<C>
where
    F: Fn(&C) -> io::Result<()> + Send + Sync + 'static,
{
    Override(Slot::Close(Box::new(function)))
}

/// Overrides the inner connection's [`Connection::local_address`].
pub fn on_local_address<C, F>(function: F) -> Override<C>
where
    F: Fn(&C) -> Address + Send + Sync + 'static,
{
    Override(Slot::LocalAddress(Box::new(function)))
}

/// Overrides the inner connection's [`Connection::remote_address`].
pub fn on_remote_address<C, F>(function: F) -> Override<C>
where
    F: Fn(&C) -> Address + Send + Sync + 'static,
{
    Override(Slot::RemoteAddress(Box::new(function)))
}

/// Overrides the inner connection's [`Connection::set_deadline`].
pub fn on_set_deadline<C, F>(function: F) -> Override<C>
where
    F: Fn(&C, Option<Instant>) -> io::Result<()> + Send + Sync + 'static,
{
    Override(Slot::SetDeadline(Box::new(function)))
}

/// Overrides the inner connection's [`Connection::set_read_deadline`].
pub fn on_set_read_deadline<C, F>(function: F) -> Override<C>
where
    F: Fn(&C, Option<Instant>) -> io::Result<()> + Send + Sync + 'static,
{
    Override(Slot::SetReadDeadline(Box::new(function)))
}

/// Overrides the inner connection's [`Connection::set_write_deadline`].
pub fn on_set_write_deadline<C, F>(function: F) -> Override<C>
where
    F: Fn(&C, Option<Instant>) -> io::Result<()> + Send + Sync + 'static,
{
    Override(Slot::SetWriteDeadline(Box::new(function)))
}

/// Wraps `connection`, replacing the operations named by `overrides`.
///
/// Operations without an override forward to `connection`. Overrides are applied in order; if several target the
/// same operation, the last one wins.
///
/// Overrides are not checked against the contracts documented on [`Connection`]. For example, an overridden
/// [`close`](Connection::close) is expected to unblock a pending overridden [`read`](Connection::read); upholding
/// that is up to the caller.
pub fn wrap<C>(connection: C, overrides: impl IntoIterator<Item = Override<C>>) -> WrappedConnection<C>
where
    C: Connection + 'static,
{
    let mut wrapped = WrappedConnection {
        inner: connection,

        on_read: Box::new(C::read),
        on_write: Box::new(C::write),
        on_close: Box::new(C::close),
        on_local_address: Box::new(C::local_address),
        on_remote_address: Box::new(C::remote_address),
        on_set_deadline: Box::new(C::set_deadline),
        on_set_read_deadline: Box::new(C::set_read_deadline),
        on_set_write_deadline: Box::new(C::set_write_deadline),
    };
    for directive in overrides {
        directive.apply(&mut wrapped);
    }
    wrapped
}

impl<C: Connection> Connection for WrappedConnection<C> {
    fn read<'a>(&'a self, buffer: &'a mut [u8]) -> BoxFuture<'a, io::Result<usize>> {
        (self.on_read)(&self.inner, buffer)
    }

    fn write<'a>(&'a self, buffer: &'a [u8]) -> BoxFuture<'a, io::Result<usize>> {
        (self.on_write)(&self.inner, buffer)
    }

    fn close(&self) -> io::Result<()> {
        (self.on_close)(&self.inner)
    }

    fn local_address(&self) -> Address {
        (self.on_local_address)(&self.inner)
    }

    fn remote_address(&self) -> Address {
        (self.on_remote_address)(&self.inner)
    }

    fn set_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
        (self.on_set_deadline)(&self.inner, deadline)
    }

    fn set_read_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
        (self.on_set_read_deadline)(&self.inner, deadline)
    }

    fn set_write_deadline(&self, deadline: Option<Instant>) -> io::Result<()> {
        (self.on_set_write_deadline)(&self.inner, deadline)
    }
}
