//! The listener wrapper.

use std::io;

use futures::future::BoxFuture;

use crate::listener::Listener;
use crate::{Address, BoxConnection};

/// A functional [`Listener::accept`] implementation.
pub type AcceptFn<L> =
    Box<dyn for<'a> Fn(&'a L) -> BoxFuture<'a, io::Result<BoxConnection>> + Send + Sync>;

/// A functional [`Listener::close`] implementation.
pub type CloseFn<L> = Box<dyn Fn(&L) -> io::Result<()> + Send + Sync>;

/// A functional [`Listener::address`] implementation.
pub type AddressFn<L> = Box<dyn Fn(&L) -> Address + Send + Sync>;

/// A [`Listener`] whose operations are each bound to either the inner listener's method or an override.
///
/// Created by [`wrap`].
pub struct WrappedListener<L> {
    inner: L,

    on_accept: AcceptFn<L>,
    on_close: CloseFn<L>,
    on_address: AddressFn<L>,
}

impl<L> WrappedListener<L> {
    /// Returns a reference to the inner listener.
    pub fn get_ref(&self) -> &L {
        &self.inner
    }

    /// Consumes the wrapper, returning the inner listener and dropping all overrides.
    pub fn into_inner(self) -> L {
        self.inner
    }
}

impl<L: core::fmt::Debug> core::fmt::Debug for WrappedListener<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WrappedListener")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

enum Slot<L> {
    Accept(AcceptFn<L>),
    Close(CloseFn<L>),
    Address(AddressFn<L>),
}

impl<L> Slot<L> {
    fn name(&self) -> &'static str {
        match self {
            Slot::Accept(_) => "accept",
            Slot::Close(_) => "close",
            Slot::Address(_) => "address",
        }
    }
}

/// An override for one operation of a wrapped [`Listener`].
///
/// Created by [`on_accept`], [`on_close`] or [`on_address`] and consumed by [`wrap`].
pub struct Override<L>(Slot<L>);

impl<L> Override<L> {
    fn apply(self, wrapped: &mut WrappedListener<L>) {
        tracing::trace!(slot = self.0.name(), "overriding listener operation");
        match self.0 {
            Slot::Accept(function) => wrapped.on_accept = function,
            Slot::Close(function) => wrapped.on_close = function,
            Slot::Address(function) => wrapped.on_address = function,
        }
    }
}

impl<L> core::fmt::Debug for Override<L> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_tuple("Override").field(&self.0.name()).finish()
    }
}

/// Overrides the inner listener's [`Listener::accept`].
pub fn on_accept<L, F>(function: F) -> Override<L>
where
    F: for<'a> Fn(&'a L) -> BoxFuture<'a, io::Result<BoxConnection>> + Send + Sync + 'static,
{
    Override(Slot::Accept(Box::new(function)))
}

/// Overrides the inner listener's [`Listener::close`].
pub fn on_close<L, F>(function: F) -> Override<L>
where
    F: Fn(&L) -> io::Result<()> + Send + Sync + 'static,
{
    Override(Slot::Close(Box::new(function)))
}

/// Overrides the inner listener's [`Listener::address`].
pub fn on_address<L, F>(function: F) -> Override<L>
where
    F: Fn(&L) -> Address + Send + Sync + 'static,
{
    Override(Slot::Address(Box::new(function)))
}

/// Wraps `listener`, replacing the operations named by `overrides`.
///
/// Operations without an override forward to `listener`. Overrides are applied in order; if several target the same
/// operation, the last one wins.
///
/// An overridden [`close`](Listener::close) is expected to unblock a pending [`accept`](Listener::accept), this is not
/// checked.
pub fn wrap<L>(listener: L, overrides: impl IntoIterator<Item = Override<L>>) -> WrappedListener<L>
where
    L: Listener + 'static,
{
    let mut wrapped = WrappedListener {
        inner: listener,

        on_accept: Box::new(L::accept),
        on_close: Box::new(L::close),
        on_address: Box::new(L::address),
    };
    for directive in overrides {
        directive.apply(&mut wrapped);
    }
    wrapped
}

impl<L: Listener> Listener for WrappedListener<L> {
    fn accept(&self) -> BoxFuture<'_, io::Result<BoxConnection>> {
        (self.on_accept)(&self.inner)
    }

    fn close(&self) -> io::Result<()> {
        (self.on_close)(&self.inner)
    }

    fn address(&self) -> Address {
        (self.on_address)(&self.inner)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io;
    use std::sync::Mutex;
    use std::time::Instant;

    use futures::FutureExt;
    use futures::executor::block_on;
    use futures::future::{BoxFuture, ready};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    use crate::listener::{self, Listener, Override};
    use crate::{Address, BoxConnection, Connection};

    /// A connection that only knows its remote address.
    #[derive(Debug)]
    struct FakeConnection(Address);

    impl Connection for FakeConnection {
        fn read<'a>(&'a self, _buffer: &'a mut [u8]) -> BoxFuture<'a, io::Result<usize>> {
            ready(Ok(0)).boxed()
        }

        fn write<'a>(&'a self, buffer: &'a [u8]) -> BoxFuture<'a, io::Result<usize>> {
            ready(Ok(buffer.len())).boxed()
        }

        fn close(&self) -> io::Result<()> {
            Ok(())
        }

        fn local_address(&self) -> Address {
            Address::Unknown
        }

        fn remote_address(&self) -> Address {
            self.0
        }

        fn set_deadline(&self, _deadline: Option<Instant>) -> io::Result<()> {
            Ok(())
        }

        fn set_read_deadline(&self, _deadline: Option<Instant>) -> io::Result<()> {
            Ok(())
        }

        fn set_write_deadline(&self, _deadline: Option<Instant>) -> io::Result<()> {
            Ok(())
        }
    }

    /// A listener that records every call made to it.
    #[derive(Debug, Default)]
    struct RecordingListener {
        calls: Mutex<Vec<&'static str>>,
    }

    impl RecordingListener {
        fn record(&self, call: &'static str) {
            self.calls.lock().unwrap().push(call);
        }

        fn calls(&self) -> Vec<&'static str> {
            self.calls.lock().unwrap().clone()
        }
    }

    const ADDRESS: &str = "127.0.0.1:2001";

    impl Listener for RecordingListener {
        fn accept(&self) -> BoxFuture<'_, io::Result<BoxConnection>> {
            self.record("accept");
            let connection: BoxConnection = Box::new(FakeConnection(Address::Pipe));
            ready(Ok(connection)).boxed()
        }

        fn close(&self) -> io::Result<()> {
            self.record("close");
            Ok(())
        }

        fn address(&self) -> Address {
            self.record("address");
            Address::Tcp(ADDRESS.parse().unwrap())
        }
    }

    fn exercise(listener: &impl Listener) -> (Address, bool, Address) {
        let accepted = block_on(listener.accept()).unwrap().remote_address();
        let closed = listener.close().is_ok();
        (accepted, closed, listener.address())
    }

    #[test]
    fn without_overrides_behaves_like_inner() {
        let direct = RecordingListener::default();
        let expected = exercise(&direct);

        let wrapped = listener::wrap(RecordingListener::default(), []);
        assert_eq!(exercise(&wrapped), expected);
        assert_eq!(wrapped.get_ref().calls(), direct.calls());
        assert_eq!(wrapped.get_ref().calls(), ["accept", "close", "address"]);
    }

    fn recording_override(slot: &str) -> Override<RecordingListener> {
        match slot {
            "accept" => listener::on_accept(|inner: &RecordingListener| {
                inner.record("override accept");
                let connection: BoxConnection = Box::new(FakeConnection(Address::Unknown));
                ready(Ok(connection)).boxed()
            }),
            "close" => listener::on_close(|inner: &RecordingListener| {
                inner.record("override close");
                Err(io::ErrorKind::Unsupported.into())
            }),
            "address" => listener::on_address(|inner: &RecordingListener| {
                inner.record("override address");
                Address::Unknown
            }),
            _ => unreachable!("unknown slot {slot}"),
        }
    }

    #[test_case(0, "accept")]
    #[test_case(1, "close")]
    #[test_case(2, "address")]
    fn single_override_leaves_other_operations_untouched(position: usize, slot: &str) {
        let wrapped = listener::wrap(RecordingListener::default(), [recording_override(slot)]);
        exercise(&wrapped);

        let mut expected = vec!["accept", "close", "address"];
        let replaced = format!("override {slot}");
        let calls = wrapped.get_ref().calls();
        assert_eq!(calls[position], replaced);
        expected.remove(position);
        let mut remaining = calls;
        remaining.remove(position);
        assert_eq!(remaining, expected);
    }

    #[test]
    fn last_override_for_a_slot_wins() {
        let wrapped = listener::wrap(
            RecordingListener::default(),
            [
                listener::on_address(|_: &RecordingListener| Address::Pipe),
                listener::on_address(|_: &RecordingListener| Address::Unknown),
            ],
        );
        assert_eq!(wrapped.address(), Address::Unknown);
        assert!(wrapped.get_ref().calls().is_empty());
    }

    #[test]
    fn accept_override_returns_prepared_connection_then_fails() {
        let prepared = Mutex::new(Some(FakeConnection(Address::Tcp(
            "192.0.2.1:4000".parse().unwrap(),
        ))));

        let wrapped = listener::wrap(
            RecordingListener::default(),
            [listener::on_accept(move |_: &RecordingListener| {
                let result = match prepared.lock().unwrap().take() {
                    Some(connection) => Ok(Box::new(connection) as BoxConnection),
                    None => Err(io::Error::from(io::ErrorKind::ConnectionAborted)),
                };
                ready(result).boxed()
            })],
        );

        let first = block_on(wrapped.accept()).unwrap();
        assert_eq!(
            first.remote_address(),
            Address::Tcp("192.0.2.1:4000".parse().unwrap())
        );

        let second = block_on(wrapped.accept()).unwrap_err();
        assert_eq!(second.kind(), io::ErrorKind::ConnectionAborted);

        assert!(wrapped.close().is_ok());
        assert_eq!(wrapped.get_ref().calls(), ["close"]);
    }

    #[test]
    fn accepted_connections_can_be_wrapped() {
        let wrapped = listener::wrap(RecordingListener::default(), []);
        let accepted = block_on(wrapped.accept()).unwrap();

        let accepted = crate::connection::wrap(
            accepted,
            [crate::connection::on_local_address(|_: &BoxConnection| {
                Address::Pipe
            })],
        );
        assert_eq!(accepted.local_address(), Address::Pipe);
        assert_eq!(accepted.remote_address(), Address::Pipe);
    }
}
