//! Test suites for [`Connection`] and [`Listener`] implementations.
//!
//! The suites are runtime agnostic; they rely on the implementation under test for timers.

use std::time::{Duration, Instant};

use crate::{Connection, ConnectionExt, Listener, is_timeout};

/// Data written through `client` arrives at `server` and vice versa.
pub async fn test_read_write(client: impl Connection, server: impl Connection) {
    client.write_all(b"ping").await.unwrap();
    let mut buffer = [0u8; 4];
    server.read_exact(&mut buffer).await.unwrap();
    assert_eq!(&buffer, b"ping");

    server.write_all(b"pong").await.unwrap();
    client.read_exact(&mut buffer).await.unwrap();
    assert_eq!(&buffer, b"pong");

    client.close().unwrap();
    let read = server.read(&mut buffer).await.unwrap();
    assert_eq!(read, 0, "expected end of stream after the peer closed");
}

/// A pending read is unblocked with an error by a concurrent close.
///
/// `connection` must not have any data to read.
pub async fn test_close_unblocks_read(connection: impl Connection) {
    let mut buffer = [0u8; 16];
    let (read, close) = futures::join!(connection.read(&mut buffer), async {
        connection.close()
    });
    close.unwrap();
    assert!(read.is_err(), "read returned {read:?} after close");
}

/// A pending write is unblocked with an error by a concurrent close.
///
/// `connection` must be unable to accept more data, for example because the peer is not reading.
pub async fn test_close_unblocks_write(connection: impl Connection) {
    let (write, close) = futures::join!(connection.write(b"blocked"), async {
        connection.close()
    });
    close.unwrap();
    assert!(write.is_err(), "write returned {write:?} after close");
}

/// Closing twice neither hangs nor reopens the connection.
pub async fn test_close_twice(connection: impl Connection) {
    connection.close().unwrap();
    let _ = connection.close();

    let mut buffer = [0u8; 16];
    assert!(connection.read(&mut buffer).await.is_err());
    assert!(connection.write(b"late").await.is_err());
}

/// A read on a connection with no incoming data fails with a timeout once the read deadline passes.
pub async fn test_read_deadline(connection: impl Connection) {
    let start = Instant::now();
    connection
        .set_read_deadline(Some(start + Duration::from_millis(50)))
        .unwrap();

    let mut buffer = [0u8; 16];
    let error = connection.read(&mut buffer).await.unwrap_err();
    let elapsed = start.elapsed();

    assert!(is_timeout(&error), "expected a timeout, got {error:?}");
    assert!(elapsed >= Duration::from_millis(45), "timed out early after {elapsed:?}");
    assert!(elapsed < Duration::from_millis(200), "timed out late after {elapsed:?}");
}

/// Setting a deadline affects a read that is already pending.
pub async fn test_deadline_applies_to_pending_read(connection: impl Connection) {
    let mut buffer = [0u8; 16];
    let (read, set) = futures::join!(connection.read(&mut buffer), async {
        connection.set_deadline(Some(Instant::now() + Duration::from_millis(20)))
    });
    set.unwrap();

    let error = read.unwrap_err();
    assert!(is_timeout(&error), "expected a timeout, got {error:?}");
}

/// Setting a write deadline affects a write that is already pending.
///
/// `connection` must be unable to accept more data, for example because the peer is not reading.
pub async fn test_deadline_applies_to_pending_write(connection: impl Connection) {
    let (write, set) = futures::join!(connection.write(b"blocked"), async {
        connection.set_write_deadline(Some(Instant::now() + Duration::from_millis(20)))
    });
    set.unwrap();

    let error = write.unwrap_err();
    assert!(is_timeout(&error), "expected a timeout, got {error:?}");
}

/// A read deadline in the past fails reads even when data is ready.
pub async fn test_elapsed_deadline_with_pending_data(client: impl Connection, server: impl Connection) {
    server.write_all(b"datadata").await.unwrap();
    let mut buffer = [0u8; 4];
    // The first half proves the data arrived; the second half stays buffered.
    client.read_exact(&mut buffer).await.unwrap();

    client.set_read_deadline(Some(Instant::now())).unwrap();
    let error = client.read(&mut buffer).await.unwrap_err();
    assert!(is_timeout(&error), "expected a timeout, got {error:?}");

    client.set_read_deadline(None).unwrap();
    client.read_exact(&mut buffer).await.unwrap();
    assert_eq!(&buffer, b"data");
}

/// An elapsed deadline fails reads immediately, and clearing it makes the connection usable again.
pub async fn test_deadline_reset(client: impl Connection, server: impl Connection) {
    let mut buffer = [0u8; 16];

    client.set_read_deadline(Some(Instant::now())).unwrap();
    let error = client.read(&mut buffer).await.unwrap_err();
    assert!(is_timeout(&error), "expected a timeout, got {error:?}");

    client.set_read_deadline(None).unwrap();
    server.write_all(b"again").await.unwrap();
    client.read_exact(&mut buffer[..5]).await.unwrap();
    assert_eq!(&buffer[..5], b"again");
}

/// A pending accept is unblocked with an error by a concurrent close.
pub async fn test_close_unblocks_accept(listener: impl Listener) {
    let (accept, close) = futures::join!(listener.accept(), async { listener.close() });
    close.unwrap();
    assert!(accept.is_err(), "accept succeeded after close");
}

/// Accepting on a closed listener fails.
pub async fn test_accept_after_close(listener: impl Listener) {
    listener.close().unwrap();
    assert!(listener.accept().await.is_err());
}
