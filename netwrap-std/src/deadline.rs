//! Deadlines and close notification shared by the connection implementations.

use std::future::Future;
use std::io;

use netwrap::{Closed, DeadlineExceeded};
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// The deadline of one I/O direction.
///
/// Changes are observed by operations that are already waiting.
#[derive(Debug)]
pub(crate) struct Deadline {
    sender: watch::Sender<Option<Instant>>,
}

impl Deadline {
    pub(crate) fn new() -> Self {
        Self {
            sender: watch::Sender::new(None),
        }
    }

    /// Sets the deadline, `None` disables it.
    pub(crate) fn set(&self, deadline: Option<std::time::Instant>) {
        self.sender.send_replace(deadline.map(Instant::from_std));
    }

    /// Returns whether the current deadline has already passed.
    pub(crate) fn has_elapsed(&self) -> bool {
        let deadline = *self.sender.borrow();
        deadline.is_some_and(|deadline| deadline <= Instant::now())
    }

    /// Resolves once the current deadline has passed, following any changes made while waiting.
    pub(crate) async fn elapsed(&self) {
        let mut receiver = self.sender.subscribe();
        loop {
            let deadline = *receiver.borrow_and_update();
            match deadline {
                Some(deadline) => tokio::select! {
                    () = tokio::time::sleep_until(deadline) => return,
                    // The sender lives as long as `self`, so this only reports changes.
                    _ = receiver.changed() => {}
                },
                None => {
                    let _ = receiver.changed().await;
                }
            }
        }
    }
}

/// Runs `operation` unless `closed` is cancelled or `deadline` passes first.
///
/// Closing takes precedence over an elapsed deadline, which takes precedence over a ready operation.
pub(crate) async fn guarded<T>(
    closed: &CancellationToken,
    deadline: &Deadline,
    operation: impl Future<Output = io::Result<T>>,
) -> io::Result<T> {
    if closed.is_cancelled() {
        return Err(Closed.into());
    }
    // Timers round up to the next tick, so a deadline in the past has to be checked before polling.
    if deadline.has_elapsed() {
        return Err(DeadlineExceeded.into());
    }
    tokio::select! {
        biased;
        () = closed.cancelled() => Err(Closed.into()),
        () = deadline.elapsed() => Err(DeadlineExceeded.into()),
        result = operation => result,
    }
}
