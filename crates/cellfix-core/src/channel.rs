//! Single-slot command and reply mailboxes.
//!
//! Both directions between the facade and the worker are depth-1 bounded
//! channels. Together with the worker's acquiring flag they guarantee at
//! most one acquisition in flight, with no queueing behind it.

use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

/// Create a connected single-slot mailbox.
pub fn mailbox<T>() -> (MailboxSender<T>, MailboxReceiver<T>) {
    let (tx, rx) = bounded(1);
    (MailboxSender { tx }, MailboxReceiver { rx })
}

pub struct MailboxSender<T> {
    tx: Sender<T>,
}

pub struct MailboxReceiver<T> {
    rx: Receiver<T>,
}

/// Result of taking from a mailbox with a bounded wait.
pub enum Take<T> {
    Value(T),
    /// Nothing arrived within the wait.
    Empty,
    /// Every sender is gone.
    Closed,
}

impl<T> MailboxSender<T> {
    /// Deposit, blocking until the slot frees. False when the receiver is
    /// gone.
    pub fn send(&self, value: T) -> bool {
        self.tx.send(value).is_ok()
    }

    /// Deposit, waiting at most `timeout` for the slot to free. A zero
    /// timeout never blocks.
    pub fn send_within(&self, value: T, timeout: Duration) -> bool {
        self.tx.send_timeout(value, timeout).is_ok()
    }
}

impl<T> MailboxReceiver<T> {
    /// Take the slot's value, waiting at most `timeout`.
    pub fn take(&self, timeout: Duration) -> Take<T> {
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Take::Value(value),
            Err(RecvTimeoutError::Timeout) => Take::Empty,
            Err(RecvTimeoutError::Disconnected) => Take::Closed,
        }
    }
}
