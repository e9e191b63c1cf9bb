//! Observers notified when an engine's observable state changes.

use std::sync::mpsc::{self, Receiver, Sender};

/// Receives the new observable state after every change.
///
/// Engines call [`Observer::on_change`] once per completed read, write or
/// poll tick that changed state, after the store already reflects it.
/// Any `Fn(&T) + Send + Sync` closure is an observer.
pub trait Observer<T: ?Sized>: Send + Sync + 'static {
    /// Called with the full new state.
    fn on_change(&self, state: &T);
}

impl<T: ?Sized, F> Observer<T> for F
where
    F: Fn(&T) + Send + Sync + 'static,
{
    fn on_change(&self, state: &T) {
        self(state)
    }
}

/// An observer forwarding clones of each new state over a channel.
///
/// Once the receiver is dropped, notifications are discarded.
#[derive(Debug)]
pub struct ChannelObserver<T> {
    sender: Sender<T>,
}

impl<T: Clone + Send + 'static> Observer<T> for ChannelObserver<T> {
    fn on_change(&self, state: &T) {
        if self.sender.send(state.clone()).is_err() {
            tracing::trace!("observer channel closed, dropping notification");
        }
    }
}

/// Creates a channel-backed observer and the receiver for its states.
pub fn observer_channel<T>() -> (ChannelObserver<T>, Receiver<T>) {
    let (sender, receiver) = mpsc::channel();
    (ChannelObserver { sender }, receiver)
}
