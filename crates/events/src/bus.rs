//! Event publishing/subscription abstraction (mechanics only).
//!
//! The bus carries notifications from a session controller to whoever renders
//! them (a UI adapter, a test, the demo binary). It is **not** a source of
//! truth: conversation state lives in the aggregate, the bus only fans out the
//! facts that were already applied.
//!
//! - **Transport-agnostic**: in-memory channels today, anything else later.
//! - **No persistence**: a subscriber that is not listening misses the message.
//! - **Ordering**: messages from one publisher arrive in publish order.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// A subscription to an event stream.
///
/// Each subscription gets a copy of every message published after it was
/// created (broadcast semantics).
///
/// ```ignore
/// let subscription = bus.subscribe();
/// controller.send_message("...")?;
/// for trigger in subscription.drain() {
///     show_generate_prompt(trigger);
/// }
/// ```
///
/// Subscriptions are meant for single-threaded consumption.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Collect every message currently queued, without blocking.
    pub fn drain(&self) -> Vec<M> {
        self.receiver.try_iter().collect()
    }
}

/// Publish-subscribe bus.
///
/// `publish()` can fail (e.g. a poisoned lock). Failures are surfaced to the
/// publisher; since the published fact is already applied to state, a failed
/// publish never rolls anything back.
///
/// Implementations must be `Send + Sync`: several tasks may publish at once.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
