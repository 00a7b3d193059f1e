//! Change-notification bus.
//!
//! Registry mutations are announced as no-payload signals: subscribers
//! re-fetch the device list themselves, the signal only says "something
//! changed". One producer, any number of subscribers; dropping a listener
//! unsubscribes it.

use tokio::sync::broadcast;

/// Default buffer for pending signals per subscriber.
///
/// A lagged subscriber loses nothing meaningful: missed signals collapse
/// into a single pending "changed".
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Broadcast signal fired after every registry mutation.
#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<()>,
}

impl ChangeBus {
    /// Create a bus with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with a specific per-subscriber buffer capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Fire the signal. Returns `true` if at least one subscriber was
    /// listening; with no subscribers the signal is discarded.
    pub fn notify(&self) -> bool {
        self.tx.send(()).is_ok()
    }

    /// Subscribe to future changes.
    pub fn subscribe(&self) -> ChangeListener {
        ChangeListener {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of the bus.
pub struct ChangeListener {
    rx: broadcast::Receiver<()>,
}

impl ChangeListener {
    /// Wait for the next change. Returns `false` once the bus is gone.
    pub async fn changed(&mut self) -> bool {
        match self.rx.recv().await {
            Ok(()) => true,
            // Overflow still means "something changed"
            Err(broadcast::error::RecvError::Lagged(_)) => true,
            Err(broadcast::error::RecvError::Closed) => false,
        }
    }

    /// Consume one pending change without waiting, if there is one.
    pub fn try_changed(&mut self) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(()) => return true,
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return false,
            }
        }
    }
}
