//! Shutdown coordination for the gateway.
//!
//! The HTTP server subscribes and, once triggered, stops accepting
//! connections and waits for in-flight requests. A legacy run already on a
//! blocking worker is not interrupted; it finishes, its unmoved uploads are
//! removed, and its response is still written.

use tokio::sync::broadcast;

/// One-shot stop signal shared by the server and the signal listener.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// A receiver for `HttpServer::run`; resolves once `trigger` is called.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Asks every subscriber to drain and stop. Returns how many were told.
    pub fn trigger(&self) -> usize {
        let notified = self.tx.send(()).unwrap_or(0);
        tracing::info!(subscribers = notified, "Gateway shutdown triggered");
        notified
    }

    /// Subscribers that have not dropped their receiver yet.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
