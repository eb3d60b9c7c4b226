//! Stop signal shared by the OS signal task and the accept loop.

use tokio::sync::broadcast::{self, error::RecvError};

/// Sending half: fires once, reaches every [`ShutdownSignal`].
#[derive(Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

/// Receiving half held by the accept loop.
pub struct ShutdownSignal {
    rx: broadcast::Receiver<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Ask every subscriber to stop. Returns how many were listening.
    pub fn trigger(&self) -> usize {
        self.tx.send(()).unwrap_or(0)
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignal {
    /// Resolve once [`Shutdown::trigger`] was called.
    ///
    /// Dropping every [`Shutdown`] without triggering never resolves; the
    /// server keeps running until told otherwise.
    pub async fn recv(&mut self) {
        match self.rx.recv().await {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}
