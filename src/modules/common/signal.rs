use crate::modules::utils::shutdown::shutdown_signal;
use tokio::sync::watch;
use tracing::info;

/// Owner of the process-wide shutdown flag. Supervisors only ever hold a [`Shutdown`]
/// receiver, so the flag is read-only from their side.
pub struct SignalManager {
    sender: watch::Sender<bool>,
}

impl SignalManager {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        SignalManager { sender }
    }

    pub fn subscribe(&self) -> Shutdown {
        Shutdown {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.sender.send_replace(true);
    }

    /// Waits for Ctrl-C/SIGTERM and flips the flag.
    pub async fn listen(&self) {
        shutdown_signal().await;
        info!("Shutdown signal received, stopping account supervisors");
        self.trigger();
    }
}

impl Default for SignalManager {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscriber's view of the shutdown flag. Unlike a broadcast receiver it also sees a
/// shutdown that was issued before it subscribed.
#[derive(Clone, Debug)]
pub struct Shutdown {
    receiver: watch::Receiver<bool>,
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolves once shutdown has been requested. If the manager goes away without
    /// triggering, this never resolves.
    pub async fn recv(&mut self) {
        loop {
            if *self.receiver.borrow_and_update() {
                return;
            }
            if self.receiver.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}
