use tokio::sync::broadcast;

/// Broadcasts a single shutdown signal to every task holding a clone.
#[derive(Debug)]
pub struct Shutdown(broadcast::Sender<()>, broadcast::Receiver<()>);

impl Shutdown {
    pub fn new() -> Self {
        let (tx, rx) = broadcast::channel(1);
        Shutdown(tx, rx)
    }

    pub fn shutdown(&self) {
        // every receiver may already be gone
        let _ = self.0.send(());
    }

    /// Resolves once shutdown has been signalled.
    pub async fn wait(&mut self) {
        let _ = self.1.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Shutdown {
    fn clone(&self) -> Self {
        Shutdown(self.0.clone(), self.0.subscribe())
    }
}
