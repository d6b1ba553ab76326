use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::broadcast::{Receiver, Sender};
use tokio::sync::Mutex;

/// Broadcasts a single shutdown request to every listener.
///
/// The request is latched, so a listener created after [ShutdownHandle::shutdown] was called still
/// observes it. This matters for the scenario runner which creates a fresh listener for each phase.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    sender: Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Default for ShutdownHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self {
            sender: tokio::sync::broadcast::channel(1).0,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shutdown(&self) {
        self.triggered.store(true, Ordering::SeqCst);
        if let Err(e) = self.sender.send(()) {
            // Will fail if nobody is listening for a shutdown signal, in which case the log message
            // can be ignored.
            log::warn!("Failed to send shutdown signal: {e:?}");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    pub fn new_listener(&self) -> DelegatedShutdownListener {
        DelegatedShutdownListener::new(self.sender.subscribe(), self.triggered.clone())
    }
}

#[derive(Clone, Debug)]
pub struct DelegatedShutdownListener {
    receiver: Arc<Mutex<Receiver<()>>>,
    triggered: Arc<AtomicBool>,
}

impl DelegatedShutdownListener {
    pub(crate) fn new(receiver: Receiver<()>, triggered: Arc<AtomicBool>) -> Self {
        Self {
            receiver: Arc::new(Mutex::new(receiver)),
            triggered,
        }
    }

    /// Point in time check if the shutdown signal has been received. If this returns true then the
    /// caller should stop its work and start cleaning up.
    pub fn should_shutdown(&mut self) -> bool {
        if self.triggered.load(Ordering::SeqCst) {
            return true;
        }

        match self.receiver.try_lock() {
            Ok(mut guard) => match guard.try_recv() {
                Ok(_) | Err(TryRecvError::Lagged(_)) => true,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => false,
            },
            Err(_) => false,
        }
    }

    /// Wait for the shutdown signal to be received.
    ///
    /// It is safe to race this with another future so that the shutdown signal can be used to
    /// cancel other work in progress. If the [ShutdownHandle] is dropped without a shutdown being
    /// requested then this never completes.
    pub async fn wait_for_shutdown(&mut self) {
        if self.triggered.load(Ordering::SeqCst) {
            return;
        }

        let result = self.receiver.lock().await.recv().await;
        match result {
            Ok(()) | Err(RecvError::Lagged(_)) => {}
            Err(RecvError::Closed) => std::future::pending::<()>().await,
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct ShutdownSignalError {
    msg: String,
}

impl Default for ShutdownSignalError {
    fn default() -> Self {
        Self {
            msg: "Execution cancelled by shutdown signal".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn listener_created_after_shutdown_sees_it() {
        let handle = ShutdownHandle::new();
        handle.shutdown();

        let mut listener = handle.new_listener();
        assert!(listener.should_shutdown());
        tokio::time::timeout(Duration::from_secs(1), listener.wait_for_shutdown())
            .await
            .expect("listener should return immediately");
    }

    #[tokio::test]
    async fn existing_listener_is_woken() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();
        assert!(!listener.should_shutdown());

        let waiter = tokio::spawn(async move { listener.wait_for_shutdown().await });
        handle.shutdown();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("listener should be woken")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_handle_does_not_signal_shutdown() {
        let handle = ShutdownHandle::new();
        let mut listener = handle.new_listener();
        drop(handle);

        let waited =
            tokio::time::timeout(Duration::from_secs(5), listener.wait_for_shutdown()).await;
        assert!(waited.is_err());
        assert!(!listener.should_shutdown());
    }
}
