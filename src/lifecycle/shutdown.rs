//! Termination request shared by signal listeners, the config watcher and
//! the event loop.

use std::fmt;
use std::sync::{Arc, OnceLock};

use tokio::sync::Notify;

/// Why the event loop was asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM or SIGINT.
    Signal { name: &'static str },
    /// The config file was modified.
    ConfigChanged,
    /// Requested through a [`Shutdown`] handle.
    Requested,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::Signal { name } => write!(f, "received {}", name),
            ShutdownReason::ConfigChanged => write!(f, "configuration file changed"),
            ShutdownReason::Requested => write!(f, "shutdown requested"),
        }
    }
}

/// One-shot termination request.
///
/// Cloning yields another handle to the same request. The first reason wins;
/// later requests are no-ops.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    reason: OnceLock<ShutdownReason>,
    notify: Notify,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination. Returns `true` for the request that took effect.
    pub fn request(&self, reason: ShutdownReason) -> bool {
        let first = self.inner.reason.set(reason).is_ok();
        self.inner.notify.notify_waiters();
        first
    }

    pub fn is_requested(&self) -> bool {
        self.inner.reason.get().is_some()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.inner.reason.get().copied()
    }

    /// Wait until termination is requested and return the winning reason.
    pub async fn wait(&self) -> ShutdownReason {
        loop {
            let notified = self.inner.notify.notified();
            if let Some(reason) = self.reason() {
                return reason;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_reason_wins() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.is_requested());

        assert!(shutdown.request(ShutdownReason::ConfigChanged));
        assert!(!shutdown.request(ShutdownReason::Signal { name: "SIGTERM" }));
        assert_eq!(shutdown.reason(), Some(ShutdownReason::ConfigChanged));
    }

    #[tokio::test]
    async fn test_wait_returns_immediately_when_already_requested() {
        let shutdown = Shutdown::new();
        shutdown.request(ShutdownReason::Requested);

        assert_eq!(shutdown.wait().await, ShutdownReason::Requested);
    }

    #[tokio::test]
    async fn test_wait_wakes_on_request_from_another_thread() {
        let shutdown = Shutdown::new();
        let handle = shutdown.clone();

        let requester = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            handle.request(ShutdownReason::Signal { name: "SIGINT" });
        });

        let reason = tokio::time::timeout(Duration::from_secs(5), shutdown.wait())
            .await
            .expect("wait did not wake");
        assert_eq!(reason, ShutdownReason::Signal { name: "SIGINT" });
        requester.join().unwrap();
    }
}
