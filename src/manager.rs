//! Manager seam.
//!
//! The manager performs the gateway's actual device/cloud bridging. The
//! daemon only starts it with the resolved settings and stops it at
//! teardown.

use thiserror::Error;

use crate::config::Settings;

/// Error type for manager startup.
#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("{0}")]
    Start(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub trait Manager {
    /// Start with the resolved settings.
    fn start(&mut self, settings: &Settings) -> Result<(), ManagerError>;

    /// Stop synchronously. Safe to call when not running.
    fn stop(&mut self);
}

/// Manager with no bridging attached; it records the target and logs.
#[derive(Debug, Default)]
pub struct IdleManager {
    target: Option<String>,
}

impl IdleManager {
    pub fn is_running(&self) -> bool {
        self.target.is_some()
    }
}

impl Manager for IdleManager {
    fn start(&mut self, settings: &Settings) -> Result<(), ManagerError> {
        let target = format!("{}://{}:{}", settings.proto(), settings.host(), settings.port());
        tracing::info!(
            target_url = %target,
            tty = settings.tty().unwrap_or("none"),
            "Manager started"
        );
        self.target = Some(target);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(target) = self.target.take() {
            tracing::info!(target_url = %target, "Manager stopped");
        }
    }
}
