//! Process-level startup steps: privilege drop and detaching.
//!
//! Both are irreversible, so the daemon reaches them through the
//! [`ProcessControl`] trait and tests substitute a recording double.

use daemonize::Daemonize;
use nix::unistd::{setgid, setgroups, setuid, Gid, Uid};

use crate::lifecycle::DaemonError;

/// uid and gid of `nobody`.
pub const NOBODY_ID: u32 = 65534;

pub trait ProcessControl {
    /// Permanently switch to the unprivileged `nobody` identity.
    fn drop_privileges(&mut self) -> Result<(), DaemonError>;

    /// Detach from the controlling terminal and session.
    ///
    /// Only the detached child returns.
    fn detach(&mut self) -> Result<(), DaemonError>;
}

/// Acts on the real process.
#[derive(Debug, Default)]
pub struct SystemProcess;

impl ProcessControl for SystemProcess {
    fn drop_privileges(&mut self) -> Result<(), DaemonError> {
        let privilege_error = |source| DaemonError::PrivilegeDrop {
            uid: NOBODY_ID,
            source,
        };

        // Group changes need the privileges the uid change gives away.
        setgroups(&[]).map_err(privilege_error)?;
        setgid(Gid::from_raw(NOBODY_ID)).map_err(privilege_error)?;
        setuid(Uid::from_raw(NOBODY_ID)).map_err(privilege_error)?;

        tracing::info!(uid = NOBODY_ID, gid = NOBODY_ID, "Dropped privileges");
        Ok(())
    }

    fn detach(&mut self) -> Result<(), DaemonError> {
        Daemonize::new()
            .working_directory("/")
            .start()
            .map_err(|e| DaemonError::Detach(e.to_string()))?;

        tracing::info!(pid = std::process::id(), "Detached from terminal");
        Ok(())
    }
}
