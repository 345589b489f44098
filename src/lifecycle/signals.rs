//! OS signal handling.
//!
//! # Responsibilities
//! - Ignore SIGPIPE before the loop starts
//! - Hold SIGTERM/SIGINT pending from the watch step until the loop listens
//! - Turn SIGTERM/SIGINT into a termination request
//!
//! # Design Decisions
//! - Uses Tokio's signal handling; the OS-level handler only wakes the reactor
//! - Listeners never run teardown themselves, they only set the request
//! - The mask is per thread and inherited across the detach fork

use nix::sys::signal::{signal, SigHandler, SigSet, Signal};
use tokio::signal::unix::{self, SignalKind};
use tokio::task::JoinHandle;

use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};

/// Ignore SIGPIPE so a closed peer surfaces as an I/O error.
pub fn ignore_sigpipe() -> nix::Result<()> {
    // SAFETY: SIG_IGN installs no Rust code as a handler.
    unsafe { signal(Signal::SIGPIPE, SigHandler::SigIgn) }.map(|_| ())
}

fn termination_set() -> SigSet {
    let mut set = SigSet::empty();
    set.add(Signal::SIGTERM);
    set.add(Signal::SIGINT);
    set
}

/// Keep SIGTERM/SIGINT pending on the calling thread instead of letting the
/// default action kill the process before [`install`] runs.
pub fn block_termination() -> nix::Result<()> {
    termination_set().thread_block()
}

/// Deliver any SIGTERM/SIGINT held by [`block_termination`].
pub fn unblock_termination() -> nix::Result<()> {
    termination_set().thread_unblock()
}

/// Register SIGTERM/SIGINT listeners that request shutdown.
///
/// Must be called from within a tokio runtime. Registration happens before
/// this returns, so no signal is missed once the caller enters its loop.
pub fn install(shutdown: Shutdown) -> std::io::Result<JoinHandle<()>> {
    let mut terminate = unix::signal(SignalKind::terminate())?;
    let mut interrupt = unix::signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = terminate.recv() => "SIGTERM",
                Some(()) = interrupt.recv() => "SIGINT",
                else => break,
            };
            tracing::info!(signal = name, "Termination signal received");
            shutdown.request(ShutdownReason::Signal { name });
        }
    }))
}
