//! KNoT gateway daemon.
//!
//! # Architecture Overview
//!
//! ```text
//!   argv + config file
//!          │
//!          ▼
//!   ┌─────────────┐    ┌─────────┐    ┌───────────┐    ┌──────────────┐
//!   │  settings   │───▶│ manager │───▶│ privilege │───▶│ config watch │
//!   │ resolution  │    │  start  │    │   drop    │    │  + signals   │
//!   └─────────────┘    └─────────┘    └───────────┘    └──────┬───────┘
//!                                                             │ detach
//!                                                             ▼
//!   ┌─────────────────────────────┐                   ┌──────────────┐
//!   │ teardown: remove watch,     │◀── SIGTERM/INT ───│  event loop  │
//!   │ stop manager, drop settings │◀── file modified ─│ (1 thread)   │
//!   └─────────────────────────────┘                   └──────────────┘
//! ```
//!
//! A configuration change is not reloaded in place; the daemon exits with
//! status 0 and the service supervisor starts it again.

use std::process::ExitCode;

use knotd::config::{AutoBackend, ResolveError};
use knotd::lifecycle::SystemProcess;
use knotd::observability::logging;
use knotd::{Daemon, DaemonError, IdleManager};

fn main() -> ExitCode {
    let log_handle = logging::init();
    tracing::info!("KNoT Gateway v{}", env!("CARGO_PKG_VERSION"));

    let mut daemon =
        Daemon::new(IdleManager::default(), SystemProcess, AutoBackend).with_logging(log_handle);
    match daemon.run(std::env::args_os()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(DaemonError::Resolve(ResolveError::Arguments(e))) => {
            let _ = e.print();
            ExitCode::FAILURE
        }
        Err(DaemonError::Resolve(e)) => {
            eprintln!("knotd: {}", e);
            ExitCode::FAILURE
        }
        // Already logged by the daemon.
        Err(_) => ExitCode::FAILURE,
    }
}
