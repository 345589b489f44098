//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (controller.rs):
//!     Resolve settings → Start manager → Drop privileges (process.rs)
//!     → Install config watch, ignore SIGPIPE, hold SIGTERM/SIGINT
//!     → Detach (process.rs) → Run loop (signals.rs listens, then releases held signals)
//!
//! Loop:
//!     SIGTERM/SIGINT (signals.rs) ──┐
//!                                   ├─→ Shutdown::request (shutdown.rs) → loop exits
//!     config file modified ─────────┘
//!
//! Teardown (controller.rs):
//!     Remove watch → Stop manager → Release settings → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup, every step finishes before the next begins
//! - Teardown runs once, whether the run succeeded or failed
//! - No in-place reload: a config change ends the process

pub mod controller;
pub mod process;
pub mod shutdown;
pub mod signals;
pub mod state;

pub use controller::{Daemon, DaemonError, Exit};
pub use process::{ProcessControl, SystemProcess};
pub use shutdown::{Shutdown, ShutdownReason};
pub use state::LifecycleState;
