//! KNoT gateway daemon library.

pub mod config;
pub mod lifecycle;
pub mod manager;
pub mod observability;

pub use config::Settings;
pub use lifecycle::{Daemon, DaemonError, Exit};
pub use manager::{IdleManager, Manager};
