//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! argv ──────────────┐
//!                    ├─→ settings.rs (resolve, precedence rules)
//! config file        │       → Settings (immutable, owned by the daemon)
//!   → backend.rs ────┘
//!       (json.rs | keyfile.rs)
//!
//! While running:
//!     watcher.rs sees the file modified
//!     → termination request
//!     → daemon exits, supervisor restarts it
//! ```
//!
//! # Design Decisions
//! - Settings are resolved once per process; there is no in-place reload
//! - The resolver is written once against the `ConfigBackend` trait
//! - The device uuid is only ever read from the file

pub mod backend;
pub mod json;
pub mod keyfile;
pub mod settings;
pub mod watcher;

pub use backend::{AutoBackend, ConfigBackend, ConfigError, ConfigFormat};
pub use settings::{resolve, Cli, Proto, Resolution, ResolveError, Settings};
pub use watcher::{ConfigWatcher, WatchError};
