//! Observability subsystem.
//!
//! All subsystems emit `tracing` events; `logging.rs` decides where they go.

pub mod logging;
