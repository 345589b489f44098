//! Structured logging.
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Filter from `KNOTD_LOG`, then `RUST_LOG`, then `knotd=info`
//! - Writes to stderr; once detached that is `/dev/null`, so the daemon
//!   switches the journal layer on through [`LogHandle`]

use std::io::{self, IsTerminal};

use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "KNOTD_LOG";

const DEFAULT_FILTER: &str = "knotd=info";

type JournalSlot = Option<tracing_journald::Layer>;

/// Switches the journal output of an installed subscriber.
#[derive(Clone)]
pub struct LogHandle {
    journal: reload::Handle<JournalSlot, Registry>,
}

impl LogHandle {
    /// Also send every event to the systemd journal.
    ///
    /// Fails when journald is not reachable; stderr output is unaffected.
    pub fn use_journal(&self) -> io::Result<()> {
        let layer = tracing_journald::layer()?;
        self.set_journal(Some(layer))?;
        tracing::info!("Logging to the journal");
        Ok(())
    }

    fn set_journal(&self, layer: JournalSlot) -> io::Result<()> {
        self.journal.reload(layer).map_err(io::Error::other)
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn build() -> (impl Subscriber + Send + Sync + 'static, LogHandle) {
    let (journal, handle) = reload::Layer::new(None);
    let subscriber = tracing_subscriber::registry()
        .with(journal)
        .with(filter())
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        );
    (subscriber, LogHandle { journal: handle })
}

/// Install the global subscriber. Later calls are no-ops, and the handle
/// they return is detached from any subscriber.
pub fn init() -> LogHandle {
    let (subscriber, handle) = build();
    let _ = subscriber.try_init();
    handle
}
