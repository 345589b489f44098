//! Daemon lifecycle controller.
//!
//! # Responsibilities
//! - Resolve settings, start the manager, drop privileges
//! - Install the config watch and hold termination signals, detach, run the loop
//! - Tear everything down exactly once, on success and on failure
//!
//! # Design Decisions
//! - The daemon is an explicit value built in `main`, no globals
//! - The event loop is a current-thread tokio runtime built after detaching
//! - A signal and a config change take the same shutdown path

use std::ffi::OsString;

use thiserror::Error;

use crate::config::{
    resolve, AutoBackend, ConfigBackend, ConfigWatcher, Resolution, ResolveError, Settings,
    WatchError,
};
use crate::lifecycle::process::ProcessControl;
use crate::lifecycle::shutdown::{Shutdown, ShutdownReason};
use crate::lifecycle::signals;
use crate::lifecycle::state::LifecycleState;
use crate::manager::{Manager, ManagerError};
use crate::observability::logging::LogHandle;

/// Error type for a daemon run.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("manager failed to start: {0}")]
    ManagerStart(#[from] ManagerError),

    #[error("failed to drop privileges to uid {uid}: {source}")]
    PrivilegeDrop {
        uid: u32,
        #[source]
        source: nix::Error,
    },

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    #[error("can't start daemon: {0}")]
    Detach(String),

    #[error("failed to build event loop: {0}")]
    Runtime(#[source] std::io::Error),

    #[error("daemon has already run")]
    AlreadyRan,
}

/// How a successful run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// Usage was printed, nothing was started.
    Help,
    /// The loop ran and was asked to stop.
    Stopped(ShutdownReason),
}

/// The gateway daemon.
pub struct Daemon<M, P, B = AutoBackend> {
    manager: M,
    process: P,
    backend: B,
    shutdown: Shutdown,
    state: LifecycleState,
    settings: Option<Settings>,
    watcher: Option<ConfigWatcher>,
    manager_running: bool,
    termination_blocked: bool,
    logging: Option<LogHandle>,
}

impl<M, P, B> Daemon<M, P, B>
where
    M: Manager,
    P: ProcessControl,
    B: ConfigBackend,
{
    pub fn new(manager: M, process: P, backend: B) -> Self {
        Self {
            manager,
            process,
            backend,
            shutdown: Shutdown::new(),
            state: LifecycleState::Init,
            settings: None,
            watcher: None,
            manager_running: false,
            termination_blocked: false,
            logging: None,
        }
    }

    /// Send logs to the journal once the process has detached.
    pub fn with_logging(mut self, logging: LogHandle) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Handle that stops the loop the same way a termination signal does.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Resolved settings; only present between resolution and teardown.
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Run the daemon to completion. `args` includes the program name.
    pub fn run<I, T>(&mut self, args: I) -> Result<Exit, DaemonError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        if self.state != LifecycleState::Init {
            return Err(DaemonError::AlreadyRan);
        }

        let outcome = self.start_and_serve(args);
        match &outcome {
            Ok(Exit::Stopped(reason)) => tracing::info!(reason = %reason, "Event loop stopped"),
            Ok(Exit::Help) | Err(DaemonError::Resolve(_)) => {}
            Err(e) => tracing::error!(error = %e, state = %self.state, "Daemon failed"),
        }
        self.teardown(outcome.is_ok());
        outcome
    }

    fn start_and_serve<I, T>(&mut self, args: I) -> Result<Exit, DaemonError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let settings = match resolve(args, &self.backend)? {
            Resolution::Help(usage) => {
                print!("{}", usage);
                return Ok(Exit::Help);
            }
            Resolution::Settings(settings) => settings,
        };
        tracing::info!(
            config = %settings.config_path().display(),
            host = settings.host(),
            port = settings.port(),
            proto = %settings.proto(),
            detach = settings.detach(),
            run_as_nobody = settings.run_as_nobody(),
            "Configuration loaded"
        );
        self.state.advance(LifecycleState::ConfigResolved);

        let settings = self.settings.insert(settings);
        let config_path = settings.config_path().to_path_buf();
        let run_as_nobody = settings.run_as_nobody();
        let detach = settings.detach();

        self.manager.start(settings)?;
        self.manager_running = true;
        self.state.advance(LifecycleState::ManagerStarted);

        if run_as_nobody {
            self.process.drop_privileges()?;
        }
        self.state.advance(LifecycleState::PrivilegeDropped);

        let watcher = &*self.watcher.insert(ConfigWatcher::install(&config_path)?);
        signals::ignore_sigpipe().map_err(|errno| DaemonError::Signals(errno.into()))?;
        signals::block_termination().map_err(|errno| DaemonError::Signals(errno.into()))?;
        self.termination_blocked = true;
        self.state.advance(LifecycleState::Watching);

        if detach {
            self.process.detach()?;
            if let Some(logging) = &self.logging {
                if let Err(e) = logging.use_journal() {
                    tracing::warn!(error = %e, "Journal unavailable, logging to stderr only");
                }
            }
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(DaemonError::Runtime)?;
        self.state.advance(LifecycleState::Running);

        let reason = runtime.block_on(event_loop(watcher, &self.shutdown))?;
        Ok(Exit::Stopped(reason))
    }

    fn teardown(&mut self, succeeded: bool) {
        if self.state == LifecycleState::Running {
            self.state.advance(LifecycleState::ShuttingDown);
        }

        if let Some(watcher) = self.watcher.take() {
            watcher.remove();
        }
        if std::mem::take(&mut self.manager_running) {
            self.manager.stop();
        }
        self.settings = None;

        // A signal still held here was never seen by the loop, so it gets
        // its default action now that cleanup is done.
        if std::mem::take(&mut self.termination_blocked) {
            if let Err(errno) = signals::unblock_termination() {
                tracing::warn!(error = %errno, "Failed to unblock termination signals");
            }
        }

        self.state.advance(if succeeded {
            LifecycleState::Stopped
        } else {
            LifecycleState::Failed
        });
        tracing::info!(state = %self.state, "Exiting");
    }
}

/// Wait for the first termination request: a signal or a config change.
async fn event_loop(watcher: &ConfigWatcher, shutdown: &Shutdown) -> Result<ShutdownReason, DaemonError> {
    let _signals = signals::install(shutdown.clone()).map_err(DaemonError::Signals)?;
    signals::unblock_termination().map_err(|errno| DaemonError::Signals(errno.into()))?;
    tracing::info!("KNoT gateway running");

    tokio::select! {
        reason = shutdown.wait() => Ok(reason),
        changed = watcher.changed() => {
            changed?;
            tracing::info!(path = %watcher.path().display(), "Configuration file changed");
            shutdown.request(ShutdownReason::ConfigChanged);
            Ok(shutdown.wait().await)
        }
    }
}
