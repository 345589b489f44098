//! Shared utilities for integration tests.

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use knotd::config::Settings;
use knotd::lifecycle::{DaemonError, ProcessControl, Shutdown, ShutdownReason};
use knotd::manager::{Manager, ManagerError};
use nix::sys::signal::Signal;
use tempfile::NamedTempFile;

/// Write a config file with the given extension (`json` or `conf`).
pub fn config_file(extension: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(&format!(".{}", extension))
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// `knotd -c <path> <extra...>`
#[allow(dead_code)]
pub fn argv(file: &NamedTempFile, extra: &[&str]) -> Vec<String> {
    let mut args = vec![
        "knotd".to_string(),
        "-c".to_string(),
        file.path().display().to_string(),
    ];
    args.extend(extra.iter().map(|arg| arg.to_string()));
    args
}

/// Requests shutdown if a test would otherwise hang.
#[allow(dead_code)]
pub fn watchdog(shutdown: Shutdown) {
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(10));
        shutdown.request(ShutdownReason::Requested);
    });
}

/// Manager that counts calls and remembers what it was started with.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct RecordingManager {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
    pub started_with: Arc<Mutex<Option<Settings>>>,
    pub fail_start: bool,
}

#[allow(dead_code)]
impl RecordingManager {
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl Manager for RecordingManager {
    fn start(&mut self, settings: &Settings) -> Result<(), ManagerError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(ManagerError::Start("radio not found".into()));
        }
        *self.started_with.lock().unwrap() = Some(settings.clone());
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Process control double; never forks or changes identity.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct FakeProcess {
    pub drops: Arc<AtomicUsize>,
    pub detaches: Arc<AtomicUsize>,
    pub fail_drop: bool,
    pub fail_detach: bool,
    /// Deleted during the privilege drop step, so the watch cannot be installed.
    pub remove_on_drop: Option<PathBuf>,
    /// Raised on the daemon thread while detaching.
    pub raise_on_detach: Option<Signal>,
}

#[allow(dead_code)]
impl FakeProcess {
    pub fn drop_count(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }

    pub fn detach_count(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }
}

impl ProcessControl for FakeProcess {
    fn drop_privileges(&mut self) -> Result<(), DaemonError> {
        self.drops.fetch_add(1, Ordering::SeqCst);
        if let Some(path) = &self.remove_on_drop {
            std::fs::remove_file(path).unwrap();
        }
        if self.fail_drop {
            return Err(DaemonError::PrivilegeDrop {
                uid: 65534,
                source: nix::errno::Errno::EPERM,
            });
        }
        Ok(())
    }

    fn detach(&mut self) -> Result<(), DaemonError> {
        self.detaches.fetch_add(1, Ordering::SeqCst);
        if self.fail_detach {
            return Err(DaemonError::Detach("fork failed".into()));
        }
        if let Some(signal) = self.raise_on_detach {
            nix::sys::signal::raise(signal).unwrap();
        }
        Ok(())
    }
}
