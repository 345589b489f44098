//! Configuration file watcher.
//!
//! The daemon does not hot-reload: a modification of the config file only
//! asks the event loop to exit so the supervisor restarts it with fresh
//! settings.
//!
//! The watch is an inotify descriptor installed before the process detaches.
//! It only joins the tokio reactor once the event loop runs, so it survives
//! the fork done by daemonizing.

use std::io;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, RawFd};
use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::sys::inotify::{AddWatchFlags, InitFlags, Inotify, InotifyEvent, WatchDescriptor};
use thiserror::Error;
use tokio::io::unix::AsyncFd;

/// Error type for the config watch.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to create inotify instance: {0}")]
    Init(#[source] Errno),

    #[error("failed to watch {}: {source}", path.display())]
    AddWatch {
        path: PathBuf,
        #[source]
        source: Errno,
    },

    #[error("failed to register config watch with the event loop: {0}")]
    Register(#[source] io::Error),
}

/// Watches a single file for content modification.
#[derive(Debug)]
pub struct ConfigWatcher {
    inotify: Inotify,
    wd: WatchDescriptor,
    path: PathBuf,
}

/// Borrowed view of the inotify descriptor for reactor registration.
struct WatchFd<'a>(&'a Inotify);

impl AsFd for WatchFd<'_> {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.0.as_fd()
    }
}

impl AsRawFd for WatchFd<'_> {
    fn as_raw_fd(&self) -> RawFd {
        self.as_fd().as_raw_fd()
    }
}

impl ConfigWatcher {
    /// Install a modify watch on `path`.
    pub fn install(path: &Path) -> Result<Self, WatchError> {
        let inotify = Inotify::init(InitFlags::IN_NONBLOCK | InitFlags::IN_CLOEXEC)
            .map_err(WatchError::Init)?;
        let wd = inotify
            .add_watch(path, AddWatchFlags::IN_MODIFY)
            .map_err(|source| WatchError::AddWatch {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(Self {
            inotify,
            wd,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve once the file has been modified.
    ///
    /// Must be polled inside a tokio runtime. Read failures are logged and
    /// treated as "no event"; the only error is failing to register the
    /// descriptor with the reactor.
    pub async fn changed(&self) -> Result<(), WatchError> {
        // SAFETY: `WatchFd` borrows `self.inotify`, so the descriptor stays open
        // and unchanged for the whole lifetime of `fd`.
        let fd = unsafe { AsyncFd::register(WatchFd(&self.inotify)) }
            .map_err(|e| WatchError::Register(e.into()))?;

        loop {
            let mut guard = fd.readable().await.map_err(WatchError::Register)?;
            match self.drain() {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(Errno::EAGAIN) => guard.clear_ready(),
                Err(errno) => {
                    tracing::warn!(path = %self.path.display(), error = %errno, "Error reading config watch");
                    guard.clear_ready();
                }
            }
        }
    }

    /// Read every buffered event and report whether any was a modification.
    ///
    /// Events read together collapse into a single answer.
    pub fn drain(&self) -> Result<bool, Errno> {
        let events = self.inotify.read_events()?;
        tracing::debug!(path = %self.path.display(), events = events.len(), "Read config watch events");
        Ok(contains_modify(&events))
    }

    /// Remove the watch and close the descriptor.
    pub fn remove(self) {
        if let Err(errno) = self.inotify.rm_watch(self.wd) {
            // The kernel drops the watch by itself when the file is deleted.
            tracing::debug!(path = %self.path.display(), error = %errno, "Config watch already gone");
        }
        tracing::info!(path = %self.path.display(), "Config watcher stopped");
    }
}

fn contains_modify(events: &[InotifyEvent]) -> bool {
    events
        .iter()
        .any(|event| event.mask.contains(AddWatchFlags::IN_MODIFY))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_install_fails_for_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ConfigWatcher::install(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, WatchError::AddWatch { source: Errno::ENOENT, .. }));
    }

    #[test]
    fn test_drain_without_events_would_block() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let watcher = ConfigWatcher::install(file.path()).unwrap();

        assert_eq!(watcher.drain(), Err(Errno::EAGAIN));
        watcher.remove();
    }

    #[test]
    fn test_multiple_writes_coalesce_into_one_drain() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let watcher = ConfigWatcher::install(file.path()).unwrap();

        for _ in 0..3 {
            file.write_all(b"{}").unwrap();
        }

        assert_eq!(watcher.drain(), Ok(true));
        assert_eq!(watcher.drain(), Err(Errno::EAGAIN));
    }

    #[tokio::test]
    async fn test_changed_resolves_on_modification() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let watcher = ConfigWatcher::install(file.path()).unwrap();
        let path = file.path().to_path_buf();

        let writer = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            std::fs::write(&path, b"{\"cloud\":{}}").unwrap();
        });

        tokio::time::timeout(Duration::from_secs(5), watcher.changed())
            .await
            .expect("modification not observed")
            .unwrap();
        writer.join().unwrap();
    }

    #[tokio::test]
    async fn test_changed_stays_pending_without_modification() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let watcher = ConfigWatcher::install(file.path()).unwrap();

        let result = tokio::time::timeout(Duration::from_millis(200), watcher.changed()).await;
        assert!(result.is_err());
    }
}
