//! Daemon run stages.
//!
//! # State Transitions
//! ```text
//! Init → ConfigResolved → ManagerStarted → PrivilegeDropped
//!      → Watching → Running → ShuttingDown → Stopped
//!
//! Init → Stopped            (--help)
//! any non-terminal → Failed
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Init,
    ConfigResolved,
    ManagerStarted,
    PrivilegeDropped,
    Watching,
    Running,
    ShuttingDown,
    Stopped,
    Failed,
}

impl LifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LifecycleState::Stopped | LifecycleState::Failed)
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Failed {
            return true;
        }
        matches!(
            (self, next),
            (Init, ConfigResolved)
                | (Init, Stopped)
                | (ConfigResolved, ManagerStarted)
                | (ManagerStarted, PrivilegeDropped)
                | (PrivilegeDropped, Watching)
                | (Watching, Running)
                | (Running, ShuttingDown)
                | (ShuttingDown, Stopped)
        )
    }

    /// Move to `next`, which must be a legal successor.
    pub fn advance(&mut self, next: LifecycleState) {
        debug_assert!(self.can_advance_to(next), "illegal transition {} -> {}", self, next);
        tracing::debug!(from = %self, to = %next, "Lifecycle transition");
        *self = next;
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Init => "init",
            LifecycleState::ConfigResolved => "config-resolved",
            LifecycleState::ManagerStarted => "manager-started",
            LifecycleState::PrivilegeDropped => "privilege-dropped",
            LifecycleState::Watching => "watching",
            LifecycleState::Running => "running",
            LifecycleState::ShuttingDown => "shutting-down",
            LifecycleState::Stopped => "stopped",
            LifecycleState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::LifecycleState::*;
    use super::*;

    #[test]
    fn test_happy_path_is_legal() {
        let path = [
            Init,
            ConfigResolved,
            ManagerStarted,
            PrivilegeDropped,
            Watching,
            Running,
            ShuttingDown,
            Stopped,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_advance_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_no_skipping_stages() {
        assert!(!Init.can_advance_to(ManagerStarted));
        assert!(!ManagerStarted.can_advance_to(Running));
        assert!(!Running.can_advance_to(Stopped));
    }

    #[test]
    fn test_failed_reachable_from_non_terminal() {
        for state in [Init, ConfigResolved, ManagerStarted, PrivilegeDropped, Watching, Running, ShuttingDown] {
            assert!(state.can_advance_to(Failed));
        }
    }

    #[test]
    fn test_advance() {
        let mut state = Init;
        state.advance(ConfigResolved);
        assert_eq!(state, ConfigResolved);
        state.advance(Failed);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in [Init, Running, Stopped, Failed] {
            assert!(!Stopped.can_advance_to(next));
            assert!(!Failed.can_advance_to(next));
        }
    }
}
