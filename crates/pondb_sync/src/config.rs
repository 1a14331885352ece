//! Open behaviour configuration.

use crate::error::{SyncError, SyncResult};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// What to do when the download does not finish in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutBehavior {
    /// Open whatever is stored locally.
    #[default]
    OpenLocal,
    /// Fail the open with [`SyncError::Timeout`].
    Fail,
}

/// How to open a database file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenBehavior {
    /// Open the local file without waiting for the remote.
    #[default]
    OpenImmediately,
    /// Download and apply remote changes before handing out the database.
    DownloadBeforeOpen {
        /// How long to wait for the download.
        timeout: Duration,
        /// What to do when it takes longer.
        on_timeout: TimeoutBehavior,
    },
}

impl OpenBehavior {
    /// Download first, waiting at most `timeout`.
    #[must_use]
    pub const fn download_before_open(timeout: Duration, on_timeout: TimeoutBehavior) -> Self {
        Self::DownloadBeforeOpen {
            timeout,
            on_timeout,
        }
    }
}

type ErrorHandler = Arc<dyn Fn(&SyncError) + Send + Sync>;

/// Configuration for [`crate::open_synced`].
///
/// ```rust
/// use pondb_sync::{OpenBehavior, SyncOpenConfig, TimeoutBehavior};
/// use std::time::Duration;
///
/// let config = SyncOpenConfig::new()
///     .download_before_open(Duration::from_millis(1000), TimeoutBehavior::OpenLocal)
///     .on_error(|err| eprintln!("sync: {err}"));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Default)]
pub struct SyncOpenConfig {
    /// Behaviour when the database did not exist before.
    pub new_file_behavior: OpenBehavior,
    /// Behaviour when the database already had data.
    pub existing_file_behavior: OpenBehavior,
    on_error: Option<ErrorHandler>,
}

impl SyncOpenConfig {
    /// Opens immediately in both cases, with no error handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the behaviour for new databases.
    #[must_use]
    pub fn new_file_behavior(mut self, behavior: OpenBehavior) -> Self {
        self.new_file_behavior = behavior;
        self
    }

    /// Sets the behaviour for existing databases.
    #[must_use]
    pub fn existing_file_behavior(mut self, behavior: OpenBehavior) -> Self {
        self.existing_file_behavior = behavior;
        self
    }

    /// Downloads before open for both new and existing databases.
    #[must_use]
    pub fn download_before_open(self, timeout: Duration, on_timeout: TimeoutBehavior) -> Self {
        let behavior = OpenBehavior::download_before_open(timeout, on_timeout);
        self.new_file_behavior(behavior)
            .existing_file_behavior(behavior)
    }

    /// Registers a callback invoked with every error raised while opening,
    /// including timeouts that fall back to the local copy.
    #[must_use]
    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SyncError) + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(handler));
        self
    }

    /// The behaviour for a database that is (or is not) new.
    #[must_use]
    pub fn behavior_for(&self, is_new: bool) -> OpenBehavior {
        if is_new {
            self.new_file_behavior
        } else {
            self.existing_file_behavior
        }
    }

    /// Rejects zero timeouts.
    pub fn validate(&self) -> SyncResult<()> {
        for (which, behavior) in [
            ("new_file_behavior", self.new_file_behavior),
            ("existing_file_behavior", self.existing_file_behavior),
        ] {
            if let OpenBehavior::DownloadBeforeOpen { timeout, .. } = behavior {
                if timeout.is_zero() {
                    return Err(SyncError::InvalidConfig(format!(
                        "{which}: download timeout must be greater than zero"
                    )));
                }
            }
        }
        Ok(())
    }

    pub(crate) fn report(&self, err: &SyncError) {
        if let Some(handler) = &self.on_error {
            handler(err);
        }
    }
}

impl fmt::Debug for SyncOpenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOpenConfig")
            .field("new_file_behavior", &self.new_file_behavior)
            .field("existing_file_behavior", &self.existing_file_behavior)
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn defaults_open_immediately() {
        let config = SyncOpenConfig::new();
        assert_eq!(config.behavior_for(true), OpenBehavior::OpenImmediately);
        assert_eq!(config.behavior_for(false), OpenBehavior::OpenImmediately);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn download_before_open_sets_both() {
        let config = SyncOpenConfig::new()
            .download_before_open(Duration::from_millis(1000), TimeoutBehavior::OpenLocal);
        let expected = OpenBehavior::DownloadBeforeOpen {
            timeout: Duration::from_millis(1000),
            on_timeout: TimeoutBehavior::OpenLocal,
        };
        assert_eq!(config.new_file_behavior, expected);
        assert_eq!(config.existing_file_behavior, expected);
    }

    #[test]
    fn zero_timeout_rejected() {
        let config = SyncOpenConfig::new().existing_file_behavior(
            OpenBehavior::download_before_open(Duration::ZERO, TimeoutBehavior::Fail),
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("existing_file_behavior"));
    }

    #[test]
    fn report_calls_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let config = SyncOpenConfig::new().on_error(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        config.report(&SyncError::source_fatal("nope"));
        config.report(&SyncError::source_fatal("nope"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(format!("{config:?}").contains("on_error: true"));
    }
}
