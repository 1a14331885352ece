//! Opening a database with an optional download first.

use crate::applier::{apply_changes, ApplyStats};
use crate::config::{OpenBehavior, SyncOpenConfig, TimeoutBehavior};
use crate::error::{SyncError, SyncResult};
use crate::source::RemoteSource;
use pondb_core::{Config, Database};
use std::path::PathBuf;

/// Which database to open.
#[derive(Debug, Clone)]
pub enum OpenTarget {
    /// A database directory on disk.
    Path(PathBuf, Config),
    /// A fresh in-memory database.
    InMemory,
}

impl OpenTarget {
    /// A directory with the default configuration.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self::Path(path.into(), Config::default())
    }

    fn open(&self) -> SyncResult<Database> {
        let db = match self {
            Self::Path(path, config) => Database::open_with_config(path, config.clone())?,
            Self::InMemory => Database::open_in_memory()?,
        };
        Ok(db)
    }
}

/// Result of [`open_synced`].
#[derive(Debug)]
pub struct OpenOutcome {
    /// The opened database.
    pub database: Database,
    /// Number of downloaded changes that took effect.
    pub downloaded: usize,
    /// True if the download timed out and the local copy was opened.
    pub timed_out: bool,
}

/// Fetches one batch from `source` and applies it to `db`.
pub async fn download<S: RemoteSource>(db: &Database, source: &S) -> SyncResult<ApplyStats> {
    let changes = source.fetch().await?;
    tracing::debug!(changes = changes.len(), "remote batch fetched");
    apply_changes(db, &changes)
}

/// Opens `target`, downloading from `source` first when the configured
/// behaviour asks for it.
///
/// The behaviour is picked by whether the database was new. Errors are
/// passed to the configured error handler before being returned; a timeout
/// with [`TimeoutBehavior::OpenLocal`] is reported but not returned.
pub async fn open_synced<S: RemoteSource>(
    target: OpenTarget,
    config: &SyncOpenConfig,
    source: &S,
) -> SyncResult<OpenOutcome> {
    if let Err(err) = config.validate() {
        config.report(&err);
        return Err(err);
    }

    let database = match target.open() {
        Ok(db) => db,
        Err(err) => {
            config.report(&err);
            return Err(err);
        }
    };
    let behavior = config.behavior_for(database.is_new());

    let OpenBehavior::DownloadBeforeOpen {
        timeout,
        on_timeout,
    } = behavior
    else {
        tracing::debug!(new = database.is_new(), "opening without download");
        return Ok(OpenOutcome {
            database,
            downloaded: 0,
            timed_out: false,
        });
    };

    match tokio::time::timeout(timeout, download(&database, source)).await {
        Ok(Ok(stats)) => {
            tracing::info!(
                downloaded = stats.total(),
                committed_seq = %database.committed_seq(),
                "download before open finished"
            );
            Ok(OpenOutcome {
                database,
                downloaded: stats.total(),
                timed_out: false,
            })
        }
        Ok(Err(err)) => {
            config.report(&err);
            Err(err)
        }
        Err(_) => {
            let err = SyncError::Timeout { after: timeout };
            config.report(&err);
            match on_timeout {
                TimeoutBehavior::OpenLocal => {
                    tracing::warn!(?timeout, "download timed out, opening local copy");
                    Ok(OpenOutcome {
                        database,
                        downloaded: 0,
                        timed_out: true,
                    })
                }
                TimeoutBehavior::Fail => Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MockSource, RemoteChange};
    use pondb_core::{PrimaryKey, Record, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn frogs() -> Vec<RemoteChange> {
        vec![
            RemoteChange::upsert("Frog", Record::new("Greyfrog").with("age", 4)),
            RemoteChange::upsert("Frog", Record::new("Green").with("age", 45)),
        ]
    }

    #[tokio::test]
    async fn immediate_open_skips_download() {
        let source = MockSource::new(frogs());
        let outcome = open_synced(OpenTarget::InMemory, &SyncOpenConfig::new(), &source)
            .await
            .unwrap();
        assert_eq!(outcome.downloaded, 0);
        assert!(!outcome.timed_out);
        assert_eq!(source.fetch_count(), 0);
    }

    #[tokio::test]
    async fn downloads_before_open() {
        let source = MockSource::new(frogs());
        let config = SyncOpenConfig::new()
            .download_before_open(Duration::from_secs(5), TimeoutBehavior::Fail);

        let outcome = open_synced(OpenTarget::InMemory, &config, &source)
            .await
            .unwrap();
        assert_eq!(outcome.downloaded, 2);
        let frog = outcome
            .database
            .find("Frog", &PrimaryKey::from("Greyfrog"))
            .unwrap()
            .unwrap();
        assert_eq!(frog.get("age"), Some(&Value::Integer(4)));
    }

    #[tokio::test]
    async fn timeout_opens_local_and_reports() {
        let reported = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reported);
        let source = MockSource::new(frogs()).with_delay(Duration::from_secs(5));
        let config = SyncOpenConfig::new()
            .download_before_open(Duration::from_millis(20), TimeoutBehavior::OpenLocal)
            .on_error(move |err| {
                assert!(matches!(err, SyncError::Timeout { .. }));
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let outcome = open_synced(OpenTarget::InMemory, &config, &source)
            .await
            .unwrap();
        assert!(outcome.timed_out);
        assert_eq!(outcome.downloaded, 0);
        assert_eq!(reported.load(Ordering::SeqCst), 1);
        assert!(outcome.database.collections().unwrap().is_empty());
    }

    #[tokio::test]
    async fn timeout_fails_when_configured() {
        let source = MockSource::new(frogs()).with_delay(Duration::from_secs(5));
        let config = SyncOpenConfig::new()
            .download_before_open(Duration::from_millis(20), TimeoutBehavior::Fail);

        let err = open_synced(OpenTarget::InMemory, &config, &source)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Timeout { .. }));
    }

    #[tokio::test]
    async fn source_error_is_reported_and_returned() {
        let reported = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&reported);
        let source = MockSource::default().failing("offline");
        let config = SyncOpenConfig::new()
            .download_before_open(Duration::from_secs(5), TimeoutBehavior::OpenLocal)
            .on_error(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        let err = open_synced(OpenTarget::InMemory, &config, &source)
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(reported.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalid_config_rejected() {
        let source = MockSource::default();
        let config = SyncOpenConfig::new().new_file_behavior(OpenBehavior::download_before_open(
            Duration::ZERO,
            TimeoutBehavior::Fail,
        ));
        let err = open_synced(OpenTarget::InMemory, &config, &source)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::InvalidConfig(_)));
        assert_eq!(source.fetch_count(), 0);
    }
}
