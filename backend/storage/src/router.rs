/// Backend router: hand a filtered canonical event to the configured store.
///
/// File: render → per-key lock → append. Database: insert directly, no lock.
use chanlogs_config::{Backend, ChanlogsConfig};
use chanlogs_core::{CanonicalEvent, ChanlogError, Formatter, Result, StorageKey};
use tracing::{debug, info};

use crate::coordinator::WriteCoordinator;
use crate::database::DatabaseBackend;
use crate::file::FileBackend;
use crate::WriteOutcome;

#[derive(Debug)]
pub enum BackendRouter {
    File {
        formatter: Formatter,
        coordinator: WriteCoordinator,
        backend: FileBackend,
    },
    Database(DatabaseBackend),
}

impl BackendRouter {
    pub fn file(formatter: Formatter, backend: FileBackend) -> Self {
        Self::File { formatter, coordinator: WriteCoordinator::new(), backend }
    }

    pub fn database(backend: DatabaseBackend) -> Self {
        Self::Database(backend)
    }

    /// Build the router selected by `config.backend`.
    pub fn from_config(config: &ChanlogsConfig) -> Result<Self> {
        match config.backend {
            Backend::File => {
                let backend = FileBackend::new(config.logdir.clone());
                Ok(Self::file(config.formatter()?, backend))
            }
            Backend::Database => {
                let dsn = config
                    .connection_string
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| {
                        ChanlogError::Config(
                            "the database backend requires connection_string".into(),
                        )
                    })?;
                Ok(Self::database(DatabaseBackend::new(dsn, config.network.clone())))
            }
        }
    }

    pub fn backend(&self) -> Backend {
        match self {
            Self::File { .. } => Backend::File,
            Self::Database(_) => Backend::Database,
        }
    }

    /// One-time startup work: log directory or database schema.
    pub async fn bootstrap(&self) -> Result<()> {
        match self {
            Self::File { backend, .. } => backend.ensure_logdir().await?,
            Self::Database(db) => db.provision_schema().await?,
        }
        info!("[Router] {:?} backend ready", self.backend());
        Ok(())
    }

    pub async fn dispatch(&self, event: &CanonicalEvent, key: &StorageKey) -> Result<WriteOutcome> {
        match self {
            Self::File { formatter, coordinator, backend } => {
                // Render outside the lock; a template error never touches the file.
                let line = formatter.render(event)?;
                let path = backend.path_for(key);
                coordinator.with_lock(key, || backend.append(&path, &line)).await?;
                debug!("[Router] {} → {}", event.event_type(), path.display());
                Ok(WriteOutcome::Written)
            }
            Self::Database(db) => db.insert(event).await,
        }
    }
}
