use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tracing::{debug, info, Instrument};

use crate::models::{RepositoryError, RepositoryResult};
use crate::observability::StorageTracer;

/// A JSON file holding the complete ordered array of one entity type.
///
/// Every read parses the whole file and every write replaces it with the
/// pretty-printed collection. There is no locking: concurrent writers race
/// and the last one wins.
pub struct CollectionFile<T> {
    path: PathBuf,
    collection: &'static str,
    tracer: Option<StorageTracer>,
    _entity: PhantomData<fn() -> T>,
}

impl<T> CollectionFile<T>
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    pub fn new(path: impl Into<PathBuf>, collection: &'static str) -> Self {
        Self {
            path: path.into(),
            collection,
            tracer: None,
            _entity: PhantomData,
        }
    }

    /// Record reads and writes as storage metrics
    pub fn with_tracer(mut self, tracer: StorageTracer) -> Self {
        self.tracer = Some(tracer);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn collection(&self) -> &'static str {
        self.collection
    }

    fn create_storage_span(&self, operation: &str) -> tracing::Span {
        tracing::info_span!(
            "CollectionFile",
            "otel.kind" = "client",
            "otel.name" = %format!("{}.{}", self.collection, operation),
            "db.system" = "json-file",
            "db.name" = self.collection,
            "db.operation" = operation,
            "file.path" = %self.path.display(),
            "entity.count" = tracing::field::Empty,
        )
    }

    /// Read and parse the whole collection
    pub async fn read_all(&self) -> RepositoryResult<Vec<T>> {
        let span = self.create_storage_span("read");
        let read_span = span.clone();
        let read = async move {
            let raw = tokio::fs::read_to_string(&self.path).await.map_err(|source| {
                RepositoryError::Read {
                    path: self.path.clone(),
                    source,
                }
            })?;

            let entities: Vec<T> =
                serde_json::from_str(&raw).map_err(|source| RepositoryError::Malformed {
                    path: self.path.clone(),
                    source,
                })?;

            read_span.record("entity.count", entities.len());
            debug!("Read {} entities", entities.len());
            Ok::<_, RepositoryError>(entities)
        };

        self.traced("read", read).instrument(span).await
    }

    /// Serialize the whole collection and replace the file contents
    pub async fn write_all(&self, entities: &[T]) -> RepositoryResult<()> {
        let span = self.create_storage_span("write");
        let write_span = span.clone();
        let write = async move {
            let raw = serde_json::to_string_pretty(entities)?;

            tokio::fs::write(&self.path, raw)
                .await
                .map_err(|source| RepositoryError::Write {
                    path: self.path.clone(),
                    source,
                })?;

            write_span.record("entity.count", entities.len());
            debug!("Wrote {} entities", entities.len());
            Ok::<_, RepositoryError>(())
        };

        self.traced("write", write).instrument(span).await
    }

    /// Create the file with an empty array when it does not exist yet.
    ///
    /// Returns whether the file was created.
    pub async fn ensure_exists(&self) -> RepositoryResult<bool> {
        match tokio::fs::metadata(&self.path).await {
            Ok(_) => Ok(false),
            Err(error) if error.kind() == ErrorKind::NotFound => {
                if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    tokio::fs::create_dir_all(parent).await.map_err(|source| {
                        RepositoryError::Write {
                            path: self.path.clone(),
                            source,
                        }
                    })?;
                }

                self.write_all(&[]).await?;
                info!(
                    collection = self.collection,
                    path = %self.path.display(),
                    "Initialized empty collection file"
                );
                Ok(true)
            }
            Err(source) => Err(RepositoryError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn traced<F, R>(&self, operation: &str, future: F) -> RepositoryResult<R>
    where
        F: std::future::Future<Output = RepositoryResult<R>>,
    {
        match &self.tracer {
            Some(tracer) => {
                tracer
                    .trace_operation(operation, self.collection, future)
                    .await
            }
            None => future.await,
        }
    }
}
