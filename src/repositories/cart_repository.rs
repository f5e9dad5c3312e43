use async_trait::async_trait;
use std::path::PathBuf;
use tracing::instrument;

use super::CollectionFile;
use crate::models::{Cart, RepositoryResult};
use crate::observability::StorageTracer;

/// Trait defining the interface for cart collection access
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Load every cart in stored order
    async fn find_all(&self) -> RepositoryResult<Vec<Cart>>;

    /// Replace the stored collection with `carts`
    async fn save_all(&self, carts: &[Cart]) -> RepositoryResult<()>;
}

/// Cart repository backed by a single JSON collection file
pub struct FileCartRepository {
    file: CollectionFile<Cart>,
}

impl FileCartRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: CollectionFile::new(path, "carts"),
        }
    }

    pub fn with_tracer(self, tracer: StorageTracer) -> Self {
        Self {
            file: self.file.with_tracer(tracer),
        }
    }

    pub async fn ensure_exists(&self) -> RepositoryResult<bool> {
        self.file.ensure_exists().await
    }

    pub fn file(&self) -> &CollectionFile<Cart> {
        &self.file
    }
}

#[async_trait]
impl CartRepository for FileCartRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> RepositoryResult<Vec<Cart>> {
        self.file.read_all().await
    }

    #[instrument(skip(self, carts), fields(count = carts.len()))]
    async fn save_all(&self, carts: &[Cart]) -> RepositoryResult<()> {
        self.file.write_all(carts).await
    }
}
