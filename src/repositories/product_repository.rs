use async_trait::async_trait;
use std::path::PathBuf;
use tracing::instrument;

use super::CollectionFile;
use crate::models::{Product, RepositoryResult};
use crate::observability::StorageTracer;

/// Trait defining the interface for product collection access
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Load every product in stored order
    async fn find_all(&self) -> RepositoryResult<Vec<Product>>;

    /// Replace the stored collection with `products`
    async fn save_all(&self, products: &[Product]) -> RepositoryResult<()>;
}

/// Product repository backed by a single JSON collection file
pub struct FileProductRepository {
    file: CollectionFile<Product>,
}

impl FileProductRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: CollectionFile::new(path, "products"),
        }
    }

    pub fn with_tracer(self, tracer: StorageTracer) -> Self {
        Self {
            file: self.file.with_tracer(tracer),
        }
    }

    /// Create the collection file if it is missing
    pub async fn ensure_exists(&self) -> RepositoryResult<bool> {
        self.file.ensure_exists().await
    }

    pub fn file(&self) -> &CollectionFile<Product> {
        &self.file
    }
}

#[async_trait]
impl ProductRepository for FileProductRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> RepositoryResult<Vec<Product>> {
        self.file.read_all().await
    }

    #[instrument(skip(self, products), fields(count = products.len()))]
    async fn save_all(&self, products: &[Product]) -> RepositoryResult<()> {
        self.file.write_all(products).await
    }
}
