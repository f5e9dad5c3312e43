use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    parse_product_id, Product, ProductId, ProductPayload, ServiceError, ServiceResult,
};
use crate::repositories::ProductRepository;
use crate::services::ProductIdSequence;

/// Service for managing the product collection
pub struct ProductService {
    repository: Arc<dyn ProductRepository>,
    ids: ProductIdSequence,
}

impl ProductService {
    pub fn new(repository: Arc<dyn ProductRepository>, ids: ProductIdSequence) -> Self {
        Self { repository, ids }
    }

    /// Create the service with its id sequence seeded from the stored collection.
    ///
    /// An unreadable collection seeds the sequence at zero; the failure is
    /// logged and will surface again on the first request touching the file.
    pub async fn initialize(repository: Arc<dyn ProductRepository>) -> Self {
        let ids = match repository.find_all().await {
            Ok(products) => ProductIdSequence::seeded_from(&products),
            Err(e) => {
                crate::warn_with_trace!(
                    error = %e,
                    "Failed to read products while seeding the id sequence, starting from 0"
                );
                ProductIdSequence::default()
            }
        };

        crate::info_with_trace!("Product id sequence seeded at {}", ids.last_id());
        Self::new(repository, ids)
    }

    /// Highest id assigned so far (or the startup seed)
    pub fn last_assigned_id(&self) -> ProductId {
        self.ids.last_id()
    }

    /// List products in stored order, keeping at most `limit` of them
    #[instrument(skip(self))]
    pub async fn list_products(&self, limit: Option<usize>) -> ServiceResult<Vec<Product>> {
        let mut products = self.repository.find_all().await?;

        if let Some(limit) = limit {
            products.truncate(limit);
        }

        crate::info_with_trace!("Listing {} products", products.len());
        Ok(products)
    }

    /// Get a product by its raw path id
    #[instrument(skip(self))]
    pub async fn get_product(&self, raw_id: &str) -> ServiceResult<Product> {
        let products = self.repository.find_all().await?;

        parse_product_id(raw_id)
            .and_then(|id| products.into_iter().find(|product| product.id == id))
            .ok_or_else(|| {
                crate::warn_with_trace!("Product not found");
                ServiceError::ProductNotFound {
                    id: raw_id.to_string(),
                }
            })
    }

    /// Create a product from an arbitrary payload and append it to the collection
    #[instrument(skip(self, payload), fields(fields = payload.len()))]
    pub async fn create_product(&self, payload: ProductPayload) -> ServiceResult<Product> {
        let mut products = self.repository.find_all().await?;

        // The sequence may lag the file when it was unreadable at startup
        let stored_max = products.iter().map(|product| product.id).max().unwrap_or(0);
        let product = Product::new(self.ids.next_id_after(stored_max), payload);
        products.push(product.clone());

        self.repository.save_all(&products).await?;

        crate::info_with_trace!(product_id = product.id, "Product created");
        Ok(product)
    }

    /// Shallow-merge a payload into an existing product
    #[instrument(skip(self, payload))]
    pub async fn update_product(
        &self,
        raw_id: &str,
        payload: ProductPayload,
    ) -> ServiceResult<Product> {
        let mut products = self.repository.find_all().await?;

        let product = parse_product_id(raw_id)
            .and_then(|id| products.iter_mut().find(|product| product.id == id))
            .ok_or_else(|| ServiceError::ProductNotFound {
                id: raw_id.to_string(),
            })?;

        product.merge(payload);
        let updated = product.clone();

        self.repository.save_all(&products).await?;

        crate::info_with_trace!(product_id = updated.id, "Product updated");
        Ok(updated)
    }

    /// Remove a product from the collection.
    ///
    /// The collection is rewritten either way; returns whether a product
    /// was actually removed.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, raw_id: &str) -> ServiceResult<bool> {
        let mut products = self.repository.find_all().await?;
        let before = products.len();

        if let Some(id) = parse_product_id(raw_id) {
            products.retain(|product| product.id != id);
        }
        let removed = products.len() != before;

        self.repository.save_all(&products).await?;

        if removed {
            crate::info_with_trace!("Product deleted");
        } else {
            crate::warn_with_trace!("Delete requested for unknown product");
        }
        Ok(removed)
    }
}
