use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::models::{Cart, CartLineItem, ServiceError, ServiceResult};
use crate::repositories::CartRepository;

/// Service for managing shopping carts
pub struct CartService {
    repository: Arc<dyn CartRepository>,
}

impl CartService {
    pub fn new(repository: Arc<dyn CartRepository>) -> Self {
        Self { repository }
    }

    /// Create an empty cart with a fresh random id
    #[instrument(skip(self))]
    pub async fn create_cart(&self) -> ServiceResult<Cart> {
        let mut carts = self.repository.find_all().await?;

        let mut id = Uuid::new_v4().to_string();
        while carts.iter().any(|cart| cart.id == id) {
            crate::warn_with_trace!("Cart id collision detected, regenerating");
            id = Uuid::new_v4().to_string();
        }

        let cart = Cart::new(id);
        carts.push(cart.clone());

        self.repository.save_all(&carts).await?;

        crate::info_with_trace!(cart_id = %cart.id, "Cart created");
        Ok(cart)
    }

    /// Line items of a cart
    #[instrument(skip(self))]
    pub async fn get_cart_products(&self, cart_id: &str) -> ServiceResult<Vec<CartLineItem>> {
        let carts = self.repository.find_all().await?;

        carts
            .into_iter()
            .find(|cart| cart.id == cart_id)
            .map(|cart| cart.products)
            .ok_or_else(|| ServiceError::CartNotFound {
                id: cart_id.to_string(),
            })
    }

    /// Add one unit of a product to a cart.
    ///
    /// The product id is not checked against the product collection.
    #[instrument(skip(self))]
    pub async fn add_product_to_cart(
        &self,
        cart_id: &str,
        product_id: &str,
    ) -> ServiceResult<Cart> {
        let mut carts = self.repository.find_all().await?;

        let cart = carts
            .iter_mut()
            .find(|cart| cart.id == cart_id)
            .ok_or_else(|| ServiceError::CartNotFound {
                id: cart_id.to_string(),
            })?;

        let quantity = cart.add_or_increment(product_id).quantity;
        let updated = cart.clone();

        self.repository.save_all(&carts).await?;

        crate::info_with_trace!(quantity = quantity, "Product added to cart");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RepositoryError, RepositoryResult};
    use async_trait::async_trait;
    use mockall::mock;

    mock! {
        TestCartRepository {}

        #[async_trait]
        impl CartRepository for TestCartRepository {
            async fn find_all(&self) -> RepositoryResult<Vec<Cart>>;
            async fn save_all(&self, carts: &[Cart]) -> RepositoryResult<()>;
        }
    }

    fn stored_carts() -> Vec<Cart> {
        let mut filled = Cart::new("cart-filled".to_string());
        filled.add_or_increment("3");
        vec![Cart::new("cart-empty".to_string()), filled]
    }

    #[tokio::test]
    async fn test_create_cart() {
        let mut mock_repo = MockTestCartRepository::new();
        mock_repo
            .expect_find_all()
            .times(1)
            .returning(|| Ok(stored_carts()));
        mock_repo
            .expect_save_all()
            .withf(|carts| carts.len() == 3 && carts[2].products.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let service = CartService::new(Arc::new(mock_repo));

        let cart = service.create_cart().await.unwrap();
        assert!(!cart.id.is_empty());
        assert!(cart.products.is_empty());
        assert!(stored_carts().iter().all(|existing| existing.id != cart.id));
        assert!(Uuid::parse_str(&cart.id).is_ok());
    }

    #[tokio::test]
    async fn test_create_cart_write_failure() {
        let mut mock_repo = MockTestCartRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(Vec::new()));
        mock_repo.expect_save_all().returning(|_| {
            Err(RepositoryError::Write {
                path: "carts.json".into(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        });

        let service = CartService::new(Arc::new(mock_repo));

        assert!(matches!(
            service.create_cart().await,
            Err(ServiceError::Repository { .. })
        ));
    }

    #[tokio::test]
    async fn test_get_cart_products() {
        let mut mock_repo = MockTestCartRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(stored_carts()));

        let service = CartService::new(Arc::new(mock_repo));

        let products = service.get_cart_products("cart-filled").await.unwrap();
        assert_eq!(
            products,
            vec![CartLineItem {
                product: "3".to_string(),
                quantity: 1
            }]
        );
        assert!(service
            .get_cart_products("cart-empty")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_get_cart_products_not_found() {
        let mut mock_repo = MockTestCartRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(stored_carts()));

        let service = CartService::new(Arc::new(mock_repo));

        match service.get_cart_products("missing").await {
            Err(ServiceError::CartNotFound { id }) => assert_eq!(id, "missing"),
            other => panic!("Expected CartNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_add_existing_product_increments_quantity() {
        let mut mock_repo = MockTestCartRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(stored_carts()));
        mock_repo
            .expect_save_all()
            .withf(|carts| carts[1].products.len() == 1 && carts[1].products[0].quantity == 2)
            .times(1)
            .returning(|_| Ok(()));

        let service = CartService::new(Arc::new(mock_repo));

        let cart = service.add_product_to_cart("cart-filled", "3").await.unwrap();
        assert_eq!(cart.id, "cart-filled");
        assert_eq!(cart.products[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_add_new_product_appends_line_item() {
        let mut mock_repo = MockTestCartRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(stored_carts()));
        mock_repo.expect_save_all().times(1).returning(|_| Ok(()));

        let service = CartService::new(Arc::new(mock_repo));

        let cart = service.add_product_to_cart("cart-filled", "77").await.unwrap();
        assert_eq!(cart.products.len(), 2);
        assert_eq!(
            cart.products[1],
            CartLineItem {
                product: "77".to_string(),
                quantity: 1
            }
        );
    }

    #[tokio::test]
    async fn test_add_product_to_missing_cart_does_not_write() {
        let mut mock_repo = MockTestCartRepository::new();
        mock_repo.expect_find_all().returning(|| Ok(stored_carts()));
        mock_repo.expect_save_all().times(0);

        let service = CartService::new(Arc::new(mock_repo));

        let result = service.add_product_to_cart("missing", "77").await;
        assert!(matches!(result, Err(ServiceError::CartNotFound { .. })));
    }
}
