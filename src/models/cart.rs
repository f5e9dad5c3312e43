use serde::{Deserialize, Serialize};

/// Shopping cart as stored in the carts collection file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub products: Vec<CartLineItem>,
}

/// Individual line item in a shopping cart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLineItem {
    pub product: String,
    pub quantity: u32,
}

impl Cart {
    /// Create a new empty cart
    pub fn new(id: String) -> Self {
        Self {
            id,
            products: Vec::new(),
        }
    }

    /// Add a product to the cart or bump its quantity if it is already there
    pub fn add_or_increment(&mut self, product_id: &str) -> &CartLineItem {
        let position = match self
            .products
            .iter()
            .position(|item| item.product == product_id)
        {
            Some(position) => {
                let item = &mut self.products[position];
                item.quantity = item.quantity.saturating_add(1);
                position
            }
            None => {
                self.products.push(CartLineItem {
                    product: product_id.to_string(),
                    quantity: 1,
                });
                self.products.len() - 1
            }
        };

        &self.products[position]
    }

    /// Total number of units across all line items
    pub fn total_quantity(&self) -> u64 {
        self.products
            .iter()
            .map(|item| u64::from(item.quantity))
            .sum()
    }
}
