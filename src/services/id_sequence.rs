use std::sync::atomic::{AtomicU64, Ordering};

use crate::models::{Product, ProductId};

/// Process-wide product id counter.
///
/// Seeded once from the highest stored id and only ever moves forward, so ids
/// of deleted products are never handed out again.
#[derive(Debug, Default)]
pub struct ProductIdSequence {
    last: AtomicU64,
}

impl ProductIdSequence {
    pub fn starting_after(last: ProductId) -> Self {
        Self {
            last: AtomicU64::new(last),
        }
    }

    /// Seed from the maximum id of an existing collection
    pub fn seeded_from(products: &[Product]) -> Self {
        Self::starting_after(products.iter().map(|p| p.id).max().unwrap_or(0))
    }

    /// Reserve the next id
    pub fn next_id(&self) -> ProductId {
        self.last.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Reserve the next id, skipping past `stored_max` if the sequence is behind it
    pub fn next_id_after(&self, stored_max: ProductId) -> ProductId {
        self.last.fetch_max(stored_max, Ordering::SeqCst);
        self.next_id()
    }

    /// Last id handed out (or the seed when none was)
    pub fn last_id(&self) -> ProductId {
        self.last.load(Ordering::SeqCst)
    }
}
