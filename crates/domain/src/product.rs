//! Catalog product view consumed by the pipeline.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Rial;

/// Upper bound on a product's stock count.
pub const MAX_PRODUCT_STOCK: u32 = 1000;

/// The catalog's view of a product: the ground truth for stock and
/// price that carts and checkouts are reconciled against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub stock: u32,
    pub price: Rial,
}

impl Product {
    pub fn new(id: ProductId, name: impl Into<String>, stock: u32, price: Rial) -> Self {
        Self {
            id,
            name: name.into(),
            stock,
            price,
        }
    }
}
