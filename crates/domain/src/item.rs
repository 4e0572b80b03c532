//! Line items shared by carts, checkouts, and orders.

use common::ProductId;
use serde::{Deserialize, Serialize};

use crate::money::Rial;

/// One product line inside a cart, checkout, or order.
///
/// In a cart the `unit_price` is a cache of the catalog price and is
/// refreshed by reconciliation; in a checkout or order it is frozen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// The product this line refers to.
    pub product_id: ProductId,

    /// Units of the product.
    pub quantity: u32,

    /// Price per unit at the time the line was last written.
    pub unit_price: Rial,
}

impl LineItem {
    /// Creates a new line item.
    pub fn new(product_id: ProductId, quantity: u32, unit_price: Rial) -> Self {
        Self {
            product_id,
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this line (quantity × unit price).
    pub fn total_price(&self) -> Rial {
        self.unit_price.multiply(self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_price_multiplies_quantity() {
        let item = LineItem::new(ProductId::new(), 3, Rial::new(1000));
        assert_eq!(item.total_price().amount(), 3000);
    }

    #[test]
    fn serialization_roundtrip() {
        let item = LineItem::new(ProductId::new(), 2, Rial::new(999));
        let json = serde_json::to_string(&item).unwrap();
        let back: LineItem = serde_json::from_str(&json).unwrap();
        assert_eq!(item, back);
    }
}
