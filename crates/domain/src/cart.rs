//! The mutable shopping cart.

use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::CartError;
use crate::item::LineItem;
use crate::money::Rial;

/// Maximum units of a single product per cart line.
pub const MAX_LINE_QUANTITY: u32 = 100;

/// A user's shopping cart: an ordered collection of lines keyed by
/// product id.
///
/// At most one cart exists per owner. Line prices are caches of the
/// catalog price; callers refresh them through [`Cart::refresh_price`]
/// and must not treat them as authoritative. Merge, set, and removal
/// semantics live here so they can be tested in isolation from
/// storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    owner: UserId,
    lines: Vec<LineItem>,
}

impl Cart {
    /// Creates an empty cart for the given owner.
    pub fn new(owner: UserId) -> Self {
        Self {
            owner,
            lines: Vec::new(),
        }
    }

    /// Returns the owning user.
    pub fn owner(&self) -> UserId {
        self.owner
    }

    /// Returns the lines in insertion order.
    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    /// Returns the line for a product, if present.
    pub fn line(&self, product_id: ProductId) -> Option<&LineItem> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Returns the number of distinct lines.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if the cart holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Returns the sum of line totals.
    pub fn total_price(&self) -> Rial {
        self.lines.iter().map(LineItem::total_price).sum()
    }

    /// Adds `quantity` units of a product, merging into an existing
    /// line rather than duplicating it.
    ///
    /// Returns the resulting line quantity. The merged quantity must
    /// stay within `1..=MAX_LINE_QUANTITY`; stock validation is the
    /// caller's concern.
    pub fn upsert_line(
        &mut self,
        product_id: ProductId,
        quantity: u32,
        unit_price: Rial,
    ) -> Result<u32, CartError> {
        validate_quantity(quantity)?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            let merged = line.quantity + quantity;
            if merged > MAX_LINE_QUANTITY {
                return Err(CartError::QuantityAboveLimit {
                    quantity: merged,
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.quantity = merged;
            line.unit_price = unit_price;
            Ok(merged)
        } else {
            self.lines
                .push(LineItem::new(product_id, quantity, unit_price));
            Ok(quantity)
        }
    }

    /// Sets (not merges) the quantity of an existing line.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: u32) -> Result<(), CartError> {
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line entirely.
    pub fn remove_line(&mut self, product_id: ProductId) -> Result<(), CartError> {
        let index = self
            .lines
            .iter()
            .position(|l| l.product_id == product_id)
            .ok_or(CartError::LineNotFound(product_id))?;
        self.lines.remove(index);
        Ok(())
    }

    /// Refreshes the cached price of a line to the given catalog
    /// price. Returns true if the price actually changed.
    pub fn refresh_price(&mut self, product_id: ProductId, price: Rial) -> bool {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) if line.unit_price != price => {
                line.unit_price = price;
                true
            }
            _ => false,
        }
    }
}

fn validate_quantity(quantity: u32) -> Result<(), CartError> {
    if quantity == 0 {
        return Err(CartError::InvalidQuantity {
            quantity,
            max: MAX_LINE_QUANTITY,
        });
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(CartError::QuantityAboveLimit {
            quantity,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}
