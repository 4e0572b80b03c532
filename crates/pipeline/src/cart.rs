//! Cart service: mutations plus price reconciliation against the
//! catalog.

use common::{ProductId, UserId};
use domain::{Cart, MAX_LINE_QUANTITY};
use store::{CartStore, CatalogStore};

use crate::error::{PipelineError, Result, StockShortfall};

/// Refreshes every cached line price from the catalog.
///
/// Products that have vanished from the catalog keep their cached
/// price; the stock check at checkout rejects them. Returns true if
/// any price changed.
pub async fn reconcile_prices<L: CatalogStore>(catalog: &L, cart: &mut Cart) -> Result<bool> {
    let product_ids: Vec<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();

    let mut changed = false;
    for product_id in product_ids {
        if let Some(product) = catalog.find_product(product_id).await? {
            changed |= cart.refresh_price(product_id, product.price);
        }
    }
    Ok(changed)
}

/// Cart operations: every read and mutation reconciles prices before
/// the cart is returned, so callers never see stale totals.
pub struct CartService<C, L> {
    carts: C,
    catalog: L,
}

impl<C: CartStore, L: CatalogStore> CartService<C, L> {
    pub fn new(carts: C, catalog: L) -> Self {
        Self { carts, catalog }
    }

    /// Returns the owner's cart, reconciled against current catalog
    /// prices. Reconciled prices are persisted before returning.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, owner: UserId) -> Result<Cart> {
        let mut cart = self
            .carts
            .find_by_owner(owner)
            .await?
            .ok_or(PipelineError::NotFound("cart"))?;

        if reconcile_prices(&self.catalog, &mut cart).await? {
            self.carts.upsert(&cart).await?;
        }
        Ok(cart)
    }

    /// Adds `quantity` units of a product, merging into any existing
    /// line. Creates the cart on the owner's first add.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        owner: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        validate_requested_quantity(quantity)?;

        let product = self
            .catalog
            .find_product(product_id)
            .await?
            .ok_or(PipelineError::NotFound("product"))?;

        let mut cart = self
            .carts
            .find_by_owner(owner)
            .await?
            .unwrap_or_else(|| Cart::new(owner));

        // The merged line, not just the increment, must fit in stock.
        let merged = cart.line(product_id).map_or(0, |l| l.quantity) + quantity;
        if merged > product.stock {
            return Err(PipelineError::InsufficientStock(vec![StockShortfall {
                product_id,
                name: product.name,
                requested: merged,
                available: product.stock,
            }]));
        }

        cart.upsert_line(product_id, quantity, product.price)?;
        reconcile_prices(&self.catalog, &mut cart).await?;
        self.carts.upsert(&cart).await?;

        metrics::counter!("cart_items_added_total").increment(1);
        Ok(cart)
    }

    /// Removes a product's line entirely. Returns `None` when the
    /// removal empties the cart, in which case the cart record is
    /// deleted.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, owner: UserId, product_id: ProductId) -> Result<Option<Cart>> {
        let mut cart = self
            .carts
            .find_by_owner(owner)
            .await?
            .ok_or(PipelineError::NotFound("cart"))?;

        cart.remove_line(product_id)?;

        if cart.is_empty() {
            self.carts.delete(owner).await?;
            return Ok(None);
        }

        reconcile_prices(&self.catalog, &mut cart).await?;
        self.carts.upsert(&cart).await?;
        Ok(Some(cart))
    }

    /// Sets (not merges) the quantity of an existing line.
    #[tracing::instrument(skip(self))]
    pub async fn update_item_quantity(
        &self,
        owner: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<Cart> {
        validate_requested_quantity(quantity)?;

        let product = self
            .catalog
            .find_product(product_id)
            .await?
            .ok_or(PipelineError::NotFound("product"))?;

        if quantity > product.stock {
            return Err(PipelineError::InsufficientStock(vec![StockShortfall {
                product_id,
                name: product.name,
                requested: quantity,
                available: product.stock,
            }]));
        }

        let mut cart = self
            .carts
            .find_by_owner(owner)
            .await?
            .ok_or(PipelineError::NotFound("cart"))?;

        cart.set_quantity(product_id, quantity)?;
        reconcile_prices(&self.catalog, &mut cart).await?;
        self.carts.upsert(&cart).await?;
        Ok(cart)
    }
}

fn validate_requested_quantity(quantity: u32) -> Result<()> {
    if quantity == 0 || quantity > MAX_LINE_QUANTITY {
        return Err(PipelineError::InvalidInput(format!(
            "quantity must be between 1 and {MAX_LINE_QUANTITY}, got {quantity}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Product, Rial};
    use store::{InMemoryCartStore, InMemoryCatalogStore};

    async fn service_with_product(
        stock: u32,
        price: i64,
    ) -> (CartService<InMemoryCartStore, InMemoryCatalogStore>, ProductId) {
        let catalog = InMemoryCatalogStore::new();
        let product = Product::new(ProductId::new(), "Widget", stock, Rial::new(price));
        let id = product.id;
        catalog.insert_product(product).await.unwrap();
        (CartService::new(InMemoryCartStore::new(), catalog), id)
    }

    #[tokio::test]
    async fn add_item_creates_cart_on_first_add() {
        let (service, product) = service_with_product(10, 1000).await;
        let owner = UserId::new();

        let cart = service.add_item(owner, product, 3).await.unwrap();

        assert_eq!(cart.line(product).unwrap().quantity, 3);
        assert_eq!(cart.total_price().amount(), 3000);
    }

    #[tokio::test]
    async fn add_item_merges_existing_line() {
        let (service, product) = service_with_product(10, 1000).await;
        let owner = UserId::new();

        service.add_item(owner, product, 3).await.unwrap();
        let cart = service.add_item(owner, product, 4).await.unwrap();

        assert_eq!(cart.line(product).unwrap().quantity, 7);
        assert_eq!(cart.line_count(), 1);
    }

    #[tokio::test]
    async fn add_item_rejects_zero_and_over_limit() {
        let (service, product) = service_with_product(1000, 1000).await;
        let owner = UserId::new();

        let zero = service.add_item(owner, product, 0).await;
        assert!(matches!(zero, Err(PipelineError::InvalidInput(_))));

        let over = service.add_item(owner, product, MAX_LINE_QUANTITY + 1).await;
        assert!(matches!(over, Err(PipelineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn add_item_unknown_product_fails() {
        let (service, _) = service_with_product(10, 1000).await;

        let result = service.add_item(UserId::new(), ProductId::new(), 1).await;
        assert!(matches!(result, Err(PipelineError::NotFound("product"))));
    }

    #[tokio::test]
    async fn merged_quantity_must_fit_in_stock() {
        let (service, product) = service_with_product(5, 1000).await;
        let owner = UserId::new();

        service.add_item(owner, product, 4).await.unwrap();
        let result = service.add_item(owner, product, 2).await;

        match result {
            Err(PipelineError::InsufficientStock(lines)) => {
                assert_eq!(lines.len(), 1);
                assert_eq!(lines[0].requested, 6);
                assert_eq!(lines[0].available, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        // The stored cart is untouched.
        let cart = service.get_cart(owner).await.unwrap();
        assert_eq!(cart.line(product).unwrap().quantity, 4);
    }

    #[tokio::test]
    async fn merged_quantity_above_line_limit_rejected() {
        let (service, product) = service_with_product(1000, 1000).await;
        let owner = UserId::new();

        service.add_item(owner, product, 60).await.unwrap();
        let result = service.add_item(owner, product, 41).await;
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn get_cart_reconciles_and_persists_price_drift() {
        let catalog = InMemoryCatalogStore::new();
        let product = Product::new(ProductId::new(), "Widget", 10, Rial::new(1000));
        let id = product.id;
        catalog.insert_product(product).await.unwrap();

        let carts = InMemoryCartStore::new();
        let service = CartService::new(carts.clone(), catalog.clone());
        let owner = UserId::new();
        service.add_item(owner, id, 2).await.unwrap();

        catalog.set_price(id, Rial::new(1500)).await.unwrap();

        let cart = service.get_cart(owner).await.unwrap();
        assert_eq!(cart.line(id).unwrap().unit_price, Rial::new(1500));
        assert_eq!(cart.total_price().amount(), 3000);

        // The reconciled price was written back.
        let stored = carts.find_by_owner(owner).await.unwrap().unwrap();
        assert_eq!(stored.line(id).unwrap().unit_price, Rial::new(1500));
    }

    #[tokio::test]
    async fn get_cart_for_unknown_owner_fails() {
        let (service, _) = service_with_product(10, 1000).await;
        let result = service.get_cart(UserId::new()).await;
        assert!(matches!(result, Err(PipelineError::NotFound("cart"))));
    }

    #[tokio::test]
    async fn remove_item_drops_whole_line() {
        let catalog = InMemoryCatalogStore::new();
        let first = Product::new(ProductId::new(), "Widget", 10, Rial::new(1000));
        let second = Product::new(ProductId::new(), "Gadget", 10, Rial::new(500));
        let (first_id, second_id) = (first.id, second.id);
        catalog.insert_product(first).await.unwrap();
        catalog.insert_product(second).await.unwrap();

        let service = CartService::new(InMemoryCartStore::new(), catalog);
        let owner = UserId::new();
        service.add_item(owner, first_id, 5).await.unwrap();
        service.add_item(owner, second_id, 1).await.unwrap();

        let cart = service.remove_item(owner, first_id).await.unwrap().unwrap();
        assert!(cart.line(first_id).is_none());
        assert_eq!(cart.line_count(), 1);
    }

    #[tokio::test]
    async fn removing_last_line_deletes_cart() {
        let (service, product) = service_with_product(10, 1000).await;
        let owner = UserId::new();
        service.add_item(owner, product, 5).await.unwrap();

        let result = service.remove_item(owner, product).await.unwrap();
        assert!(result.is_none());

        let lookup = service.get_cart(owner).await;
        assert!(matches!(lookup, Err(PipelineError::NotFound("cart"))));
    }

    #[tokio::test]
    async fn remove_missing_line_fails() {
        let (service, product) = service_with_product(10, 1000).await;
        let owner = UserId::new();
        service.add_item(owner, product, 1).await.unwrap();

        let result = service.remove_item(owner, ProductId::new()).await;
        assert!(matches!(result, Err(PipelineError::NotFound("cart item"))));
    }

    #[tokio::test]
    async fn update_quantity_sets_not_merges() {
        let (service, product) = service_with_product(10, 1000).await;
        let owner = UserId::new();
        service.add_item(owner, product, 8).await.unwrap();

        let cart = service
            .update_item_quantity(owner, product, 2)
            .await
            .unwrap();
        assert_eq!(cart.line(product).unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn update_quantity_checks_stock() {
        let (service, product) = service_with_product(5, 1000).await;
        let owner = UserId::new();
        service.add_item(owner, product, 2).await.unwrap();

        let result = service.update_item_quantity(owner, product, 6).await;
        assert!(matches!(result, Err(PipelineError::InsufficientStock(_))));
    }
}
