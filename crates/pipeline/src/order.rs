//! Order service: payment verification, exactly-once materialization,
//! listing, and administrative updates.

use common::{OrderId, ProductId, UserId};
use domain::{Address, Authority, Order, OrderStatus};
use store::{CartStore, CatalogStore, CheckoutStore, OrderStore, StoreError, UserStore};

use crate::error::{PipelineError, Result, StockShortfall};
use crate::gateway::PaymentGateway;

/// A verified order plus the shipping address it resolves to.
#[derive(Debug, Clone)]
pub struct VerifiedOrder {
    pub order: Order,
    /// Absent if the owner has since removed the address.
    pub shipping_address: Option<Address>,
}

/// One page of an owner's order history, newest first.
#[derive(Debug, Clone)]
pub struct OrderPage {
    pub orders: Vec<Order>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
    pub pages: u64,
}

pub struct OrderService<K, O, C, L, U, G> {
    checkouts: K,
    orders: O,
    carts: C,
    catalog: L,
    users: U,
    gateway: G,
}

impl<K, O, C, L, U, G> OrderService<K, O, C, L, U, G>
where
    K: CheckoutStore,
    O: OrderStore,
    C: CartStore,
    L: CatalogStore,
    U: UserStore,
    G: PaymentGateway,
{
    pub fn new(checkouts: K, orders: O, carts: C, catalog: L, users: U, gateway: G) -> Self {
        Self {
            checkouts,
            orders,
            carts,
            catalog,
            users,
            gateway,
        }
    }

    /// Handles the gateway callback: verifies the payment behind
    /// `authority` and materializes the order exactly once.
    ///
    /// Stock is taken line by line through the conditional decrement;
    /// any failure returns the units already taken and surfaces the
    /// shortfall. The unique authority constraint on the order store
    /// is the final arbiter against concurrent callbacks: the loser
    /// compensates its decrements and reports `AlreadyProcessed`.
    #[tracing::instrument(skip(self))]
    pub async fn verify(&self, authority: &Authority) -> Result<VerifiedOrder> {
        let started = std::time::Instant::now();
        let result = self.verify_inner(authority).await;
        metrics::histogram!("verify_duration_seconds").record(started.elapsed().as_secs_f64());
        result
    }

    async fn verify_inner(&self, authority: &Authority) -> Result<VerifiedOrder> {
        if self.orders.find_by_authority(authority).await?.is_some() {
            return Err(PipelineError::AlreadyProcessed(authority.clone()));
        }

        let checkout = self
            .checkouts
            .find_by_authority(authority)
            .await?
            .ok_or(PipelineError::NotFound("checkout"))?;

        let verification = self
            .gateway
            .verify(checkout.total_price(), authority)
            .await?;
        if !verification.is_accepted() {
            self.checkouts.delete(checkout.id()).await?;
            metrics::counter!("payments_rejected_total").increment(1);
            tracing::warn!(%authority, code = verification.code, "payment rejected");
            return Err(PipelineError::PaymentRejected {
                code: verification.code,
            });
        }

        let mut taken: Vec<(ProductId, u32)> = Vec::new();
        for line in checkout.lines() {
            match self
                .catalog
                .decrement_stock(line.product_id, line.quantity)
                .await
            {
                Ok(()) => taken.push((line.product_id, line.quantity)),
                Err(StoreError::InsufficientStock {
                    product_id,
                    available,
                }) => {
                    self.release(&taken).await;
                    let name = self
                        .catalog
                        .find_product(product_id)
                        .await?
                        .map(|p| p.name)
                        .unwrap_or_else(|| product_id.to_string());
                    return Err(PipelineError::InsufficientStock(vec![StockShortfall {
                        product_id,
                        name,
                        requested: line.quantity,
                        available,
                    }]));
                }
                Err(error) => {
                    self.release(&taken).await;
                    return Err(error.into());
                }
            }
        }

        let order = Order::from_checkout(&checkout, authority.clone());
        if let Err(error) = self.orders.insert(&order).await {
            self.release(&taken).await;
            return Err(match error {
                StoreError::DuplicateAuthority(_) => {
                    PipelineError::AlreadyProcessed(authority.clone())
                }
                other => other.into(),
            });
        }

        self.carts.delete(checkout.owner()).await?;
        self.checkouts.delete(checkout.id()).await?;

        metrics::counter!("orders_materialized_total").increment(1);
        tracing::info!(order_id = %order.id(), %authority, "order materialized");

        let shipping_address = self
            .users
            .find_user(order.owner())
            .await?
            .and_then(|user| user.address(order.shipping_address()).cloned());

        Ok(VerifiedOrder {
            order,
            shipping_address,
        })
    }

    /// Returns stock taken by a materialization that did not complete.
    async fn release(&self, taken: &[(ProductId, u32)]) {
        for &(product_id, quantity) in taken.iter().rev() {
            if let Err(error) = self.catalog.increment_stock(product_id, quantity).await {
                tracing::warn!(%product_id, quantity, %error, "failed to return stock");
            }
        }
    }

    /// Returns one page of the owner's orders, newest first. Pages are
    /// 1-based; `per_page` is clamped to `1..=100`.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self, owner: UserId, page: u64, per_page: u64) -> Result<OrderPage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);

        let total = self.orders.count_for_owner(owner).await?;
        let orders = self
            .orders
            .list_for_owner(owner, (page - 1) * per_page, per_page)
            .await?;

        Ok(OrderPage {
            orders,
            page,
            per_page,
            total,
            pages: total.div_ceil(per_page),
        })
    }

    /// Returns a single order by id.
    pub async fn get_order(&self, id: OrderId) -> Result<Order> {
        self.orders
            .find_by_id(id)
            .await?
            .ok_or(PipelineError::NotFound("order"))
    }

    /// Administrative update: advance the status and/or record the
    /// postal tracking code.
    #[tracing::instrument(skip(self))]
    pub async fn update_order(
        &self,
        id: OrderId,
        status: Option<OrderStatus>,
        tracking_code: Option<String>,
    ) -> Result<Order> {
        let mut order = self
            .orders
            .find_by_id(id)
            .await?
            .ok_or(PipelineError::NotFound("order"))?;

        if let Some(next) = status {
            order.set_status(next)?;
        }
        if let Some(code) = tracking_code {
            order.set_tracking_code(code)?;
        }

        self.orders.update(&order).await?;
        Ok(order)
    }
}
