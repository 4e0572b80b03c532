//! Checkout service: freezes a reconciled cart into a payable
//! snapshot and opens the payment with the gateway.

use chrono::Duration;
use common::{AddressId, UserId};
use domain::{CHECKOUT_TOTAL_CEILING, Checkout, DEFAULT_CHECKOUT_TTL_SECS};
use store::{CartStore, CatalogStore, CheckoutStore, UserStore};

use crate::cart::reconcile_prices;
use crate::error::{PipelineError, Result, StockShortfall};
use crate::gateway::{AuthorizeRequest, PaymentGateway};

/// A freshly created checkout plus the URL the customer must be sent
/// to in order to pay.
#[derive(Debug, Clone)]
pub struct CreatedCheckout {
    pub checkout: Checkout,
    pub payment_url: String,
}

pub struct CheckoutService<C, L, K, U, G> {
    carts: C,
    catalog: L,
    checkouts: K,
    users: U,
    gateway: G,
    ttl: Duration,
}

impl<C, L, K, U, G> CheckoutService<C, L, K, U, G>
where
    C: CartStore,
    L: CatalogStore,
    K: CheckoutStore,
    U: UserStore,
    G: PaymentGateway,
{
    pub fn new(carts: C, catalog: L, checkouts: K, users: U, gateway: G) -> Self {
        Self {
            carts,
            catalog,
            checkouts,
            users,
            gateway,
            ttl: Duration::seconds(DEFAULT_CHECKOUT_TTL_SECS),
        }
    }

    /// Overrides the checkout TTL (mainly for tests and deployments
    /// with a slow payment page).
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Creates a checkout from the owner's cart and opens the payment.
    ///
    /// Validates the user and shipping address, reconciles the cart
    /// against the catalog, checks every line against current stock
    /// (reporting all shortfalls at once), enforces the total ceiling,
    /// freezes the snapshot, and asks the gateway for an authority. A
    /// failed authorization deletes the checkout again so nothing
    /// half-open survives.
    #[tracing::instrument(skip(self))]
    pub async fn create_checkout(
        &self,
        owner: UserId,
        shipping_address: AddressId,
    ) -> Result<CreatedCheckout> {
        let user = self
            .users
            .find_user(owner)
            .await?
            .ok_or(PipelineError::NotFound("user"))?;

        if user.address(shipping_address).is_none() {
            return Err(PipelineError::InvalidInput(format!(
                "address {shipping_address} is not in the user's address book"
            )));
        }

        let mut cart = self
            .carts
            .find_by_owner(owner)
            .await?
            .ok_or(PipelineError::InvalidState("cart is empty".to_string()))?;
        if cart.is_empty() {
            return Err(PipelineError::InvalidState("cart is empty".to_string()));
        }

        if reconcile_prices(&self.catalog, &mut cart).await? {
            self.carts.upsert(&cart).await?;
        }

        // Collect every shortfall, not just the first.
        let mut shortfalls = Vec::new();
        for line in cart.lines() {
            match self.catalog.find_product(line.product_id).await? {
                Some(product) if line.quantity <= product.stock => {}
                Some(product) => shortfalls.push(StockShortfall {
                    product_id: line.product_id,
                    name: product.name,
                    requested: line.quantity,
                    available: product.stock,
                }),
                None => shortfalls.push(StockShortfall {
                    product_id: line.product_id,
                    name: line.product_id.to_string(),
                    requested: line.quantity,
                    available: 0,
                }),
            }
        }
        if !shortfalls.is_empty() {
            return Err(PipelineError::InsufficientStock(shortfalls));
        }

        let total = cart.total_price();
        if total > CHECKOUT_TOTAL_CEILING {
            return Err(PipelineError::InvalidInput(format!(
                "total {total} exceeds the checkout ceiling of {CHECKOUT_TOTAL_CEILING}"
            )));
        }

        let mut checkout = Checkout::new(owner, cart.lines().to_vec(), shipping_address, self.ttl);
        self.checkouts.insert(&checkout).await?;

        let authorization = match self
            .gateway
            .authorize(AuthorizeRequest {
                amount: total,
                description: format!("Payment for checkout {}", checkout.id()),
                contact: user.phone.clone(),
            })
            .await
        {
            Ok(authorization) => authorization,
            Err(error) => {
                self.checkouts.delete(checkout.id()).await?;
                metrics::counter!("checkout_authorize_failures_total").increment(1);
                return Err(error.into());
            }
        };

        checkout.set_authority(authorization.authority);
        self.checkouts.update(&checkout).await?;

        metrics::counter!("checkouts_created_total").increment(1);
        tracing::info!(checkout_id = %checkout.id(), %total, "checkout created");

        Ok(CreatedCheckout {
            checkout,
            payment_url: authorization.redirect_url,
        })
    }
}
