//! Checkout coordinator: turns a buyer's cart into placed orders.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use common::{AggregateId, ListingId, UserId};
use domain::{
    AddressError, FieldError, FieldErrorCode, FieldErrors, Money, OrderLine, OrderService,
    PaymentMethod, PlaceOrder, PricingCalculator, resolve_address,
};
use event_store::EventStore;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::error::{CheckoutError, Result};
use crate::request::{CheckoutReceipt, CheckoutRequest};
use crate::services::{AddressBook, CartItem, CartStore, ListingCatalog};

/// One rejected part of a checkout submission.
#[derive(Debug)]
enum Problem {
    Address(AddressError),
    PaymentMethod(String),
    Field(FieldError),
    Listings(Vec<ListingId>),
}

impl Problem {
    fn into_error(self) -> CheckoutError {
        match self {
            Problem::Address(AddressError::NotFound(id)) => CheckoutError::AddressNotFound(id),
            Problem::Address(AddressError::Validation(errors)) => CheckoutError::Validation(errors),
            Problem::PaymentMethod(method) => CheckoutError::InvalidPaymentMethod(method),
            Problem::Field(error) => CheckoutError::Validation(error.into()),
            Problem::Listings(ids) => CheckoutError::ListingUnavailable(ids),
        }
    }
}

/// Every problem found in a submission, reported together.
#[derive(Debug, Default)]
struct Problems(Vec<Problem>);

impl Problems {
    fn check<T>(&mut self, result: std::result::Result<T, Problem>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(problem) => {
                self.0.push(problem);
                None
            }
        }
    }

    /// A lone problem keeps its dedicated error; several merge into one validation error.
    fn into_error(mut self) -> CheckoutError {
        if self.0.len() == 1
            && let Some(problem) = self.0.pop()
        {
            return problem.into_error();
        }

        let mut errors = FieldErrors::new();
        for problem in self.0 {
            errors.extend(problem.into_error().field_errors());
        }
        CheckoutError::Validation(errors)
    }
}

fn parse_payment_method(raw: Option<&str>) -> std::result::Result<PaymentMethod, Problem> {
    match raw.map(str::trim).filter(|m| !m.is_empty()) {
        None => Err(Problem::Field(FieldError::required("payment_method"))),
        Some(method) => method
            .parse()
            .map_err(|_| Problem::PaymentMethod(method.to_string())),
    }
}

fn check_discount(discount: Option<Money>) -> std::result::Result<Money, Problem> {
    let discount = discount.unwrap_or_default();
    if discount.is_negative() {
        return Err(Problem::Field(FieldError::new(
            "discount",
            FieldErrorCode::Invalid,
            "discount must not be negative",
        )));
    }
    Ok(discount)
}

/// Cart lines grouped per seller, sellers in order of first appearance.
type SellerGroups = Vec<(UserId, Vec<OrderLine>)>;

/// One lock per buyer with a checkout in flight.
#[derive(Default)]
struct BuyerLocks(Mutex<HashMap<UserId, Arc<Mutex<()>>>>);

impl BuyerLocks {
    /// Waits for the buyer's lock. Entries nobody holds or waits on are dropped.
    async fn acquire(&self, buyer_id: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.0.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(buyer_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.0.lock().await.len()
    }
}

/// Orchestrates checkout over the order service and the collaborator ports.
///
/// Checkouts of one buyer run one at a time, from the cart read until the
/// cart is cleared; different buyers check out concurrently. Idempotency
/// keys are stored with the placed orders, so a retry finds its orders
/// after a restart too.
pub struct CheckoutCoordinator<S, C, L, A>
where
    S: EventStore,
    C: CartStore,
    L: ListingCatalog,
    A: AddressBook,
{
    order_service: OrderService<S>,
    carts: C,
    listings: L,
    addresses: A,
    pricing: PricingCalculator,
    buyer_locks: BuyerLocks,
}

impl<S, C, L, A> CheckoutCoordinator<S, C, L, A>
where
    S: EventStore,
    C: CartStore,
    L: ListingCatalog,
    A: AddressBook,
{
    pub fn new(store: S, carts: C, listings: L, addresses: A) -> Self {
        Self {
            order_service: OrderService::new(store),
            carts,
            listings,
            addresses,
            pricing: PricingCalculator::default(),
            buyer_locks: BuyerLocks::default(),
        }
    }

    pub fn with_pricing(mut self, pricing: PricingCalculator) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn carts(&self) -> &C {
        &self.carts
    }

    pub fn listings(&self) -> &L {
        &self.listings
    }

    pub fn addresses(&self) -> &A {
        &self.addresses
    }

    pub fn pricing(&self) -> &PricingCalculator {
        &self.pricing
    }

    /// Places one pending order per seller in the buyer's cart.
    ///
    /// Either every order is stored or none is. The cart lines are removed
    /// only after the orders are stored.
    #[tracing::instrument(skip(self, request), fields(buyer_id = %request.buyer_id))]
    pub async fn checkout(&self, request: CheckoutRequest) -> Result<CheckoutReceipt> {
        metrics::counter!("checkouts_total").increment(1);
        let started = Instant::now();

        let result = self.run_checkout(&request).await;

        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());
        if let Err(e) = &result {
            metrics::counter!("checkout_failures_total", "reason" => e.kind()).increment(1);
            if matches!(e, CheckoutError::Domain(d) if d.is_persistence_failure()) {
                tracing::error!(error = %e, "checkout failed");
            } else {
                tracing::warn!(error = %e, "checkout refused");
            }
        }
        result
    }

    async fn run_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt> {
        let buyer_id = request.buyer_id;
        let _guard = self.buyer_locks.acquire(buyer_id).await;

        // Keys are scoped per buyer.
        let stored_key = request
            .idempotency_key()
            .map(|key| format!("{buyer_id}:{key}"));
        if let Some(key) = &stored_key {
            let orders = self.order_service.orders_placed_with_key(key).await?;
            if !orders.is_empty() {
                tracing::info!(orders = orders.len(), "checkout replayed from idempotency key");
                return Ok(CheckoutReceipt {
                    orders,
                    replayed: true,
                    cart_cleared: true,
                });
            }
        }

        let items = self.carts.items(buyer_id).await?;
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let saved_addresses = self.addresses.addresses_for(buyer_id).await?;
        let grouped = self.group_by_seller(&items).await?;

        let mut problems = Problems::default();
        let address = problems.check(
            resolve_address(
                &saved_addresses,
                request.address_selection(),
                &request.manual_address(),
            )
            .map_err(Problem::Address),
        );
        let payment_method =
            problems.check(parse_payment_method(request.payment_method.as_deref()));
        let discount = problems.check(check_discount(request.discount));
        let groups = problems.check(grouped);

        let (Some(address), Some(payment_method), Some(discount), Some(groups)) =
            (address, payment_method, discount, groups)
        else {
            return Err(problems.into_error());
        };

        let buyer_note = request.note();
        let mut remaining = discount;
        let mut commands = Vec::with_capacity(groups.len());
        for (seller_id, lines) in groups {
            let ceiling = self.pricing.compute(&lines, Money::zero())?.pre_discount_total();
            let share = remaining.min(ceiling);
            remaining -= share;

            commands.push(PlaceOrder {
                order_id: AggregateId::new(),
                buyer_id,
                seller_id,
                pricing: self.pricing.compute(&lines, share)?,
                lines,
                payment_method,
                shipping_address: address.clone(),
                buyer_note: buyer_note.clone(),
            });
        }

        let orders = self
            .order_service
            .place_orders_with_key(commands, stored_key.as_deref())
            .await?;

        let item_ids: Vec<_> = items.iter().map(|item| item.id).collect();
        let cart_cleared = match self.carts.clear(buyer_id, &item_ids).await {
            Ok(()) => true,
            Err(e) => {
                metrics::counter!("checkout_cart_clear_failures_total").increment(1);
                tracing::warn!(error = %e, "orders placed but cart was not cleared");
                false
            }
        };

        tracing::info!(orders = orders.len(), cart_cleared, "checkout complete");
        Ok(CheckoutReceipt {
            orders,
            replayed: false,
            cart_cleared,
        })
    }

    /// Freezes each cart line against the catalog and splits the lines per seller.
    async fn group_by_seller(
        &self,
        items: &[CartItem],
    ) -> Result<std::result::Result<SellerGroups, Problem>> {
        let mut groups: SellerGroups = Vec::new();
        let mut missing = Vec::new();

        for item in items {
            let Some(listing) = self.listings.get(item.listing_id).await? else {
                missing.push(item.listing_id);
                continue;
            };
            let line = OrderLine::new(listing.id, listing.title, listing.price, item.quantity);
            match groups.iter_mut().find(|(seller, _)| *seller == listing.seller_id) {
                Some((_, lines)) => lines.push(line),
                None => groups.push((listing.seller_id, vec![line])),
            }
        }

        if missing.is_empty() {
            Ok(Ok(groups))
        } else {
            Ok(Err(Problem::Listings(missing)))
        }
    }
}
