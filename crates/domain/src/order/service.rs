//! Order service: placing orders and driving them through the state machine.

use std::collections::HashMap;

use common::{AggregateId, UserId};
use event_store::EventStore;

use crate::aggregate::Aggregate;
use crate::command::CommandHandler;
use crate::error::DomainError;

use super::{ChangeOrderStatus, Order, PlaceOrder};

/// Event metadata key holding the key a batch of orders was placed under.
pub const IDEMPOTENCY_KEY_METADATA: &str = "idempotency_key";

/// High-level API over the order command handler.
pub struct OrderService<S: EventStore> {
    handler: CommandHandler<S, Order>,
}

impl<S: EventStore> OrderService<S> {
    pub fn new(store: S) -> Self {
        Self {
            handler: CommandHandler::new(store),
        }
    }

    pub fn handler(&self) -> &CommandHandler<S, Order> {
        &self.handler
    }

    /// Places every order in one atomic write. Nothing is stored if any fails.
    pub async fn place_orders(&self, commands: Vec<PlaceOrder>) -> Result<Vec<Order>, DomainError> {
        self.place_orders_with_key(commands, None).await
    }

    /// Like [`place_orders`](Self::place_orders), recording `idempotency_key`
    /// on every `OrderPlaced` event so [`orders_placed_with_key`](Self::orders_placed_with_key)
    /// can find the batch again.
    #[tracing::instrument(skip(self, commands), fields(orders = commands.len()))]
    pub async fn place_orders_with_key(
        &self,
        commands: Vec<PlaceOrder>,
        idempotency_key: Option<&str>,
    ) -> Result<Vec<Order>, DomainError> {
        let fresh = Order::default();
        let mut creations = Vec::with_capacity(commands.len());
        for cmd in &commands {
            creations.push((cmd.order_id, fresh.place(cmd)?));
        }

        let metadata: HashMap<String, serde_json::Value> = idempotency_key
            .map(|key| (IDEMPOTENCY_KEY_METADATA.to_string(), key.into()))
            .into_iter()
            .collect();
        let results = self
            .handler
            .create_many_with_metadata(creations, &metadata)
            .await?;

        metrics::counter!("orders_created_total").increment(results.len() as u64);
        for result in &results {
            tracing::info!(
                order_id = ?result.aggregate.id(),
                total = %result.aggregate.total_price(),
                "order placed"
            );
        }

        Ok(results.into_iter().map(|r| r.aggregate).collect())
    }

    /// Moves an order to a new status.
    ///
    /// Fails with `ConcurrentModification` when the caller's expected status
    /// is stale or another writer appended first.
    #[tracing::instrument(skip(self), fields(order_id = %cmd.order_id, to = %cmd.to))]
    pub async fn change_status(&self, cmd: ChangeOrderStatus) -> Result<Order, DomainError> {
        let ChangeOrderStatus {
            order_id,
            to,
            actor_id,
            expected_status,
            tracking_number,
        } = cmd;

        let result = self
            .handler
            .execute(order_id, |order: &Order| {
                if order.id().is_none() {
                    return Err(DomainError::OrderNotFound(order_id));
                }
                if let Some(expected) = expected_status
                    && expected != order.status()
                {
                    return Err(DomainError::ConcurrentModification {
                        aggregate_id: order_id,
                        detail: format!("expected status {expected}, found {}", order.status()),
                    });
                }
                Ok(order.transition(to, actor_id, tracking_number)?)
            })
            .await;

        match result {
            Ok(result) => {
                metrics::counter!("order_transitions_total", "to" => to.as_str()).increment(1);
                tracing::info!(status = %result.aggregate.status(), "order status changed");
                Ok(result.aggregate)
            }
            Err(e) => {
                tracing::warn!(error = %e, "order status change refused");
                Err(e)
            }
        }
    }

    /// Orders placed under `idempotency_key`, in placement order.
    pub async fn orders_placed_with_key(
        &self,
        idempotency_key: &str,
    ) -> Result<Vec<Order>, DomainError> {
        let envelopes = self
            .handler
            .store()
            .get_events_by_metadata(IDEMPOTENCY_KEY_METADATA, idempotency_key)
            .await?;

        let mut orders = Vec::new();
        for envelope in envelopes {
            if orders
                .iter()
                .any(|o: &Order| o.id() == Some(envelope.aggregate_id))
            {
                continue;
            }
            if let Some(order) = self.get_order(envelope.aggregate_id).await? {
                orders.push(order);
            }
        }
        Ok(orders)
    }

    /// Loads an order by ID. Returns `None` if it doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: AggregateId) -> Result<Option<Order>, DomainError> {
        self.handler.load_existing(order_id).await
    }

    /// Returns true if `user_id` may review the goods of this order.
    pub async fn can_review(
        &self,
        order_id: AggregateId,
        user_id: UserId,
    ) -> Result<bool, DomainError> {
        let order = self
            .get_order(order_id)
            .await?
            .ok_or(DomainError::OrderNotFound(order_id))?;
        Ok(order.can_review(user_id))
    }
}
