//! Order board read model: order summaries filtered by status for listing pages.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{AggregateId, UserId};
use domain::{Money, OrderEvent, OrderStatus, PaymentMethod, UnknownStatus};
use event_store::EventEnvelope;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::Result;
use crate::projection::{Projection, ProjectionPosition, decode_order_event};
use crate::read_model::ReadModel;

/// One row of the order board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSummary {
    pub order_id: AggregateId,
    pub buyer_id: UserId,
    pub seller_id: UserId,
    pub status: OrderStatus,
    pub quantity: u64,
    pub total_price: Money,
    pub payment_method: PaymentMethod,
    pub title: String,
    pub tracking_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Status tab selection. `All` shows every order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(OrderStatus),
}

impl StatusFilter {
    pub fn matches(&self, status: OrderStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => *wanted == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.trim().is_empty() || s.trim().eq_ignore_ascii_case("all") {
            Ok(StatusFilter::All)
        } else {
            s.parse().map(StatusFilter::Only)
        }
    }
}

/// Criteria for listing orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderFilter {
    pub status: StatusFilter,
    pub buyer_id: Option<UserId>,
    pub seller_id: Option<UserId>,
}

impl OrderFilter {
    pub fn for_buyer(buyer_id: UserId) -> Self {
        Self {
            buyer_id: Some(buyer_id),
            ..Self::default()
        }
    }

    pub fn for_seller(seller_id: UserId) -> Self {
        Self {
            seller_id: Some(seller_id),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: StatusFilter) -> Self {
        self.status = status;
        self
    }

    fn matches_party(&self, order: &OrderSummary) -> bool {
        self.buyer_id.is_none_or(|id| id == order.buyer_id)
            && self.seller_id.is_none_or(|id| id == order.seller_id)
    }

    fn matches(&self, order: &OrderSummary) -> bool {
        self.matches_party(order) && self.status.matches(order.status)
    }
}

/// A status tab with its order count. `status` is `None` for the "All" tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusTab {
    pub status: Option<OrderStatus>,
    pub label: &'static str,
    pub count: usize,
}

/// Read model view over every order, keyed by order id.
#[derive(Clone, Default)]
pub struct OrderBoardView {
    orders: Arc<RwLock<HashMap<AggregateId, OrderSummary>>>,
    position: Arc<RwLock<ProjectionPosition>>,
}

impl OrderBoardView {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_order(&self, order_id: AggregateId) -> Option<OrderSummary> {
        self.orders.read().await.get(&order_id).cloned()
    }

    /// Orders matching `filter`, newest first.
    pub async fn list(&self, filter: &OrderFilter) -> Vec<OrderSummary> {
        let mut orders: Vec<_> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        orders
    }

    /// Counts per status tab for the buyer/seller part of `filter`.
    ///
    /// The first tab is "All"; the rest follow the lifecycle order.
    pub async fn status_tabs(&self, filter: &OrderFilter) -> Vec<StatusTab> {
        let orders = self.orders.read().await;
        let mut counts: HashMap<OrderStatus, usize> = HashMap::new();
        let mut total = 0;
        for order in orders.values().filter(|o| filter.matches_party(o)) {
            *counts.entry(order.status).or_default() += 1;
            total += 1;
        }

        std::iter::once(StatusTab {
            status: None,
            label: "All",
            count: total,
        })
        .chain(OrderStatus::ALL.into_iter().map(|status| StatusTab {
            status: Some(status),
            label: status.label(),
            count: counts.get(&status).copied().unwrap_or_default(),
        }))
        .collect()
    }
}

#[async_trait]
impl Projection for OrderBoardView {
    fn name(&self) -> &'static str {
        "OrderBoardView"
    }

    async fn handle(&self, event: &EventEnvelope) -> Result<()> {
        if let Some(order_event) = decode_order_event(event)? {
            let mut orders = self.orders.write().await;
            match order_event {
                OrderEvent::OrderPlaced(data) => {
                    let title = match data.lines.as_slice() {
                        [only] => only.title.clone(),
                        [first, rest @ ..] => format!("{} +{} more", first.title, rest.len()),
                        [] => String::new(),
                    };
                    orders.insert(
                        data.order_id,
                        OrderSummary {
                            order_id: data.order_id,
                            buyer_id: data.buyer_id,
                            seller_id: data.seller_id,
                            status: OrderStatus::Pending,
                            quantity: data.lines.iter().map(|l| u64::from(l.quantity)).sum(),
                            total_price: data.pricing.total,
                            payment_method: data.payment_method,
                            title,
                            tracking_number: None,
                            created_at: data.placed_at,
                            updated_at: data.placed_at,
                        },
                    );
                }
                OrderEvent::OrderStatusChanged(data) => {
                    if let Some(order) = orders.get_mut(&data.order_id) {
                        order.status = data.to;
                        order.updated_at = data.changed_at;
                        if data.tracking_number.is_some() {
                            order.tracking_number = data.tracking_number;
                        }
                    }
                }
            }
        }

        let mut pos = self.position.write().await;
        *pos = pos.advance();
        Ok(())
    }

    async fn position(&self) -> ProjectionPosition {
        *self.position.read().await
    }

    async fn reset(&self) -> Result<()> {
        self.orders.write().await.clear();
        *self.position.write().await = ProjectionPosition::zero();
        Ok(())
    }
}

#[async_trait]
impl ReadModel for OrderBoardView {
    fn name(&self) -> &'static str {
        "OrderBoardView"
    }

    async fn count(&self) -> usize {
        self.orders.read().await.len()
    }
}
