//! Envelope builders shared by the view tests.

use chrono::Utc;
use common::{AggregateId, ListingId, UserId};
use domain::{
    ActorRole, DomainEvent, Money, OrderEvent, OrderLine, OrderPlacedData, OrderStatus,
    PaymentMethod, PricingCalculator, ResolvedAddress,
};
use event_store::{EventEnvelope, Version};

pub(crate) fn placed_envelope(order_id: AggregateId, buyer: UserId, seller: UserId) -> EventEnvelope {
    let lines = vec![
        OrderLine::new(ListingId::new(), "Desk", Money::from_major(10000), 2),
        OrderLine::new(ListingId::new(), "Chair", Money::from_major(5000), 1),
    ];
    let event = OrderEvent::OrderPlaced(OrderPlacedData {
        order_id,
        buyer_id: buyer,
        seller_id: seller,
        pricing: PricingCalculator::default()
            .compute(&lines, Money::zero())
            .unwrap(),
        lines,
        payment_method: PaymentMethod::Kaspi,
        shipping_address: ResolvedAddress {
            first_name: "Aru".to_string(),
            last_name: "Bek".to_string(),
            address: "12 Abay Ave".to_string(),
            city: "Almaty".to_string(),
            region: String::new(),
            postal_code: "050000".to_string(),
            country: "KZ".to_string(),
            email: "aru@example.com".to_string(),
            phone: "+77010000000".to_string(),
        },
        buyer_note: None,
        placed_at: Utc::now(),
    });
    event.to_envelope(order_id, "Order", Version::first()).unwrap()
}

pub(crate) fn status_envelope(
    order_id: AggregateId,
    from: OrderStatus,
    to: OrderStatus,
    actor: UserId,
    version: i64,
) -> EventEnvelope {
    let role = if to == OrderStatus::Completed {
        ActorRole::Buyer
    } else {
        ActorRole::Seller
    };
    OrderEvent::status_changed(order_id, from, to, actor, role, None)
        .to_envelope(order_id, "Order", Version::new(version))
        .unwrap()
}
