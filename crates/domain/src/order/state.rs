//! Order status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The status of an order in its lifecycle.
///
/// Status transitions:
/// ```text
/// Pending ──┬──► Accepted ──► Packed ──► Shipped ──► Delivered ──► Completed
///           │
///           └──► Rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Placed by the buyer, awaiting the seller's decision.
    #[default]
    Pending,

    /// Seller accepted the order.
    Accepted,

    /// Seller declined the order (terminal state).
    Rejected,

    /// Goods are packed.
    Packed,

    /// Handed to the carrier.
    Shipped,

    /// Reached the buyer.
    Delivered,

    /// Closed out (terminal state).
    Completed,
}

/// Which side of the order a participant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Buyer,
    Seller,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Buyer => "buyer",
            ActorRole::Seller => "seller",
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One permitted edge of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub roles: &'static [ActorRole],
}

const SELLER: &[ActorRole] = &[ActorRole::Seller];
const EITHER: &[ActorRole] = &[ActorRole::Buyer, ActorRole::Seller];

/// Every legal transition. Anything not listed here is refused.
pub static TRANSITIONS: &[Transition] = &[
    Transition {
        from: OrderStatus::Pending,
        to: OrderStatus::Accepted,
        roles: SELLER,
    },
    Transition {
        from: OrderStatus::Pending,
        to: OrderStatus::Rejected,
        roles: SELLER,
    },
    Transition {
        from: OrderStatus::Accepted,
        to: OrderStatus::Packed,
        roles: SELLER,
    },
    Transition {
        from: OrderStatus::Packed,
        to: OrderStatus::Shipped,
        roles: SELLER,
    },
    Transition {
        from: OrderStatus::Shipped,
        to: OrderStatus::Delivered,
        roles: SELLER,
    },
    Transition {
        from: OrderStatus::Delivered,
        to: OrderStatus::Completed,
        roles: EITHER,
    },
];

impl OrderStatus {
    /// All statuses in lifecycle order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Rejected,
        OrderStatus::Packed,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Completed,
    ];

    /// Returns true if `role` may move an order from this status to `to`.
    pub fn can_transition(&self, to: OrderStatus, role: ActorRole) -> bool {
        TRANSITIONS
            .iter()
            .any(|t| t.from == *self && t.to == to && t.roles.contains(&role))
    }

    /// Statuses `role` may move an order to from here.
    pub fn allowed_targets(&self, role: ActorRole) -> Vec<OrderStatus> {
        TRANSITIONS
            .iter()
            .filter(|t| t.from == *self && t.roles.contains(&role))
            .map(|t| t.to)
            .collect()
    }

    /// Returns true if no transition leaves this status.
    pub fn is_terminal(&self) -> bool {
        !TRANSITIONS.iter().any(|t| t.from == *self)
    }

    /// Returns true if the buyer may leave a review in this status.
    pub fn is_reviewable(&self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Completed)
    }

    /// Returns the wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Rejected => "rejected",
            OrderStatus::Packed => "packed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
        }
    }

    /// Returns a human-readable label for status tabs.
    pub fn label(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Accepted => "Accepted",
            OrderStatus::Rejected => "Rejected",
            OrderStatus::Packed => "Packed",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raised when a string names no known status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_seller_edges() {
        use OrderStatus::*;
        for (from, to) in [
            (Pending, Accepted),
            (Pending, Rejected),
            (Accepted, Packed),
            (Packed, Shipped),
            (Shipped, Delivered),
            (Delivered, Completed),
        ] {
            assert!(from.can_transition(to, ActorRole::Seller), "{from} -> {to}");
        }
    }

    #[test]
    fn test_buyer_only_completes() {
        use OrderStatus::*;
        assert!(Delivered.can_transition(Completed, ActorRole::Buyer));
        assert!(!Pending.can_transition(Accepted, ActorRole::Buyer));
        assert!(!Shipped.can_transition(Delivered, ActorRole::Buyer));
    }

    #[test]
    fn test_every_unlisted_pair_is_refused() {
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                for role in [ActorRole::Buyer, ActorRole::Seller] {
                    let listed = TRANSITIONS
                        .iter()
                        .any(|t| t.from == from && t.to == to && t.roles.contains(&role));
                    assert_eq!(from.can_transition(to, role), listed);
                }
            }
        }
        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Packed, ActorRole::Seller));
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![OrderStatus::Rejected, OrderStatus::Completed]);
    }

    #[test]
    fn test_allowed_targets() {
        assert_eq!(
            OrderStatus::Pending.allowed_targets(ActorRole::Seller),
            vec![OrderStatus::Accepted, OrderStatus::Rejected]
        );
        assert!(OrderStatus::Pending.allowed_targets(ActorRole::Buyer).is_empty());
        assert_eq!(
            OrderStatus::Delivered.allowed_targets(ActorRole::Buyer),
            vec![OrderStatus::Completed]
        );
    }

    #[test]
    fn test_wire_names() {
        assert_eq!(OrderStatus::Shipped.to_string(), "shipped");
        assert_eq!(
            serde_json::to_string(&OrderStatus::Delivered).unwrap(),
            "\"delivered\""
        );
        assert_eq!("Packed".parse::<OrderStatus>().unwrap(), OrderStatus::Packed);
        assert!("lost".parse::<OrderStatus>().is_err());
    }
}
