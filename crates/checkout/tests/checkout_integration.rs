//! Checkout against the in-memory event store and collaborators.

use std::sync::Arc;

use checkout::{
    AddressBook, CartStore, CheckoutCoordinator, CheckoutError, CheckoutRequest,
    InMemoryAddressBook, InMemoryCartStore, InMemoryListingCatalog, Listing, ListingCatalog,
};
use common::{AddressId, UserId};
use domain::{
    Address, Aggregate, DomainError, FlatRateShipping, ManualAddress, Money, OrderService,
    OrderStatus, PaymentMethod, PricingCalculator,
};
use event_store::InMemoryEventStore;

type Coordinator = CheckoutCoordinator<
    InMemoryEventStore,
    InMemoryCartStore,
    InMemoryListingCatalog,
    InMemoryAddressBook,
>;

struct Harness {
    store: InMemoryEventStore,
    coordinator: Coordinator,
}

fn setup() -> Harness {
    let store = InMemoryEventStore::new();
    let coordinator = CheckoutCoordinator::new(
        store.clone(),
        InMemoryCartStore::new(),
        InMemoryListingCatalog::new(),
        InMemoryAddressBook::new(),
    );
    Harness { store, coordinator }
}

fn manual_address() -> ManualAddress {
    ManualAddress {
        first_name: Some("Timur".into()),
        last_name: Some("Akhmetov".into()),
        address: Some("21 Kabanbay Batyr Ave".into()),
        city: Some("Astana".into()),
        region: Some("Akmola".into()),
        postal_code: Some("010000".into()),
        country: Some("KZ".into()),
        email: Some("timur@example.com".into()),
        phone: Some("+77017778899".into()),
    }
}

fn saved_address(user_id: UserId, full_name: &str, is_default: bool) -> Address {
    Address {
        id: AddressId::new(),
        user_id,
        full_name: full_name.to_string(),
        address_line_1: "14 Abay Ave".to_string(),
        address_line_2: Some("Apt 9".to_string()),
        city: "Almaty".to_string(),
        region: None,
        postal_code: "050010".to_string(),
        country: "KZ".to_string(),
        phone: Some("+77001234567".to_string()),
        is_default,
    }
}

async fn add_to_cart(h: &Harness, buyer: UserId, seller: UserId, title: &str, price: i64, qty: u32) {
    let listing = Listing::new(seller, title, Money::from_major(price));
    h.coordinator.listings().upsert(listing.clone()).await.unwrap();
    h.coordinator
        .carts()
        .add_item(buyer, listing.id, qty)
        .await
        .unwrap();
}

mod splitting {
    use super::*;

    #[tokio::test]
    async fn one_order_per_seller_in_cart_order() {
        let h = setup();
        let buyer = UserId::new();
        let bookshop = UserId::new();
        let bakery = UserId::new();

        add_to_cart(&h, buyer, bookshop, "Novel", 3000, 1).await;
        add_to_cart(&h, buyer, bakery, "Bread", 500, 4).await;
        add_to_cart(&h, buyer, bookshop, "Atlas", 7000, 1).await;

        let receipt = h
            .coordinator
            .checkout(CheckoutRequest::new(buyer, "cod").with_manual_address(manual_address()))
            .await
            .unwrap();

        assert_eq!(receipt.orders.len(), 2);
        let first = &receipt.orders[0];
        let second = &receipt.orders[1];
        assert_eq!(first.seller_id(), Some(bookshop));
        assert_eq!(first.lines().len(), 2);
        assert_eq!(first.pricing().subtotal, Money::from_major(10000));
        assert_eq!(second.seller_id(), Some(bakery));
        assert_eq!(second.total_quantity(), 4);

        for order in &receipt.orders {
            assert_eq!(order.status(), OrderStatus::Pending);
            assert_eq!(order.buyer_id(), Some(buyer));
            assert_eq!(order.payment_method(), Some(PaymentMethod::Cod));
            assert!(order.pricing().is_consistent());
        }
        assert!(h.coordinator.carts().items(buyer).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn later_price_changes_do_not_touch_placed_orders() {
        let h = setup();
        let buyer = UserId::new();
        let seller = UserId::new();
        let mut listing = Listing::new(seller, "Chair", Money::from_major(5000));
        h.coordinator.listings().upsert(listing.clone()).await.unwrap();
        h.coordinator
            .carts()
            .add_item(buyer, listing.id, 1)
            .await
            .unwrap();

        let receipt = h
            .coordinator
            .checkout(CheckoutRequest::new(buyer, "card").with_manual_address(manual_address()))
            .await
            .unwrap();
        let order_id = receipt.order_ids()[0];

        listing.price = Money::from_major(9000);
        h.coordinator.listings().upsert(listing).await.unwrap();

        let service = OrderService::new(h.store.clone());
        let order = service.get_order(order_id).await.unwrap().unwrap();
        assert_eq!(order.total_price(), Money::from_major(5600));
    }

    #[tokio::test]
    async fn flat_rate_shipping_is_charged_per_order() {
        let store = InMemoryEventStore::new();
        let coordinator = CheckoutCoordinator::new(
            store,
            InMemoryCartStore::new(),
            InMemoryListingCatalog::new(),
            InMemoryAddressBook::new(),
        )
        .with_pricing(PricingCalculator::new(Arc::new(FlatRateShipping {
            fee: Money::from_major(500),
        })));
        let buyer = UserId::new();
        let listing = Listing::new(UserId::new(), "Vase", Money::from_major(1000));
        coordinator.listings().upsert(listing.clone()).await.unwrap();
        coordinator.carts().add_item(buyer, listing.id, 1).await.unwrap();

        let receipt = coordinator
            .checkout(CheckoutRequest::new(buyer, "paypal").with_manual_address(manual_address()))
            .await
            .unwrap();

        let pricing = receipt.orders[0].pricing();
        assert_eq!(pricing.shipping, Money::from_major(500));
        assert_eq!(pricing.total, Money::from_major(1620));
    }
}

mod addresses {
    use super::*;

    #[tokio::test]
    async fn saved_default_address_is_frozen() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Mug", 20, 1).await;
        let book = h.coordinator.addresses();
        book.add(saved_address(buyer, "First Person", false))
            .await
            .unwrap();
        book.add(saved_address(buyer, "Erlan Bekov Uly", true))
            .await
            .unwrap();

        let request = CheckoutRequest::new(buyer, "kaspi")
            .with_saved_address(None)
            .with_contact("erlan@example.com", "+77000000001");
        let receipt = h.coordinator.checkout(request).await.unwrap();

        let shipping = receipt.orders[0].shipping_address().unwrap();
        assert_eq!(shipping.first_name, "Erlan");
        assert_eq!(shipping.last_name, "Bekov Uly");
        assert_eq!(shipping.address, "14 Abay Ave, Apt 9");
        assert_eq!(shipping.region, "");
        assert_eq!(shipping.email, "erlan@example.com");
        assert_eq!(shipping.phone, "+77001234567");
    }

    #[tokio::test]
    async fn unknown_saved_address_is_not_found() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Mug", 20, 1).await;
        h.coordinator
            .addresses()
            .add(saved_address(buyer, "Some One", true))
            .await
            .unwrap();

        let missing = AddressId::new();
        let request = CheckoutRequest::new(buyer, "cod")
            .with_saved_address(Some(missing))
            .with_contact("someone@example.com", "+77000000002");
        let result = h.coordinator.checkout(request).await;

        assert!(matches!(result, Err(CheckoutError::AddressNotFound(id)) if id == missing));
    }

    #[tokio::test]
    async fn saved_address_with_empty_book_flags_address_id() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Mug", 20, 1).await;

        let request = CheckoutRequest::new(buyer, "cod")
            .with_saved_address(None)
            .with_contact("someone@example.com", "+77000000002");
        match h.coordinator.checkout(request).await {
            Err(CheckoutError::Validation(errors)) => assert!(errors.contains("address_id")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn failed_persistence_leaves_no_orders_and_an_intact_cart() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Desk", 10000, 2).await;
        add_to_cart(&h, buyer, UserId::new(), "Chair", 5000, 1).await;
        h.store.set_fail_on_append(true);

        let result = h
            .coordinator
            .checkout(CheckoutRequest::new(buyer, "cod").with_manual_address(manual_address()))
            .await;

        match result {
            Err(CheckoutError::Domain(e)) => assert!(e.is_persistence_failure()),
            other => panic!("expected persistence failure, got {other:?}"),
        }
        assert_eq!(h.store.event_count().await, 0);
        assert_eq!(h.coordinator.carts().items(buyer).await.unwrap().len(), 2);

        h.store.set_fail_on_append(false);
        let receipt = h
            .coordinator
            .checkout(CheckoutRequest::new(buyer, "cod").with_manual_address(manual_address()))
            .await
            .unwrap();
        assert_eq!(receipt.orders.len(), 2);
    }

    #[tokio::test]
    async fn vanished_listing_is_unavailable() {
        let h = setup();
        let buyer = UserId::new();
        let listing = Listing::new(UserId::new(), "Ghost", Money::from_major(10));
        h.coordinator.listings().upsert(listing.clone()).await.unwrap();
        h.coordinator
            .carts()
            .add_item(buyer, listing.id, 1)
            .await
            .unwrap();
        h.coordinator.listings().remove(listing.id).await;

        let result = h
            .coordinator
            .checkout(CheckoutRequest::new(buyer, "cod").with_manual_address(manual_address()))
            .await;

        assert!(matches!(result, Err(CheckoutError::ListingUnavailable(ids)) if ids == vec![listing.id]));
        assert_eq!(h.store.event_count().await, 0);
    }

    #[tokio::test]
    async fn missing_manual_fields_are_all_named() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Pen", 2, 1).await;

        let request = CheckoutRequest::new(buyer, "cod").with_manual_address(ManualAddress {
            first_name: Some("Only".into()),
            ..ManualAddress::default()
        });
        match h.coordinator.checkout(request).await {
            Err(CheckoutError::Validation(errors)) => {
                assert_eq!(
                    errors.fields(),
                    vec![
                        "last_name",
                        "address",
                        "country",
                        "region",
                        "city",
                        "postal_code",
                        "email",
                        "phone"
                    ]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_payment_method_is_required() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Pen", 2, 1).await;

        let mut request = CheckoutRequest::new(buyer, "cod").with_manual_address(manual_address());
        request.payment_method = None;
        match h.coordinator.checkout(request).await {
            Err(CheckoutError::Validation(errors)) => {
                assert_eq!(errors.fields(), vec!["payment_method"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}

mod idempotency {
    use super::*;

    #[tokio::test]
    async fn retry_with_same_key_returns_the_first_orders() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Lamp", 40, 1).await;

        let request = CheckoutRequest::new(buyer, "cod")
            .with_manual_address(manual_address())
            .with_idempotency_key("checkout-7f3a");

        let first = h.coordinator.checkout(request.clone()).await.unwrap();
        let events_after_first = h.store.event_count().await;
        let second = h.coordinator.checkout(request).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.order_ids(), second.order_ids());
        assert_eq!(h.store.event_count().await, events_after_first);
    }

    #[tokio::test]
    async fn retry_after_restart_returns_the_first_orders() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Lamp", 40, 1).await;

        let request = CheckoutRequest::new(buyer, "cod")
            .with_manual_address(manual_address())
            .with_idempotency_key("checkout-91c2");
        let first = h.coordinator.checkout(request.clone()).await.unwrap();

        let restarted = CheckoutCoordinator::new(
            h.store.clone(),
            h.coordinator.carts().clone(),
            h.coordinator.listings().clone(),
            h.coordinator.addresses().clone(),
        );
        let second = restarted.checkout(request).await.unwrap();

        assert!(second.replayed);
        assert!(second.cart_cleared);
        assert_eq!(first.order_ids(), second.order_ids());
    }

    #[tokio::test]
    async fn different_buyers_check_out_concurrently() {
        let h = setup();
        let alice = UserId::new();
        let bob = UserId::new();
        add_to_cart(&h, alice, UserId::new(), "Lamp", 40, 1).await;
        add_to_cart(&h, bob, UserId::new(), "Rug", 90, 2).await;

        let (a, b) = tokio::join!(
            h.coordinator
                .checkout(CheckoutRequest::new(alice, "cod").with_manual_address(manual_address())),
            h.coordinator
                .checkout(CheckoutRequest::new(bob, "card").with_manual_address(manual_address()))
        );

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a.orders.len(), 1);
        assert_eq!(b.orders.len(), 1);
        assert_eq!(b.orders[0].total_quantity(), 2);
    }

    #[tokio::test]
    async fn keys_are_scoped_per_buyer() {
        let h = setup();
        let alice = UserId::new();
        let bob = UserId::new();
        add_to_cart(&h, alice, UserId::new(), "Lamp", 40, 1).await;
        add_to_cart(&h, bob, UserId::new(), "Rug", 90, 1).await;

        let key = "shared-key";
        let a = h
            .coordinator
            .checkout(
                CheckoutRequest::new(alice, "cod")
                    .with_manual_address(manual_address())
                    .with_idempotency_key(key),
            )
            .await
            .unwrap();
        let b = h
            .coordinator
            .checkout(
                CheckoutRequest::new(bob, "cod")
                    .with_manual_address(manual_address())
                    .with_idempotency_key(key),
            )
            .await
            .unwrap();

        assert!(!b.replayed);
        assert_ne!(a.order_ids(), b.order_ids());
    }

    #[tokio::test]
    async fn concurrent_checkouts_of_one_cart_place_orders_once() {
        let h = setup();
        let buyer = UserId::new();
        add_to_cart(&h, buyer, UserId::new(), "Lamp", 40, 1).await;

        let request = CheckoutRequest::new(buyer, "cod").with_manual_address(manual_address());
        let (a, b) = tokio::join!(
            h.coordinator.checkout(request.clone()),
            h.coordinator.checkout(request)
        );

        let placed = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(placed, 1);
        assert!(
            [a, b]
                .into_iter()
                .any(|r| matches!(r, Err(CheckoutError::EmptyCart)))
        );
    }

    #[tokio::test]
    async fn placed_orders_follow_the_state_machine() {
        let h = setup();
        let buyer = UserId::new();
        let seller = UserId::new();
        add_to_cart(&h, buyer, seller, "Lamp", 40, 1).await;

        let receipt = h
            .coordinator
            .checkout(CheckoutRequest::new(buyer, "cod").with_manual_address(manual_address()))
            .await
            .unwrap();
        let order_id = receipt.orders[0].id().unwrap();

        let service = OrderService::new(h.store.clone());
        let refused = service
            .change_status(domain::ChangeOrderStatus::new(
                order_id,
                OrderStatus::Packed,
                seller,
            ))
            .await;
        assert!(matches!(refused, Err(DomainError::Order(_))));
    }
}
