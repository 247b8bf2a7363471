//! Shared application state.

use std::sync::Arc;

use checkout::{CheckoutCoordinator, InMemoryAddressBook, InMemoryCartStore, InMemoryListingCatalog};
use domain::{InMemoryShortlistStore, OrderService, PricingCalculator, ShortlistService};
use event_store::EventStore;
use projections::{OrderBoardView, Projection, ProjectionProcessor, StatusTimelineView};

/// Checkout wired to the in-memory collaborators.
pub type Checkout<S> =
    CheckoutCoordinator<S, InMemoryCartStore, InMemoryListingCatalog, InMemoryAddressBook>;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EventStore> {
    pub order_service: OrderService<S>,
    pub checkout: Checkout<S>,
    pub order_board: OrderBoardView,
    pub timeline: StatusTimelineView,
    pub shortlists: ShortlistService<InMemoryShortlistStore>,
    pub event_store: S,
    pub projection_processor: Arc<ProjectionProcessor<S>>,
}

impl<S: EventStore + Clone + 'static> AppState<S> {
    /// Wires services, collaborators and read models over `event_store`.
    pub fn new(event_store: S, pricing: PricingCalculator) -> Self {
        let order_board = OrderBoardView::new();
        let timeline = StatusTimelineView::new();

        let mut processor = ProjectionProcessor::new(event_store.clone());
        processor.register(Box::new(order_board.clone()) as Box<dyn Projection>);
        processor.register(Box::new(timeline.clone()) as Box<dyn Projection>);

        let checkout = CheckoutCoordinator::new(
            event_store.clone(),
            InMemoryCartStore::new(),
            InMemoryListingCatalog::new(),
            InMemoryAddressBook::new(),
        )
        .with_pricing(pricing);

        Self {
            order_service: OrderService::new(event_store.clone()),
            checkout,
            order_board,
            timeline,
            shortlists: ShortlistService::new(InMemoryShortlistStore::new()),
            event_store,
            projection_processor: Arc::new(processor),
        }
    }

    /// Brings the read models up to date with the event store.
    pub async fn refresh_read_models(&self) -> projections::Result<u64> {
        self.projection_processor.run_catch_up().await
    }
}
