use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use homecook_orders::{
    audit::{LogNotifier, Notifier, OrderEvent},
    error::AppError,
    models::{Actor, ActorRole, Order, OrderDish, OrderStatus, PaymentMethod},
    repository::{InMemoryOrderRepository, OrderFilter, OrderRepository},
    response::PageRequest,
    services::state_machine::{
        NewOrder, OrderStateMachine, TransitionRequest, is_valid_transition, valid_next_states,
    },
};
use uuid::Uuid;

#[derive(Default)]
struct RecordingNotifier {
    events: Mutex<Vec<OrderEvent>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &OrderEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _event: &OrderEvent) -> anyhow::Result<()> {
        anyhow::bail!("smtp relay unreachable")
    }
}

struct Parties {
    customer: Uuid,
    cook: Uuid,
    driver: Uuid,
}

impl Parties {
    fn new() -> Self {
        Self {
            customer: Uuid::new_v4(),
            cook: Uuid::new_v4(),
            driver: Uuid::new_v4(),
        }
    }
}

fn machine_with(notifier: Arc<dyn Notifier>) -> OrderStateMachine {
    OrderStateMachine::new(Arc::new(InMemoryOrderRepository::new()), notifier)
}

fn draft(parties: &Parties, legacy: bool) -> NewOrder {
    NewOrder {
        customer_id: parties.customer,
        cooker_id: parties.cook,
        dishes: vec![OrderDish {
            dish_id: Uuid::new_v4(),
            dish_name: "Pepper soup".into(),
            quantity: 2,
            unit_price: 4_000,
        }],
        subtotal: 8_000,
        delivery_fee: 2_500,
        service_fee: 960,
        payment_method: PaymentMethod::Card,
        delivery_address: Some("4 Bode Thomas St".into()),
        legacy,
    }
}

async fn place(machine: &OrderStateMachine, parties: &Parties) -> Order {
    machine
        .create_orders(vec![draft(parties, false)])
        .await
        .unwrap()
        .remove(0)
}

async fn advance_to_ready(machine: &OrderStateMachine, parties: &Parties, order: &Order) -> Order {
    let cook = Actor::cooker(parties.cook);
    let mut current = order.clone();
    for target in [OrderStatus::Accepted, OrderStatus::Preparing, OrderStatus::Ready] {
        current = machine
            .request_transition(order.id, TransitionRequest::new(target, cook))
            .await
            .unwrap();
        assert_eq!(current.status, target);
        assert!(!current.is_delivered);
    }
    current
}

#[test]
fn lifecycle_graph_matches_the_transition_table() {
    use OrderStatus::*;
    let expected = [
        (PendingApproval, vec![Accepted, Cancelled, Rejected]),
        (Pending, vec![Accepted, Cancelled]),
        (Accepted, vec![Preparing, Cancelled]),
        (Preparing, vec![Ready, Cancelled]),
        (Ready, vec![Delivering, Cancelled]),
        (Delivering, vec![Delivered, Cancelled]),
        (Delivered, vec![]),
        (Cancelled, vec![]),
        (Rejected, vec![]),
    ];
    for (from, next) in expected {
        assert_eq!(valid_next_states(from), next, "edges out of {from}");
        for to in OrderStatus::ALL {
            assert_eq!(is_valid_transition(from, to), next.contains(&to), "{from} -> {to}");
        }
    }
}

#[tokio::test]
async fn orders_start_pending_approval_with_a_code() {
    let notifier = Arc::new(RecordingNotifier::default());
    let machine = machine_with(notifier.clone());
    let parties = Parties::new();

    let order = place(&machine, &parties).await;
    assert_eq!(order.status, OrderStatus::PendingApproval);
    assert_eq!(order.total, 8_000 + 2_500 + 960);
    assert_eq!(order.delivery_code.len(), 4);
    assert!(order.delivery_code.bytes().all(|b| b.is_ascii_digit()));
    assert!(!order.is_delivered);

    let events = notifier.events.lock().unwrap();
    assert!(matches!(
        events.as_slice(),
        [OrderEvent::Created { order_id, .. }] if *order_id == order.id
    ));
}

#[tokio::test]
async fn legacy_orders_start_pending_and_can_be_accepted() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();

    let order = machine
        .create_orders(vec![draft(&parties, true)])
        .await
        .unwrap()
        .remove(0);
    assert_eq!(order.status, OrderStatus::Pending);

    let accepted = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Accepted, Actor::system()),
        )
        .await
        .unwrap();
    assert_eq!(accepted.status, OrderStatus::Accepted);
}

#[tokio::test]
async fn pickup_records_driver_and_clears_availability() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let order = place(&machine, &parties).await;

    let ready = advance_to_ready(&machine, &parties, &order).await;
    assert!(ready.available_for_pickup);
    assert!(ready.ready_time.is_some());
    assert!(ready.cooker_approval.as_ref().is_some_and(|a| a.approved));

    let delivering = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Delivering, Actor::driver(parties.driver)),
        )
        .await
        .unwrap();
    assert_eq!(delivering.driver_id, Some(parties.driver));
    assert!(!delivering.available_for_pickup);
    assert!(delivering.pickup_time.is_some());
    assert!(!delivering.is_delivered);
}

#[tokio::test]
async fn rejection_keeps_the_reason() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let order = place(&machine, &parties).await;

    let rejected = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Rejected, Actor::cooker(parties.cook))
                .with_reason("out of stock"),
        )
        .await
        .unwrap();

    assert_eq!(rejected.status, OrderStatus::Rejected);
    let approval = rejected.cooker_approval.expect("approval recorded");
    assert!(!approval.approved);
    assert!(approval.rejected_at.is_some());
    assert_eq!(approval.rejection_reason.as_deref(), Some("out of stock"));

    let again = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Accepted, Actor::cooker(parties.cook)),
        )
        .await;
    assert!(matches!(
        again,
        Err(AppError::InvalidTransition {
            from: OrderStatus::Rejected,
            to: OrderStatus::Accepted
        })
    ));
}

#[tokio::test]
async fn illegal_transition_leaves_order_untouched() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let order = place(&machine, &parties).await;
    let ready = advance_to_ready(&machine, &parties, &order).await;

    let result = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Preparing, Actor::cooker(parties.cook)),
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidTransition { .. })));

    let stored = machine.get(order.id).await.unwrap();
    assert_eq!(stored, ready);
}

#[tokio::test]
async fn only_the_owning_cook_may_accept() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let order = place(&machine, &parties).await;

    for actor in [
        Actor::cooker(Uuid::new_v4()),
        Actor::customer(parties.customer),
        Actor::driver(parties.driver),
    ] {
        let result = machine
            .request_transition(order.id, TransitionRequest::new(OrderStatus::Accepted, actor))
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)), "{actor:?}");
    }
    assert_eq!(
        machine.get(order.id).await.unwrap().status,
        OrderStatus::PendingApproval
    );
}

#[tokio::test]
async fn delivered_cannot_be_requested_directly() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let order = place(&machine, &parties).await;
    advance_to_ready(&machine, &parties, &order).await;
    machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Delivering, Actor::driver(parties.driver)),
        )
        .await
        .unwrap();

    for actor in [Actor::driver(parties.driver), Actor::system()] {
        let result = machine
            .request_transition(order.id, TransitionRequest::new(OrderStatus::Delivered, actor))
            .await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
    let stored = machine.get(order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Delivering);
    assert!(!stored.is_delivered);
}

#[tokio::test]
async fn customer_cancellation_records_who_and_why() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let order = place(&machine, &parties).await;

    let cancelled = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Cancelled, Actor::customer(parties.customer))
                .with_reason("ordered twice"),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("ordered twice"));
    assert!(cancelled.cancelled_by.is_some());

    let result = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Cancelled, Actor::customer(parties.customer)),
        )
        .await;
    assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
}

#[tokio::test]
async fn system_can_cancel_mid_preparation_but_not_advance() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let order = place(&machine, &parties).await;
    let cook = Actor::cooker(parties.cook);
    for target in [OrderStatus::Accepted, OrderStatus::Preparing] {
        machine
            .request_transition(order.id, TransitionRequest::new(target, cook))
            .await
            .unwrap();
    }

    let result = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Ready, Actor::system()),
        )
        .await;
    assert!(matches!(result, Err(AppError::Unauthorized)));

    let cancelled = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Cancelled, Actor::system())
                .with_reason("cook unreachable"),
        )
        .await
        .unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.cancelled_by, Some(ActorRole::System));
    assert_eq!(cancelled.cancellation_reason.as_deref(), Some("cook unreachable"));
    assert_eq!(machine.get(order.id).await.unwrap(), cancelled);
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let machine = machine_with(Arc::new(LogNotifier));
    let result = machine
        .request_transition(
            Uuid::new_v4(),
            TransitionRequest::new(OrderStatus::Accepted, Actor::system()),
        )
        .await;
    assert!(matches!(result, Err(AppError::NotFound)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_claims_have_exactly_one_winner() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let order = place(&machine, &parties).await;
    advance_to_ready(&machine, &parties, &order).await;

    let order_id = order.id;
    let drivers = [Uuid::new_v4(), Uuid::new_v4()];
    let handles: Vec<_> = drivers
        .iter()
        .map(|driver| {
            let machine = machine.clone();
            let request = TransitionRequest::new(OrderStatus::Delivering, Actor::driver(*driver));
            tokio::spawn(async move { machine.request_transition(order_id, request).await })
        })
        .collect();

    let mut winners = Vec::new();
    let mut losers = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(order) => winners.push(order),
            Err(AppError::InvalidTransition { to, .. }) => {
                assert_eq!(to, OrderStatus::Delivering);
                losers += 1;
            }
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(winners.len(), 1);
    assert_eq!(losers, 1);
    let stored = machine.get(order.id).await.unwrap();
    assert_eq!(stored.driver_id, winners[0].driver_id);
    assert!(drivers.iter().any(|d| stored.driver_id == Some(*d)));
}

#[tokio::test]
async fn notifier_failure_does_not_undo_the_transition() {
    let machine = machine_with(Arc::new(FailingNotifier));
    let parties = Parties::new();

    let order = place(&machine, &parties).await;
    let accepted = machine
        .request_transition(
            order.id,
            TransitionRequest::new(OrderStatus::Accepted, Actor::cooker(parties.cook)),
        )
        .await
        .unwrap();

    assert_eq!(accepted.status, OrderStatus::Accepted);
    assert_eq!(machine.get(order.id).await.unwrap().status, OrderStatus::Accepted);
}

#[tokio::test]
async fn listing_filters_by_party_and_status() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();
    let first = place(&machine, &parties).await;
    let _second = place(&machine, &parties).await;
    let _other = place(&machine, &Parties::new()).await;

    machine
        .request_transition(
            first.id,
            TransitionRequest::new(OrderStatus::Accepted, Actor::cooker(parties.cook)),
        )
        .await
        .unwrap();

    let repo = machine.repository();
    let mine = repo
        .list(
            &OrderFilter {
                cooker_id: Some(parties.cook),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(mine.total, 2);

    let accepted = repo
        .list(
            &OrderFilter {
                cooker_id: Some(parties.cook),
                status: Some(OrderStatus::Accepted),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(accepted.total, 1);
    assert_eq!(accepted.items[0].id, first.id);
}

#[tokio::test]
async fn invalid_drafts_create_nothing() {
    let machine = machine_with(Arc::new(LogNotifier));
    let parties = Parties::new();

    let mut bad = draft(&parties, false);
    bad.dishes[0].quantity = 0;
    bad.subtotal = 0;
    let result = machine
        .create_orders(vec![draft(&parties, false), bad])
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let all = machine
        .repository()
        .list(&OrderFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(all.total, 0);
}
