use std::sync::Arc;

use chrono::Duration;
use homecook_orders::{
    audit::LogNotifier,
    error::AppError,
    models::{Actor, Order, OrderDish, OrderStatus, PaymentMethod, PaymentStatus},
    repository::{InMemoryOrderRepository, OrderRepository},
    services::{
        delivery_code::{CodePolicy, DeliveryCodeVerifier, VerificationFailure},
        state_machine::{NewOrder, OrderStateMachine, TransitionRequest},
    },
};
use uuid::Uuid;

struct Harness {
    machine: OrderStateMachine,
    verifier: DeliveryCodeVerifier,
    cook: Uuid,
    driver: Uuid,
}

impl Harness {
    fn new(policy: CodePolicy) -> Self {
        let machine = OrderStateMachine::new(
            Arc::new(InMemoryOrderRepository::new()),
            Arc::new(LogNotifier),
        );
        let verifier = DeliveryCodeVerifier::new(machine.clone(), policy);
        Self {
            machine,
            verifier,
            cook: Uuid::new_v4(),
            driver: Uuid::new_v4(),
        }
    }

    async fn place(&self, method: PaymentMethod) -> Order {
        let draft = NewOrder {
            customer_id: Uuid::new_v4(),
            cooker_id: self.cook,
            dishes: vec![OrderDish {
                dish_id: Uuid::new_v4(),
                dish_name: "Ofada stew".into(),
                quantity: 1,
                unit_price: 7_000,
            }],
            subtotal: 7_000,
            delivery_fee: 2_500,
            service_fee: 840,
            payment_method: method,
            delivery_address: None,
            legacy: false,
        };
        self.machine
            .create_orders(vec![draft])
            .await
            .unwrap()
            .remove(0)
    }

    async fn move_to(&self, order_id: Uuid, targets: &[OrderStatus]) -> Order {
        let mut current = self.machine.get(order_id).await.unwrap();
        for target in targets {
            let actor = if *target == OrderStatus::Delivering {
                Actor::driver(self.driver)
            } else {
                Actor::cooker(self.cook)
            };
            current = self
                .machine
                .request_transition(order_id, TransitionRequest::new(*target, actor))
                .await
                .unwrap();
        }
        current
    }

    async fn out_for_delivery(&self, method: PaymentMethod) -> Order {
        let order = self.place(method).await;
        self.move_to(
            order.id,
            &[
                OrderStatus::Accepted,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Delivering,
            ],
        )
        .await
    }

    /// Overwrites the stored code, as if the generator had drawn `code`.
    async fn set_code(&self, order_id: Uuid, code: &str) -> Order {
        let repo = self.machine.repository();
        let current = self.machine.get(order_id).await.unwrap();
        let mut next = current.clone();
        next.delivery_code = code.into();
        next.version += 1;
        assert!(repo.update_if_version(&next, current.version).await.unwrap());
        next
    }
}

/// Any valid code other than `code`.
fn wrong_code(code: &str) -> &'static str {
    if code == "0000" { "1111" } else { "0000" }
}

#[tokio::test]
async fn correct_code_delivers_exactly_once() {
    let h = Harness::new(CodePolicy::default());
    let order = h.out_for_delivery(PaymentMethod::CashOnDelivery).await;
    h.set_code(order.id, "4821").await;

    let outcome = h.verifier.verify(order.id, "4821").await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.message, "delivered");
    assert_eq!(outcome.order.status, OrderStatus::Delivered);
    assert!(outcome.order.is_delivered);
    assert!(outcome.order.actual_delivery_time.is_some());
    assert_eq!(outcome.order.payment_status, PaymentStatus::Paid);

    let again = h.verifier.verify(order.id, "4821").await.unwrap();
    assert!(!again.success);
    assert_eq!(again.message, "already delivered");
    assert_eq!(again.failure, Some(VerificationFailure::AlreadyDelivered));

    let stored = h.machine.get(order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Delivered);
    assert_eq!(stored.version, outcome.order.version);
}

#[tokio::test]
async fn card_payment_status_is_left_alone_on_delivery() {
    let h = Harness::new(CodePolicy::default());
    let order = h.out_for_delivery(PaymentMethod::Card).await;

    let outcome = h.verifier.verify(order.id, &order.delivery_code).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.order.payment_status, PaymentStatus::Pending);
}

#[tokio::test]
async fn verification_requires_delivering_state() {
    let h = Harness::new(CodePolicy::default());
    let order = h.place(PaymentMethod::Card).await;
    let ready = h
        .move_to(
            order.id,
            &[OrderStatus::Accepted, OrderStatus::Preparing, OrderStatus::Ready],
        )
        .await;

    let outcome = h.verifier.verify(order.id, &ready.delivery_code).await.unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.message, "not in delivering state");
    assert_eq!(h.machine.get(order.id).await.unwrap().status, OrderStatus::Ready);
}

#[tokio::test]
async fn incorrect_code_counts_down_then_locks() {
    let h = Harness::new(CodePolicy::default());
    let order = h.out_for_delivery(PaymentMethod::Card).await;
    let bad = wrong_code(&order.delivery_code);

    for attempts_left in (1..5).rev() {
        let outcome = h.verifier.verify(order.id, bad).await.unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.message, "incorrect code");
        assert_eq!(
            outcome.failure,
            Some(VerificationFailure::IncorrectCode { attempts_left })
        );
    }

    let fifth = h.verifier.verify(order.id, bad).await.unwrap();
    assert_eq!(fifth.message, "too many attempts");
    assert!(matches!(fifth.failure, Some(VerificationFailure::Locked { .. })));

    // Even the right code is refused while locked.
    let locked = h.verifier.verify(order.id, &order.delivery_code).await.unwrap();
    assert!(!locked.success);
    assert_eq!(locked.message, "too many attempts");

    let stored = h.machine.get(order.id).await.unwrap();
    assert_eq!(stored.status, OrderStatus::Delivering);
    assert!(!stored.is_delivered);
}

#[tokio::test]
async fn expired_lock_allows_the_right_code() {
    let h = Harness::new(CodePolicy {
        max_attempts: 1,
        lockout: Duration::zero(),
    });
    let order = h.out_for_delivery(PaymentMethod::Card).await;

    let miss = h
        .verifier
        .verify(order.id, wrong_code(&order.delivery_code))
        .await
        .unwrap();
    assert_eq!(miss.message, "incorrect code");

    let hit = h.verifier.verify(order.id, &order.delivery_code).await.unwrap();
    assert!(hit.success);
}

#[tokio::test]
async fn malformed_codes_are_rejected_before_lookup() {
    let h = Harness::new(CodePolicy::default());
    for code in ["482", "48211", "48a1"] {
        assert!(matches!(
            h.verifier.verify(Uuid::new_v4(), code).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            h.verifier.find_by_code(code).await,
            Err(AppError::Validation(_))
        ));
    }
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let h = Harness::new(CodePolicy::default());
    assert!(matches!(
        h.verifier.verify(Uuid::new_v4(), "1234").await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn lookup_only_matches_live_deliveries() {
    let h = Harness::new(CodePolicy::default());
    let order = h.place(PaymentMethod::Card).await;
    h.set_code(order.id, "7316").await;

    // Not picked up yet.
    assert!(matches!(
        h.verifier.find_by_code("7316").await,
        Err(AppError::NotFound)
    ));

    h.move_to(
        order.id,
        &[
            OrderStatus::Accepted,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivering,
        ],
    )
    .await;
    let found = h.verifier.find_by_code("7316").await.unwrap();
    assert_eq!(found.id, order.id);

    h.verifier.verify(order.id, "7316").await.unwrap();
    assert!(matches!(
        h.verifier.find_by_code("7316").await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn colliding_live_codes_are_ambiguous() {
    let h = Harness::new(CodePolicy::default());
    let first = h.out_for_delivery(PaymentMethod::Card).await;
    let second = h.out_for_delivery(PaymentMethod::Card).await;
    h.set_code(first.id, "5050").await;
    h.set_code(second.id, "5050").await;

    assert!(matches!(
        h.verifier.find_by_code("5050").await,
        Err(AppError::AmbiguousCode)
    ));

    // Verifying by id still works for each of them.
    assert!(h.verifier.verify(first.id, "5050").await.unwrap().success);
    assert_eq!(h.verifier.find_by_code("5050").await.unwrap().id, second.id);
}
