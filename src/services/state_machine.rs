use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    audit::{Notifier, OrderEvent, dispatch},
    error::{AppError, AppResult},
    models::{
        Actor, ActorRole, CookerApproval, Order, OrderDish, OrderStatus, PaymentMethod,
        PaymentStatus,
    },
    repository::OrderRepository,
    services::{
        delivery_code::generate_code,
        pricing::{OrderPricing, checked_total, sum_line_totals, validate_line_items},
    },
};

/// How many times a write that lost only to an ancillary update (such as a
/// failed-code counter) is re-applied before giving up.
pub const MAX_WRITE_ATTEMPTS: usize = 3;

/// What is driving a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Request(Actor),
    /// A matching delivery code; only the verifier produces this.
    CodeVerified,
}

#[derive(Debug, Clone)]
pub struct TransitionRequest {
    pub target: OrderStatus,
    pub actor: Actor,
    /// Rejection or cancellation reason; ignored on other edges.
    pub reason: Option<String>,
}

impl TransitionRequest {
    pub fn new(target: OrderStatus, actor: Actor) -> Self {
        Self {
            target,
            actor,
            reason: None,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Input for a single order at creation time.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_id: Uuid,
    pub cooker_id: Uuid,
    pub dishes: Vec<OrderDish>,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub service_fee: i64,
    pub payment_method: PaymentMethod,
    pub delivery_address: Option<String>,
    /// Legacy/administrative orders skip cook approval and start in `pending`.
    pub legacy: bool,
}

impl NewOrder {
    pub fn from_pricing(
        customer_id: Uuid,
        pricing: OrderPricing,
        payment_method: PaymentMethod,
        delivery_address: Option<String>,
    ) -> Self {
        Self {
            customer_id,
            cooker_id: pricing.cooker_id,
            dishes: pricing.dishes,
            subtotal: pricing.subtotal,
            delivery_fee: pricing.delivery_fee,
            service_fee: pricing.service_fee,
            payment_method,
            delivery_address,
            legacy: false,
        }
    }

    fn into_order(self, now: DateTime<Utc>) -> AppResult<Order> {
        validate_line_items(&self.dishes)?;
        let subtotal = sum_line_totals(&self.dishes)?;
        if subtotal != self.subtotal {
            return Err(AppError::Validation(format!(
                "subtotal {} does not match line items ({subtotal})",
                self.subtotal
            )));
        }
        if self.delivery_fee < 0 || self.service_fee < 0 {
            return Err(AppError::Validation("fees must not be negative".into()));
        }
        let total = checked_total(subtotal, self.delivery_fee, self.service_fee)?;

        Ok(Order {
            id: Uuid::new_v4(),
            status: if self.legacy {
                OrderStatus::Pending
            } else {
                OrderStatus::PendingApproval
            },
            customer_id: self.customer_id,
            cooker_id: self.cooker_id,
            driver_id: None,
            dishes: self.dishes,
            subtotal,
            delivery_fee: self.delivery_fee,
            service_fee: self.service_fee,
            total,
            payment_method: self.payment_method,
            payment_status: self.payment_method.initial_status(),
            delivery_code: generate_code(),
            is_delivered: false,
            cooker_approval: None,
            delivery_address: self.delivery_address,
            available_for_pickup: false,
            ready_time: None,
            pickup_time: None,
            actual_delivery_time: None,
            cancelled_by: None,
            cancellation_reason: None,
            failed_code_attempts: 0,
            code_locked_until: None,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Whether `from -> to` is an edge of the lifecycle graph, regardless of who
/// asks for it.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    match (from, to) {
        (PendingApproval, Accepted | Rejected)
        | (Pending, Accepted)
        | (Accepted, Preparing)
        | (Preparing, Ready)
        | (Ready, Delivering)
        | (Delivering, Delivered) => true,
        (from, Cancelled) => !from.is_terminal(),
        _ => false,
    }
}

pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
    OrderStatus::ALL
        .into_iter()
        .filter(|to| is_valid_transition(from, *to))
        .collect()
}

fn authorize(order: &Order, to: OrderStatus, trigger: Trigger) -> AppResult<()> {
    let actor = match trigger {
        Trigger::CodeVerified if to == OrderStatus::Delivered => return Ok(()),
        Trigger::CodeVerified => return Err(AppError::Unauthorized),
        Trigger::Request(actor) => actor,
    };

    let owns_as_cook = actor.role == ActorRole::Cooker && actor.user_id == order.cooker_id;
    let owns_as_customer = actor.role == ActorRole::Customer && actor.user_id == order.customer_id;
    let is_system = actor.role == ActorRole::System;

    let allowed = match (order.status, to) {
        (OrderStatus::Pending, OrderStatus::Accepted) => owns_as_cook || is_system,
        (
            _,
            OrderStatus::Accepted
            | OrderStatus::Rejected
            | OrderStatus::Preparing
            | OrderStatus::Ready,
        ) => owns_as_cook,
        (_, OrderStatus::Delivering) => actor.role == ActorRole::Driver || owns_as_cook,
        (_, OrderStatus::Delivered) => false,
        (_, OrderStatus::Cancelled) => owns_as_cook || owns_as_customer || is_system,
        (_, OrderStatus::PendingApproval | OrderStatus::Pending) => false,
    };

    if allowed {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

/// Computes the order after `current -> to`, side effects included. Pure: the
/// caller persists the result.
pub fn apply_transition(
    current: &Order,
    to: OrderStatus,
    trigger: Trigger,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> AppResult<Order> {
    let from = current.status;
    if !is_valid_transition(from, to) {
        return Err(AppError::InvalidTransition { from, to });
    }
    authorize(current, to, trigger)?;

    let mut next = current.clone();
    next.status = to;
    next.version = current.version + 1;
    next.updated_at = now;

    match (from, to) {
        (OrderStatus::PendingApproval, OrderStatus::Accepted) => {
            next.cooker_approval = Some(CookerApproval {
                approved: true,
                approved_at: Some(now),
                rejected_at: None,
                rejection_reason: None,
            });
        }
        (OrderStatus::PendingApproval, OrderStatus::Rejected) => {
            next.cooker_approval = Some(CookerApproval {
                approved: false,
                approved_at: None,
                rejected_at: Some(now),
                rejection_reason: reason.map(str::to_string),
            });
        }
        (OrderStatus::Preparing, OrderStatus::Ready) => {
            next.available_for_pickup = true;
            next.ready_time = Some(now);
        }
        (OrderStatus::Ready, OrderStatus::Delivering) => {
            if let Trigger::Request(actor) = trigger {
                next.driver_id = Some(actor.user_id);
            }
            next.available_for_pickup = false;
            next.pickup_time = Some(now);
        }
        (OrderStatus::Delivering, OrderStatus::Delivered) => {
            next.is_delivered = true;
            next.actual_delivery_time = Some(now);
            next.failed_code_attempts = 0;
            next.code_locked_until = None;
            if next.payment_status == PaymentStatus::CashPending {
                next.payment_status = PaymentStatus::Paid;
            }
        }
        (_, OrderStatus::Cancelled) => {
            if let Trigger::Request(actor) = trigger {
                next.cancelled_by = Some(actor.role);
            }
            next.cancellation_reason = reason.map(str::to_string);
            next.available_for_pickup = false;
        }
        _ => {}
    }

    Ok(next)
}

/// Owns every write to an order's lifecycle fields.
#[derive(Clone)]
pub struct OrderStateMachine {
    repo: Arc<dyn OrderRepository>,
    notifier: Arc<dyn Notifier>,
}

impl OrderStateMachine {
    pub fn new(repo: Arc<dyn OrderRepository>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repo, notifier }
    }

    pub fn repository(&self) -> &Arc<dyn OrderRepository> {
        &self.repo
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub async fn get(&self, order_id: Uuid) -> AppResult<Order> {
        self.repo.find_by_id(order_id).await?.ok_or(AppError::NotFound)
    }

    /// Creates all orders of one checkout atomically. Each gets its delivery
    /// code here and nowhere else.
    pub async fn create_orders(&self, drafts: Vec<NewOrder>) -> AppResult<Vec<Order>> {
        let now = Utc::now();
        let orders = drafts
            .into_iter()
            .map(|draft| draft.into_order(now))
            .collect::<AppResult<Vec<_>>>()?;

        self.repo.insert_many(&orders).await?;

        for order in &orders {
            tracing::info!(
                order_id = %order.id,
                cooker_id = %order.cooker_id,
                status = %order.status,
                total = order.total,
                "order created"
            );
            dispatch(self.notifier.as_ref(), OrderEvent::created(order)).await;
        }
        Ok(orders)
    }

    pub async fn request_transition(
        &self,
        order_id: Uuid,
        request: TransitionRequest,
    ) -> AppResult<Order> {
        self.commit(
            order_id,
            request.target,
            Trigger::Request(request.actor),
            request.reason.as_deref(),
        )
        .await
    }

    async fn commit(
        &self,
        order_id: Uuid,
        to: OrderStatus,
        trigger: Trigger,
        reason: Option<&str>,
    ) -> AppResult<Order> {
        let mut current = self.get(order_id).await?;
        let observed = current.status;

        for _ in 0..MAX_WRITE_ATTEMPTS {
            if let Some(next) = self.try_apply(&current, to, trigger, reason).await? {
                return Ok(next);
            }
            current = self.get(order_id).await?;
            if current.status != observed {
                break;
            }
        }

        Err(AppError::InvalidTransition {
            from: current.status,
            to,
        })
    }

    /// Applies `current -> to` if nobody has written the order since
    /// `current` was read. `Ok(None)` means the write lost a race.
    pub(crate) async fn try_apply(
        &self,
        current: &Order,
        to: OrderStatus,
        trigger: Trigger,
        reason: Option<&str>,
    ) -> AppResult<Option<Order>> {
        let next = apply_transition(current, to, trigger, reason, Utc::now())?;
        if !self.repo.update_if_version(&next, current.version).await? {
            tracing::debug!(
                order_id = %current.id,
                from = %current.status,
                to = %to,
                "transition lost a concurrent write"
            );
            return Ok(None);
        }

        tracing::info!(order_id = %next.id, from = %current.status, to = %to, "order transitioned");

        let event = match trigger {
            Trigger::CodeVerified => OrderEvent::Delivered {
                order_id: next.id,
                driver_id: next.driver_id,
            },
            Trigger::Request(actor) => OrderEvent::Transitioned {
                order_id: next.id,
                from: current.status,
                to,
                actor_id: actor.user_id,
                actor_role: actor.role,
            },
        };
        dispatch(self.notifier.as_ref(), event).await;

        Ok(Some(next))
    }
}
