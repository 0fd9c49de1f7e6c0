use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Dish {
    pub id: Uuid,
    pub cooker_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state of an order. Stored as its snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingApproval,
    Pending,
    Accepted,
    Preparing,
    Ready,
    Delivering,
    Delivered,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::PendingApproval,
        OrderStatus::Pending,
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Delivering,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
        OrderStatus::Rejected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingApproval => "pending_approval",
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| AppError::Validation(format!("unknown order status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    CashOnDelivery,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::CashOnDelivery => "cash_on_delivery",
        }
    }

    /// Payment status an order starts with for this method.
    pub fn initial_status(&self) -> PaymentStatus {
        match self {
            PaymentMethod::Card => PaymentStatus::Pending,
            PaymentMethod::CashOnDelivery => PaymentStatus::CashPending,
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "cash_on_delivery" => Ok(PaymentMethod::CashOnDelivery),
            other => Err(AppError::Validation(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    CashPending,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::CashPending => "cash_pending",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "cash_pending" => Ok(PaymentStatus::CashPending),
            other => Err(AppError::Validation(format!(
                "unknown payment status '{other}'"
            ))),
        }
    }
}

/// Role under which a caller asks for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Cooker,
    Driver,
    Customer,
    System,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Cooker => "cooker",
            ActorRole::Driver => "driver",
            ActorRole::Customer => "customer",
            ActorRole::System => "system",
        }
    }
}

impl FromStr for ActorRole {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cooker" => Ok(ActorRole::Cooker),
            "driver" => Ok(ActorRole::Driver),
            "customer" => Ok(ActorRole::Customer),
            "system" => Ok(ActorRole::System),
            other => Err(AppError::Validation(format!("unknown actor role '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(user_id: Uuid, role: ActorRole) -> Self {
        Self { user_id, role }
    }

    pub fn cooker(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Cooker)
    }

    pub fn driver(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Driver)
    }

    pub fn customer(user_id: Uuid) -> Self {
        Self::new(user_id, ActorRole::Customer)
    }

    pub fn system() -> Self {
        Self::new(Uuid::nil(), ActorRole::System)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct OrderDish {
    pub dish_id: Uuid,
    pub dish_name: String,
    pub quantity: i32,
    pub unit_price: i64,
}

impl OrderDish {
    /// `None` when the amount does not fit in an `i64`.
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CookerApproval {
    pub approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub status: OrderStatus,
    pub customer_id: Uuid,
    pub cooker_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub dishes: Vec<OrderDish>,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub service_fee: i64,
    pub total: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Handed to the customer only; drivers must ask for it at the door.
    pub delivery_code: String,
    pub is_delivered: bool,
    pub cooker_approval: Option<CookerApproval>,
    pub delivery_address: Option<String>,
    pub available_for_pickup: bool,
    pub ready_time: Option<DateTime<Utc>>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub cancelled_by: Option<ActorRole>,
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing, default)]
    pub failed_code_attempts: i32,
    #[serde(skip_serializing, default)]
    pub code_locked_until: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order as seen by drivers and cooks: everything but the delivery code.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderSummary {
    pub id: Uuid,
    pub status: OrderStatus,
    pub customer_id: Uuid,
    pub cooker_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub dishes: Vec<OrderDish>,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub service_fee: i64,
    pub total: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub is_delivered: bool,
    pub cooker_approval: Option<CookerApproval>,
    pub delivery_address: Option<String>,
    pub available_for_pickup: bool,
    pub ready_time: Option<DateTime<Utc>>,
    pub pickup_time: Option<DateTime<Utc>>,
    pub actual_delivery_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Order> for OrderSummary {
    fn from(order: Order) -> Self {
        Self {
            id: order.id,
            status: order.status,
            customer_id: order.customer_id,
            cooker_id: order.cooker_id,
            driver_id: order.driver_id,
            dishes: order.dishes,
            subtotal: order.subtotal,
            delivery_fee: order.delivery_fee,
            service_fee: order.service_fee,
            total: order.total,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            is_delivered: order.is_delivered,
            cooker_approval: order.cooker_approval,
            delivery_address: order.delivery_address,
            available_for_pickup: order.available_for_pickup,
            ready_time: order.ready_time,
            pickup_time: order.pickup_time,
            actual_delivery_time: order.actual_delivery_time,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_names_round_trip_through_from_str() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_delivered_cancelled_rejected_are_terminal() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(OrderStatus::is_terminal)
            .collect();
        assert_eq!(
            terminal,
            vec![
                OrderStatus::Delivered,
                OrderStatus::Cancelled,
                OrderStatus::Rejected
            ]
        );
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&OrderStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"pending_approval\"");
    }

    #[test]
    fn cash_orders_start_cash_pending() {
        assert_eq!(
            PaymentMethod::CashOnDelivery.initial_status(),
            PaymentStatus::CashPending
        );
        assert_eq!(PaymentMethod::Card.initial_status(), PaymentStatus::Pending);
    }
}
