use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    models::{Order, OrderStatus, OrderSummary, PaymentMethod},
    services::{delivery_code::VerificationFailure, pricing::Quote},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CartLine {
    pub dish_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub items: Vec<CartLine>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub items: Vec<CartLine>,
    pub payment_method: PaymentMethod,
    pub delivery_address: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    /// Whole-cart quote; per-order fees are even shares of it.
    pub quote: Quote,
    pub orders: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderSummaryList {
    pub items: Vec<OrderSummary>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionBody {
    pub status: OrderStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReasonBody {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VerifyCodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerificationResponse {
    pub success: bool,
    pub message: String,
    pub failure: Option<VerificationFailure>,
    pub order: OrderSummary,
}

/// The delivery code is only shown to the order's customer.
#[derive(Debug, Serialize, ToSchema)]
#[serde(untagged)]
pub enum OrderView {
    Full(Order),
    Summary(OrderSummary),
}
