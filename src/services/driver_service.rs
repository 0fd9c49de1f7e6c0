use axum::http::StatusCode;
use uuid::Uuid;

use crate::{
    dto::orders::{OrderSummaryList, VerificationResponse, VerifyCodeRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_driver},
    models::{Order, OrderStatus, OrderSummary},
    repository::OrderFilter,
    response::ApiResponse,
    routes::params::{OrderListQuery, Pagination},
    services::{
        delivery_code::{VerificationFailure, VerificationOutcome},
        state_machine::TransitionRequest,
    },
    state::AppState,
};

/// Drivers, and cooks delivering their own orders, carry the order once it is
/// claimed.
fn ensure_carrier(user: &AuthUser) -> AppResult<()> {
    match user.role.as_str() {
        "driver" | "cooker" => Ok(()),
        _ => Err(AppError::Unauthorized),
    }
}

fn is_carrying(user: &AuthUser, order: &Order) -> bool {
    order.driver_id == Some(user.user_id)
}

pub async fn list_available(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderSummaryList>> {
    ensure_driver(user)?;
    let page = pagination.normalize();
    let filter = OrderFilter {
        status: Some(OrderStatus::Ready),
        ..Default::default()
    };
    let result = state.orders.repository().list(&filter, page).await?;
    let items = result.items.into_iter().map(OrderSummary::from).collect();
    Ok(ApiResponse::paged(
        "Ok",
        OrderSummaryList { items },
        &page,
        result.total,
    ))
}

pub async fn list_my_deliveries(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderSummaryList>> {
    ensure_driver(user)?;
    let page = query.page();
    let filter = OrderFilter {
        driver_id: Some(user.user_id),
        status: query.status()?,
        ..Default::default()
    };
    let result = state.orders.repository().list(&filter, page).await?;
    let items = result.items.into_iter().map(OrderSummary::from).collect();
    Ok(ApiResponse::paged(
        "Ok",
        OrderSummaryList { items },
        &page,
        result.total,
    ))
}

pub async fn claim(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderSummary>> {
    ensure_driver(user)?;
    let request = TransitionRequest::new(OrderStatus::Delivering, user.actor()?);
    let order = state.orders.request_transition(order_id, request).await?;
    Ok(ApiResponse::success(
        "Order picked up",
        OrderSummary::from(order),
        None,
    ))
}

/// Looks up the live order for a code the customer read out. Only the
/// carrier of that order gets a match.
pub async fn find_by_code(
    state: &AppState,
    user: &AuthUser,
    code: &str,
) -> AppResult<ApiResponse<OrderSummary>> {
    ensure_carrier(user)?;
    let order = state.verifier.find_by_code(code).await?;
    if !is_carrying(user, &order) {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success("Ok", OrderSummary::from(order), None))
}

/// Runs the verification and pairs the outcome with the HTTP status it is
/// reported under. The body is the same for success and failure.
pub async fn verify(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: VerifyCodeRequest,
) -> AppResult<(StatusCode, ApiResponse<VerificationResponse>)> {
    ensure_carrier(user)?;
    let order = state.orders.get(order_id).await?;
    if !is_carrying(user, &order) {
        return Err(AppError::Unauthorized);
    }

    let outcome = state.verifier.verify(order_id, payload.code.trim()).await?;
    let status = outcome_status(&outcome);
    let message = outcome.message.clone();
    let body = VerificationResponse {
        success: outcome.success,
        message: outcome.message,
        failure: outcome.failure,
        order: OrderSummary::from(outcome.order),
    };
    Ok((status, ApiResponse::success(message, body, None)))
}

fn outcome_status(outcome: &VerificationOutcome) -> StatusCode {
    let error = match outcome.failure {
        None => return StatusCode::OK,
        Some(VerificationFailure::IncorrectCode { .. } | VerificationFailure::Locked { .. }) => {
            AppError::IncorrectCode
        }
        Some(VerificationFailure::AlreadyDelivered | VerificationFailure::NotDelivering) => {
            AppError::InvalidTransition {
                from: outcome.order.status,
                to: OrderStatus::Delivered,
            }
        }
    };
    error.status_code()
}
