use uuid::Uuid;

use crate::{
    dto::orders::{OrderSummaryList, ReasonBody, TransitionBody},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_cooker},
    models::{OrderStatus, OrderSummary},
    repository::OrderFilter,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::state_machine::TransitionRequest,
    state::AppState,
};

/// Targets a cook may ask for from the dashboard's generic status endpoint.
const COOK_TARGETS: [OrderStatus; 5] = [
    OrderStatus::Accepted,
    OrderStatus::Preparing,
    OrderStatus::Ready,
    OrderStatus::Delivering,
    OrderStatus::Cancelled,
];

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderSummaryList>> {
    ensure_cooker(user)?;
    let page = query.page();
    let filter = OrderFilter {
        cooker_id: Some(user.user_id),
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

pub async fn approve(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderSummary>> {
    transition(state, user, order_id, OrderStatus::Accepted, None, "Order approved").await
}

pub async fn reject(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: ReasonBody,
) -> AppResult<ApiResponse<OrderSummary>> {
    let reason = payload
        .reason
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| AppError::Validation("a rejection reason is required".into()))?;
    transition(
        state,
        user,
        order_id,
        OrderStatus::Rejected,
        Some(reason),
        "Order rejected",
    )
    .await
}

pub async fn update_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: TransitionBody,
) -> AppResult<ApiResponse<OrderSummary>> {
    if !COOK_TARGETS.contains(&payload.status) {
        return Err(AppError::Validation(format!(
            "cooks cannot move an order to '{}'",
            payload.status
        )));
    }
    let reason = payload.reason.filter(|r| !r.trim().is_empty());
    transition(state, user, order_id, payload.status, reason, "Order updated").await
}

async fn transition(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    target: OrderStatus,
    reason: Option<String>,
    message: &str,
) -> AppResult<ApiResponse<OrderSummary>> {
    ensure_cooker(user)?;
    let mut request = TransitionRequest::new(target, user.actor()?);
    if let Some(reason) = reason {
        request = request.with_reason(reason);
    }
    let order = state.orders.request_transition(order_id, request).await?;
    Ok(ApiResponse::success(message, OrderSummary::from(order), None))
}
