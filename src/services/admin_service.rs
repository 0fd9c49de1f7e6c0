use uuid::Uuid;

use crate::{
    dto::orders::{OrderList, TransitionBody},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus},
    repository::OrderFilter,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::state_machine::TransitionRequest,
    state::AppState,
};

/// Edges an administrator may drive, acting as `system`.
const ADMIN_TARGETS: [OrderStatus; 2] = [OrderStatus::Accepted, OrderStatus::Cancelled];

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let page = query.page();
    let filter = OrderFilter {
        status: query.status()?,
        ..Default::default()
    };
    let result = state.orders.repository().list(&filter, page).await?;
    Ok(ApiResponse::paged(
        "Ok",
        OrderList {
            items: result.items,
        },
        &page,
        result.total,
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    payload: TransitionBody,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    if !ADMIN_TARGETS.contains(&payload.status) {
        return Err(AppError::Validation(format!(
            "administrators cannot move an order to '{}'",
            payload.status
        )));
    }

    let mut request = TransitionRequest::new(payload.status, user.actor()?);
    if let Some(reason) = payload.reason.filter(|r| !r.trim().is_empty()) {
        request = request.with_reason(reason);
    }
    let order = state.orders.request_transition(order_id, request).await?;

    tracing::info!(
        order_id = %order.id,
        admin_id = %user.user_id,
        status = %order.status,
        "order status set by admin"
    );
    Ok(ApiResponse::success("Order updated", order, None))
}
