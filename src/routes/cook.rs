use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderSummaryList, ReasonBody, TransitionBody},
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderSummary,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::cook_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/{id}/approve", post(approve_order))
        .route("/orders/{id}/reject", post(reject_order))
        .route("/orders/{id}/status", post(update_order_status))
}

#[utoipa::path(
    get,
    path = "/api/cook/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
    ),
    responses(
        (status = 200, description = "Orders addressed to the calling cook", body = ApiResponse<OrderSummaryList>),
        (status = 403, description = "Not a cook")
    ),
    security(("bearer_auth" = [])),
    tag = "Cook"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderSummaryList>>> {
    let resp = cook_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cook/orders/{id}/approve",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order accepted", body = ApiResponse<OrderSummary>),
        (status = 409, description = "Order is not awaiting approval")
    ),
    security(("bearer_auth" = [])),
    tag = "Cook"
)]
pub async fn approve_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    let resp = cook_service::approve(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cook/orders/{id}/reject",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = ReasonBody,
    responses(
        (status = 200, description = "Order rejected", body = ApiResponse<OrderSummary>),
        (status = 400, description = "Missing reason"),
        (status = 409, description = "Order is not awaiting approval")
    ),
    security(("bearer_auth" = [])),
    tag = "Cook"
)]
pub async fn reject_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReasonBody>,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    let resp = cook_service::reject(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cook/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = TransitionBody,
    responses(
        (status = 200, description = "Order moved to the requested state", body = ApiResponse<OrderSummary>),
        (status = 403, description = "Not this order's cook"),
        (status = 409, description = "Transition not allowed from the current state")
    ),
    security(("bearer_auth" = [])),
    tag = "Cook"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransitionBody>,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    let resp = cook_service::update_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
