use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{OrderSummaryList, VerificationResponse, VerifyCodeRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderSummary,
    response::ApiResponse,
    routes::params::{OrderListQuery, Pagination},
    services::driver_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_my_deliveries))
        .route("/orders/available", get(list_available))
        .route("/orders/by-code/{code}", get(find_by_code))
        .route("/orders/{id}/claim", post(claim_order))
        .route("/orders/{id}/verify", post(verify_code))
}

#[utoipa::path(
    get,
    path = "/api/driver/orders/available",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Orders ready for pickup", body = ApiResponse<OrderSummaryList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn list_available(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderSummaryList>>> {
    let resp = driver_service::list_available(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/driver/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by order status"),
    ),
    responses(
        (status = 200, description = "Orders the driver has claimed", body = ApiResponse<OrderSummaryList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn list_my_deliveries(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderSummaryList>>> {
    let resp = driver_service::list_my_deliveries(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/driver/orders/{id}/claim",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order picked up", body = ApiResponse<OrderSummary>),
        (status = 409, description = "Order is not ready or was claimed by someone else")
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn claim_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    let resp = driver_service::claim(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/driver/orders/by-code/{code}",
    params(("code" = String, Path, description = "4-digit delivery code")),
    responses(
        (status = 200, description = "The live order carrying this code", body = ApiResponse<OrderSummary>),
        (status = 400, description = "Malformed code"),
        (status = 404, description = "No live order with this code"),
        (status = 409, description = "Several live orders share this code")
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn find_by_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<OrderSummary>>> {
    let resp = driver_service::find_by_code(&state, &user, &code).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/driver/orders/{id}/verify",
    params(("id" = Uuid, Path, description = "Order id")),
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Code matched, order delivered", body = ApiResponse<VerificationResponse>),
        (status = 409, description = "Order already delivered or not out for delivery", body = ApiResponse<VerificationResponse>),
        (status = 422, description = "Incorrect code or verification locked", body = ApiResponse<VerificationResponse>)
    ),
    security(("bearer_auth" = [])),
    tag = "Driver"
)]
pub async fn verify_code(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyCodeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<VerificationResponse>>)> {
    let (status, resp) = driver_service::verify(&state, &user, id, payload).await?;
    Ok((status, Json(resp)))
}
