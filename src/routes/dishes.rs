use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::dishes::{CreateDishRequest, DishList, UpdateDishRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Dish,
    response::ApiResponse,
    routes::params::DishQuery,
    services::dish_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_dishes).post(create_dish))
        .route("/{id}", get(get_dish).patch(update_dish))
}

#[utoipa::path(
    get,
    path = "/api/dishes",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Search in name and description"),
        ("cooker_id" = Option<Uuid>, Query, description = "Only dishes of this cook"),
        ("max_price" = Option<i64>, Query, description = "Upper price bound, minor units"),
        ("sort_by" = Option<String>, Query, description = "created_at | price | name"),
        ("sort_order" = Option<String>, Query, description = "asc | desc"),
    ),
    responses(
        (status = 200, description = "List available dishes", body = ApiResponse<DishList>)
    ),
    tag = "Dishes"
)]
pub async fn list_dishes(
    State(state): State<AppState>,
    Query(query): Query<DishQuery>,
) -> AppResult<Json<ApiResponse<DishList>>> {
    let resp = dish_service::list_dishes(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/dishes/{id}",
    params(("id" = Uuid, Path, description = "Dish id")),
    responses(
        (status = 200, description = "Dish detail", body = ApiResponse<Dish>),
        (status = 404, description = "Dish not found")
    ),
    tag = "Dishes"
)]
pub async fn get_dish(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Dish>>> {
    let resp = dish_service::get_dish(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/dishes",
    request_body = CreateDishRequest,
    responses(
        (status = 201, description = "Dish created", body = ApiResponse<Dish>),
        (status = 403, description = "Only cooks can add dishes")
    ),
    security(("bearer_auth" = [])),
    tag = "Dishes"
)]
pub async fn create_dish(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateDishRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Dish>>)> {
    let resp = dish_service::create_dish(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/dishes/{id}",
    params(("id" = Uuid, Path, description = "Dish id")),
    request_body = UpdateDishRequest,
    responses(
        (status = 200, description = "Dish updated", body = ApiResponse<Dish>),
        (status = 403, description = "Not the dish's cook"),
        (status = 404, description = "Dish not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Dishes"
)]
pub async fn update_dish(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDishRequest>,
) -> AppResult<Json<ApiResponse<Dish>>> {
    let resp = dish_service::update_dish(&state, &user, id, payload).await?;
    Ok(Json(resp))
}
