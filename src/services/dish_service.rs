use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    dto::dishes::{CreateDishRequest, DishList, UpdateDishRequest},
    entity::dishes::{ActiveModel, Column, Entity as Dishes, Model as DishModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_cooker},
    models::Dish,
    response::ApiResponse,
    routes::params::{DishQuery, DishSortBy, SortOrder},
    state::AppState,
};

pub async fn list_dishes(state: &AppState, query: DishQuery) -> AppResult<ApiResponse<DishList>> {
    let page = query.page();
    let mut condition = Condition::all().add(Column::IsAvailable.eq(true));

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }
    if let Some(cooker_id) = query.cooker_id {
        condition = condition.add(Column::CookerId.eq(cooker_id));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_col = match query.sort_by.unwrap_or(DishSortBy::CreatedAt) {
        DishSortBy::CreatedAt => Column::CreatedAt,
        DishSortBy::Price => Column::Price,
        DishSortBy::Name => Column::Name,
    };

    let mut finder = Dishes::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let items = finder
        .limit(page.per_page as u64)
        .offset(page.offset() as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(dish_from_entity)
        .collect();

    Ok(ApiResponse::paged("Dishes", DishList { items }, &page, total))
}

pub async fn get_dish(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Dish>> {
    let dish = Dishes::find_by_id(id)
        .one(&state.orm)
        .await?
        .map(dish_from_entity)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Dish", dish, None))
}

pub async fn create_dish(
    state: &AppState,
    user: &AuthUser,
    payload: CreateDishRequest,
) -> AppResult<ApiResponse<Dish>> {
    ensure_cooker(user)?;
    validate_name(&payload.name)?;
    validate_price(payload.price)?;

    let dish = ActiveModel {
        id: Set(Uuid::new_v4()),
        cooker_id: Set(user.user_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price: Set(payload.price),
        is_available: Set(true),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(dish_id = %dish.id, cooker_id = %user.user_id, "dish created");
    Ok(ApiResponse::success("Dish created", dish_from_entity(dish), None))
}

pub async fn update_dish(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateDishRequest,
) -> AppResult<ApiResponse<Dish>> {
    ensure_cooker(user)?;
    let existing = Dishes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if existing.cooker_id != user.user_id {
        return Err(AppError::Unauthorized);
    }

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        validate_name(&name)?;
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(is_available) = payload.is_available {
        active.is_available = Set(is_available);
    }
    let dish = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Dish updated", dish_from_entity(dish), None))
}

/// Catalogue entries for `ids`, keyed by id. Missing ids are simply absent.
pub async fn load_dishes(conn: &OrmConn, ids: &[Uuid]) -> AppResult<HashMap<Uuid, Dish>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(Dishes::find()
        .filter(Column::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(|model| (model.id, dish_from_entity(model)))
        .collect())
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("dish name must not be empty".into()));
    }
    Ok(())
}

fn validate_price(price: i64) -> AppResult<()> {
    if price < 0 {
        return Err(AppError::Validation("dish price must not be negative".into()));
    }
    Ok(())
}

fn dish_from_entity(model: DishModel) -> Dish {
    Dish {
        id: model.id,
        cooker_id: model.cooker_id,
        name: model.name,
        description: model.description,
        price: model.price,
        is_available: model.is_available,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
