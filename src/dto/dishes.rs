use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Dish;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateDishRequest {
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateDishRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DishList {
    pub items: Vec<Dish>,
}
