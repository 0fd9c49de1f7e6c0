use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod cook;
pub mod dishes;
pub mod doc;
pub mod driver;
pub mod health;
pub mod orders;
pub mod params;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/dishes", dishes::router())
        .nest("/orders", orders::router())
        .nest("/cook", cook::router())
        .nest("/driver", driver::router())
        .nest("/admin", admin::router())
}
