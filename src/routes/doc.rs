use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        dishes::{CreateDishRequest, DishList, UpdateDishRequest},
        orders::{
            CartLine, CheckoutRequest, CheckoutResponse, OrderList, OrderSummaryList, OrderView,
            QuoteRequest, ReasonBody, TransitionBody, VerificationResponse, VerifyCodeRequest,
        },
    },
    models::{
        ActorRole, CookerApproval, Dish, Order, OrderDish, OrderStatus, OrderSummary,
        PaymentMethod, PaymentStatus, User,
    },
    response::{ApiResponse, Meta},
    routes::{admin, auth, cook, dishes, driver, health, orders},
    services::{delivery_code::VerificationFailure, pricing::Quote},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        dishes::list_dishes,
        dishes::get_dish,
        dishes::create_dish,
        dishes::update_dish,
        orders::quote,
        orders::checkout,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        cook::list_orders,
        cook::approve_order,
        cook::reject_order,
        cook::update_order_status,
        driver::list_available,
        driver::list_my_deliveries,
        driver::claim_order,
        driver::find_by_code,
        driver::verify_code,
        admin::list_all_orders,
        admin::update_order_status
    ),
    components(
        schemas(
            User,
            Dish,
            Order,
            OrderSummary,
            OrderDish,
            OrderStatus,
            PaymentMethod,
            PaymentStatus,
            ActorRole,
            CookerApproval,
            Quote,
            VerificationFailure,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateDishRequest,
            UpdateDishRequest,
            DishList,
            CartLine,
            QuoteRequest,
            CheckoutRequest,
            CheckoutResponse,
            OrderList,
            OrderSummaryList,
            OrderView,
            TransitionBody,
            ReasonBody,
            VerifyCodeRequest,
            VerificationResponse,
            Meta,
            ApiResponse<Order>,
            ApiResponse<OrderSummary>,
            ApiResponse<OrderList>,
            ApiResponse<DishList>,
            ApiResponse<CheckoutResponse>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration and login"),
        (name = "Dishes", description = "Cook catalogue"),
        (name = "Orders", description = "Quotes, checkout and customer orders"),
        (name = "Cook", description = "Cook dashboard: approval and preparation"),
        (name = "Driver", description = "Pickup and delivery-code verification"),
        (name = "Admin", description = "Platform acceptance and cancellation"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_the_delivery_endpoints() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/orders/checkout",
            "/api/cook/orders/{id}/approve",
            "/api/driver/orders/by-code/{code}",
            "/api/driver/orders/{id}/verify",
            "/api/admin/orders/{id}/status",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
