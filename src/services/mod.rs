pub mod admin_service;
pub mod auth_service;
pub mod cook_service;
pub mod delivery_code;
pub mod dish_service;
pub mod driver_service;
pub mod order_service;
pub mod pricing;
pub mod state_machine;
