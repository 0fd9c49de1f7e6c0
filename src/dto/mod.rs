pub mod auth;
pub mod dishes;
pub mod orders;
