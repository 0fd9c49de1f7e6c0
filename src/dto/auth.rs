use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Roles that may self-register; admins are provisioned out of band.
pub const REGISTERABLE_ROLES: [&str; 3] = ["customer", "cooker", "driver"];

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    /// `customer` (default), `cooker` or `driver`.
    pub role: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}
