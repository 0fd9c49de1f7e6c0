use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    error::AppError,
    models::{Actor, ActorRole},
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

impl AuthUser {
    /// Lifecycle actor for this account. Admins act as `system`.
    pub fn actor(&self) -> Result<Actor, AppError> {
        let role = match self.role.as_str() {
            "admin" => ActorRole::System,
            other => other.parse::<ActorRole>().map_err(|_| AppError::Unauthorized)?,
        };
        Ok(Actor::new(self.user_id, role))
    }

    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

pub fn ensure_customer(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, "customer")
}

pub fn ensure_cooker(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, "cooker")
}

pub fn ensure_driver(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, "driver")
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, "admin")
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::BadRequest("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::BadRequest("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::BadRequest("Invalid Authorization scheme".into()))?
            .trim();

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::BadRequest("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::BadRequest("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            role: decoded.claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role: role.into(),
        }
    }

    #[test]
    fn maps_account_roles_to_actor_roles() {
        assert_eq!(user("cooker").actor().unwrap().role, ActorRole::Cooker);
        assert_eq!(user("driver").actor().unwrap().role, ActorRole::Driver);
        assert_eq!(user("customer").actor().unwrap().role, ActorRole::Customer);
        assert_eq!(user("admin").actor().unwrap().role, ActorRole::System);
        assert!(matches!(user("guest").actor(), Err(AppError::Unauthorized)));
    }

    #[test]
    fn ensure_role_rejects_other_roles() {
        assert!(ensure_cooker(&user("cooker")).is_ok());
        assert!(matches!(ensure_driver(&user("customer")), Err(AppError::Unauthorized)));
        assert!(ensure_admin(&user("admin")).is_ok());
        assert!(matches!(ensure_admin(&user("cooker")), Err(AppError::Unauthorized)));
    }
}
