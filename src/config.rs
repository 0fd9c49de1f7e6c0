use std::env;
use std::str::FromStr;

use chrono::Duration;

use crate::services::{delivery_code::CodePolicy, pricing::PricingPolicy};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub pricing: PricingPolicy,
    pub code_policy: CodePolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env_or("APP_PORT", 3000);

        let defaults = PricingPolicy::default();
        let pricing = PricingPolicy::new(
            env_or("DELIVERY_BASE_RATE", defaults.base_rate),
            env_or("FREE_DELIVERY_THRESHOLD", defaults.free_delivery_threshold),
            env_or("SERVICE_FEE_BPS", defaults.service_fee_bps),
        );

        let code_defaults = CodePolicy::default();
        let code_policy = CodePolicy {
            max_attempts: env_or("CODE_MAX_ATTEMPTS", code_defaults.max_attempts).max(1),
            lockout: Duration::minutes(env_or(
                "CODE_LOCKOUT_MINUTES",
                code_defaults.lockout.num_minutes(),
            )),
        };

        Ok(Self {
            port,
            database_url,
            host,
            pricing,
            code_policy,
        })
    }
}

/// Parsed env value, or `default` when unset or unparsable.
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}
