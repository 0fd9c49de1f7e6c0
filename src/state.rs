use std::sync::Arc;

use crate::{
    audit::{AuditLogNotifier, Notifier},
    config::AppConfig,
    db::{DbPool, OrmConn},
    repository::{OrderRepository, SeaOrmOrderRepository},
    services::{
        delivery_code::{CodePolicy, DeliveryCodeVerifier},
        pricing::PricingPolicy,
        state_machine::OrderStateMachine,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub pricing: PricingPolicy,
    pub orders: OrderStateMachine,
    pub verifier: DeliveryCodeVerifier,
}

impl AppState {
    /// Wires the Postgres repository and the audit-log notifier.
    pub fn new(pool: DbPool, orm: OrmConn, config: &AppConfig) -> Self {
        let repo: Arc<dyn OrderRepository> = Arc::new(SeaOrmOrderRepository::new(orm.clone()));
        let notifier: Arc<dyn Notifier> = Arc::new(AuditLogNotifier::new(orm.clone()));
        Self::with_components(pool, orm, config.pricing, config.code_policy, repo, notifier)
    }

    pub fn with_components(
        pool: DbPool,
        orm: OrmConn,
        pricing: PricingPolicy,
        code_policy: CodePolicy,
        repo: Arc<dyn OrderRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let orders = OrderStateMachine::new(repo, notifier);
        let verifier = DeliveryCodeVerifier::new(orders.clone(), code_policy);
        Self {
            pool,
            orm,
            pricing,
            orders,
            verifier,
        }
    }
}
