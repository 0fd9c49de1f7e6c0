use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use sea_orm::ActiveValue::NotSet;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    entity::audit_logs::ActiveModel as AuditLogActive,
    models::{ActorRole, Order, OrderStatus},
};

/// Something that happened to an order, for downstream consumers such as
/// email, chat or push delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Created {
        order_id: Uuid,
        customer_id: Uuid,
        cooker_id: Uuid,
        total: i64,
    },
    Transitioned {
        order_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
        actor_id: Uuid,
        actor_role: ActorRole,
    },
    Delivered {
        order_id: Uuid,
        driver_id: Option<Uuid>,
    },
}

impl OrderEvent {
    pub fn created(order: &Order) -> Self {
        OrderEvent::Created {
            order_id: order.id,
            customer_id: order.customer_id,
            cooker_id: order.cooker_id,
            total: order.total,
        }
    }

    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::Created { order_id, .. }
            | OrderEvent::Transitioned { order_id, .. }
            | OrderEvent::Delivered { order_id, .. } => *order_id,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            OrderEvent::Created { .. } => "order_created",
            OrderEvent::Transitioned { .. } => "order_transitioned",
            OrderEvent::Delivered { .. } => "order_delivered",
        }
    }

    fn user_id(&self) -> Option<Uuid> {
        match self {
            OrderEvent::Created { customer_id, .. } => Some(*customer_id),
            OrderEvent::Transitioned { actor_id, .. } => Some(*actor_id).filter(|id| !id.is_nil()),
            OrderEvent::Delivered { driver_id, .. } => *driver_id,
        }
    }

    fn metadata(&self) -> Value {
        match self {
            OrderEvent::Created {
                cooker_id, total, ..
            } => json!({ "cooker_id": cooker_id, "total": total }),
            OrderEvent::Transitioned {
                from,
                to,
                actor_role,
                ..
            } => json!({ "from": from, "to": to, "actor_role": actor_role }),
            OrderEvent::Delivered { driver_id, .. } => json!({ "driver_id": driver_id }),
        }
    }
}

/// Best-effort sink for order events. Errors are logged by the caller and
/// never undo the change that produced the event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &OrderEvent) -> anyhow::Result<()>;
}

/// Logs events and drops them.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &OrderEvent) -> anyhow::Result<()> {
        tracing::debug!(order_id = %event.order_id(), action = event.action(), "order event");
        Ok(())
    }
}

/// Writes every event into `audit_logs`.
#[derive(Clone)]
pub struct AuditLogNotifier {
    conn: DatabaseConnection,
}

impl AuditLogNotifier {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl Notifier for AuditLogNotifier {
    async fn notify(&self, event: &OrderEvent) -> anyhow::Result<()> {
        AuditLogActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(event.user_id()),
            order_id: Set(Some(event.order_id())),
            action: Set(event.action().to_string()),
            metadata: Set(Some(event.metadata())),
            created_at: NotSet,
        }
        .insert(&self.conn)
        .await?;
        Ok(())
    }
}

/// Hands `event` to `notifier`, logging instead of propagating failures.
pub async fn dispatch(notifier: &dyn Notifier, event: OrderEvent) {
    if let Err(err) = notifier.notify(&event).await {
        tracing::warn!(
            error = %err,
            order_id = %event.order_id(),
            action = event.action(),
            "order notification failed"
        );
    }
}

/// Account-level audit entry written straight through sqlx.
pub async fn log_account_event(
    pool: &crate::db::DbPool,
    user_id: Uuid,
    action: &str,
) -> crate::error::AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, metadata)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action)
    .bind(json!({ "user_id": user_id }))
    .execute(pool)
    .await?;

    Ok(())
}
