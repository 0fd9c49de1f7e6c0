use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Order, OrderStatus},
    response::PageRequest,
};

use super::{OrderFilter, OrderPage, OrderRepository};

/// Process-local order store. The write lock makes each compare-and-swap
/// atomic with respect to every other call.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<Uuid, Order>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn insert_many(&self, orders: &[Order]) -> AppResult<()> {
        let mut guard = self.orders.write().await;
        if let Some(dup) = orders.iter().find(|o| guard.contains_key(&o.id)) {
            return Err(AppError::Validation(format!("order {} already exists", dup.id)));
        }
        for order in orders {
            guard.insert(order.id, order.clone());
        }
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn find_live_by_code(&self, code: &str) -> AppResult<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .filter(|o| {
                o.delivery_code == code && o.status == OrderStatus::Delivering && !o.is_delivered
            })
            .cloned()
            .collect())
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> AppResult<OrderPage> {
        let guard = self.orders.read().await;
        let mut matching: Vec<&Order> = guard.values().filter(|o| filter.matches(o)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.per_page as usize)
            .cloned()
            .collect();
        Ok(OrderPage { items, total })
    }

    async fn update_if_version(&self, order: &Order, expected_version: i64) -> AppResult<bool> {
        let mut guard = self.orders.write().await;
        match guard.get_mut(&order.id) {
            None => Err(AppError::NotFound),
            Some(stored) if stored.version != expected_version => Ok(false),
            Some(stored) => {
                *stored = order.clone();
                Ok(true)
            }
        }
    }
}
