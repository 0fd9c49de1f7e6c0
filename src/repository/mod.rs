use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Order, OrderStatus},
    response::PageRequest,
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryOrderRepository;
pub use postgres::SeaOrmOrderRepository;

/// Conjunctive filter for order listings; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub customer_id: Option<Uuid>,
    pub cooker_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    pub fn matches(&self, order: &Order) -> bool {
        self.customer_id.is_none_or(|id| order.customer_id == id)
            && self.cooker_id.is_none_or(|id| order.cooker_id == id)
            && self.driver_id.is_none_or(|id| order.driver_id == Some(id))
            && self.status.is_none_or(|status| order.status == status)
    }
}

#[derive(Debug, Clone)]
pub struct OrderPage {
    pub items: Vec<Order>,
    pub total: i64,
}

/// Storage for orders. Every mutation goes through [`update_if_version`], a
/// compare-and-swap on `Order::version`.
///
/// [`update_if_version`]: OrderRepository::update_if_version
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Inserts all orders of one checkout, or none of them.
    async fn insert_many(&self, orders: &[Order]) -> AppResult<()>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>>;

    /// Orders carrying `code` that are out for delivery and not yet delivered.
    async fn find_live_by_code(&self, code: &str) -> AppResult<Vec<Order>>;

    /// Newest first.
    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> AppResult<OrderPage>;

    /// Persists `order` only if the stored version still equals
    /// `expected_version`. The stored version becomes `order.version`.
    /// Returns `false` when another writer got there first.
    async fn update_if_version(&self, order: &Order, expected_version: i64) -> AppResult<bool>;
}
