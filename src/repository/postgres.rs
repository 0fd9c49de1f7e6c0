use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{
        order_dishes::{
            ActiveModel as OrderDishActive, Column as OrderDishCol, Entity as OrderDishes,
            Model as OrderDishModel,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
    },
    error::{AppError, AppResult},
    models::{ActorRole, CookerApproval, Order, OrderDish, OrderStatus},
    response::PageRequest,
};

use super::{OrderFilter, OrderPage, OrderRepository};

/// Orders in PostgreSQL. Line items live in `order_dishes` and never change
/// after checkout, so updates only touch the `orders` row.
#[derive(Clone)]
pub struct SeaOrmOrderRepository {
    conn: DatabaseConnection,
}

impl SeaOrmOrderRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn hydrate(&self, models: Vec<OrderModel>) -> AppResult<Vec<Order>> {
        if models.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = models.iter().map(|m| m.id).collect();
        let mut dishes: HashMap<Uuid, Vec<OrderDish>> = HashMap::new();
        for row in OrderDishes::find()
            .filter(OrderDishCol::OrderId.is_in(ids))
            .order_by_asc(OrderDishCol::Position)
            .all(&self.conn)
            .await?
        {
            dishes
                .entry(row.order_id)
                .or_default()
                .push(order_dish_from_entity(row));
        }

        models
            .into_iter()
            .map(|model| {
                let items = dishes.remove(&model.id).unwrap_or_default();
                order_from_entity(model, items)
            })
            .collect()
    }
}

#[async_trait]
impl OrderRepository for SeaOrmOrderRepository {
    async fn insert_many(&self, orders: &[Order]) -> AppResult<()> {
        if orders.is_empty() {
            return Ok(());
        }

        let txn = self.conn.begin().await?;

        Orders::insert_many(orders.iter().map(order_to_active))
            .exec_without_returning(&txn)
            .await?;

        let dish_rows: Vec<OrderDishActive> = orders
            .iter()
            .flat_map(|order| {
                order
                    .dishes
                    .iter()
                    .enumerate()
                    .map(move |(position, dish)| OrderDishActive {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(order.id),
                        dish_id: Set(dish.dish_id),
                        dish_name: Set(dish.dish_name.clone()),
                        quantity: Set(dish.quantity),
                        unit_price: Set(dish.unit_price),
                        position: Set(position as i32),
                    })
            })
            .collect();
        if !dish_rows.is_empty() {
            OrderDishes::insert_many(dish_rows)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Order>> {
        let model = Orders::find_by_id(id).one(&self.conn).await?;
        match model {
            Some(model) => Ok(self.hydrate(vec![model]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn find_live_by_code(&self, code: &str) -> AppResult<Vec<Order>> {
        let models = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::DeliveryCode.eq(code))
                    .add(OrderCol::Status.eq(OrderStatus::Delivering.as_str()))
                    .add(OrderCol::IsDelivered.eq(false)),
            )
            .all(&self.conn)
            .await?;
        self.hydrate(models).await
    }

    async fn list(&self, filter: &OrderFilter, page: PageRequest) -> AppResult<OrderPage> {
        let mut condition = Condition::all();
        if let Some(customer_id) = filter.customer_id {
            condition = condition.add(OrderCol::CustomerId.eq(customer_id));
        }
        if let Some(cooker_id) = filter.cooker_id {
            condition = condition.add(OrderCol::CookerId.eq(cooker_id));
        }
        if let Some(driver_id) = filter.driver_id {
            condition = condition.add(OrderCol::DriverId.eq(driver_id));
        }
        if let Some(status) = filter.status {
            condition = condition.add(OrderCol::Status.eq(status.as_str()));
        }

        let finder = Orders::find()
            .filter(condition)
            .order_by_desc(OrderCol::CreatedAt);

        let total = finder.clone().count(&self.conn).await? as i64;
        let models = finder
            .limit(page.per_page as u64)
            .offset(page.offset() as u64)
            .all(&self.conn)
            .await?;

        Ok(OrderPage {
            items: self.hydrate(models).await?,
            total,
        })
    }

    async fn update_if_version(&self, order: &Order, expected_version: i64) -> AppResult<bool> {
        let mut active = order_to_active(order);
        active.id = NotSet;
        active.created_at = NotSet;

        let result = Orders::update_many()
            .set(active)
            .filter(OrderCol::Id.eq(order.id))
            .filter(OrderCol::Version.eq(expected_version))
            .exec(&self.conn)
            .await?;

        if result.rows_affected == 1 {
            return Ok(true);
        }
        match Orders::find_by_id(order.id).one(&self.conn).await? {
            Some(_) => Ok(false),
            None => Err(AppError::NotFound),
        }
    }
}

fn order_to_active(order: &Order) -> OrderActive {
    let approval = order.cooker_approval.as_ref();
    OrderActive {
        id: Set(order.id),
        customer_id: Set(order.customer_id),
        cooker_id: Set(order.cooker_id),
        driver_id: Set(order.driver_id),
        status: Set(order.status.as_str().to_string()),
        payment_method: Set(order.payment_method.as_str().to_string()),
        payment_status: Set(order.payment_status.as_str().to_string()),
        subtotal: Set(order.subtotal),
        delivery_fee: Set(order.delivery_fee),
        service_fee: Set(order.service_fee),
        total: Set(order.total),
        delivery_code: Set(order.delivery_code.clone()),
        is_delivered: Set(order.is_delivered),
        delivery_address: Set(order.delivery_address.clone()),
        approval_approved: Set(approval.map(|a| a.approved)),
        approved_at: Set(approval.and_then(|a| a.approved_at).map(Into::into)),
        rejected_at: Set(approval.and_then(|a| a.rejected_at).map(Into::into)),
        rejection_reason: Set(approval.and_then(|a| a.rejection_reason.clone())),
        available_for_pickup: Set(order.available_for_pickup),
        ready_time: Set(order.ready_time.map(Into::into)),
        pickup_time: Set(order.pickup_time.map(Into::into)),
        actual_delivery_time: Set(order.actual_delivery_time.map(Into::into)),
        cancelled_by: Set(order.cancelled_by.map(|role| role.as_str().to_string())),
        cancellation_reason: Set(order.cancellation_reason.clone()),
        failed_code_attempts: Set(order.failed_code_attempts),
        code_locked_until: Set(order.code_locked_until.map(Into::into)),
        version: Set(order.version),
        created_at: Set(order.created_at.into()),
        updated_at: Set(order.updated_at.into()),
    }
}

fn order_from_entity(model: OrderModel, dishes: Vec<OrderDish>) -> AppResult<Order> {
    let cooker_approval = model.approval_approved.map(|approved| CookerApproval {
        approved,
        approved_at: model.approved_at.map(|dt| dt.with_timezone(&Utc)),
        rejected_at: model.rejected_at.map(|dt| dt.with_timezone(&Utc)),
        rejection_reason: model.rejection_reason.clone(),
    });

    Ok(Order {
        id: model.id,
        status: model.status.parse()?,
        customer_id: model.customer_id,
        cooker_id: model.cooker_id,
        driver_id: model.driver_id,
        dishes,
        subtotal: model.subtotal,
        delivery_fee: model.delivery_fee,
        service_fee: model.service_fee,
        total: model.total,
        payment_method: model.payment_method.parse()?,
        payment_status: model.payment_status.parse()?,
        delivery_code: model.delivery_code,
        is_delivered: model.is_delivered,
        cooker_approval,
        delivery_address: model.delivery_address,
        available_for_pickup: model.available_for_pickup,
        ready_time: model.ready_time.map(|dt| dt.with_timezone(&Utc)),
        pickup_time: model.pickup_time.map(|dt| dt.with_timezone(&Utc)),
        actual_delivery_time: model.actual_delivery_time.map(|dt| dt.with_timezone(&Utc)),
        cancelled_by: model
            .cancelled_by
            .as_deref()
            .map(|role| role.parse::<ActorRole>())
            .transpose()?,
        cancellation_reason: model.cancellation_reason,
        failed_code_attempts: model.failed_code_attempts,
        code_locked_until: model.code_locked_until.map(|dt| dt.with_timezone(&Utc)),
        version: model.version,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_dish_from_entity(model: OrderDishModel) -> OrderDish {
    OrderDish {
        dish_id: model.dish_id,
        dish_name: model.dish_name,
        quantity: model.quantity,
        unit_price: model.unit_price,
    }
}
