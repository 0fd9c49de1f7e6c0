use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub customer_id: Uuid,
    pub cooker_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub status: String,
    pub payment_method: String,
    pub payment_status: String,
    pub subtotal: i64,
    pub delivery_fee: i64,
    pub service_fee: i64,
    pub total: i64,
    pub delivery_code: String,
    pub is_delivered: bool,
    pub delivery_address: Option<String>,
    pub approval_approved: Option<bool>,
    pub approved_at: Option<DateTimeWithTimeZone>,
    pub rejected_at: Option<DateTimeWithTimeZone>,
    pub rejection_reason: Option<String>,
    pub available_for_pickup: bool,
    pub ready_time: Option<DateTimeWithTimeZone>,
    pub pickup_time: Option<DateTimeWithTimeZone>,
    pub actual_delivery_time: Option<DateTimeWithTimeZone>,
    pub cancelled_by: Option<String>,
    pub cancellation_reason: Option<String>,
    pub failed_code_attempts: i32,
    pub code_locked_until: Option<DateTimeWithTimeZone>,
    pub version: i64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CustomerId",
        to = "super::users::Column::Id"
    )]
    Customer,
    #[sea_orm(has_many = "super::order_dishes::Entity")]
    OrderDishes,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl Related<super::order_dishes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDishes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
