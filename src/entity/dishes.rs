use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dishes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cooker_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub is_available: bool,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::CookerId",
        to = "super::users::Column::Id"
    )]
    Cooker,
    #[sea_orm(has_many = "super::order_dishes::Entity")]
    OrderDishes,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cooker.def()
    }
}

impl Related<super::order_dishes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderDishes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
