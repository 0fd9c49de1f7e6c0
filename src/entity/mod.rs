pub mod audit_logs;
pub mod dishes;
pub mod order_dishes;
pub mod orders;
pub mod users;

pub use audit_logs::Entity as AuditLogs;
pub use dishes::Entity as Dishes;
pub use order_dishes::Entity as OrderDishes;
pub use orders::Entity as Orders;
pub use users::Entity as Users;
