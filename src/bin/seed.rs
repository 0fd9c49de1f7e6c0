use homecook_orders::{
    config::AppConfig,
    db::{create_orm_conn, create_pool, run_migrations},
    models::{OrderDish, PaymentMethod},
    services::{auth_service::hash_password, state_machine::NewOrder},
    state::AppState,
};
use uuid::Uuid;

/// Demo accounts, all with the password `password123`.
const USERS: [(&str, &str); 4] = [
    ("customer@example.com", "customer"),
    ("cook@example.com", "cooker"),
    ("driver@example.com", "driver"),
    ("admin@example.com", "admin"),
];

const DISHES: [(&str, &str, i64); 4] = [
    ("Jollof rice", "Smoky party jollof with fried plantain", 4_500),
    ("Egusi soup", "With pounded yam", 6_000),
    ("Suya platter", "Spiced beef skewers, onions and tomatoes", 5_500),
    ("Puff-puff", "Dozen sweet dough balls", 1_500),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;

    let mut ids = Vec::with_capacity(USERS.len());
    for (email, role) in USERS {
        ids.push(ensure_user(&pool, email, "password123", role).await?);
    }
    let (customer_id, cook_id) = (ids[0], ids[1]);

    let dishes = seed_dishes(&pool, cook_id).await?;

    // `--legacy-order` places one order that skips cook approval.
    if std::env::args().any(|arg| arg == "--legacy-order") {
        let state = AppState::new(pool.clone(), orm, &config);
        let (dish_id, name, price) = dishes
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no dishes seeded"))?;
        let line = OrderDish {
            dish_id,
            dish_name: name,
            quantity: 2,
            unit_price: price,
        };
        let subtotal = line
            .line_total()
            .ok_or_else(|| anyhow::anyhow!("seed line total overflows"))?;
        let orders = state
            .orders
            .create_orders(vec![NewOrder {
                customer_id,
                cooker_id: cook_id,
                dishes: vec![line],
                subtotal,
                delivery_fee: config.pricing.base_rate,
                service_fee: 0,
                payment_method: PaymentMethod::CashOnDelivery,
                delivery_address: Some("12 Admiralty Way, Lekki".into()),
                legacy: true,
            }])
            .await?;
        for order in orders {
            println!("Legacy order {} ({}), code {}", order.id, order.status, order.delivery_code);
        }
    }

    println!("Seed completed. Customer ID: {customer_id}, Cook ID: {cook_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    email: &str,
    password: &str,
    role: &str,
) -> anyhow::Result<Uuid> {
    let password_hash = hash_password(password)?;

    let row: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO users (id, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE SET role = EXCLUDED.role
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(pool)
    .await?;

    println!("Ensured user {email} (role={role})");
    Ok(row.0)
}

async fn seed_dishes(
    pool: &sqlx::PgPool,
    cook_id: Uuid,
) -> anyhow::Result<Vec<(Uuid, String, i64)>> {
    for (name, description, price) in DISHES {
        sqlx::query(
            r#"
            INSERT INTO dishes (id, cooker_id, name, description, price)
            SELECT $1, $2, $3, $4, $5
            WHERE NOT EXISTS (SELECT 1 FROM dishes WHERE cooker_id = $2 AND name = $3)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(cook_id)
        .bind(name)
        .bind(description)
        .bind(price)
        .execute(pool)
        .await?;
    }

    let dishes: Vec<(Uuid, String, i64)> =
        sqlx::query_as("SELECT id, name, price FROM dishes WHERE cooker_id = $1 ORDER BY name")
            .bind(cook_id)
            .fetch_all(pool)
            .await?;

    println!("Seeded {} dishes", dishes.len());
    Ok(dishes)
}
