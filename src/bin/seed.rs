use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use rust_decimal::Decimal;
use shopverse_api::{config::AppConfig, db::create_pool};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    let user_id = ensure_user(&pool, "John Doe", "john@example.com", "123456").await?;
    seed_products(&pool).await?;

    println!("Seed completed. User ID: {user_id}");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (id, name, email, password_hash)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email}");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let products = vec![
        (
            "Airpods Wireless Bluetooth Headphones",
            "/images/airpods.jpg",
            "Bluetooth technology lets you connect it with compatible devices wirelessly",
            "Apple",
            "Electronics",
            Decimal::new(8999, 2),
            10,
        ),
        (
            "iPhone 13 Pro 256GB",
            "/images/iphone13.jpg",
            "Introducing the iPhone 13 Pro. A transformative triple-camera system.",
            "Apple",
            "Electronics",
            Decimal::new(99999, 2),
            7,
        ),
        (
            "Cannon EOS 80D DSLR Camera",
            "/images/camera.jpg",
            "Characterized by versatile imaging specs, the Canon EOS 80D",
            "Cannon",
            "Electronics",
            Decimal::new(92999, 2),
            5,
        ),
    ];

    for (name, image, description, brand, category, price, stock) in products {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, image, description, brand, category, price, count_in_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(image)
        .bind(description)
        .bind(brand)
        .bind(category)
        .bind(price)
        .bind(stock)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
