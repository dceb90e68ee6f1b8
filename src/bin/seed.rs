use rust_decimal::Decimal;
use serde_json::json;
use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
};
use uuid::Uuid;

struct SeedProduct {
    name: &'static str,
    description: &'static str,
    price: Decimal,
    image: &'static str,
    category: &'static str,
    inventory: i32,
    variants: serde_json::Value,
    discount: i32,
    is_new: bool,
    rating: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 1).await?;
    // Ensure migrations are applied.
    run_migrations(&pool).await?;

    seed_products(&pool).await?;

    println!("Seed completed");
    Ok(())
}

fn catalog() -> Vec<SeedProduct> {
    vec![
        SeedProduct {
            name: "Classic White T-Shirt",
            description: "A comfortable and versatile white t-shirt made from 100% cotton.",
            price: Decimal::new(2999, 2),
            image: "https://images.unsplash.com/photo-1521572163474-6864f9cf17ab",
            category: "men",
            inventory: 100,
            variants: json!([
                { "name": "size", "options": ["S", "M", "L", "XL"] },
                { "name": "color", "options": ["White", "Black", "Navy"] },
            ]),
            discount: 0,
            is_new: true,
            rating: 4.5,
        },
        SeedProduct {
            name: "Summer Dress",
            description: "A beautiful floral summer dress perfect for warm days.",
            price: Decimal::new(4999, 2),
            image: "https://images.unsplash.com/photo-1572804013309-59a88b7e92f1",
            category: "women",
            inventory: 50,
            variants: json!([
                { "name": "size", "options": ["XS", "S", "M", "L"] },
                { "name": "color", "options": ["Blue", "Pink", "Yellow"] },
            ]),
            discount: 20,
            is_new: false,
            rating: 4.8,
        },
        SeedProduct {
            name: "Kids Denim Jacket",
            description: "A stylish and durable denim jacket for kids.",
            price: Decimal::new(3999, 2),
            image: "https://images.unsplash.com/photo-1591047139829-d91aecb6caea",
            category: "kids",
            inventory: 75,
            variants: json!([
                { "name": "size", "options": ["3-4Y", "5-6Y", "7-8Y", "9-10Y"] },
                { "name": "color", "options": ["Blue", "Black"] },
            ]),
            discount: 0,
            is_new: true,
            rating: 4.2,
        },
        SeedProduct {
            name: "Home Decor Pillow",
            description: "A decorative pillow to enhance your home decor.",
            price: Decimal::new(2499, 2),
            image: "https://images.unsplash.com/photo-1584100936595-c0655b3a6e5f",
            category: "home",
            inventory: 200,
            variants: json!([
                { "name": "color", "options": ["Gray", "Beige", "Navy"] },
            ]),
            discount: 15,
            is_new: false,
            rating: 4.6,
        },
    ]
}

async fn seed_products(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for product in catalog() {
        sqlx::query(
            r#"
            INSERT INTO products
                (id, name, description, price, image, category, inventory, variants, discount, is_new, rating)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (name) DO UPDATE SET inventory = EXCLUDED.inventory, updated_at = NOW()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(product.name)
        .bind(product.description)
        .bind(product.price)
        .bind(product.image)
        .bind(product.category)
        .bind(product.inventory)
        .bind(product.variants)
        .bind(product.discount)
        .bind(product.is_new)
        .bind(product.rating)
        .execute(pool)
        .await?;

        println!("Seeded {} ({} in stock)", product.name, product.inventory);
    }

    Ok(())
}
