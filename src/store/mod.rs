//! Persistence seams used by the order workflow.
//!
//! Both stores are passed around as trait objects so the workflow never
//! touches a connection directly. [`orm::OrmStore`] backs them with Postgres,
//! [`memory::MemoryStore`] keeps everything in process.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{Order, Product},
    routes::params::ProductQuery,
};

pub mod memory;
pub mod orm;

/// Stock claimed for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
}

#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    async fn list_products(&self, query: &ProductQuery) -> AppResult<(Vec<Product>, i64)>;

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>>;

    async fn get_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>>;

    /// Decrements inventory for every reservation, or for none of them.
    ///
    /// Fails with `InsufficientInventory` naming the first product whose
    /// stock is below the requested quantity, or `ProductNotFound` when a
    /// product has left the catalog since it was resolved.
    async fn reserve(&self, reservations: &[Reservation]) -> AppResult<()>;

    /// Gives reserved stock back.
    async fn release(&self, reservations: &[Reservation]) -> AppResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Fails with `DuplicateOrderNumber` when the number is already taken.
    async fn insert_order(&self, order: &Order) -> AppResult<()>;

    async fn find_order(&self, order_number: &str) -> AppResult<Option<Order>>;
}
