use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Order, Product},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    store::{CatalogStore, OrderStore, Reservation},
};

/// Process-local catalog and order book.
///
/// Reservation checks and decrements every line under one lock, so two
/// carts racing for the same product can never both succeed past its stock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    products: Arc<Mutex<HashMap<Uuid, Product>>>,
    orders: Arc<Mutex<HashMap<String, Order>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.products.lock() {
            map.extend(products.into_iter().map(|p| (p.id, p)));
        }
        store
    }

    pub fn insert_product(&self, product: Product) -> AppResult<()> {
        self.products()?.insert(product.id, product);
        Ok(())
    }

    pub fn remove_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.products()?.remove(&id))
    }

    /// Current stock for a product, if it exists.
    pub fn inventory(&self, id: Uuid) -> AppResult<Option<i32>> {
        Ok(self.products()?.get(&id).map(|p| p.inventory))
    }

    pub fn order_count(&self) -> AppResult<usize> {
        Ok(self.orders()?.len())
    }

    fn products(&self) -> AppResult<MutexGuard<'_, HashMap<Uuid, Product>>> {
        self.products
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("catalog lock poisoned")))
    }

    fn orders(&self) -> AppResult<MutexGuard<'_, HashMap<String, Order>>> {
        self.orders
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("order book lock poisoned")))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self, query: &ProductQuery) -> AppResult<(Vec<Product>, i64)> {
        let (_, limit, offset) = query.pagination().normalize();
        let needle = query.search().map(str::to_lowercase);

        let mut matches: Vec<Product> = self
            .products()?
            .values()
            .filter(|p| query.category().is_none_or(|c| p.category == c))
            .filter(|p| {
                needle.as_deref().is_none_or(|n| {
                    p.name.to_lowercase().contains(n) || p.description.to_lowercase().contains(n)
                })
            })
            .filter(|p| query.min_price.is_none_or(|min| p.price >= min))
            .filter(|p| query.max_price.is_none_or(|max| p.price <= max))
            .filter(|p| query.is_new.is_none_or(|flag| p.is_new == flag))
            .cloned()
            .collect();

        let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
        matches.sort_by(|a, b| {
            let ord = match sort_by {
                ProductSortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                ProductSortBy::Price => a.price.cmp(&b.price),
                ProductSortBy::Name => a.name.cmp(&b.name),
                ProductSortBy::Rating => a.rating.partial_cmp(&b.rating).unwrap_or(Ordering::Equal),
            };
            match query.sort_order.unwrap_or(SortOrder::Desc) {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Ok(self.products()?.get(&id).cloned())
    }

    async fn get_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        let products = self.products()?;
        Ok(ids.iter().filter_map(|id| products.get(id).cloned()).collect())
    }

    async fn reserve(&self, reservations: &[Reservation]) -> AppResult<()> {
        let mut products = self.products()?;

        for line in reservations {
            let available = products.get(&line.product_id).map(|p| p.inventory);
            match available {
                Some(stock) if stock >= line.quantity => {}
                Some(_) => {
                    return Err(AppError::InsufficientInventory {
                        product: line.product_name.clone(),
                    });
                }
                None => return Err(AppError::ProductNotFound(line.product_id.to_string())),
            }
        }

        let now = Utc::now();
        for line in reservations {
            if let Some(product) = products.get_mut(&line.product_id) {
                product.inventory -= line.quantity;
                product.updated_at = now;
            }
        }
        Ok(())
    }

    async fn release(&self, reservations: &[Reservation]) -> AppResult<()> {
        let mut products = self.products()?;
        let now = Utc::now();
        for line in reservations {
            if let Some(product) = products.get_mut(&line.product_id) {
                product.inventory += line.quantity;
                product.updated_at = now;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn insert_order(&self, order: &Order) -> AppResult<()> {
        let mut orders = self.orders()?;
        if orders.contains_key(&order.order_number) {
            return Err(AppError::DuplicateOrderNumber);
        }
        orders.insert(order.order_number.clone(), order.clone());
        Ok(())
    }

    async fn find_order(&self, order_number: &str) -> AppResult<Option<Order>> {
        Ok(self.orders()?.get(order_number).cloned())
    }
}
