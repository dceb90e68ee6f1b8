use async_trait::async_trait;
use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{
        CustomerInfo, Order, OrderItem, PaymentDetails, Product, ProductVariant, SelectedVariant,
    },
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    store::{CatalogStore, OrderStore, Reservation},
};

/// Postgres-backed catalog and order book.
#[derive(Clone)]
pub struct OrmStore {
    orm: DatabaseConnection,
}

impl OrmStore {
    pub fn new(orm: DatabaseConnection) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl CatalogStore for OrmStore {
    async fn list_products(&self, query: &ProductQuery) -> AppResult<(Vec<Product>, i64)> {
        let (_, limit, offset) = query.pagination().normalize();
        let mut condition = Condition::all();

        if let Some(category) = query.category() {
            condition = condition.add(ProdCol::Category.eq(category));
        }

        if let Some(search) = query.search() {
            let pattern = format!("%{}%", search);
            condition = condition.add(
                Condition::any()
                    .add(Expr::col(ProdCol::Name).ilike(pattern.clone()))
                    .add(Expr::col(ProdCol::Description).ilike(pattern)),
            );
        }

        if let Some(min_price) = query.min_price {
            condition = condition.add(ProdCol::Price.gte(min_price));
        }

        if let Some(max_price) = query.max_price {
            condition = condition.add(ProdCol::Price.lte(max_price));
        }

        if let Some(is_new) = query.is_new {
            condition = condition.add(ProdCol::IsNew.eq(is_new));
        }

        let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
            ProductSortBy::CreatedAt => ProdCol::CreatedAt,
            ProductSortBy::Price => ProdCol::Price,
            ProductSortBy::Name => ProdCol::Name,
            ProductSortBy::Rating => ProdCol::Rating,
        };

        let mut finder = Products::find().filter(condition);
        finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
            SortOrder::Asc => finder.order_by_asc(sort_col),
            SortOrder::Desc => finder.order_by_desc(sort_col),
        };

        let total = finder.clone().count(&self.orm).await? as i64;

        let items = finder
            .limit(limit as u64)
            .offset(offset as u64)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect::<AppResult<Vec<_>>>()?;

        Ok((items, total))
    }

    async fn get_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(product_from_entity)
            .transpose()
    }

    async fn get_products(&self, ids: &[Uuid]) -> AppResult<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Products::find()
            .filter(ProdCol::Id.is_in(ids.iter().copied()))
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect()
    }

    async fn reserve(&self, reservations: &[Reservation]) -> AppResult<()> {
        let txn = self.orm.begin().await?;

        for line in reservations {
            // check and decrement in one statement
            let result = Products::update_many()
                .col_expr(
                    ProdCol::Inventory,
                    Expr::col(ProdCol::Inventory).sub(line.quantity),
                )
                .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
                .filter(ProdCol::Id.eq(line.product_id))
                .filter(ProdCol::Inventory.gte(line.quantity))
                .exec(&txn)
                .await?;

            if result.rows_affected == 0 {
                // no row matched: either short on stock or gone from the catalog
                let exists = Products::find_by_id(line.product_id)
                    .one(&txn)
                    .await?
                    .is_some();
                txn.rollback().await?;
                return Err(if exists {
                    AppError::InsufficientInventory {
                        product: line.product_name.clone(),
                    }
                } else {
                    AppError::ProductNotFound(line.product_id.to_string())
                });
            }
        }

        txn.commit().await?;
        Ok(())
    }

    async fn release(&self, reservations: &[Reservation]) -> AppResult<()> {
        let txn = self.orm.begin().await?;

        for line in reservations {
            Products::update_many()
                .col_expr(
                    ProdCol::Inventory,
                    Expr::col(ProdCol::Inventory).add(line.quantity),
                )
                .col_expr(ProdCol::UpdatedAt, Expr::current_timestamp().into())
                .filter(ProdCol::Id.eq(line.product_id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl OrderStore for OrmStore {
    async fn insert_order(&self, order: &Order) -> AppResult<()> {
        let txn = self.orm.begin().await?;

        let inserted = OrderActive {
            id: Set(order.id),
            order_number: Set(order.order_number.clone()),
            customer_full_name: Set(order.customer_info.full_name.clone()),
            customer_email: Set(order.customer_info.email.clone()),
            customer_phone: Set(order.customer_info.phone.clone()),
            customer_address: Set(order.customer_info.address.clone()),
            customer_city: Set(order.customer_info.city.clone()),
            customer_state: Set(order.customer_info.state.clone()),
            customer_zip_code: Set(order.customer_info.zip_code.clone()),
            customer_country: Set(order.customer_info.country.clone()),
            total: Set(order.total),
            status: Set(order.status.as_str().into()),
            payment_status: Set(order.payment_status.as_str().into()),
            payment_method: Set(order.payment_method.as_str().into()),
            card_last4: Set(order.payment_details.last4.clone()),
            transaction_id: Set(order.payment_details.transaction_id.clone()),
            created_at: Set(order.created_at.into()),
            updated_at: Set(order.updated_at.into()),
        }
        .insert(&txn)
        .await;

        if let Err(err) = inserted {
            txn.rollback().await?;
            return Err(map_insert_error(err));
        }

        for (position, item) in order.items.iter().enumerate() {
            let variant = item.selected_variant.clone().unwrap_or_default();
            OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                position: Set(position as i32),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.price),
                variant_color: Set(variant.color),
                variant_size: Set(variant.size),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    async fn find_order(&self, order_number: &str) -> AppResult<Option<Order>> {
        let order = Orders::find()
            .filter(OrderCol::OrderNumber.eq(order_number))
            .one(&self.orm)
            .await?;
        let order = match order {
            Some(o) => o,
            None => return Ok(None),
        };

        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .order_by_asc(OrderItemCol::Position)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(order_item_from_entity)
            .collect();

        order_from_entity(order, items).map(Some)
    }
}

fn map_insert_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::DuplicateOrderNumber,
        _ => AppError::OrmError(err),
    }
}

fn product_from_entity(model: ProductModel) -> AppResult<Product> {
    let variants: Vec<ProductVariant> = serde_json::from_value(model.variants)
        .map_err(|e| anyhow::anyhow!("product {} has malformed variants: {e}", model.id))?;
    Ok(Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        image: model.image,
        category: model.category,
        inventory: model.inventory,
        variants,
        discount: model.discount,
        is_new: model.is_new,
        rating: model.rating,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    let variant = SelectedVariant {
        color: model.variant_color,
        size: model.variant_size,
    };
    OrderItem {
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        selected_variant: (!variant.is_empty()).then_some(variant),
    }
}

fn order_from_entity(model: OrderModel, items: Vec<OrderItem>) -> AppResult<Order> {
    Ok(Order {
        id: model.id,
        order_number: model.order_number,
        items,
        customer_info: CustomerInfo {
            full_name: model.customer_full_name,
            email: model.customer_email,
            phone: model.customer_phone,
            address: model.customer_address,
            city: model.customer_city,
            state: model.customer_state,
            zip_code: model.customer_zip_code,
            country: model.customer_country,
        },
        total: model.total,
        status: model.status.parse()?,
        payment_status: model.payment_status.parse()?,
        payment_method: model.payment_method.parse()?,
        payment_details: PaymentDetails {
            last4: model.card_last4,
            transaction_id: model.transaction_id,
        },
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    })
}
