use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{
    CustomerInfo, Order, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, Product,
    SelectedVariant,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    /// Product id; the legacy key `product` is accepted too.
    #[serde(alias = "product")]
    pub product_id: String,
    pub quantity: i32,
    #[serde(default)]
    pub selected_variant: Option<SelectedVariant>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<CartItemRequest>,
    pub customer_info: CustomerInfo,
    /// Amount to charge, tax and shipping included.
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub card_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order_number: String,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub image: String,
    pub category: String,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            category: product.category.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemDetails {
    pub product_id: Uuid,
    /// `None` once the product has left the catalog.
    pub product: Option<ProductSummary>,
    pub quantity: i32,
    #[schema(value_type = f64)]
    pub price: Decimal,
    pub selected_variant: Option<SelectedVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
    pub order_number: String,
    pub items: Vec<OrderItemDetails>,
    pub customer_info: CustomerInfo,
    #[schema(value_type = f64)]
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub payment_details: PaymentDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderDetails {
    /// Joins the order's lines with whatever catalog entries still exist.
    pub fn resolve(order: Order, products: &[Product]) -> Self {
        let items = order
            .items
            .into_iter()
            .map(|item| OrderItemDetails {
                product_id: item.product_id,
                product: products
                    .iter()
                    .find(|p| p.id == item.product_id)
                    .map(ProductSummary::from),
                quantity: item.quantity,
                price: item.price,
                selected_variant: item.selected_variant,
            })
            .collect();

        Self {
            order_number: order.order_number,
            items,
            customer_info: order.customer_info,
            total: order.total,
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method,
            payment_details: order.payment_details,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}
