use utoipa::{OpenApi, openapi::OpenApi as OpenApiSpec};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        orders::{
            CartItemRequest, OrderDetails, OrderItemDetails, PlaceOrderRequest, PlacedOrder,
            ProductSummary,
        },
        products::ProductList,
    },
    models::{
        CustomerInfo, Order, OrderItem, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus,
        Product, ProductVariant, SelectedVariant, VariantAxis,
    },
    response::{ApiResponse, ErrorData, Meta},
    routes::{health, orders, params, products},
};

#[derive(OpenApi)]
#[openapi(
    info(title = "Storefront API", description = "Catalog browsing, order placement and order lookup"),
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        orders::place_order,
        orders::lookup_order,
        orders::get_order,
    ),
    components(
        schemas(
            Product,
            ProductVariant,
            VariantAxis,
            SelectedVariant,
            CustomerInfo,
            Order,
            OrderItem,
            OrderStatus,
            PaymentStatus,
            PaymentMethod,
            PaymentDetails,
            CartItemRequest,
            PlaceOrderRequest,
            PlacedOrder,
            ProductSummary,
            OrderItemDetails,
            OrderDetails,
            ProductList,
            params::ProductSortBy,
            params::SortOrder,
            Meta,
            ErrorData,
            health::HealthData,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<PlacedOrder>,
            ApiResponse<OrderDetails>,
            ApiResponse<ErrorData>,
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Orders", description = "Order placement and lookup"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
