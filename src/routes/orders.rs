use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    routing::{get, post},
};

use crate::{
    dto::orders::{OrderDetails, PlaceOrderRequest, PlacedOrder},
    error::{AppError, AppResult},
    response::{ApiResponse, ErrorData},
    routes::params::OrderLookupQuery,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(place_order).get(lookup_order))
        .route("/{order_number}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = ApiResponse<PlacedOrder>),
        (status = 400, description = "Invalid request, insufficient inventory or payment failure", body = ApiResponse<ErrorData>),
        (status = 404, description = "Product not found", body = ApiResponse<ErrorData>),
        (status = 500, description = "Unexpected failure", body = ApiResponse<ErrorData>),
    ),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    payload: Result<Json<PlaceOrderRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<PlacedOrder>>> {
    let Json(payload) = payload.map_err(|rejection| AppError::Validation(rejection.body_text()))?;
    let response = order_service::place_order(&state, payload).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderLookupQuery),
    responses(
        (status = 200, description = "Order with resolved items", body = ApiResponse<OrderDetails>),
        (status = 400, description = "Order number missing", body = ApiResponse<ErrorData>),
        (status = 404, description = "Order not found", body = ApiResponse<ErrorData>),
    ),
    tag = "Orders"
)]
pub async fn lookup_order(
    State(state): State<AppState>,
    Query(query): Query<OrderLookupQuery>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    let order_number = query.order_number.unwrap_or_default();
    let response = order_service::get_order(&state, &order_number).await?;
    Ok(Json(response))
}

#[utoipa::path(
    get,
    path = "/api/orders/{order_number}",
    params(
        ("order_number" = String, Path, description = "Order number, e.g. ORD-1700000000000-42")
    ),
    responses(
        (status = 200, description = "Order with resolved items", body = ApiResponse<OrderDetails>),
        (status = 404, description = "Order not found", body = ApiResponse<ErrorData>),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> AppResult<Json<ApiResponse<OrderDetails>>> {
    let response = order_service::get_order(&state, &order_number).await?;
    Ok(Json(response))
}
