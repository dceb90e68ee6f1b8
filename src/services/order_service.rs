use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    dto::orders::{CartItemRequest, OrderDetails, PlaceOrderRequest, PlacedOrder},
    error::{AppError, AppResult},
    models::{
        Order, OrderItem, OrderStatus, PaymentDetails, PaymentMethod, PaymentStatus, Product,
        SelectedVariant,
    },
    notify::{ConfirmationLine, OrderConfirmation, OrderFailure},
    payment::{Authorization, CardInstrument},
    response::{ApiResponse, Meta},
    state::AppState,
    store::Reservation,
};

const ORDER_NUMBER_ATTEMPTS: usize = 3;

struct CartLine {
    product: Product,
    quantity: i32,
    selected_variant: Option<SelectedVariant>,
}

pub async fn place_order(
    state: &AppState,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<PlacedOrder>> {
    let card = validate_request(&payload)?;

    let mut lines = Vec::with_capacity(payload.items.len());
    for item in &payload.items {
        lines.push(resolve_line(state, item).await?);
    }

    let reservations = merge_reservations(&lines);
    state.catalog.reserve(&reservations).await?;
    tracing::debug!(lines = reservations.len(), "inventory reserved");

    let mut order_number = generate_order_number(&state.settings.order_number_prefix);

    let authorization = match state.payments.authorize(payload.total, &card).await {
        Ok(authorization) => authorization,
        Err(err) => {
            release_reservations(state, &reservations).await;
            return Err(err);
        }
    };

    let transaction_id = match authorization {
        Authorization::Approved { transaction_id } => transaction_id,
        Authorization::Declined { reason } => {
            release_reservations(state, &reservations).await;
            notify_failure(state, &payload, &order_number, &reason).await;
            return Err(AppError::PaymentDeclined(reason));
        }
        Authorization::GatewayError { reason } => {
            release_reservations(state, &reservations).await;
            notify_failure(state, &payload, &order_number, &reason).await;
            return Err(AppError::PaymentGatewayError(reason));
        }
    };

    let now = Utc::now();
    let mut order = Order {
        id: Uuid::new_v4(),
        order_number: order_number.clone(),
        items: lines
            .iter()
            .map(|line| OrderItem {
                product_id: line.product.id,
                quantity: line.quantity,
                price: line.product.effective_price(),
                selected_variant: line.selected_variant.clone(),
            })
            .collect(),
        customer_info: payload.customer_info.clone(),
        total: payload.total,
        status: OrderStatus::Processing,
        payment_status: PaymentStatus::Paid,
        payment_method: PaymentMethod::CreditCard,
        payment_details: PaymentDetails {
            last4: Some(card.last4()),
            transaction_id: Some(transaction_id),
        },
        created_at: now,
        updated_at: now,
    };

    let mut attempt = 1;
    loop {
        match state.orders.insert_order(&order).await {
            Ok(()) => break,
            Err(AppError::DuplicateOrderNumber) if attempt < ORDER_NUMBER_ATTEMPTS => {
                tracing::warn!(order_number = %order_number, attempt, "order number taken, regenerating");
                attempt += 1;
                order_number = generate_order_number(&state.settings.order_number_prefix);
                order.order_number = order_number.clone();
            }
            Err(err) => {
                release_reservations(state, &reservations).await;
                return Err(err);
            }
        }
    }

    tracing::info!(
        order_number = %order.order_number,
        total = %order.total,
        items = order.items.len(),
        "order placed"
    );

    send_confirmation(state, &order, &lines).await;

    Ok(ApiResponse::success(
        "Order placed",
        PlacedOrder {
            order_number: order.order_number,
            status: order.status,
        },
        Some(Meta::empty()),
    ))
}

pub async fn get_order(state: &AppState, order_number: &str) -> AppResult<ApiResponse<OrderDetails>> {
    let order_number = order_number.trim();
    if order_number.is_empty() {
        return Err(AppError::Validation("Order number is required".into()));
    }

    let order = match state.orders.find_order(order_number).await? {
        Some(o) => o,
        None => return Err(AppError::OrderNotFound),
    };

    let mut product_ids: Vec<Uuid> = order.items.iter().map(|item| item.product_id).collect();
    product_ids.sort();
    product_ids.dedup();
    let products = state.catalog.get_products(&product_ids).await?;

    Ok(ApiResponse::success(
        "OK",
        OrderDetails::resolve(order, &products),
        Some(Meta::empty()),
    ))
}

/// Checks the request shape and returns the parsed card.
fn validate_request(payload: &PlaceOrderRequest) -> AppResult<CardInstrument> {
    if payload.items.is_empty() {
        return Err(AppError::Validation("Cart is empty".into()));
    }
    if payload.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::Validation(
            "quantity must be greater than 0".into(),
        ));
    }

    let missing = payload.customer_info.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Missing customer information: {}",
            missing.join(", ")
        )));
    }
    if !payload.customer_info.email.contains('@') {
        return Err(AppError::Validation("Invalid email address".into()));
    }

    if payload.total < Decimal::ZERO {
        return Err(AppError::Validation("total must not be negative".into()));
    }

    CardInstrument::parse(&payload.card_number)
}

async fn resolve_line(state: &AppState, item: &CartItemRequest) -> AppResult<CartLine> {
    let not_found = || AppError::ProductNotFound(item.product_id.clone());
    let product_id = Uuid::parse_str(item.product_id.trim()).map_err(|_| not_found())?;
    let product = state
        .catalog
        .get_product(product_id)
        .await?
        .ok_or_else(not_found)?;

    let selected_variant = item.selected_variant.clone().filter(|v| !v.is_empty());
    if let Some(variant) = &selected_variant {
        product.check_variant(variant).map_err(AppError::Validation)?;
    }

    Ok(CartLine {
        product,
        quantity: item.quantity,
        selected_variant,
    })
}

/// One reservation per product, summing lines that repeat it.
fn merge_reservations(lines: &[CartLine]) -> Vec<Reservation> {
    let mut merged: Vec<Reservation> = Vec::new();
    for line in lines {
        match merged.iter_mut().find(|r| r.product_id == line.product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(line.quantity),
            None => merged.push(Reservation {
                product_id: line.product.id,
                product_name: line.product.name.clone(),
                quantity: line.quantity,
            }),
        }
    }
    merged
}

async fn release_reservations(state: &AppState, reservations: &[Reservation]) {
    if let Err(err) = state.catalog.release(reservations).await {
        tracing::error!(error = ?err, "failed to release reserved inventory");
    }
}

async fn notify_failure(state: &AppState, payload: &PlaceOrderRequest, order_number: &str, reason: &str) {
    tracing::info!(order_number = %order_number, reason = %reason, "payment failed");
    let failure = OrderFailure {
        to: payload.customer_info.email.clone(),
        order_number: order_number.to_string(),
        reason: reason.to_string(),
    };
    match tokio::time::timeout(
        state.settings.notification_timeout,
        state.notifier.send_order_failure(&failure),
    )
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(err)) => tracing::warn!(error = %err, order_number = %order_number, "failure notification failed"),
        Err(_) => tracing::warn!(order_number = %order_number, "failure notification timed out"),
    }
}

async fn send_confirmation(state: &AppState, order: &Order, lines: &[CartLine]) {
    let confirmation = OrderConfirmation {
        to: order.customer_info.email.clone(),
        order_number: order.order_number.clone(),
        customer_name: order.customer_info.full_name.clone(),
        items: lines
            .iter()
            .map(|line| ConfirmationLine {
                name: line.product.name.clone(),
                quantity: line.quantity,
                unit_price: line.product.effective_price(),
                selected_variant: line.selected_variant.clone(),
            })
            .collect(),
        total: order.total,
    };
    match tokio::time::timeout(
        state.settings.notification_timeout,
        state.notifier.send_order_confirmation(&confirmation),
    )
    .await
    {
        Ok(Ok(())) => {}
        Ok(Err(err)) => {
            tracing::warn!(error = %err, order_number = %order.order_number, "confirmation email failed")
        }
        Err(_) => tracing::warn!(order_number = %order.order_number, "confirmation email timed out"),
    }
}

fn generate_order_number(prefix: &str) -> String {
    let suffix: u32 = rand::rng().random_range(0..1000);
    format!("{}-{}-{}", prefix, Utc::now().timestamp_millis(), suffix)
}
