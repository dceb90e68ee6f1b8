#![allow(dead_code)]

use std::{sync::Arc, sync::Mutex, time::Duration};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use storefront_api::{
    dto::orders::{CartItemRequest, PlaceOrderRequest},
    error::{AppError, AppResult},
    models::{CustomerInfo, Product, ProductVariant, SelectedVariant, VariantAxis},
    notify::{Notifier, OrderConfirmation, OrderFailure},
    payment::{Authorization, CardInstrument, PaymentAuthorizer},
    state::AppState,
    store::memory::MemoryStore,
};
use uuid::Uuid;

/// Gateway that answers every authorization the same way.
pub struct FixedGateway(pub Authorization);

impl FixedGateway {
    pub fn approve() -> Arc<Self> {
        Arc::new(Self(Authorization::Approved {
            transaction_id: "txn_test".into(),
        }))
    }

    pub fn decline() -> Arc<Self> {
        Arc::new(Self(Authorization::Declined {
            reason: "Payment declined by bank".into(),
        }))
    }

    pub fn gateway_error() -> Arc<Self> {
        Arc::new(Self(Authorization::GatewayError {
            reason: "Payment gateway error".into(),
        }))
    }
}

#[async_trait]
impl PaymentAuthorizer for FixedGateway {
    async fn authorize(&self, _amount: Decimal, _card: &CardInstrument) -> AppResult<Authorization> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierMode {
    Deliver,
    Fail,
    Hang,
}

/// Keeps every message it is asked to send.
pub struct RecordingNotifier {
    mode: NotifierMode,
    pub confirmations: Mutex<Vec<OrderConfirmation>>,
    pub failures: Mutex<Vec<OrderFailure>>,
}

impl RecordingNotifier {
    pub fn new(mode: NotifierMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            confirmations: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        })
    }

    pub fn confirmations(&self) -> Vec<OrderConfirmation> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<OrderFailure> {
        self.failures.lock().unwrap().clone()
    }

    async fn outcome(&self) -> AppResult<()> {
        match self.mode {
            NotifierMode::Deliver => Ok(()),
            NotifierMode::Fail => Err(AppError::Internal(anyhow::anyhow!("smtp unavailable"))),
            NotifierMode::Hang => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_order_confirmation(&self, confirmation: &OrderConfirmation) -> AppResult<()> {
        self.confirmations.lock().unwrap().push(confirmation.clone());
        self.outcome().await
    }

    async fn send_order_failure(&self, failure: &OrderFailure) -> AppResult<()> {
        self.failures.lock().unwrap().push(failure.clone());
        self.outcome().await
    }
}

pub fn product(name: &str, price: Decimal, inventory: i32) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4(),
        name: name.to_string(),
        description: format!("{name} description"),
        price,
        image: format!("https://images.example.com/{}.jpg", name.to_lowercase().replace(' ', "-")),
        category: "men".into(),
        inventory,
        variants: vec![
            ProductVariant {
                name: VariantAxis::Color,
                options: vec!["Black".into(), "White".into()],
            },
            ProductVariant {
                name: VariantAxis::Size,
                options: vec!["S".into(), "M".into(), "L".into()],
            },
        ],
        discount: 0,
        is_new: false,
        rating: 4.0,
        created_at: now,
        updated_at: now,
    }
}

/// Same as [`product`] but created `minutes_ago` in the past, for ordering tests.
pub fn aged_product(name: &str, price: Decimal, minutes_ago: i64) -> Product {
    let mut p = product(name, price, 10);
    p.created_at = Utc::now() - ChronoDuration::minutes(minutes_ago);
    p
}

pub fn customer() -> CustomerInfo {
    CustomerInfo {
        full_name: "Ada Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "555-0100".into(),
        address: "12 Analytical Way".into(),
        city: "London".into(),
        state: "LDN".into(),
        zip_code: "N1 9GU".into(),
        country: "UK".into(),
    }
}

pub fn line(product_id: Uuid, quantity: i32) -> CartItemRequest {
    CartItemRequest {
        product_id: product_id.to_string(),
        quantity,
        selected_variant: None,
    }
}

pub fn line_with_variant(product_id: Uuid, quantity: i32, color: &str, size: &str) -> CartItemRequest {
    CartItemRequest {
        product_id: product_id.to_string(),
        quantity,
        selected_variant: Some(SelectedVariant {
            color: Some(color.into()),
            size: Some(size.into()),
        }),
    }
}

pub fn order_request(items: Vec<CartItemRequest>, total: Decimal) -> PlaceOrderRequest {
    PlaceOrderRequest {
        items,
        customer_info: customer(),
        total,
        card_number: "4242 4242 4242 4242".into(),
    }
}

pub fn state_with(
    store: &MemoryStore,
    payments: Arc<dyn PaymentAuthorizer>,
    notifier: Arc<dyn Notifier>,
) -> AppState {
    let mut state = AppState::in_memory(store.clone(), payments, notifier);
    state.settings.notification_timeout = Duration::from_millis(100);
    state
}
