//! Payment authorization.
//!
//! The workflow only sees [`PaymentAuthorizer`]; [`SimulatedGateway`] stands
//! in for a real processor until one is wired up.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const DECLINED_BY_BANK: &str = "Payment declined by bank";
pub const GATEWAY_ERROR: &str = "Payment gateway error";

/// Card data as entered. Never persisted or logged; only [`last4`](Self::last4) leaves here.
#[derive(Clone)]
pub struct CardInstrument {
    number: String,
}

impl CardInstrument {
    /// Strips spaces and dashes, then requires 12 to 19 digits.
    pub fn parse(raw: &str) -> AppResult<Self> {
        let number: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
        if !(12..=19).contains(&number.len()) || !number.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::Validation(
                "Card number must contain 12 to 19 digits".into(),
            ));
        }
        Ok(Self { number })
    }

    pub fn last4(&self) -> String {
        self.number[self.number.len() - 4..].to_string()
    }
}

impl std::fmt::Debug for CardInstrument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CardInstrument(**** {})", self.last4())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Approved { transaction_id: String },
    Declined { reason: String },
    GatewayError { reason: String },
}

#[async_trait]
pub trait PaymentAuthorizer: Send + Sync + 'static {
    async fn authorize(&self, amount: Decimal, instrument: &CardInstrument)
    -> AppResult<Authorization>;
}

/// Randomly fails a configurable share of payments.
pub struct SimulatedGateway {
    decline_rate: f64,
    gateway_error_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedGateway {
    pub fn new(decline_rate: f64, gateway_error_rate: f64) -> Self {
        Self::with_rng(decline_rate, gateway_error_rate, StdRng::from_os_rng())
    }

    pub fn seeded(decline_rate: f64, gateway_error_rate: f64, seed: u64) -> Self {
        Self::with_rng(decline_rate, gateway_error_rate, StdRng::seed_from_u64(seed))
    }

    fn with_rng(decline_rate: f64, gateway_error_rate: f64, rng: StdRng) -> Self {
        Self {
            decline_rate,
            gateway_error_rate,
            rng: Mutex::new(rng),
        }
    }

    fn classify(&self, roll: f64) -> Authorization {
        if roll < self.decline_rate {
            Authorization::Declined {
                reason: DECLINED_BY_BANK.into(),
            }
        } else if roll < self.decline_rate + self.gateway_error_rate {
            Authorization::GatewayError {
                reason: GATEWAY_ERROR.into(),
            }
        } else {
            Authorization::Approved {
                transaction_id: format!("sim_{}", Uuid::new_v4().simple()),
            }
        }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new(0.10, 0.10)
    }
}

#[async_trait]
impl PaymentAuthorizer for SimulatedGateway {
    async fn authorize(
        &self,
        amount: Decimal,
        instrument: &CardInstrument,
    ) -> AppResult<Authorization> {
        let roll: f64 = self
            .rng
            .lock()
            .map_err(|_| AppError::Internal(anyhow::anyhow!("payment rng lock poisoned")))?
            .random();
        let outcome = self.classify(roll);
        tracing::debug!(%amount, card = ?instrument, ?outcome, "simulated payment");
        Ok(outcome)
    }
}
