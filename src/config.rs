use std::{env, str::FromStr};

use anyhow::Context;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Outbox,
    Log,
}

impl FromStr for NotifierKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "outbox" => Ok(NotifierKind::Outbox),
            "log" => Ok(NotifierKind::Log),
            other => anyhow::bail!("unknown notifier `{other}`, expected `outbox` or `log`"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub order_number_prefix: String,
    pub payment_decline_rate: f64,
    pub payment_gateway_error_rate: f64,
    pub notifier: NotifierKind,
    pub mail_from: String,
    pub notification_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_or("APP_PORT", 3000u16)?;

        let payment_decline_rate = parse_or("PAYMENT_DECLINE_RATE", 0.10)?;
        let payment_gateway_error_rate = parse_or("PAYMENT_GATEWAY_ERROR_RATE", 0.10)?;
        if !(0.0..=1.0).contains(&payment_decline_rate)
            || !(0.0..=1.0).contains(&payment_gateway_error_rate)
            || payment_decline_rate + payment_gateway_error_rate > 1.0
        {
            anyhow::bail!("payment failure rates must lie in [0, 1] and sum to at most 1");
        }

        Ok(Self {
            database_url,
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            host,
            port,
            order_number_prefix: env::var("ORDER_NUMBER_PREFIX")
                .unwrap_or_else(|_| "ORD".to_string()),
            payment_decline_rate,
            payment_gateway_error_rate,
            notifier: parse_or("NOTIFIER", NotifierKind::Outbox)?,
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "noreply@esalesone.com".to_string()),
            notification_timeout_secs: parse_or("NOTIFICATION_TIMEOUT_SECS", 10)?,
        })
    }
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, env::var(key).ok(), default)
}

fn parse_value<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {key}: {e}")),
        None => Ok(default),
    }
}
