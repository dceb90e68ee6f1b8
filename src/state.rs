use std::{sync::Arc, time::Duration};

use crate::{
    config::{AppConfig, NotifierKind},
    db::OrmConn,
    notify::{LogNotifier, Notifier, OutboxNotifier},
    payment::{PaymentAuthorizer, SimulatedGateway},
    store::{CatalogStore, OrderStore, memory::MemoryStore, orm::OrmStore},
};

#[derive(Debug, Clone)]
pub struct OrderSettings {
    pub order_number_prefix: String,
    pub notification_timeout: Duration,
}

impl Default for OrderSettings {
    fn default() -> Self {
        Self {
            order_number_prefix: "ORD".into(),
            notification_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub payments: Arc<dyn PaymentAuthorizer>,
    pub notifier: Arc<dyn Notifier>,
    pub settings: OrderSettings,
}

impl AppState {
    pub fn from_config(config: &AppConfig, orm: OrmConn) -> Self {
        let store = OrmStore::new(orm.clone());
        let notifier: Arc<dyn Notifier> = match config.notifier {
            NotifierKind::Outbox => Arc::new(OutboxNotifier::new(orm, config.mail_from.clone())),
            NotifierKind::Log => Arc::new(LogNotifier::new(config.mail_from.clone())),
        };

        Self {
            catalog: Arc::new(store.clone()),
            orders: Arc::new(store),
            payments: Arc::new(SimulatedGateway::new(
                config.payment_decline_rate,
                config.payment_gateway_error_rate,
            )),
            notifier,
            settings: OrderSettings {
                order_number_prefix: config.order_number_prefix.clone(),
                notification_timeout: Duration::from_secs(config.notification_timeout_secs),
            },
        }
    }

    /// State over a process-local store; used by tests and local tooling.
    pub fn in_memory(
        store: MemoryStore,
        payments: Arc<dyn PaymentAuthorizer>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog: Arc::new(store.clone()),
            orders: Arc::new(store),
            payments,
            notifier,
            settings: OrderSettings::default(),
        }
    }
}
