//! Notification sink.
//!
//! Finalized and fulfilled orders are always logged. If a webhook URL is configured, the event is also POSTed there as
//! JSON. Delivery is best effort: failures are logged and never reach the checkout that produced the event.
use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use fest_engine::events::{EventHooks, OrderFinalizedEvent, OrderFulfilledEvent};
use log::*;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;

use crate::errors::ServerError;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct WebhookNotifier {
    url: Option<String>,
    client: Arc<Client>,
}

impl WebhookNotifier {
    pub fn new(url: Option<String>) -> Result<Self, ServerError> {
        let client = Client::builder()
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| ServerError::InitializeError(format!("Could not create webhook client. {e}")))?;
        Ok(Self { url, client: Arc::new(client) })
    }

    pub async fn notify<T: Serialize>(&self, event_type: &str, event: &T) {
        let Some(url) = &self.url else {
            return;
        };
        let body = json!({ "event": event_type, "data": event });
        match self.client.post(url).json(&body).send().await {
            Ok(res) if res.status().is_success() => debug!("📬️ {event_type} delivered to the notification webhook"),
            Ok(res) => warn!("📬️ Notification webhook refused {event_type} with status {}", res.status()),
            Err(e) => warn!("📬️ Could not deliver {event_type} to the notification webhook. {e}"),
        }
    }

    /// Hooks that announce every finalized and fulfilled order.
    pub fn hooks(&self) -> EventHooks {
        let mut hooks = EventHooks::default();
        let notifier = self.clone();
        hooks.on_order_finalized(move |ev: OrderFinalizedEvent| {
            let notifier = notifier.clone();
            Box::pin(async move {
                info!(
                    "📬️ Order {} finalized at {}. Token {} for {} ({})",
                    ev.order_id, ev.merchant_id, ev.human_token, ev.user_id, ev.total_amount
                );
                notifier.notify("order_finalized", &ev).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let notifier = self.clone();
        hooks.on_order_fulfilled(move |ev: OrderFulfilledEvent| {
            let notifier = notifier.clone();
            Box::pin(async move {
                info!("📬️ Token {} at {} has been handed over", ev.human_token, ev.merchant_id);
                notifier.notify("order_fulfilled", &ev).await;
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        hooks
    }
}
