//! Push notifications for order-stream updates.

use super::views;
use super::BotContext;
use crate::exchange::{AccountDataProvider, OrderUpdate, WsEvent};
use crate::utils::parse_decimal;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::ParseMode;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Statuses after which an order produces no further updates.
fn is_final(status: &str) -> bool {
    matches!(
        status,
        "Filled" | "Cancelled" | "PartiallyFilledCanceled" | "Rejected" | "Deactivated"
    )
}

/// Last seen status per live order, so amendments without a status change stay quiet.
#[derive(Debug, Default)]
pub struct StatusTracker {
    last_status: HashMap<String, String>,
}

impl StatusTracker {
    /// Record `update`; true when its status differs from the previous one for that order.
    pub fn observe(&mut self, update: &OrderUpdate) -> bool {
        let changed = self
            .last_status
            .get(&update.order_id)
            .map_or(true, |previous| *previous != update.order_status);

        if is_final(&update.order_status) {
            self.last_status.remove(&update.order_id);
        } else {
            self.last_status
                .insert(update.order_id.clone(), update.order_status.clone());
        }

        changed
    }

    pub fn tracked(&self) -> usize {
        self.last_status.len()
    }
}

/// Last traded price of `symbol`, if the ticker lookup succeeds.
pub async fn last_price(provider: &dyn AccountDataProvider, symbol: &str) -> Option<Decimal> {
    match provider.get_ticker(symbol).await {
        Ok(Some(ticker)) => parse_decimal(&ticker.last_price),
        Ok(None) => None,
        Err(e) => {
            warn!("Ticker lookup for {} failed: {:#}", symbol, e);
            None
        }
    }
}

/// Consume listener events and push order status changes to the remembered chat.
pub async fn forward_order_updates(
    bot: Bot,
    ctx: Arc<BotContext>,
    mut events: mpsc::Receiver<WsEvent>,
) {
    let mut tracker = StatusTracker::default();

    while let Some(event) = events.recv().await {
        let update = match event {
            WsEvent::Connected => {
                info!("📡 Order stream connected");
                continue;
            }
            WsEvent::Authenticated => {
                info!("Order stream authenticated");
                continue;
            }
            WsEvent::Rejected(reason) => {
                error!("Order stream rejected: {}", reason);
                continue;
            }
            WsEvent::Disconnected => {
                warn!("Order stream disconnected");
                continue;
            }
            WsEvent::OrderUpdate(update) => update,
        };

        if !tracker.observe(&update) {
            debug!(order_id = %update.order_id, status = %update.order_status, "Status unchanged");
            continue;
        }

        let Some(chat_id) = ctx.chat_id().await else {
            debug!(
                "No chat to notify yet, dropping {} {} update",
                update.symbol, update.order_status
            );
            continue;
        };

        let price = last_price(ctx.provider.as_ref(), &update.symbol).await;
        let text = views::order_update(&update, price);

        match bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => info!(
                symbol = %update.symbol,
                status = %update.order_status,
                "🔔 Order notification sent"
            ),
            Err(e) => error!("Failed to send order notification: {}", e),
        }
    }

    info!("Order event channel closed, notifier stopping");
}
