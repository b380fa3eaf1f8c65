//! Inline keyboards for bot navigation.

use reqwest::Url;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, WebAppInfo};
use tracing::warn;

/// Fallback target for the web-app button when no dashboard URL is configured.
const PLACEHOLDER_WEB_APP_URL: &str = "https://example.com";

/// Screens reachable from the keyboards. The callback data is the command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Balance,
    Pnl,
    Positions,
    Orders,
    Trades,
    Analyze,
    Help,
}

impl View {
    pub fn callback_data(&self) -> &'static str {
        match self {
            View::Balance => "balance",
            View::Pnl => "pnl",
            View::Positions => "list",
            View::Orders => "orders",
            View::Trades => "trades",
            View::Analyze => "analyze",
            View::Help => "help",
        }
    }

    pub fn from_callback(data: &str) -> Option<Self> {
        match data {
            "balance" => Some(View::Balance),
            "pnl" => Some(View::Pnl),
            "list" => Some(View::Positions),
            "orders" => Some(View::Orders),
            "trades" => Some(View::Trades),
            "analyze" => Some(View::Analyze),
            "help" => Some(View::Help),
            _ => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            View::Balance => "💰 Balance",
            View::Pnl => "📈 PnL Today",
            View::Positions => "📊 Positions",
            View::Orders => "📋 Orders",
            View::Trades => "🤝 Trades",
            View::Analyze => "🔍 Analyze",
            View::Help => "❓ Help",
        }
    }
}

/// Button rows shared by the start menu and the navigation keyboard.
const NAV_ROWS: [[View; 2]; 3] = [
    [View::Balance, View::Pnl],
    [View::Positions, View::Orders],
    [View::Trades, View::Analyze],
];

fn btn(view: View) -> InlineKeyboardButton {
    InlineKeyboardButton::callback(view.label().to_string(), view.callback_data().to_string())
}

/// Navigation keyboard shown under every view.
///
/// The current view's button is left out and a Refresh button re-opens it.
pub fn navigation_keyboard(current: Option<View>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = NAV_ROWS
        .iter()
        .map(|row| {
            row.iter()
                .filter(|v| Some(**v) != current)
                .map(|v| btn(*v))
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    if let Some(view) = current {
        rows.push(vec![InlineKeyboardButton::callback(
            "🔄 Refresh".to_string(),
            view.callback_data().to_string(),
        )]);
    }

    InlineKeyboardMarkup::new(rows)
}

/// Parse the dashboard URL, falling back to a placeholder when it is unset or invalid.
pub fn web_app_url(configured: &str) -> Option<Url> {
    let raw = configured.trim();
    if !raw.is_empty() {
        match Url::parse(raw) {
            Ok(url) => return Some(url),
            Err(e) => warn!("Invalid WEB_APP_URL {:?}: {}", raw, e),
        }
    }
    Url::parse(PLACEHOLDER_WEB_APP_URL).ok()
}

/// Menu sent with `/start`: dashboard button, all views, help.
pub fn start_keyboard(web_app: Option<Url>) -> InlineKeyboardMarkup {
    let mut rows: Vec<Vec<InlineKeyboardButton>> = web_app
        .map(|url| {
            vec![InlineKeyboardButton::web_app(
                "🚀 Open Dashboard",
                WebAppInfo { url },
            )]
        })
        .into_iter()
        .collect();
    rows.extend(
        NAV_ROWS
            .iter()
            .map(|row| row.iter().map(|v| btn(*v)).collect::<Vec<_>>()),
    );
    rows.push(vec![btn(View::Help)]);

    InlineKeyboardMarkup::new(rows)
}
