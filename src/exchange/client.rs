//! Bybit v5 REST API client.

use crate::config::BybitConfig;
use crate::exchange::error::{ExchangeError, ExchangeResult};
use crate::exchange::types::*;
use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sha2::Sha256;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Upper bound on cursor pages followed for a single call.
const MAX_PAGES: usize = 50;

/// Page size for position listing (exchange maximum).
const POSITION_PAGE_LIMIT: usize = 200;

/// Page size for open orders (exchange maximum).
const ORDER_PAGE_LIMIT: usize = 50;

/// Page size for closed PnL and executions (exchange maximum).
const HISTORY_PAGE_LIMIT: usize = 100;

/// Wallet balance result wrapper.
#[derive(Debug, Default, Deserialize)]
struct WalletResult {
    #[serde(default)]
    list: Vec<WalletBalance>,
}

/// Compute the hex HMAC-SHA256 of `payload` keyed by `secret`.
pub fn sign_payload(secret: &str, payload: &str) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Canonical query string: parameters sorted by key, joined as `k=v&k=v`.
///
/// The same string is signed and sent, so the exchange sees exactly what was signed.
pub fn canonical_query(params: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Bybit API client for the unified trading account.
#[derive(Debug, Clone)]
pub struct BybitClient {
    http: Client,
    api_key: String,
    api_secret: String,
    base_url: String,
    recv_window: u64,
    category: String,
    settle_coin: String,
    account_type: String,
}

impl BybitClient {
    /// Create a new Bybit client from configuration.
    pub fn new(config: &BybitConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            recv_window: config.recv_window_ms,
            category: config.category.clone(),
            settle_coin: config.settle_coin.clone(),
            account_type: config.account_type.clone(),
        })
    }

    /// Generate the request signature for a query string at `timestamp`.
    fn sign(&self, timestamp: i64, query_string: &str) -> String {
        let payload = format!(
            "{}{}{}{}",
            timestamp, self.api_key, self.recv_window, query_string
        );
        sign_payload(&self.api_secret, &payload)
    }

    /// Get current timestamp in milliseconds.
    fn timestamp() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn url(&self, endpoint: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}{}?{}", self.base_url, endpoint, query)
        }
    }

    /// Perform a signed GET and unwrap the v5 envelope.
    async fn signed_get<T>(&self, endpoint: &str, params: &[(&str, String)]) -> ExchangeResult<T>
    where
        T: DeserializeOwned + Default,
    {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(ExchangeError::MissingCredentials);
        }

        let query = canonical_query(params);
        let timestamp = Self::timestamp();
        let signature = self.sign(timestamp, &query);

        let response = self
            .http
            .get(self.url(endpoint, &query))
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", self.recv_window.to_string())
            .header("Content-Type", "application/json")
            .send()
            .await?;

        Self::unwrap_envelope(endpoint, response).await
    }

    /// Perform an unauthenticated GET (market data) and unwrap the envelope.
    async fn public_get<T>(&self, endpoint: &str, params: &[(&str, String)]) -> ExchangeResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let query = canonical_query(params);
        let response = self.http.get(self.url(endpoint, &query)).send().await?;
        Self::unwrap_envelope(endpoint, response).await
    }

    async fn unwrap_envelope<T>(endpoint: &str, response: reqwest::Response) -> ExchangeResult<T>
    where
        T: DeserializeOwned + Default,
    {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ExchangeError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|source| ExchangeError::Decode {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if envelope.ret_code != 0 {
            return Err(ExchangeError::Api {
                code: envelope.ret_code,
                message: if envelope.ret_msg.is_empty() {
                    "Unknown error".to_string()
                } else {
                    envelope.ret_msg
                },
            });
        }

        Ok(envelope.result.unwrap_or_default())
    }

    /// Follow `nextPageCursor` until it is empty, `max_items` are collected, or
    /// the page limit is hit.
    async fn fetch_paginated<T>(
        &self,
        endpoint: &str,
        params: Vec<(&str, String)>,
        max_items: Option<usize>,
    ) -> ExchangeResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..MAX_PAGES {
            let mut page_params = params.clone();
            if let Some(c) = &cursor {
                page_params.push(("cursor", c.clone()));
            }

            let result: ListResult<T> = self.signed_get(endpoint, &page_params).await?;
            debug!(endpoint, page, count = result.list.len(), "Fetched page");
            items.extend(result.list);

            if let Some(max) = max_items {
                if items.len() >= max {
                    items.truncate(max);
                    break;
                }
            }

            let next = result.next_page_cursor.filter(|c| !c.is_empty());
            if next.is_none() || next == cursor {
                break;
            }
            cursor = next;

            if page + 1 == MAX_PAGES {
                warn!(endpoint, "Stopped following cursors after {} pages", MAX_PAGES);
            }
        }

        Ok(items)
    }

    // ==================== Account (Authenticated) ====================

    /// Get open positions (size > 0) for the configured settlement coin.
    #[instrument(skip(self))]
    pub async fn get_positions(&self) -> ExchangeResult<Vec<RawPosition>> {
        let params = vec![
            ("category", self.category.clone()),
            ("settleCoin", self.settle_coin.clone()),
            ("limit", POSITION_PAGE_LIMIT.to_string()),
        ];

        let positions: Vec<RawPosition> = self
            .fetch_paginated("/v5/position/list", params, None)
            .await?;

        Ok(positions
            .into_iter()
            .filter(|p| {
                crate::utils::parse_decimal(&p.size)
                    .map(|size| size > rust_decimal::Decimal::ZERO)
                    .unwrap_or(false)
            })
            .collect())
    }

    /// Get all open and untriggered conditional orders.
    #[instrument(skip(self))]
    pub async fn get_open_orders(&self) -> ExchangeResult<Vec<RawOrder>> {
        let params = vec![
            ("category", self.category.clone()),
            ("settleCoin", self.settle_coin.clone()),
            ("limit", ORDER_PAGE_LIMIT.to_string()),
        ];

        self.fetch_paginated("/v5/order/realtime", params, None)
            .await
    }

    /// Get the wallet balance summary for the configured account type.
    #[instrument(skip(self))]
    pub async fn get_wallet_balance(&self) -> ExchangeResult<WalletBalance> {
        let params = [("accountType", self.account_type.clone())];
        let result: WalletResult = self
            .signed_get("/v5/account/wallet-balance", &params)
            .await?;

        Ok(result.list.into_iter().next().unwrap_or_default())
    }

    /// Get closed-position PnL records, newest first, up to `limit` records.
    ///
    /// Without `start_time` the exchange returns the last 7 days.
    #[instrument(skip(self))]
    pub async fn get_closed_pnl(
        &self,
        start_time: Option<i64>,
        limit: usize,
    ) -> ExchangeResult<Vec<ClosedPnl>> {
        let mut params = vec![
            ("category", self.category.clone()),
            ("limit", limit.clamp(1, HISTORY_PAGE_LIMIT).to_string()),
        ];
        if let Some(start) = start_time {
            params.push(("startTime", start.to_string()));
        }

        self.fetch_paginated("/v5/position/closed-pnl", params, Some(limit))
            .await
    }

    /// Get trade executions since `start_time` (ms).
    #[instrument(skip(self))]
    pub async fn get_executions(&self, start_time: i64) -> ExchangeResult<Vec<Execution>> {
        let params = vec![
            ("category", self.category.clone()),
            ("startTime", start_time.to_string()),
            ("limit", HISTORY_PAGE_LIMIT.to_string()),
        ];

        self.fetch_paginated("/v5/execution/list", params, None)
            .await
    }

    // ==================== Market Data (Public) ====================

    /// Get tickers for the category, optionally restricted to one symbol.
    #[instrument(skip(self))]
    pub async fn get_tickers(&self, symbol: Option<&str>) -> ExchangeResult<Vec<Ticker>> {
        let mut params = vec![("category", self.category.clone())];
        if let Some(s) = symbol {
            params.push(("symbol", s.to_string()));
        }

        let result: ListResult<Ticker> = self.public_get("/v5/market/tickers", &params).await?;
        Ok(result.list)
    }

    /// Check credentials with a cheap authenticated call.
    pub async fn test_connection(&self) -> bool {
        self.get_wallet_balance().await.is_ok()
    }
}
