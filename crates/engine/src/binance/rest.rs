use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use common::{normalize_symbol, Candle, Error, PriceHistory, Result};

/// Public (unsigned) REST client for Binance USDⓈ-M futures klines.
pub struct BinanceFuturesClient {
    base_url: Url,
    http: Client,
}

impl BinanceFuturesClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid futures base URL '{base_url}': {e}")))?;
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self { base_url, http })
    }

    fn klines_url(&self, symbol: &str, interval: &str, limit: usize) -> Result<Url> {
        let mut url = self
            .base_url
            .join("/fapi/v1/klines")
            .map_err(|e| Error::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("symbol", symbol)
            .append_pair("interval", interval)
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl PriceHistory for BinanceFuturesClient {
    async fn recent_candles(
        &self,
        symbol: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Candle>> {
        let symbol = normalize_symbol(symbol);
        let url = self.klines_url(&symbol, interval, count)?;
        debug!(%symbol, %interval, limit = count, "Fetching klines");

        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| Error::DataUnavailable(format!("kline request failed: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| Error::DataUnavailable(format!("kline body unreadable: {e}")))?;

        parse_klines(&body).map_err(|e| match e {
            Error::DataUnavailable(msg) if !status.is_success() => {
                Error::DataUnavailable(format!("HTTP {status}: {msg}"))
            }
            other => other,
        })
    }
}

/// Parse a kline array (`[[openTime, "open", "high", "low", "close", ...], ...]`),
/// oldest first, dropping the last row because that bar is still forming.
pub fn parse_klines(body: &str) -> Result<Vec<Candle>> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::DataUnavailable(format!("kline response is not JSON: {e}")))?;

    let Value::Array(rows) = value else {
        return Err(Error::DataUnavailable(format!(
            "kline response is not an array: {}",
            truncate(body, 200)
        )));
    };

    let mut candles = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            parse_row(row).ok_or_else(|| {
                let row_text = row.to_string();
                let shown = truncate(&row_text, 120);
                Error::DataUnavailable(format!("malformed kline row {i}: {shown}"))
            })
        })
        .collect::<Result<Vec<_>>>()?;

    candles.pop();
    Ok(candles)
}

fn parse_row(row: &Value) -> Option<Candle> {
    let fields = row.as_array()?;
    if fields.len() < 5 {
        return None;
    }
    Some(Candle {
        open: price(&fields[1])?,
        high: price(&fields[2])?,
        low: price(&fields[3])?,
        close: price(&fields[4])?,
    })
}

fn price(v: &Value) -> Option<f64> {
    match v {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
