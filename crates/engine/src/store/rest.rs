use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use common::{Error, KeyValueStore, Result};

/// Redis-over-REST store (Upstash style): `GET {base}/get/{key}` and
/// `GET {base}/set/{key}/{value}?EX={ttl}`, authenticated with a bearer token.
pub struct RestStore {
    base_url: Url,
    token: String,
    http: Client,
}

#[derive(Deserialize)]
struct RestReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl RestStore {
    pub fn new(base_url: &str, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid REDIS_URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!("REDIS_URL '{base_url}' cannot be a base URL")));
        }
        let http = Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;
        Ok(Self {
            base_url,
            token: token.into(),
            http,
        })
    }

    /// `{base}/{segments...}` with each segment percent-encoded.
    fn command_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config("REDIS_URL cannot be a base URL".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call(&self, url: Url) -> Result<RestReply> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| Error::Store(e.to_string()))?;
        if !status.is_success() {
            return Err(Error::Store(format!("HTTP {status}: {text}")));
        }

        let reply: RestReply =
            serde_json::from_str(&text).map_err(|e| Error::Store(e.to_string()))?;
        if let Some(err) = reply.error {
            return Err(Error::Store(err));
        }
        Ok(reply)
    }
}

#[async_trait]
impl KeyValueStore for RestStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let url = self.command_url(&["get", key])?;
        debug!(%key, "REST store GET");
        let reply = self.call(url).await?;
        Ok(match reply.result {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        })
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut url = self.command_url(&["set", key, value])?;
        url.query_pairs_mut()
            .append_pair("EX", &ttl.as_secs().max(1).to_string());
        debug!(%key, %value, ttl_secs = ttl.as_secs(), "REST store SET");
        self.call(url).await.map(|_| ())
    }

    fn backend(&self) -> &'static str {
        "rest"
    }
}
