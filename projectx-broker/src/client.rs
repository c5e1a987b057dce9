use crate::accounts::map_account_rows;
use crate::config::ProjectXConfig;
use crate::normalizer::normalize_trade_row;
use crate::stream::TradeStream;
use crate::token::{parse_token_expiry, TokenCache};
use chrono::{DateTime, Utc};
use model::payload::{first_value, string_or_none, unwrap_list};
use model::time::iso_utc;
use model::{AccountSummary, TradeEvent, TradeHistoryProvider, UpstreamError};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::runtime::Runtime;

const ERROR_KEYS: [&str; 6] = ["detail", "errorMessage", "message", "title", "error", "errors"];
const TOKEN_KEYS: [&str; 4] = ["token", "accessToken", "jwt", "jwtToken"];

/// Thin HTTP wrapper around the documented ProjectX gateway endpoints.
///
/// The public surface is synchronous in the manner of the rest of the
/// workspace; requests run on a dedicated runtime internally.
pub struct ProjectXClient {
    config: ProjectXConfig,
    http: reqwest::Client,
    runtime: Runtime,
    token_cache: Arc<TokenCache>,
}

impl std::fmt::Debug for ProjectXClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectXClient")
            .field("base_url", &self.config.base_url)
            .field("username", &self.config.username)
            .finish()
    }
}

impl ProjectXClient {
    /// Build a client from explicit connection settings.
    pub fn new(config: ProjectXConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| UpstreamError::message(format!("Failed to build HTTP client: {e}")))?;
        let runtime = Runtime::new()
            .map_err(|e| UpstreamError::message(format!("Failed to start client runtime: {e}")))?;
        Ok(ProjectXClient {
            config,
            http,
            runtime,
            token_cache: Arc::new(TokenCache::new()),
        })
    }

    /// Build a client from the environment credential groups.
    pub fn from_env() -> Result<Self, UpstreamError> {
        Self::new(ProjectXConfig::from_env()?)
    }

    /// Fetch normalized trade history for one window, sorted ascending.
    pub fn fetch_trade_history(
        &self,
        account_id: i64,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<TradeEvent>, UpstreamError> {
        let mut payload = Map::new();
        payload.insert("accountId".to_string(), Value::from(account_id));
        payload.insert("startTimestamp".to_string(), Value::from(iso_utc(start)));
        if let Some(end) = end {
            payload.insert("endTimestamp".to_string(), Value::from(iso_utc(end)));
        }
        if let Some(limit) = limit {
            payload.insert("limit".to_string(), Value::from(limit.max(1)));
        }
        if let Some(offset) = offset {
            payload.insert("offset".to_string(), Value::from(offset));
        }

        let data = self.request("/api/Trade/search", &Value::Object(payload), true)?;
        let rows = unwrap_list(&data, &["trades", "data", "items"]);
        let mut events: Vec<TradeEvent> = rows
            .iter()
            .filter_map(|row| normalize_trade_row(account_id, row))
            .collect();
        events.sort_by(|a, b| a.trade_timestamp.cmp(&b.trade_timestamp));
        Ok(events)
    }

    /// List active, tradeable accounts sorted ascending by id.
    pub fn list_accounts(&self) -> Result<Vec<AccountSummary>, UpstreamError> {
        let mut payload = Map::new();
        payload.insert("onlyActiveAccounts".to_string(), Value::Bool(true));
        let data = self.request("/api/Account/search", &Value::Object(payload), true)?;
        Ok(map_account_rows(&data))
    }

    /// Poll-based stream interface for user trade events.
    ///
    /// This keeps a stream-like API surface without requiring a push
    /// transport; drop the iterator to cancel.
    pub fn stream_user_trades(
        &self,
        account_id: i64,
        start: Option<DateTime<Utc>>,
        poll_interval_seconds: u64,
    ) -> TradeStream<'_> {
        TradeStream::new(self, account_id, start, poll_interval_seconds)
    }

    fn request(
        &self,
        path: &str,
        payload: &Value,
        with_auth: bool,
    ) -> Result<Value, UpstreamError> {
        match self.request_once(path, payload, with_auth) {
            Err(err) if with_auth && err.status() == Some(401) => {
                // Stale token: drop it and retry exactly once.
                self.token_cache.clear();
                self.request_once(path, payload, with_auth)
            }
            other => other,
        }
    }

    fn request_once(
        &self,
        path: &str,
        payload: &Value,
        with_auth: bool,
    ) -> Result<Value, UpstreamError> {
        let url = format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );

        let mut builder = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(payload);
        if with_auth {
            builder = builder.bearer_auth(self.access_token()?);
        }

        let response = self
            .runtime
            .block_on(builder.send())
            .map_err(|e| UpstreamError::message(format!("ProjectX network error: {e}")))?;
        let status = response.status();
        let raw = self
            .runtime
            .block_on(response.text())
            .map_err(|e| UpstreamError::message(format!("ProjectX network error: {e}")))?;

        if !status.is_success() {
            let detail = extract_error_text(&raw);
            return Err(UpstreamError::with_status(
                format!("ProjectX request failed ({}): {detail}", status.as_u16()),
                status.as_u16(),
            ));
        }

        if raw.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        let parsed: Value = serde_json::from_str(&raw)
            .map_err(|_| UpstreamError::message("ProjectX returned a non-JSON response."))?;

        if parsed.get("success") == Some(&Value::Bool(false)) {
            let message = extract_error_message(&parsed);
            return Err(UpstreamError::message(format!("ProjectX error: {message}")));
        }

        Ok(parsed)
    }

    fn access_token(&self) -> Result<String, UpstreamError> {
        let now = Utc::now();
        if let Some(token) = self.token_cache.fresh_token(now) {
            return Ok(token);
        }

        // Refresh outside the cache lock; only the final write holds it.
        let mut payload = Map::new();
        payload.insert(
            "userName".to_string(),
            Value::from(self.config.username.clone()),
        );
        payload.insert(
            "apiKey".to_string(),
            Value::from(self.config.api_key.clone()),
        );
        let data = self.request_once("/api/Auth/loginKey", &Value::Object(payload), false)?;
        if !data.is_object() {
            return Err(UpstreamError::message(
                "ProjectX auth response format was invalid.",
            ));
        }

        let token = first_value(&data, &TOKEN_KEYS)
            .and_then(string_or_none)
            .ok_or_else(|| {
                UpstreamError::message("ProjectX auth succeeded but no token was returned.")
            })?;

        let expires_at = parse_token_expiry(&data, now);
        self.token_cache.store(token.clone(), expires_at);
        Ok(token)
    }
}

impl TradeHistoryProvider for ProjectXClient {
    fn list_accounts(&self) -> Result<Vec<AccountSummary>, UpstreamError> {
        ProjectXClient::list_accounts(self)
    }

    fn fetch_trade_history(
        &self,
        account_id: i64,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Vec<TradeEvent>, UpstreamError> {
        ProjectXClient::fetch_trade_history(self, account_id, start, end, limit, offset)
    }
}

/// Pull the most useful human-readable message out of an error envelope.
fn extract_error_message(raw: &Value) -> String {
    if let Some(object) = raw.as_object() {
        for key in ERROR_KEYS {
            let Some(value) = object.get(key) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            if let Some(text) = value.as_str() {
                return text.to_string();
            }
            if let Some(items) = value.as_array() {
                let rendered: Vec<String> = items
                    .iter()
                    .map(|item| {
                        item.as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| item.to_string())
                    })
                    .collect();
                return rendered.join("; ");
            }
            return value.to_string();
        }
        return "Unknown error".to_string();
    }

    if let Some(text) = raw.as_str() {
        return extract_error_text(text);
    }

    "Unknown error".to_string()
}

fn extract_error_text(raw: &str) -> String {
    let text = raw.trim();
    if text.is_empty() {
        return "Unknown error".to_string();
    }
    match serde_json::from_str::<Value>(text) {
        Ok(Value::String(inner)) => extract_error_text(&inner),
        Ok(parsed) if parsed.is_object() => extract_error_message(&parsed),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_extraction_prefers_the_documented_keys_in_order() {
        let payload = json!({"message": "later", "detail": "first"});
        assert_eq!(extract_error_message(&payload), "first");

        let list = json!({"errors": ["bad start", "bad end"]});
        assert_eq!(extract_error_message(&list), "bad start; bad end");

        let nested = json!({"error": {"code": 7}});
        assert_eq!(extract_error_message(&nested), r#"{"code":7}"#);

        assert_eq!(extract_error_message(&json!({})), "Unknown error");
        assert_eq!(extract_error_message(&json!(null)), "Unknown error");
    }

    #[test]
    fn error_text_parses_embedded_json_bodies() {
        assert_eq!(
            extract_error_text(r#"{"errorMessage": "account not found"}"#),
            "account not found"
        );
        assert_eq!(extract_error_text("plain failure"), "plain failure");
        assert_eq!(extract_error_text("   "), "Unknown error");
    }
}
