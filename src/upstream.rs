// Upstream client: every proxy route talks to the workflow backend
// through this one fetch-and-decode-or-fail surface.
use crate::config::UpstreamConfig;
use anyhow::Result;
use axum::http::StatusCode;
use reqwest::header::COOKIE;
use reqwest::multipart::Form;
use reqwest::RequestBuilder;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Cookie name the backend expects its session under. Deliberately not the
/// console cookie name; the token is re-keyed on every forward.
pub const UPSTREAM_SESSION_COOKIE: &str = "backend_session";

const BODY_SNIPPET_LIMIT: usize = 200;

/// Tagged outcome of an upstream call. Routes map these onto the console
/// error contract instead of inspecting reqwest errors ad hoc.
#[derive(Debug)]
pub enum UpstreamError {
    /// Network-level failure: connect, timeout, broken transfer.
    Unavailable(String),
    /// Non-success HTTP status from the backend, with a body snippet.
    Status(StatusCode, String),
    /// Empty or non-JSON body, or a JSON shape we refuse to guess at.
    Malformed(String),
}

impl fmt::Display for UpstreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(detail) => write!(f, "upstream unavailable: {detail}"),
            Self::Status(status, snippet) => {
                write!(f, "upstream returned {status}: {snippet}")
            }
            Self::Malformed(detail) => write!(f, "upstream body malformed: {detail}"),
        }
    }
}

impl std::error::Error for UpstreamError {}

pub struct UpstreamClient {
    http: reqwest::Client,
    rest_base: String,
    webhook_base: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_s.max(1)))
            .build()?;
        Ok(Self {
            http,
            rest_base: trim_base(&config.base_url),
            webhook_base: trim_base(config.webhook_base()),
        })
    }

    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/{}", self.rest_base, path.trim_start_matches('/'))
    }

    pub fn webhook_url(&self, path: &str) -> String {
        format!("{}/webhook/{}", self.webhook_base, path.trim_start_matches('/'))
    }

    pub fn get_rest(&self, path: &str, token: &str) -> RequestBuilder {
        self.with_session(self.http.get(self.rest_url(path)), Some(token))
    }

    pub fn post_rest_json(&self, path: &str, token: Option<&str>, body: &Value) -> RequestBuilder {
        self.with_session(self.http.post(self.rest_url(path)), token)
            .json(body)
    }

    pub fn get_webhook(&self, path: &str, token: &str) -> RequestBuilder {
        self.with_session(self.http.get(self.webhook_url(path)), Some(token))
    }

    pub fn post_webhook_json(&self, path: &str, token: &str, body: &Value) -> RequestBuilder {
        self.with_session(self.http.post(self.webhook_url(path)), Some(token))
            .json(body)
    }

    pub fn put_webhook_json(&self, path: &str, token: &str, body: &Value) -> RequestBuilder {
        self.with_session(self.http.put(self.webhook_url(path)), Some(token))
            .json(body)
    }

    pub fn post_webhook_multipart(&self, path: &str, token: &str, form: Form) -> RequestBuilder {
        self.with_session(self.http.post(self.webhook_url(path)), Some(token))
            .multipart(form)
    }

    fn with_session(&self, builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => {
                builder.header(COOKIE, format!("{UPSTREAM_SESSION_COOKIE}={token}"))
            }
            None => builder,
        }
    }

    /// Sends the request and decodes the body, or reports exactly why it
    /// could not. This is the only path a proxy route reads upstream JSON
    /// through.
    pub async fn fetch_json(&self, builder: RequestBuilder) -> Result<Value, UpstreamError> {
        let response = builder
            .send()
            .await
            .map_err(|err| UpstreamError::Unavailable(err.to_string()))?;
        Self::decode_json(response).await
    }

    pub async fn decode_json(response: reqwest::Response) -> Result<Value, UpstreamError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| UpstreamError::Unavailable(err.to_string()))?;
        if !status.is_success() {
            let status = StatusCode::from_u16(status.as_u16())
                .unwrap_or(StatusCode::BAD_GATEWAY);
            return Err(UpstreamError::Status(status, snippet(&body)));
        }
        if body.trim().is_empty() {
            return Err(UpstreamError::Malformed("empty body".to_string()));
        }
        serde_json::from_str(&body)
            .map_err(|err| UpstreamError::Malformed(format!("{err}: {}", snippet(&body))))
    }
}

fn trim_base(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn snippet(body: &str) -> String {
    let cleaned = body.trim();
    if cleaned.len() <= BODY_SNIPPET_LIMIT {
        cleaned.to_string()
    } else {
        let mut end = BODY_SNIPPET_LIMIT;
        while !cleaned.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &cleaned[..end])
    }
}

/// Normalizes the record-list shapes the backend is known to produce:
/// a bare array, `{data: {results: []}}`, or `{data: []}`. Anything else
/// fails loudly instead of turning into a silent empty list.
pub fn normalize_record_list(value: &Value) -> Result<Vec<Value>, UpstreamError> {
    if let Some(items) = value.as_array() {
        return Ok(items.clone());
    }
    if let Some(items) = value
        .get("data")
        .and_then(|data| data.get("results"))
        .and_then(Value::as_array)
    {
        return Ok(items.clone());
    }
    if let Some(items) = value.get("data").and_then(Value::as_array) {
        return Ok(items.clone());
    }
    Err(UpstreamError::Malformed(
        "unrecognized record list shape".to_string(),
    ))
}

/// Accepts numbers and stringified numbers; anything else is `None`.
pub fn value_to_i64(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_to_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(raw) => {
            let cleaned = raw.trim();
            if cleaned.is_empty() {
                None
            } else {
                Some(cleaned.to_string())
            }
        }
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub fn value_to_bool(value: Option<&Value>, default: bool) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        },
        Some(Value::Number(number)) => number.as_i64().map(|n| n != 0).unwrap_or(default),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_list_accepts_known_shapes() {
        let bare = json!([{ "a": 1 }, { "b": 2 }]);
        assert_eq!(normalize_record_list(&bare).unwrap().len(), 2);

        let nested = json!({ "data": { "results": [{ "a": 1 }] } });
        assert_eq!(normalize_record_list(&nested).unwrap().len(), 1);

        let wrapped = json!({ "data": [] });
        assert!(normalize_record_list(&wrapped).unwrap().is_empty());
    }

    #[test]
    fn record_list_rejects_unknown_shapes() {
        let odd = json!({ "rows": [1, 2, 3] });
        let err = normalize_record_list(&odd).unwrap_err();
        assert!(matches!(err, UpstreamError::Malformed(_)));
    }

    #[test]
    fn scalar_coercion() {
        assert_eq!(value_to_i64(Some(&json!("150"))), Some(150));
        assert_eq!(value_to_i64(Some(&json!(150))), Some(150));
        assert_eq!(value_to_i64(Some(&json!("abc"))), None);
        assert_eq!(value_to_i64(None), None);

        assert_eq!(value_to_string(Some(&json!("  x "))), Some("x".to_string()));
        assert_eq!(value_to_string(Some(&json!(""))), None);
        assert_eq!(value_to_string(Some(&json!(7))), Some("7".to_string()));

        assert!(value_to_bool(Some(&json!("true")), false));
        assert!(!value_to_bool(Some(&json!(0)), true));
        assert!(value_to_bool(None, true));
    }

    #[test]
    fn urls_are_composed_from_bases() {
        let mut config = UpstreamConfig::default();
        config.base_url = "http://backend:5678/".to_string();
        let client = UpstreamClient::new(&config).unwrap();
        assert_eq!(client.rest_url("login"), "http://backend:5678/rest/login");
        assert_eq!(
            client.webhook_url("/content-storage"),
            "http://backend:5678/webhook/content-storage"
        );
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let long = "x".repeat(500);
        assert!(snippet(&long).len() < 500);
        assert_eq!(snippet("short"), "short");
    }
}
