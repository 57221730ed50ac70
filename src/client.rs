// Console client used by the CLI: a thin reqwest wrapper over the
// console surface that carries the session cookie between calls.
use crate::auth::SESSION_COOKIE;
use crate::polling::ExecutionSource;
use crate::schemas::{ChatReply, CreditsSummary, DocumentRecord, Execution, FolderStat};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Clone)]
pub struct ConsoleClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ConsoleClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authed(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("not logged in"))?;
        Ok(builder.header(COOKIE, format!("{SESSION_COOKIE}={token}")))
    }

    /// Logs in and captures the session cookie for subsequent calls.
    pub async fn login(&mut self, identifier: &str, password: &str) -> Result<()> {
        let response = self
            .http
            .post(self.url("/api/session/login"))
            .json(&json!({ "identifier": identifier, "password": password }))
            .send()
            .await
            .context("login request failed")?;

        let token = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(parse_session_cookie);

        let payload = expect_success(response).await?;
        debug_assert_eq!(payload.get("success"), Some(&json!(true)));
        self.token = Some(token.ok_or_else(|| anyhow!("login reply set no session cookie"))?);
        Ok(())
    }

    pub async fn me(&self) -> Result<Value> {
        let builder = self.authed(self.http.get(self.url("/api/session/me")))?;
        let payload = expect_success(builder.send().await?).await?;
        Ok(payload.get("user").cloned().unwrap_or(Value::Null))
    }

    pub async fn folders(&self) -> Result<Vec<FolderStat>> {
        let builder = self.authed(self.http.get(self.url("/api/storage/folders")))?;
        let payload = expect_success(builder.send().await?).await?;
        let folders = payload.get("folders").cloned().unwrap_or(Value::Null);
        serde_json::from_value(folders).context("parse folder listing failed")
    }

    pub async fn folder(&self, name: &str) -> Result<FolderStat> {
        let builder = self.authed(
            self.http
                .get(self.url("/api/storage/folders"))
                .query(&[("folder", name)]),
        )?;
        let payload = expect_success(builder.send().await?).await?;
        let folder = payload.get("folder").cloned().unwrap_or(Value::Null);
        serde_json::from_value(folder).context("parse folder stat failed")
    }

    pub async fn documents(&self) -> Result<Vec<DocumentRecord>> {
        let builder = self.authed(self.http.get(self.url("/api/documents")))?;
        let payload = expect_success(builder.send().await?).await?;
        let documents = payload.get("documents").cloned().unwrap_or(Value::Null);
        serde_json::from_value(documents).context("parse document listing failed")
    }

    pub async fn credits(&self) -> Result<CreditsSummary> {
        let builder = self.authed(self.http.get(self.url("/api/credits")))?;
        let payload = expect_success(builder.send().await?).await?;
        let credits = payload.get("credits").cloned().unwrap_or(Value::Null);
        serde_json::from_value(credits).context("parse credits failed")
    }

    pub async fn load_document(&self, file_id: &str) -> Result<String> {
        let builder = self.authed(
            self.http
                .get(self.url("/api/documents/content"))
                .query(&[("file_id", file_id)]),
        )?;
        let payload = expect_success(builder.send().await?).await?;
        Ok(payload
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    pub async fn save_document(&self, file_id: &str, content: &str) -> Result<()> {
        let builder = self.authed(
            self.http
                .put(self.url("/api/documents/content"))
                .json(&json!({ "file_id": file_id, "content": content })),
        )?;
        expect_success(builder.send().await?).await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn review_chat(
        &self,
        conversation_id: &str,
        file_id: &str,
        document_text: &str,
        message: &str,
        persona: &str,
        mode: &str,
    ) -> Result<ChatReply> {
        let builder = self.authed(
            self.http
                .post(self.url("/api/chat/review"))
                .json(&json!({
                    "conversation_id": conversation_id,
                    "file_id": file_id,
                    "document_text": document_text,
                    "message": message,
                    "persona": persona,
                    "mode": mode,
                })),
        )?;
        let payload = expect_success(builder.send().await?).await?;
        let reply = payload.get("reply").cloned().unwrap_or(Value::Null);
        serde_json::from_value(reply).context("parse chat reply failed")
    }
}

#[async_trait]
impl ExecutionSource for ConsoleClient {
    async fn fetch_execution(&self, id: &str) -> Result<Execution> {
        let builder = self.authed(self.http.get(self.url(&format!("/api/executions/{id}"))))?;
        let payload = expect_success(builder.send().await?).await?;
        let execution = payload.get("execution").cloned().unwrap_or(Value::Null);
        serde_json::from_value(execution).context("parse execution failed")
    }
}

async fn expect_success(response: reqwest::Response) -> Result<Value> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let payload: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
    if !status.is_success() {
        let detail = payload
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        bail!("console returned {status}: {detail}");
    }
    if payload.is_null() {
        bail!("console returned a non-JSON body");
    }
    Ok(payload)
}

fn parse_session_cookie(raw: &str) -> Option<String> {
    let pair = raw.split(';').next()?.trim();
    let value = pair.strip_prefix(&format!("{SESSION_COOKIE}="))?;
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_session_cookie_out_of_set_cookie() {
        let raw = format!("{SESSION_COOKIE}=tok_abc; HttpOnly; SameSite=Lax; Path=/");
        assert_eq!(parse_session_cookie(&raw), Some("tok_abc".to_string()));
        assert_eq!(parse_session_cookie("other=1; Path=/"), None);
        assert_eq!(parse_session_cookie(&format!("{SESSION_COOKIE}=")), None);
    }

    #[test]
    fn base_url_is_trimmed() {
        let client = ConsoleClient::new("http://127.0.0.1:8600/").unwrap();
        assert_eq!(client.url("/api/credits"), "http://127.0.0.1:8600/api/credits");
    }
}
