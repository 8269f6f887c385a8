//! HTTP client for a hosted table API (PostgREST dialect) and its auth service.

use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Arc, RwLock};

use crate::domain::error::DomainError;
use crate::domain::repository::Result;
use crate::infrastructure::config::{RestConfig, RestSettings};

struct Inner {
    http: Client,
    base_url: String,
    schema_path: String,
    auth_path: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

/// Shared handle; clones talk to the same backend with the same session token
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<Inner>,
}

impl RestClient {
    pub fn new(settings: &RestSettings, config: &RestConfig) -> Result<Self> {
        if settings.url.trim().is_empty() {
            return Err(DomainError::Config(
                "storage.rest.url is not set in settings.yaml".to_string(),
            ));
        }
        if settings.anon_key.trim().is_empty() {
            return Err(DomainError::Config(
                "storage.rest.anon_key is not set in settings.yaml".to_string(),
            ));
        }

        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DomainError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            inner: Arc::new(Inner {
                http,
                base_url: settings.url.trim().trim_end_matches('/').to_string(),
                schema_path: normalize_path(&config.schema_path),
                auth_path: normalize_path(&config.auth_path),
                anon_key: settings.anon_key.trim().to_string(),
                access_token: RwLock::new(None),
            }),
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.inner.base_url, self.inner.schema_path, table)
    }

    pub fn auth_url(&self, endpoint: &str) -> String {
        format!(
            "{}{}/{}",
            self.inner.base_url,
            self.inner.auth_path,
            endpoint.trim_start_matches('/')
        )
    }

    pub fn access_token(&self) -> Option<String> {
        self.inner
            .access_token
            .read()
            .ok()
            .and_then(|token| token.clone())
    }

    pub fn set_access_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.inner.access_token.write() {
            *slot = token;
        }
    }

    pub(crate) fn http(&self) -> &Client {
        &self.inner.http
    }

    /// Attach the API key and the user's token (or the API key when signed out)
    pub(crate) fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token()
            .unwrap_or_else(|| self.inner.anon_key.clone());
        request
            .header("apikey", &self.inner.anon_key)
            .bearer_auth(bearer)
    }

    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let request = self
            .authorize(self.http().get(self.table_url(table)))
            .query(query);

        tracing::debug!(table, ?query, "REST select");
        let response = check(request.send().await?).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    /// Insert rows and return them as stored
    pub async fn insert<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        table: &str,
        rows: &B,
    ) -> Result<Vec<T>> {
        let request = self
            .authorize(self.http().post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(rows);

        tracing::debug!(table, "REST insert");
        let response = check(request.send().await?).await?;
        Ok(response.json::<Vec<T>>().await?)
    }

    /// Insert rows, skipping ones that collide on `on_conflict`
    pub async fn insert_ignoring_duplicates<B: Serialize + ?Sized>(
        &self,
        table: &str,
        rows: &B,
        on_conflict: &str,
    ) -> Result<()> {
        let request = self
            .authorize(self.http().post(self.table_url(table)))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "return=minimal,resolution=ignore-duplicates")
            .json(rows);

        tracing::debug!(table, "REST insert (ignore duplicates)");
        check(request.send().await?).await?;
        Ok(())
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

/// Turn a non-success response into a `DomainError` carrying the server's message
pub(crate) async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });

    tracing::warn!(status = status.as_u16(), %message, "REST request failed");
    Err(DomainError::Backend {
        status: status.as_u16(),
        message,
    })
}

/// Extract a readable message from a table-API or auth-API error body
pub(crate) fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let text = |key: &str| {
        value
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let mut message = text("message")
        .or_else(|| text("msg"))
        .or_else(|| text("error_description"))
        .or_else(|| text("error"))?;

    if let Some(details) = text("details") {
        message.push_str(&format!(" ({})", details));
    }
    if let Some(hint) = text("hint") {
        message.push_str(&format!(" Hint: {}", hint));
    }
    Some(message)
}

// ====== Filter helpers ======

pub fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

/// `in.("a","b")` with values quoted so commas and parentheses are literal
pub fn in_list(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

/// Case-insensitive substring filter; LIKE wildcards in the input match literally
pub fn ilike_contains(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '*' => {}
            '%' | '_' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    format!("ilike.*{}*", escaped)
}

// ====== Identifier decoding ======

#[derive(Deserialize)]
#[serde(untagged)]
enum IdValue {
    Text(String),
    Int(i64),
}

impl From<IdValue> for String {
    fn from(value: IdValue) -> Self {
        match value {
            IdValue::Text(s) => s,
            IdValue::Int(n) => n.to_string(),
        }
    }
}

/// Accept text (uuid) or integer primary keys
pub(crate) fn id<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    IdValue::deserialize(deserializer).map(String::from)
}

pub(crate) fn optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Option::<IdValue>::deserialize(deserializer).map(|v| v.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(url: &str) -> RestClient {
        RestClient::new(
            &RestSettings {
                url: url.into(),
                anon_key: "public".into(),
            },
            &RestConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_urls() {
        let c = client("https://demo.example.co/");
        assert_eq!(c.table_url("players"), "https://demo.example.co/rest/v1/players");
        assert_eq!(c.auth_url("/user"), "https://demo.example.co/auth/v1/user");
    }

    #[test]
    fn test_missing_settings_are_config_errors() {
        let err = RestClient::new(&RestSettings::default(), &RestConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, DomainError::Config(_)));
    }

    #[test]
    fn test_access_token_is_shared_between_clones() {
        let c = client("https://demo.example.co");
        let other = c.clone();
        c.set_access_token(Some("jwt".into()));
        assert_eq!(other.access_token().as_deref(), Some("jwt"));
    }

    #[test]
    fn test_filters() {
        assert_eq!(eq("u1"), "eq.u1");
        assert_eq!(
            in_list(&["a".to_string(), "b,c".to_string(), "q\"x".to_string()]),
            "in.(\"a\",\"b,c\",\"q\\\"x\")"
        );
        assert_eq!(ilike_contains("Ada"), "ilike.*Ada*");
        assert_eq!(ilike_contains("5*%_"), "ilike.*5\\%\\_*");
    }

    #[test]
    fn test_error_message_shapes() {
        let table = r#"{"code":"42501","details":null,"hint":null,"message":"permission denied for table groups"}"#;
        assert_eq!(
            error_message(table).as_deref(),
            Some("permission denied for table groups")
        );

        let detailed = r#"{"message":"duplicate key","details":"Key (name)=(x) exists.","hint":"rename"}"#;
        assert_eq!(
            error_message(detailed).as_deref(),
            Some("duplicate key (Key (name)=(x) exists.) Hint: rename")
        );

        let auth = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(error_message(auth).as_deref(), Some("Invalid login credentials"));

        assert_eq!(error_message("<html>bad gateway</html>"), None);
    }

    #[derive(Deserialize)]
    struct Row {
        #[serde(deserialize_with = "id")]
        id: String,
        #[serde(default, deserialize_with = "optional_id")]
        owner: Option<String>,
    }

    #[test]
    fn test_ids_accept_numbers_and_text() {
        let rows: Vec<Row> = serde_json::from_str(
            r#"[{"id":42,"owner":"7d0c"},{"id":"9f1e","owner":null},{"id":"x"}]"#,
        )
        .unwrap();
        assert_eq!(rows[0].id, "42");
        assert_eq!(rows[0].owner.as_deref(), Some("7d0c"));
        assert_eq!(rows[1].owner, None);
        assert_eq!(rows[2].owner, None);
    }
}
