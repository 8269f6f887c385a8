//! Session handling against the hosted auth service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::error::DomainError;
use crate::domain::model::Session;
use crate::domain::repository::{Result, SessionProvider};
use crate::infrastructure::config::{loader, SessionSettings};
use crate::infrastructure::persistence::rest::client::{self, check};
use crate::infrastructure::persistence::rest::RestClient;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    #[serde(deserialize_with = "client::id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<AuthUser> for Session {
    fn from(user: AuthUser) -> Self {
        Session {
            user_id: user.id,
            email: user.email,
        }
    }
}

/// Tokens issued by a sign-in or refresh
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

pub async fn sign_in_with_password(
    client: &RestClient,
    email: &str,
    password: &str,
) -> Result<AuthTokens> {
    let request = client
        .authorize(client.http().post(client.auth_url("token")))
        .query(&[("grant_type", "password")])
        .json(&PasswordGrant { email, password });

    let tokens: AuthTokens = check(request.send().await?).await?.json().await?;
    client.set_access_token(Some(tokens.access_token.clone()));
    tracing::info!(user_id = %tokens.user.id, "Signed in");
    Ok(tokens)
}

pub async fn refresh_session(client: &RestClient, refresh_token: &str) -> Result<AuthTokens> {
    let request = client
        .authorize(client.http().post(client.auth_url("token")))
        .query(&[("grant_type", "refresh_token")])
        .json(&RefreshGrant { refresh_token });

    let tokens: AuthTokens = check(request.send().await?).await?.json().await?;
    client.set_access_token(Some(tokens.access_token.clone()));
    tracing::info!(user_id = %tokens.user.id, "Session refreshed");
    Ok(tokens)
}

pub async fn fetch_user(client: &RestClient) -> Result<AuthUser> {
    if client.access_token().is_none() {
        return Err(DomainError::Unauthenticated);
    }

    let request = client.authorize(client.http().get(client.auth_url("user")));
    let user: AuthUser = check(request.send().await?).await?.json().await?;
    Ok(user)
}

/// Copy issued tokens into the session settings. A missing refresh token keeps the old one.
pub fn apply_tokens(session: &mut SessionSettings, tokens: &AuthTokens) {
    session.access_token = Some(tokens.access_token.clone());
    if let Some(refresh) = &tokens.refresh_token {
        session.refresh_token = Some(refresh.clone());
    }
    session.email = tokens.user.email.clone();
}

/// Write tokens to settings.yaml so the next run starts signed in
pub fn persist_tokens(tokens: &AuthTokens) -> anyhow::Result<()> {
    let mut settings = loader::load_user_settings();
    apply_tokens(&mut settings.session, tokens);
    loader::save_user_settings(&settings)
}

/// Called with fresh tokens after a refresh so they can be persisted
pub type TokenSink = Box<dyn Fn(&AuthTokens) + Send + Sync>;

/// Resolves the session from the stored access token, refreshing it once when expired
pub struct RestSessionProvider {
    client: RestClient,
    refresh_token: Mutex<Option<String>>,
    on_refresh: Option<TokenSink>,
}

impl RestSessionProvider {
    pub fn new(
        client: RestClient,
        access_token: Option<String>,
        refresh_token: Option<String>,
    ) -> Self {
        client.set_access_token(access_token.filter(|t| !t.is_empty()));
        Self {
            client,
            refresh_token: Mutex::new(refresh_token.filter(|t| !t.is_empty())),
            on_refresh: None,
        }
    }

    pub fn with_token_sink(mut self, sink: TokenSink) -> Self {
        self.on_refresh = Some(sink);
        self
    }
}

#[async_trait]
impl SessionProvider for RestSessionProvider {
    async fn current_session(&self) -> Result<Option<Session>> {
        let mut refresh_token = self.refresh_token.lock().await;

        if self.client.access_token().is_some() {
            match fetch_user(&self.client).await {
                Ok(user) => return Ok(Some(user.into())),
                Err(e) if e.is_auth_failure() => {
                    tracing::info!("Access token rejected: {}", e);
                    self.client.set_access_token(None);
                }
                Err(e) => return Err(e),
            }
        }

        let Some(token) = refresh_token.clone() else {
            return Ok(None);
        };

        match refresh_session(&self.client, &token).await {
            Ok(tokens) => {
                if let Some(next) = tokens.refresh_token.clone() {
                    *refresh_token = Some(next);
                }
                if let Some(sink) = &self.on_refresh {
                    sink(&tokens);
                }
                Ok(Some(tokens.user.into()))
            }
            Err(e) if e.is_auth_failure() || matches!(e, DomainError::Backend { status: 400, .. }) => {
                tracing::warn!("Refresh token rejected: {}", e);
                *refresh_token = None;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::{RestConfig, RestSettings};

    #[test]
    fn test_token_response_decodes() {
        let json = r#"{
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": {"id": "0b5c", "email": "ada@example.com", "role": "authenticated"}
        }"#;
        let tokens: AuthTokens = serde_json::from_str(json).unwrap();
        let session: Session = tokens.user.into();
        assert_eq!(session.user_id, "0b5c");
        assert_eq!(session.display_name(), "ada@example.com");
        assert_eq!(tokens.refresh_token.as_deref(), Some("r1"));
    }

    #[test]
    fn test_apply_tokens_keeps_refresh_token_when_absent() {
        let mut session = SessionSettings {
            refresh_token: Some("old".into()),
            ..Default::default()
        };
        let tokens = AuthTokens {
            access_token: "jwt".into(),
            refresh_token: None,
            user: AuthUser {
                id: "u1".into(),
                email: Some("ada@example.com".into()),
            },
        };

        apply_tokens(&mut session, &tokens);
        assert_eq!(session.access_token.as_deref(), Some("jwt"));
        assert_eq!(session.refresh_token.as_deref(), Some("old"));
        assert_eq!(session.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn test_no_tokens_means_signed_out_without_network() {
        let client = RestClient::new(
            &RestSettings {
                url: "http://127.0.0.1:9".into(),
                anon_key: "public".into(),
            },
            &RestConfig::default(),
        )
        .unwrap();

        let provider = RestSessionProvider::new(client.clone(), Some(String::new()), None);
        assert!(client.access_token().is_none());
        assert_eq!(provider.current_session().await.unwrap(), None);
    }
}
