//! Session providers for the local and hosted backends

pub mod rest;

use async_trait::async_trait;

use crate::domain::model::Session;
use crate::domain::repository::{Result, SessionProvider};

pub use rest::RestSessionProvider;

/// Session for the local backends: the user id configured in settings or on the command line
pub struct LocalSessionProvider {
    user_id: Option<String>,
}

impl LocalSessionProvider {
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id: user_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }
}

#[async_trait]
impl SessionProvider for LocalSessionProvider {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.user_id.clone().map(Session::new))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_user_is_signed_out() {
        let provider = LocalSessionProvider::new(Some("  ".into()));
        assert_eq!(provider.current_session().await.unwrap(), None);

        let provider = LocalSessionProvider::new(Some(" u1 ".into()));
        assert_eq!(
            provider.current_session().await.unwrap(),
            Some(Session::new("u1"))
        );
    }
}
