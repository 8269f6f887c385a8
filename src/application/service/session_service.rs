use crate::application::eventbus::SharedEventBus;
use crate::domain::error::DomainError;
use crate::domain::event::DomainEvent;
use crate::domain::model::Session;
use crate::domain::repository::{Result, SessionProvider};

pub struct SessionService<S: SessionProvider> {
    provider: S,
    event_bus: SharedEventBus,
}

impl<S: SessionProvider> SessionService<S> {
    pub fn new(provider: S, event_bus: SharedEventBus) -> Self {
        Self {
            provider,
            event_bus,
        }
    }

    pub async fn current(&self) -> Result<Option<Session>> {
        let session = self.provider.current_session().await?;

        match &session {
            Some(s) => tracing::info!(user_id = %s.user_id, "Session resolved"),
            None => tracing::info!("No active session"),
        }

        self.event_bus.publish(DomainEvent::SessionResolved {
            user_id: session.as_ref().map(|s| s.user_id.clone()),
        });

        Ok(session)
    }

    /// Like `current`, but a missing session is an error
    pub async fn require(&self) -> Result<Session> {
        self.current().await?.ok_or(DomainError::Unauthenticated)
    }
}
