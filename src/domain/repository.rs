use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::error::DomainError;
use crate::domain::model::{GroupRecord, Membership, NewGroup, Player, Session};

pub type Result<T> = std::result::Result<T, DomainError>;

/// Repository trait for Player entity
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    /// Players owned by the given user
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Player>>;

    /// Case-insensitive substring match on the display name, ordered by name
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>>;

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Player>>;

    /// Avatar lookup keyed by the owning user
    async fn avatar_url(&self, user_id: &str) -> Result<Option<String>>;
}

/// Repository trait for Group entity and its join relation
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn find_owned_by(&self, user_id: &str) -> Result<Vec<GroupRecord>>;

    /// Groups that contain at least one of the given players
    async fn find_with_players(&self, player_ids: &[String]) -> Result<Vec<GroupRecord>>;

    async fn memberships(&self, group_ids: &[String]) -> Result<Vec<Membership>>;

    async fn create(&self, group: &NewGroup) -> Result<GroupRecord>;

    async fn add_members(&self, group_id: &str, player_ids: &[String]) -> Result<()>;
}

/// Source of the currently signed-in user
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>>;
}

// Shared handles dispatch to the inner repository
#[async_trait]
impl<T: PlayerRepository + ?Sized> PlayerRepository for Arc<T> {
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<Player>> {
        (**self).find_by_user(user_id).await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Player>> {
        (**self).search(query, limit).await
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<Player>> {
        (**self).find_by_ids(ids).await
    }

    async fn avatar_url(&self, user_id: &str) -> Result<Option<String>> {
        (**self).avatar_url(user_id).await
    }
}

#[async_trait]
impl<T: GroupRepository + ?Sized> GroupRepository for Arc<T> {
    async fn find_owned_by(&self, user_id: &str) -> Result<Vec<GroupRecord>> {
        (**self).find_owned_by(user_id).await
    }

    async fn find_with_players(&self, player_ids: &[String]) -> Result<Vec<GroupRecord>> {
        (**self).find_with_players(player_ids).await
    }

    async fn memberships(&self, group_ids: &[String]) -> Result<Vec<Membership>> {
        (**self).memberships(group_ids).await
    }

    async fn create(&self, group: &NewGroup) -> Result<GroupRecord> {
        (**self).create(group).await
    }

    async fn add_members(&self, group_id: &str, player_ids: &[String]) -> Result<()> {
        (**self).add_members(group_id, player_ids).await
    }
}

#[async_trait]
impl<T: SessionProvider + ?Sized> SessionProvider for Arc<T> {
    async fn current_session(&self) -> Result<Option<Session>> {
        (**self).current_session().await
    }
}
