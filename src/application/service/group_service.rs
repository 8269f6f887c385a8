use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use super::PlayerService;
use crate::application::eventbus::SharedEventBus;
use crate::domain::event::DomainEvent;
use crate::domain::model::{merge_groups, validate_group_name, Group, NewGroup, Player};
use crate::domain::repository::{GroupRepository, PlayerRepository, Result};

/// Result of the two-step group insert
#[derive(Debug, Clone, Serialize)]
pub struct CreateGroupOutcome {
    pub group: Group,
    pub members_added: usize,
    /// Set when the group row exists but its join rows could not be written
    pub warning: Option<String>,
}

pub struct GroupService<G: GroupRepository, P: PlayerRepository> {
    repo: G,
    players: Arc<PlayerService<P>>,
    event_bus: SharedEventBus,
    name_max_chars: usize,
}

impl<G: GroupRepository, P: PlayerRepository> GroupService<G, P> {
    pub fn new(
        repo: G,
        players: Arc<PlayerService<P>>,
        event_bus: SharedEventBus,
        name_max_chars: usize,
    ) -> Self {
        Self {
            repo,
            players,
            event_bus,
            name_max_chars,
        }
    }

    /// Groups the user owns plus groups containing any of the user's players
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Group>> {
        let (owned, mine) = tokio::try_join!(
            self.repo.find_owned_by(user_id),
            self.players.players_of(user_id)
        )?;

        let my_player_ids: Vec<String> = mine.into_iter().map(|p| p.id).collect();
        let joined = if my_player_ids.is_empty() {
            Vec::new()
        } else {
            self.repo.find_with_players(&my_player_ids).await?
        };

        let records = merge_groups(owned, joined);
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let group_ids: Vec<String> = records.iter().map(|g| g.id.clone()).collect();
        let memberships = self.repo.memberships(&group_ids).await?;

        let member_ids: Vec<String> = memberships
            .iter()
            .map(|m| m.player_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let members = if member_ids.is_empty() {
            Vec::new()
        } else {
            let found = self.players.repository().find_by_ids(&member_ids).await?;
            self.players.with_avatars(found).await
        };
        let by_id: HashMap<&str, &Player> = members.iter().map(|p| (p.id.as_str(), p)).collect();

        let groups: Vec<Group> = records
            .into_iter()
            .map(|record| {
                let mut players: Vec<Player> = memberships
                    .iter()
                    .filter(|m| m.group_id == record.id)
                    .filter_map(|m| by_id.get(m.player_id.as_str()).map(|p| (*p).clone()))
                    .collect();
                players.sort_by(|a, b| {
                    a.name
                        .to_lowercase()
                        .cmp(&b.name.to_lowercase())
                        .then_with(|| a.id.cmp(&b.id))
                });
                players.dedup_by(|a, b| a.id == b.id);
                Group::from_record(record, players)
            })
            .collect();

        tracing::info!(user_id, count = groups.len(), "Loaded groups");
        Ok(groups)
    }

    /// Create a group and add the selected players to it.
    ///
    /// The group row is kept even when adding its members fails; the failure is
    /// reported through `CreateGroupOutcome::warning`.
    pub async fn create(
        &self,
        user_id: &str,
        name: &str,
        player_ids: &[String],
    ) -> Result<CreateGroupOutcome> {
        let existing = self.list_for_user(user_id).await?;
        let name = validate_group_name(name, &existing, self.name_max_chars)?;

        let record = self
            .repo
            .create(&NewGroup {
                name: name.clone(),
                owner_id: Some(user_id.to_string()),
            })
            .await?;
        tracing::info!(group_id = %record.id, %name, "Group created");
        self.event_bus.publish(DomainEvent::GroupCreated {
            group_id: record.id.clone(),
            name: name.clone(),
        });

        let mut seen = HashSet::new();
        let ids: Vec<String> = player_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        if ids.is_empty() {
            return Ok(CreateGroupOutcome {
                group: Group::from_record(record, Vec::new()),
                members_added: 0,
                warning: None,
            });
        }

        match self.repo.add_members(&record.id, &ids).await {
            Ok(()) => {
                // Stores without foreign keys accept ids that match no player
                let (players, members_added) =
                    match self.players.repository().find_by_ids(&ids).await {
                        Ok(found) => {
                            let count = found.len();
                            (self.players.with_avatars(found).await, count)
                        }
                        Err(e) => {
                            tracing::warn!(group_id = %record.id, "Failed to reload members: {}", e);
                            (Vec::new(), ids.len())
                        }
                    };
                if members_added < ids.len() {
                    tracing::warn!(
                        group_id = %record.id,
                        requested = ids.len(),
                        members_added,
                        "Some player ids did not resolve"
                    );
                }

                self.event_bus.publish(DomainEvent::MembersAdded {
                    group_id: record.id.clone(),
                    count: members_added,
                });

                Ok(CreateGroupOutcome {
                    group: Group::from_record(record, players),
                    members_added,
                    warning: None,
                })
            }
            Err(e) => {
                tracing::warn!(group_id = %record.id, "Failed to add members: {}", e);
                self.event_bus.publish(DomainEvent::MembersFailed {
                    group_id: record.id.clone(),
                    reason: e.to_string(),
                });

                Ok(CreateGroupOutcome {
                    warning: Some(format!(
                        "Group \"{}\" was created, but adding players failed: {}",
                        name, e
                    )),
                    group: Group::from_record(record, Vec::new()),
                    members_added: 0,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::eventbus::EventBus;
    use crate::domain::error::DomainError;
    use crate::domain::model::{GroupRecord, Membership};
    use crate::infrastructure::persistence::sqlite::{
        fixtures, DbConnection, SqliteGroupRepository, SqlitePlayerRepository,
    };
    use async_trait::async_trait;

    /// Group store whose join-row insert always fails
    struct FailingMembers(SqliteGroupRepository);

    #[async_trait]
    impl GroupRepository for FailingMembers {
        async fn find_owned_by(&self, user_id: &str) -> Result<Vec<GroupRecord>> {
            self.0.find_owned_by(user_id).await
        }

        async fn find_with_players(&self, player_ids: &[String]) -> Result<Vec<GroupRecord>> {
            self.0.find_with_players(player_ids).await
        }

        async fn memberships(&self, group_ids: &[String]) -> Result<Vec<Membership>> {
            self.0.memberships(group_ids).await
        }

        async fn create(&self, group: &NewGroup) -> Result<GroupRecord> {
            self.0.create(group).await
        }

        async fn add_members(&self, _group_id: &str, _player_ids: &[String]) -> Result<()> {
            Err(DomainError::Backend {
                status: 403,
                message: "permission denied for table group_players".into(),
            })
        }
    }

    fn seeded() -> DbConnection {
        let db = fixtures::memory_db();
        fixtures::insert_player(&db, "p-ada", "me", "Ada");
        fixtures::insert_player(&db, "p-bob", "bob", "bob");
        fixtures::insert_player(&db, "p-cy", "cy", "Cy");
        fixtures::insert_profile(&db, "cy", "https://cdn.example/cy.png");

        // Owned by me
        fixtures::insert_group(&db, "g-own", "Owned", Some("me"), "2024-01-01T00:00:00Z");
        fixtures::insert_member(&db, "g-own", "p-bob");
        // Owned by bob, contains my player, also contains Cy
        fixtures::insert_group(&db, "g-join", "Joined", Some("bob"), "2024-02-01T00:00:00Z");
        fixtures::insert_member(&db, "g-join", "p-ada");
        fixtures::insert_member(&db, "g-join", "p-cy");
        // Owned by me and containing my player: must appear once
        fixtures::insert_group(&db, "g-both", "Both", Some("me"), "2024-03-01T00:00:00Z");
        fixtures::insert_member(&db, "g-both", "p-ada");
        // Unrelated
        fixtures::insert_group(&db, "g-other", "Other", Some("cy"), "2024-04-01T00:00:00Z");
        fixtures::insert_member(&db, "g-other", "p-cy");
        db
    }

    fn service_with<G: GroupRepository>(
        groups: G,
        db: DbConnection,
        bus: SharedEventBus,
    ) -> GroupService<G, SqlitePlayerRepository> {
        let players = Arc::new(PlayerService::new(SqlitePlayerRepository::new(db), 10, 1));
        GroupService::new(groups, players, bus, 32)
    }

    fn service(db: DbConnection) -> GroupService<SqliteGroupRepository, SqlitePlayerRepository> {
        service_with(SqliteGroupRepository::new(db.clone()), db, EventBus::shared())
    }

    #[tokio::test]
    async fn test_list_merges_owned_and_joined_without_duplicates() {
        let svc = service(seeded());
        let groups = svc.list_for_user("me").await.unwrap();

        let ids: Vec<_> = groups.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["g-both", "g-join", "g-own"]);
    }

    #[tokio::test]
    async fn test_list_loads_members_sorted_with_avatars() {
        let svc = service(seeded());
        let groups = svc.list_for_user("me").await.unwrap();

        let joined = groups.iter().find(|g| g.id == "g-join").unwrap();
        let names: Vec<_> = joined.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ada", "Cy"]);
        assert_eq!(
            joined.players[1].avatar_url.as_deref(),
            Some("https://cdn.example/cy.png")
        );
        assert!(!joined.is_owned_by("me"));
    }

    #[tokio::test]
    async fn test_list_for_stranger_is_empty() {
        let svc = service(seeded());
        assert!(svc.list_for_user("nobody").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_inserts_group_and_members() {
        let db = seeded();
        let bus = EventBus::shared();
        let mut rx = bus.subscribe();
        let svc = service_with(SqliteGroupRepository::new(db.clone()), db, bus.clone());

        let ids = vec!["p-bob".to_string(), "p-cy".to_string(), "p-bob".to_string()];
        let outcome = svc.create("me", "  Raid Night ", &ids).await.unwrap();

        assert_eq!(outcome.group.name, "Raid Night");
        assert_eq!(outcome.members_added, 2);
        assert!(outcome.warning.is_none());
        assert_eq!(outcome.group.players.len(), 2);

        assert_eq!(rx.recv().await.unwrap().event_name(), "group_created");
        assert_eq!(
            rx.recv().await.unwrap(),
            DomainEvent::MembersAdded {
                group_id: outcome.group.id.clone(),
                count: 2
            }
        );

        let listed = svc.list_for_user("me").await.unwrap();
        assert!(listed.iter().any(|g| g.name == "Raid Night" && g.players.len() == 2));
    }

    #[tokio::test]
    async fn test_create_without_players_skips_join_rows() {
        let svc = service(seeded());
        let outcome = svc.create("me", "Solo", &[]).await.unwrap();
        assert_eq!(outcome.members_added, 0);
        assert!(outcome.group.players.is_empty());
        assert!(outcome.warning.is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_duplicate_name_among_joined_groups() {
        let svc = service(seeded());
        let err = svc.create("me", "JOINED", &[]).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_create_allows_name_of_unrelated_group() {
        let svc = service(seeded());
        assert!(svc.create("me", "other", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_player_id_is_not_counted() {
        let db = seeded();
        db.lock().unwrap().execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        let svc = service(db);

        let ids = vec!["p-cy".to_string(), "p-ghost".to_string()];
        let outcome = svc.create("me", "Haunted", &ids).await.unwrap();
        assert_eq!(outcome.members_added, 1);
        assert_eq!(outcome.group.players.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_player_id_is_rejected_by_sqlite() {
        let svc = service(seeded());
        let ids = vec!["p-cy".to_string(), "p-ghost".to_string()];
        let outcome = svc.create("me", "Haunted", &ids).await.unwrap();

        assert_eq!(outcome.members_added, 0);
        assert!(outcome
            .warning
            .unwrap()
            .starts_with("Group \"Haunted\" was created, but adding players failed"));
        let listed = svc.list_for_user("me").await.unwrap();
        assert!(listed.iter().any(|g| g.name == "Haunted" && g.players.is_empty()));
    }

    #[tokio::test]
    async fn test_member_failure_keeps_group_and_warns() {
        let db = seeded();
        let bus = EventBus::shared();
        let mut rx = bus.subscribe();
        let svc = service_with(
            FailingMembers(SqliteGroupRepository::new(db.clone())),
            db,
            bus.clone(),
        );

        let outcome = svc
            .create("me", "Broken", &["p-cy".to_string()])
            .await
            .unwrap();

        assert_eq!(outcome.members_added, 0);
        let warning = outcome.warning.unwrap();
        assert!(warning.starts_with("Group \"Broken\" was created, but adding players failed"));

        assert_eq!(rx.recv().await.unwrap().event_name(), "group_created");
        assert_eq!(rx.recv().await.unwrap().event_name(), "members_failed");

        let listed = svc.list_for_user("me").await.unwrap();
        assert!(listed.iter().any(|g| g.name == "Broken" && g.players.is_empty()));
    }
}
