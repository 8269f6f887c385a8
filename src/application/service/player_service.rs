use std::collections::{HashMap, HashSet};

use futures::future::join_all;

use crate::domain::model::Player;
use crate::domain::repository::{PlayerRepository, Result};

pub struct PlayerService<R: PlayerRepository> {
    repo: R,
    search_limit: usize,
    min_search_chars: usize,
}

impl<R: PlayerRepository> PlayerService<R> {
    pub fn new(repo: R, search_limit: usize, min_search_chars: usize) -> Self {
        Self {
            repo,
            search_limit,
            min_search_chars,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Search players by display name. Short queries return nothing without a round trip.
    pub async fn search(&self, query: &str) -> Result<Vec<Player>> {
        let query = query.trim();
        if query.chars().count() < self.min_search_chars.max(1) {
            return Ok(Vec::new());
        }

        let found = self.repo.search(query, self.search_limit).await?;

        let mut seen = HashSet::new();
        let mut players: Vec<Player> = found
            .into_iter()
            .filter(|p| seen.insert(p.id.clone()))
            .collect();
        players.truncate(self.search_limit);

        tracing::debug!(query, hits = players.len(), "Player search");
        Ok(self.with_avatars(players).await)
    }

    pub async fn players_of(&self, user_id: &str) -> Result<Vec<Player>> {
        self.repo.find_by_user(user_id).await
    }

    /// Fill in avatar URLs, one lookup per distinct owning user.
    ///
    /// Lookup failures leave the avatar empty.
    pub async fn with_avatars(&self, mut players: Vec<Player>) -> Vec<Player> {
        let user_ids: Vec<String> = players
            .iter()
            .filter(|p| p.avatar_url.is_none())
            .map(|p| p.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();

        let lookups = join_all(user_ids.iter().map(|id| self.repo.avatar_url(id))).await;

        let mut avatars: HashMap<&str, Option<String>> = HashMap::new();
        for (user_id, result) in user_ids.iter().zip(lookups) {
            let avatar = match result {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(user_id = %user_id, "Avatar lookup failed: {}", e);
                    None
                }
            };
            avatars.insert(user_id.as_str(), avatar);
        }

        for player in players.iter_mut().filter(|p| p.avatar_url.is_none()) {
            if let Some(url) = avatars.get(player.user_id.as_str()).cloned().flatten() {
                player.avatar_url = Some(url);
            }
        }
        players
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::sqlite::fixtures;
    use crate::infrastructure::persistence::sqlite::SqlitePlayerRepository;

    fn service(min_chars: usize, limit: usize) -> PlayerService<SqlitePlayerRepository> {
        let db = fixtures::memory_db();
        fixtures::insert_player(&db, "p1", "u1", "Ada Lovelace");
        fixtures::insert_player(&db, "p2", "u2", "Adam Smith");
        fixtures::insert_player(&db, "p3", "u2", "Grace Hopper");
        fixtures::insert_profile(&db, "u2", "https://cdn.example/u2.png");
        PlayerService::new(SqlitePlayerRepository::new(db), limit, min_chars)
    }

    #[tokio::test]
    async fn test_short_query_returns_nothing() {
        let svc = service(2, 10);
        assert!(svc.search(" a ").await.unwrap().is_empty());
        assert!(svc.search("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_resolves_avatars() {
        let svc = service(1, 10);
        let found = svc.search("ADA").await.unwrap();

        let names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Adam Smith"]);
        assert_eq!(found[0].avatar_url, None);
        assert_eq!(
            found[1].avatar_url.as_deref(),
            Some("https://cdn.example/u2.png")
        );
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let svc = service(1, 1);
        assert_eq!(svc.search("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_players_of_user() {
        let svc = service(1, 10);
        let mine = svc.players_of("u2").await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|p| p.user_id == "u2"));
    }
}
