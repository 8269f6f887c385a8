use serde::{Deserialize, Serialize};

/// Player entity - a user-owned roster entry that can join groups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl Player {
    pub fn new(id: impl Into<String>, user_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            name: name.into(),
            avatar_url: None,
        }
    }

    /// Up to two uppercase initials, used where the avatar image cannot be shown
    pub fn initials(&self) -> String {
        let initials: String = self
            .name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .take(2)
            .flat_map(char::to_uppercase)
            .collect();

        if initials.is_empty() {
            "?".to_string()
        } else {
            initials
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initials() {
        assert_eq!(Player::new("1", "u", "ada lovelace").initials(), "AL");
        assert_eq!(Player::new("1", "u", "Grace Brewster Hopper").initials(), "GB");
        assert_eq!(Player::new("1", "u", "zed").initials(), "Z");
        assert_eq!(Player::new("1", "u", "   ").initials(), "?");
    }

    #[test]
    fn test_avatar_is_optional_on_the_wire() {
        let player: Player =
            serde_json::from_str(r#"{"id":"p1","user_id":"u1","name":"Ada"}"#).unwrap();
        assert_eq!(player.avatar_url, None);

        let json = serde_json::to_string(&player).unwrap();
        assert!(!json.contains("avatar_url"));
    }
}
