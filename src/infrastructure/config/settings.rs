use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::paths;

/// User settings stored in settings.yaml in user config directory.
/// All fields are optional - missing values use defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct UserSettings {
    /// Storage configuration
    pub storage: StorageSettings,

    /// Who is signed in
    pub session: SessionSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageSettings {
    /// Storage backend: "sqlite" (default), "mongodb" or "rest"
    #[serde(rename = "type")]
    pub storage_type: StorageType,

    pub sqlite: SqliteSettings,

    /// MongoDB connection settings (only used when storage_type is mongodb)
    pub mongodb: MongoDbSettings,

    /// Hosted backend settings (only used when storage_type is rest)
    pub rest: RestSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Sqlite,
    Mongodb,
    Rest,
}

impl std::str::FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StorageType::Sqlite),
            "mongodb" | "mongo" => Ok(StorageType::Mongodb),
            "rest" => Ok(StorageType::Rest),
            other => Err(format!("unknown storage backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SqliteSettings {
    /// Leave empty to use platform default path
    pub path: String,
}

impl SqliteSettings {
    pub fn effective_path(&self) -> PathBuf {
        if self.path.is_empty() {
            paths::default_sqlite_path()
        } else {
            PathBuf::from(&self.path)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoDbSettings {
    pub uri: String,
    pub database: String,
}

impl Default for MongoDbSettings {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "rosterly".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RestSettings {
    /// Project URL, e.g. https://xyzcompany.example.co
    pub url: String,
    /// Public API key sent with every request
    pub anon_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SessionSettings {
    /// Signed-in user for the local backends (sqlite, mongodb)
    pub user_id: Option<String>,
    /// Tokens issued by the hosted auth service
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub email: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_sqlite() {
        let settings: UserSettings = serde_yaml::from_str("{}").unwrap();
        assert_eq!(settings.storage.storage_type, StorageType::Sqlite);
        assert_eq!(settings.storage.mongodb.database, "rosterly");
        assert!(settings.session.user_id.is_none());
    }

    #[test]
    fn test_rest_settings_parse() {
        let yaml = r#"
storage:
  type: rest
  rest:
    url: https://demo.example.co
    anon_key: public-key
session:
  access_token: abc
"#;
        let settings: UserSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.storage.storage_type, StorageType::Rest);
        assert_eq!(settings.storage.rest.url, "https://demo.example.co");
        assert_eq!(settings.session.access_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!("Mongo".parse::<StorageType>().unwrap(), StorageType::Mongodb);
        assert_eq!("rest".parse::<StorageType>().unwrap(), StorageType::Rest);
        assert!("postgres".parse::<StorageType>().is_err());
    }

    #[test]
    fn test_explicit_sqlite_path_wins() {
        let sqlite = SqliteSettings {
            path: "/tmp/roster.db".into(),
        };
        assert_eq!(sqlite.effective_path(), PathBuf::from("/tmp/roster.db"));
    }
}
