use serde::Deserialize;

pub const CONFIG_FILE: &str = "retitle.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cascade: CascadeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// "sqlite" or "mongodb"
    pub backend: String,
    pub path: String,
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Rows per version-sync write. Each batch is its own transaction.
    pub batch_size: usize,
    /// Attributed as redirect creator when a request carries no acting user.
    pub system_user_id: i64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig::default(),
            cascade: CascadeConfig::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            backend: "sqlite".to_string(),
            path: "website/db/retitle.db".to_string(),
            uri: "mongodb://localhost:27017".to_string(),
            name: "retitle".to_string(),
        }
    }
}

impl Default for CascadeConfig {
    fn default() -> Self {
        CascadeConfig {
            batch_size: 20,
            system_user_id: 0,
        }
    }
}

impl Config {
    /// Read retitle.toml from the working directory (defaults if missing or invalid)
    pub fn load() -> Self {
        match std::fs::read_to_string(CONFIG_FILE) {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Config::default(),
        }
    }

    pub fn parse(raw: &str) -> Self {
        match toml::from_str::<Config>(raw) {
            Ok(mut cfg) => {
                cfg.cascade.batch_size = cfg.cascade.batch_size.max(1);
                cfg
            }
            Err(e) => {
                log::warn!("Invalid {}: {} (using defaults)", CONFIG_FILE, e);
                Config::default()
            }
        }
    }

    pub fn is_mongo(&self) -> bool {
        self.database.backend == "mongodb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = Config::parse("");
        assert_eq!(cfg.database.backend, "sqlite");
        assert_eq!(cfg.cascade.batch_size, 20);
        assert_eq!(cfg.cascade.system_user_id, 0);
        assert!(!cfg.is_mongo());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = Config::parse("[cascade]\nbatch_size = 5\n\n[database]\nbackend = \"mongodb\"\n");
        assert_eq!(cfg.cascade.batch_size, 5);
        assert!(cfg.is_mongo());
        assert_eq!(cfg.database.name, "retitle");
        assert_eq!(cfg.database.path, "website/db/retitle.db");
    }

    #[test]
    fn zero_batch_size_is_clamped() {
        let cfg = Config::parse("[cascade]\nbatch_size = 0\n");
        assert_eq!(cfg.cascade.batch_size, 1);
    }

    #[test]
    fn invalid_toml_falls_back() {
        let cfg = Config::parse("[cascade\nbatch_size = ");
        assert_eq!(cfg.cascade.batch_size, 20);
    }
}
