use crate::error::ConfigurationError;
use crate::util;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

fn default_mongodb_uri() -> String {
    env::var("MONGODB_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string())
}

fn default_mongodb_db() -> String {
    env::var("MONGODB_DB_NAME").unwrap_or_else(|_| "lms".to_string())
}

fn default_access_token_minutes() -> i64 {
    60
}

fn default_refresh_token_hours() -> i64 {
    24
}

fn default_password_cost() -> u32 {
    12
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(skip)]
    file_path: PathBuf,

    #[serde(default = "default_mongodb_uri")]
    pub mongodb_uri: String,
    #[serde(default = "default_mongodb_db")]
    pub mongodb_db: String,

    #[serde(default = "default_access_token_minutes")]
    pub access_token_minutes: i64,
    #[serde(default = "default_refresh_token_hours")]
    pub refresh_token_hours: i64,

    /// bcrypt cost factor used for password hashes.
    #[serde(default = "default_password_cost")]
    pub password_cost: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            file_path: config_dir().join("settings.yml"),
            mongodb_uri: default_mongodb_uri(),
            mongodb_db: default_mongodb_db(),
            access_token_minutes: default_access_token_minutes(),
            refresh_token_hours: default_refresh_token_hours(),
            password_cost: default_password_cost(),
        }
    }
}

#[inline]
fn config_dir() -> PathBuf {
    PathBuf::from(env::var("CONFIG_DIR").unwrap_or_else(|_| "./config".to_string()))
}

impl Config {
    pub fn load() -> Result<Config, ConfigurationError> {
        Self::load_from(config_dir())
    }

    pub fn load_from(dir: impl AsRef<Path>) -> Result<Config, ConfigurationError> {
        let config_file = util::find_first_subpath(
            dir.as_ref(),
            &["settings.yml", "settings.yaml"],
            Path::exists,
        )
        .ok_or_else(|| ConfigurationError::NotFound(dir.as_ref().to_path_buf()))?;

        let file = File::open(&config_file)?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.file_path = config_file;

        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigurationError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(&self.file_path)?;
        let mut out = BufWriter::new(file);
        serde_yaml::to_writer(&mut out, self)?;
        out.flush()?;
        Ok(())
    }

    pub fn access_token_lifetime(&self) -> Duration {
        Duration::minutes(self.access_token_minutes)
    }

    pub fn refresh_token_lifetime(&self) -> Duration {
        Duration::hours(self.refresh_token_hours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("lms-config-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).expect("unable to create scratch dir");
        dir
    }

    #[test]
    fn missing_file_is_reported_as_not_found() {
        let dir = scratch_dir("missing");

        match Config::load_from(&dir) {
            Err(ConfigurationError::NotFound(path)) => assert_eq!(path, dir),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn partial_file_falls_back_to_defaults() {
        let dir = scratch_dir("partial");
        fs::write(dir.join("settings.yaml"), "mongodb_db: campus\npassword_cost: 6\n")
            .expect("unable to write settings");

        let config = Config::load_from(&dir).expect("config should load");

        assert_eq!(config.mongodb_db, "campus");
        assert_eq!(config.password_cost, 6);
        assert_eq!(config.access_token_minutes, 60);
        assert_eq!(config.refresh_token_lifetime(), Duration::hours(24));
    }
}
