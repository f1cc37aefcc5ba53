use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

use crate::{export, overpass};

pub const DEFAULT_PATH: &str = "tolls.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub overpass: OverpassConfig,
    pub output: OutputConfig,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OverpassConfig {
    pub url: String,
    /// Value of the `name` tag of the area to search.
    pub area: String,
    /// Server-side query timeout, seconds.
    pub timeout: u32,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            url: overpass::DEFAULT_URL.to_string(),
            area: "India".to_string(),
            timeout: 180,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub csv: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv: PathBuf::from(export::DEFAULT_CSV),
        }
    }
}

/// Connection settings for the toll store. `url`, when set, wins over the
/// individual fields.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            host: "localhost".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            name: "tollpass".to_string(),
        }
    }
}

// keeps the password out of logs
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .finish()
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return PgConnectOptions::from_str(url).context("Invalid database url");
        }

        let mut options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .database(&self.name);
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }

    /// Where the store lives, without credentials.
    pub fn target(&self) -> String {
        match &self.url {
            Some(url) => match url.rsplit_once('@') {
                Some((_, rest)) => rest.to_string(),
                None => url
                    .split_once("://")
                    .map_or(url.as_str(), |(_, rest)| rest)
                    .to_string(),
            },
            None => format!("{}:{}/{}", self.host, self.port, self.name),
        }
    }
}

impl Config {
    /// Reads the TOML file at `path` and applies environment overrides.
    ///
    /// A missing file is only an error when it was asked for explicitly.
    pub fn load(path: &Path, explicit: bool) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else if explicit {
            bail!("Config file {} does not exist", path.display());
        } else {
            Self::default()
        };

        config.apply_env(|key| env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(x) = var("OVERPASS_URL") {
            self.overpass.url = x;
        }

        let db = &mut self.database;
        if let Some(x) = var("DATABASE_URL") {
            db.url = Some(x);
        }
        if let Some(x) = var("PGHOST") {
            db.host = x;
        }
        if let Some(x) = var("PGPORT") {
            db.port = x.parse().with_context(|| format!("Invalid PGPORT: {x}"))?;
        }
        if let Some(x) = var("PGUSER") {
            db.user = x;
        }
        if let Some(x) = var("PGPASSWORD") {
            db.password = Some(x);
        }
        if let Some(x) = var("PGDATABASE") {
            db.name = x;
        }

        Ok(())
    }
}
