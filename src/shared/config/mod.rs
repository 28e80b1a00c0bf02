//! Application configuration module
//!
//! Selects the backend provider once at startup and carries the settings
//! each provider needs. Values come from the environment (with `.env`
//! support) or from a TOML document; both paths go through
//! [`AppConfigBuilder`] so validation is shared.

use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Default relational API URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Default table holding forum posts on the managed provider
pub const DEFAULT_POSTS_COLLECTION: &str = "forum_posts";

/// Which data provider backs the forum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Managed auth + table service
    #[default]
    Managed,
    /// Bespoke token-authenticated REST API
    Relational,
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" | "managed" => Ok(Self::Managed),
            "oracle" | "relational" => Ok(Self::Relational),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Selected provider
    pub backend: BackendKind,
    /// Managed provider project URL
    pub managed_url: Option<String>,
    /// Managed provider anonymous API key
    pub managed_anon_key: Option<String>,
    /// Relational API base URL
    pub relational_url: String,
    /// Table that holds posts on the managed provider (`forum_posts` or `community`)
    pub posts_collection: String,
    /// Undo optimistic likes when the write fails
    pub rollback_on_failure: bool,
    /// Directory for the local database; platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load configuration from `FORUM_*` environment variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let mut builder = Self::builder();
        if let Some(kind) = env_var("FORUM_DATABASE_TYPE") {
            builder = builder.backend(kind.parse()?);
        }
        if let Some(url) = env_var("FORUM_SUPABASE_URL") {
            builder = builder.managed_url(url);
        }
        if let Some(key) = env_var("FORUM_SUPABASE_ANON_KEY") {
            builder = builder.managed_anon_key(key);
        }
        if let Some(url) = env_var("FORUM_BACKEND_URL") {
            builder = builder.relational_url(url);
        }
        if let Some(collection) = env_var("FORUM_POSTS_COLLECTION") {
            builder = builder.posts_collection(collection);
        }
        if let Some(flag) = env_var("FORUM_ROLLBACK_ON_FAILURE") {
            builder = builder.rollback_on_failure(parse_bool("FORUM_ROLLBACK_ON_FAILURE", &flag)?);
        }
        if let Some(dir) = env_var("FORUM_DATA_DIR") {
            builder = builder.data_dir(PathBuf::from(dir));
        }
        builder.build()
    }

    /// Load configuration from a TOML document using the same keys as the
    /// environment, lowercased and without the `FORUM_` prefix.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(source).map_err(|e| ConfigError::Toml(e.to_string()))?;

        let mut builder = Self::builder();
        if let Some(kind) = raw.database_type {
            builder = builder.backend(kind.parse()?);
        }
        if let Some(url) = raw.supabase_url {
            builder = builder.managed_url(url);
        }
        if let Some(key) = raw.supabase_anon_key {
            builder = builder.managed_anon_key(key);
        }
        if let Some(url) = raw.backend_url {
            builder = builder.relational_url(url);
        }
        if let Some(collection) = raw.posts_collection {
            builder = builder.posts_collection(collection);
        }
        if let Some(flag) = raw.rollback_on_failure {
            builder = builder.rollback_on_failure(flag);
        }
        if let Some(dir) = raw.data_dir {
            builder = builder.data_dir(dir);
        }
        builder.build()
    }

    /// Validate the configuration, reporting every problem at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        match self.backend {
            BackendKind::Managed => {
                match self.managed_url.as_deref() {
                    None => problems.push("FORUM_SUPABASE_URL is required for the managed backend".to_string()),
                    Some(url) => {
                        if let Err(e) = check_url(url) {
                            problems.push(e.to_string());
                        }
                    }
                }
                if self.managed_anon_key.as_deref().map_or(true, str::is_empty) {
                    problems.push("FORUM_SUPABASE_ANON_KEY is required for the managed backend".to_string());
                }
            }
            BackendKind::Relational => {
                if self.relational_url.is_empty() {
                    problems.push("FORUM_BACKEND_URL is required for the relational backend".to_string());
                } else if let Err(e) = check_url(&self.relational_url) {
                    problems.push(e.to_string());
                }
            }
        }

        if self.posts_collection.trim().is_empty() {
            problems.push("posts collection name cannot be empty".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }

    /// Directory that holds the local database
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
            path.push("maternal-forum");
            path
        })
    }
}

/// Builder for AppConfig
#[derive(Debug)]
pub struct AppConfigBuilder {
    backend: BackendKind,
    managed_url: Option<String>,
    managed_anon_key: Option<String>,
    relational_url: String,
    posts_collection: String,
    rollback_on_failure: bool,
    data_dir: Option<PathBuf>,
}

impl Default for AppConfigBuilder {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            managed_url: None,
            managed_anon_key: None,
            relational_url: DEFAULT_BACKEND_URL.to_string(),
            posts_collection: DEFAULT_POSTS_COLLECTION.to_string(),
            rollback_on_failure: true,
            data_dir: None,
        }
    }
}

impl AppConfigBuilder {
    pub fn backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn managed_url(mut self, url: impl Into<String>) -> Self {
        self.managed_url = Some(url.into());
        self
    }

    pub fn managed_anon_key(mut self, key: impl Into<String>) -> Self {
        self.managed_anon_key = Some(key.into());
        self
    }

    pub fn relational_url(mut self, url: impl Into<String>) -> Self {
        self.relational_url = url.into();
        self
    }

    pub fn posts_collection(mut self, collection: impl Into<String>) -> Self {
        self.posts_collection = collection.into();
        self
    }

    pub fn rollback_on_failure(mut self, rollback: bool) -> Self {
        self.rollback_on_failure = rollback;
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        let config = AppConfig {
            backend: self.backend,
            managed_url: self.managed_url.map(|u| u.trim_end_matches('/').to_string()),
            managed_anon_key: self.managed_anon_key,
            relational_url: self.relational_url.trim_end_matches('/').to_string(),
            posts_collection: self.posts_collection,
            rollback_on_failure: self.rollback_on_failure,
            data_dir: self.data_dir,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("unknown database type: {0}")]
    UnknownBackend(String),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("invalid TOML: {0}")]
    Toml(String),
    #[error("invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    database_type: Option<String>,
    supabase_url: Option<String>,
    supabase_anon_key: Option<String>,
    backend_url: Option<String>,
    posts_collection: Option<String>,
    rollback_on_failure: Option<bool>,
    data_dir: Option<PathBuf>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: value.to_string(),
        }),
    }
}

fn check_url(url: &str) -> Result<(), ConfigError> {
    match reqwest::Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        _ => Err(ConfigError::InvalidUrl(url.to_string())),
    }
}
