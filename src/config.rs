//! Configuration loader and validator for the promo watcher.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("Invalid promo.pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub app: App,
    pub timeline: Timeline,
    pub mail: Mail,
    #[serde(default)]
    pub promo: Promo,
}

/// App-level settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub data_dir: String,
    /// Key of the stored cursor document.
    #[serde(default = "default_task_name")]
    pub task_name: String,
    /// Pause between invocations in `--watch` mode.
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
}

/// Timeline API settings for the watched account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timeline {
    #[serde(default = "default_timeline_api_base")]
    pub api_base: String,
    pub bearer_token: String,
    pub screen_name: String,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default = "default_true")]
    pub exclude_replies: bool,
    #[serde(default = "default_true")]
    pub trim_user: bool,
    #[serde(default = "default_status_url_base")]
    pub status_url_base: String,
}

/// Email delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Mail {
    #[serde(default = "default_mail_api_base")]
    pub api_base: String,
    pub api_key: String,
    pub from: String,
    pub to: String,
    #[serde(default = "default_subject")]
    pub subject: String,
}

/// Promotional marker. `pattern` wins over `marker` when set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Promo {
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default)]
    pub pattern: Option<String>,
}

impl Default for Promo {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            pattern: None,
        }
    }
}

fn default_task_name() -> String {
    "promo-watcher".into()
}

fn default_interval_seconds() -> u64 {
    300
}

fn default_timeline_api_base() -> String {
    "https://api.twitter.com/".into()
}

fn default_count() -> u32 {
    100
}

fn default_true() -> bool {
    true
}

fn default_status_url_base() -> String {
    "https://twitter.com/i/web/status/".into()
}

fn default_mail_api_base() -> String {
    "https://api.sendgrid.com/".into()
}

fn default_subject() -> String {
    "Freedome Promo Watcher Task".into()
}

fn default_marker() -> String {
    "%".into()
}

/// Env vars that override the configured secrets when set and non-empty.
pub const TIMELINE_TOKEN_ENV: &str = "TWITTER_API_KEY";
pub const MAIL_KEY_ENV: &str = "SENDGRID_API_KEY";

impl Config {
    /// Ensure required directories exist (creates `app.data_dir` if missing).
    pub fn ensure_dirs(&self) -> Result<(), std::io::Error> {
        if self.app.data_dir.trim().is_empty() {
            return Ok(());
        }
        fs::create_dir_all(self.resolved_data_dir())
    }

    /// `app.data_dir` with a leading `~/` expanded to `$HOME`.
    pub fn resolved_data_dir(&self) -> String {
        match self.app.data_dir.strip_prefix("~/") {
            Some(rest) => match std::env::var("HOME") {
                Ok(home) => format!("{}/{}", home.trim_end_matches('/'), rest),
                Err(_) => self.app.data_dir.clone(),
            },
            None => self.app.data_dir.clone(),
        }
    }

    /// Default SQLite URL for the cursor store, unless `DATABASE_URL` is set.
    pub fn database_url(&self) -> String {
        std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/watcher.db?mode=rwc", self.resolved_data_dir()))
    }

    /// Replace secrets with values from the environment, when present.
    pub fn apply_env_secrets(&mut self) {
        self.apply_secrets_from(|key| std::env::var(key).ok());
    }

    fn apply_secrets_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup(TIMELINE_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
            self.timeline.bearer_token = token;
        }
        if let Some(key) = lookup(MAIL_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.mail.api_key = key;
        }
    }
}

/// Load configuration from a YAML file, apply env secrets and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let mut cfg: Config = serde_yaml::from_str(&content)?;
    cfg.apply_env_secrets();
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.app.data_dir.trim().is_empty() {
        return Err(ConfigError::Invalid("app.data_dir must be non-empty"));
    }
    if cfg.app.task_name.trim().is_empty() {
        return Err(ConfigError::Invalid("app.task_name must be non-empty"));
    }
    if cfg.app.interval_seconds == 0 {
        return Err(ConfigError::Invalid("app.interval_seconds must be > 0"));
    }

    let tl = &cfg.timeline;
    if reqwest::Url::parse(&tl.api_base).is_err() {
        return Err(ConfigError::Invalid("timeline.api_base must be a valid URL"));
    }
    if tl.bearer_token.trim().is_empty() {
        return Err(ConfigError::Invalid("timeline.bearer_token must be non-empty"));
    }
    if tl.screen_name.trim().is_empty() {
        return Err(ConfigError::Invalid("timeline.screen_name must be non-empty"));
    }
    // user_timeline caps a page at 200 statuses.
    if tl.count == 0 || tl.count > 200 {
        return Err(ConfigError::Invalid("timeline.count must be within 1..=200"));
    }
    // Item ids are appended verbatim, so the base must end with a path separator.
    if reqwest::Url::parse(&tl.status_url_base).is_err() || !tl.status_url_base.ends_with('/') {
        return Err(ConfigError::Invalid(
            "timeline.status_url_base must be a valid URL ending with '/'",
        ));
    }

    let mail = &cfg.mail;
    if reqwest::Url::parse(&mail.api_base).is_err() {
        return Err(ConfigError::Invalid("mail.api_base must be a valid URL"));
    }
    if mail.api_key.trim().is_empty() {
        return Err(ConfigError::Invalid("mail.api_key must be non-empty"));
    }
    if !mail.from.contains('@') {
        return Err(ConfigError::Invalid("mail.from must be an email address"));
    }
    if !mail.to.contains('@') {
        return Err(ConfigError::Invalid("mail.to must be an email address"));
    }
    if mail.subject.trim().is_empty() {
        return Err(ConfigError::Invalid("mail.subject must be non-empty"));
    }

    match cfg.promo.pattern.as_deref() {
        Some(pattern) => {
            regex::Regex::new(pattern)?;
        }
        None if cfg.promo.marker.is_empty() => {
            return Err(ConfigError::Invalid("promo.marker must be non-empty"));
        }
        None => {}
    }

    Ok(())
}

/// Returns a complete example YAML document.
pub fn example() -> &'static str {
    r#"app:
  data_dir: "./data"
  task_name: "promo-watcher"
  interval_seconds: 300

timeline:
  api_base: "https://api.twitter.com/"
  bearer_token: "YOUR_TWITTER_BEARER_TOKEN"
  screen_name: "freedomeVPN"
  count: 100
  exclude_replies: true
  trim_user: true
  status_url_base: "https://twitter.com/i/web/status/"

mail:
  api_base: "https://api.sendgrid.com/"
  api_key: "YOUR_SENDGRID_API_KEY"
  from: "watcher@example.com"
  to: "me@example.com"
  subject: "Freedome Promo Watcher Task"

promo:
  marker: "%"
"#
}
