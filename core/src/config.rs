/// Configuration management
use crate::delta::Category;
use crate::error::{Result, WatchError};
use crate::notify::validate_command;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

const APP_DIR: &str = "devwatch";
const CONFIG_FILE: &str = "config.json";
const STATE_FILE: &str = "state.json";
const DEFAULT_BASE_URL: &str = "https://www.deviantart.com";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Site URLs the client talks to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    fn join(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn login_url(&self) -> String {
        self.join("/users/login")
    }

    pub fn difi_url(&self) -> String {
        self.join("/global/difi.php")
    }

    pub fn notes_url(&self) -> String {
        self.join("/notifications/notes")
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// On-disk config document
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ConfigFile {
    username: Option<String>,
    password: Option<String>,
    state_file: Option<PathBuf>,
    notification_whitelist: Vec<String>,
    apply_whitelist_to: Vec<String>,
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
    command_to_run: Option<String>,
    command_to_run_on_failure: Option<String>,
}

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub username: Option<String>,
    pub password: Option<String>,

    /// Snapshot document location
    pub state_file: PathBuf,

    /// Users whose activity is always reported
    pub notification_whitelist: Vec<String>,

    /// Categories filtered through the whitelist
    pub apply_whitelist_to: Vec<Category>,

    pub endpoints: Endpoints,

    /// Per-request timeout
    pub request_timeout: Duration,

    /// Receives each report; `%s` is the subject and `%m` the message.
    /// Reports are printed when unset.
    pub command_to_run: Option<String>,

    /// Receives the error chain when a run fails, same placeholders
    pub command_to_run_on_failure: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            state_file: default_state_file(),
            notification_whitelist: Vec::new(),
            apply_whitelist_to: Vec::new(),
            endpoints: Endpoints::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            command_to_run: None,
            command_to_run_on_failure: None,
        }
    }
}

/// `<config dir>/devwatch/config.json`
pub fn default_config_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(CONFIG_FILE)
}

/// `<cache dir>/devwatch/state.json`
pub fn default_state_file() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(STATE_FILE)
}

impl Config {
    /// Load `path` (or the default location), then apply environment
    /// overrides. A missing file leaves everything at defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_file);
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                return Err(WatchError::Config(format!(
                    "config document '{}' is empty",
                    path.display()
                )));
            }
            let file: ConfigFile = serde_json::from_str(&raw).map_err(|e| {
                WatchError::Config(format!("unable to parse '{}': {}", path.display(), e))
            })?;
            debug!("Loaded config from {:?}", path);
            Self::from_file(file)?
        } else {
            debug!("No config at {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    fn from_file(file: ConfigFile) -> Result<Self> {
        let apply_whitelist_to = file
            .apply_whitelist_to
            .iter()
            .map(|c| {
                c.parse::<Category>().map_err(|_| {
                    WatchError::Config(format!(
                        "'{}' in apply_whitelist_to is invalid - use comments/replies/unread_notes/deviations",
                        c
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if apply_whitelist_to.is_empty() && !file.notification_whitelist.is_empty() {
            warn!("notification_whitelist is set but apply_whitelist_to is empty - whitelist will not be used");
        }

        let command_to_run = file.command_to_run.filter(|c| !c.trim().is_empty());
        let command_to_run_on_failure = file
            .command_to_run_on_failure
            .filter(|c| !c.trim().is_empty());
        for command in [&command_to_run, &command_to_run_on_failure].into_iter().flatten() {
            validate_command(command)?;
        }

        let defaults = Self::default();
        Ok(Self {
            username: file.username,
            password: file.password,
            state_file: file.state_file.unwrap_or(defaults.state_file),
            notification_whitelist: file.notification_whitelist,
            apply_whitelist_to,
            endpoints: file
                .base_url
                .map(|base_url| Endpoints { base_url })
                .unwrap_or_default(),
            request_timeout: file
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            command_to_run,
            command_to_run_on_failure,
        })
    }

    /// Env overrides (nice for cron jobs)
    fn apply_env(&mut self) {
        if let Ok(u) = std::env::var("DEVWATCH_USERNAME") {
            self.username = Some(u);
        }
        if let Ok(p) = std::env::var("DEVWATCH_PASSWORD") {
            self.password = Some(p);
        }
        if let Ok(s) = std::env::var("DEVWATCH_STATE_FILE") {
            self.state_file = PathBuf::from(s);
        }
    }

    /// Login credentials; both must be configured
    pub fn credentials(&self) -> Result<Credentials> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) if !username.is_empty() => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(WatchError::Config(
                "please configure a username and password (config file or DEVWATCH_USERNAME/DEVWATCH_PASSWORD)"
                    .to_string(),
            )),
        }
    }

    /// Whether the whitelist filters `category`
    pub fn whitelist_applies_to(&self, category: Category) -> bool {
        !self.notification_whitelist.is_empty() && self.apply_whitelist_to.contains(&category)
    }
}
