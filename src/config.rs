// Configuration: a small TOML file plus environment overrides, in the
// same spirit as `ApiClient::from_env` reading `API_GATEWAY_URL`.

use crate::error::{LanzouError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://pc.woozooo.com";
pub const DEFAULT_LOGIN_URL: &str = "https://up.woozooo.com/mlogin.php";

/// Values shipped in the example config; treated as "not configured".
const PLACEHOLDER_USERNAME: &str = "your_email@example.com";
const PLACEHOLDER_PASSWORD: &str = "your_password";

/// Example shown when credentials are missing.
pub const EXAMPLE_CONFIG: &str = r#"username = "your_email@example.com"
password = "your_password"
"#;

/// Client configuration. Every field has a default so an empty file (or no
/// file at all) is valid; credentials usually come from the environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Web service root, used for the shared task endpoint and uploads.
    pub base_url: String,
    /// Separate login endpoint.
    pub login_url: String,
    /// Where the session cookies are persisted between runs.
    pub cookie_file: PathBuf,
    /// Timeout for ordinary form requests.
    pub timeout_secs: u64,
    /// Timeout for a single multipart upload.
    pub upload_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            cookie_file: default_cookie_file(),
            timeout_secs: 60,
            upload_timeout_secs: 1800,
        }
    }
}

fn default_cookie_file() -> PathBuf {
    let dir = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    dir.join(".lanzou_cookies.json")
}

/// `<config dir>/lanzou-cli/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("lanzou-cli").join("config.toml"))
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist; the default location is optional.
    /// Environment variables are applied last and win over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LanzouError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| LanzouError::Config(e.to_string()))
    }

    /// Apply `LANZOU_*` overrides using `lookup` to read variables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("LANZOU_USERNAME") {
            self.username = Some(v);
        }
        if let Some(v) = non_empty("LANZOU_PASSWORD") {
            self.password = Some(v);
        }
        if let Some(v) = non_empty("LANZOU_BASE_URL") {
            self.base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = non_empty("LANZOU_LOGIN_URL") {
            self.login_url = v;
        }
        if let Some(v) = non_empty("LANZOU_COOKIE_FILE") {
            self.cookie_file = PathBuf::from(v);
        }
    }

    /// The configured username, unless missing or still the placeholder.
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .filter(|u| !u.is_empty() && *u != PLACEHOLDER_USERNAME)
    }

    /// The configured password, unless missing or still the placeholder.
    pub fn password(&self) -> Option<&str> {
        self.password
            .as_deref()
            .filter(|p| !p.is_empty() && *p != PLACEHOLDER_PASSWORD)
    }

    /// True when either credential was left at the example value.
    pub fn has_placeholder_credentials(&self) -> bool {
        self.username.as_deref() == Some(PLACEHOLDER_USERNAME)
            || self.password.as_deref() == Some(PLACEHOLDER_PASSWORD)
    }

    /// What startup can do with the configured credentials.
    pub fn credentials(&self) -> Credentials {
        if self.has_placeholder_credentials() {
            return Credentials::Unconfigured;
        }
        match (self.username(), self.password()) {
            (Some(username), Some(password)) => Credentials::Complete {
                username: username.to_string(),
                password: password.to_string(),
            },
            (Some(username), None) => Credentials::PasswordMissing {
                username: username.to_string(),
            },
            (None, _) => Credentials::Unconfigured,
        }
    }
}

/// Outcome of checking the configured credentials before login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credentials {
    Complete { username: String, password: String },
    /// Only an interactive session may ask for it.
    PasswordMissing { username: String },
    /// Missing username or placeholder values: print the config help.
    Unconfigured,
}
