// Session state and cookie persistence.
//
// The cookie jar itself lives in the transport; this module only knows how
// to write a snapshot of it to disk, read it back, and decide from the
// account page whether the server still accepts it.

use crate::error::Result;
use crate::transport::Transport;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Text the account page only shows to anonymous visitors.
const LOGIN_MARKER: &str = "登录";

/// Login flag plus the display name scraped from the account page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    authenticated: bool,
    username: Option<String>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub(crate) fn authenticate(&mut self, username: Option<String>) {
        self.authenticated = true;
        if username.is_some() {
            self.username = username;
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.authenticated = false;
    }
}

/// Result of probing the account page with the current cookies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Valid { username: Option<String> },
    Stale,
}

/// Fetch `account_url` and classify the session.
pub fn probe_account_page<T: Transport + ?Sized>(transport: &T, account_url: &str) -> Result<Probe> {
    let page = transport.get(account_url)?;
    if page.body.contains(LOGIN_MARKER) {
        return Ok(Probe::Stale);
    }
    Ok(Probe::Valid {
        username: extract_username(&page.body),
    })
}

/// Best-effort scrape of the display name link on the account page.
pub fn extract_username(html: &str) -> Option<String> {
    let re = Regex::new(r#"<a\s+href="[^"]*"\s+class="text"[^>]*>([^<]+)</a>"#).ok()?;
    re.captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

/// JSON file holding the cookie jar as a flat string map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the transport's cookies to disk.
    pub fn save<T: Transport + ?Sized>(&self, transport: &T) -> Result<()> {
        let cookies = transport.export_cookies();
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&cookies)?)?;
        debug!(path = %self.path.display(), count = cookies.len(), "saved session cookies");
        Ok(())
    }

    /// Read saved cookies; `Ok(None)` when nothing has been saved yet.
    pub fn read(&self) -> Result<Option<BTreeMap<String, String>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}
