//! File-backed cookie session store
//!
//! The session is an opaque set of cookies handed out by the server at
//! login. It is persisted as a small JSON map and re-sent verbatim on
//! every authenticated request. No expiry logic lives here: whether the
//! session is still valid is decided by probing the server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// In-memory cookie set, keyed by cookie name.
///
/// Uses a `BTreeMap` so the persisted file is stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CookieJar {
    #[serde(flatten)]
    cookies: BTreeMap<String, String>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.insert(name.into(), value.into());
    }

    /// Absorb one `Set-Cookie` header value, merging by cookie name.
    ///
    /// Only the `name=value` pair before the first attribute is kept;
    /// `Path`, `Expires` and friends are server-side concerns.
    pub fn absorb(&mut self, set_cookie: &str) {
        let pair = set_cookie.split(';').next().unwrap_or("");
        if let Some((name, value)) = pair.split_once('=') {
            let name = name.trim();
            if !name.is_empty() {
                self.cookies.insert(name.to_string(), value.trim().to_string());
            }
        }
    }

    /// Render the outgoing `Cookie` header value, or `None` when empty.
    pub fn header_value(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{}={}", name, value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Persistent store for the session cookie jar.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the cookie file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted jar; an absent file yields an empty jar.
    pub fn load(&self) -> Result<CookieJar> {
        if !self.path.exists() {
            return Ok(CookieJar::new());
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Persist the jar, creating the parent directory on first use.
    ///
    /// The file is owner-only (0600) since it holds the session proof.
    pub fn save(&self, jar: &CookieJar) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
            }
        }

        let content = serde_json::to_string_pretty(jar)?;
        fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    /// Delete the persisted session. A missing file is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absorb_set_cookie() {
        let mut jar = CookieJar::new();
        jar.absorb("connect.sid=s%3Aabcdef; Path=/; HttpOnly");
        assert_eq!(jar.get("connect.sid"), Some("s%3Aabcdef"));

        // Overwrite by name
        jar.absorb("connect.sid=s%3Azzz; Path=/");
        assert_eq!(jar.get("connect.sid"), Some("s%3Azzz"));

        // Malformed values are ignored
        jar.absorb("no-equals-sign");
        jar.absorb("=orphan-value");
        assert_eq!(jar.header_value().unwrap(), "connect.sid=s%3Azzz");
    }

    #[test]
    fn test_header_value_order() {
        let mut jar = CookieJar::new();
        jar.insert("b", "2");
        jar.insert("a", "1");
        assert_eq!(jar.header_value().unwrap(), "a=1; b=2");

        assert!(CookieJar::new().header_value().is_none());
    }

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("state").join("cookies.json"));

        // Absent file loads as an empty jar
        assert!(store.load().unwrap().is_empty());

        let mut jar = CookieJar::new();
        jar.insert("connect.sid", "s%3Aabc");
        store.save(&jar).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, jar);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("cookies.json"));

        let mut jar = CookieJar::new();
        jar.insert("sid", "x");
        store.save(&jar).unwrap();
        assert!(store.path().exists());

        store.clear().unwrap();
        assert!(!store.path().exists());

        // Clearing again must not fail
        store.clear().unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_cookie_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("cookies.json"));
        store.save(&CookieJar::new()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
