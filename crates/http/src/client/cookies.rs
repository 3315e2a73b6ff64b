//! Session cookie jar that outlives the process
//!
//! The refresh endpoint authenticates with the session cookie set at login.
//! A command-line client exits between calls, so the cookies reqwest
//! receives are written next to the stored token and replayed into a fresh
//! jar on the next start.

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, warn};

use super::error::ClientError;

/// File name of the cookie jar inside a data directory
pub const COOKIE_FILE: &str = "cookies.json";

/// A `Set-Cookie` header as received, with the URL it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SavedCookie {
    url: String,
    name: String,
    set_cookie: String,
}

/// Cookie jar backed by a JSON file.
///
/// Cookie matching and expiry are left to reqwest's [`Jar`]. The file only
/// keeps the latest `Set-Cookie` per host and cookie name.
#[derive(Debug)]
pub struct FileCookieJar {
    jar: Jar,
    path: PathBuf,
    saved: Mutex<Vec<SavedCookie>>,
}

impl FileCookieJar {
    /// Open the jar at `path`, loading any cookies saved there.
    ///
    /// A missing file gives an empty jar. An unreadable one is logged and
    /// ignored.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ClientError> {
        let path = path.into();
        let saved: Vec<SavedCookie> = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable cookie file");
                Vec::new()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                return Err(ClientError::Store(format!(
                    "failed to read {}: {err}",
                    path.display()
                )));
            }
        };

        let jar = Jar::default();
        for cookie in &saved {
            match Url::parse(&cookie.url) {
                Ok(url) => jar.add_cookie_str(&cookie.set_cookie, &url),
                Err(e) => warn!(url = %cookie.url, error = %e, "Skipping saved cookie"),
            }
        }
        debug!(path = %path.display(), count = saved.len(), "Loaded cookies");

        Ok(Self {
            jar,
            path,
            saved: Mutex::new(saved),
        })
    }

    /// Jar at `<dir>/cookies.json`
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, ClientError> {
        Self::open(dir.as_ref().join(COOKIE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn record(&self, headers: &[HeaderValue], url: &Url) {
        let host = url.host_str().unwrap_or_default();
        let mut saved = self.saved.lock().unwrap_or_else(PoisonError::into_inner);

        for value in headers {
            let Ok(set_cookie) = value.to_str() else {
                continue;
            };
            let Some(name) = cookie_name(set_cookie) else {
                continue;
            };
            saved.retain(|c| !(c.name == name && host_of(&c.url).as_deref() == Some(host)));
            saved.push(SavedCookie {
                url: url.to_string(),
                name: name.to_string(),
                set_cookie: set_cookie.to_string(),
            });
        }

        if let Err(e) = self.write(&saved) {
            warn!(path = %self.path.display(), error = %e, "Failed to save cookies");
        }
    }

    fn write(&self, saved: &[SavedCookie]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(saved)?)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))?;
        }

        std::fs::rename(&tmp, &self.path)
    }
}

impl CookieStore for FileCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<HeaderValue> = cookie_headers.cloned().collect();
        self.jar.set_cookies(&mut headers.iter(), url);
        self.record(&headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }
}

fn cookie_name(set_cookie: &str) -> Option<&str> {
    let (name, _) = set_cookie.split_once('=')?;
    let name = name.trim();
    (!name.is_empty()).then_some(name)
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}
