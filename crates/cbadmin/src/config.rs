//! Connection settings for the admin REST endpoint.
//!
//! Settings are resolved once, before any request is made, and are
//! immutable afterwards. Resolution order (later wins):
//!
//! 1. Built-in defaults: `127.0.0.1:8091`, no credentials
//! 2. The defaults file (see [`DEFAULTS_FILE`]), if it exists
//! 3. Explicit overrides applied by the caller
//!
//! # Defaults file format
//!
//! ```text
//! CB_REST_USERNAME=Administrator
//! CB_REST_PASSWORD=secret
//! CB_REST_HOST=10.0.0.5
//! CB_REST_PORT=8091
//! ```
//!
//! Unknown keys and lines without `=` are ignored. When a key appears more
//! than once, the last line wins.

use crate::error::{Error, Result};
use base64::Engine as _;
use std::io;
use std::path::Path;

/// Fixed location of the defaults file.
pub const DEFAULTS_FILE: &str = "/opt/couchbase/.cb.cnf";

/// Default admin host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default admin REST port.
pub const DEFAULT_PORT: u16 = 8091;

/// Resolved connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Admin host name or address.
    pub host: String,
    /// Admin REST port.
    pub port: u16,
    /// Basic auth user.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
        }
    }
}

impl ConnectionConfig {
    /// Load settings from a defaults file at `path`.
    ///
    /// A missing file is not an error; built-in defaults are returned.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                log::debug!("Reading connection defaults from {}", path.display());
                Ok(Self::parse(&content))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!(
                    "No defaults file at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(Error::io(path, e)),
        }
    }

    /// Parse defaults file content on top of the built-in defaults.
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();
        for line in content.lines() {
            config.apply_line(line);
        }
        config
    }

    fn apply_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        let Some((key, value)) = line.split_once('=') else {
            if !line.trim().is_empty() {
                log::debug!("Ignoring malformed defaults line: {line:?}");
            }
            return;
        };

        match key {
            "CB_REST_USERNAME" => self.username = Some(value.to_string()),
            "CB_REST_PASSWORD" => self.password = Some(value.to_string()),
            "CB_REST_HOST" => self.host = value.to_string(),
            "CB_REST_PORT" => match value.trim().parse() {
                Ok(port) => self.port = port,
                Err(_) => log::warn!("Ignoring invalid CB_REST_PORT value {value:?}"),
            },
            other => log::debug!("Ignoring unknown defaults key {other:?}"),
        }
    }

    /// Override the host.
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Override the port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Override the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Override the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Base URL of the admin API, e.g. `http://127.0.0.1:8091`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Credentials, only when both username and password are set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    /// Value for the `Authorization` header, if credentials are complete.
    #[must_use]
    pub fn authorization_header(&self) -> Option<String> {
        self.credentials().map(|(user, pass)| {
            let token =
                base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            format!("Basic {token}")
        })
    }
}
