//! API key resolution: environment first, then a local TOML secrets file.

use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

/// Environment variables consulted, in order.
pub const KEY_ENV_VARS: [&str; 2] = ["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Keys looked up inside the secrets file, in order.
pub const SECRET_FILE_KEYS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Default secrets file location, relative to the working directory.
pub const DEFAULT_SECRETS_PATH: &str = ".streamlit/secrets.toml";

/// Where the resolved key came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Named environment variable.
    Env(&'static str),
    /// Secrets file path.
    File(PathBuf),
}

/// Resolved API key for the embedding/generation service.
#[derive(Debug, Clone)]
pub struct ApiCredential {
    key: SecretString,
    source: CredentialSource,
}

impl ApiCredential {
    /// Wraps an explicit key (tests, CLI overrides).
    pub fn new(key: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            key: SecretString::new(key.into()),
            source,
        }
    }

    /// Secret value for request signing.
    pub fn expose(&self) -> &str {
        self.key.expose_secret()
    }

    /// Origin of the key, for logging.
    pub fn source(&self) -> &CredentialSource {
        &self.source
    }
}

/// Resolves the key from the process environment, then `secrets_path`.
///
/// The first non-empty trimmed value wins. An unreadable or malformed secrets
/// file is logged and treated as absent.
pub fn resolve_api_key(secrets_path: &Path) -> Option<ApiCredential> {
    resolve_with(|name| std::env::var(name).ok(), secrets_path)
}

/// Same as [`resolve_api_key`] with a pluggable environment lookup.
pub fn resolve_with<F>(lookup: F, secrets_path: &Path) -> Option<ApiCredential>
where
    F: Fn(&str) -> Option<String>,
{
    for name in KEY_ENV_VARS {
        if let Some(value) = lookup(name).and_then(non_empty) {
            debug!(source = name, "resolved API key from environment");
            return Some(ApiCredential::new(value, CredentialSource::Env(name)));
        }
    }
    let value = read_secrets_file(secrets_path)?;
    debug!(path = %secrets_path.display(), "resolved API key from secrets file");
    Some(ApiCredential::new(
        value,
        CredentialSource::File(secrets_path.to_path_buf()),
    ))
}

fn read_secrets_file(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "failed to read secrets file");
            return None;
        }
    };
    let table: toml::Table = match raw.parse() {
        Ok(table) => table,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "secrets file is not valid TOML");
            return None;
        }
    };
    SECRET_FILE_KEYS.iter().find_map(|key| {
        table
            .get(*key)
            .and_then(|value| value.as_str())
            .map(str::to_string)
            .and_then(non_empty)
    })
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
