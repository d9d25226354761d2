use std::fmt;
use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

/// Opaque clist.by credential, sent as query pairs
/// (`username=<user>&api_key=<key>`).
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredential(String);

impl ApiCredential {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        url::form_urlencoded::parse(self.0.as_bytes())
            .into_owned()
            .collect()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiCredential(<redacted>)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Missing,
    Empty,
    Present(ApiCredential),
}

impl Credential {
    pub fn from_value(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return Self::Missing;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else {
            Self::Present(ApiCredential(trimmed.to_string()))
        }
    }

    /// Resolves the credential from an environment value first, then from the
    /// value found in the env file.
    pub fn resolve(env_value: Option<&str>, file_value: Option<&str>) -> Self {
        Self::from_value(env_value.or(file_value))
    }

    pub fn load(env_var: &str, env_file: &Path) -> Self {
        let env_value = std::env::var(env_var).ok();
        if env_value.is_some() {
            return Self::resolve(env_value.as_deref(), None);
        }
        let file_value = match dotenvy::from_path_iter(env_file) {
            Ok(entries) => env_file_value(entries, env_var),
            Err(err) if err.not_found() => {
                debug!(path = %env_file.display(), "credential file not found");
                None
            }
            Err(err) => {
                warn!(path = %env_file.display(), error = %err, "failed to read credential file");
                None
            }
        };
        Self::resolve(None, file_value.as_deref())
    }

    pub fn usable(&self) -> Option<&ApiCredential> {
        match self {
            Self::Present(credential) => Some(credential),
            Self::Missing | Self::Empty => None,
        }
    }
}

/// First value bound to `key`; lines dotenvy cannot parse are skipped.
fn env_file_value<R: Read>(entries: dotenvy::Iter<R>, key: &str) -> Option<String> {
    entries
        .filter_map(|entry| match entry {
            Ok(pair) => Some(pair),
            Err(err) => {
                debug!(error = %err, "skipping unparsable credential file line");
                None
            }
        })
        .find_map(|(name, value)| (name == key).then_some(value))
}
