//! Client configuration and backend factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use ielts_core::media::MediaResolver;
use ielts_core::model::AuthSession;

use crate::credentials::CredentialStore;
use crate::http::{HttpApi, HttpMediaLoader, DEFAULT_TIMEOUT_SECS};

/// Top-level client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IeltsConfig {
    /// Base URL of the backend, without the `/api` suffix.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Host that serves media referenced by legacy file paths. Unset means
    /// such references are rejected.
    #[serde(default)]
    pub legacy_media_host: Option<String>,
    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Where the login token is kept.
    #[serde(default)]
    pub credentials_path: Option<PathBuf>,
}

fn default_api_url() -> String {
    "http://localhost:5000".to_string()
}
fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for IeltsConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            legacy_media_host: None,
            timeout_secs: default_timeout(),
            credentials_path: None,
        }
    }
}

impl IeltsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Media resolver for this configuration.
    pub fn media_resolver(&self) -> Result<MediaResolver> {
        match &self.legacy_media_host {
            Some(host) => {
                let url = Url::parse(host)
                    .with_context(|| format!("invalid legacy_media_host: {host}"))?;
                Ok(MediaResolver::with_legacy_host(url))
            }
            None => Ok(MediaResolver::new()),
        }
    }

    /// Credential store at the configured path, or the default one.
    pub fn credential_store(&self) -> Result<CredentialStore> {
        match &self.credentials_path {
            Some(path) => Ok(CredentialStore::new(path.clone())),
            None => CredentialStore::default_location(),
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `ielts.toml` in the current directory
/// 2. `~/.config/ielts/config.toml`
///
/// Environment variable overrides: `IELTS_API_URL`, `IELTS_MEDIA_HOST`.
pub fn load_config() -> Result<IeltsConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<IeltsConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("ielts.toml");
        if local.exists() {
            Some(local)
        } else {
            config_dir()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<IeltsConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => IeltsConfig::default(),
    };

    if let Ok(url) = std::env::var("IELTS_API_URL") {
        config.api_url = url;
    }
    if let Ok(host) = std::env::var("IELTS_MEDIA_HOST") {
        config.legacy_media_host = Some(host);
    }

    config.api_url = resolve_env_vars(&config.api_url);
    config.legacy_media_host = config
        .legacy_media_host
        .as_deref()
        .map(resolve_env_vars)
        .filter(|h| !h.is_empty());

    Ok(config)
}

/// `~/.config/ielts`
pub fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("ielts"))
}

/// Build the REST backend, attaching the session when there is one.
pub fn create_api(config: &IeltsConfig, session: Option<AuthSession>) -> Result<HttpApi> {
    let api = HttpApi::new(&config.api_url, config.timeout())
        .with_context(|| format!("failed to create client for {}", config.api_url))?;
    Ok(match session {
        Some(session) => api.with_session(session),
        None => api,
    })
}

pub fn create_media_loader(config: &IeltsConfig) -> Result<HttpMediaLoader> {
    HttpMediaLoader::new(config.timeout()).context("failed to create media loader")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_IELTS_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_IELTS_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("http://${_IELTS_TEST_VAR}:5000"),
            "http://hello:5000"
        );
        assert_eq!(resolve_env_vars("${unterminated"), "${unterminated");
        std::env::remove_var("_IELTS_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = IeltsConfig::default();
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.legacy_media_host.is_none());
        assert!(config.media_resolver().unwrap().legacy_host().is_none());
    }

    #[test]
    fn parse_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ielts.toml");
        std::fs::write(
            &path,
            r#"
api_url = "https://ielts.example.com"
legacy_media_host = "http://media.example.com:5000"
timeout_secs = 10
credentials_path = "/tmp/creds.json"
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(
            config.credential_store().unwrap().path(),
            Path::new("/tmp/creds.json")
        );

        let resolver = config.media_resolver().unwrap();
        let url = resolver.resolve(r"F:\audio\track1.mp3").unwrap();
        assert_eq!(url.as_str(), "http://media.example.com:5000/uploads/track1.mp3");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/ielts.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn invalid_media_host_is_rejected() {
        let config = IeltsConfig {
            legacy_media_host: Some("not a url".into()),
            ..IeltsConfig::default()
        };
        assert!(config.media_resolver().is_err());
    }
}
