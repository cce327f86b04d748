//! On-disk storage for the login session.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use ielts_core::model::AuthSession;

use crate::config::config_dir;

/// JSON file holding the token and the minimal user fields.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.config/ielts/credentials.json`
    pub fn default_location() -> Result<Self> {
        let dir = config_dir().context("HOME is not set; pass credentials_path in the config")?;
        Ok(Self::new(dir.join("credentials.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session. `None` when nobody is logged in.
    pub fn load(&self) -> Result<Option<AuthSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read credentials: {}", self.path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("corrupt credentials file: {}", self.path.display()))?;
        Ok(Some(session))
    }

    pub fn save(&self, session: &AuthSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("failed to write credentials: {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("failed to restrict {}", self.path.display()))?;
        }

        debug!(path = %self.path.display(), "credentials saved");
        Ok(())
    }

    /// Remove the stored session. Returns `false` if there was none.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&self.path)
            .with_context(|| format!("failed to remove credentials: {}", self.path.display()))?;
        Ok(true)
    }
}
