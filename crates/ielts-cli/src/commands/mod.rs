pub mod grade;
pub mod init;
pub mod login;
pub mod logout;
pub mod resolve_media;
pub mod submissions;
pub mod take;
pub mod validate;
pub mod whoami;

use anyhow::{Context, Result};

use ielts_client::{create_api, HttpApi, IeltsConfig};
use ielts_core::error::ApiError;
use ielts_core::model::AuthSession;

/// The stored session, or an error telling the user to log in.
pub(crate) fn require_session(config: &IeltsConfig) -> Result<AuthSession> {
    config
        .credential_store()?
        .load()?
        .context("not logged in; run `ielts login` first")
}

/// REST client carrying the stored session.
pub(crate) fn authenticated_api(config: &IeltsConfig) -> Result<(HttpApi, AuthSession)> {
    let session = require_session(config)?;
    let api = create_api(config, Some(session.clone()))?;
    Ok((api, session))
}

/// Turn an [`ApiError`] into a CLI error, pointing at `ielts login` when the
/// token was rejected.
pub(crate) fn api_failure(e: ApiError, what: &str) -> anyhow::Error {
    if e.is_unauthorized() {
        anyhow::anyhow!("{what}: {e}; run `ielts login` to sign in again")
    } else {
        anyhow::Error::new(e).context(what.to_string())
    }
}
