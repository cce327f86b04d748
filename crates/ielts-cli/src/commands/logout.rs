//! The `ielts logout` command.

use std::path::PathBuf;

use anyhow::Result;

use ielts_client::{create_api, load_config_from};
use ielts_core::traits::AuthApi;

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let store = config.credential_store()?;

    let Some(session) = store.load()? else {
        println!("Not logged in.");
        return Ok(());
    };

    // The local token is dropped even if the server call fails.
    let api = create_api(&config, Some(session))?;
    if let Err(e) = api.logout().await {
        tracing::warn!("server logout failed: {e}");
    }

    store.clear()?;
    println!("Logged out.");
    Ok(())
}
