//! The `ielts whoami` command.

use std::path::PathBuf;

use anyhow::Result;

use ielts_client::load_config_from;
use ielts_core::traits::AuthApi;

use super::{api_failure, authenticated_api};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let (api, _) = authenticated_api(&config)?;

    let user = api
        .current_user()
        .await
        .map_err(|e| api_failure(e, "failed to fetch current user"))?;

    println!("{} <{}>", user.name, user.email);
    println!("role: {:?}", user.role);
    println!("server: {}", api.base_url());
    Ok(())
}
