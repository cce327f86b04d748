//! The `ielts login` command.

use std::io::BufRead;
use std::path::PathBuf;

use anyhow::{Context, Result};

use ielts_client::{create_api, load_config_from};
use ielts_core::error::ValidationError;
use ielts_core::model::Credentials;
use ielts_core::traits::AuthApi;

use super::api_failure;

pub async fn execute(
    config_path: Option<PathBuf>,
    email: String,
    password: Option<String>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;

    let email = email.trim().to_string();
    if email.is_empty() {
        return Err(ValidationError::Missing { field: "email" }.into());
    }
    let password = match password {
        Some(p) => p,
        None => read_password()?,
    };
    if password.is_empty() {
        return Err(ValidationError::Missing { field: "password" }.into());
    }

    let api = create_api(&config, None)?;
    let session = api
        .login(&Credentials { email, password })
        .await
        .map_err(|e| api_failure(e, "login failed"))?;

    let store = config.credential_store()?;
    store.save(&session)?;
    tracing::debug!(path = %store.path().display(), "session stored");

    println!(
        "Logged in as {} <{}>",
        session.user.name, session.user.email
    );
    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password from stdin")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
