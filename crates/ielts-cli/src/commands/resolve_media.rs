//! The `ielts resolve-media` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use ielts_client::load_config_from;

pub fn execute(
    config_path: Option<PathBuf>,
    reference: String,
    host: Option<String>,
) -> Result<()> {
    let mut config = load_config_from(config_path.as_deref())?;
    if host.is_some() {
        config.legacy_media_host = host;
    }

    let url = config
        .media_resolver()?
        .resolve(&reference)
        .with_context(|| format!("cannot resolve {reference:?}"))?;
    println!("{url}");
    Ok(())
}
