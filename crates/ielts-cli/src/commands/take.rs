//! The `ielts take` command.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;

use ielts_client::{create_media_loader, load_config_from, OfflineApi};
use ielts_core::dispatcher::SubmissionDispatcher;
use ielts_core::driver::spawn_countdown;
use ielts_core::parser::{parse_test_file, validate_test};
use ielts_core::session::TestSession;
use ielts_core::traits::{MediaLoader, Notifier, TestApi};

use crate::console::{Console, ConsoleNotifier, MediaPanel, SessionEnd};

use super::{api_failure, authenticated_api};

pub async fn execute(
    config_path: Option<PathBuf>,
    test_id: Option<String>,
    file: Option<PathBuf>,
    output: PathBuf,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let resolver = config.media_resolver()?;

    let (api, test_id, loader): (Arc<dyn TestApi>, String, Option<Arc<dyn MediaLoader>>) =
        match (file, test_id) {
            (Some(file), _) => {
                let test = parse_test_file(&file)?;
                (Arc::new(OfflineApi::new(&file, &output)), test.id, None)
            }
            (None, Some(id)) => {
                let (api, _) = authenticated_api(&config)?;
                let loader = create_media_loader(&config)?;
                (Arc::new(api), id, Some(Arc::new(loader)))
            }
            (None, None) => {
                anyhow::bail!("pass --test-id to take a test online or --file to take one offline")
            }
        };

    let test = api
        .fetch_test(&test_id)
        .await
        .map_err(|e| api_failure(e, "failed to load test"))?;

    for warning in validate_test(&test) {
        tracing::warn!(
            section = warning.section_id.as_deref().unwrap_or("-"),
            question = warning.question_id.as_deref().unwrap_or("-"),
            "{}",
            warning.message
        );
    }

    println!(
        "{} ({}, {} min, {} sections, {} questions). Type `help` for commands.",
        test.title,
        test.kind,
        test.duration,
        test.sections.len(),
        test.question_count()
    );

    let notifier: Arc<dyn Notifier> = Arc::new(ConsoleNotifier);
    let dispatcher = Arc::new(SubmissionDispatcher::new(api, notifier));
    let session = TestSession::new(test).into_shared();
    let countdown = spawn_countdown(session.clone(), dispatcher.clone());

    let mut console = Console::new(
        session,
        dispatcher,
        MediaPanel::new(resolver, loader),
        std::io::stdout(),
    );
    let end = console
        .run(BufReader::new(tokio::io::stdin()), Some(countdown.remaining()))
        .await
        .context("interactive session failed")?;
    drop(countdown);

    match end {
        SessionEnd::Submitted => Ok(()),
        SessionEnd::Abandoned => {
            println!("Attempt ended without a submission.");
            Ok(())
        }
    }
}
