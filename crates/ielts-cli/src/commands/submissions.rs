//! The `ielts submissions` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use ielts_client::{load_config_from, OfflineApi};
use ielts_core::model::Submission;
use ielts_core::traits::TestApi;

use super::{api_failure, authenticated_api};

pub async fn execute(config_path: Option<PathBuf>, offline: Option<PathBuf>) -> Result<()> {
    let submissions = match offline {
        Some(dir) => OfflineApi::new(&dir, &dir)
            .my_submissions()
            .await
            .map_err(|e| api_failure(e, "failed to read local submissions"))?,
        None => {
            let config = load_config_from(config_path.as_deref())?;
            let (api, _) = authenticated_api(&config)?;
            api.my_submissions()
                .await
                .map_err(|e| api_failure(e, "failed to fetch submissions"))?
        }
    };

    if submissions.is_empty() {
        println!("No submissions yet.");
        return Ok(());
    }

    println!("{}", submissions_table(&submissions));
    Ok(())
}

fn submissions_table(submissions: &[Submission]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Test", "Status", "Band", "Answers", "Submitted"]);

    for s in submissions {
        let band = s
            .grade
            .map(|g| format!("{g:.1}"))
            .unwrap_or_else(|| "-".to_string());
        let answered = s.answers.iter().filter(|a| !a.answer.trim().is_empty()).count();
        table.add_row(vec![
            Cell::new(&s.id),
            Cell::new(s.test.label()),
            Cell::new(s.status),
            Cell::new(band),
            Cell::new(format!("{answered}/{}", s.answers.len())),
            Cell::new(s.submitted_at.format("%Y-%m-%d %H:%M")),
        ]);
    }

    table
}
