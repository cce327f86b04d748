//! The `ielts grade` command.

use std::path::PathBuf;

use anyhow::Result;

use ielts_client::{load_config_from, OfflineApi};
use ielts_core::model::{GradeRequest, UserRole};
use ielts_core::traits::TestApi;

use super::{api_failure, authenticated_api};

pub async fn execute(
    config_path: Option<PathBuf>,
    submission_id: String,
    grade: f64,
    feedback: Option<String>,
    offline: Option<PathBuf>,
) -> Result<()> {
    // Invalid input never reaches the backend.
    let request = GradeRequest::new(grade, feedback)?;

    let submission = match offline {
        Some(dir) => OfflineApi::new(&dir, &dir)
            .grade_submission(&submission_id, &request)
            .await
            .map_err(|e| api_failure(e, "failed to grade submission"))?,
        None => {
            let config = load_config_from(config_path.as_deref())?;
            let (api, session) = authenticated_api(&config)?;
            anyhow::ensure!(
                session.user.role == UserRole::Admin,
                "grading requires an admin account (signed in as {})",
                session.user.email
            );
            api.grade_submission(&submission_id, &request)
                .await
                .map_err(|e| api_failure(e, "failed to grade submission"))?
        }
    };

    println!(
        "Submission {} graded: band {:.1}",
        submission.id,
        submission.grade.unwrap_or(request.grade)
    );
    if let Some(feedback) = &submission.feedback {
        println!("Feedback: {feedback}");
    }
    Ok(())
}
