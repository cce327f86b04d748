//! File-backed backend for practising without a server.
//!
//! Tests are read from a directory of `.toml`/`.json` definitions and
//! submissions are written as `submission-<uuid>.json` files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use ielts_core::error::ApiError;
use ielts_core::model::{
    GradeRequest, Reference, Submission, SubmissionRequest, SubmissionStatus, Test,
};
use ielts_core::parser::{load_test_directory, parse_test_file};
use ielts_core::traits::TestApi;

const SUBMISSION_PREFIX: &str = "submission-";
const OFFLINE_USER: &str = "offline";

pub struct OfflineApi {
    source: TestSource,
    output_dir: PathBuf,
}

enum TestSource {
    File(PathBuf),
    Directory(PathBuf),
}

impl OfflineApi {
    /// `tests` may be a single definition file or a directory of them.
    pub fn new(tests: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let tests = tests.into();
        let source = if tests.is_dir() {
            TestSource::Directory(tests)
        } else {
            TestSource::File(tests)
        };
        Self {
            source,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn submission_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(format!("{SUBMISSION_PREFIX}{id}.json"))
    }

    async fn write_submission(&self, submission: &Submission) -> Result<PathBuf, ApiError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| io_error(&self.output_dir, e))?;
        let path = self.submission_path(&submission.id);
        let json = serde_json::to_string_pretty(submission)
            .map_err(|e| ApiError::Decode(e.to_string()))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| io_error(&path, e))?;
        Ok(path)
    }

    async fn read_submission(&self, path: &Path) -> Result<Submission, ApiError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| io_error(path, e))?;
        serde_json::from_str(&content)
            .map_err(|e| ApiError::Decode(format!("{}: {e}", path.display())))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> ApiError {
    if e.kind() == std::io::ErrorKind::NotFound {
        ApiError::NotFound(path.display().to_string())
    } else {
        ApiError::Network(format!("{}: {e}", path.display()))
    }
}

#[async_trait]
impl TestApi for OfflineApi {
    fn name(&self) -> &str {
        "offline"
    }

    #[instrument(skip(self))]
    async fn fetch_test(&self, test_id: &str) -> Result<Test, ApiError> {
        let tests = match &self.source {
            TestSource::File(path) => {
                vec![parse_test_file(path).map_err(|e| ApiError::Decode(format!("{e:#}")))?]
            }
            TestSource::Directory(dir) => {
                load_test_directory(dir).map_err(|e| ApiError::Decode(format!("{e:#}")))?
            }
        };

        tests
            .into_iter()
            .find(|t| t.id == test_id)
            .ok_or_else(|| ApiError::NotFound(format!("test {test_id}")))
    }

    #[instrument(skip(self, request), fields(test_id = %request.test_id))]
    async fn submit_answers(&self, request: &SubmissionRequest) -> Result<Submission, ApiError> {
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            user: Some(Reference::from(OFFLINE_USER)),
            test: Reference::from(request.test_id.as_str()),
            answers: request.answers.clone(),
            status: SubmissionStatus::Pending,
            grade: None,
            feedback: None,
            submitted_at: Utc::now(),
            graded_at: None,
            graded_by: None,
        };
        let path = self.write_submission(&submission).await?;
        info!(id = %submission.id, path = %path.display(), "submission saved");
        Ok(submission)
    }

    async fn my_submissions(&self) -> Result<Vec<Submission>, ApiError> {
        let mut entries = match tokio::fs::read_dir(&self.output_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.output_dir, e)),
        };

        let mut submissions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.output_dir, e))?
        {
            let path = entry.path();
            let is_submission = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SUBMISSION_PREFIX) && n.ends_with(".json"));
            if !is_submission {
                continue;
            }
            match self.read_submission(&path).await {
                Ok(submission) => submissions.push(submission),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable submission")
                }
            }
        }

        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(submissions)
    }

    #[instrument(skip(self, request))]
    async fn grade_submission(
        &self,
        submission_id: &str,
        request: &GradeRequest,
    ) -> Result<Submission, ApiError> {
        let path = self.submission_path(submission_id);
        let mut submission = self.read_submission(&path).await?;
        submission
            .grade(request.clone(), OFFLINE_USER, Utc::now())
            .map_err(|e| ApiError::Http {
                status: 400,
                message: e.to_string(),
            })?;
        self.write_submission(&submission).await?;
        Ok(submission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ielts_core::model::AnswerEntry;

    const TEST_TOML: &str = r#"
id = "reading-1"
title = "Reading 1"
type = "reading"
duration = 60

[[sections]]
id = "s1"
name = "Passage 1"

[[sections.questions]]
id = "q1"
questionText = "Who wrote the letter?"
questionType = "short-answer"
"#;

    fn request() -> SubmissionRequest {
        SubmissionRequest {
            test_id: "reading-1".into(),
            answers: vec![AnswerEntry {
                question_id: "q1".into(),
                answer: "Darwin".into(),
            }],
        }
    }

    #[tokio::test]
    async fn fetch_from_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("reading.toml");
        std::fs::write(&file, TEST_TOML).unwrap();

        let by_file = OfflineApi::new(&file, dir.path().join("out"));
        assert_eq!(by_file.fetch_test("reading-1").await.unwrap().title, "Reading 1");

        let by_dir = OfflineApi::new(dir.path(), dir.path().join("out"));
        assert!(by_dir.fetch_test("reading-1").await.is_ok());
        assert!(matches!(
            by_dir.fetch_test("other").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn submit_then_list_then_grade() {
        let dir = tempfile::tempdir().unwrap();
        let api = OfflineApi::new(dir.path().join("tests"), dir.path().join("out"));

        assert!(api.my_submissions().await.unwrap().is_empty());

        let submission = api.submit_answers(&request()).await.unwrap();
        assert_eq!(submission.status, SubmissionStatus::Pending);
        assert!(api.output_dir().join(format!("submission-{}.json", submission.id)).exists());

        let listed = api.my_submissions().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].answers[0].answer, "Darwin");

        let grade = GradeRequest::new(7.5, Some("Well done".into())).unwrap();
        let graded = api.grade_submission(&submission.id, &grade).await.unwrap();
        assert!(graded.is_graded());
        assert_eq!(graded.grade, Some(7.5));

        let err = api.grade_submission(&submission.id, &grade).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
    }

    #[tokio::test]
    async fn grading_unknown_submission_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let api = OfflineApi::new(dir.path(), dir.path());
        let grade = GradeRequest::new(5.0, None).unwrap();
        let err = api.grade_submission("missing", &grade).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
