//! In-memory backend and notifier for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use ielts_core::error::ApiError;
use ielts_core::model::{
    AuthSession, Credentials, GradeRequest, Reference, Submission, SubmissionRequest,
    SubmissionStatus, Test, UserProfile, UserRole,
};
use ielts_core::traits::{AuthApi, Notifier, TestApi};

/// A mock backend for exercising sessions without a server.
///
/// Serves the tests it was built with and records every submission.
pub struct MockApi {
    tests: HashMap<String, Test>,
    submissions: Mutex<Vec<Submission>>,
    /// Status to fail the next submit with.
    fail_next_submit: Mutex<Option<u16>>,
    submit_count: AtomicU32,
    last_request: Mutex<Option<SubmissionRequest>>,
    password: String,
    user: UserProfile,
}

impl MockApi {
    pub fn new(tests: impl IntoIterator<Item = Test>) -> Self {
        Self {
            tests: tests.into_iter().map(|t| (t.id.clone(), t)).collect(),
            submissions: Mutex::new(Vec::new()),
            fail_next_submit: Mutex::new(None),
            submit_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
            password: "password".to_string(),
            user: UserProfile {
                id: "mock-user".into(),
                name: "Mock User".into(),
                email: "user@example.com".into(),
                role: UserRole::User,
            },
        }
    }

    /// Accept logins for this user with this password.
    pub fn with_user(mut self, user: UserProfile, password: &str) -> Self {
        self.user = user;
        self.password = password.to_string();
        self
    }

    /// Make the next submit fail with the given HTTP status.
    pub fn fail_next_submit(&self, status: u16) {
        *self.fail_next_submit.lock().unwrap() = Some(status);
    }

    /// Number of submit calls received, failed ones included.
    pub fn submit_count(&self) -> u32 {
        self.submit_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<SubmissionRequest> {
        self.last_request.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl TestApi for MockApi {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_test(&self, test_id: &str) -> Result<Test, ApiError> {
        self.tests
            .get(test_id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("test {test_id}")))
    }

    async fn submit_answers(&self, request: &SubmissionRequest) -> Result<Submission, ApiError> {
        let n = self.submit_count.fetch_add(1, Ordering::Relaxed) + 1;
        *self.last_request.lock().unwrap() = Some(request.clone());

        let fail = self.fail_next_submit.lock().unwrap().take();
        match fail {
            Some(401 | 403) => return Err(ApiError::Unauthorized("session expired".into())),
            Some(status) => {
                return Err(ApiError::Http {
                    status,
                    message: "mock failure".into(),
                })
            }
            None => {}
        }

        let submission = Submission {
            id: format!("mock-sub-{n}"),
            user: Some(Reference::from(self.user.id.as_str())),
            test: Reference::from(request.test_id.as_str()),
            answers: request.answers.clone(),
            status: SubmissionStatus::Pending,
            grade: None,
            feedback: None,
            submitted_at: Utc::now(),
            graded_at: None,
            graded_by: None,
        };
        self.submissions.lock().unwrap().push(submission.clone());
        Ok(submission)
    }

    async fn my_submissions(&self) -> Result<Vec<Submission>, ApiError> {
        Ok(self.submissions())
    }

    async fn grade_submission(
        &self,
        submission_id: &str,
        request: &GradeRequest,
    ) -> Result<Submission, ApiError> {
        let mut submissions = self.submissions.lock().unwrap();
        let submission = submissions
            .iter_mut()
            .find(|s| s.id == submission_id)
            .ok_or_else(|| ApiError::NotFound(format!("submission {submission_id}")))?;
        submission
            .grade(request.clone(), self.user.id.as_str(), Utc::now())
            .map_err(|e| ApiError::Http {
                status: 400,
                message: e.to_string(),
            })?;
        Ok(submission.clone())
    }
}

#[async_trait]
impl AuthApi for MockApi {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        if credentials.email != self.user.email || credentials.password != self.password {
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
        Ok(AuthSession {
            token: "mock-token".into(),
            user: self.user.clone(),
        })
    }

    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        Ok(self.user.clone())
    }

    async fn logout(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// Notifier that keeps every event as a line of text.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.push(format!("success: {message}"));
    }

    fn error(&self, message: &str) {
        self.push(format!("error: {message}"));
    }

    fn on_submitted(&self, submission: &Submission) {
        self.push(format!("submitted: {}", submission.id));
    }

    fn on_unauthorized(&self) {
        self.push("unauthorized".to_string());
    }
}
