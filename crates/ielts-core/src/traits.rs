//! Trait seams between the session logic and the outside world.
//!
//! `TestApi`, `AuthApi` and `MediaLoader` are implemented over HTTP by the
//! `ielts-client` crate; `Notifier` is implemented by whichever front end
//! shows messages to the user.

use async_trait::async_trait;
use url::Url;

use crate::error::ApiError;
use crate::media::MediaInfo;
use crate::model::{
    AuthSession, Credentials, GradeRequest, Submission, SubmissionRequest, Test, UserProfile,
};

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Test and submission endpoints of the backend.
#[async_trait]
pub trait TestApi: Send + Sync {
    /// Short backend name for logs (e.g. "http", "offline").
    fn name(&self) -> &str;

    /// Fetch one test with its sections and questions.
    async fn fetch_test(&self, test_id: &str) -> Result<Test, ApiError>;

    /// Submit the finished answers of one attempt.
    async fn submit_answers(&self, request: &SubmissionRequest) -> Result<Submission, ApiError>;

    /// Submissions made by the current user.
    async fn my_submissions(&self) -> Result<Vec<Submission>, ApiError>;

    /// Grade a pending submission (admin only).
    async fn grade_submission(
        &self,
        submission_id: &str,
        request: &GradeRequest,
    ) -> Result<Submission, ApiError>;
}

/// Authentication endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError>;

    async fn current_user(&self) -> Result<UserProfile, ApiError>;

    async fn logout(&self) -> Result<(), ApiError>;
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Loads (or at least checks) a media resource.
#[async_trait]
pub trait MediaLoader: Send + Sync {
    async fn probe(&self, url: &Url) -> Result<MediaInfo, ApiError>;
}

// ---------------------------------------------------------------------------
// User-facing notifications
// ---------------------------------------------------------------------------

/// Receives the user-visible outcomes of session operations.
pub trait Notifier: Send + Sync {
    /// Transient success message.
    fn success(&self, message: &str);

    /// Transient error message.
    fn error(&self, message: &str);

    /// The attempt was accepted; the front end should leave the session.
    fn on_submitted(&self, submission: &Submission);

    /// The backend rejected the credentials; route to login.
    fn on_unauthorized(&self);
}

/// Notifier that drops everything.
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn success(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn on_submitted(&self, _: &Submission) {}
    fn on_unauthorized(&self) {}
}
