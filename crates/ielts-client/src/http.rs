//! REST backend over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use ielts_core::error::ApiError;
use ielts_core::media::MediaInfo;
use ielts_core::model::{
    AuthSession, Credentials, GradeRequest, Submission, SubmissionRequest, Test, UserProfile,
};
use ielts_core::traits::{AuthApi, MediaLoader, TestApi};

use crate::error::{status_error, transport_error};
use crate::inspect::{audio_duration, body_kind, extension, pdf_page_count, BodyKind};

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Client for the IELTS backend REST API.
///
/// Requests carry `Authorization: Bearer <token>` when an [`AuthSession`]
/// has been attached with [`HttpApi::with_session`].
pub struct HttpApi {
    base_url: String,
    client: reqwest::Client,
    timeout_secs: u64,
    session: Option<AuthSession>,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout_secs: timeout.as_secs(),
            session: None,
        })
    }

    pub fn with_session(mut self, session: AuthSession) -> Self {
        self.session = Some(session);
        self
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.session {
            Some(session) => builder.bearer_auth(&session.token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, ApiError> {
        let body = self.send_raw(builder, what).await?;
        serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{what}: {e}")))
    }

    async fn send_raw(&self, builder: RequestBuilder, what: &str) -> Result<String, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;
        debug!(status, bytes = body.len(), "response received");

        if status >= 400 {
            return Err(status_error(status, body, what));
        }
        Ok(body)
    }
}

#[async_trait]
impl TestApi for HttpApi {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn fetch_test(&self, test_id: &str) -> Result<Test, ApiError> {
        let builder = self.request(Method::GET, &format!("/api/tests/{test_id}"));
        self.send(builder, &format!("test {test_id}")).await
    }

    #[instrument(
        skip(self, request),
        fields(test_id = %request.test_id, answers = request.answers.len())
    )]
    async fn submit_answers(&self, request: &SubmissionRequest) -> Result<Submission, ApiError> {
        let builder = self.request(Method::POST, "/api/submissions").json(request);
        self.send(builder, "submission").await
    }

    #[instrument(skip(self))]
    async fn my_submissions(&self) -> Result<Vec<Submission>, ApiError> {
        let builder = self.request(Method::GET, "/api/submissions/me");
        self.send(builder, "submissions").await
    }

    #[instrument(skip(self, request), fields(grade = request.grade))]
    async fn grade_submission(
        &self,
        submission_id: &str,
        request: &GradeRequest,
    ) -> Result<Submission, ApiError> {
        let builder = self
            .request(Method::PUT, &format!("/api/submissions/{submission_id}/grade"))
            .json(request);
        self.send(builder, &format!("submission {submission_id}")).await
    }
}

#[async_trait]
impl AuthApi for HttpApi {
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &Credentials) -> Result<AuthSession, ApiError> {
        let builder = self.request(Method::POST, "/api/auth/login").json(credentials);
        self.send(builder, "login").await
    }

    #[instrument(skip(self))]
    async fn current_user(&self) -> Result<UserProfile, ApiError> {
        let builder = self.request(Method::GET, "/api/auth/me");
        self.send(builder, "current user").await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> Result<(), ApiError> {
        let builder = self.request(Method::POST, "/api/auth/logout");
        self.send_raw(builder, "logout").await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Checks that a media URL is reachable and reports what it serves.
pub struct HttpMediaLoader {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpMediaLoader {
    pub fn new(timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs: timeout.as_secs(),
        })
    }
}

#[async_trait]
impl MediaLoader for HttpMediaLoader {
    #[instrument(skip(self), fields(url = %url))]
    async fn probe(&self, url: &Url) -> Result<MediaInfo, ApiError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout_secs))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, body, url.as_str()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut info = MediaInfo {
            content_length: response.content_length(),
            ..Default::default()
        };

        if let Some(kind) = body_kind(content_type.as_deref(), url) {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| transport_error(e, self.timeout_secs))?;
            info.content_length = Some(bytes.len() as u64);
            match kind {
                BodyKind::Pdf => info.page_count = pdf_page_count(&bytes),
                BodyKind::Audio => {
                    info.duration = audio_duration(bytes.to_vec(), extension(url).as_deref())
                }
            }
            debug!(
                pages = ?info.page_count,
                duration = ?info.duration,
                "inspected media body"
            );
        }

        info.content_type = content_type;
        Ok(info)
    }
}
