//! Submission dispatcher.
//!
//! Both the manual submit button and timer expiry go through
//! [`SubmissionDispatcher::submit`]. The session's submit phase is flipped
//! under the lock before the request is sent, so at most one submission is
//! ever on the wire per attempt.

use std::sync::{Arc, Mutex};

use tracing::instrument;

use crate::error::ApiError;
use crate::model::Submission;
use crate::session::{lock_session, TestSession};
use crate::traits::{Notifier, TestApi};

/// What caused a submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimeExpired,
}

/// Result of one call to [`SubmissionDispatcher::submit`].
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The backend recorded the attempt.
    Submitted(Submission),
    /// The request failed; the session is unchanged and may submit again.
    Failed(ApiError),
    /// Another submit was in flight or already done. Nothing was sent.
    Ignored,
}

impl DispatchOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, DispatchOutcome::Submitted(_))
    }
}

pub struct SubmissionDispatcher {
    api: Arc<dyn TestApi>,
    notifier: Arc<dyn Notifier>,
}

impl SubmissionDispatcher {
    pub fn new(api: Arc<dyn TestApi>, notifier: Arc<dyn Notifier>) -> Self {
        Self { api, notifier }
    }

    /// Submit the session's answers once.
    #[instrument(skip(self, session))]
    pub async fn submit(
        &self,
        session: &Mutex<TestSession>,
        trigger: SubmitTrigger,
    ) -> DispatchOutcome {
        let request = lock_session(session).begin_submit();
        let Some(request) = request else {
            tracing::debug!("submit ignored, attempt already in flight or submitted");
            return DispatchOutcome::Ignored;
        };

        tracing::info!(
            test_id = %request.test_id,
            entries = request.answers.len(),
            backend = self.api.name(),
            "submitting attempt"
        );

        match self.api.submit_answers(&request).await {
            Ok(submission) => {
                lock_session(session).complete_submit();
                let message = match trigger {
                    SubmitTrigger::Manual => "Test submitted successfully!",
                    SubmitTrigger::TimeExpired => "Time is up! Your answers have been submitted.",
                };
                self.notifier.success(message);
                self.notifier.on_submitted(&submission);
                DispatchOutcome::Submitted(submission)
            }
            Err(e) => {
                lock_session(session).fail_submit();
                tracing::error!("submission failed: {e}");
                self.notifier
                    .error(&format!("Failed to submit test. Please try again. ({e})"));
                if e.is_unauthorized() {
                    self.notifier.on_unauthorized();
                }
                DispatchOutcome::Failed(e)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::testing::{FakeApi, RecordingNotifier};
    use super::*;
    use crate::answers::AnswerKey;
    use crate::session::fixtures::two_section_test;
    use crate::session::SubmitPhase;

    fn setup(api: FakeApi) -> (Arc<FakeApi>, Arc<RecordingNotifier>, SubmissionDispatcher) {
        let api = Arc::new(api);
        let notifier = Arc::new(RecordingNotifier::default());
        let dispatcher = SubmissionDispatcher::new(api.clone(), notifier.clone());
        (api, notifier, dispatcher)
    }

    #[tokio::test]
    async fn successful_submit_is_terminal() {
        let (api, notifier, dispatcher) = setup(FakeApi::default());
        let session = Mutex::new(TestSession::new(two_section_test()));
        lock_session(&session)
            .set_answer(AnswerKey::question("q1"), "Paris")
            .unwrap();

        let outcome = dispatcher.submit(&session, SubmitTrigger::Manual).await;
        assert!(outcome.is_submitted());
        assert_eq!(lock_session(&session).phase(), SubmitPhase::Submitted);
        assert_eq!(
            notifier.events(),
            vec!["success: Test submitted successfully!", "submitted: sub1"]
        );

        let again = dispatcher.submit(&session, SubmitTrigger::Manual).await;
        assert!(matches!(again, DispatchOutcome::Ignored));
        assert_eq!(api.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_submits_send_one_request() {
        let (api, _notifier, dispatcher) = setup(FakeApi {
            latency: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let session = Mutex::new(TestSession::new(two_section_test()));

        let outcomes = futures::future::join_all(
            (0..5).map(|_| dispatcher.submit(&session, SubmitTrigger::Manual)),
        )
        .await;

        assert_eq!(api.calls(), 1);
        assert_eq!(outcomes.iter().filter(|o| o.is_submitted()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, DispatchOutcome::Ignored))
                .count(),
            4
        );
    }

    #[tokio::test]
    async fn server_error_leaves_session_retryable() {
        let (api, notifier, dispatcher) = setup(FakeApi::default());
        *api.fail_with.lock().unwrap() = Some(500);

        let session = Mutex::new(TestSession::new(two_section_test()));
        lock_session(&session)
            .set_answer(AnswerKey::question("q2"), "B")
            .unwrap();
        let before = lock_session(&session).answers().clone();

        let outcome = dispatcher.submit(&session, SubmitTrigger::Manual).await;
        assert!(matches!(
            outcome,
            DispatchOutcome::Failed(ApiError::Http { status: 500, .. })
        ));
        assert_eq!(lock_session(&session).phase(), SubmitPhase::Idle);
        assert_eq!(lock_session(&session).answers(), &before);
        let events = notifier.events();
        assert_eq!(events.len(), 1);
        assert!(events[0].starts_with("error: Failed to submit test"));

        *api.fail_with.lock().unwrap() = None;
        let retry = dispatcher.submit(&session, SubmitTrigger::Manual).await;
        assert!(retry.is_submitted());
        assert_eq!(api.calls(), 2);
    }

    #[tokio::test]
    async fn unauthorized_routes_to_login() {
        let (api, notifier, dispatcher) = setup(FakeApi::default());
        *api.fail_with.lock().unwrap() = Some(401);
        let session = Mutex::new(TestSession::new(two_section_test()));

        dispatcher.submit(&session, SubmitTrigger::Manual).await;
        assert_eq!(notifier.events().last().unwrap(), "unauthorized");
        assert_eq!(lock_session(&session).phase(), SubmitPhase::Idle);
    }
}
