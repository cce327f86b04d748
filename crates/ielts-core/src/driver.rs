//! Drives a session's countdown in real time.
//!
//! One tick per second; on expiry the dispatcher submits whatever answers
//! exist and the task ends. Dropping the [`CountdownHandle`] stops the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::countdown::TickOutcome;
use crate::dispatcher::{SubmissionDispatcher, SubmitTrigger};
use crate::session::{lock_session, SharedSession};

const TICK: Duration = Duration::from_secs(1);

/// Owns the running countdown task.
pub struct CountdownHandle {
    task: JoinHandle<()>,
    remaining: watch::Receiver<u64>,
}

impl CountdownHandle {
    /// Seconds left, updated on every tick.
    pub fn remaining(&self) -> watch::Receiver<u64> {
        self.remaining.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start the session's timer and tick it until it expires, the attempt is
/// submitted, or the handle is dropped.
pub fn spawn_countdown(
    session: SharedSession,
    dispatcher: Arc<SubmissionDispatcher>,
) -> CountdownHandle {
    let initial = {
        let mut guard = lock_session(&session);
        guard.start();
        guard.time_left()
    };
    let (tx, rx) = watch::channel(initial);

    let task = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + TICK, TICK);
        loop {
            ticker.tick().await;
            let outcome = {
                let mut guard = lock_session(&session);
                if guard.is_submitted() {
                    break;
                }
                guard.tick()
            };
            match outcome {
                TickOutcome::Running(left) => {
                    let _ = tx.send(left);
                }
                TickOutcome::Expired => {
                    let _ = tx.send(0);
                    tracing::info!("time is up, submitting automatically");
                    dispatcher.submit(&session, SubmitTrigger::TimeExpired).await;
                    break;
                }
                TickOutcome::Stopped => break,
            }
        }
        tracing::debug!("countdown task finished");
    });

    CountdownHandle {
        task,
        remaining: rx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::AnswerKey;
    use crate::dispatcher::testing::{FakeApi, RecordingNotifier};
    use crate::session::fixtures::two_section_test;
    use crate::session::{SubmitPhase, TestSession};

    fn start() -> (Arc<FakeApi>, SharedSession, CountdownHandle) {
        let api = Arc::new(FakeApi::default());
        let dispatcher = Arc::new(SubmissionDispatcher::new(
            api.clone(),
            Arc::new(RecordingNotifier::default()),
        ));
        let session = TestSession::new(two_section_test()).into_shared();
        let handle = spawn_countdown(session.clone(), dispatcher);
        (api, session, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn submits_once_after_exactly_duration_ticks() {
        let (api, session, handle) = start();
        assert_eq!(*handle.remaining().borrow(), 60);

        tokio::time::sleep(Duration::from_millis(59_500)).await;
        assert_eq!(api.calls(), 0);
        assert_eq!(*handle.remaining().borrow(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(api.calls(), 1);
        assert_eq!(lock_session(&session).phase(), SubmitPhase::Submitted);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.calls(), 1);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_submits_current_answers_with_blanks() {
        let (api, session, _handle) = start();
        lock_session(&session)
            .set_answer(AnswerKey::question("q1"), "Paris")
            .unwrap();

        tokio::time::sleep(Duration::from_secs(61)).await;

        let request = api.last_request.lock().unwrap().clone().unwrap();
        assert_eq!(request.answers.len(), 3);
        assert_eq!(request.answer("q1"), Some("Paris"));
        assert_eq!(request.answer("q2"), Some(""));
        assert_eq!(request.answer("q3"), Some(""));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_ticks() {
        let (api, session, handle) = start();
        tokio::time::sleep(Duration::from_millis(10_500)).await;
        drop(handle);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(api.calls(), 0);
        assert_eq!(lock_session(&session).time_left(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_submit_stops_the_timer() {
        let (api, session, handle) = start();
        lock_session(&session).begin_submit();
        lock_session(&session).complete_submit();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(handle.is_finished());
        assert_eq!(api.calls(), 0);
    }
}
