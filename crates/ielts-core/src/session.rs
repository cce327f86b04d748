//! State of one in-progress test attempt.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::answers::{AnswerKey, AnswerMap};
use crate::countdown::{Countdown, TickOutcome};
use crate::error::SessionError;
use crate::model::{Section, SubmissionRequest, Test};
use crate::navigator::Cursor;

/// A session shared between the countdown task and user input.
pub type SharedSession = Arc<Mutex<TestSession>>;

/// Lock a shared session. A panic while holding the lock leaves the session
/// data consistent, so a poisoned lock is recovered.
pub fn lock_session(session: &Mutex<TestSession>) -> MutexGuard<'_, TestSession> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Where the attempt is in the submission lifecycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitPhase {
    #[default]
    Idle,
    /// A submit request is on the wire; further submits are ignored.
    InFlight,
    /// Accepted by the backend. Terminal.
    Submitted,
}

/// Mutable state of one attempt at a test.
#[derive(Debug, Clone)]
pub struct TestSession {
    test: Test,
    sections: Cursor,
    answers: AnswerMap,
    countdown: Countdown,
    phase: SubmitPhase,
}

impl TestSession {
    pub fn new(test: Test) -> Self {
        Self {
            sections: Cursor::new(test.sections.len()),
            countdown: Countdown::new(test.duration_secs()),
            answers: AnswerMap::new(),
            phase: SubmitPhase::Idle,
            test,
        }
    }

    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    /// Replace the test with a freshly fetched copy.
    ///
    /// Answers are kept; only the countdown is re-seeded from the new
    /// duration and the section position is pulled back into range.
    pub fn reload(&mut self, test: Test) {
        tracing::debug!(test_id = %test.id, "reloading test data into active session");
        self.countdown.reseed(test.duration_secs());
        self.sections.resize(test.sections.len());
        self.test = test;
    }

    // Section navigation

    pub fn current_section_index(&self) -> usize {
        self.sections.index()
    }

    pub fn current_section(&self) -> Option<&Section> {
        self.test.sections.get(self.sections.index())
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn next_section(&mut self) -> bool {
        self.sections.next()
    }

    pub fn previous_section(&mut self) -> bool {
        self.sections.previous()
    }

    pub fn go_to_section(&mut self, index: usize) -> Result<(), SessionError> {
        if self.sections.go_to(index) {
            Ok(())
        } else {
            Err(SessionError::SectionOutOfRange {
                index,
                count: self.sections.len(),
            })
        }
    }

    pub fn is_last_section(&self) -> bool {
        self.sections.is_last()
    }

    /// `(current + 1) / section_count`.
    pub fn progress(&self) -> f64 {
        self.sections.progress()
    }

    // Answers

    /// Record an answer. Works for any question of the test regardless of
    /// which section is visible.
    pub fn set_answer(
        &mut self,
        key: AnswerKey,
        value: impl Into<String>,
    ) -> Result<(), SessionError> {
        if self.phase == SubmitPhase::Submitted {
            return Err(SessionError::AlreadySubmitted);
        }
        self.answers.set(key, value);
        Ok(())
    }

    pub fn answer(&self, key: &AnswerKey) -> Option<&str> {
        self.answers.get(key)
    }

    pub fn answers(&self) -> &AnswerMap {
        &self.answers
    }

    // Timer

    pub fn start(&mut self) -> bool {
        self.countdown.start()
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.countdown.tick()
    }

    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    pub fn time_left(&self) -> u64 {
        self.countdown.time_left()
    }

    // Submission

    pub fn phase(&self) -> SubmitPhase {
        self.phase
    }

    pub fn is_submitted(&self) -> bool {
        self.phase == SubmitPhase::Submitted
    }

    /// Claim the right to submit and build the request.
    ///
    /// Returns `None` when a submit is already in flight or done.
    pub fn begin_submit(&mut self) -> Option<SubmissionRequest> {
        if self.phase != SubmitPhase::Idle {
            return None;
        }
        self.phase = SubmitPhase::InFlight;
        Some(self.submission_request())
    }

    /// The backend accepted the submission.
    pub fn complete_submit(&mut self) {
        self.phase = SubmitPhase::Submitted;
    }

    /// The submission failed; allow another attempt.
    pub fn fail_submit(&mut self) {
        if self.phase == SubmitPhase::InFlight {
            self.phase = SubmitPhase::Idle;
        }
    }

    /// Request body for the current answers.
    pub fn submission_request(&self) -> SubmissionRequest {
        SubmissionRequest {
            test_id: self.test.id.clone(),
            answers: self.answers.entries_for(&self.test),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::model::{Question, QuestionKind, Section, Test, TestKind};

    pub fn question(id: &str) -> Question {
        Question {
            id: id.into(),
            question_text: format!("Question {id}"),
            kind: QuestionKind::ShortAnswer,
            options: vec![],
            correct_answer: None,
            instructions: None,
        }
    }

    pub fn section(id: &str, question_ids: &[&str]) -> Section {
        Section {
            id: id.into(),
            name: format!("Section {id}"),
            passage: None,
            audio_url: None,
            image_url: None,
            pdf_url: None,
            questions: question_ids.iter().map(|q| question(q)).collect(),
        }
    }

    /// Two sections, three questions, one minute.
    pub fn two_section_test() -> Test {
        Test {
            id: "t1".into(),
            title: "Listening Practice".into(),
            kind: TestKind::Listening,
            duration: 1,
            description: None,
            sections: vec![section("s1", &["q1", "q2"]), section("s2", &["q3"])],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::two_section_test;
    use super::*;

    #[test]
    fn new_session_seeds_time_from_duration() {
        let session = TestSession::new(two_section_test());
        assert_eq!(session.time_left(), 60);
        assert_eq!(session.current_section_index(), 0);
        assert_eq!(session.section_count(), 2);
        assert_eq!(session.phase(), SubmitPhase::Idle);
    }

    #[test]
    fn answers_survive_section_changes() {
        let mut session = TestSession::new(two_section_test());
        session.set_answer(AnswerKey::question("q1"), "Paris").unwrap();
        session.next_section();
        session.set_answer(AnswerKey::question("q3"), "1984").unwrap();
        session.previous_section();
        session.next_section();
        session.previous_section();
        assert_eq!(session.answer(&AnswerKey::question("q1")), Some("Paris"));
        assert_eq!(session.answer(&AnswerKey::question("q3")), Some("1984"));
    }

    #[test]
    fn navigation_is_clamped() {
        let mut session = TestSession::new(two_section_test());
        assert!(!session.previous_section());
        assert!(session.next_section());
        assert!(!session.next_section());
        assert_eq!(session.current_section_index(), 1);
        assert_eq!(session.progress(), 1.0);
        assert_eq!(
            session.go_to_section(5),
            Err(SessionError::SectionOutOfRange { index: 5, count: 2 })
        );
    }

    #[test]
    fn reload_keeps_answers_and_reseeds_time() {
        let mut session = TestSession::new(two_section_test());
        session.start();
        session.tick();
        session.set_answer(AnswerKey::question("q2"), "B").unwrap();
        session.next_section();

        let mut fresh = two_section_test();
        fresh.duration = 2;
        fresh.sections.truncate(1);
        session.reload(fresh);

        assert_eq!(session.time_left(), 120);
        assert_eq!(session.answer(&AnswerKey::question("q2")), Some("B"));
        assert_eq!(session.current_section_index(), 0);
    }

    #[test]
    fn scenario_blank_answer_is_submitted_as_empty_string() {
        let mut session = TestSession::new(two_section_test());
        session.set_answer(AnswerKey::question("q1"), "Paris").unwrap();
        session.set_answer(AnswerKey::question("q2"), "42").unwrap();
        session.next_section();

        let request = session.begin_submit().unwrap();
        assert_eq!(request.test_id, "t1");
        assert_eq!(request.answers.len(), 3);
        assert_eq!(request.answer("q1"), Some("Paris"));
        assert_eq!(request.answer("q2"), Some("42"));
        assert_eq!(request.answer("q3"), Some(""));
    }

    #[test]
    fn begin_submit_is_guarded() {
        let mut session = TestSession::new(two_section_test());
        assert!(session.begin_submit().is_some());
        assert!(session.begin_submit().is_none());
        session.fail_submit();
        assert!(session.begin_submit().is_some());
        session.complete_submit();
        assert!(session.begin_submit().is_none());
        session.fail_submit();
        assert!(session.is_submitted());
    }

    #[test]
    fn no_answers_after_submission() {
        let mut session = TestSession::new(two_section_test());
        session.begin_submit();
        session.set_answer(AnswerKey::question("q1"), "late").unwrap();
        session.complete_submit();
        assert_eq!(
            session.set_answer(AnswerKey::question("q1"), "later"),
            Err(SessionError::AlreadySubmitted)
        );
    }
}
