//! Core data model types for IELTS tests and submissions.
//!
//! Field names follow the backend's camelCase JSON. Documents coming from the
//! backend may carry `_id` instead of `id`; both are accepted.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::answers::AnswerKey;
use crate::error::{SubmissionError, ValidationError};

/// A complete test with its ordered sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: TestKind,
    /// Duration in minutes.
    pub duration: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Test {
    /// Total time allowed for an attempt, in seconds.
    pub fn duration_secs(&self) -> u64 {
        u64::from(self.duration) * 60
    }

    /// Iterate over every question of every section, in section order.
    pub fn questions(&self) -> impl Iterator<Item = &Question> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    pub fn question_count(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }
}

/// The two kinds of test the app offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    Listening,
    Reading,
}

impl fmt::Display for TestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestKind::Listening => write!(f, "listening"),
            TestKind::Reading => write!(f, "reading"),
        }
    }
}

impl FromStr for TestKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "listening" => Ok(TestKind::Listening),
            "reading" => Ok(TestKind::Reading),
            other => Err(format!("unknown test type: {other}")),
        }
    }
}

/// An ordered grouping of questions, optionally carrying media.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub passage: Option<String>,
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A single question within a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(alias = "text", alias = "prompt")]
    pub question_text: String,
    #[serde(rename = "questionType", alias = "type")]
    pub kind: QuestionKind,
    #[serde(default)]
    pub options: Vec<String>,
    /// Grading key. Only the backend uses it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<serde_json::Value>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Question {
    /// How the answer to this question is entered.
    pub fn input_shape(&self) -> InputShape {
        match self.kind {
            QuestionKind::ShortAnswer
            | QuestionKind::SentenceCompletion
            | QuestionKind::SummaryCompletion
            | QuestionKind::NoteCompletion
            | QuestionKind::TableCompletion
            | QuestionKind::Unsupported => InputShape::SingleLine,
            QuestionKind::LongAnswer => InputShape::MultiLine,
            QuestionKind::MultipleChoice => InputShape::Choice(self.options.clone()),
            QuestionKind::TrueFalseNotGiven => {
                InputShape::Select(self.options_or(&["TRUE", "FALSE", "NOT GIVEN"]))
            }
            QuestionKind::YesNoNotGiven => {
                InputShape::Select(self.options_or(&["YES", "NO", "NOT GIVEN"]))
            }
            QuestionKind::MatchingHeadings
            | QuestionKind::MatchingInformation
            | QuestionKind::MatchingFeatures => InputShape::Rows(self.options.clone()),
        }
    }

    /// Every answer key this question contributes to a submission.
    ///
    /// Row-keyed questions contribute one key per option row; a row-keyed
    /// question without options falls back to a single plain key so it is
    /// still represented.
    pub fn answer_keys(&self) -> Vec<AnswerKey> {
        match self.input_shape() {
            InputShape::Rows(rows) if !rows.is_empty() => (0..rows.len())
                .map(|index| AnswerKey::row(&self.id, index))
                .collect(),
            _ => vec![AnswerKey::question(&self.id)],
        }
    }

    fn options_or(&self, fallback: &[&str]) -> Vec<String> {
        if self.options.is_empty() {
            fallback.iter().map(|s| s.to_string()).collect()
        } else {
            self.options.clone()
        }
    }
}

/// Answer-type tag of a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionKind {
    #[serde(alias = "text", alias = "short-text")]
    ShortAnswer,
    #[serde(alias = "essay", alias = "textarea")]
    LongAnswer,
    MultipleChoice,
    #[serde(alias = "true-false")]
    TrueFalseNotGiven,
    YesNoNotGiven,
    #[serde(alias = "fill-in-the-blank", alias = "fill-in-blank")]
    SentenceCompletion,
    SummaryCompletion,
    NoteCompletion,
    TableCompletion,
    MatchingHeadings,
    #[serde(alias = "matching")]
    MatchingInformation,
    MatchingFeatures,
    /// A tag this client does not know; answered as free text.
    #[serde(other)]
    Unsupported,
}

/// Input affordance for a question, resolved from its [`QuestionKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputShape {
    SingleLine,
    MultiLine,
    /// Pick one of the listed options.
    Choice(Vec<String>),
    /// Pick one of a fixed verdict list (TRUE/FALSE/NOT GIVEN and friends).
    Select(Vec<String>),
    /// One sub-answer per listed row.
    Rows(Vec<String>),
}

/// Role of an authenticated user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    #[serde(alias = "student")]
    User,
    Admin,
}

/// The minimal user fields the client keeps around.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

/// An authenticated session: the bearer token plus who it belongs to.
///
/// Passed explicitly to whichever request layer needs it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"***")
            .field("user", &self.user)
            .finish()
    }
}

/// Login credentials.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// One `{questionId, answer}` pair of the submission wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEntry {
    pub question_id: String,
    #[serde(default)]
    pub answer: String,
}

/// Body of the submit-answers request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub test_id: String,
    pub answers: Vec<AnswerEntry>,
}

impl SubmissionRequest {
    /// Look up the submitted answer for a key, e.g. `"q1"` or `"q4-2"`.
    pub fn answer(&self, key: &str) -> Option<&str> {
        self.answers
            .iter()
            .find(|e| e.question_id == key)
            .map(|e| e.answer.as_str())
    }
}

/// Body of the grade-submission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRequest {
    pub grade: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl GradeRequest {
    /// Build a grade request, validating the band score.
    ///
    /// Bands run from 0 to 9 in half-band steps.
    pub fn new(grade: f64, feedback: Option<String>) -> Result<Self, ValidationError> {
        if !grade.is_finite() || !(0.0..=9.0).contains(&grade) || (grade * 2.0).fract() != 0.0 {
            return Err(ValidationError::InvalidBand(grade));
        }
        let feedback = feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty());
        Ok(Self { grade, feedback })
    }
}

/// Grading status of a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Graded,
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmissionStatus::Pending => write!(f, "pending"),
            SubmissionStatus::Graded => write!(f, "graded"),
        }
    }
}

/// A reference to another document: either a bare id or a populated object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Id(String),
    Document(ReferencedDocument),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencedDocument {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default, alias = "title")]
    pub name: Option<String>,
}

impl Reference {
    pub fn id(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Document(doc) => &doc.id,
        }
    }

    /// Human-readable label, falling back to the id.
    pub fn label(&self) -> &str {
        match self {
            Reference::Id(id) => id,
            Reference::Document(doc) => doc.name.as_deref().unwrap_or(&doc.id),
        }
    }
}

impl From<&str> for Reference {
    fn from(id: &str) -> Self {
        Reference::Id(id.to_string())
    }
}

/// The server-recorded result of one completed attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub user: Option<Reference>,
    pub test: Reference,
    #[serde(default, deserialize_with = "deserialize_answers")]
    pub answers: Vec<AnswerEntry>,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub grade: Option<f64>,
    #[serde(default)]
    pub feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub graded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub graded_by: Option<Reference>,
}

impl Submission {
    /// Apply a grade. Legal exactly once: pending to graded.
    pub fn grade(
        &mut self,
        request: GradeRequest,
        graded_by: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), SubmissionError> {
        if self.status == SubmissionStatus::Graded {
            return Err(SubmissionError::AlreadyGraded {
                id: self.id.clone(),
            });
        }
        self.status = SubmissionStatus::Graded;
        self.grade = Some(request.grade);
        self.feedback = request.feedback;
        self.graded_at = Some(at);
        self.graded_by = Some(Reference::Id(graded_by.into()));
        Ok(())
    }

    pub fn is_graded(&self) -> bool {
        self.status == SubmissionStatus::Graded
    }
}

/// Answers come back either as a list of pairs or as a flat map.
fn deserialize_answers<'de, D>(deserializer: D) -> Result<Vec<AnswerEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum WireAnswers {
        List(Vec<AnswerEntry>),
        Map(BTreeMap<String, String>),
    }

    Ok(match WireAnswers::deserialize(deserializer)? {
        WireAnswers::List(entries) => entries,
        WireAnswers::Map(map) => map
            .into_iter()
            .map(|(question_id, answer)| AnswerEntry {
                question_id,
                answer,
            })
            .collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(kind: QuestionKind, options: &[&str]) -> Question {
        Question {
            id: "q1".into(),
            question_text: "Prompt".into(),
            kind,
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: None,
            instructions: None,
        }
    }

    #[test]
    fn test_kind_display_and_parse() {
        assert_eq!(TestKind::Listening.to_string(), "listening");
        assert_eq!("Reading".parse::<TestKind>().unwrap(), TestKind::Reading);
        assert!("writing".parse::<TestKind>().is_err());
    }

    #[test]
    fn question_kind_tags_and_aliases() {
        let kind: QuestionKind = serde_json::from_str("\"true-false-not-given\"").unwrap();
        assert_eq!(kind, QuestionKind::TrueFalseNotGiven);
        let kind: QuestionKind = serde_json::from_str("\"fill-in-the-blank\"").unwrap();
        assert_eq!(kind, QuestionKind::SentenceCompletion);
        let kind: QuestionKind = serde_json::from_str("\"diagram-labelling\"").unwrap();
        assert_eq!(kind, QuestionKind::Unsupported);
    }

    #[test]
    fn input_shapes_follow_kind() {
        assert_eq!(
            question(QuestionKind::ShortAnswer, &[]).input_shape(),
            InputShape::SingleLine
        );
        assert_eq!(
            question(QuestionKind::LongAnswer, &[]).input_shape(),
            InputShape::MultiLine
        );
        assert_eq!(
            question(QuestionKind::MultipleChoice, &["A", "B"]).input_shape(),
            InputShape::Choice(vec!["A".into(), "B".into()])
        );
        assert_eq!(
            question(QuestionKind::TrueFalseNotGiven, &[]).input_shape(),
            InputShape::Select(vec!["TRUE".into(), "FALSE".into(), "NOT GIVEN".into()])
        );
        assert_eq!(
            question(QuestionKind::Unsupported, &["x"]).input_shape(),
            InputShape::SingleLine
        );
    }

    #[test]
    fn matching_questions_contribute_one_key_per_row() {
        let q = question(QuestionKind::MatchingHeadings, &["i", "ii", "iii"]);
        let keys: Vec<String> = q.answer_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["q1-0", "q1-1", "q1-2"]);

        let empty = question(QuestionKind::MatchingFeatures, &[]);
        let keys: Vec<String> = empty.answer_keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["q1"]);
    }

    #[test]
    fn test_deserializes_backend_document() {
        let json = serde_json::json!({
            "_id": "t1",
            "title": "Academic Reading 1",
            "type": "reading",
            "duration": 60,
            "sections": [{
                "_id": "s1",
                "name": "Passage 1",
                "passage": "Some text",
                "questions": [{
                    "_id": "q1",
                    "questionText": "Who?",
                    "questionType": "short-answer",
                    "correctAnswer": "Paris"
                }]
            }]
        });
        let test: Test = serde_json::from_value(json).unwrap();
        assert_eq!(test.id, "t1");
        assert_eq!(test.duration_secs(), 3600);
        assert_eq!(test.question_count(), 1);
        assert_eq!(test.sections[0].questions[0].kind, QuestionKind::ShortAnswer);
    }

    #[test]
    fn submission_accepts_map_or_list_answers() {
        let list = serde_json::json!({
            "_id": "sub1",
            "test": "t1",
            "answers": [{"questionId": "q1", "answer": "Paris"}],
            "status": "pending",
            "submittedAt": "2026-01-01T10:00:00Z"
        });
        let sub: Submission = serde_json::from_value(list).unwrap();
        assert_eq!(sub.answers[0].answer, "Paris");

        let map = serde_json::json!({
            "id": "sub2",
            "test": {"_id": "t1", "title": "Reading 1"},
            "answers": {"q1": "Paris", "q2": ""},
            "submittedAt": "2026-01-01T10:00:00Z"
        });
        let sub: Submission = serde_json::from_value(map).unwrap();
        assert_eq!(sub.answers.len(), 2);
        assert_eq!(sub.test.label(), "Reading 1");
        assert_eq!(sub.status, SubmissionStatus::Pending);
    }

    #[test]
    fn grading_is_one_way() {
        let mut sub = Submission {
            id: "sub1".into(),
            user: None,
            test: Reference::from("t1"),
            answers: vec![],
            status: SubmissionStatus::Pending,
            grade: None,
            feedback: None,
            submitted_at: Utc::now(),
            graded_at: None,
            graded_by: None,
        };
        let request = GradeRequest::new(6.5, Some("Good work".into())).unwrap();
        sub.grade(request.clone(), "admin1", Utc::now()).unwrap();
        assert!(sub.is_graded());
        assert_eq!(sub.grade, Some(6.5));

        let err = sub.grade(request, "admin2", Utc::now()).unwrap_err();
        assert_eq!(err, SubmissionError::AlreadyGraded { id: "sub1".into() });
    }

    #[test]
    fn grade_request_validates_band() {
        assert!(GradeRequest::new(7.0, None).is_ok());
        assert!(GradeRequest::new(9.0, None).is_ok());
        assert!(GradeRequest::new(9.5, None).is_err());
        assert!(GradeRequest::new(6.3, None).is_err());
        assert!(GradeRequest::new(f64::NAN, None).is_err());
        let blank = GradeRequest::new(5.0, Some("   ".into())).unwrap();
        assert!(blank.feedback.is_none());
    }

    #[test]
    fn auth_session_debug_masks_token() {
        let session = AuthSession {
            token: "secret-token".into(),
            user: UserProfile {
                id: "u1".into(),
                name: "Ana".into(),
                email: "ana@example.com".into(),
                role: UserRole::User,
            },
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-token"));
    }
}
