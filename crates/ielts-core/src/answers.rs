//! The answer collector: a flat map from answer key to the user's answer.

use std::collections::HashMap;
use std::fmt;

use crate::model::{AnswerEntry, Test};

/// Key of one answer slot.
///
/// Most questions take a single answer keyed by the question id. Matching
/// questions take one answer per option row, keyed `"{question}-{index}"`,
/// which keeps the map flat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnswerKey {
    Question(String),
    Row { question: String, index: usize },
}

impl AnswerKey {
    pub fn question(id: impl Into<String>) -> Self {
        AnswerKey::Question(id.into())
    }

    pub fn row(id: impl Into<String>, index: usize) -> Self {
        AnswerKey::Row {
            question: id.into(),
            index,
        }
    }

    /// Id of the question this slot belongs to.
    pub fn question_id(&self) -> &str {
        match self {
            AnswerKey::Question(id) => id,
            AnswerKey::Row { question, .. } => question,
        }
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerKey::Question(id) => write!(f, "{id}"),
            AnswerKey::Row { question, index } => write!(f, "{question}-{index}"),
        }
    }
}

/// Answers entered so far, across every section of the test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerMap {
    entries: HashMap<AnswerKey, String>,
}

impl AnswerMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an answer. Returns the previous value.
    ///
    /// Values are stored as given; nothing is checked against the options or
    /// the grading key.
    pub fn set(&mut self, key: AnswerKey, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key, value.into())
    }

    pub fn get(&self, key: &AnswerKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of slots holding a non-blank answer.
    pub fn answered_count(&self) -> usize {
        self.entries
            .values()
            .filter(|v| !v.trim().is_empty())
            .count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AnswerKey, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Build the wire entries for a submission of `test`.
    ///
    /// Every answer slot of every question appears exactly once, in test
    /// order; unanswered slots are sent as empty strings. Keys that do not
    /// belong to the test are left out.
    pub fn entries_for(&self, test: &Test) -> Vec<AnswerEntry> {
        test.questions()
            .flat_map(|q| q.answer_keys())
            .map(|key| AnswerEntry {
                answer: self.get(&key).unwrap_or_default().to_string(),
                question_id: key.to_string(),
            })
            .collect()
    }
}
