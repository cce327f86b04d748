//! Test definition loader and validator.
//!
//! Loads tests from TOML or JSON files (the same shape the backend serves)
//! and checks them for structural problems before they are used.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::model::{InputShape, Test, TestKind};

/// Supported test definition formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFormat {
    Toml,
    Json,
}

impl TestFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(TestFormat::Toml),
            Some("json") => Ok(TestFormat::Json),
            _ => anyhow::bail!(
                "unsupported test file extension (expected .toml or .json): {}",
                path.display()
            ),
        }
    }
}

/// Parse a single test definition file.
pub fn parse_test_file(path: &Path) -> Result<Test> {
    let format = TestFormat::from_path(path)?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read test file: {}", path.display()))?;
    parse_test_str(&content, format)
        .with_context(|| format!("failed to parse test file: {}", path.display()))
}

/// Parse a test definition from a string.
pub fn parse_test_str(content: &str, format: TestFormat) -> Result<Test> {
    let test = match format {
        TestFormat::Toml => toml::from_str(content).context("invalid TOML test definition")?,
        TestFormat::Json => serde_json::from_str(content).context("invalid JSON test definition")?,
    };
    Ok(test)
}

/// Load every `.toml`/`.json` test in a directory (non-recursive), sorted by
/// file name.
pub fn load_test_directory(dir: &Path) -> Result<Vec<Test>> {
    let mut paths: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| TestFormat::from_path(p).is_ok())
        .collect();
    paths.sort();

    paths.iter().map(|p| parse_test_file(p)).collect()
}

/// A structural problem found in a test definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    pub section_id: Option<String>,
    pub question_id: Option<String>,
    pub message: String,
}

impl ValidationWarning {
    fn test(message: impl Into<String>) -> Self {
        Self {
            section_id: None,
            question_id: None,
            message: message.into(),
        }
    }

    fn section(section_id: &str, message: impl Into<String>) -> Self {
        Self {
            section_id: Some(section_id.to_string()),
            question_id: None,
            message: message.into(),
        }
    }

    fn question(section_id: &str, question_id: &str, message: impl Into<String>) -> Self {
        Self {
            section_id: Some(section_id.to_string()),
            question_id: Some(question_id.to_string()),
            message: message.into(),
        }
    }
}

/// Check a test for problems that would break or confuse a session.
pub fn validate_test(test: &Test) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if test.title.trim().is_empty() {
        warnings.push(ValidationWarning::test("test has no title"));
    }
    if test.duration == 0 {
        warnings.push(ValidationWarning::test("duration is zero; the timer would never run"));
    }
    if test.sections.is_empty() {
        warnings.push(ValidationWarning::test("test has no sections"));
    }

    let mut seen_sections = HashSet::new();
    let mut seen_questions = HashSet::new();

    for section in &test.sections {
        if !seen_sections.insert(section.id.as_str()) {
            warnings.push(ValidationWarning::section(&section.id, "duplicate section id"));
        }
        if section.questions.is_empty() {
            warnings.push(ValidationWarning::section(&section.id, "section has no questions"));
        }
        if test.kind == TestKind::Listening && section.audio_url.is_none() {
            warnings.push(ValidationWarning::section(
                &section.id,
                "listening section has no audio",
            ));
        }

        for question in &section.questions {
            if !seen_questions.insert(question.id.as_str()) {
                warnings.push(ValidationWarning::question(
                    &section.id,
                    &question.id,
                    "duplicate question id; answers would collide",
                ));
            }
            if question.question_text.trim().is_empty() {
                warnings.push(ValidationWarning::question(
                    &section.id,
                    &question.id,
                    "question has no text",
                ));
            }
            match question.input_shape() {
                InputShape::Choice(options) | InputShape::Rows(options) if options.is_empty() => {
                    warnings.push(ValidationWarning::question(
                        &section.id,
                        &question.id,
                        "question type needs options but none are listed",
                    ));
                }
                _ => {}
            }
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionKind;
    use std::io::Write;

    const SAMPLE_TOML: &str = r#"
id = "listening-1"
title = "Listening Practice 1"
type = "listening"
duration = 30

[[sections]]
id = "s1"
name = "Part 1"
audioUrl = "https://cdn.example.com/audio/part1.mp3"

[[sections.questions]]
id = "q1"
questionText = "What is the caller's surname?"
questionType = "short-answer"

[[sections.questions]]
id = "q2"
questionText = "Which room is booked?"
questionType = "multiple-choice"
options = ["A", "B", "C"]
"#;

    #[test]
    fn parse_toml_definition() {
        let test = parse_test_str(SAMPLE_TOML, TestFormat::Toml).unwrap();
        assert_eq!(test.id, "listening-1");
        assert_eq!(test.kind, TestKind::Listening);
        assert_eq!(test.question_count(), 2);
        assert_eq!(test.sections[0].questions[1].kind, QuestionKind::MultipleChoice);
        assert!(validate_test(&test).is_empty());
    }

    #[test]
    fn parse_json_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reading.json");
        let mut file = std::fs::File::create(&path).unwrap();
        write!(
            file,
            r#"{{"id":"r1","title":"Reading","type":"reading","duration":60,"sections":[]}}"#
        )
        .unwrap();

        let test = parse_test_file(&path).unwrap();
        assert_eq!(test.kind, TestKind::Reading);
        assert!(parse_test_file(&dir.path().join("notes.txt")).is_err());
    }

    #[test]
    fn load_directory_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.toml"), SAMPLE_TOML).unwrap();
        std::fs::write(dir.path().join("readme.md"), "ignored").unwrap();
        let tests = load_test_directory(dir.path()).unwrap();
        assert_eq!(tests.len(), 1);
    }

    #[test]
    fn validation_reports_structural_problems() {
        let mut test = parse_test_str(SAMPLE_TOML, TestFormat::Toml).unwrap();
        test.duration = 0;
        test.sections[0].audio_url = None;
        test.sections[0].questions[1].id = "q1".into();
        test.sections[0].questions[1].options.clear();

        let messages: Vec<String> = validate_test(&test).into_iter().map(|w| w.message).collect();
        assert!(messages.iter().any(|m| m.contains("duration is zero")));
        assert!(messages.iter().any(|m| m.contains("no audio")));
        assert!(messages.iter().any(|m| m.contains("duplicate question id")));
        assert!(messages.iter().any(|m| m.contains("needs options")));
    }

    #[test]
    fn empty_test_is_flagged() {
        let test = parse_test_str(
            r#"{"id":"x","title":"","type":"reading","duration":10}"#,
            TestFormat::Json,
        )
        .unwrap();
        let warnings = validate_test(&test);
        assert_eq!(warnings.len(), 2);
    }
}
