//! The `ielts validate` command.

use std::path::PathBuf;

use anyhow::Result;

use ielts_core::parser::{load_test_directory, parse_test_file, validate_test};

pub fn execute(tests_path: PathBuf) -> Result<()> {
    let tests = if tests_path.is_dir() {
        load_test_directory(&tests_path)?
    } else {
        vec![parse_test_file(&tests_path)?]
    };

    let mut total_warnings = 0;

    for test in &tests {
        println!(
            "Test: {} [{}] ({} sections, {} questions, {} min)",
            test.title,
            test.kind,
            test.sections.len(),
            test.question_count(),
            test.duration
        );

        let warnings = validate_test(test);
        for w in &warnings {
            let prefix = match (&w.section_id, &w.question_id) {
                (Some(s), Some(q)) => format!("  [{s}/{q}]"),
                (Some(s), None) => format!("  [{s}]"),
                _ => "  ".to_string(),
            };
            println!("{prefix} WARNING: {}", w.message);
        }
        total_warnings += warnings.len();
    }

    if total_warnings == 0 {
        println!("All tests valid.");
    } else {
        println!("\n{total_warnings} warning(s) found.");
    }

    Ok(())
}
