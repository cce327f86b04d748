//! The `ielts init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("ielts.toml").exists() {
        println!("ielts.toml already exists, skipping.");
    } else {
        std::fs::write("ielts.toml", SAMPLE_CONFIG)?;
        println!("Created ielts.toml");
    }

    std::fs::create_dir_all("tests")?;
    let example_path = std::path::Path::new("tests/example-listening.toml");
    if example_path.exists() {
        println!("tests/example-listening.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_TEST)?;
        println!("Created tests/example-listening.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit ielts.toml to point at your server");
    println!("  2. Run: ielts validate --tests tests/example-listening.toml");
    println!("  3. Run: ielts take --file tests/example-listening.toml");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# ielts client configuration

# Values may reference environment variables, e.g. "${IELTS_SERVER}".
api_url = "http://localhost:5000"

# Host serving media that older tests reference by file path
# (e.g. "F:\audio\track1.mp3"). Leave unset to reject such references.
# legacy_media_host = "http://localhost:5000"

timeout_secs = 30

# credentials_path = "~/.config/ielts/credentials.json"
"#;

const EXAMPLE_TEST: &str = r#"id = "example-listening"
title = "Example Listening Test"
type = "listening"
duration = 10
description = "A short listening test to try the client"

[[sections]]
id = "part-1"
name = "Part 1: Booking a room"
audioUrl = "https://example.com/audio/part1.mp3"

[[sections.questions]]
id = "q1"
questionText = "What is the caller's surname?"
questionType = "short-answer"
instructions = "Write NO MORE THAN TWO WORDS."

[[sections.questions]]
id = "q2"
questionText = "Which room does the caller book?"
questionType = "multiple-choice"
options = ["The seminar room", "The main hall", "The library annexe"]

[[sections]]
id = "part-2"
name = "Part 2: Campus tour"
audioUrl = "https://example.com/audio/part2.mp3"

[[sections.questions]]
id = "q3"
questionText = "The tour starts at the main gate."
questionType = "true-false-not-given"

[[sections.questions]]
id = "q4"
questionText = "Match each building with its opening year."
questionType = "matching-information"
options = ["Library", "Sports centre", "Student union"]
"#;
