//! Interactive test-taking loop.
//!
//! Reads one command per line while the countdown runs in the background.
//! The loop ends when the attempt is submitted (by the user or by the timer),
//! on `quit`, or when input closes.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::watch;

use ielts_core::answers::AnswerKey;
use ielts_core::countdown::{format_clock, URGENT_THRESHOLD_SECS};
use ielts_core::dispatcher::{DispatchOutcome, SubmissionDispatcher, SubmitTrigger};
use ielts_core::media::{
    AudioTransport, MediaKind, MediaResolver, MediaState, MediaWidget, Playback,
};
use ielts_core::model::{InputShape, Question, Section, Submission, Test};
use ielts_core::navigator::Cursor;
use ielts_core::session::{lock_session, SharedSession, TestSession};
use ielts_core::traits::{MediaLoader, Notifier};

const HELP: &str = "\
Commands:
  show                 show the current section
  next | prev          move between sections
  section <n>          jump to section n
  answer <id> <text>   answer a question (e.g. `answer q1 Paris`, `answer q4-0 B`)
  time                 show the time left
  media                load and show this section's media
  retry                retry media that failed to load
  play | pause         start or stop the audio
  seek <mm:ss|secs>    move the audio play head
  page next|prev       turn the document page
  submit               submit your answers
  quit                 leave without submitting";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Next,
    Previous,
    Section(usize),
    Answer { key: String, value: String },
    Show,
    Time,
    Media,
    Retry,
    Play,
    Pause,
    Seek(u64),
    PageNext,
    PagePrevious,
    Submit,
    Help,
    Quit,
}

/// Parse one input line. Blank lines are `Ok(None)`; bad input is an
/// `Err` with a usage message.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_lowercase().as_str() {
        "n" | "next" => Command::Next,
        "p" | "prev" | "previous" => Command::Previous,
        "s" | "section" => Command::Section(
            rest.parse()
                .map_err(|_| "usage: section <number>".to_string())?,
        ),
        "a" | "answer" => {
            let (key, value) = match rest.split_once(char::is_whitespace) {
                Some((key, value)) => (key, value.trim()),
                None => (rest, ""),
            };
            if key.is_empty() {
                return Err("usage: answer <question> <text>".into());
            }
            Command::Answer {
                key: key.to_string(),
                value: value.to_string(),
            }
        }
        "show" | "l" | "list" => Command::Show,
        "t" | "time" => Command::Time,
        "m" | "media" => Command::Media,
        "retry" => Command::Retry,
        "play" => Command::Play,
        "pause" => Command::Pause,
        "seek" => Command::Seek(
            parse_position(rest).ok_or_else(|| "usage: seek <mm:ss|seconds>".to_string())?,
        ),
        "page" => match rest {
            "" | "n" | "next" => Command::PageNext,
            "p" | "prev" | "previous" => Command::PagePrevious,
            _ => return Err("usage: page next|prev".into()),
        },
        "submit" => Command::Submit,
        "h" | "help" | "?" => Command::Help,
        "q" | "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (type `help`)")),
    };
    Ok(Some(command))
}

/// Parse `90` or `1:30` into seconds.
fn parse_position(raw: &str) -> Option<u64> {
    match raw.split_once(':') {
        Some((minutes, seconds)) => {
            let seconds: u64 = seconds.parse().ok()?;
            if seconds >= 60 {
                return None;
            }
            Some(minutes.parse::<u64>().ok()? * 60 + seconds)
        }
        None => raw.parse().ok(),
    }
}

/// Map typed input onto an answer slot and its stored value.
///
/// Choice questions accept the option text, its number (1-based) or its
/// letter.
fn resolve_answer(test: &Test, key: &str, raw: &str) -> Result<(AnswerKey, String), String> {
    let (question, answer_key) = test
        .questions()
        .find_map(|q| {
            q.answer_keys()
                .into_iter()
                .find(|k| k.to_string() == key)
                .map(|k| (q, k))
        })
        .ok_or_else(|| format!("no question {key} in this test"))?;

    let value = match question.input_shape() {
        InputShape::Choice(options) | InputShape::Select(options) => pick_option(&options, raw)?,
        _ => raw.to_string(),
    };
    Ok((answer_key, value))
}

fn pick_option(options: &[String], raw: &str) -> Result<String, String> {
    if raw.is_empty() {
        return Ok(String::new());
    }
    if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(raw)) {
        return Ok(option.clone());
    }
    let by_number = raw.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
    let by_letter = match raw.as_bytes() {
        [c] if c.is_ascii_alphabetic() => Some(usize::from(c.to_ascii_uppercase() - b'A')),
        _ => None,
    };
    by_number
        .or(by_letter)
        .and_then(|i| options.get(i))
        .cloned()
        .ok_or_else(|| format!("choose one of: {}", options.join(" | ")))
}

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

/// Media widgets of the section on screen.
pub struct MediaPanel {
    resolver: MediaResolver,
    loader: Option<Arc<dyn MediaLoader>>,
    widgets: Vec<MediaWidget>,
    unresolved: Vec<String>,
}

impl MediaPanel {
    /// Without a loader, media is resolved and listed but never fetched.
    pub fn new(resolver: MediaResolver, loader: Option<Arc<dyn MediaLoader>>) -> Self {
        Self {
            resolver,
            loader,
            widgets: Vec::new(),
            unresolved: Vec::new(),
        }
    }

    fn enter(&mut self, section: &Section) {
        self.widgets.clear();
        self.unresolved.clear();

        let references = [
            (MediaKind::Audio, &section.audio_url),
            (MediaKind::Pdf, &section.pdf_url),
            (MediaKind::Image, &section.image_url),
        ];
        for (kind, raw) in references {
            let Some(raw) = raw else { continue };
            match MediaWidget::resolve(kind, raw, &self.resolver) {
                Ok(widget) => self.widgets.push(widget),
                Err(e) => self.unresolved.push(format!("{}: {e}", kind_label(kind))),
            }
        }
    }

    async fn load(&mut self) {
        if let Some(loader) = &self.loader {
            for widget in &mut self.widgets {
                widget.load(loader.as_ref()).await;
            }
        }
    }

    /// Re-arm every failed widget. Returns how many were re-armed.
    fn retry(&mut self) -> usize {
        self.widgets
            .iter_mut()
            .filter_map(|w| w.retry().ok())
            .count()
    }

    fn widget(&mut self, kind: MediaKind) -> Option<&mut MediaWidget> {
        self.widgets.iter_mut().find(|w| w.kind() == kind)
    }

    fn render(&self, text: &mut String) {
        for line in &self.unresolved {
            let _ = writeln!(text, "  {line}");
        }
        for widget in &self.widgets {
            let label = kind_label(widget.kind());
            let _ = match widget.state() {
                MediaState::Loading { url } if self.loader.is_none() => {
                    writeln!(text, "  {label}: {url}")
                }
                MediaState::Loading { url } => writeln!(text, "  {label}: {url} (loading)"),
                MediaState::Ready { url, info } => {
                    let kind = info.content_type.as_deref().unwrap_or("unknown type");
                    writeln!(text, "  {label}: {url} (ready, {kind})")
                }
                MediaState::Error { url, message } => writeln!(
                    text,
                    "  {label}: {url} (failed: {message}; type `retry`)"
                ),
            };
        }
    }
}

fn kind_label(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Audio => "audio",
        MediaKind::Pdf => "document",
        MediaKind::Image => "image",
    }
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

/// How the interactive loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Submitted,
    Abandoned,
}

pub struct Console<W: Write> {
    session: SharedSession,
    dispatcher: Arc<SubmissionDispatcher>,
    media: MediaPanel,
    out: W,
    warned_urgent: bool,
}

impl<W: Write> Console<W> {
    pub fn new(
        session: SharedSession,
        dispatcher: Arc<SubmissionDispatcher>,
        media: MediaPanel,
        out: W,
    ) -> Self {
        Self {
            session,
            dispatcher,
            media,
            out,
            warned_urgent: false,
        }
    }

    #[cfg(test)]
    pub fn into_output(self) -> W {
        self.out
    }

    /// Run until the attempt is submitted or abandoned. `remaining` is the
    /// countdown feed, if a timer is running.
    pub async fn run<R>(
        &mut self,
        input: R,
        mut remaining: Option<watch::Receiver<u64>>,
    ) -> Result<SessionEnd>
    where
        R: AsyncBufRead + Unpin,
    {
        self.enter_section().await?;
        let mut lines = input.lines();

        loop {
            if lock_session(&self.session).is_submitted() {
                return Ok(SessionEnd::Submitted);
            }

            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        writeln!(self.out, "Input closed; your answers were not submitted.")?;
                        return Ok(SessionEnd::Abandoned);
                    };
                    match parse_command(&line) {
                        Ok(Some(Command::Quit)) => {
                            writeln!(self.out, "Leaving without submitting.")?;
                            return Ok(SessionEnd::Abandoned);
                        }
                        Ok(Some(command)) => self.handle(command).await?,
                        Ok(None) => {}
                        Err(usage) => writeln!(self.out, "{usage}")?,
                    }
                }
                left = next_tick(&mut remaining) => match left {
                    Some(left) => self.on_tick(left)?,
                    None => remaining = None,
                },
            }
        }
    }

    async fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Next => {
                let moved = lock_session(&self.session).next_section();
                if moved {
                    self.enter_section().await?;
                } else {
                    writeln!(
                        self.out,
                        "This is the last section; type `submit` when you are done."
                    )?;
                }
            }
            Command::Previous => {
                let moved = lock_session(&self.session).previous_section();
                if moved {
                    self.enter_section().await?;
                } else {
                    writeln!(self.out, "This is the first section.")?;
                }
            }
            Command::Section(number) => {
                let result = match number.checked_sub(1) {
                    Some(index) => lock_session(&self.session)
                        .go_to_section(index)
                        .map_err(|e| e.to_string()),
                    None => Err("sections are numbered from 1".to_string()),
                };
                match result {
                    Ok(()) => self.enter_section().await?,
                    Err(message) => writeln!(self.out, "{message}")?,
                }
            }
            Command::Answer { key, value } => self.answer(&key, &value)?,
            Command::Show => self.render_section()?,
            Command::Time => {
                let (clock, urgent) = {
                    let session = lock_session(&self.session);
                    (session.countdown().display(), session.countdown().is_urgent())
                };
                let hint = if urgent { " (hurry!)" } else { "" };
                writeln!(self.out, "Time left: {clock}{hint}")?;
            }
            Command::Media => {
                self.media.load().await;
                self.render_media()?;
            }
            Command::Retry => {
                if self.media.retry() == 0 {
                    writeln!(self.out, "Nothing to retry.")?;
                } else {
                    self.media.load().await;
                    self.render_media()?;
                }
            }
            Command::Play | Command::Pause | Command::Seek(_) => {
                match self.media.widget(MediaKind::Audio).and_then(|w| w.transport()) {
                    Some(transport) => {
                        match command {
                            Command::Play => transport.play(),
                            Command::Pause => transport.pause(),
                            Command::Seek(secs) => transport.seek(Duration::from_secs(secs)),
                            _ => {}
                        }
                        writeln!(self.out, "Audio {}.", transport_label(transport))?;
                    }
                    None => writeln!(self.out, "No audio is ready in this section.")?,
                }
            }
            Command::PageNext | Command::PagePrevious => {
                match self.media.widget(MediaKind::Pdf).and_then(|w| w.pages()) {
                    Some(pages) => {
                        if command == Command::PageNext {
                            pages.next();
                        } else {
                            pages.previous();
                        }
                        writeln!(self.out, "Page {}", page_label(pages))?;
                    }
                    None => writeln!(self.out, "No document is open in this section.")?,
                }
            }
            Command::Submit => {
                let outcome = self
                    .dispatcher
                    .submit(&self.session, SubmitTrigger::Manual)
                    .await;
                if let DispatchOutcome::Ignored = outcome {
                    writeln!(self.out, "A submission is already in progress.")?;
                }
            }
            Command::Help => writeln!(self.out, "{HELP}")?,
            Command::Quit => {}
        }
        Ok(())
    }

    fn on_tick(&mut self, left: u64) -> io::Result<()> {
        if left == 0 {
            writeln!(self.out, "Time is up! Submitting your answers...")
        } else if left < URGENT_THRESHOLD_SECS && !self.warned_urgent {
            self.warned_urgent = true;
            writeln!(self.out, "Hurry: {} left.", format_clock(left))
        } else {
            Ok(())
        }
    }

    async fn enter_section(&mut self) -> Result<()> {
        let section = lock_session(&self.session).current_section().cloned();
        if let Some(section) = &section {
            self.media.enter(section);
            self.media.load().await;
        }
        self.render_section()?;
        Ok(())
    }

    fn answer(&mut self, key: &str, value: &str) -> io::Result<()> {
        let mut session = lock_session(&self.session);
        let message = match resolve_answer(session.test(), key, value) {
            Ok((key, value)) => match session.set_answer(key.clone(), value.clone()) {
                Ok(()) if value.is_empty() => format!("Cleared {key}."),
                Ok(()) => format!("{key} = {value}"),
                Err(e) => e.to_string(),
            },
            Err(message) => message,
        };
        writeln!(self.out, "{message}")
    }

    fn render_section(&mut self) -> io::Result<()> {
        let mut text = String::new();
        {
            let session = lock_session(&self.session);
            match session.current_section() {
                Some(section) => write_section(&mut text, &session, section),
                None => text.push_str("This test has no sections.\n"),
            }
        }
        self.media.render(&mut text);
        write!(self.out, "{text}")
    }

    fn render_media(&mut self) -> io::Result<()> {
        let mut text = String::new();
        self.media.render(&mut text);
        if text.is_empty() {
            text.push_str("No media in this section.\n");
        }
        write!(self.out, "{text}")
    }
}

async fn next_tick(remaining: &mut Option<watch::Receiver<u64>>) -> Option<u64> {
    match remaining {
        Some(rx) => rx.changed().await.ok().map(|()| *rx.borrow()),
        None => std::future::pending().await,
    }
}

fn transport_label(transport: &AudioTransport) -> String {
    let state = match transport.playback() {
        Playback::Playing => "playing",
        Playback::Paused => "paused",
    };
    let position = format_clock(transport.position().as_secs());
    match transport.duration() {
        Some(length) => format!("{state} at {position} of {}", format_clock(length.as_secs())),
        None => format!("{state} at {position}"),
    }
}

fn page_label(pages: &Cursor) -> String {
    format!("{}/{}", pages.index() + 1, pages.len())
}

fn write_section(text: &mut String, session: &TestSession, section: &Section) {
    let _ = writeln!(
        text,
        "\n== Section {}/{}: {} ==  [{} left, {} answered]",
        session.current_section_index() + 1,
        session.section_count(),
        section.name,
        session.countdown().display(),
        session.answers().answered_count(),
    );
    if let Some(passage) = &section.passage {
        let _ = writeln!(text, "\n{}\n", passage.trim());
    }
    for question in &section.questions {
        write_question(text, session, question);
    }
}

fn write_question(text: &mut String, session: &TestSession, question: &Question) {
    let _ = writeln!(text, "[{}] {}", question.id, question.question_text);
    if let Some(instructions) = &question.instructions {
        let _ = writeln!(text, "     {instructions}");
    }

    let answer = |key: &AnswerKey| session.answer(key).unwrap_or("").to_string();
    match question.input_shape() {
        InputShape::SingleLine | InputShape::MultiLine => {
            let _ = writeln!(text, "     answer: {}", answer(&AnswerKey::question(&question.id)));
        }
        InputShape::Choice(options) | InputShape::Select(options) => {
            for (i, option) in options.iter().enumerate() {
                let _ = writeln!(text, "     {}. {option}", i + 1);
            }
            let _ = writeln!(text, "     answer: {}", answer(&AnswerKey::question(&question.id)));
        }
        InputShape::Rows(rows) => {
            for (key, row) in question.answer_keys().iter().zip(&rows) {
                let _ = writeln!(text, "     [{key}] {row}: {}", answer(key));
            }
            if rows.is_empty() {
                let key = AnswerKey::question(&question.id);
                let _ = writeln!(text, "     answer: {}", answer(&key));
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// Prints session notifications to the terminal.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("{message}");
    }

    fn on_submitted(&self, submission: &Submission) {
        let answered = submission
            .answers
            .iter()
            .filter(|a| !a.answer.trim().is_empty())
            .count();
        println!(
            "Submission {} recorded ({answered}/{} answered).",
            submission.id,
            submission.answers.len()
        );
    }

    fn on_unauthorized(&self) {
        eprintln!("Your session has expired. Run `ielts login` to sign in again.");
    }
}
