// Prompt layer: single keystroke questions and line input with project name
// completion. The `Prompter` trait lets the action flows run against a
// scripted implementation in tests.

use crate::archive::Archive;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use dialoguer::{Completion, Input};
use std::io;

/// Source of user answers.
pub trait Prompter {
    /// Show `question` and return the next key pressed, lower-cased.
    /// Keys without a character (Enter, arrows) come back as `'\0'`.
    fn key(&mut self, question: &str) -> Result<char>;

    /// Read a line of text. Tab completes against existing project names.
    fn line(&mut self, prompt: &str, archive: &Archive) -> Result<String>;
}

/// Tab completion over the archive's project names, most recent first.
pub struct ProjectCompletion<'a> {
    archive: &'a Archive,
}

impl<'a> ProjectCompletion<'a> {
    pub fn new(archive: &'a Archive) -> Self {
        ProjectCompletion { archive }
    }
}

impl Completion for ProjectCompletion<'_> {
    fn get(&self, input: &str) -> Option<String> {
        self.archive.complete(input)
    }
}

/// Returns true when the error chain holds a user cancel (Ctrl+C).
pub fn is_interrupted(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<io::Error>())
        .any(|e| e.kind() == io::ErrorKind::Interrupted)
}

fn interrupted() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "cancelled by user")
}

/// Leaves raw mode when dropped, also on the error path.
struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn key_char(key: KeyEvent) -> io::Result<char> {
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Err(interrupted()),
        KeyCode::Char(c) => Ok(c.to_ascii_lowercase()),
        _ => Ok('\0'),
    }
}

/// Read one key press without waiting for Enter.
pub fn read_key() -> io::Result<char> {
    let _raw = RawMode::enable()?;
    loop {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                return key_char(key);
            }
        }
    }
}

/// Prompter backed by the terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn key(&mut self, question: &str) -> Result<char> {
        println!("{question}");
        Ok(read_key()?)
    }

    fn line(&mut self, prompt: &str, archive: &Archive) -> Result<String> {
        let completion = ProjectCompletion::new(archive);
        let text: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .completion_with(&completion)
            .interact_text()?;
        Ok(text)
    }
}
