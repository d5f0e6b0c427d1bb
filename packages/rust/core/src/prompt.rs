//! Terminal prompts.
//!
//! Interactive steps talk to the user through [`Prompter`] so they can run
//! against real stdin, a fixed script of answers in tests, or `--yes`.

use std::collections::VecDeque;
use std::io::{BufRead, Write};

use accelerator_shared::{AcceleratorError, Result};

/// Line-oriented question and answer channel.
pub trait Prompter {
    /// Print a line of context for the user.
    fn show(&mut self, message: &str);

    /// Ask a question and return the raw answer, without the line ending.
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Ask a `(y/n)` question. Only `y` (any case, surrounding spaces ignored)
/// counts as yes.
pub fn confirm(prompter: &mut dyn Prompter, question: &str) -> Result<bool> {
    let answer = prompter.ask(question)?;
    Ok(answer.trim().eq_ignore_ascii_case("y"))
}

// ---------------------------------------------------------------------------
// Stdin
// ---------------------------------------------------------------------------

/// Reads answers from stdin and writes prompts to stdout.
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn show(&mut self, message: &str) {
        println!("{message}");
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        let mut stdout = std::io::stdout();
        write!(stdout, "{question}")
            .and_then(|()| stdout.flush())
            .map_err(|e| AcceleratorError::Prompt(e.to_string()))?;

        let mut line = String::new();
        let read = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| AcceleratorError::Prompt(e.to_string()))?;
        if read == 0 {
            return Err(AcceleratorError::Prompt("stdin closed".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

// ---------------------------------------------------------------------------
// Non-interactive
// ---------------------------------------------------------------------------

/// Answers `y` to every question. Used for `--yes`.
#[derive(Debug, Default)]
pub struct AutoAccept {
    shown: Vec<String>,
}

impl AutoAccept {
    pub fn shown(&self) -> &[String] {
        &self.shown
    }
}

impl Prompter for AutoAccept {
    fn show(&mut self, message: &str) {
        tracing::info!("{message}");
        self.shown.push(message.to_string());
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        tracing::debug!(question, "auto-accepting");
        Ok("y".into())
    }
}

/// Replays a fixed list of answers and records the questions asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
    pub questions: Vec<String>,
    pub shown: Vec<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            questions: Vec::new(),
            shown: Vec::new(),
        }
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

impl Prompter for ScriptedPrompter {
    fn show(&mut self, message: &str) {
        self.shown.push(message.to_string());
    }

    fn ask(&mut self, question: &str) -> Result<String> {
        self.questions.push(question.to_string());
        self.answers
            .pop_front()
            .ok_or_else(|| AcceleratorError::Prompt(format!("no answer scripted for {question:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_accepts_only_y() {
        let mut p = ScriptedPrompter::new([" Y ", "yes", "n", ""]);
        assert!(confirm(&mut p, "ok? ").expect("answer"));
        assert!(!confirm(&mut p, "ok? ").expect("answer"));
        assert!(!confirm(&mut p, "ok? ").expect("answer"));
        assert!(!confirm(&mut p, "ok? ").expect("answer"));
        assert_eq!(p.questions.len(), 4);
    }

    #[test]
    fn scripted_runs_out() {
        let mut p = ScriptedPrompter::new(Vec::<String>::new());
        let err = p.ask("dialect? ").unwrap_err();
        assert!(matches!(err, AcceleratorError::Prompt(_)));
    }

    #[test]
    fn auto_accept_says_yes() {
        let mut p = AutoAccept::default();
        assert!(confirm(&mut p, "Are these paths correct? (y/n): ").expect("answer"));
        p.show("hello");
        assert_eq!(p.shown(), ["hello".to_string()]);
    }
}
