//! Operator confirmation.
//!
//! The conflict resolver asks through [`Confirm`] so it can be driven by a real
//! terminal or by a scripted sequence of answers.

use std::collections::VecDeque;
use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::Mutex;

pub trait Confirm: Send + Sync {
    /// Ask a yes/no question. A bare Enter answers `default`.
    fn confirm(&self, question: &str, default: bool) -> bool;
}

/// Check if running in an interactive TTY.
///
/// `PIPE_NON_INTERACTIVE` forces non-interactive behaviour, e.g. when run
/// from an init script.
pub fn is_interactive() -> bool {
    if std::env::var_os("PIPE_NON_INTERACTIVE").is_some() {
        return false;
    }
    io::stdin().is_terminal()
}

/// Interpret one line of operator input.
pub fn parse_answer(line: &str, default: bool) -> bool {
    match line.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Reads answers from standard input, one line per question.
#[derive(Debug, Default)]
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, question: &str, default: bool) -> bool {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        print!("{} {} ", question, hint);
        io::stdout().flush().ok();

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            // EOF: nobody is there to answer.
            Ok(0) => default,
            Ok(_) => parse_answer(&line, default),
            Err(e) => {
                tracing::warn!("Failed to read answer from stdin: {}", e);
                default
            }
        }
    }
}

/// Replays a fixed list of answers and records the questions asked.
///
/// Once the script runs out every question gets its default answer.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedConfirm {
    pub fn new(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.asked.lock().map(|q| q.clone()).unwrap_or_default()
    }
}

impl Confirm for ScriptedConfirm {
    fn confirm(&self, question: &str, default: bool) -> bool {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(question.to_string());
        }
        self.answers
            .lock()
            .ok()
            .and_then(|mut answers| answers.pop_front())
            .unwrap_or(default)
    }
}
