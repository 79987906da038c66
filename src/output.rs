use std::io::Write;
use std::sync::Mutex;

/// Abstraction over operator-facing output.
///
/// The supervisor prints progress through this trait instead of `println!`,
/// so tests can run it silently and binaries decide where text goes.
pub trait UserOutput: Send + Sync {
    /// Informational status message (e.g., "Listener for tracker tr203 is running")
    fn status(&self, message: &str);

    fn success(&self, message: &str);

    fn warning(&self, message: &str);

    fn error(&self, message: &str);

    /// Inline progress (no trailing newline). Call `finish_progress` after.
    fn progress(&self, message: &str);

    /// Finish an inline progress line with a result.
    fn finish_progress(&self, result: &str);
}

/// Standard CLI output: stdout for progress, stderr for problems.
pub struct CliOutput;

impl UserOutput for CliOutput {
    fn status(&self, message: &str) {
        println!("{}", message);
    }

    fn success(&self, message: &str) {
        println!("\x1b[32m{}\x1b[0m", message);
    }

    fn warning(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn error(&self, message: &str) {
        eprintln!("\x1b[31m{}\x1b[0m", message);
    }

    fn progress(&self, message: &str) {
        print!("{}", message);
        std::io::stdout().flush().ok();
    }

    fn finish_progress(&self, result: &str) {
        println!("{}", result);
    }
}

/// Suppresses all output.
pub struct QuietOutput;

impl UserOutput for QuietOutput {
    fn status(&self, _message: &str) {}
    fn success(&self, _message: &str) {}
    fn warning(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
    fn progress(&self, _message: &str) {}
    fn finish_progress(&self, _result: &str) {}
}

/// Collects output lines in memory, for assertions in tests.
#[derive(Default)]
pub struct CapturedOutput {
    lines: Mutex<Vec<String>>,
    pending: Mutex<String>,
}

impl CapturedOutput {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn push(&self, line: String) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line);
        }
    }
}

impl UserOutput for CapturedOutput {
    fn status(&self, message: &str) {
        self.push(message.to_string());
    }

    fn success(&self, message: &str) {
        self.push(message.to_string());
    }

    fn warning(&self, message: &str) {
        self.push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.push(message.to_string());
    }

    fn progress(&self, message: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_str(message);
        }
    }

    fn finish_progress(&self, result: &str) {
        let line = match self.pending.lock() {
            Ok(mut pending) => format!("{}{}", std::mem::take(&mut *pending), result),
            Err(_) => result.to_string(),
        };
        self.push(line);
    }
}
