//! Numbered-choice prompter for terminals.

use std::io::{self, BufRead, Write};

use colored::Colorize;

use keel_sync::{Choice, Prompter, SyncError};

const MAX_ATTEMPTS: usize = 3;

/// Prints options to `out` and reads the answer from `input`.
pub struct TerminalPrompter<R, W> {
    input: R,
    out: W,
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stderr> {
    /// Read from stdin and write to stderr, keeping stdout for the report.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }

    fn ask(&mut self, prompt: &str, options: &[Choice], default: usize) -> io::Result<Option<usize>> {
        writeln!(self.out, "\n{}", prompt.bold())?;
        for (idx, choice) in options.iter().enumerate() {
            let marker = if idx == default { "*" } else { " " };
            writeln!(
                self.out,
                " {marker} {}) {} {}",
                idx + 1,
                choice.label,
                choice.description.dimmed()
            )?;
        }

        for _ in 0..MAX_ATTEMPTS {
            write!(self.out, "Choice [{}]: ", default + 1)?;
            self.out.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            match parse_answer(&line, options.len()) {
                Answer::Default => return Ok(Some(default)),
                Answer::Index(idx) => return Ok(Some(idx)),
                Answer::Invalid => {
                    writeln!(self.out, "Enter a number between 1 and {}.", options.len())?;
                }
            }
        }
        Ok(Some(default))
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn choose(&mut self, prompt: &str, options: &[Choice], default: usize) -> Result<usize, SyncError> {
        match self.ask(prompt, options, default) {
            Ok(Some(idx)) => Ok(idx),
            Ok(None) => Err(SyncError::Prompt("input closed".to_string())),
            Err(err) => Err(SyncError::Prompt(err.to_string())),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Answer {
    Default,
    Index(usize),
    Invalid,
}

fn parse_answer(line: &str, len: usize) -> Answer {
    let line = line.trim();
    if line.is_empty() {
        return Answer::Default;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=len).contains(&n) => Answer::Index(n - 1),
        _ => Answer::Invalid,
    }
}
