//! Terminal I/O for commands
//!
//! Optional CLI values follow one rule: use the flag if present, otherwise
//! prompt for it (see [`resolve_field`]).

use anyhow::{bail, Result};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Output and prompting as seen by a command
pub trait Console {
    /// Print one line of command output
    fn say(&mut self, line: &str) -> Result<()>;

    /// Ask for a required value, re-asking on empty input
    fn input(&mut self, label: &str) -> Result<String>;

    /// Ask a yes/no question. An empty answer means no.
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// `flag` if present, otherwise the prompted answer
pub fn resolve_field(flag: Option<String>, label: &str, console: &mut dyn Console) -> Result<String> {
    match flag {
        Some(value) => Ok(value),
        None => console.input(label),
    }
}

/// Line-based console over any reader/writer pair
pub struct Terminal<R, W> {
    reader: R,
    writer: W,
}

impl Terminal<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Terminal<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    #[cfg(test)]
    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Read one line without its terminator, `None` at end of input
    fn read_answer(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl<R: BufRead, W: Write> Console for Terminal<R, W> {
    fn say(&mut self, line: &str) -> Result<()> {
        writeln!(self.writer, "{line}")?;
        Ok(())
    }

    fn input(&mut self, label: &str) -> Result<String> {
        loop {
            write!(self.writer, "{label}: ")?;
            self.writer.flush()?;

            let Some(answer) = self.read_answer()? else {
                bail!("No input provided for '{label}'");
            };
            if !answer.is_empty() {
                return Ok(answer);
            }
            debug!(label, "Empty answer, asking again");
        }
    }

    fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            write!(self.writer, "{question} [y/N]: ")?;
            self.writer.flush()?;

            let Some(answer) = self.read_answer()? else {
                return Ok(false);
            };
            match answer.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "" | "n" | "no" => return Ok(false),
                _ => writeln!(self.writer, "Error: invalid input")?,
            }
        }
    }
}
