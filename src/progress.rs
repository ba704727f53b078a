//! Ingest progress reporting.
//!
//! Reports what is being extracted and how many passages each document
//! produced while an index is built. Progress is emitted on **stderr** so
//! stdout remains parseable for scripts, and only when stderr is a terminal.

use std::io::Write;

use pdfchat_core::ingest::{IngestEvent, IngestProgress, NoProgress};

/// Human-friendly progress on stderr: "extracting  2 / 5  manual.pdf".
pub struct StderrProgress;

impl IngestProgress for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::Extracting { filename, n, total } => {
                format!("extracting  {} / {}  {}\n", n, total, filename)
            }
            IngestEvent::Chunked { filename, passages } => {
                format!("chunked     {}  {} passages\n", filename, format_number(*passages))
            }
            IngestEvent::Embedding { passages } => {
                format!("embedding   {} passages\n", format_number(*passages))
            }
        };
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off or human (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode.
    pub fn reporter(&self) -> Box<dyn IngestProgress> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
        }
    }
}
