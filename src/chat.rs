//! `pdfchat ask` and `pdfchat chat`.
//!
//! Both commands build the generation backend first, so a missing API key
//! is reported before any document is processed. `chat` then runs a
//! line-oriented REPL over one [`Session`]:
//!
//! | Input | Effect |
//! |-------|--------|
//! | any text | ask a question against the loaded documents |
//! | `/sources` | reprint the sources of the last answer |
//! | `/history` | print the conversation so far |
//! | `/reset` | clear the conversation (documents stay loaded) |
//! | `/load <paths…>` | load a new document set; re-indexes only if it changed |
//! | `/help` | list commands |
//! | `/quit` | exit |

use anyhow::{bail, Result};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use pdfchat_core::answer::{Answer, Answerer, GenerationBackend, Outcome};
use pdfchat_core::embedding::EmbeddingProvider;
use pdfchat_core::error::SessionError;
use pdfchat_core::models::{Citation, Role};
use pdfchat_core::session::{FileSetFingerprint, Session};

use crate::config::Config;
use crate::documents::{load_documents, DocumentArgs};
use crate::embedding::load_provider;
use crate::generation::create_backend;
use crate::ingest::{build_index, format_report};
use crate::progress::ProgressMode;

const NO_DOCUMENTS_MESSAGE: &str =
    "Please upload PDF files to start chatting! Use /load <paths…> to add documents.";

const HELP: &str = "Commands:
  /sources          sources of the last answer
  /history          conversation so far
  /reset            clear the conversation
  /load <paths…>    load documents (files or directories)
  /quit             exit
Anything else is asked as a question.";

/// A chat session bound to one embedding provider and one backend.
pub struct Chat {
    config: Config,
    provider: Arc<dyn EmbeddingProvider>,
    answerer: Answerer,
    session: Session,
    progress: ProgressMode,
}

/// Result of [`Chat::load`].
#[derive(Debug)]
pub enum LoadOutcome {
    /// A new index was built and installed; carries the printable report.
    Rebuilt(String),
    /// The document set matches the current index.
    Unchanged,
}

impl Chat {
    pub fn new(
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        let answerer = Answerer::new(backend, config.answer_params());
        Self {
            config,
            provider,
            answerer,
            session: Session::new(),
            progress: ProgressMode::Off,
        }
    }

    /// Build the backend (checking the API key) and load the embedding model.
    pub async fn start(config: &Config) -> Result<Self> {
        let backend = create_backend(&config.generation)?;
        let provider = load_provider(&config.embedding).await?;
        let mut chat = Self::new(config.clone(), provider, backend);
        chat.progress = ProgressMode::default_for_tty();
        Ok(chat)
    }

    /// Load `docs`, rebuilding the index only when the file set changed.
    ///
    /// On failure the previously installed index stays in place.
    pub async fn load(&mut self, docs: &DocumentArgs) -> Result<LoadOutcome> {
        let documents = load_documents(docs)?;
        if documents.is_empty() {
            bail!("No PDF documents found.");
        }
        if !self.session.needs_rebuild(&documents) {
            return Ok(LoadOutcome::Unchanged);
        }

        let fingerprint = FileSetFingerprint::of(&documents);
        let report = build_index(&self.config, self.provider.clone(), documents, self.progress).await?;
        let summary = format_report(&report);
        self.session.install_index(report.index, fingerprint);
        Ok(LoadOutcome::Rebuilt(summary))
    }

    pub async fn ask(&mut self, question: &str) -> Result<Answer, SessionError> {
        self.session.ask(&self.answerer, question).await
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}

/// One parsed REPL input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Sources,
    History,
    Reset,
    Load(Vec<PathBuf>),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    if !line.starts_with('/') {
        return Command::Ask(line.to_string());
    }

    let mut parts = line.split_whitespace();
    let name = parts.next().unwrap_or_default();
    match name {
        "/sources" => Command::Sources,
        "/history" => Command::History,
        "/reset" | "/clear" => Command::Reset,
        "/load" => Command::Load(parts.map(PathBuf::from).collect()),
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        other => Command::Unknown(other.to_string()),
    }
}

pub fn format_sources(citations: &[Citation]) -> String {
    let mut out = String::from("Sources:\n");
    for c in citations {
        out.push_str(&format!("• {}\n", c));
    }
    out
}

pub fn format_answer(answer: &Answer) -> String {
    let mut out = format!("{}\n", answer.text);
    if !answer.citations.is_empty() {
        out.push('\n');
        out.push_str(&format_sources(&answer.citations));
    }
    out
}

fn format_history(session: &Session) -> String {
    if session.history().is_empty() {
        return "No conversation yet.\n".to_string();
    }
    let mut out = String::new();
    for turn in session.history() {
        let who = match turn.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        out.push_str(&format!(
            "[{}] {}: {}\n",
            turn.at.format("%H:%M:%S"),
            who,
            turn.text
        ));
        for c in &turn.citations {
            out.push_str(&format!("    • {}\n", c));
        }
    }
    out
}

/// Drive `chat` from `input` until EOF or `/quit`, writing replies to `out`.
pub async fn run_repl<R, W>(chat: &mut Chat, input: R, out: &mut W, prompt: bool) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        if prompt {
            write!(out, "> ")?;
            out.flush()?;
        }
        let line = match lines.next_line().await? {
            Some(line) => line,
            None => break,
        };

        match parse_command(&line) {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => writeln!(out, "{}", HELP)?,
            Command::Unknown(name) => {
                writeln!(out, "Unknown command: {}. Type /help for commands.", name)?
            }
            Command::Sources => {
                let citations = chat.session().last_citations();
                if citations.is_empty() {
                    writeln!(out, "No sources yet.")?;
                } else {
                    write!(out, "{}", format_sources(citations))?;
                }
            }
            Command::History => write!(out, "{}", format_history(chat.session()))?,
            Command::Reset => {
                chat.session.clear_history();
                writeln!(out, "Conversation cleared.")?;
            }
            Command::Load(paths) => {
                if paths.is_empty() {
                    writeln!(out, "Usage: /load <paths…>")?;
                    continue;
                }
                match chat.load(&DocumentArgs::from_paths(paths)).await {
                    Ok(LoadOutcome::Rebuilt(summary)) => write!(out, "{}", summary)?,
                    Ok(LoadOutcome::Unchanged) => {
                        writeln!(out, "Documents unchanged; keeping the current index.")?
                    }
                    Err(e) => writeln!(out, "❌ Error processing PDFs: {:#}", e)?,
                }
            }
            Command::Ask(question) => match chat.ask(&question).await {
                Ok(answer) => write!(out, "{}", format_answer(&answer))?,
                Err(SessionError::NoIndex) => writeln!(out, "{}", NO_DOCUMENTS_MESSAGE)?,
            },
        }
    }
    Ok(())
}

/// Answer one question. Exits non-zero when generation failed, after
/// printing the answer if `json` is set.
pub async fn run_ask(config: &Config, docs: &DocumentArgs, question: &str, json: bool) -> Result<()> {
    if question.trim().is_empty() {
        bail!("Question must not be empty.");
    }
    if docs.is_empty() {
        bail!("No documents given. Use --file <PATH> or --dir <PATH>.");
    }

    let mut chat = Chat::start(config).await?;
    chat.load(docs).await?;
    let answer = chat.ask(question).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
    }
    if let Outcome::Failed { reason } = &answer.outcome {
        bail!("Error generating response: {}", reason);
    }
    if !json {
        print!("{}", format_answer(&answer));
    }
    Ok(())
}

pub async fn run_chat(config: &Config, docs: &DocumentArgs) -> Result<()> {
    let mut chat = Chat::start(config).await?;
    let interactive = atty::is(atty::Stream::Stdin);

    if docs.is_empty() {
        println!("{}", NO_DOCUMENTS_MESSAGE);
    } else if let LoadOutcome::Rebuilt(summary) = chat.load(docs).await? {
        print!("{}", summary);
    }
    if interactive {
        println!("Ask a question about your documents. Type /help for commands.");
    }

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    run_repl(&mut chat, stdin, &mut stdout, interactive).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;
    use crate::embedding::create_provider;
    use async_trait::async_trait;
    use pdfchat_core::answer::GenerationRequest;
    use pdfchat_core::error::BackendError;
    use std::fs;
    use tempfile::TempDir;

    /// Replies with the first non-header line of the context.
    struct Extractive;

    #[async_trait]
    impl GenerationBackend for Extractive {
        fn name(&self) -> &str {
            "extractive"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Option<String>, BackendError> {
            Ok(request
                .user_text
                .lines()
                .skip(1)
                .map(str::trim)
                .find(|l| !l.is_empty() && !l.starts_with("---"))
                .map(str::to_string))
        }
    }

    fn chat() -> Chat {
        let config = Config {
            embedding: EmbeddingConfig {
                provider: "hashed".to_string(),
                ..EmbeddingConfig::default()
            },
            ..Config::default()
        };
        let provider = create_provider(&config.embedding).unwrap();
        Chat::new(config, provider, Arc::new(Extractive))
    }

    async fn drive(chat: &mut Chat, script: &str) -> String {
        let mut out = Vec::new();
        run_repl(chat, script.as_bytes(), &mut out, false)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("  "), Command::Empty);
        assert_eq!(parse_command("What is it?"), Command::Ask("What is it?".into()));
        assert_eq!(parse_command("/sources"), Command::Sources);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(
            parse_command("/load a.pdf docs/"),
            Command::Load(vec![PathBuf::from("a.pdf"), PathBuf::from("docs/")])
        );
        assert_eq!(parse_command("/frobnicate"), Command::Unknown("/frobnicate".into()));
    }

    #[test]
    fn answer_layout() {
        let answer = Answer {
            text: "Hold it for 3 seconds.".into(),
            citations: vec![Citation::new("manual.pdf", pdfchat_core::models::Page::Number(1))],
            outcome: pdfchat_core::answer::Outcome::Answered,
        };
        assert_eq!(
            format_answer(&answer),
            "Hold it for 3 seconds.\n\nSources:\n• manual.pdf (Page 1)\n"
        );
    }

    #[tokio::test]
    async fn question_before_load_asks_for_documents() {
        let mut chat = chat();
        let out = drive(&mut chat, "hello?\n/sources\n").await;
        assert!(out.contains(NO_DOCUMENTS_MESSAGE));
        assert!(out.contains("No sources yet."));
        assert!(chat.session().history().is_empty());
    }

    #[tokio::test]
    async fn load_ask_and_inspect() {
        let tmp = TempDir::new().unwrap();
        let manual = tmp.path().join("manual.txt");
        fs::write(
            &manual,
            "The device powers on by holding the button for 3 seconds.",
        )
        .unwrap();

        let mut chat = chat();
        let script = format!(
            "/load {path}\nHow do I power on the device?\n/sources\n/history\n/load {path}\n/reset\n/history\n/quit\nnot reached\n",
            path = manual.display()
        );
        let out = drive(&mut chat, &script).await;

        assert!(out.contains("• manual.txt: 1 chunks"));
        assert!(out.contains("Successfully processed 1 PDF(s) into 1 chunks"));
        assert!(out.contains("The device powers on by holding the button for 3 seconds.\n\nSources:\n• manual.txt (Page 1)\n"));
        assert!(out.contains("You: How do I power on the device?"));
        assert!(out.contains("    • manual.txt (Page 1)"));
        assert!(out.contains("Documents unchanged; keeping the current index."));
        assert!(out.contains("Conversation cleared."));
        assert!(out.contains("No conversation yet."));
        assert!(!out.contains("not reached"));
        assert!(chat.session().index().is_some());
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_index() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("good.txt");
        let blank = tmp.path().join("blank.txt");
        fs::write(&good, "Readable content.").unwrap();
        fs::write(&blank, "  ").unwrap();

        let mut chat = chat();
        chat.load(&DocumentArgs::from_paths(vec![good.clone()]))
            .await
            .unwrap();
        let id = chat.session().index().unwrap().id();

        let err = chat
            .load(&DocumentArgs::from_paths(vec![good, blank]))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("blank.txt"));
        assert_eq!(chat.session().index().unwrap().id(), id);
    }
}
