//! Retrieval-augmented answering.
//!
//! [`Answerer::ask`] runs one question through a small state machine:
//!
//! ```text
//! Retrieving ──► ContextAssembled ──► Generating ──► Done
//!     │                                   │
//!     └──► NoContext          (any) ──► Failed
//! ```
//!
//! 1. **Retrieving**: search the index for the top `k` passages and drop
//!    any below `min_score` when a threshold is configured.
//! 2. **ContextAssembled**: concatenate the passages, each under a
//!    `--- Source: {filename} ---` header, and collect deduplicated
//!    citations in first-seen order.
//! 3. **Generating**: send the fixed system instruction plus a user turn
//!    holding the context and question to the [`GenerationBackend`].
//! 4. **Done**: the trimmed reply becomes the answer.
//!
//! `ask` never returns an error. A question with no relevant passages and a
//! backend failure both come back as an [`Answer`] with a fixed message,
//! distinguished by [`Outcome`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::index::VectorIndex;
use crate::models::{Citation, ScoredPassage};

pub const NO_CONTEXT_MESSAGE: &str =
    "I couldn't find any relevant information in the uploaded documents to answer your question.";

pub const LOW_CONFIDENCE_MESSAGE: &str = "I couldn't find sufficiently relevant information in the uploaded documents to answer your question confidently.";

pub const NO_RESPONSE_MESSAGE: &str =
    "I apologize, but I couldn't generate a response. Please try rephrasing your question.";

pub const SYSTEM_INSTRUCTION: &str = "You are a helpful AI assistant that answers questions based solely on the provided document content.

Instructions:
1. Answer the question using ONLY the information provided in the context below
2. Be concise but comprehensive in your response
3. If the context doesn't contain enough information to answer the question, say so clearly
4. Do not make up information that isn't in the provided context
5. Use a friendly and professional tone
6. Structure your answer clearly with bullet points or numbered lists when appropriate";

/// One call to a text-generation model.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub system: String,
    pub user_text: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// A hosted or local text-generation model.
///
/// `Ok(None)` means the model answered with no text (empty candidates,
/// safety block). Implementations make a single attempt; retrying is up to
/// the caller.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Short identifier used in logs, e.g. `"gemini:gemini-2.5-flash"`.
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Option<String>, BackendError>;
}

/// Retrieval and sampling parameters for [`Answerer`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnswerParams {
    /// Passages retrieved per question.
    pub k: usize,
    /// Minimum cosine similarity a passage needs to be used as context.
    pub min_score: Option<f32>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl Default for AnswerParams {
    fn default() -> Self {
        Self {
            k: 4,
            min_score: None,
            temperature: 0.1,
            max_output_tokens: 1000,
        }
    }
}

/// How an [`Answer`] came about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The model produced an answer from retrieved context.
    Answered,
    /// Nothing was retrieved.
    NoContext,
    /// Passages were retrieved but all fell below `min_score`.
    LowConfidence,
    /// The model returned no text.
    NoResponse,
    /// Retrieval or generation failed.
    Failed { reason: String },
}

/// Reply to one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub text: String,
    /// Pages the context came from; empty unless context was assembled.
    pub citations: Vec<Citation>,
    pub outcome: Outcome,
}

impl Answer {
    fn fixed(text: &str, outcome: Outcome) -> Self {
        Self {
            text: text.to_string(),
            citations: Vec::new(),
            outcome,
        }
    }

    fn failed(reason: String) -> Self {
        Self {
            text: format!("Error generating response: {}", reason),
            citations: Vec::new(),
            outcome: Outcome::Failed { reason },
        }
    }

    pub fn is_answered(&self) -> bool {
        self.outcome == Outcome::Answered
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AnswerState {
    Retrieving,
    ContextAssembled,
    Generating,
    Done,
    NoContext,
    Failed,
}

impl AnswerState {
    fn advance(&mut self, next: AnswerState) {
        debug!(from = %self, to = %next, "answer state");
        *self = next;
    }
}

impl fmt::Display for AnswerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AnswerState::Retrieving => "retrieving",
            AnswerState::ContextAssembled => "context_assembled",
            AnswerState::Generating => "generating",
            AnswerState::Done => "done",
            AnswerState::NoContext => "no_context",
            AnswerState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Answers questions against a [`VectorIndex`] with a [`GenerationBackend`].
///
/// Holds no per-conversation state; one answerer can serve many sessions.
#[derive(Clone)]
pub struct Answerer {
    backend: Arc<dyn GenerationBackend>,
    params: AnswerParams,
}

impl Answerer {
    pub fn new(backend: Arc<dyn GenerationBackend>, params: AnswerParams) -> Self {
        Self { backend, params }
    }

    pub fn params(&self) -> &AnswerParams {
        &self.params
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub async fn ask(&self, index: &VectorIndex, question: &str) -> Answer {
        let mut state = AnswerState::Retrieving;

        let hits = match index.search(question, self.params.k) {
            Ok(hits) => hits,
            Err(e) => {
                state.advance(AnswerState::Failed);
                warn!(error = %e, "retrieval failed");
                return Answer::failed(e.to_string());
            }
        };

        let retrieved = hits.len();
        let hits = match self.params.min_score {
            Some(min) => hits.into_iter().filter(|h| h.score >= min).collect(),
            None => hits,
        };

        if hits.is_empty() {
            state.advance(AnswerState::NoContext);
            return if retrieved > 0 {
                debug!(retrieved, "all passages below min_score");
                Answer::fixed(LOW_CONFIDENCE_MESSAGE, Outcome::LowConfidence)
            } else {
                Answer::fixed(NO_CONTEXT_MESSAGE, Outcome::NoContext)
            };
        }

        let context = assemble_context(&hits);
        let citations = collect_citations(&hits);
        state.advance(AnswerState::ContextAssembled);

        let request = GenerationRequest {
            system: SYSTEM_INSTRUCTION.to_string(),
            user_text: build_user_prompt(&context, question),
            temperature: self.params.temperature,
            max_output_tokens: self.params.max_output_tokens,
        };

        state.advance(AnswerState::Generating);
        match self.backend.generate(&request).await {
            Ok(Some(text)) if !text.trim().is_empty() => {
                state.advance(AnswerState::Done);
                Answer {
                    text: text.trim().to_string(),
                    citations,
                    outcome: Outcome::Answered,
                }
            }
            Ok(_) => {
                state.advance(AnswerState::Done);
                Answer {
                    text: NO_RESPONSE_MESSAGE.to_string(),
                    citations,
                    outcome: Outcome::NoResponse,
                }
            }
            Err(e) => {
                state.advance(AnswerState::Failed);
                warn!(backend = self.backend.name(), error = %e, "generation failed");
                Answer::failed(e.to_string())
            }
        }
    }
}

/// Concatenate passages into the context block sent to the model.
pub fn assemble_context(hits: &[ScoredPassage]) -> String {
    let mut context = String::new();
    for hit in hits {
        context.push_str("\n--- Source: ");
        context.push_str(&hit.passage.source);
        context.push_str(" ---\n");
        context.push_str(&hit.passage.text);
        context.push('\n');
    }
    context
}

/// Distinct `{filename, page}` pairs in first-seen order.
pub fn collect_citations(hits: &[ScoredPassage]) -> Vec<Citation> {
    let mut citations: Vec<Citation> = Vec::new();
    for hit in hits {
        let citation = hit.passage.citation();
        if !citations.contains(&citation) {
            citations.push(citation);
        }
    }
    citations
}

pub fn build_user_prompt(context: &str, question: &str) -> String {
    format!(
        "Context from uploaded documents:\n{}\n\nQuestion: {}\n\nPlease provide a detailed answer based on the context above.",
        context, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashedProvider;
    use crate::models::{Page, Passage};
    use std::sync::Mutex;

    struct Scripted {
        reply: Result<Option<String>, BackendError>,
        seen: Mutex<Vec<GenerationRequest>>,
    }

    impl Scripted {
        fn new(reply: Result<Option<String>, BackendError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerationBackend for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> Result<Option<String>, BackendError> {
            self.seen.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn passage(source: &str, page: Page, sequence: usize, text: &str) -> Passage {
        Passage {
            text: text.to_string(),
            source: source.to_string(),
            page,
            sequence,
            hash: String::new(),
        }
    }

    fn hit(source: &str, page: Page, text: &str) -> ScoredPassage {
        ScoredPassage {
            passage: passage(source, page, 0, text),
            score: 0.5,
        }
    }

    fn index() -> VectorIndex {
        VectorIndex::build(
            Arc::new(HashedProvider::new(512).unwrap()),
            vec![
                passage(
                    "manual.pdf",
                    Page::Number(1),
                    0,
                    "Hold the power button for 3 seconds to turn the device on.",
                ),
                passage(
                    "manual.pdf",
                    Page::Number(2),
                    1,
                    "The battery compartment is under the rear cover.",
                ),
            ],
            8,
        )
        .unwrap()
    }

    #[test]
    fn context_uses_source_headers() {
        let hits = vec![hit("a.pdf", Page::Number(1), "alpha"), hit("b.pdf", Page::Unknown, "beta")];
        assert_eq!(
            assemble_context(&hits),
            "\n--- Source: a.pdf ---\nalpha\n\n--- Source: b.pdf ---\nbeta\n"
        );
    }

    #[test]
    fn citations_dedup_first_seen() {
        let hits = vec![
            hit("a.pdf", Page::Number(2), "x"),
            hit("b.pdf", Page::Number(1), "y"),
            hit("a.pdf", Page::Number(2), "z"),
            hit("a.pdf", Page::Number(1), "w"),
        ];
        assert_eq!(
            collect_citations(&hits),
            vec![
                Citation::new("a.pdf", Page::Number(2)),
                Citation::new("b.pdf", Page::Number(1)),
                Citation::new("a.pdf", Page::Number(1)),
            ]
        );
    }

    #[test]
    fn user_prompt_layout() {
        let prompt = build_user_prompt("CTX", "Why?");
        assert!(prompt.starts_with("Context from uploaded documents:\nCTX\n\nQuestion: Why?"));
        assert!(prompt.ends_with("based on the context above."));
    }

    #[tokio::test]
    async fn answered_with_trimmed_text_and_citations() {
        let backend = Scripted::new(Ok(Some("  Hold it for 3 seconds.\n".into())));
        let answerer = Answerer::new(backend.clone(), AnswerParams::default());
        let answer = answerer.ask(&index(), "How do I turn it on?").await;

        assert_eq!(answer.outcome, Outcome::Answered);
        assert_eq!(answer.text, "Hold it for 3 seconds.");
        assert_eq!(answer.citations.len(), 2);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].system, SYSTEM_INSTRUCTION);
        assert_eq!(seen[0].temperature, 0.1);
        assert_eq!(seen[0].max_output_tokens, 1000);
        assert!(seen[0].user_text.contains("3 seconds"));
        assert!(seen[0].user_text.contains("Question: How do I turn it on?"));
    }

    #[tokio::test]
    async fn empty_reply_keeps_citations() {
        let backend = Scripted::new(Ok(Some("   ".into())));
        let answer = Answerer::new(backend, AnswerParams::default())
            .ask(&index(), "power")
            .await;
        assert_eq!(answer.outcome, Outcome::NoResponse);
        assert_eq!(answer.text, NO_RESPONSE_MESSAGE);
        assert!(!answer.citations.is_empty());

        let backend = Scripted::new(Ok(None));
        let answer = Answerer::new(backend, AnswerParams::default())
            .ask(&index(), "power")
            .await;
        assert_eq!(answer.outcome, Outcome::NoResponse);
    }

    #[tokio::test]
    async fn backend_error_becomes_failed_answer() {
        let backend = Scripted::new(Err(BackendError::Transport("connection refused".into())));
        let answer = Answerer::new(backend, AnswerParams::default())
            .ask(&index(), "power")
            .await;
        assert!(answer.text.starts_with("Error generating response: "));
        assert!(answer.text.contains("connection refused"));
        assert!(answer.citations.is_empty());
        assert!(matches!(answer.outcome, Outcome::Failed { .. }));
    }

    #[tokio::test]
    async fn threshold_drops_everything() {
        let backend = Scripted::new(Ok(Some("unused".into())));
        let params = AnswerParams {
            min_score: Some(1.1),
            ..AnswerParams::default()
        };
        let answer = Answerer::new(backend.clone(), params)
            .ask(&index(), "power button")
            .await;
        assert_eq!(answer.outcome, Outcome::LowConfidence);
        assert_eq!(answer.text, LOW_CONFIDENCE_MESSAGE);
        assert!(answer.citations.is_empty());
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn threshold_keeps_scores_at_or_above_min() {
        let backend = Scripted::new(Ok(Some("ok".into())));
        let idx = index();
        let hits = idx.search("battery compartment rear cover", 2).unwrap();
        let params = AnswerParams {
            min_score: Some(hits[0].score),
            ..AnswerParams::default()
        };
        let answer = Answerer::new(backend, params)
            .ask(&idx, "battery compartment rear cover")
            .await;
        assert_eq!(answer.outcome, Outcome::Answered);
        assert_eq!(answer.citations, vec![Citation::new("manual.pdf", Page::Number(2))]);
    }

    #[tokio::test]
    async fn k_zero_means_no_context() {
        let backend = Scripted::new(Ok(Some("unused".into())));
        let params = AnswerParams {
            k: 0,
            ..AnswerParams::default()
        };
        let answer = Answerer::new(backend, params).ask(&index(), "power").await;
        assert_eq!(answer.outcome, Outcome::NoContext);
        assert_eq!(answer.text, NO_CONTEXT_MESSAGE);
        assert!(answer.citations.is_empty());
    }
}
