//! `pdfchat search`: retrieval without generation.
//!
//! Builds the index for the given documents and prints the top passages
//! for a query with their cosine similarity, source, and a short snippet.
//! Useful for tuning `chunk_size`, `k`, and `min_score`. With `--json` the
//! hits are printed as an array of `{passage, score}` objects, each
//! passage carrying its content hash.

use anyhow::{bail, Result};

use pdfchat_core::models::ScoredPassage;

use crate::config::Config;
use crate::documents::{load_documents, DocumentArgs};
use crate::embedding::load_provider;
use crate::ingest::build_index;
use crate::progress::ProgressMode;

const SNIPPET_CHARS: usize = 200;

pub async fn run_search(
    config: &Config,
    docs: &DocumentArgs,
    query: &str,
    k: Option<usize>,
    json: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Query must not be empty.");
    }
    if docs.is_empty() {
        bail!("No documents given. Use --file <PATH> or --dir <PATH>.");
    }
    let k = k.unwrap_or(config.retrieval.k);
    if k == 0 {
        bail!("--k must be >= 1");
    }

    let documents = load_documents(docs)?;
    let provider = load_provider(&config.embedding).await?;
    let report = build_index(config, provider, documents, ProgressMode::default_for_tty()).await?;

    let hits = report.index.search(query, k)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&hits)?);
        return Ok(());
    }
    if hits.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, hit) in hits.iter().enumerate() {
        print!("{}", format_hit(i + 1, hit));
    }
    Ok(())
}

fn format_hit(rank: usize, hit: &ScoredPassage) -> String {
    format!(
        "{}. [{:.3}] {}\n    {}\n",
        rank,
        hit.score,
        hit.passage.citation(),
        snippet(&hit.passage.text)
    )
}

/// `text` with whitespace folded, cut to [`SNIPPET_CHARS`] characters.
fn snippet(text: &str) -> String {
    let folded: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if folded.chars().count() <= SNIPPET_CHARS {
        folded
    } else {
        let cut: String = folded.chars().take(SNIPPET_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfchat_core::models::{Page, Passage};

    #[test]
    fn hit_line_layout() {
        let hit = ScoredPassage {
            passage: Passage {
                text: "--- Page 2 ---\nBattery\n\nis here".into(),
                source: "manual.pdf".into(),
                page: Page::Number(2),
                sequence: 3,
                hash: String::new(),
            },
            score: 0.81234,
        };
        assert_eq!(
            format_hit(1, &hit),
            "1. [0.812] manual.pdf (Page 2)\n    --- Page 2 --- Battery is here\n"
        );
    }

    #[test]
    fn long_snippets_are_cut_on_char_boundaries() {
        let text = "é".repeat(500);
        let s = snippet(&text);
        assert_eq!(s.chars().count(), SNIPPET_CHARS + 1);
        assert!(s.ends_with('…'));
    }
}
