use anyhow::{Context, Result};
use rig::embeddings::EmbeddingModel;
use rig::vector_store::in_memory_store::{InMemoryVectorIndex, InMemoryVectorStore};
use rig::vector_store::request::VectorSearchRequest;
use rig::vector_store::VectorStoreIndex;
use std::io::Write;

use crate::index::ScoredNode;
use crate::llm::Synthesizer;
use crate::session::Ask;

/// Characters of each source passage shown under an answer.
pub const EXCERPT_CHARS: usize = 300;

/// An answer and the passages it was grounded on.
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub answer: String,
    pub sources: Vec<ScoredNode>,
}

/// Answers questions against one loaded index.
pub struct QueryEngine<M: EmbeddingModel, S> {
    index: InMemoryVectorIndex<M, String>,
    synthesizer: S,
    top_k: usize,
}

impl<M: EmbeddingModel, S: Synthesizer> QueryEngine<M, S> {
    pub fn new(store: InMemoryVectorStore<String>, model: M, synthesizer: S, top_k: usize) -> Self {
        QueryEngine {
            index: store.index(model),
            synthesizer,
            top_k,
        }
    }

    /// Pipeline: rig top-n retrieval → synthesize answer.
    pub async fn query(&self, question: &str) -> Result<QueryResult> {
        let request = VectorSearchRequest::builder()
            .query(question)
            .samples(self.top_k as u64)
            .build()?;

        let results: Vec<(f64, String, String)> = self
            .index
            .top_n(request)
            .await
            .context("Failed to retrieve passages")?;

        // rig hands back the best n unordered; show the closest first.
        let mut sources: Vec<ScoredNode> = results
            .into_iter()
            .map(|(score, node_id, text)| ScoredNode {
                node_id,
                text,
                score,
            })
            .collect();
        sources.sort_by(|a, b| b.score.total_cmp(&a.score));

        tracing::info!(
            "Retrieved {} passages (scores: {})",
            sources.len(),
            sources
                .iter()
                .map(|s| format!("{:.3}", s.score))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let context = build_context(&sources);
        let answer = self
            .synthesizer
            .synthesize(question, &context)
            .await
            .context("Failed to generate an answer")?;

        Ok(QueryResult { answer, sources })
    }
}

impl<M: EmbeddingModel, S: Synthesizer> Ask for QueryEngine<M, S> {
    async fn ask(&mut self, question: &str, out: &mut dyn Write) -> Result<()> {
        writeln!(out, "\n=== Question: {} ===", question)?;
        writeln!(out, "Thinking...nyan...")?;
        out.flush()?;

        let result = self.query(question).await?;
        writeln!(out, "\nHere's the answer, nyan!\n{}", result.answer)?;

        if let Err(e) = render_sources(&result.sources, out) {
            tracing::warn!("Failed to show sources: {}", e);
        }
        Ok(())
    }
}

/// Joins retrieved passages into the context handed to the model.
pub fn build_context(sources: &[ScoredNode]) -> String {
    sources
        .iter()
        .filter_map(|s| s.content())
        .enumerate()
        .map(|(i, text)| format!("[Source {}]\n{}", i + 1, text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// First [`EXCERPT_CHARS`] characters of `text`, followed by an ellipsis.
pub fn excerpt(text: &str) -> String {
    let mut preview: String = text.chars().take(EXCERPT_CHARS).collect();
    preview.push_str("...");
    preview
}

/// Prints the numbered source excerpts. A source without text gets a
/// placeholder line; the rest are still shown.
pub fn render_sources(sources: &[ScoredNode], out: &mut dyn Write) -> std::io::Result<()> {
    writeln!(out, "\n=== Sources, nyan: ===")?;

    if sources.is_empty() {
        writeln!(out, "No source information found, nya...")?;
        return Ok(());
    }

    for (i, source) in sources.iter().enumerate() {
        writeln!(out, "Source {} (score {:.3}), nyan:", i + 1, source.score)?;
        match source.content() {
            Some(text) => writeln!(out, "{}", excerpt(text))?,
            None => writeln!(out, "Can't show this source's content, nya...")?,
        }
    }

    Ok(())
}
