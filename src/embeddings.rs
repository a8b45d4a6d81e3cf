use anyhow::{Context, Result};
use rig::embeddings::{Embedding, EmbeddingModel, EmbeddingsBuilder};
use rig::OneOrMany;

/// Embeds document chunks, preserving their order.
///
/// rig's builder splits the chunks into requests of at most
/// `M::MAX_DOCUMENTS` each.
pub async fn embed_chunks<M: EmbeddingModel>(
    model: M,
    chunks: Vec<String>,
) -> Result<Vec<(String, OneOrMany<Embedding>)>> {
    let count = chunks.len();
    tracing::debug!("Embedding {} chunks (up to {} per request)", count, M::MAX_DOCUMENTS);

    let embeddings = EmbeddingsBuilder::new(model)
        .documents(chunks)?
        .build()
        .await
        .context("Failed to embed document chunks")?;

    if embeddings.len() != count {
        anyhow::bail!(
            "Embedding model returned {} embeddings for {} chunks",
            embeddings.len(),
            count
        );
    }

    Ok(embeddings)
}

#[cfg(test)]
pub(crate) mod testing {
    use rig::client::Nothing;
    use rig::embeddings::{Embedding, EmbeddingError, EmbeddingModel};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Two-dimensional embeddings: texts mentioning dogs point one way,
    /// everything else the other.
    #[derive(Clone, Default)]
    pub struct KeywordEmbeddingModel {
        pub calls: Arc<AtomicUsize>,
    }

    impl KeywordEmbeddingModel {
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl EmbeddingModel for KeywordEmbeddingModel {
        const MAX_DOCUMENTS: usize = 4;

        type Client = Nothing;

        fn make(_: &Self::Client, _: impl Into<String>, _: Option<usize>) -> Self {
            Self::default()
        }

        fn ndims(&self) -> usize {
            2
        }

        async fn embed_texts(
            &self,
            texts: impl IntoIterator<Item = String> + Send,
        ) -> Result<Vec<Embedding>, EmbeddingError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .into_iter()
                .map(|text| {
                    let vec = if text.to_lowercase().contains("dog") {
                        vec![0.1, 1.0]
                    } else {
                        vec![1.0, 0.1]
                    };
                    Embedding {
                        document: text,
                        vec,
                    }
                })
                .collect())
        }
    }
}
