use anyhow::Result;
use rig::embeddings::EmbeddingModel;
use std::fs;
use std::path::{Path, PathBuf};

use crate::chunker;
use crate::embeddings;
use crate::error::AppError;
use crate::index::{IndexSettings, IndexStore, VectorIndex};
use crate::pdf::{self, Document};

/// Cache directory for a PDF and chat model: `<root>/storage_<stem>_<model>`,
/// with dashes in the model name turned into underscores.
pub fn storage_dir(root: &Path, pdf: &Path, model: &str) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    root.join(format!("storage_{}_{}", stem, model.replace('-', "_")))
}

/// How the index came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Restored from the cache directory.
    Loaded,
    /// No cache existed; built and persisted.
    Built,
    /// The cache could not be restored; it was discarded and rebuilt.
    Rebuilt,
}

/// Loads the index from its cache directory or builds it from the document.
pub struct IndexCache<S: IndexStore> {
    dir: PathBuf,
    store: S,
    settings: IndexSettings,
}

impl<S: IndexStore> IndexCache<S> {
    pub fn new(dir: PathBuf, store: S, settings: IndexSettings) -> Self {
        IndexCache {
            dir,
            store,
            settings,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns a ready index for the PDF at `pdf_path`.
    pub async fn load_or_build<M: EmbeddingModel + Clone>(
        &self,
        pdf_path: &Path,
        model: &M,
    ) -> Result<(VectorIndex, CacheOutcome)> {
        self.load_or_build_from(|| pdf::load_document(pdf_path), model)
            .await
    }

    /// Same as [`IndexCache::load_or_build`], reading the document only when a
    /// build is needed.
    pub async fn load_or_build_from<M, F>(
        &self,
        load_document: F,
        model: &M,
    ) -> Result<(VectorIndex, CacheOutcome)>
    where
        M: EmbeddingModel + Clone,
        F: FnOnce() -> Result<Document>,
    {
        let mut outcome = CacheOutcome::Built;

        if self.dir.exists() {
            println!("Found an existing index, nya: {}", self.dir.display());
            println!("Loading the saved index...");

            match self.load() {
                Ok(index) => {
                    tracing::info!("Loaded cached index with {} nodes", index.len());
                    return Ok((index, CacheOutcome::Loaded));
                }
                Err(e) => {
                    println!("Something went wrong loading the index, nya: {:#}", e);
                    println!("Rebuilding the index...");
                    tracing::warn!("Discarding cache {}: {:#}", self.dir.display(), e);
                    self.discard();
                    outcome = CacheOutcome::Rebuilt;
                }
            }
        }

        println!("No usable index, so building a new one, nyan...");
        let index = self.build(load_document()?, model).await?;
        Ok((index, outcome))
    }

    fn load(&self) -> Result<VectorIndex> {
        let index = self.store.load(&self.dir)?;
        let found = &index.manifest.settings;

        if found.embedding_model != self.settings.embedding_model {
            return Err(AppError::IndexModelMismatch {
                found: found.embedding_model.clone(),
                expected: self.settings.embedding_model.clone(),
            }
            .into());
        }
        if found.chunk_size != self.settings.chunk_size
            || found.chunk_overlap != self.settings.chunk_overlap
        {
            return Err(AppError::IndexChunkingMismatch {
                found_size: found.chunk_size,
                found_overlap: found.chunk_overlap,
                expected_size: self.settings.chunk_size,
                expected_overlap: self.settings.chunk_overlap,
            }
            .into());
        }
        if index.is_empty() {
            anyhow::bail!("Cached index contains no nodes");
        }

        Ok(index)
    }

    /// Best-effort removal of the cache directory.
    fn discard(&self) {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => println!("Removed the old index, nya: {}", self.dir.display()),
            Err(e) => {
                println!("Could not remove the old index...");
                tracing::warn!("Failed to remove {}: {}", self.dir.display(), e);
            }
        }
    }

    async fn build<M: EmbeddingModel + Clone>(&self, document: Document, model: &M) -> Result<VectorIndex> {
        println!(
            "Read '{}' ({} characters), nyan!",
            document.source,
            document.text.chars().count()
        );

        let chunks = chunker::chunk_text(
            &document.text,
            self.settings.chunk_size,
            self.settings.chunk_overlap,
        );
        tracing::info!(
            "Chunked document into {} chunks (size={}, overlap={})",
            chunks.len(),
            self.settings.chunk_size,
            self.settings.chunk_overlap
        );
        if chunks.is_empty() {
            anyhow::bail!("Document '{}' produced no chunks", document.source);
        }

        println!("Building the vector index ({} chunks)...nyan", chunks.len());
        let embedded = embeddings::embed_chunks(model.clone(), chunks).await?;
        let index = VectorIndex::new(document.source, self.settings.clone(), embedded);

        if let Err(e) = self.store.persist(&index, &self.dir) {
            // A partial directory would be picked up as a cache next run.
            if let Err(cleanup) = fs::remove_dir_all(&self.dir) {
                tracing::warn!(
                    "Failed to remove partial cache {}: {}",
                    self.dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }
        println!("Saved the index to '{}', nyan!", self.dir.display());

        Ok(index)
    }
}
