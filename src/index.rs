use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rig::embeddings::Embedding;
use rig::vector_store::in_memory_store::InMemoryVectorStore;
use rig::OneOrMany;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use uuid::Uuid;

use crate::error::AppError;

/// Bumped whenever the persisted layout changes; older caches are rebuilt.
pub const FORMAT_VERSION: u32 = 1;

/// File name of the persisted index inside a cache directory.
pub const INDEX_FILE: &str = "index.json";

/// Settings that shape the nodes. A cache built with different settings is stale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexSettings {
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

/// One retrievable chunk of the document with its embeddings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: String,
    pub text: String,
    pub embeddings: OneOrMany<Embedding>,
}

/// Describes how an index was built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub format_version: u32,
    pub settings: IndexSettings,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// A retrieved node and its similarity to the question.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredNode {
    pub node_id: String,
    pub text: String,
    pub score: f64,
}

impl ScoredNode {
    /// The node's text, or `None` when there is nothing to show.
    pub fn content(&self) -> Option<&str> {
        let text = self.text.trim();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Persisted form of the semantic index over one document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorIndex {
    pub manifest: Manifest,
    pub nodes: Vec<Node>,
}

impl VectorIndex {
    /// Wraps freshly embedded chunks, giving each node a new id.
    pub fn new(
        source: impl Into<String>,
        settings: IndexSettings,
        embedded: Vec<(String, OneOrMany<Embedding>)>,
    ) -> Self {
        let nodes = embedded
            .into_iter()
            .map(|(text, embeddings)| Node {
                id: Uuid::new_v4().to_string(),
                text,
                embeddings,
            })
            .collect();

        VectorIndex {
            manifest: Manifest {
                format_version: FORMAT_VERSION,
                settings,
                source: source.into(),
                created_at: Utc::now(),
            },
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Hands the nodes to rig's in-memory store, keyed by node id.
    pub fn into_store(self) -> InMemoryVectorStore<String> {
        InMemoryVectorStore::from_documents_with_ids(
            self.nodes
                .into_iter()
                .map(|node| (node.id, node.text, node.embeddings)),
        )
    }

    /// Rejects indexes this build cannot use.
    fn validate(&self) -> Result<(), AppError> {
        if self.manifest.format_version != FORMAT_VERSION {
            return Err(AppError::IndexFormat {
                found: self.manifest.format_version,
                expected: FORMAT_VERSION,
            });
        }
        Ok(())
    }
}

/// Persistence for a [`VectorIndex`] inside a cache directory.
pub trait IndexStore {
    fn load(&self, dir: &Path) -> Result<VectorIndex>;
    fn persist(&self, index: &VectorIndex, dir: &Path) -> Result<()>;
}

/// Stores the index as a single JSON file.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonIndexStore;

impl IndexStore for JsonIndexStore {
    fn load(&self, dir: &Path) -> Result<VectorIndex> {
        let path = dir.join(INDEX_FILE);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read index file: {}", path.display()))?;

        let index: VectorIndex = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse index file: {}", path.display()))?;
        index.validate()?;

        tracing::debug!("Loaded {} nodes from {}", index.len(), path.display());
        Ok(index)
    }

    fn persist(&self, index: &VectorIndex, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache directory: {}", dir.display()))?;

        let content = serde_json::to_string(index).context("Failed to serialize index")?;

        // Write then rename so a crash never leaves a half-written index behind.
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        let path = dir.join(INDEX_FILE);
        fs::write(&tmp, content)
            .with_context(|| format!("Failed to write index file: {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to move index into place: {}", path.display()))?;

        tracing::debug!("Saved {} nodes to {}", index.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn embedded(text: &str, vec: Vec<f64>) -> (String, OneOrMany<Embedding>) {
        (
            text.to_string(),
            OneOrMany::one(Embedding {
                document: text.to_string(),
                vec,
            }),
        )
    }

    fn settings() -> IndexSettings {
        IndexSettings {
            embedding_model: "test-embedding".to_string(),
            chunk_size: 100,
            chunk_overlap: 20,
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex::new(
            "cats.pdf",
            settings(),
            vec![
                embedded("cats sleep", vec![1.0, 0.0]),
                embedded("dogs bark", vec![0.0, 1.0]),
                embedded("birds sing", vec![0.5, 0.5]),
            ],
        )
    }

    #[test]
    fn test_new_assigns_unique_ids() {
        let index = sample_index();
        assert_eq!(index.len(), 3);
        assert_ne!(index.nodes[0].id, index.nodes[1].id);
        assert_eq!(index.manifest.format_version, FORMAT_VERSION);
        assert_eq!(index.manifest.settings, settings());
    }

    #[test]
    fn test_into_store_keys_by_node_id() {
        let index = sample_index();
        let first_id = index.nodes[0].id.clone();

        let store = index.into_store();
        assert_eq!(store.len(), 3);

        let (text, _) = store
            .iter()
            .find(|(id, _)| **id == first_id)
            .map(|(_, entry)| entry.clone())
            .unwrap();
        assert_eq!(text, "cats sleep");
    }

    #[test]
    fn test_persist_and_load() {
        let dir = TempDir::new().unwrap();
        let store = JsonIndexStore;
        let index = sample_index();

        store.persist(&index, dir.path()).unwrap();
        assert!(dir.path().join(INDEX_FILE).exists());
        assert!(!dir.path().join("index.json.tmp").exists());

        let loaded = store.load(dir.path()).unwrap();
        assert_eq!(loaded.manifest, index.manifest);
        assert_eq!(loaded.nodes.len(), 3);
        for (loaded, original) in loaded.nodes.iter().zip(&index.nodes) {
            assert_eq!(loaded.id, original.id);
            assert_eq!(loaded.text, original.text);
            assert_eq!(loaded.embeddings.first().vec, original.embeddings.first().vec);
        }
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(INDEX_FILE), "not json at all").unwrap();
        assert!(JsonIndexStore.load(dir.path()).is_err());
    }

    #[test]
    fn test_load_rejects_other_format_version() {
        let dir = TempDir::new().unwrap();
        let mut index = sample_index();
        index.manifest.format_version = FORMAT_VERSION + 1;
        fs::write(
            dir.path().join(INDEX_FILE),
            serde_json::to_string(&index).unwrap(),
        )
        .unwrap();

        let err = JsonIndexStore.load(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::IndexFormat { .. })
        ));
    }

    #[test]
    fn test_scored_node_content() {
        let node = ScoredNode {
            node_id: "n1".to_string(),
            text: "  \n ".to_string(),
            score: 0.5,
        };
        assert!(node.content().is_none());
    }
}
