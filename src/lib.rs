//! pdf_qa — ask natural-language questions about a PDF document.
//!
//! The document is chunked, embedded with OpenAI and cached on disk per
//! document and model; answers are generated from the retrieved passages.

pub mod cache;
pub mod chunker;
pub mod config;
pub mod credentials;
pub mod embeddings;
pub mod error;
pub mod index;
pub mod llm;
pub mod pdf;
pub mod query;
pub mod rag;
pub mod session;
