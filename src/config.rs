use std::path::PathBuf;

use clap::Parser;

use crate::error::AppError;

pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_QUERY: &str = "Tell me the main points of this document";

/// pdf_qa — ask questions about a PDF document.
///
/// The document is indexed once per model and cached next to the working
/// directory, so follow-up runs against the same PDF skip re-indexing.
#[derive(Parser, Debug, Clone)]
#[command(name = "pdf_qa")]
#[command(version = "0.1.0")]
#[command(about = "Ask questions about a PDF document, nya!", long_about = None)]
pub struct Cli {
    /// Path to the PDF file to ask about
    #[arg(long, value_name = "FILE_PATH")]
    pub pdf: PathBuf,

    /// OpenAI API key (read from .env / OPENAI_API_KEY when omitted)
    #[arg(long = "api_key", alias = "api-key")]
    pub api_key: Option<String>,

    /// Chat model used to answer questions
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// First question to ask
    #[arg(long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Sampling temperature for answer generation
    #[arg(long, default_value_t = 0.0)]
    pub temperature: f64,

    /// Maximum number of tokens to generate per answer
    #[arg(long = "max_tokens", alias = "max-tokens")]
    pub max_tokens: Option<u64>,

    /// Run in interactive mode
    #[arg(long)]
    pub interactive: bool,

    /// Embedding model used to index the document
    #[arg(long = "embedding_model", alias = "embedding-model", default_value = DEFAULT_EMBEDDING_MODEL)]
    pub embedding_model: String,

    /// Maximum number of characters per indexed chunk
    #[arg(long = "chunk_size", alias = "chunk-size", default_value_t = 1024)]
    pub chunk_size: usize,

    /// Number of characters shared between adjacent chunks
    #[arg(long = "chunk_overlap", alias = "chunk-overlap", default_value_t = 200)]
    pub chunk_overlap: usize,

    /// Number of passages retrieved per question
    #[arg(long = "top_k", alias = "top-k", default_value_t = 2)]
    pub top_k: usize,

    /// Directory under which the index cache directories are created
    #[arg(long = "storage_root", alias = "storage-root", default_value = ".")]
    pub storage_root: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validated, immutable run configuration. The API key stays out of here and
/// is resolved separately by [`crate::credentials`].
#[derive(Debug, Clone)]
pub struct Config {
    pub pdf: PathBuf,
    pub model: String,
    pub query: String,
    pub temperature: f64,
    pub max_tokens: Option<u64>,
    pub interactive: bool,
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub storage_root: PathBuf,
}

impl TryFrom<&Cli> for Config {
    type Error = AppError;

    fn try_from(cli: &Cli) -> Result<Self, Self::Error> {
        if cli.chunk_size == 0 {
            return Err(AppError::InvalidConfig(
                "--chunk_size must be greater than zero".to_string(),
            ));
        }
        if cli.chunk_overlap >= cli.chunk_size {
            return Err(AppError::InvalidConfig(format!(
                "--chunk_overlap ({}) must be smaller than --chunk_size ({})",
                cli.chunk_overlap, cli.chunk_size
            )));
        }
        if cli.top_k == 0 {
            return Err(AppError::InvalidConfig(
                "--top_k must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&cli.temperature) {
            return Err(AppError::InvalidConfig(format!(
                "--temperature must be between 0.0 and 2.0, got {}",
                cli.temperature
            )));
        }

        Ok(Config {
            pdf: cli.pdf.clone(),
            model: cli.model.clone(),
            query: cli.query.clone(),
            temperature: cli.temperature,
            max_tokens: cli.max_tokens,
            interactive: cli.interactive,
            embedding_model: cli.embedding_model.clone(),
            chunk_size: cli.chunk_size,
            chunk_overlap: cli.chunk_overlap,
            top_k: cli.top_k,
            storage_root: cli.storage_root.clone(),
        })
    }
}
