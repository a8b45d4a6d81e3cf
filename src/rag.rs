use anyhow::Result;
use rig::client::EmbeddingsClient;
use rig::embeddings::EmbeddingModel;
use std::io::{self, BufRead, Write};

use crate::cache::{self, IndexCache};
use crate::config::{Cli, Config};
use crate::credentials::{self, ApiKey};
use crate::index::{IndexSettings, JsonIndexStore};
use crate::llm::{self, GenerationSettings, OpenAiSynthesizer, Synthesizer};
use crate::pdf::{self, Document};
use crate::query::QueryEngine;
use crate::session::{Ask, Session};

/// Runs one session: configuration and credential checks, then the PDF
/// question loop.
///
/// Configuration problems surface as [`crate::error::AppError`] before any
/// network client is created.
pub async fn run(cli: &Cli, env_key: Option<String>) -> Result<()> {
    let config = Config::try_from(cli)?;

    let api_key = credentials::resolve(cli.api_key.as_deref(), env_key)?;
    report_api_key(&api_key);

    pdf::check_pdf_path(&config.pdf)?;

    ask_pdf(&config, &api_key).await
}

fn report_api_key(api_key: &ApiKey) {
    if api_key.looks_valid() {
        println!(
            "API key confirmed, nyan! It's set properly (prefix: {}...)",
            api_key.preview()
        );
    } else {
        println!("Nya? The API key format might not be right...");
        println!("Configured key prefix: {}...", api_key.preview());
        tracing::warn!("API key does not start with the expected 'sk-' prefix");
    }
}

/// Wires the OpenAI models to the console.
async fn ask_pdf(config: &Config, api_key: &ApiKey) -> Result<()> {
    let client = llm::create_client(api_key.expose())?;
    let model = client.embedding_model(config.embedding_model.as_str());
    let synthesizer = OpenAiSynthesizer::new(
        client,
        GenerationSettings {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        },
    );
    println!("Answering with model {}, nya", config.model);

    answer_document(
        config,
        || pdf::load_document(&config.pdf),
        model,
        synthesizer,
        io::stdin().lock(),
        io::stdout(),
    )
    .await
}

/// Pipeline: cached index → first answer → follow-up loop.
pub async fn answer_document<M, S, R, W, F>(
    config: &Config,
    load_document: F,
    model: M,
    synthesizer: S,
    input: R,
    mut output: W,
) -> Result<()>
where
    M: EmbeddingModel + Clone,
    S: Synthesizer,
    R: BufRead,
    W: Write,
    F: FnOnce() -> Result<Document>,
{
    let settings = IndexSettings {
        embedding_model: config.embedding_model.clone(),
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
    };
    let dir = cache::storage_dir(&config.storage_root, &config.pdf, &config.model);
    let cache = IndexCache::new(dir, JsonIndexStore, settings);
    let (index, outcome) = cache.load_or_build_from(load_document, &model).await?;
    tracing::info!(
        "Index ready ({:?}, {} nodes) at {}",
        outcome,
        index.len(),
        cache.dir().display()
    );

    writeln!(output, "Initializing the query engine...nyan")?;
    let mut engine = QueryEngine::new(index.into_store(), model, synthesizer, config.top_k);

    engine.ask(&config.query, &mut output).await?;

    let mut session = Session::new(input, &mut output, config.interactive);
    let answered = session.run(&mut engine).await?;
    tracing::debug!("Answered {} follow-up questions", answered);

    writeln!(output, "\nAll done, nyan! Come ask again♪")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::testing::KeywordEmbeddingModel;
    use crate::error::AppError;
    use crate::index::INDEX_FILE;
    use clap::Parser;
    use std::io::Cursor;
    use std::path::Path;
    use tempfile::TempDir;

    struct EchoSynthesizer;

    impl Synthesizer for EchoSynthesizer {
        async fn synthesize(&self, _question: &str, context: &str) -> Result<String> {
            Ok(format!("Based on {} characters of context", context.chars().count()))
        }
    }

    fn document() -> Result<Document> {
        Ok(Document {
            source: "pets.pdf".to_string(),
            text: "Cats purr when content. Dogs bark at strangers. ".repeat(10),
        })
    }

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pdf_qa").chain(args.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn test_missing_credential_fails_first() {
        let err = run(&cli(&["--pdf", "missing.pdf"]), None).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_missing_pdf_fails_before_network() {
        let err = run(
            &cli(&["--pdf", "no/such/file.pdf", "--api_key", "sk-test"]),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::PdfNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_environment_key_is_enough_to_reach_pdf_check() {
        let err = run(
            &cli(&["--pdf", "no/such/file.pdf"]),
            Some("sk-from-env".to_string()),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::PdfNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let err = run(
            &cli(&["--pdf", "doc.pdf", "--temperature", "5.0", "--api_key", "sk-test"]),
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn test_first_answer_then_stop() {
        let root = TempDir::new().unwrap();
        let root_arg = root.path().to_string_lossy().into_owned();
        let config = Config::try_from(&cli(&[
            "--pdf",
            "pets.pdf",
            "--query",
            "What do cats do?",
            "--chunk_size",
            "100",
            "--chunk_overlap",
            "20",
            "--storage_root",
            &root_arg,
        ]))
        .unwrap();

        let mut output = Vec::new();
        answer_document(
            &config,
            document,
            KeywordEmbeddingModel::default(),
            EchoSynthesizer,
            Cursor::new(b"n\n".to_vec()),
            &mut output,
        )
        .await
        .unwrap();
        let text = String::from_utf8(output).unwrap();

        let dir = cache::storage_dir(root.path(), Path::new("pets.pdf"), "gpt-4");
        assert!(dir.join(INDEX_FILE).exists());

        assert!(text.contains("=== Question: What do cats do? ==="));
        assert!(text.contains("Based on"));
        let sources = text.find("=== Sources, nyan: ===").unwrap();
        assert!(text[sources..].contains("Source 1 (score"));
        assert!(text[sources..].contains("Cats purr when content"));
        let more = text.find("Any more questions?").unwrap();
        assert!(more > sources);
        assert!(text.ends_with("All done, nyan! Come ask again♪\n"));
    }

    #[tokio::test]
    async fn test_second_run_reuses_cached_index() {
        let root = TempDir::new().unwrap();
        let root_arg = root.path().to_string_lossy().into_owned();
        let config = Config::try_from(&cli(&[
            "--pdf",
            "pets.pdf",
            "--chunk_size",
            "100",
            "--chunk_overlap",
            "20",
            "--storage_root",
            &root_arg,
        ]))
        .unwrap();

        for first_run in [true, false] {
            let mut output = Vec::new();
            answer_document(
                &config,
                || {
                    assert!(first_run, "cached index must be reused");
                    document()
                },
                KeywordEmbeddingModel::default(),
                EchoSynthesizer,
                Cursor::new(Vec::new()),
                &mut output,
            )
            .await
            .unwrap();
        }
    }
}
