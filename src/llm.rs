use anyhow::{Context, Result};
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use std::future::Future;

/// Produces an answer to a question from retrieved context.
pub trait Synthesizer {
    fn synthesize(&self, question: &str, context: &str) -> impl Future<Output = Result<String>>;
}

/// Generation settings for the chat model.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: Option<u64>,
}

/// Creates the OpenAI client shared by embeddings and answer generation.
pub fn create_client(api_key: &str) -> Result<openai::Client<reqwest::Client>> {
    let client: openai::Client<reqwest::Client> =
        openai::Client::new(api_key).context("Failed to create OpenAI client")?;
    Ok(client)
}

/// Answers with an OpenAI chat model through a rig agent.
#[derive(Clone)]
pub struct OpenAiSynthesizer {
    client: openai::Client<reqwest::Client>,
    settings: GenerationSettings,
}

impl OpenAiSynthesizer {
    pub fn new(client: openai::Client<reqwest::Client>, settings: GenerationSettings) -> Self {
        OpenAiSynthesizer { client, settings }
    }
}

impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, question: &str, context: &str) -> Result<String> {
        let preamble = preamble(context);

        let mut builder = self
            .client
            .agent(self.settings.model.as_str())
            .preamble(&preamble)
            .temperature(self.settings.temperature);
        if let Some(max_tokens) = self.settings.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        let agent = builder.build();

        let response = agent
            .prompt(question)
            .await
            .with_context(|| format!("Model '{}' failed to answer", self.settings.model))?;
        Ok(response)
    }
}

/// System preamble that pins the model to the retrieved passages.
pub fn preamble(context: &str) -> String {
    if context.is_empty() {
        return "You are a helpful assistant answering questions about a PDF document. \
                No passages from the document matched the question; say so if you cannot answer."
            .to_string();
    }

    format!(
        "You are a helpful assistant answering questions about a PDF document.\n\
         Context information is below.\n\
         ---------------------\n{}\n---------------------\n\
         Given the context information and not prior knowledge, answer the question.",
        context
    )
}
