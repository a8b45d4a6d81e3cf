use std::fmt;

use crate::error::AppError;

/// Environment variable holding the OpenAI key. `.env` files feed it through `dotenvy`.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

const EXPECTED_PREFIX: &str = "sk-";
const PREVIEW_LEN: usize = 5;

/// An OpenAI API key. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        ApiKey(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// First few characters, for console feedback.
    pub fn preview(&self) -> String {
        self.0.chars().take(PREVIEW_LEN).collect()
    }

    /// Soft format check: OpenAI keys start with `sk-`.
    pub fn looks_valid(&self) -> bool {
        self.0.starts_with(EXPECTED_PREFIX)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}...)", self.preview())
    }
}

/// Picks the API key: explicit argument first, then the environment value.
/// Blank values count as absent.
pub fn resolve(explicit: Option<&str>, env_value: Option<String>) -> Result<ApiKey, AppError> {
    if let Some(key) = explicit.map(str::trim).filter(|k| !k.is_empty()) {
        tracing::debug!("Using API key from command line");
        return Ok(ApiKey::new(key));
    }

    if let Some(key) = env_value
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
    {
        tracing::debug!("Using API key from {}", API_KEY_VAR);
        return Ok(ApiKey::new(key));
    }

    Err(AppError::MissingApiKey)
}

/// Reads [`API_KEY_VAR`] from the process environment.
pub fn env_value() -> Option<String> {
    std::env::var(API_KEY_VAR).ok()
}

/// The three ways to provide a key, printed when none was found.
pub fn guidance() -> String {
    format!(
        "Nyaa~n! The OpenAI API key is not set...\n\
         Please set it in one of these ways, nya:\n\
         1. Pass it with the --api_key argument\n\
         2. Write {var}=sk-your-key into a .env file\n\
         3. Set the {var} environment variable",
        var = API_KEY_VAR
    )
}
