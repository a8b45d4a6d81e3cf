use std::path::PathBuf;

use thiserror::Error;

/// Errors the program classifies itself. Anything else travels as `anyhow::Error`.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("OpenAI API key is not configured")]
    MissingApiKey,

    #[error("PDF file not found: {}", .0.display())]
    PdfNotFound(PathBuf),

    #[error("File is not a PDF: {}", .0.display())]
    NotAPdf(PathBuf),

    #[error(
        "No text could be extracted from the PDF. It may be image-based or encrypted: {}",
        .0.display()
    )]
    EmptyDocument(PathBuf),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unsupported index format version {found} (expected {expected})")]
    IndexFormat { found: u32, expected: u32 },

    #[error("Index was built with embedding model '{found}', but '{expected}' is configured")]
    IndexModelMismatch { found: String, expected: String },

    #[error(
        "Index was chunked with size {found_size}/overlap {found_overlap}, \
         but size {expected_size}/overlap {expected_overlap} is configured"
    )]
    IndexChunkingMismatch {
        found_size: usize,
        found_overlap: usize,
        expected_size: usize,
        expected_overlap: usize,
    },
}

impl AppError {
    /// Configuration errors get actionable guidance instead of a troubleshooting dump.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AppError::MissingApiKey
                | AppError::PdfNotFound(_)
                | AppError::NotAPdf(_)
                | AppError::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(AppError::MissingApiKey.is_configuration());
        assert!(AppError::PdfNotFound(PathBuf::from("a.pdf")).is_configuration());
        assert!(!AppError::EmptyDocument(PathBuf::from("a.pdf")).is_configuration());
        assert!(!AppError::IndexFormat {
            found: 0,
            expected: 1
        }
        .is_configuration());
    }

    #[test]
    fn test_messages_name_the_path() {
        let err = AppError::PdfNotFound(PathBuf::from("docs/report.pdf"));
        assert_eq!(err.to_string(), "PDF file not found: docs/report.pdf");
    }
}
