use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::error::AppError;

/// Text of one source file. A PDF is loaded as a single document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// File name the text came from.
    pub source: String,
    pub text: String,
}

/// Checks that the path exists and has a `.pdf` extension.
pub fn check_pdf_path(path: &Path) -> Result<(), AppError> {
    if !path.exists() {
        return Err(AppError::PdfNotFound(path.to_path_buf()));
    }

    if path
        .extension()
        .map_or(true, |ext| !ext.eq_ignore_ascii_case("pdf"))
    {
        return Err(AppError::NotAPdf(path.to_path_buf()));
    }

    Ok(())
}

/// Extracts all text content from the PDF at `path`.
pub fn load_document(path: &Path) -> Result<Document> {
    check_pdf_path(path)?;

    let bytes = fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;

    let raw = pdf_extract::extract_text_from_mem(&bytes)
        .with_context(|| format!("Failed to extract text from PDF: {}", path.display()))?;

    let text = normalize(&raw);
    if text.is_empty() {
        return Err(AppError::EmptyDocument(path.to_path_buf()).into());
    }

    let source = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    tracing::debug!("Extracted {} characters from {}", text.chars().count(), source);
    Ok(Document { source, text })
}

/// Trims every line and drops blank ones.
fn normalize(text: &str) -> String {
    text.lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join("\n")
}
