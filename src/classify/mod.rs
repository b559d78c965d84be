// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Content classifiers
//!
//! Two independent, stateless classifiers live here:
//! - [`document::DocumentClassifier`] scores extracted text against a keyword
//!   taxonomy and falls back to the file extension.
//! - [`structured::classify_structured`] inspects the shape of a JSON value and
//!   recommends a relational or document storage layout.

pub mod document;
pub mod extract;
pub mod structured;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

pub use document::{DocumentClassifier, TaxonomyEntry};
pub use structured::{classify_structured, StorageParadigm, StructureMetrics, StructuredClassification};

/// Sentinel label for content nothing else recognized
pub const OTHER_CATEGORY: &str = "Other";
pub const OTHER_SUBCATEGORY: &str = "Miscellaneous";

/// What decided a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Keyword frequency in the text
    KeywordMatch,
    /// File extension lookup
    Extension,
    /// Nothing matched; the `Other/Miscellaneous` sentinel
    Sentinel,
}

/// Result of classifying one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: String,
    pub subcategory: String,
    /// Confidence score (0 - 100)
    pub confidence: u8,
    /// Keywords of the winning category that occurred in the text
    pub keywords: Vec<String>,
    pub source: ClassificationSource,
}

impl ClassificationResult {
    /// "Category/Subcategory"
    pub fn label(&self) -> String {
        format!("{}/{}", self.category, self.subcategory)
    }
}

/// Lowercased extension of a filename, if any
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| e.to_lowercase())
}

/// Infer a label from the filename alone
pub fn infer_from_extension(filename: &str) -> Option<(&'static str, &'static str)> {
    let ext = extension_of(filename)?;
    let name_lower = Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();

    match ext.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "webp" | "heic" | "bmp" | "tiff" | "svg" => {
            if name_lower.contains("screenshot") { Some(("Media", "Screenshots")) }
            else { Some(("Media", "Images")) }
        }
        "mp3" | "wav" | "flac" | "ogg" | "m4a" | "aac" => Some(("Media", "Audio")),
        "mp4" | "mkv" | "webm" | "avi" | "mov" => Some(("Media", "Videos")),
        "pdf" | "doc" | "docx" | "odt" | "txt" | "md" | "rtf" => {
            if name_lower.contains("invoice") || name_lower.contains("receipt") { Some(("Documents", "Financial")) }
            else if name_lower.contains("resume") || name_lower.contains("cv") { Some(("Documents", "Personal")) }
            else { Some(("Documents", "General")) }
        }
        "xls" | "xlsx" | "csv" | "ods" => Some(("Documents", "Spreadsheets")),
        "ppt" | "pptx" | "odp" => Some(("Documents", "Presentations")),
        "rs" | "py" | "js" | "ts" | "go" | "java" | "c" | "cpp" | "h" | "rb" | "sh" => Some(("Technical", "Code")),
        "json" | "yaml" | "yml" | "toml" | "xml" | "sql" => Some(("Technical", "Data")),
        "zip" | "tar" | "gz" | "7z" | "rar" => Some(("Archives", "Compressed")),
        _ => None,
    }
}

/// Classify a file on disk, never failing.
///
/// Extraction problems (unsupported format, corrupt container, unreadable file)
/// are downgraded to the extension-based fallback.
pub fn classify_file(classifier: &DocumentClassifier, path: &Path, max_chars: usize) -> ClassificationResult {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let text = match extract::extract_text(path, max_chars) {
        Ok(text) => text,
        Err(e) => {
            warn!("Falling back to extension for {:?}: {}", path, e);
            String::new()
        }
    };
    debug!("Extracted {} chars from {:?}", text.len(), path);

    classifier.classify(&text, &filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("Report.PDF"), Some("pdf".to_string()));
        assert_eq!(extension_of("archive.tar.gz"), Some("gz".to_string()));
        assert_eq!(extension_of("Makefile"), None);
    }

    #[test]
    fn test_infer_from_extension() {
        assert_eq!(infer_from_extension("Screenshot 2024.png"), Some(("Media", "Screenshots")));
        assert_eq!(infer_from_extension("holiday.jpg"), Some(("Media", "Images")));
        assert_eq!(infer_from_extension("invoice_march.pdf"), Some(("Documents", "Financial")));
        assert_eq!(infer_from_extension("main.rs"), Some(("Technical", "Code")));
        assert_eq!(infer_from_extension("mystery.xyz"), None);
    }

    #[test]
    fn test_classify_file_unsupported_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.mp3");
        std::fs::write(&path, b"\xff\xfb\x90\x00").unwrap();

        let result = classify_file(&DocumentClassifier::new().unwrap(), &path, 10_000);
        assert_eq!(result.label(), "Media/Audio");
        assert_eq!(result.source, ClassificationSource::Extension);
    }

    #[test]
    fn test_classify_file_corrupt_docx_uses_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.docx");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let result = classify_file(&DocumentClassifier::new().unwrap(), &path, 10_000);
        assert_eq!(result.label(), "Documents/General");
        assert_eq!(result.source, ClassificationSource::Extension);
    }

    #[test]
    fn test_classify_file_reads_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.txt");
        std::fs::write(&path, "The contract and agreement were reviewed by the attorney.").unwrap();

        let result = classify_file(&DocumentClassifier::new().unwrap(), &path, 10_000);
        assert_eq!(result.label(), "Documents/Legal");
        assert_eq!(result.source, ClassificationSource::KeywordMatch);
    }
}
