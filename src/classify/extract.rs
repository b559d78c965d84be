// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Text extraction for office documents, PDFs and plain text

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::Read;
use std::path::Path;

use super::extension_of;
use crate::{Result, TaxisError};

/// Extract text from plain text files (lossy UTF-8)
fn extract_text_file(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extract text from XLSX/XLS/ODS using calamine
fn extract_spreadsheet(path: &Path) -> Result<String> {
    use calamine::{open_workbook_auto, Reader as _};

    let mut workbook = open_workbook_auto(path)
        .map_err(|e| TaxisError::Extraction(format!("Failed to open spreadsheet: {}", e)))?;

    let mut text = String::new();
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    text.push_str(&sheet_names.join(" "));
    text.push('\n');

    // Only the first sheet is read
    if let Some(sheet_name) = sheet_names.first() {
        let range = workbook
            .worksheet_range(sheet_name)
            .map_err(|e| TaxisError::Extraction(format!("Failed to read sheet: {}", e)))?;
        for row in range.rows() {
            let row_text: Vec<String> = row.iter().map(|c| c.to_string()).collect();
            text.push_str(&row_text.join(" "));
            text.push('\n');
        }
    }

    Ok(text)
}

/// Extract text runs (`w:t`) from a DOCX container
fn extract_docx(path: &Path) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| TaxisError::Extraction(format!("Failed to open DOCX: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| TaxisError::Extraction("No document.xml found".to_string()))?
        .read_to_string(&mut xml)?;

    docx_text(&xml)
}

fn docx_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut text = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"w:t" => in_text = true,
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                let unescaped = t
                    .unescape()
                    .map_err(|e| TaxisError::Extraction(format!("Bad DOCX text: {}", e)))?;
                text.push_str(&unescaped);
                text.push(' ');
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(TaxisError::Extraction(format!(
                    "Malformed document.xml at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(text)
}

/// Extract text from PDF
fn extract_pdf(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    // pdf-extract panics on some malformed inputs
    std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(&bytes))
        .map_err(|_| TaxisError::Extraction("PDF parser panicked".to_string()))?
        .map_err(|e| TaxisError::Extraction(format!("Text extraction failed: {}", e)))
}

/// Extract content based on file type, keeping at most `max_chars` characters
pub fn extract_text(path: &Path, max_chars: usize) -> Result<String> {
    let ext = path
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(extension_of)
        .unwrap_or_default();

    let text = match ext.as_str() {
        "txt" | "md" | "markdown" | "rst" | "adoc" | "asciidoc" | "csv" | "tsv" | "log"
        | "json" | "yaml" | "yml" | "toml" | "xml" | "html" | "htm" => extract_text_file(path)?,
        "xlsx" | "xls" | "xlsm" | "ods" => extract_spreadsheet(path)?,
        "docx" => extract_docx(path)?,
        "pdf" => extract_pdf(path)?,
        _ => return Err(TaxisError::UnsupportedFileType(ext)),
    };

    Ok(match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text,
    })
}
