// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Path-component validation and canonical file naming

use chrono::{DateTime, Utc};
use std::path::Path;

use crate::{Result, TaxisError};

/// Prefix of in-flight files; never listed or counted
pub const STAGING_PREFIX: &str = ".staging-";

/// Reject anything that could escape its directory level
pub fn validate_component<'a>(kind: &str, value: &'a str) -> Result<&'a str> {
    let invalid = value.is_empty()
        || value == "."
        || value == ".."
        || value.starts_with(STAGING_PREFIX)
        || value.contains(['/', '\\', '\0']);
    if invalid {
        return Err(TaxisError::InvalidLabel(format!("{} '{}'", kind, value)));
    }
    Ok(value)
}

/// Split an uploaded name into a sanitized base and an extension with its dot.
///
/// Directory parts of the original name are discarded.
pub fn split_name(original: &str) -> (String, String) {
    let file_name = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let path = Path::new(file_name);

    let base = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(sanitize_base)
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| "file".to_string());

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.chars().filter(|c| c.is_ascii_alphanumeric()).collect::<String>())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    (base, ext)
}

/// Keep alphanumerics, underscore, hyphen and dot; spaces become underscores
fn sanitize_base(raw: &str) -> String {
    let mut clean: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
        .collect::<String>()
        .replace(' ', "_");

    while clean.contains("__") {
        clean = clean.replace("__", "_");
    }

    clean.trim_matches(|c| c == '_' || c == '.').to_string()
}

/// `<base>_<timestamp><ext>`, with `-<attempt>` appended to the timestamp
/// when an earlier attempt collided
pub fn timestamped_name(base: &str, ext: &str, at: DateTime<Utc>, attempt: u32) -> String {
    let stamp = at.format("%Y%m%dT%H%M%S%3f");
    if attempt == 0 {
        format!("{}_{}{}", base, stamp, ext)
    } else {
        format!("{}_{}-{}{}", base, stamp, attempt, ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_validate_component() {
        assert!(validate_component("category", "Documents").is_ok());
        assert!(validate_component("category", "Work Reports").is_ok());
        for bad in ["", ".", "..", "a/b", "a\\b", "nul\0", ".staging-x"] {
            assert!(validate_component("category", bad).is_err(), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("photo.jpg"), ("photo".to_string(), ".jpg".to_string()));
        assert_eq!(split_name("My Tax  Return.PDF"), ("My_Tax_Return".to_string(), ".PDF".to_string()));
        assert_eq!(split_name("../../etc/passwd"), ("passwd".to_string(), String::new()));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar".to_string(), ".gz".to_string()));
        assert_eq!(split_name("???.txt"), ("file".to_string(), ".txt".to_string()));
        assert_eq!(split_name(""), ("file".to_string(), String::new()));
    }

    #[test]
    fn test_timestamped_name() {
        let at = Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).unwrap();
        assert_eq!(timestamped_name("photo", ".jpg", at, 0), "photo_20250314T150926000.jpg");
        assert_eq!(timestamped_name("photo", ".jpg", at, 2), "photo_20250314T150926000-2.jpg");
    }
}
