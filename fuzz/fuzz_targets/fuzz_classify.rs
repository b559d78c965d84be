// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;

use taxis::classify::{classify_structured, DocumentClassifier};

#[derive(Arbitrary, Debug)]
struct Input {
    text: String,
    filename: String,
    json: String,
}

static CLASSIFIER: OnceLock<DocumentClassifier> = OnceLock::new();

fuzz_target!(|input: Input| {
    let classifier = CLASSIFIER.get_or_init(|| DocumentClassifier::new().unwrap());

    let result = classifier.classify(&input.text, &input.filename);
    assert!(result.confidence <= 100);
    assert!(!result.category.is_empty());

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&input.json) {
        let structured = classify_structured(&value);
        assert!(structured.confidence <= 100);
        assert!(structured.reasons[0].starts_with("Score: "));
    }
});
