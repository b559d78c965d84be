// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! End-to-end behavior across classifier, organizer and feedback tracker

use serde_json::{json, Value};
use tempfile::TempDir;

use taxis::classify::{ClassificationSource, DocumentClassifier, StorageParadigm, classify_structured};
use taxis::config::{FeedbackBackend, FeedbackConfig, GIB};
use taxis::feedback::FeedbackTracker;
use taxis::storage::{Label, PlacementSource, QuotaLedger, StorageOrganizer};

#[test]
fn invoice_heavy_text_is_financial() {
    let mut words = vec!["invoice"; 30];
    words.extend(vec!["payment"; 20]);
    words.extend(vec!["the"; 450]);
    let text = words.join(" ");

    let result = DocumentClassifier::new().unwrap().classify(&text, "march.pdf");
    assert_eq!(result.category, "Documents");
    assert_eq!(result.subcategory, "Financial");
    assert!(result.confidence >= 30);
    assert_eq!(result.source, ClassificationSource::KeywordMatch);
}

#[test]
fn classification_is_deterministic() {
    let classifier = DocumentClassifier::new().unwrap();
    let text = "Patient diagnosis and treatment plan from the clinic";
    let first = classifier.classify(text, "visit.txt");
    for _ in 0..10 {
        assert_eq!(classifier.classify(text, "visit.txt"), first);
    }
}

#[test]
fn uniform_records_recommend_relational() {
    let records: Vec<Value> = (0..100)
        .map(|i| json!({"sku": format!("S{}", i), "price": i, "stock": 3, "active": true}))
        .collect();
    let result = classify_structured(&Value::Array(records));

    assert_eq!(result.recommendation, StorageParadigm::Relational);
    assert_eq!(result.metrics.consistency, 1.0);
    assert!(!result.metrics.has_nested_objects);
    // consistency +3, flat +2 against few fields +1
    assert_eq!(result.confidence, 83);
    assert!(result.reasons[0].starts_with("Score: relational=5, document=1"));
}

#[test]
fn second_upload_over_quota_is_rejected() {
    // Byte-for-byte version of the 60 GiB + 50 GiB against 100 GiB case
    let mut ledger = QuotaLedger::new(0, 100 * GIB);
    ledger.check("alice", 60 * GIB).unwrap();
    ledger.commit(60 * GIB);
    assert!(ledger.check("alice", 50 * GIB).unwrap_err().is_capacity_exceeded());
    assert_eq!(ledger.used_bytes(), 60 * GIB);

    // Same shape on disk with a scaled-down limit
    let dir = TempDir::new().unwrap();
    let organizer = StorageOrganizer::new(dir.path().join("store"), 100).unwrap();
    organizer.place("alice", PlacementSource::Bytes(vec![1; 60]), "big.iso", None).unwrap();

    let err = organizer
        .place("alice", PlacementSource::Bytes(vec![2; 50]), "bigger.iso", None)
        .unwrap_err();
    assert!(err.is_capacity_exceeded());

    let decision = organizer.check_admission("alice", 0).unwrap();
    assert_eq!(decision.used_bytes, 60);
    assert_eq!(decision.limit_bytes, 100);
    assert_eq!(organizer.stats("alice").unwrap().total_files, 1);
}

#[test]
fn legal_accuracy_drops_to_ninety_percent() {
    let dir = TempDir::new().unwrap();
    let config = FeedbackConfig {
        backend: FeedbackBackend::Sqlite,
        path: Some(dir.path().join("feedback.db")),
        ..FeedbackConfig::default()
    };
    let tracker = FeedbackTracker::from_config(&config).unwrap();

    for i in 0..100 {
        tracker
            .record_prediction(&format!("contract{}.pdf", i), "Documents", "Legal", 65, "alice")
            .unwrap();
    }
    for i in 0..10 {
        tracker
            .record_correction(&format!("contract{}.pdf", i), "Documents", "Legal", "Work", "Projects", 65, "alice")
            .unwrap();
    }

    let stats = tracker.stats();
    let legal = stats
        .per_category
        .iter()
        .find(|c| c.label == "Documents/Legal")
        .unwrap();
    assert_eq!(legal.accuracy_pct, 90.0);
    assert_eq!(tracker.suggestions("another.pdf"), vec!["Work/Projects"]);
}

#[test]
fn same_named_uploads_both_persist() {
    let dir = TempDir::new().unwrap();
    let organizer = StorageOrganizer::new(dir.path().join("store"), GIB).unwrap();
    let label = Some(Label::new("Media", "Images"));

    let first = organizer
        .place("alice", PlacementSource::Bytes(b"first".to_vec()), "photo.jpg", label)
        .unwrap();
    let second = organizer
        .place("alice", PlacementSource::Bytes(b"second".to_vec()), "photo.jpg", label)
        .unwrap();

    assert_ne!(first.filename, second.filename);
    assert_eq!(std::fs::read(&first.canonical_path).unwrap(), b"first");
    assert_eq!(std::fs::read(&second.canonical_path).unwrap(), b"second");

    let tree = organizer.list_tree("alice").unwrap();
    assert_eq!(tree["Media"]["Images"].len(), 2);
}

#[test]
fn classify_then_place_then_correct() {
    let dir = TempDir::new().unwrap();
    let organizer = StorageOrganizer::new(dir.path().join("store"), GIB).unwrap();
    let tracker = FeedbackTracker::from_config(&FeedbackConfig {
        path: Some(dir.path().join("feedback.jsonl")),
        ..FeedbackConfig::default()
    })
    .unwrap();
    let classifier = DocumentClassifier::new().unwrap();

    let text = "Sprint roadmap: milestone review meeting with every stakeholder";
    let result = classifier.classify(text, "plan.md");
    assert_eq!(result.label(), "Work/Projects");

    let entry = organizer
        .place(
            "carol",
            PlacementSource::Bytes(text.as_bytes().to_vec()),
            "plan.md",
            Some(Label::new(&result.category, &result.subcategory)),
        )
        .unwrap();
    tracker
        .record_prediction(&entry.filename, &result.category, &result.subcategory, result.confidence, "carol")
        .unwrap();
    tracker
        .record_correction(&entry.filename, "Work", "Projects", "Work", "Reports", result.confidence, "carol")
        .unwrap();

    let stats = organizer.stats("carol").unwrap();
    assert_eq!(stats.per_category_file_count["Work"], 1);
    assert_eq!(stats.total_bytes, text.len() as u64);
    assert_eq!(tracker.stats().total_corrections, 1);
    assert_eq!(tracker.suggestions("next.md"), vec!["Work/Reports"]);
}

#[test]
fn quota_holds_across_mixed_operations() {
    let dir = TempDir::new().unwrap();
    let organizer = StorageOrganizer::new(dir.path().join("store"), 1000).unwrap();
    let sizes = [300usize, 400, 500, 200, 100, 700, 50];
    let mut placed = Vec::new();

    for (i, size) in sizes.iter().enumerate() {
        if let Ok(entry) = organizer.place("dave", PlacementSource::Bytes(vec![0; *size]), "blob.bin", None) {
            placed.push(entry);
        }
        assert!(organizer.used_bytes("dave").unwrap() <= 1000);

        if i % 3 == 2 {
            if let Some(entry) = placed.pop() {
                assert!(organizer
                    .delete("dave", &entry.category, &entry.subcategory, &entry.filename)
                    .unwrap());
            }
        }
        let stats = organizer.stats("dave").unwrap();
        assert_eq!(stats.total_bytes, organizer.used_bytes("dave").unwrap());
        assert!(stats.total_bytes <= 1000);
    }
}
