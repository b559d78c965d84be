// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Feedback event log abstraction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{FeedbackBackend, FeedbackConfig};
use crate::Result;

/// A label the classifier proposed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub filename: String,
    pub category: String,
    pub subcategory: String,
    pub confidence: u8,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
}

/// A user's override of a predicted label. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub filename: String,
    pub original_category: String,
    pub original_subcategory: String,
    pub corrected_category: String,
    pub corrected_subcategory: String,
    pub confidence: u8,
    pub owner: String,
    pub timestamp: DateTime<Utc>,
}

impl CorrectionRecord {
    pub fn original_label(&self) -> String {
        format!("{}/{}", self.original_category, self.original_subcategory)
    }

    pub fn corrected_label(&self) -> String {
        format!("{}/{}", self.corrected_category, self.corrected_subcategory)
    }
}

/// One entry in the append-only log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedbackEvent {
    Prediction(PredictionRecord),
    Correction(CorrectionRecord),
}

impl FeedbackEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedbackEvent::Prediction(_) => "prediction",
            FeedbackEvent::Correction(_) => "correction",
        }
    }
}

/// Persistence strategy for feedback events
pub trait FeedbackLog: Send + Sync {
    /// Backend name for logs and status output
    fn name(&self) -> &'static str;

    /// Durably append one event
    fn append(&self, event: &FeedbackEvent) -> Result<()>;

    /// Every event in append order
    fn load_snapshot(&self) -> Result<Vec<FeedbackEvent>>;

    /// Drop every event
    fn clear(&self) -> Result<()>;
}

/// Open the backend named in the configuration
pub fn open_log(config: &FeedbackConfig) -> Result<Box<dyn FeedbackLog>> {
    Ok(match config.backend {
        FeedbackBackend::Jsonl => Box::new(super::jsonl::JsonlFeedbackLog::new(config.log_path())),
        FeedbackBackend::Sqlite => Box::new(super::sqlite::SqliteFeedbackLog::open(&config.log_path())?),
    })
}
