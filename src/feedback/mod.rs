// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Correction-feedback tracker
//!
//! Predictions and user corrections are appended to a [`FeedbackLog`] and
//! folded into an in-memory [`AccuracyModel`]. Writers hold the model's write
//! lock across append and recompute, so the log and the model never diverge
//! and readers never see a half-applied event.
//!
//! Per-category `correct` is estimated as `total - corrections` and is only
//! recomputed when a correction arrives for that category. Until then the
//! category reports `correct == 0`, so a label that was predicted but never
//! corrected shows 0% accuracy and contributes nothing to the global
//! `accuracy_pct`. Predictions alone never move accuracy. Once a category has
//! been corrected at least once, its uncorrected predictions count as
//! correct, which overstates precision when users do not bother to correct.

pub mod jsonl;
pub mod log;
pub mod sqlite;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use tracing::{debug, info, warn};

use crate::classify::extension_of;
use crate::config::FeedbackConfig;
use crate::{Result, TaxisError};
pub use jsonl::JsonlFeedbackLog;
pub use log::{open_log, CorrectionRecord, FeedbackEvent, FeedbackLog, PredictionRecord};
pub use sqlite::SqliteFeedbackLog;

/// Counters for one "Category/Subcategory" label
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCounters {
    pub total: u64,
    pub correct: u64,
    pub corrections: u64,
}

/// Aggregate accuracy derived from the event log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyModel {
    pub total_predictions: u64,
    pub correct_predictions: u64,
    pub accuracy_pct: f64,
    pub per_category: BTreeMap<String, CategoryCounters>,
}

impl AccuracyModel {
    fn record_prediction(&mut self, record: &PredictionRecord) {
        self.total_predictions += 1;
        let label = format!("{}/{}", record.category, record.subcategory);
        self.per_category.entry(label).or_default().total += 1;
    }

    fn record_correction(&mut self, record: &CorrectionRecord) {
        let counters = self.per_category.entry(record.original_label()).or_default();
        counters.corrections += 1;
        counters.correct = counters.total.saturating_sub(counters.corrections);

        self.correct_predictions = self.per_category.values().map(|c| c.correct).sum();
        self.accuracy_pct = percentage(self.correct_predictions, self.total_predictions);
    }
}

fn percentage(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 * 100.0 / total as f64
    }
}

/// Reported statistics for one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    pub label: String,
    pub total: u64,
    pub correct: u64,
    pub corrections: u64,
    pub accuracy_pct: f64,
}

/// Snapshot returned by [`FeedbackTracker::stats`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub total_corrections: u64,
    pub total_predictions: u64,
    pub accuracy_pct: f64,
    /// Sorted by prediction count, highest first
    pub per_category: Vec<CategoryStats>,
    /// Most recent first
    pub recent_corrections: Vec<CorrectionRecord>,
}

#[derive(Default)]
struct TrackerState {
    model: AccuracyModel,
    corrections: Vec<CorrectionRecord>,
}

impl TrackerState {
    fn apply(&mut self, event: FeedbackEvent) {
        match event {
            FeedbackEvent::Prediction(record) => self.model.record_prediction(&record),
            FeedbackEvent::Correction(record) => {
                self.model.record_correction(&record);
                self.corrections.push(record);
            }
        }
    }
}

/// Feedback tracker service
pub struct FeedbackTracker {
    log: Box<dyn FeedbackLog>,
    state: RwLock<TrackerState>,
    recent_limit: usize,
    suggestion_limit: usize,
}

impl FeedbackTracker {
    /// Build a tracker by replaying `log`. An unreadable log starts empty.
    pub fn new(log: Box<dyn FeedbackLog>, config: &FeedbackConfig) -> Self {
        let mut state = TrackerState::default();
        match log.load_snapshot() {
            Ok(events) => {
                let count = events.len();
                for event in events {
                    state.apply(event);
                }
                info!("Replayed {} feedback events from {} log", count, log.name());
            }
            Err(e) => {
                warn!("Feedback log unreadable, starting from empty state: {}", e);
            }
        }

        Self {
            log,
            state: RwLock::new(state),
            recent_limit: config.recent_limit,
            suggestion_limit: config.suggestion_limit,
        }
    }

    /// Open the configured backend and replay it
    pub fn from_config(config: &FeedbackConfig) -> Result<Self> {
        Ok(Self::new(open_log(config)?, config))
    }

    /// Append then fold into the model, all under the write lock
    fn write(&self, event: FeedbackEvent) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| TaxisError::LockPoisoned("feedback state"))?;
        self.log.append(&event)?;
        state.apply(event);
        Ok(())
    }

    /// Count one classifier prediction
    pub fn record_prediction(
        &self,
        filename: &str,
        category: &str,
        subcategory: &str,
        confidence: u8,
        owner: &str,
    ) -> Result<()> {
        debug!("Prediction {}/{} ({}%) for {}", category, subcategory, confidence, filename);
        self.write(FeedbackEvent::Prediction(PredictionRecord {
            filename: filename.to_string(),
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            confidence: confidence.min(100),
            owner: owner.to_string(),
            timestamp: Utc::now(),
        }))
    }

    /// Log a user override of a predicted label
    #[allow(clippy::too_many_arguments)]
    pub fn record_correction(
        &self,
        filename: &str,
        original_category: &str,
        original_subcategory: &str,
        corrected_category: &str,
        corrected_subcategory: &str,
        confidence: u8,
        owner: &str,
    ) -> Result<CorrectionRecord> {
        let record = CorrectionRecord {
            filename: filename.to_string(),
            original_category: original_category.to_string(),
            original_subcategory: original_subcategory.to_string(),
            corrected_category: corrected_category.to_string(),
            corrected_subcategory: corrected_subcategory.to_string(),
            confidence: confidence.min(100),
            owner: owner.to_string(),
            timestamp: Utc::now(),
        };
        self.write(FeedbackEvent::Correction(record.clone()))?;
        info!(
            "Correction for {}: {} -> {}",
            filename,
            record.original_label(),
            record.corrected_label()
        );
        Ok(record)
    }

    /// Current statistics; a poisoned lock yields zeroed stats
    pub fn stats(&self) -> TrainingStats {
        let state = match self.state.read() {
            Ok(state) => state,
            Err(_) => {
                warn!("Feedback state lock poisoned, reporting empty stats");
                return TrainingStats::default();
            }
        };

        let mut per_category: Vec<CategoryStats> = state
            .model
            .per_category
            .iter()
            .map(|(label, c)| CategoryStats {
                label: label.clone(),
                total: c.total,
                correct: c.correct,
                corrections: c.corrections,
                accuracy_pct: percentage(c.correct, c.total),
            })
            .collect();
        per_category.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.label.cmp(&b.label)));

        TrainingStats {
            total_corrections: state.corrections.len() as u64,
            total_predictions: state.model.total_predictions,
            accuracy_pct: state.model.accuracy_pct,
            per_category,
            recent_corrections: state
                .corrections
                .iter()
                .rev()
                .take(self.recent_limit)
                .cloned()
                .collect(),
        }
    }

    /// Copy of the aggregate model
    pub fn model(&self) -> AccuracyModel {
        self.state
            .read()
            .map(|state| state.model.clone())
            .unwrap_or_default()
    }

    /// Accuracy for one "Category/Subcategory" label, if it has been seen
    pub fn accuracy_for(&self, label: &str) -> Option<f64> {
        let state = self.state.read().ok()?;
        state
            .model
            .per_category
            .get(label)
            .map(|c| percentage(c.correct, c.total))
    }

    /// Labels users chose for files sharing this file's extension.
    ///
    /// Ordered by frequency, ties going to the most recently used label.
    pub fn suggestions(&self, filename: &str) -> Vec<String> {
        let Ok(state) = self.state.read() else {
            return Vec::new();
        };
        let ext = extension_of(filename);

        // label -> (count, index of latest occurrence)
        let mut tally: HashMap<String, (usize, usize)> = HashMap::new();
        for (index, record) in state.corrections.iter().enumerate() {
            if extension_of(&record.filename) != ext {
                continue;
            }
            let slot = tally.entry(record.corrected_label()).or_insert((0, index));
            slot.0 += 1;
            slot.1 = index;
        }

        let mut ranked: Vec<(String, (usize, usize))> = tally.into_iter().collect();
        ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then_with(|| b.1 .1.cmp(&a.1 .1)));
        ranked
            .into_iter()
            .take(self.suggestion_limit)
            .map(|(label, _)| label)
            .collect()
    }

    /// Every correction in log order
    pub fn export_all(&self) -> Vec<CorrectionRecord> {
        self.state
            .read()
            .map(|state| state.corrections.clone())
            .unwrap_or_default()
    }

    /// Erase the log and reset every counter
    pub fn clear_all(&self) -> Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|_| TaxisError::LockPoisoned("feedback state"))?;
        self.log.clear()?;
        *state = TrackerState::default();
        warn!("Feedback log cleared");
        Ok(())
    }

    /// Name of the backing log
    pub fn backend(&self) -> &'static str {
        self.log.name()
    }
}
