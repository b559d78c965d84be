// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Taxis: content classification, quota-bounded storage and correction feedback
//!
//! Three services, each constructed once and shared by reference:
//! - [`classify::DocumentClassifier`] and [`classify::classify_structured`]
//!   label content with a category and a confidence score.
//! - [`storage::StorageOrganizer`] files content under
//!   `owner/category/subcategory/` while enforcing a per-owner byte limit.
//! - [`feedback::FeedbackTracker`] turns user corrections into accuracy
//!   statistics and label suggestions.

pub mod classify;
pub mod config;
pub mod error;
pub mod feedback;
pub mod storage;

pub use config::AppConfig;
pub use error::{Result, TaxisError};
