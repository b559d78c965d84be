// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Keyword-frequency document classifier

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{
    infer_from_extension, ClassificationResult, ClassificationSource, OTHER_CATEGORY,
    OTHER_SUBCATEGORY,
};
use crate::config::ClassifierConfig;
use crate::{Result, TaxisError};

/// One taxonomy node with its keywords, in tie-break order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub category: String,
    pub subcategory: String,
    pub keywords: Vec<String>,
}

impl TaxonomyEntry {
    fn new(category: &str, subcategory: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            subcategory: subcategory.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Built-in taxonomy. Order matters: earlier entries win ties.
pub fn default_taxonomy() -> Vec<TaxonomyEntry> {
    vec![
        TaxonomyEntry::new("Documents", "Financial", &[
            "invoice", "receipt", "payment", "bank", "statement", "tax", "budget",
            "expense", "salary", "transaction", "bill",
        ]),
        TaxonomyEntry::new("Documents", "Legal", &[
            "contract", "agreement", "legal", "law", "court", "attorney", "clause",
            "liability", "plaintiff", "defendant",
        ]),
        TaxonomyEntry::new("Documents", "Medical", &[
            "patient", "diagnosis", "prescription", "medical", "doctor", "hospital",
            "treatment", "symptom", "clinic",
        ]),
        TaxonomyEntry::new("Documents", "Academic", &[
            "research", "thesis", "abstract", "university", "study", "lecture",
            "experiment", "hypothesis", "citation",
        ]),
        TaxonomyEntry::new("Documents", "Personal", &[
            "resume", "cv", "letter", "diary", "journal", "personal", "family",
        ]),
        TaxonomyEntry::new("Work", "Projects", &[
            "project", "milestone", "deadline", "meeting", "roadmap", "deliverable",
            "sprint", "stakeholder",
        ]),
        TaxonomyEntry::new("Work", "Reports", &[
            "report", "analysis", "quarterly", "summary", "metrics", "performance", "kpi",
        ]),
        TaxonomyEntry::new("Technical", "Code", &[
            "function", "class", "import", "variable", "compile", "algorithm", "struct",
        ]),
        TaxonomyEntry::new("Technical", "Documentation", &[
            "documentation", "manual", "guide", "tutorial", "installation",
            "configuration", "readme", "api",
        ]),
    ]
}

/// Case-insensitive whole-token pattern. A word character at either edge
/// needs `\b`; a symbol edge needs `\B` so it is not glued to a word.
fn keyword_pattern(keyword: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let edge = |c: Option<char>| if c.is_some_and(is_word) { r"\b" } else { r"\B" };
    format!(
        "(?i){}{}{}",
        edge(keyword.chars().next()),
        regex::escape(keyword),
        edge(keyword.chars().last())
    )
}

/// A taxonomy entry with its keyword matchers compiled
struct CategoryMatcher {
    category: String,
    subcategory: String,
    keywords: Vec<(String, Regex)>,
}

impl CategoryMatcher {
    fn compile(entry: TaxonomyEntry) -> Result<Self> {
        let keywords = entry
            .keywords
            .into_iter()
            .filter(|k| !k.trim().is_empty())
            .map(|k| {
                let pattern = keyword_pattern(k.trim());
                Regex::new(&pattern)
                    .map(|re| (k, re))
                    .map_err(|e| TaxisError::Config(format!("Bad keyword pattern: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            category: entry.category,
            subcategory: entry.subcategory,
            keywords,
        })
    }

    /// Total occurrences plus the keywords that matched at least once
    fn score(&self, text: &str) -> (usize, Vec<String>) {
        let mut score = 0;
        let mut matched = Vec::new();
        for (keyword, re) in &self.keywords {
            let count = re.find_iter(text).count();
            if count > 0 {
                score += count;
                matched.push(keyword.clone());
            }
        }
        (score, matched)
    }
}

/// Stateless document classifier over a precompiled taxonomy
pub struct DocumentClassifier {
    matchers: Vec<CategoryMatcher>,
    min_confidence: u8,
    extension_confidence: u8,
}

impl DocumentClassifier {
    /// Classifier over the built-in taxonomy with default confidence settings
    pub fn new() -> Result<Self> {
        Self::from_config(&ClassifierConfig::default())
    }

    /// Built-in taxonomy extended with the configured extra keywords
    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        let mut taxonomy = default_taxonomy();
        for (label, extra) in &config.extra_keywords {
            let (category, subcategory) = label
                .split_once('/')
                .ok_or_else(|| TaxisError::Config(format!("Bad taxonomy label: {}", label)))?;
            match taxonomy
                .iter_mut()
                .find(|e| e.category == category && e.subcategory == subcategory)
            {
                Some(entry) => entry.keywords.extend(extra.iter().cloned()),
                None => taxonomy.push(TaxonomyEntry {
                    category: category.to_string(),
                    subcategory: subcategory.to_string(),
                    keywords: extra.clone(),
                }),
            }
        }
        Self::with_taxonomy(taxonomy, config.min_confidence, config.extension_confidence)
    }

    /// Classifier over an explicit taxonomy
    pub fn with_taxonomy(
        taxonomy: Vec<TaxonomyEntry>,
        min_confidence: u8,
        extension_confidence: u8,
    ) -> Result<Self> {
        let matchers = taxonomy
            .into_iter()
            .map(CategoryMatcher::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            matchers,
            min_confidence: min_confidence.min(100),
            extension_confidence: extension_confidence.min(100),
        })
    }

    /// Number of taxonomy entries
    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Classify extracted text; `filename` drives the fallback path
    pub fn classify(&self, text: &str, filename: &str) -> ClassificationResult {
        let total_words = text.split_whitespace().count();

        let mut best: Option<(&CategoryMatcher, usize, Vec<String>)> = None;
        if total_words > 0 {
            for matcher in &self.matchers {
                let (score, matched) = matcher.score(text);
                debug!("{}/{} scored {}", matcher.category, matcher.subcategory, score);
                // Strictly greater keeps the earliest entry on ties
                if score > best.as_ref().map_or(0, |(_, s, _)| *s) {
                    best = Some((matcher, score, matched));
                }
            }
        }

        match best {
            Some((matcher, score, keywords)) => ClassificationResult {
                category: matcher.category.clone(),
                subcategory: matcher.subcategory.clone(),
                confidence: self.keyword_confidence(score, total_words),
                keywords,
                source: ClassificationSource::KeywordMatch,
            },
            None => self.fallback(filename),
        }
    }

    fn keyword_confidence(&self, score: usize, total_words: usize) -> u8 {
        let raw = (score as f64 / total_words as f64 * 100.0 * 10.0).round();
        let capped = raw.min(100.0) as u8;
        capped.max(self.min_confidence)
    }

    fn fallback(&self, filename: &str) -> ClassificationResult {
        match infer_from_extension(filename) {
            Some((category, subcategory)) => ClassificationResult {
                category: category.to_string(),
                subcategory: subcategory.to_string(),
                confidence: self.extension_confidence,
                keywords: Vec::new(),
                source: ClassificationSource::Extension,
            },
            None => ClassificationResult {
                category: OTHER_CATEGORY.to_string(),
                subcategory: OTHER_SUBCATEGORY.to_string(),
                confidence: 100,
                keywords: Vec::new(),
                source: ClassificationSource::Sentinel,
            },
        }
    }
}
