// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Quota-bounded hierarchical file organizer
//!
//! Layout on disk:
//! ```text
//! <root>/
//! └── <owner>/
//!     └── <category>/
//!         └── <subcategory>/
//!             └── <base>_<timestamp><ext>
//! ```
//!
//! Every owner has one lock guarding its usage ledger. Admission, placement,
//! deletion and listing for that owner run under it; different owners never
//! contend.

pub mod naming;
pub mod quota;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::{StorageConfig, GIB};
use crate::{Result, TaxisError};
use naming::{split_name, timestamped_name, validate_component, STAGING_PREFIX};
pub use quota::{AdmissionDecision, QuotaLedger};

/// Label used when no classification is available
pub const UNCATEGORIZED_CATEGORY: &str = "Uncategorized";
pub const UNCATEGORIZED_SUBCATEGORY: &str = "General";

/// Collision attempts before giving up on a name
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// A stored file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    pub owner: String,
    pub category: String,
    pub subcategory: String,
    pub filename: String,
    pub canonical_path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// A file as it appears in the owner's tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeFile {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

/// category -> subcategory -> files
pub type CategoryTree = BTreeMap<String, BTreeMap<String, Vec<TreeFile>>>;

/// Usage report for one owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    pub total_files: u64,
    pub total_bytes: u64,
    pub used_gb: f64,
    pub limit_gb: f64,
    pub percent_used: f64,
    pub per_category_file_count: BTreeMap<String, u64>,
}

/// Ledger vs. disk comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub recorded_bytes: u64,
    pub actual_bytes: u64,
    /// actual - recorded
    pub drift_bytes: i64,
}

/// Where the bytes of a new file come from
#[derive(Debug, Clone)]
pub enum PlacementSource {
    Bytes(Vec<u8>),
    /// An uploaded temp file; removed once the placement succeeds
    TempFile(PathBuf),
}

impl PlacementSource {
    fn declared_size(&self) -> Result<u64> {
        match self {
            PlacementSource::Bytes(bytes) => Ok(bytes.len() as u64),
            PlacementSource::TempFile(path) => Ok(fs::metadata(path)?.len()),
        }
    }
}

/// Borrowed classification label
#[derive(Debug, Clone, Copy)]
pub struct Label<'a> {
    pub category: &'a str,
    pub subcategory: &'a str,
}

impl<'a> Label<'a> {
    pub fn new(category: &'a str, subcategory: &'a str) -> Self {
        Self { category, subcategory }
    }
}

/// Lazily initialized per-owner ledger
type OwnerSlot = Arc<Mutex<Option<QuotaLedger>>>;

/// Organizer service over one storage root
pub struct StorageOrganizer {
    root: PathBuf,
    limit_bytes: u64,
    owners: Mutex<HashMap<String, OwnerSlot>>,
}

impl StorageOrganizer {
    /// Create an organizer rooted at `root`; the directory is created if missing
    pub fn new(root: impl Into<PathBuf>, limit_bytes: u64) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        info!("Storage root: {:?} (limit {} bytes per owner)", root, limit_bytes);
        Ok(Self {
            root,
            limit_bytes,
            owners: Mutex::new(HashMap::new()),
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new(&config.root, config.limit_bytes)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit_bytes
    }

    fn owner_dir(&self, owner: &str) -> PathBuf {
        self.root.join(owner)
    }

    fn slot(&self, owner: &str) -> Result<OwnerSlot> {
        let mut owners = self
            .owners
            .lock()
            .map_err(|_| TaxisError::LockPoisoned("owner registry"))?;
        Ok(owners.entry(owner.to_string()).or_default().clone())
    }

    /// Run `f` while holding the owner's lock, with the ledger initialized
    fn with_owner<T>(&self, owner: &str, f: impl FnOnce(&mut QuotaLedger, &Path) -> Result<T>) -> Result<T> {
        validate_component("owner", owner)?;
        let slot = self.slot(owner)?;
        let mut guard: MutexGuard<'_, Option<QuotaLedger>> =
            slot.lock().map_err(|_| TaxisError::LockPoisoned("owner ledger"))?;

        let owner_dir = self.owner_dir(owner);
        if guard.is_none() {
            let used: u64 = walk_owner(owner, &owner_dir)?.iter().map(|e| e.size_bytes).sum();
            debug!("Initialized ledger for '{}' at {} bytes", owner, used);
            *guard = Some(QuotaLedger::new(used, self.limit_bytes));
        }
        match guard.as_mut() {
            Some(ledger) => f(ledger, &owner_dir),
            None => Err(TaxisError::LockPoisoned("owner ledger")),
        }
    }

    /// Would `incoming_bytes` fit in the owner's remaining quota
    pub fn check_admission(&self, owner: &str, incoming_bytes: u64) -> Result<AdmissionDecision> {
        self.with_owner(owner, |ledger, _| Ok(ledger.decision(incoming_bytes)))
    }

    /// Current usage in bytes
    pub fn used_bytes(&self, owner: &str) -> Result<u64> {
        self.with_owner(owner, |ledger, _| Ok(ledger.used_bytes()))
    }

    /// Admit and store a file at its canonical path.
    ///
    /// Returns `CapacityExceeded` (with nothing written) when the file does not
    /// fit. Without a label the file goes to `Uncategorized/General`.
    pub fn place(
        &self,
        owner: &str,
        source: PlacementSource,
        original_name: &str,
        label: Option<Label<'_>>,
    ) -> Result<StorageEntry> {
        let label = label.unwrap_or(Label::new(UNCATEGORIZED_CATEGORY, UNCATEGORIZED_SUBCATEGORY));
        validate_component("category", label.category)?;
        validate_component("subcategory", label.subcategory)?;
        let declared = source.declared_size()?;

        let entry = self.with_owner(owner, |ledger, owner_dir| {
            ledger.check(owner, declared)?;

            let dir = owner_dir.join(label.category).join(label.subcategory);
            fs::create_dir_all(&dir)?;

            let staging = dir.join(format!("{}{}", STAGING_PREFIX, uuid::Uuid::new_v4()));
            let result = stage_and_commit(ledger, owner, &source, &staging, &dir, original_name);
            if result.is_err() && staging.exists() {
                if let Err(e) = fs::remove_file(&staging) {
                    warn!("Failed to remove staging file {:?}: {}", staging, e);
                }
            }
            let (final_path, size_bytes) = result?;

            let filename = final_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(StorageEntry {
                owner: owner.to_string(),
                category: label.category.to_string(),
                subcategory: label.subcategory.to_string(),
                filename,
                created_at: created_at(&fs::metadata(&final_path)?),
                canonical_path: final_path,
                size_bytes,
            })
        })?;

        if let PlacementSource::TempFile(path) = &source {
            if let Err(e) = fs::remove_file(path) {
                warn!("Placed {:?} but could not remove source {:?}: {}", entry.canonical_path, path, e);
            }
        }

        info!(
            "Placed {} bytes for '{}' at {:?}",
            entry.size_bytes, owner, entry.canonical_path
        );
        Ok(entry)
    }

    /// Remove one stored file. Returns false when it does not exist.
    pub fn delete(&self, owner: &str, category: &str, subcategory: &str, filename: &str) -> Result<bool> {
        validate_component("category", category)?;
        validate_component("subcategory", subcategory)?;
        validate_component("filename", filename)?;

        self.with_owner(owner, |ledger, owner_dir| {
            let sub_dir = owner_dir.join(category).join(subcategory);
            let path = sub_dir.join(filename);
            let metadata = match fs::metadata(&path) {
                Ok(m) if m.is_file() => m,
                Ok(_) => return Ok(false),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
                Err(e) => return Err(e.into()),
            };

            fs::remove_file(&path)?;
            ledger.release(metadata.len());
            info!("Deleted {:?} ({} bytes) for '{}'", path, metadata.len(), owner);

            // Prune now-empty directories; failure just means they are not empty
            if fs::remove_dir(&sub_dir).is_ok() {
                let _ = fs::remove_dir(owner_dir.join(category));
            }
            Ok(true)
        })
    }

    /// Look up one stored file
    pub fn find(
        &self,
        owner: &str,
        category: &str,
        subcategory: &str,
        filename: &str,
    ) -> Result<Option<StorageEntry>> {
        validate_component("category", category)?;
        validate_component("subcategory", subcategory)?;
        validate_component("filename", filename)?;

        self.with_owner(owner, |_, owner_dir| {
            let path = owner_dir.join(category).join(subcategory).join(filename);
            match fs::metadata(&path) {
                Ok(m) if m.is_file() => Ok(Some(StorageEntry {
                    owner: owner.to_string(),
                    category: category.to_string(),
                    subcategory: subcategory.to_string(),
                    filename: filename.to_string(),
                    canonical_path: path,
                    size_bytes: m.len(),
                    created_at: created_at(&m),
                })),
                Ok(_) => Ok(None),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// All live entries for an owner
    pub fn entries(&self, owner: &str) -> Result<Vec<StorageEntry>> {
        self.with_owner(owner, |_, owner_dir| walk_owner(owner, owner_dir))
    }

    /// The owner's full category tree
    pub fn list_tree(&self, owner: &str) -> Result<CategoryTree> {
        let mut tree = CategoryTree::new();
        for entry in self.entries(owner)? {
            tree.entry(entry.category)
                .or_default()
                .entry(entry.subcategory)
                .or_default()
                .push(TreeFile {
                    name: entry.filename,
                    path: entry.canonical_path,
                    size_bytes: entry.size_bytes,
                    created_at: entry.created_at,
                });
        }
        Ok(tree)
    }

    /// Usage statistics, derived from the same walk as the listing
    pub fn stats(&self, owner: &str) -> Result<UsageStats> {
        let entries = self.entries(owner)?;

        let mut per_category_file_count = BTreeMap::new();
        let mut total_bytes = 0u64;
        for entry in &entries {
            *per_category_file_count.entry(entry.category.clone()).or_insert(0) += 1;
            total_bytes += entry.size_bytes;
        }

        let used_gb = round2(total_bytes as f64 / GIB as f64);
        let limit_gb = round2(self.limit_bytes as f64 / GIB as f64);
        let percent_used = if self.limit_bytes == 0 {
            0.0
        } else {
            round2(total_bytes as f64 / self.limit_bytes as f64 * 100.0)
        };

        Ok(UsageStats {
            total_files: entries.len() as u64,
            total_bytes,
            used_gb,
            limit_gb,
            percent_used,
            per_category_file_count,
        })
    }

    /// Re-measure the owner's usage from disk and correct the ledger
    pub fn reconcile(&self, owner: &str) -> Result<ReconcileReport> {
        self.with_owner(owner, |ledger, owner_dir| {
            let actual: u64 = walk_owner(owner, owner_dir)?.iter().map(|e| e.size_bytes).sum();
            let recorded = ledger.used_bytes();
            let report = ReconcileReport {
                recorded_bytes: recorded,
                actual_bytes: actual,
                drift_bytes: actual as i64 - recorded as i64,
            };
            if report.drift_bytes != 0 {
                warn!(
                    "Usage drift for '{}': ledger {} bytes, disk {} bytes",
                    owner, recorded, actual
                );
                ledger.reset(actual);
            }
            Ok(report)
        })
    }
}

/// Write the staged copy, re-check the quota against the real size, then
/// rename it to a fresh canonical name and commit the bytes
fn stage_and_commit(
    ledger: &mut QuotaLedger,
    owner: &str,
    source: &PlacementSource,
    staging: &Path,
    dir: &Path,
    original_name: &str,
) -> Result<(PathBuf, u64)> {
    let size = match source {
        PlacementSource::Bytes(bytes) => {
            fs::write(staging, bytes)?;
            bytes.len() as u64
        }
        PlacementSource::TempFile(path) => fs::copy(path, staging)?,
    };
    // The temp file may have grown since it was measured
    ledger.check(owner, size)?;

    let (base, ext) = split_name(original_name);
    let now = Utc::now();
    let mut final_path = None;
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let candidate = dir.join(timestamped_name(&base, &ext, now, attempt));
        if !candidate.exists() {
            final_path = Some(candidate);
            break;
        }
    }
    let final_path = final_path.ok_or_else(|| {
        TaxisError::StorageIo(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free name for '{}' in {:?}", original_name, dir),
        ))
    })?;

    fs::rename(staging, &final_path)?;
    ledger.commit(size);
    Ok((final_path, size))
}

fn created_at(metadata: &fs::Metadata) -> DateTime<Utc> {
    metadata
        .created()
        .or_else(|_| metadata.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Walk `<owner>/<category>/<subcategory>/<file>`, skipping staging files.
/// A missing owner directory means no entries.
fn walk_owner(owner: &str, owner_dir: &Path) -> Result<Vec<StorageEntry>> {
    let mut entries = Vec::new();
    if !owner_dir.exists() {
        return Ok(entries);
    }

    for category in fs::read_dir(owner_dir)? {
        let category = category?;
        if !category.file_type()?.is_dir() {
            continue;
        }
        let category_name = category.file_name().to_string_lossy().into_owned();

        for subcategory in fs::read_dir(category.path())? {
            let subcategory = subcategory?;
            if !subcategory.file_type()?.is_dir() {
                continue;
            }
            let subcategory_name = subcategory.file_name().to_string_lossy().into_owned();

            for file in fs::read_dir(subcategory.path())? {
                let file = file?;
                let filename = file.file_name().to_string_lossy().into_owned();
                if filename.starts_with(STAGING_PREFIX) || !file.file_type()?.is_file() {
                    continue;
                }
                let metadata = file.metadata()?;
                entries.push(StorageEntry {
                    owner: owner.to_string(),
                    category: category_name.clone(),
                    subcategory: subcategory_name.clone(),
                    filename,
                    canonical_path: file.path(),
                    size_bytes: metadata.len(),
                    created_at: created_at(&metadata),
                });
            }
        }
    }

    entries.sort_by(|a, b| a.canonical_path.cmp(&b.canonical_path));
    Ok(entries)
}
