// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Taxis command-line front end
//!
//! Wires the classifier, storage organizer and feedback tracker together for
//! local use and scripting.

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use taxis::classify::{classify_file, classify_structured, DocumentClassifier};
use taxis::config::AppConfig;
use taxis::feedback::FeedbackTracker;
use taxis::storage::{Label, PlacementSource, StorageOrganizer};
use taxis::{Result, TaxisError};

/// Taxis CLI - classify, file and track corrections
#[derive(Parser, Debug)]
#[command(name = "taxis")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Content classifier and quota-bounded file organizer", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file (JSON format)
    #[arg(short, long, default_value = "taxis.json", global = true)]
    config: PathBuf,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable trace logging (most verbose)
    #[arg(long, global = true)]
    trace: bool,

    /// Suppress non-essential output (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format for results
    #[arg(long, global = true, default_value = "text", value_parser = ["text", "json"])]
    format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify a document by its content
    Classify {
        /// File to classify
        path: PathBuf,
    },

    /// Recommend a storage layout for a JSON file
    ClassifyJson {
        /// JSON file to inspect
        path: PathBuf,
    },

    /// Storage operations
    Store {
        #[command(subcommand)]
        action: StoreCommands,
    },

    /// Correction feedback operations
    Feedback {
        #[command(subcommand)]
        action: FeedbackCommands,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum StoreCommands {
    /// Store a file for an owner
    Place {
        owner: String,
        file: PathBuf,

        #[arg(long, requires = "subcategory", conflicts_with = "auto")]
        category: Option<String>,

        #[arg(long, requires = "category")]
        subcategory: Option<String>,

        /// Classify the file and record the prediction
        #[arg(long)]
        auto: bool,

        /// Move the file instead of copying it
        #[arg(long = "move")]
        move_file: bool,
    },

    /// Delete a stored file
    Delete {
        owner: String,
        category: String,
        subcategory: String,
        filename: String,
    },

    /// Show the owner's category tree
    List { owner: String },

    /// Show usage statistics
    Stats { owner: String },

    /// Check whether more bytes would fit
    Check { owner: String, bytes: u64 },

    /// Re-measure usage from disk
    Reconcile { owner: String },
}

#[derive(Subcommand, Debug)]
enum FeedbackCommands {
    /// Record a classifier prediction
    Predict {
        filename: String,
        category: String,
        subcategory: String,
        #[arg(long, default_value = "50")]
        confidence: u8,
        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// Record a user correction
    Correct {
        filename: String,
        from_category: String,
        from_subcategory: String,
        to_category: String,
        to_subcategory: String,
        #[arg(long, default_value = "50")]
        confidence: u8,
        #[arg(long, default_value = "local")]
        owner: String,
    },

    /// Show accuracy statistics
    Stats,

    /// Suggest labels for a filename
    Suggest { filename: String },

    /// Export every correction as JSON
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Erase all feedback
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Generate default configuration file
    Generate {
        #[arg(short, long, default_value = "taxis.json")]
        output: PathBuf,
    },

    /// Validate configuration file
    Validate,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = AppConfig::load(&cli.config)?;
    let json = cli.format == "json";

    match cli.command {
        Commands::Classify { path } => run_classify(&config, &path, json),
        Commands::ClassifyJson { path } => run_classify_json(&path, json),
        Commands::Store { action } => run_store_command(&config, action, json),
        Commands::Feedback { action } => run_feedback_command(&config, action, json),
        Commands::Config { action } => run_config_command(config, action, &cli.config),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_classify(config: &AppConfig, path: &Path, json: bool) -> Result<()> {
    let classifier = DocumentClassifier::from_config(&config.classifier)?;
    let result = classify_file(&classifier, path, config.classifier.max_extract_chars);

    if json {
        return print_json(&result);
    }
    println!("{}: {} ({}%)", path.display(), result.label(), result.confidence);
    if !result.keywords.is_empty() {
        println!("  Keywords: {}", result.keywords.join(", "));
    }
    Ok(())
}

fn run_classify_json(path: &Path, json: bool) -> Result<()> {
    let content = std::fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let result = classify_structured(&value);

    if json {
        return print_json(&result);
    }
    println!("Recommendation: {:?} ({}%)", result.recommendation, result.confidence);
    for reason in &result.reasons {
        println!("  - {}", reason);
    }
    Ok(())
}

fn run_store_command(config: &AppConfig, action: StoreCommands, json: bool) -> Result<()> {
    let organizer = StorageOrganizer::from_config(&config.storage)?;

    match action {
        StoreCommands::Place { owner, file, category, subcategory, auto, move_file } => {
            let original_name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| TaxisError::InvalidLabel(format!("{:?} has no file name", file)))?;

            let predicted = if auto {
                let classifier = DocumentClassifier::from_config(&config.classifier)?;
                let result = classify_file(&classifier, &file, config.classifier.max_extract_chars);
                info!("Classified {} as {} ({}%)", original_name, result.label(), result.confidence);
                Some(result)
            } else {
                None
            };

            let label = match (&predicted, &category, &subcategory) {
                (Some(result), _, _) => Some(Label::new(&result.category, &result.subcategory)),
                (None, Some(c), Some(s)) => Some(Label::new(c, s)),
                _ => None,
            };

            let source = if move_file {
                PlacementSource::TempFile(file.clone())
            } else {
                PlacementSource::Bytes(std::fs::read(&file)?)
            };

            let entry = organizer.place(&owner, source, &original_name, label)?;

            if let Some(result) = &predicted {
                let tracker = FeedbackTracker::from_config(&config.feedback)?;
                if let Err(e) = tracker.record_prediction(
                    &entry.filename,
                    &result.category,
                    &result.subcategory,
                    result.confidence,
                    &owner,
                ) {
                    warn!("Stored file but failed to record prediction: {}", e);
                }
            }

            if json {
                return print_json(&entry);
            }
            println!("Stored {} ({} bytes)", entry.canonical_path.display(), entry.size_bytes);
        }
        StoreCommands::Delete { owner, category, subcategory, filename } => {
            let deleted = organizer.delete(&owner, &category, &subcategory, &filename)?;
            if json {
                return print_json(&serde_json::json!({ "deleted": deleted }));
            }
            if deleted {
                println!("Deleted {}/{}/{}", category, subcategory, filename);
            } else {
                println!("No such file: {}/{}/{}", category, subcategory, filename);
            }
        }
        StoreCommands::List { owner } => {
            let tree = organizer.list_tree(&owner)?;
            if json {
                return print_json(&tree);
            }
            for (category, subcategories) in &tree {
                println!("{}/", category);
                for (subcategory, files) in subcategories {
                    println!("  {}/", subcategory);
                    for file in files {
                        println!(
                            "    {} ({} bytes, {})",
                            file.name,
                            file.size_bytes,
                            file.created_at.format("%Y-%m-%d %H:%M")
                        );
                    }
                }
            }
        }
        StoreCommands::Stats { owner } => {
            let stats = organizer.stats(&owner)?;
            if json {
                return print_json(&stats);
            }
            println!("Storage for '{}':", owner);
            println!("  Files: {}", stats.total_files);
            println!("  Used: {:.2} GB of {:.2} GB ({:.2}%)", stats.used_gb, stats.limit_gb, stats.percent_used);
            for (category, count) in &stats.per_category_file_count {
                println!("  {}: {} files", category, count);
            }
        }
        StoreCommands::Check { owner, bytes } => {
            let decision = organizer.check_admission(&owner, bytes)?;
            if json {
                return print_json(&decision);
            }
            println!(
                "{}: {} used of {} bytes",
                if decision.allowed { "Allowed" } else { "Rejected" },
                decision.used_bytes,
                decision.limit_bytes
            );
        }
        StoreCommands::Reconcile { owner } => {
            let report = organizer.reconcile(&owner)?;
            if json {
                return print_json(&report);
            }
            println!(
                "Ledger {} bytes, disk {} bytes, drift {}",
                report.recorded_bytes, report.actual_bytes, report.drift_bytes
            );
        }
    }

    Ok(())
}

fn run_feedback_command(config: &AppConfig, action: FeedbackCommands, json: bool) -> Result<()> {
    let tracker = FeedbackTracker::from_config(&config.feedback)?;

    match action {
        FeedbackCommands::Predict { filename, category, subcategory, confidence, owner } => {
            tracker.record_prediction(&filename, &category, &subcategory, confidence, &owner)?;
            println!("Recorded prediction {}/{} for {}", category, subcategory, filename);
        }
        FeedbackCommands::Correct {
            filename,
            from_category,
            from_subcategory,
            to_category,
            to_subcategory,
            confidence,
            owner,
        } => {
            let record = tracker.record_correction(
                &filename,
                &from_category,
                &from_subcategory,
                &to_category,
                &to_subcategory,
                confidence,
                &owner,
            )?;
            if json {
                return print_json(&record);
            }
            println!("Recorded correction {} -> {}", record.original_label(), record.corrected_label());
        }
        FeedbackCommands::Stats => {
            let stats = tracker.stats();
            if json {
                return print_json(&stats);
            }
            println!("Feedback ({} backend):", tracker.backend());
            println!("  Predictions: {}", stats.total_predictions);
            println!("  Corrections: {}", stats.total_corrections);
            println!("  Accuracy: {:.1}%", stats.accuracy_pct);
            for category in &stats.per_category {
                println!(
                    "  {} - {} predicted, {} corrected ({:.1}%)",
                    category.label, category.total, category.corrections, category.accuracy_pct
                );
            }
            for record in &stats.recent_corrections {
                println!(
                    "  {} {}: {} -> {}",
                    record.timestamp.format("%Y-%m-%d %H:%M"),
                    record.filename,
                    record.original_label(),
                    record.corrected_label()
                );
            }
        }
        FeedbackCommands::Suggest { filename } => {
            let suggestions = tracker.suggestions(&filename);
            if json {
                return print_json(&suggestions);
            }
            if suggestions.is_empty() {
                println!("No suggestions for {}", filename);
            }
            for label in suggestions {
                println!("{}", label);
            }
        }
        FeedbackCommands::Export { output } => {
            let records = tracker.export_all();
            let content = serde_json::to_string_pretty(&records)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, content)?;
                    println!("Exported {} corrections to {:?}", records.len(), path);
                }
                None => println!("{}", content),
            }
        }
        FeedbackCommands::Clear { force } => {
            if !force {
                eprintln!("Use --force to confirm clearing feedback");
                return Ok(());
            }
            tracker.clear_all()?;
            println!("Feedback cleared");
        }
    }

    Ok(())
}

fn run_config_command(config: AppConfig, action: ConfigCommands, config_path: &Path) -> Result<()> {
    match action {
        ConfigCommands::Show => print_json(&config)?,
        ConfigCommands::Generate { output } => {
            AppConfig::default().save(&output)?;
            println!("Generated config at {:?}", output);
        }
        ConfigCommands::Validate => {
            config.validate()?;
            println!("Configuration at {:?} is valid", config_path);
            println!("  Storage root: {:?}", config.storage.root);
            println!("  Limit: {} bytes", config.storage.limit_bytes);
            println!("  Feedback: {:?} at {:?}", config.feedback.backend, config.feedback.log_path());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_classify_command() {
        let cli = Cli::try_parse_from(["taxis", "classify", "/tmp/file.pdf"]).unwrap();
        assert!(!cli.verbose);
        match cli.command {
            Commands::Classify { path } => assert_eq!(path, PathBuf::from("/tmp/file.pdf")),
            _ => panic!("Expected Classify command"),
        }
    }

    #[test]
    fn test_cli_place_with_label() {
        let cli = Cli::try_parse_from([
            "taxis", "store", "place", "alice", "a.pdf", "--category", "Documents", "--subcategory", "Legal",
        ])
        .unwrap();

        match cli.command {
            Commands::Store { action: StoreCommands::Place { owner, category, subcategory, auto, .. } } => {
                assert_eq!(owner, "alice");
                assert_eq!(category.as_deref(), Some("Documents"));
                assert_eq!(subcategory.as_deref(), Some("Legal"));
                assert!(!auto);
            }
            _ => panic!("Expected Store Place command"),
        }
    }

    #[test]
    fn test_cli_place_category_requires_subcategory() {
        assert!(Cli::try_parse_from(["taxis", "store", "place", "alice", "a.pdf", "--category", "Documents"]).is_err());
        assert!(Cli::try_parse_from([
            "taxis", "store", "place", "alice", "a.pdf", "--auto", "--category", "A", "--subcategory", "B",
        ])
        .is_err());
    }

    #[test]
    fn test_cli_feedback_correct() {
        let cli = Cli::try_parse_from([
            "taxis", "--format", "json", "feedback", "correct", "a.pdf", "Documents", "Legal", "Documents", "Financial",
        ])
        .unwrap();
        assert_eq!(cli.format, "json");
        match cli.command {
            Commands::Feedback { action: FeedbackCommands::Correct { to_subcategory, confidence, owner, .. } } => {
                assert_eq!(to_subcategory, "Financial");
                assert_eq!(confidence, 50);
                assert_eq!(owner, "local");
            }
            _ => panic!("Expected Feedback Correct command"),
        }
    }
}
