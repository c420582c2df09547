//! Solverboard Library
//!
//! Normalizes solver logs and leaderboard pages into one record shape and
//! computes comparative analytics over them.

pub mod analytics;
pub mod config;
pub mod ingest;
pub mod models;
pub mod report;
pub mod store;

pub use config::AppConfig;
pub use ingest::{ingest_files, ingest_paths, Diagnostic, FileReport, ParseOutcome, SourceFile, SourceKind};
pub use models::{CanonicalRecord, ParsedInstanceName, RecordId, SourceType};
pub use report::AnalyticsReport;
pub use store::{RecordStore, StoreSnapshot};
