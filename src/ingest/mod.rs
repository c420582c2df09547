//! Source Ingestion
//!
//! Routes uploaded files to the matching format parser and runs one parse
//! task per file. Parsers never fail: problems are reported as
//! [`Diagnostic`]s next to whatever records could be recovered.
//!
//! ```text
//!   files ──▶ SourceKind::detect ──┬──▶ log_format::parse ─────┐
//!                                  └──▶ leaderboard::parse ────┤
//!                                     (instance_name::parse)   ▼
//!                                                   Vec<FileReport> ──▶ RecordStore::commit_batch
//! ```

pub mod instance_name;
pub mod leaderboard;
pub mod log_format;

use crate::config::IngestConfig;
use crate::models::{CanonicalRecord, SourceType};
use anyhow::{Context, Result};
use futures_util::future::join_all;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Format of an uploaded file, decided from its name alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Log,
    Leaderboard,
}

impl SourceKind {
    /// `.log` → log parser, `.html`/`.htm` → leaderboard parser. Case-insensitive.
    pub fn detect(file_name: &str) -> Option<Self> {
        let lower = file_name.to_ascii_lowercase();
        if lower.ends_with(".log") {
            Some(SourceKind::Log)
        } else if lower.ends_with(".html") || lower.ends_with(".htm") {
            Some(SourceKind::Leaderboard)
        } else {
            None
        }
    }

    pub fn source_type(&self) -> SourceType {
        match self {
            SourceKind::Log => SourceType::Log,
            SourceKind::Leaderboard => SourceType::Leaderboard,
        }
    }
}

/// A non-fatal problem found while parsing one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A log line that could not be decoded (1-based line number).
    MalformedLine { line: usize, reason: String },
    /// A leaderboard cell whose text matched no known shape.
    UnrecognizedCell {
        owner: String,
        column: String,
        text: String,
    },
    /// A leaderboard row that is not a JSON object (1-based row number).
    MalformedRow { row: usize, reason: String },
    /// A leaderboard column without a usable name (1-based position).
    MalformedColumn { position: usize, reason: String },
    /// No element carrying the leaderboard payload.
    MissingCarrier,
    /// The embedded payload is not the expected JSON document.
    MalformedPayload { reason: String },
    /// The file name maps to no supported format.
    UnsupportedExtension { file_name: String },
    /// The file could not be read as text.
    Unreadable { reason: String },
}

impl Diagnostic {
    /// Structural problems mean the whole source yielded nothing usable.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Diagnostic::MissingCarrier
                | Diagnostic::MalformedPayload { .. }
                | Diagnostic::UnsupportedExtension { .. }
                | Diagnostic::Unreadable { .. }
        )
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MalformedLine { line, reason } => {
                write!(f, "line {}: {}", line, reason)
            }
            Diagnostic::UnrecognizedCell {
                owner,
                column,
                text,
            } => write!(f, "unrecognized cell {:?} for {} / {}", text, owner, column),
            Diagnostic::MalformedRow { row, reason } => write!(f, "row {}: {}", row, reason),
            Diagnostic::MalformedColumn { position, reason } => {
                write!(f, "column {}: {}", position, reason)
            }
            Diagnostic::MissingCarrier => f.write_str("no leaderboard data found in document"),
            Diagnostic::MalformedPayload { reason } => {
                write!(f, "leaderboard payload is not valid JSON: {}", reason)
            }
            Diagnostic::UnsupportedExtension { file_name } => write!(
                f,
                "unsupported file type: {} (expected .log, .html or .htm)",
                file_name
            ),
            Diagnostic::Unreadable { reason } => write!(f, "could not read file: {}", reason),
        }
    }
}

/// Records recovered from one source plus everything that went wrong.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub records: Vec<CanonicalRecord>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn failed(diagnostic: Diagnostic) -> Self {
        Self {
            records: Vec::new(),
            diagnostics: vec![diagnostic],
        }
    }

    /// Message for a source that produced no records, if any.
    pub fn error_message(&self) -> Option<String> {
        if !self.records.is_empty() {
            return None;
        }
        if let Some(structural) = self.diagnostics.iter().find(|d| d.is_structural()) {
            return Some(structural.to_string());
        }
        Some(match self.diagnostics.len() {
            0 => "no valid entries found".to_string(),
            n => format!("no valid entries found ({} malformed)", n),
        })
    }
}

/// Parse one file's text, routing on its name.
pub fn parse_source(file_name: &str, content: &str, config: &IngestConfig) -> ParseOutcome {
    match SourceKind::detect(file_name) {
        Some(SourceKind::Log) => log_format::parse(content, file_name),
        Some(SourceKind::Leaderboard) => {
            leaderboard::parse_with_carrier(content, file_name, &config.carrier_id)
        }
        None => ParseOutcome::failed(Diagnostic::UnsupportedExtension {
            file_name: file_name.to_string(),
        }),
    }
}

/// Raw upload: file name plus its bytes.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Read a file from disk, keeping only its file name as the source name.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read source file: {:?}", path))?;
        Ok(Self {
            name: display_name(path),
            content,
        })
    }

    /// SHA-256 of the raw bytes, hex encoded.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(&self.content))
    }
}

/// File name shown to users and used as the record source name.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Per-file result of an ingestion batch.
#[derive(Debug, Clone)]
pub struct FileReport {
    pub source_name: String,
    pub kind: Option<SourceKind>,
    pub digest: String,
    pub outcome: ParseOutcome,
    pub elapsed_ms: f64,
}

impl FileReport {
    pub fn is_success(&self) -> bool {
        !self.outcome.records.is_empty()
    }

    pub fn error_message(&self) -> Option<String> {
        self.outcome.error_message()
    }

    /// Report for a source whose bytes never reached a parser.
    pub fn unreadable(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        let source_name = source_name.into();
        Self {
            kind: SourceKind::detect(&source_name),
            source_name,
            digest: String::new(),
            outcome: ParseOutcome::failed(Diagnostic::Unreadable {
                reason: reason.into(),
            }),
            elapsed_ms: 0.0,
        }
    }
}

/// Parse a file synchronously. Used by every ingestion task.
pub fn process_file(file: &SourceFile, config: &IngestConfig) -> FileReport {
    let started = Instant::now();
    let digest = file.digest();
    let kind = SourceKind::detect(&file.name);

    let outcome = match kind {
        None => ParseOutcome::failed(Diagnostic::UnsupportedExtension {
            file_name: file.name.clone(),
        }),
        Some(_) => {
            // Invalid bytes become U+FFFD so they only spoil the line or cell they sit in.
            let text = String::from_utf8_lossy(&file.content);
            if matches!(text, Cow::Owned(_)) {
                debug!(source = %file.name, "Replaced invalid UTF-8 sequences");
            }
            parse_source(&file.name, &text, config)
        }
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    match outcome.error_message() {
        None => debug!(
            source = %file.name,
            records = outcome.records.len(),
            skipped = outcome.diagnostics.len(),
            elapsed_ms,
            "Parsed source"
        ),
        Some(error) => warn!(source = %file.name, %error, "Source produced no records"),
    }

    FileReport {
        source_name: file.name.clone(),
        kind,
        digest,
        outcome,
        elapsed_ms,
    }
}

/// Parse every file as its own blocking task and wait for all of them.
///
/// Reports come back in input order. Nothing is merged here: callers commit
/// the whole batch at once so readers never see a half-applied upload.
pub async fn ingest_files(files: Vec<SourceFile>, config: &IngestConfig) -> Vec<FileReport> {
    let started = Instant::now();
    let permits = Arc::new(Semaphore::new(config.max_concurrent_files.max(1)));
    let file_count = files.len();

    let tasks = files.into_iter().map(|file| {
        let permits = Arc::clone(&permits);
        let config = config.clone();
        let name = file.name.clone();
        async move {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = permits.acquire_owned().await.ok();
            let handle = tokio::task::spawn_blocking(move || process_file(&file, &config));
            match handle.await {
                Ok(report) => report,
                Err(e) => {
                    warn!(source = %name, error = %e, "Parse task did not complete");
                    FileReport::unreadable(name, e.to_string())
                }
            }
        }
    });

    let reports = join_all(tasks).await;

    let succeeded = reports.iter().filter(|r| r.is_success()).count();
    info!(
        files = file_count,
        succeeded,
        failed = file_count - succeeded,
        elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
        "Ingestion batch complete"
    );
    reports
}

/// Read `paths` from disk and ingest them, one report per path in input order.
///
/// Files with unsupported names are not read but still get a report, as do
/// files that cannot be read at all.
pub async fn ingest_paths(paths: &[PathBuf], config: &IngestConfig) -> Vec<FileReport> {
    let mut positions = Vec::with_capacity(paths.len());
    let mut files = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();

    for (position, path) in paths.iter().enumerate() {
        let name = display_name(path);
        if SourceKind::detect(&name).is_none() {
            debug!(file = %name, "Unsupported extension, not reading");
            positions.push(position);
            files.push(SourceFile::new(name, Vec::<u8>::new()));
            continue;
        }
        match SourceFile::read(path).await {
            Ok(file) => {
                positions.push(position);
                files.push(file);
            }
            Err(e) => {
                warn!(file = %name, error = %e, "Source file could not be read");
                unreadable.push((position, FileReport::unreadable(name, format!("{:#}", e))));
            }
        }
    }

    let reports = ingest_files(files, config).await;
    let mut ordered: Vec<(usize, FileReport)> =
        positions.into_iter().zip(reports).chain(unreadable).collect();
    ordered.sort_by_key(|(position, _)| *position);
    ordered.into_iter().map(|(_, report)| report).collect()
}
