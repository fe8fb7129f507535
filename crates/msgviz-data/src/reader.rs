//! Loading normalized message records from JSONL archive files.
//!
//! Each line holds one record with `correspondent`, `medium`, `contents` and
//! `send_date`.  One file becomes one [`MessageArchive`] whose source label
//! is the file stem.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use msgviz_core::error::{ArchiveError, Result};
use msgviz_core::models::{Message, MessageArchive, RawMessage};
use tracing::{debug, warn};

use crate::connector::Connector;

// ── LoadReport ────────────────────────────────────────────────────────────────

/// Line counts from loading one archive file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Non-blank lines seen.
    pub lines_read: u64,
    /// Lines that became messages.
    pub accepted: u64,
    /// Lines that were not JSON or not a valid message.
    pub rejected: u64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Expand `paths` into the archive files to load, sorted and deduplicated.
///
/// Files are taken as given whatever their extension; directories are walked
/// recursively for `.jsonl` files.  Missing paths are logged and skipped.
pub fn find_archive_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            files.extend(
                walkdir::WalkDir::new(path)
                    .follow_links(true)
                    .into_iter()
                    .filter_map(|entry| entry.ok())
                    .filter(|entry| {
                        entry.file_type().is_file()
                            && entry
                                .path()
                                .extension()
                                .map(|ext| ext == "jsonl")
                                .unwrap_or(false)
                    })
                    .map(|entry| entry.into_path()),
            );
        } else {
            warn!("Archive path does not exist: {}", path.display());
        }
    }

    files.sort();
    files.dedup();
    files
}

/// Load one JSONL file into an archive.
///
/// Naive send dates are read as local time in `tz`.  Lines that fail to parse
/// or to build a [`Message`] are logged and counted as rejected.
pub fn load_archive_file(path: &Path, tz: &Tz) -> Result<(MessageArchive, LoadReport)> {
    let file = std::fs::File::open(path).map_err(|source| ArchiveError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let reader = std::io::BufReader::new(file);
    let mut report = LoadReport::default();
    let mut messages = Vec::new();

    for (line_no, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(|source| ArchiveError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        report.lines_read += 1;

        let parsed = serde_json::from_str::<RawMessage>(trimmed)
            .map_err(ArchiveError::from)
            .and_then(|raw| Message::from_raw(raw, tz));

        match parsed {
            Ok(message) => {
                report.accepted += 1;
                messages.push(message);
            }
            Err(e) => {
                report.rejected += 1;
                warn!("{}:{}: rejected record: {}", path.display(), line_no + 1, e);
            }
        }
    }

    debug!(
        "File {}: {} read, {} accepted, {} rejected",
        path.display(),
        report.lines_read,
        report.accepted,
        report.rejected,
    );

    Ok((MessageArchive::from_source(source_label(path), messages), report))
}

/// The label an archive file is recorded under: its file stem.
pub fn source_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ── JsonlConnector ────────────────────────────────────────────────────────────

/// A [`Connector`] over one JSONL archive file.
#[derive(Debug, Clone)]
pub struct JsonlConnector {
    path: PathBuf,
    label: String,
    tz: Tz,
}

impl JsonlConnector {
    pub fn new(path: impl Into<PathBuf>, tz: Tz) -> Self {
        let path = path.into();
        let label = source_label(&path);
        Self { path, label, tz }
    }

    /// One connector per archive file found under `paths`.
    pub fn discover(paths: &[PathBuf], tz: Tz) -> Vec<Self> {
        find_archive_files(paths)
            .into_iter()
            .map(|p| Self::new(p, tz))
            .collect()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for JsonlConnector {
    fn label(&self) -> &str {
        &self.label
    }

    fn pull(&self) -> Result<MessageArchive> {
        let (archive, report) = load_archive_file(&self.path, &self.tz)?;
        if report.rejected > 0 {
            warn!(
                "{}: {} of {} records rejected",
                self.label, report.rejected, report.lines_read
            );
        }
        Ok(archive)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
