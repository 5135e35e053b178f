//! Durable enrollment catalog.
//!
//! `create_database` persists every enrollment record here and
//! `initialize_identification` reads them back, possibly in a different
//! process. The catalog is a line-oriented keyword file written through a
//! temp file and an atomic rename, so its existence is the completion
//! marker: concurrent or repeated constructions against the same store
//! converge on whichever write finished first, and every later call is a
//! no-op. A sha256 digest over the record lines guards against partial or
//! tampered catalogs.

use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::key_value;
use crate::engine::DatabaseEntry;
use crate::error::CatalogError;

/// Name of the catalog file inside the enrollment directory.
pub const CATALOG_FILE: &str = "catalog";

const CATALOG_VERSION: u32 = 1;

pub fn catalog_path(enroll_dir: &Path) -> PathBuf {
    enroll_dir.join(CATALOG_FILE)
}

/// True once a prior database construction completed against this store.
pub fn is_complete(enroll_dir: &Path) -> bool {
    catalog_path(enroll_dir).is_file()
}

/// Writes the full record set to the store.
///
/// Returns `Ok(false)` without touching the store when a completed catalog
/// is already present (including when a concurrent constructor wins the
/// rename race) and `Ok(true)` when this call produced the catalog.
pub fn write_catalog(enroll_dir: &Path, entries: &[DatabaseEntry]) -> Result<bool, CatalogError> {
    let path = catalog_path(enroll_dir);
    if path.is_file() {
        debug!(path = %path.display(), "catalog already complete, skipping write");
        return Ok(false);
    }
    if !enroll_dir.is_dir() {
        return Err(CatalogError::MissingStore { path: enroll_dir.to_path_buf() });
    }

    let records = record_lines(entries);
    let digest = hex_digest(&records);

    let mut tmp = NamedTempFile::new_in(enroll_dir)
        .map_err(|source| CatalogError::Io { path: path.clone(), source })?;
    write!(
        tmp,
        "; iris enrollment catalog\nversion = {CATALOG_VERSION}\ncount = {}\n{records}sha256 = {digest}\n",
        entries.len(),
    )
    .map_err(|source| CatalogError::Io { path: path.clone(), source })?;
    tmp.as_file()
        .sync_all()
        .map_err(|source| CatalogError::Io { path: path.clone(), source })?;

    match tmp.persist(&path) {
        Ok(_) => {
            debug!(path = %path.display(), records = entries.len(), "catalog written");
            Ok(true)
        }
        // Lost the rename race to another constructor; their catalog stands.
        Err(_) if path.is_file() => Ok(false),
        Err(err) => Err(CatalogError::Io { path, source: err.error }),
    }
}

/// Loads the catalog, preserving record insertion order and verifying the
/// integrity digest.
pub fn read_catalog(enroll_dir: &Path) -> Result<Vec<DatabaseEntry>, CatalogError> {
    let path = catalog_path(enroll_dir);
    let text =
        fs::read_to_string(&path).map_err(|source| CatalogError::Io { path: path.clone(), source })?;

    let mut entries: Vec<DatabaseEntry> = Vec::new();
    let mut version = None;
    let mut declared_count = None;
    let mut declared_digest = None;
    let mut pending_id: Option<String> = None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(';') {
            continue;
        }

        let (_, (key, value)) =
            key_value(line).map_err(|_| CatalogError::Parse { line: line.to_string() })?;

        match key {
            "version" => {
                version = Some(
                    value
                        .parse::<u32>()
                        .map_err(|_| CatalogError::Parse { line: line.to_string() })?,
                );
            }
            "count" => {
                declared_count = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| CatalogError::Parse { line: line.to_string() })?,
                );
            }
            "id" => {
                if pending_id.is_some() {
                    return Err(CatalogError::Parse { line: line.to_string() });
                }
                pending_id = Some(value.to_string());
            }
            "sig" => {
                let id = pending_id
                    .take()
                    .ok_or_else(|| CatalogError::Parse { line: line.to_string() })?;
                let template = decode_hex(value)
                    .ok_or_else(|| CatalogError::Parse { line: line.to_string() })?;
                entries.push(DatabaseEntry { template, id });
            }
            "sha256" => declared_digest = Some(value.to_string()),
            _ => return Err(CatalogError::Parse { line: line.to_string() }),
        }
    }

    if pending_id.is_some() {
        return Err(CatalogError::Parse { line: "id without sig".to_string() });
    }

    match version {
        Some(CATALOG_VERSION) => {}
        Some(version) => return Err(CatalogError::UnsupportedVersion { version }),
        None => return Err(CatalogError::Parse { line: "missing version".to_string() }),
    }

    let declared = declared_count
        .ok_or_else(|| CatalogError::Parse { line: "missing count".to_string() })?;
    if declared != entries.len() {
        return Err(CatalogError::CountMismatch { declared, actual: entries.len() });
    }

    let digest = declared_digest
        .ok_or_else(|| CatalogError::Parse { line: "missing sha256".to_string() })?;
    if digest != hex_digest(&record_lines(&entries)) {
        return Err(CatalogError::ChecksumMismatch);
    }

    let mut seen = std::collections::HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.id.as_str()) {
            return Err(CatalogError::DuplicateId { id: entry.id.clone() });
        }
    }

    Ok(entries)
}

/// Canonical record section: the exact lines the digest covers.
fn record_lines(entries: &[DatabaseEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let _ = writeln!(out, "id = {}", entry.id);
        let _ = writeln!(out, "sig = {}", encode_hex(&entry.template));
    }
    out
}

fn hex_digest(records: &str) -> String {
    encode_hex(&Sha256::digest(records.as_bytes()))
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}
