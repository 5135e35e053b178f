use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::status::ReturnCode;

/// Errors raised by the harness itself.
///
/// Engine-reported conditions travel as [`crate::status::ReturnStatus`]
/// values; these are the failures around the contract: I/O, malformed
/// inputs, and caller contract violations detected before the engine is
/// ever invoked.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// An error occurred reading a file or directory the harness needs.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A raster image could not be parsed.
    #[error("failed to parse raster image {path}: {message}")]
    RasterParse { path: PathBuf, message: String },

    /// A sample's byte buffer disagrees with its declared geometry.
    #[error("sample raster expects {expected} bytes but holds {actual}")]
    RasterLength { expected: usize, actual: usize },

    /// A multi-sample set contains an image without an explicit eye label.
    #[error("sample set with {count} images must label every image Left or Right")]
    UnlabeledSamples { count: usize },

    /// A quality score outside 0..=100 that is not the 255 sentinel.
    #[error("quality score {quality} is outside 0..=100 (255 = not computed)")]
    QualityOutOfRange { quality: u8 },

    /// A subject was submitted with no samples at all.
    #[error("empty sample set")]
    EmptySampleSet,

    /// The same identifier was submitted twice in one session.
    #[error("subject id `{id}` submitted more than once")]
    DuplicateSubject { id: String },

    /// An engine operation returned a session-fatal status.
    #[error("{operation} returned {code}: {description}")]
    FatalStatus {
        operation: &'static str,
        code: ReturnCode,
        description: String,
    },

    /// A template-creation worker terminated before draining its queue.
    #[error("template worker terminated unexpectedly")]
    WorkerLost,

    /// The worker pool was configured without any workers.
    #[error("worker count must be at least 1")]
    NoWorkers,
}

/// Error handling for the enrollment catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The enrollment store path does not exist or is not a directory.
    #[error("enrollment store {path} is not an accessible directory")]
    MissingStore { path: PathBuf },

    /// An I/O failure while reading or writing the catalog file.
    #[error("catalog I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A catalog line did not parse.
    #[error("malformed catalog line: {line}")]
    Parse { line: String },

    /// The catalog was written by an incompatible version.
    #[error("unsupported catalog version {version}")]
    UnsupportedVersion { version: u32 },

    /// The record count declared in the header disagrees with the records
    /// actually present.
    #[error("catalog declares {declared} records but holds {actual}")]
    CountMismatch { declared: usize, actual: usize },

    /// The integrity digest over the record lines does not match.
    #[error("catalog checksum mismatch")]
    ChecksumMismatch,

    /// The catalog holds the same identifier more than once.
    #[error("catalog holds id `{id}` more than once")]
    DuplicateId { id: String },
}

/// Error handling for engine configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A configuration line did not parse.
    #[error("malformed configuration line: {line}")]
    Parse { line: String },

    /// A key this engine does not understand.
    #[error("unknown configuration key `{key}`")]
    UnknownKey { key: String },

    /// A value that does not fit its key.
    #[error("invalid value `{value}` for `{key}`")]
    Value { key: &'static str, value: String },
}
