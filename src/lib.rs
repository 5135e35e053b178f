#![forbid(unsafe_code)]

//! # iris-1n
//!
//! Engine contract and conformance harness for 1:N iris identification.
//!
//! This crate provides:
//! - The [`Engine`] trait: the lifecycle contract every identification
//!   engine implements, with a closed status taxonomy
//! - The sample and result data model ([`IrisImage`], [`Candidate`],
//!   [`ReturnStatus`])
//! - A harness driving the full enroll-then-search lifecycle with ranked,
//!   fixed-length candidate lists
//! - A reference engine (per-eye grid-intensity codes) and a durable,
//!   idempotently constructed enrollment catalog
//! - Parallel template creation across per-worker engine instances

pub mod config;
pub mod engine;
pub mod error;
pub mod harness;
pub mod iris;
pub mod output;
pub mod parallel;
pub mod ranking;
pub mod raster_parser;
pub mod reference_engine;
pub mod status;
pub mod store;
pub mod template;

// Re-export main types for convenience
pub use engine::{Candidate, DatabaseEntry, Engine};
pub use error::{CatalogError, ConfigError, HarnessError};
pub use harness::{Harness, HarnessConfig, SubjectSamples};
pub use iris::{EyeLabel, IrisAnnulus, IrisImage, PixelFormat};
pub use output::{CandidateRow, SearchOutput};
pub use parallel::{TemplateOutcome, TemplatePool};
pub use reference_engine::ReferenceEngine;
pub use status::{ReturnCode, ReturnStatus, TemplateType};
