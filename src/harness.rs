use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::engine::{DatabaseEntry, Engine};
use crate::error::HarnessError;
use crate::iris::{validate_sample_set, IrisImage};
use crate::output::SearchOutput;
use crate::ranking;
use crate::status::{ReturnCode, ReturnStatus, TemplateType};

/// All samples of one subject for a single template-creation call.
#[derive(Clone, Debug)]
pub struct SubjectSamples {
    pub id: String,
    pub irides: Vec<IrisImage>,
}

impl SubjectSamples {
    pub fn new(id: impl Into<String>, irides: Vec<IrisImage>) -> Self {
        Self { id: id.into(), irides }
    }
}

/// Paths and sizing for one conformance run.
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Read-only engine configuration directory.
    pub config_dir: PathBuf,
    /// Read+write enrollment store directory.
    pub enroll_dir: PathBuf,
    /// Fixed candidate-list length for every identification query.
    pub num_candidates: u32,
}

/// What to do with a subject's record after template creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RecordDisposition {
    Keep,
    KeepDegraded,
    Skip,
    Fatal,
}

/// Maps a `create_template` status onto the propagation policy: DetectError
/// still yields a record, Timeout skips the subject, everything else
/// non-Success aborts the session.
pub(crate) fn template_disposition(code: ReturnCode) -> RecordDisposition {
    match code {
        ReturnCode::Success => RecordDisposition::Keep,
        ReturnCode::DetectError => RecordDisposition::KeepDegraded,
        ReturnCode::Timeout => RecordDisposition::Skip,
        _ => RecordDisposition::Fatal,
    }
}

/// Drives an engine through the full lifecycle: template creation for both
/// modes, database construction, identification, and result emission.
///
/// The engine is an explicit handle owned by the harness; nothing here
/// relies on process-global state.
pub struct Harness<E: Engine> {
    engine: E,
    config: HarnessConfig,
}

impl<E: Engine> Harness<E> {
    pub fn new(engine: E, config: HarnessConfig) -> Self {
        Self { engine, config }
    }

    /// Creates one template per subject, collecting the records that survive
    /// the propagation policy.
    ///
    /// The caller contract (raster geometry, eye-label rule, identifier
    /// uniqueness) is validated before the engine sees anything; a violation
    /// is a [`HarnessError`], not an engine status.
    pub fn create_templates(
        &mut self,
        template_type: TemplateType,
        subjects: &[SubjectSamples],
    ) -> Result<Vec<DatabaseEntry>, HarnessError> {
        validate_subjects(subjects)?;

        let status = self
            .engine
            .initialize_template_creation(&self.config.config_dir, template_type);
        if !status.is_success() {
            return Err(fatal("initialize_template_creation", status));
        }
        debug!(?template_type, subjects = subjects.len(), "template creation session ready");

        let mut entries = Vec::with_capacity(subjects.len());
        for subject in subjects {
            let mut template = Vec::new();
            let status = self.engine.create_template(&subject.irides, &mut template);
            match template_disposition(status.code) {
                RecordDisposition::Keep => {
                    entries.push(DatabaseEntry { template, id: subject.id.clone() });
                }
                RecordDisposition::KeepDegraded => {
                    warn!(subject = %subject.id, "no biometric signal detected, keeping degraded template");
                    entries.push(DatabaseEntry { template, id: subject.id.clone() });
                }
                RecordDisposition::Skip => {
                    warn!(subject = %subject.id, "template creation timed out, record skipped");
                }
                RecordDisposition::Fatal => return Err(fatal("create_template", status)),
            }
        }
        Ok(entries)
    }

    /// Builds the enrollment database from the full, final record set.
    pub fn enroll(&mut self, entries: &[DatabaseEntry]) -> Result<(), HarnessError> {
        let status =
            self.engine
                .create_database(&self.config.enroll_dir, &self.config.config_dir, entries);
        if !status.is_success() {
            return Err(fatal("create_database", status));
        }
        debug!(records = entries.len(), "enrollment database constructed");
        Ok(())
    }

    /// Loads identification state from the enrollment store.
    pub fn initialize_identification(&mut self) -> Result<(), HarnessError> {
        let status = self
            .engine
            .initialize_identification(&self.config.enroll_dir, &self.config.config_dir);
        if !status.is_success() {
            return Err(fatal("initialize_identification", status));
        }
        Ok(())
    }

    /// Runs every probe against the database, streaming one [`SearchOutput`]
    /// per probe through `sender`.
    ///
    /// Per-query failures discard that query's candidates (placeholders are
    /// emitted instead, carrying the failing code) and the run continues.
    pub fn run_identification(
        &mut self,
        probes: &[DatabaseEntry],
        sender: &Sender<SearchOutput>,
        cancel_signal: Option<&Arc<AtomicBool>>,
    ) -> Result<(), HarnessError> {
        for probe in probes {
            if let Some(cancel) = cancel_signal {
                if cancel.load(Ordering::Relaxed) {
                    debug!("cancellation signal received, stopping identification");
                    break;
                }
            }

            let mut candidates = Vec::new();
            let status =
                self.engine
                    .identify(&probe.template, self.config.num_candidates, &mut candidates);
            let output = self.finish_query(&probe.id, candidates, status);

            if sender.send(output).is_err() {
                error!("receiver dropped, stopping identification");
                break;
            }
        }
        Ok(())
    }

    /// Full lifecycle: enrollment templates, database, search templates,
    /// identification.
    pub fn run(
        &mut self,
        enrollment: &[SubjectSamples],
        searches: &[SubjectSamples],
        sender: &Sender<SearchOutput>,
        cancel_signal: Option<&Arc<AtomicBool>>,
    ) -> Result<(), HarnessError> {
        let records = self.create_templates(TemplateType::Enrollment, enrollment)?;
        self.enroll(&records)?;
        let probes = self.create_templates(TemplateType::Search, searches)?;
        self.initialize_identification()?;
        self.run_identification(&probes, sender, cancel_signal)
    }

    /// Applies the per-query policy and re-enforces the output contract.
    fn finish_query(
        &self,
        probe_id: &str,
        mut candidates: Vec<crate::engine::Candidate>,
        status: ReturnStatus,
    ) -> SearchOutput {
        let requested = self.config.num_candidates;
        if status.is_success() {
            if !ranking::is_conformant(&candidates, requested) {
                warn!(
                    probe = probe_id,
                    returned = candidates.len(),
                    requested,
                    "engine output violated the candidate-list contract, fixing up"
                );
            }
            ranking::finalize_candidates(&mut candidates, requested);
        } else {
            warn!(probe = probe_id, code = %status.code, "query failed, candidate list discarded");
            candidates = ranking::invalid_list(requested);
        }
        SearchOutput { probe_id: probe_id.to_string(), status, candidates }
    }
}

pub(crate) fn validate_subjects(subjects: &[SubjectSamples]) -> Result<(), HarnessError> {
    let mut seen = HashSet::new();
    for subject in subjects {
        if !seen.insert(subject.id.as_str()) {
            return Err(HarnessError::DuplicateSubject { id: subject.id.clone() });
        }
        validate_sample_set(&subject.irides)?;
    }
    Ok(())
}

fn fatal(operation: &'static str, status: ReturnStatus) -> HarnessError {
    error!(operation, code = %status.code, "session-fatal engine status");
    HarnessError::FatalStatus {
        operation,
        code: status.code,
        description: status.description,
    }
}
