use std::path::Path;

use crate::iris::IrisImage;
use crate::status::{ReturnStatus, TemplateType};

/// An enrollment template with its caller-assigned unique identifier.
#[derive(Clone, Debug, PartialEq)]
pub struct DatabaseEntry {
    /// The opaque template bytes.
    pub template: Vec<u8>,
    /// Unique identifier assigned to this template.
    pub id: String,
}

impl DatabaseEntry {
    pub fn new(id: impl Into<String>, template: Vec<u8>) -> Self {
        Self { template, id: id.into() }
    }
}

/// One entry of an identification result list.
///
/// An empty identifier marks the invalid placeholder used to pad result
/// lists shorter than the requested length.
#[derive(Clone, Debug, PartialEq)]
pub struct Candidate {
    pub id: String,
    /// Non-negative dissimilarity between the probe and this entry; lower is
    /// more similar.
    pub distance: f64,
}

impl Candidate {
    pub fn new(id: impl Into<String>, distance: f64) -> Self {
        Self { id: id.into(), distance }
    }

    /// The placeholder entry: empty id, infinite distance.
    pub fn invalid() -> Self {
        Self { id: String::new(), distance: f64::INFINITY }
    }

    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && self.distance.is_finite()
    }
}

/// The 1:N identification engine contract.
///
/// An engine instance moves through one of two disjoint lifecycles within a
/// process: `initialize_template_creation` followed by any number of
/// `create_template` calls, or `initialize_identification` followed by any
/// number of `identify` calls. The same implementation must support both
/// lifecycles across separate process invocations; the enrollment directory
/// is the only state that survives between them.
///
/// Every operation returns exactly one [`ReturnStatus`]; callers branch on
/// the code, never on the description.
pub trait Engine {
    /// Prepares the engine for template creation.
    ///
    /// Must be idempotent and tolerate concurrent invocation from
    /// independent, unsynchronized processes on the same machine. Reads only
    /// from `config_dir`, which is read-only.
    fn initialize_template_creation(
        &mut self,
        config_dir: &Path,
        template_type: TemplateType,
    ) -> ReturnStatus;

    /// Generates one template from a subject's iris samples, writing the
    /// bytes into `template`.
    ///
    /// Implementations must handle all four sample-set shapes: a single
    /// image; one left and one right iris; several images of the same iris;
    /// N left and N right images. For any set of more than one image, every
    /// label is Left or Right; the harness enforces this before the call.
    ///
    /// `DetectError` still produces a template (which may carry no usable
    /// biometric signal and later yield `IdentError` when searched);
    /// `FormatError`, `ConfigDirError` and `ParticipantError` are fatal to
    /// the calling session. Input samples must not be mutated.
    fn create_template(&mut self, irides: &[IrisImage], template: &mut Vec<u8>) -> ReturnStatus;

    /// Builds the searchable enrollment database under `enroll_dir` from the
    /// full, final record set.
    ///
    /// Called once per store with everything later searches need persisted
    /// to `enroll_dir` (read+write access). Must tolerate repeated calls
    /// against the same store: a second call detects the prior completion
    /// (for example via a marker in the store) and returns Success without
    /// redoing work. Fatal codes: `EnrollDirError`, `ConfigDirError`,
    /// `ParticipantError`.
    fn create_database(
        &mut self,
        enroll_dir: &Path,
        config_dir: &Path,
        entries: &[DatabaseEntry],
    ) -> ReturnStatus;

    /// Loads whatever state is needed to answer `identify` from a store a
    /// prior `create_database` completed, possibly in a different process.
    fn initialize_identification(&mut self, enroll_dir: &Path, config_dir: &Path) -> ReturnStatus;

    /// Searches `probe` against the enrollment database.
    ///
    /// On Success, `candidates` holds exactly `num_candidates` entries
    /// sorted ascending by distance (most similar first), ties broken by
    /// enrollment insertion order, short lists padded with
    /// [`Candidate::invalid`] placeholders. On `FormatError`, `IdentError`
    /// or `ParticipantError` the list is not meaningful and the caller must
    /// discard it; the failure is fatal to this query only.
    fn identify(
        &mut self,
        probe: &[u8],
        num_candidates: u32,
        candidates: &mut Vec<Candidate>,
    ) -> ReturnStatus;
}
