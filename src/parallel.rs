//! Parallel template creation using a worker-pool architecture.
//!
//! Each worker owns an independent engine instance built from a caller
//! factory and runs its own `initialize_template_creation`; the contract
//! guarantees that initialization tolerates concurrent invocation against
//! the same read-only configuration. Subjects are assigned to workers by a
//! hash of the subject identifier, and every outcome carries its submission
//! index so callers can restore deterministic enrollment insertion order.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Receiver, Sender};
use tracing::debug;

use crate::engine::{DatabaseEntry, Engine};
use crate::error::HarnessError;
use crate::harness::{template_disposition, RecordDisposition, SubjectSamples};
use crate::iris::validate_sample_set;
use crate::status::{ReturnStatus, TemplateType};

struct WorkItem {
    index: usize,
    subject: SubjectSamples,
}

/// Outcome of one subject's template creation.
#[derive(Clone, Debug)]
pub struct TemplateOutcome {
    /// Submission index, for restoring dispatch order.
    pub index: usize,
    pub id: String,
    pub template: Vec<u8>,
    pub status: ReturnStatus,
}

/// Worker pool for parallel template creation.
pub struct TemplatePool {
    work_senders: Vec<Sender<WorkItem>>,
    handles: Vec<JoinHandle<()>>,
    outcome_rx: Receiver<TemplateOutcome>,
    dispatched: usize,
    seen_ids: HashSet<String>,
}

impl TemplatePool {
    /// Spawns `num_workers` workers, each with its own engine from
    /// `factory`, all creating templates of the same `template_type`.
    ///
    /// `queue_size` bounds each worker's pending subjects; `dispatch` blocks
    /// when the assigned worker's queue is full.
    pub fn new<E, F>(
        num_workers: usize,
        queue_size: usize,
        factory: F,
        config_dir: PathBuf,
        template_type: TemplateType,
    ) -> Result<Self, HarnessError>
    where
        E: Engine,
        F: Fn() -> E + Clone + Send + 'static,
    {
        if num_workers == 0 {
            return Err(HarnessError::NoWorkers);
        }

        let (outcome_tx, outcome_rx) = unbounded::<TemplateOutcome>();
        let mut work_senders = Vec::with_capacity(num_workers);
        let mut handles = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = bounded::<WorkItem>(queue_size);
            work_senders.push(tx);

            let outcome_tx = outcome_tx.clone();
            let factory = factory.clone();
            let config_dir = config_dir.clone();

            let handle = thread::Builder::new()
                .name(format!("template-worker-{worker_id}"))
                .spawn(move || {
                    worker_loop(rx, outcome_tx, factory, config_dir.as_path(), template_type)
                })
                .map_err(|_| HarnessError::WorkerLost)?;
            handles.push(handle);
        }

        Ok(Self {
            work_senders,
            handles,
            outcome_rx,
            dispatched: 0,
            seen_ids: HashSet::new(),
        })
    }

    /// Queues one subject after validating the caller contract for its
    /// sample set. Blocks when the assigned worker's queue is full.
    pub fn dispatch(&mut self, subject: SubjectSamples) -> Result<(), HarnessError> {
        if !self.seen_ids.insert(subject.id.clone()) {
            return Err(HarnessError::DuplicateSubject { id: subject.id });
        }
        validate_sample_set(&subject.irides)?;

        let worker = assign_worker(&subject.id, self.work_senders.len());
        let item = WorkItem { index: self.dispatched, subject };
        self.work_senders[worker]
            .send(item)
            .map_err(|_| HarnessError::WorkerLost)?;
        self.dispatched += 1;
        Ok(())
    }

    /// Closes the queues, drains every outcome, and returns them in
    /// submission order.
    pub fn finish(self) -> Result<Vec<TemplateOutcome>, HarnessError> {
        drop(self.work_senders);

        let mut outcomes = Vec::with_capacity(self.dispatched);
        for _ in 0..self.dispatched {
            match self.outcome_rx.recv() {
                Ok(outcome) => outcomes.push(outcome),
                Err(_) => return Err(HarnessError::WorkerLost),
            }
        }
        for handle in self.handles {
            let _ = handle.join();
        }

        outcomes.sort_by_key(|outcome| outcome.index);
        Ok(outcomes)
    }
}

/// Applies the same propagation policy as sequential template creation to a
/// drained outcome list: DetectError keeps a degraded record, Timeout skips
/// the subject, any other non-Success aborts.
pub fn collect_entries(outcomes: Vec<TemplateOutcome>) -> Result<Vec<DatabaseEntry>, HarnessError> {
    let mut entries = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match template_disposition(outcome.status.code) {
            RecordDisposition::Keep | RecordDisposition::KeepDegraded => {
                entries.push(DatabaseEntry { template: outcome.template, id: outcome.id });
            }
            RecordDisposition::Skip => {}
            RecordDisposition::Fatal => {
                return Err(HarnessError::FatalStatus {
                    operation: "create_template",
                    code: outcome.status.code,
                    description: outcome.status.description,
                });
            }
        }
    }
    Ok(entries)
}

fn worker_loop<E, F>(
    rx: Receiver<WorkItem>,
    outcome_tx: Sender<TemplateOutcome>,
    factory: F,
    config_dir: &std::path::Path,
    template_type: TemplateType,
) where
    E: Engine,
    F: Fn() -> E,
{
    let mut engine = factory();
    let init_status = engine.initialize_template_creation(config_dir, template_type);
    if !init_status.is_success() {
        debug!(code = %init_status.code, "worker initialization failed, forwarding status");
    }

    while let Ok(item) = rx.recv() {
        let mut template = Vec::new();
        let status = if init_status.is_success() {
            engine.create_template(&item.subject.irides, &mut template)
        } else {
            // A session that never initialized fails every subject with the
            // initialization status.
            init_status.clone()
        };

        let outcome = TemplateOutcome {
            index: item.index,
            id: item.subject.id,
            template,
            status,
        };
        if outcome_tx.send(outcome).is_err() {
            break;
        }
    }
}

/// Deterministic worker assignment by subject identifier.
fn assign_worker(id: &str, num_workers: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    (hasher.finish() as usize).checked_rem(num_workers).unwrap_or(0)
}
