use std::fmt;

use crate::engine::Candidate;
use crate::status::ReturnStatus;

/// Everything emitted for one identification query: the probe identifier,
/// the status of the `identify` call, and exactly the configured number of
/// candidates, placeholders included.
#[derive(Clone, Debug)]
pub struct SearchOutput {
    pub probe_id: String,
    pub status: ReturnStatus,
    pub candidates: Vec<Candidate>,
}

impl SearchOutput {
    /// Borrowing view of the result lines, one per candidate.
    pub fn rows(&self) -> impl Iterator<Item = CandidateRow<'_>> {
        self.candidates
            .iter()
            .map(move |candidate| CandidateRow {
                probe_id: &self.probe_id,
                candidate,
                status: &self.status,
            })
    }
}

/// One `probeId candidateId distance statusCode` result line.
#[derive(Clone, Copy, Debug)]
pub struct CandidateRow<'a> {
    pub probe_id: &'a str,
    pub candidate: &'a Candidate,
    pub status: &'a ReturnStatus,
}

impl fmt::Display for CandidateRow<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.probe_id,
            self.candidate.id,
            self.candidate.distance,
            self.status.code.value()
        )
    }
}

impl fmt::Display for SearchOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}
