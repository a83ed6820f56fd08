use std::collections::BTreeMap;

/// Per-line hit counter of a single run.
///
/// A guard on the last observed line collapses bursts of step events that
/// stay inside one source line, so a line is counted once per entry.
#[derive(Debug, Default)]
pub struct CoverageRecorder {
    hits: BTreeMap<u64, u64>,
    last_observed_line: Option<u64>,
}

impl CoverageRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step on `line`. Returns true when the line was counted,
    /// false when it repeats the previous observation.
    pub fn observe(&mut self, line: u64) -> bool {
        if self.last_observed_line == Some(line) {
            return false;
        }
        self.last_observed_line = Some(line);
        *self.hits.entry(line).or_insert(0) += 1;
        true
    }

    /// Line -> hit count of the current run, ordered by line.
    pub fn snapshot(&self) -> BTreeMap<u64, u64> {
        self.hits.clone()
    }

    /// Drop both the counters and the last-line guard.
    pub fn clear(&mut self) {
        self.hits.clear();
        self.last_observed_line = None;
    }
}
