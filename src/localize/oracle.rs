use std::fs;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;

/// Run verdict of the output oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Success,
    Failure,
}

/// Compares the first line of the debugee-written capture file against a
/// vector's expected output.
pub struct Oracle {
    capture: PathBuf,
}

impl Oracle {
    pub fn new(capture: impl Into<PathBuf>) -> Self {
        Self {
            capture: capture.into(),
        }
    }

    /// Remove a capture left over from a previous run, so a debugee that
    /// dies before writing is not classified against stale output.
    pub fn reset(&self) {
        let _ = fs::remove_file(&self.capture);
    }

    /// The first line of the capture file, empty when the file is absent
    /// or empty.
    pub fn observed(&self) -> String {
        fs::File::open(&self.capture)
            .ok()
            .and_then(|file| BufReader::new(file).lines().next())
            .and_then(Result::ok)
            .unwrap_or_default()
    }

    pub fn classify(&self, expected: &str) -> Verdict {
        if self.observed() == expected {
            Verdict::Success
        } else {
            Verdict::Failure
        }
    }
}
