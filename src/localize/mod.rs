//! Spectrum-based fault localization: replay a corpus of test vectors
//! under the debugger, record per-line coverage of every run, classify
//! runs with an output oracle and report lines that only failing runs
//! executed.

pub mod coverage;
mod hook;
pub mod oracle;
pub mod vectors;

pub use coverage::CoverageRecorder;
pub use oracle::{Oracle, Verdict};
pub use vectors::TestVector;

use crate::console::view::FileView;
use crate::debugger::{process, Debugger, Error};
use crate::localize::hook::CoverageHook;
use log::warn;
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::waitpid;
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::rc::Rc;

/// Configuration of a localization session.
pub struct LocalizeConfig {
    /// Path of the executable under investigation.
    pub program: String,
    /// Path of the test-vectors file.
    pub vectors: PathBuf,
    /// Path the debugee writes its observed output into.
    pub capture: PathBuf,
}

/// Outcome of one vector run.
#[derive(Debug)]
pub enum VectorOutcome {
    Classified {
        verdict: Verdict,
        coverage: BTreeMap<u64, u64>,
    },
    /// Exec or trace failure: the run is not classifiable and merges into
    /// neither union.
    Error(String),
}

/// Result of a whole localization session.
#[derive(Debug)]
pub struct LocalizeReport {
    pub outcomes: Vec<VectorOutcome>,
    pub success_lines: BTreeSet<u64>,
    pub failure_lines: BTreeSet<u64>,
}

impl LocalizeReport {
    /// Lines executed during at least one failing run and never during a
    /// successful one.
    pub fn suspicious(&self) -> Vec<u64> {
        self.failure_lines
            .difference(&self.success_lines)
            .copied()
            .collect()
    }
}

/// Drives the debugee through every test vector at source-line step
/// granularity and owns the success/failure line unions.
pub struct FaultLocalizer {
    config: LocalizeConfig,
    oracle: Oracle,
    recorder: Rc<RefCell<CoverageRecorder>>,
    file_view: Rc<FileView>,
    success_lines: BTreeSet<u64>,
    failure_lines: BTreeSet<u64>,
}

impl FaultLocalizer {
    pub fn new(config: LocalizeConfig) -> Self {
        Self {
            oracle: Oracle::new(&config.capture),
            config,
            recorder: Rc::new(RefCell::new(CoverageRecorder::new())),
            file_view: Rc::new(FileView::new()),
            success_lines: BTreeSet::new(),
            failure_lines: BTreeSet::new(),
        }
    }

    /// Run every vector, print the per-vector conclusions and the final
    /// analysis, and return the structured report.
    pub fn run(mut self) -> anyhow::Result<LocalizeReport> {
        let vectors = TestVector::load(&self.config.vectors)?;

        let mut outcomes = vec![];
        for vector in &vectors {
            let outcome = self.run_vector(vector);
            match &outcome {
                VectorOutcome::Classified { verdict, coverage } => {
                    println!();
                    println!("Conclusion:");
                    for (line, count) in coverage {
                        println!("Line {line}was executed for : {count} TIMES");
                    }

                    let lines = coverage.keys().copied();
                    match verdict {
                        Verdict::Success => self.success_lines.extend(lines),
                        Verdict::Failure => self.failure_lines.extend(lines),
                    }
                }
                VectorOutcome::Error(e) => {
                    warn!(target: "localize", "vector {:?} not classified: {e}", vector.argv);
                }
            }
            outcomes.push(outcome);
        }

        let report = LocalizeReport {
            outcomes,
            success_lines: self.success_lines,
            failure_lines: self.failure_lines,
        };

        println!("ANALYZE :");
        for line in report.suspicious() {
            println!("Line :{line} is likely to be a fault");
        }

        Ok(report)
    }

    fn run_vector(&mut self, vector: &TestVector) -> VectorOutcome {
        self.recorder.borrow_mut().clear();
        self.oracle.reset();

        let pid = match process::launch(&self.config.program, &vector.argv) {
            Ok(pid) => pid,
            Err(e) => return VectorOutcome::Error(format!("launch debugee: {e}")),
        };

        let hook = CoverageHook::new(self.recorder.clone(), self.file_view.clone());
        let debugger = match Debugger::new(&self.config.program, pid, hook) {
            Ok(debugger) => debugger,
            Err(e) => {
                reap(pid);
                return VectorOutcome::Error(format!("create debug session: {e}"));
            }
        };

        // a still-running debugee is torn down when the session drops
        let crashed = match drive(&debugger) {
            Ok(crashed) => crashed,
            Err(e) => return VectorOutcome::Error(format!("trace debugee: {e}")),
        };

        let verdict = if crashed {
            Verdict::Failure
        } else {
            self.oracle.classify(&vector.expected)
        };
        let coverage = self.recorder.borrow().snapshot();
        self.recorder.borrow_mut().clear();

        VectorOutcome::Classified { verdict, coverage }
    }
}

/// Drive one traced run to its end: break at `main`, step at source-line
/// granularity while debug information covers the pc, then let the
/// debugee finish. Returns true when the debugee crashed on a fatal
/// signal.
fn drive(debugger: &Debugger<CoverageHook>) -> Result<bool, Error> {
    debugger.start_debugee()?;
    debugger.set_breakpoint_at_fn("main")?;

    match drive_steps(debugger) {
        Ok(()) => Ok(false),
        Err(Error::Crashed(_)) => Ok(true),
        Err(e) => Err(e),
    }
}

fn drive_steps(debugger: &Debugger<CoverageHook>) -> Result<(), Error> {
    // to the entry breakpoint
    match debugger.continue_execution() {
        Ok(()) => {}
        Err(Error::ProcessExit(_)) => return Ok(()),
        Err(e) => return Err(e),
    }

    loop {
        match debugger.step_into() {
            Ok(()) => {}
            // the pc left every known compilation unit: the run is over
            Err(e) if e.is_debug_info_exhausted() => break,
            Err(Error::ProcessExit(_)) => return Ok(()),
            Err(e) => return Err(e),
        }
    }

    loop {
        match debugger.continue_execution() {
            Ok(()) => {}
            Err(Error::ProcessExit(_)) => return Ok(()),
            Err(e) => return Err(e),
        }
    }
}

/// Force a launched debugee down when no session took ownership of it.
fn reap(pid: nix::unistd::Pid) {
    let _ = kill(pid, Signal::SIGKILL);
    let _ = waitpid(pid, None);
}
