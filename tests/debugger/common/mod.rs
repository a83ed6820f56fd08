use faultline::debugger::address::RelocatedAddress;
use faultline::debugger::{process, Error, EventHook, Place};
use nix::sys::signal::Signal;
use nix::unistd::Pid;
use std::cell::Cell;
use std::sync::Arc;

/// Debug events captured by [`TestHooks`].
#[derive(Clone, Default)]
pub struct DebugeeRunInfo {
    pub line: Arc<Cell<Option<u64>>>,
    pub file: Arc<Cell<Option<String>>>,
    pub exit_code: Arc<Cell<Option<i32>>>,
    pub last_signal: Arc<Cell<Option<Signal>>>,
}

#[derive(Default)]
pub struct TestHooks {
    info: DebugeeRunInfo,
}

impl TestHooks {
    pub fn new(info: DebugeeRunInfo) -> Self {
        Self { info }
    }

    fn record(&self, place: Option<Place>) {
        self.info
            .file
            .set(place.as_ref().map(|p| p.file.to_string()));
        self.info.line.set(place.map(|p| p.line_number));
    }
}

impl EventHook for TestHooks {
    fn on_breakpoint(&self, _pc: RelocatedAddress, place: Option<Place>) -> Result<(), Error> {
        self.record(place);
        Ok(())
    }

    fn on_step(&self, _pc: RelocatedAddress, place: Option<Place>) -> Result<(), Error> {
        self.record(place);
        Ok(())
    }

    fn on_signal(&self, signal: Signal) {
        self.info.last_signal.set(Some(signal));
    }

    fn on_exit(&self, code: i32) {
        self.info.exit_code.set(Some(code));
    }
}

/// Fork a traced debugee, ready for [`Debugger::start_debugee`].
pub fn prepare_debugee_process(path: &str, args: &[&str]) -> Pid {
    let mut argv = vec![path.to_string()];
    argv.extend(args.iter().map(|arg| arg.to_string()));
    process::launch(path, &argv).expect("launch debugee")
}

#[macro_export]
macro_rules! assert_no_proc {
    ($pid:expr) => {
        use sysinfo::{PidExt, SystemExt};

        let sys = sysinfo::System::new_all();
        assert!(
            sys.process(sysinfo::Pid::from_u32($pid.as_raw() as u32))
                .is_none(),
            "debugee process must be gone"
        )
    };
}
