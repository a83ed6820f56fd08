use crate::console::view::FileView;
use crate::debugger::address::RelocatedAddress;
use crate::debugger::{Error, EventHook, Place};
use crate::localize::coverage::CoverageRecorder;
use log::{debug, warn};
use nix::sys::signal::Signal;
use std::cell::RefCell;
use std::rc::Rc;

/// Event hook of a localization session: feeds every newly entered source
/// line into the coverage recorder and prints the per-step localization
/// format.
pub(super) struct CoverageHook {
    recorder: Rc<RefCell<CoverageRecorder>>,
    file_view: Rc<FileView>,
}

impl CoverageHook {
    pub(super) fn new(recorder: Rc<RefCell<CoverageRecorder>>, file_view: Rc<FileView>) -> Self {
        Self {
            recorder,
            file_view,
        }
    }

    fn observe(&self, place: Option<Place>) {
        let Some(place) = place else { return };
        if self.recorder.borrow_mut().observe(place.line_number) {
            println!("Now Execute--{}Line", place.line_number);
            println!(
                "{}",
                self.file_view
                    .line(place.file, place.line_number)
                    .unwrap_or_default()
            );
        }
    }
}

impl EventHook for CoverageHook {
    fn on_breakpoint(&self, _pc: RelocatedAddress, place: Option<Place>) -> Result<(), Error> {
        self.observe(place);
        Ok(())
    }

    fn on_step(&self, _pc: RelocatedAddress, place: Option<Place>) -> Result<(), Error> {
        self.observe(place);
        Ok(())
    }

    fn on_signal(&self, signal: Signal) {
        warn!(target: "localize", "debugee stopped by signal {signal}");
    }

    fn on_exit(&self, code: i32) {
        debug!(target: "localize", "debugee exited with code {code}");
    }
}
