use crate::console::view::FileView;
use crate::debugger::address::RelocatedAddress;
use crate::debugger::{Error, EventHook, Place};
use crate::weak_error;
use nix::sys::signal::Signal;
use std::rc::Rc;

/// Prints every debug event to the terminal.
pub(super) struct TerminalHook {
    file_view: Rc<FileView>,
}

impl TerminalHook {
    pub(super) fn new(file_view: Rc<FileView>) -> Self {
        Self { file_view }
    }

    fn print_place(&self, place: Option<Place>) {
        if let Some(place) = place {
            println!("{}:{}", place.file, place.line_number);
            if let Some(rendered) = weak_error!(self.file_view.render_source(&place, 2)) {
                println!("{rendered}");
            }
        }
    }
}

impl EventHook for TerminalHook {
    fn on_breakpoint(&self, pc: RelocatedAddress, place: Option<Place>) -> Result<(), Error> {
        println!("Hit breakpoint at address {pc}");
        self.print_place(place);
        Ok(())
    }

    fn on_step(&self, _pc: RelocatedAddress, place: Option<Place>) -> Result<(), Error> {
        self.print_place(place);
        Ok(())
    }

    fn on_signal(&self, signal: Signal) {
        println!("Debugee stopped by signal {signal}");
    }

    fn on_exit(&self, code: i32) {
        println!("Debugee exited with code {code}");
    }
}
