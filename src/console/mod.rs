pub mod command;
mod hook;
pub mod view;

use crate::console::command::{BreakpointTarget, Command, MemoryCommand, RegisterCommand};
use crate::console::hook::TerminalHook;
use crate::console::view::FileView;
use crate::debugger::address::RelocatedAddress;
use crate::debugger::{Debugger, Error};
use nix::unistd::Pid;
use rustyline::error::ReadlineError;
use rustyline::Editor;
use std::rc::Rc;

pub struct AppBuilder {
    file_view: Rc<FileView>,
}

impl AppBuilder {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            file_view: Rc::new(FileView::new()),
        }
    }

    pub fn build(
        self,
        program: impl Into<String>,
        pid: Pid,
    ) -> Result<TerminalApplication, Error> {
        let hook = TerminalHook::new(self.file_view.clone());
        let debugger = Debugger::new(program, pid, hook)?;
        Ok(TerminalApplication {
            debugger,
            file_view: self.file_view,
        })
    }
}

pub struct TerminalApplication {
    debugger: Debugger<TerminalHook>,
    file_view: Rc<FileView>,
}

impl TerminalApplication {
    pub fn run(&self) -> anyhow::Result<()> {
        self.debugger.start_debugee()?;

        let mut editor = Editor::<()>::new()?;
        loop {
            match editor.readline("faultline> ") {
                Ok(input) => {
                    editor.add_history_entry(input.as_str());
                    match Command::parse(&input) {
                        Err(_) => eprintln!("Unknown command"),
                        Ok(Command::Quit) => break,
                        Ok(command) => {
                            if let Err(e) = self.handle_command(command) {
                                println!("error: {e}");
                                if e.is_fatal() {
                                    break;
                                }
                            }
                        }
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => {
                    println!("error: {e:?}");
                    break;
                }
            }
        }

        Ok(())
    }

    fn handle_command(&self, command: Command) -> Result<(), Error> {
        let dbg = &self.debugger;
        match command {
            Command::Continue => dbg.continue_execution()?,
            Command::Break(target) => {
                let addr = match target {
                    BreakpointTarget::Address(addr) => {
                        dbg.set_breakpoint_at_addr(RelocatedAddress::from(addr))?
                    }
                    BreakpointTarget::Line(file, line) => dbg.set_breakpoint_at_line(&file, line)?,
                    BreakpointTarget::Function(name) => dbg.set_breakpoint_at_fn(&name)?,
                };
                println!("Set breakpoint at address {addr}");
            }
            Command::StepInto => dbg.step_into()?,
            Command::StepOver => dbg.step_over()?,
            Command::StepOut => dbg.step_out()?,
            Command::StepInstruction => {
                dbg.single_step_instruction()?;
                self.print_current_source()?;
            }
            Command::Status => self.print_current_source()?,
            Command::Register(RegisterCommand::Dump) => {
                for (name, value) in dbg.dump_registers()? {
                    println!("{name:10} {value:#018x}");
                }
            }
            Command::Register(RegisterCommand::Read(name)) => {
                println!("{:#018x}", dbg.get_register_value(&name)?);
            }
            Command::Register(RegisterCommand::Write(name, value)) => {
                dbg.set_register_value(&name, value)?;
            }
            Command::Memory(MemoryCommand::Read(addr)) => {
                println!("{:#x}", dbg.read_word(RelocatedAddress::from(addr))?);
            }
            Command::Memory(MemoryCommand::Write(addr, value)) => {
                dbg.write_word(RelocatedAddress::from(addr), value)?;
            }
            Command::Variables => {
                for var in dbg.read_variables()? {
                    println!("{var}");
                }
            }
            Command::Backtrace => {
                for (number, frame) in dbg.backtrace()?.iter().enumerate() {
                    println!("frame #{number}: {} {}", frame.start, frame.func_name);
                }
            }
            Command::Symbol(name) => {
                for symbol in dbg.lookup_symbol(&name)? {
                    println!("{} {:?} {:#016X}", symbol.name, symbol.kind, symbol.address);
                }
            }
            // handled by the input loop
            Command::Quit => {}
        }
        Ok(())
    }

    fn print_current_source(&self) -> Result<(), Error> {
        let place = self.debugger.current_place()?;
        println!("{}:{}", place.file, place.line_number);
        if let Ok(rendered) = self.file_view.render_source(&place, 2) {
            println!("{rendered}");
        }
        Ok(())
    }
}
