pub mod address;
pub mod breakpoint;
pub mod dwarf;
mod error;
pub mod process;
pub mod register;
pub mod tracee;
pub mod variable;

pub use dwarf::{Place, Symbol};
pub use error::Error;

use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use crate::debugger::breakpoint::BreakpointRegistry;
use crate::debugger::dwarf::eval::{
    EvalContext, EvalOptions, EvalResult, ExpressionEvaluator, TraceeContext,
};
use crate::debugger::dwarf::{DebugInfo, FunctionDie, VarLocation};
use crate::debugger::register::Register;
use crate::debugger::tracee::{Tracee, WORD_SIZE};
use crate::debugger::variable::{VariableLocation, VariableView};
use log::warn;
use nix::errno::Errno;
use nix::libc::siginfo_t;
use nix::sys::signal::Signal;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use object::{Object, ObjectKind};
use std::cell::{Cell, RefCell};
use std::fs;
use std::str::from_utf8;

/// Hooks into debug events. Interfaces (the terminal console, the fault
/// localizer, tests) observe a session through this trait.
pub trait EventHook {
    /// The debugee stopped on a software breakpoint; pc is already
    /// corrected back to the patched instruction.
    fn on_breakpoint(&self, pc: RelocatedAddress, place: Option<Place>) -> Result<(), Error>;
    /// A source-level step finished at a new line.
    fn on_step(&self, pc: RelocatedAddress, place: Option<Place>) -> Result<(), Error>;
    /// The debugee stopped on a signal other than SIGTRAP.
    fn on_signal(&self, signal: Signal);
    /// The debugee exited.
    fn on_exit(&self, code: i32);
}

/// A backtrace frame resolved through the saved-frame-pointer chain.
pub struct FrameView {
    pub func_name: String,
    pub start: GlobalAddress,
}

/// One debug session over a traced child: owns the tracee handle, the
/// breakpoint table and the parsed debug information for the lifetime of
/// a single debugee run.
pub struct Debugger<H: EventHook> {
    program: String,
    tracee: Tracee,
    breakpoints: RefCell<BreakpointRegistry>,
    debug_info: DebugInfo,
    load_addr: Cell<usize>,
    obj_kind: ObjectKind,
    hooks: H,
}

impl<H: EventHook> Debugger<H> {
    pub fn new(program: impl Into<String>, pid: Pid, hooks: H) -> Result<Self, Error> {
        let program = program.into();
        let file = fs::File::open(&program)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let object = object::File::parse(&*mmap)?;

        Ok(Self {
            debug_info: DebugInfo::new(&object)?,
            obj_kind: object.kind(),
            tracee: Tracee::new(pid),
            breakpoints: RefCell::default(),
            load_addr: Cell::new(0),
            hooks,
            program,
        })
    }

    pub fn pid(&self) -> Pid {
        self.tracee.pid
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Reap the initial exec stop of a freshly launched debugee and
    /// resolve the load offset of a position-independent binary.
    pub fn start_debugee(&self) -> Result<(), Error> {
        if let WaitStatus::Exited(_, code) = self.tracee.wait_one()? {
            self.hooks.on_exit(code);
            return Err(Error::ProcessExit(code));
        }
        self.init_load_addr()
    }

    fn init_load_addr(&self) -> Result<(), Error> {
        if self.obj_kind == ObjectKind::Dynamic {
            let maps = fs::read(format!("/proc/{}/maps", self.tracee.pid))?;
            let first_line = from_utf8(&maps)
                .map_err(|_| Error::MapsFormat)?
                .lines()
                .next()
                .ok_or(Error::MapsFormat)?;
            let addr = first_line.split('-').next().ok_or(Error::MapsFormat)?;
            let addr = usize::from_str_radix(addr, 16).map_err(|_| Error::MapsFormat)?;
            self.load_addr.set(addr);
        }
        Ok(())
    }

    fn global_pc(&self) -> Result<GlobalAddress, Error> {
        Ok(self.tracee.pc()?.into_global(self.load_addr.get()))
    }

    fn relocate(&self, addr: GlobalAddress) -> RelocatedAddress {
        addr.relocate(self.load_addr.get())
    }

    /// The source place of the current pc.
    pub fn current_place(&self) -> Result<Place, Error> {
        self.debug_info.find_place_from_pc(self.global_pc()?)
    }

    /// Resume the debugee until the next breakpoint hit, signal stop or
    /// exit. A breakpoint under the current pc is stepped over first and
    /// left armed.
    pub fn continue_execution(&self) -> Result<(), Error> {
        self.step_over_breakpoint()?;
        self.tracee.r#continue()?;
        self.wait_for_signal()
    }

    /// If the current pc sits on an enabled breakpoint: disable it,
    /// single-step the original instruction, re-arm.
    fn step_over_breakpoint(&self) -> Result<(), Error> {
        let pc = self.tracee.pc()?;
        let stepped = {
            let breakpoints = self.breakpoints.borrow();
            match breakpoints.get(pc) {
                Some(brkpt) if brkpt.is_enabled() => {
                    brkpt.disable()?;
                    true
                }
                _ => false,
            }
        };

        if stepped {
            self.tracee.single_step()?;
            self.wait_for_signal()?;
            if let Some(brkpt) = self.breakpoints.borrow().get(pc) {
                brkpt.enable()?;
            }
        }
        Ok(())
    }

    /// Execute one machine instruction, honoring a breakpoint at pc.
    pub fn single_step_instruction(&self) -> Result<(), Error> {
        let pc = self.tracee.pc()?;
        if self.breakpoints.borrow().contains(pc) {
            self.step_over_breakpoint()
        } else {
            self.tracee.single_step()?;
            self.wait_for_signal()
        }
    }

    /// Step until the current source line changes, stepping into calls.
    pub fn step_into(&self) -> Result<(), Error> {
        let start_line = self.current_place()?.line_number;

        loop {
            self.single_step_instruction()?;
            let place = self.debug_info.find_place_from_pc(self.global_pc()?)?;
            if place.line_number != start_line {
                break;
            }
        }

        let pc = self.tracee.pc()?;
        let place = self.debug_info.find_place_from_pc(self.global_pc()?).ok();
        self.hooks.on_step(pc, place)
    }

    /// Run until the current function returns, using a temporary
    /// breakpoint at the saved return address.
    pub fn step_out(&self) -> Result<(), Error> {
        let ret_addr = self.return_address()?;
        let temporary = !self.breakpoints.borrow().contains(ret_addr);
        if temporary {
            self.set_breakpoint(ret_addr)?;
        }

        self.continue_execution()?;

        if temporary {
            self.remove_breakpoint(ret_addr)?;
        }
        Ok(())
    }

    /// Step one source line without descending into calls: temporary
    /// breakpoints on every other statement row of the enclosing function
    /// and on the saved return address, then continue. Breakpoints already
    /// present are left untouched, which keeps recursion working.
    pub fn step_over(&self) -> Result<(), Error> {
        let func = self.debug_info.find_function_by_pc(self.global_pc()?)?;
        let current_place = self.debug_info.find_place_from_pc(self.global_pc()?)?;

        let mut to_remove = vec![];
        for range in func.ranges.iter() {
            let mut place = self
                .debug_info
                .find_place_from_pc(GlobalAddress::from(range.begin))?;

            while place.address.as_u64() < range.end {
                if place.is_stmt && place.address != current_place.address {
                    let load_addr = self.relocate(place.address);
                    if !self.breakpoints.borrow().contains(load_addr) {
                        self.set_breakpoint(load_addr)?;
                        to_remove.push(load_addr);
                    }
                }
                match place.next() {
                    Some(next) => place = next,
                    None => break,
                }
            }
        }

        let ret_addr = self.return_address()?;
        if !self.breakpoints.borrow().contains(ret_addr) {
            self.set_breakpoint(ret_addr)?;
            to_remove.push(ret_addr);
        }

        self.continue_execution()?;

        to_remove
            .into_iter()
            .try_for_each(|addr| self.remove_breakpoint(addr))
    }

    /// Saved return address of the current frame. Assumes the classical
    /// saved-frame-pointer ABI.
    fn return_address(&self) -> Result<RelocatedAddress, Error> {
        let frame_pointer = register::get_register_value(self.tracee.pid, Register::Rbp)?;
        let ret = self
            .tracee
            .read_word(RelocatedAddress::from(frame_pointer).offset(WORD_SIZE as isize))?;
        Ok(RelocatedAddress::from(ret))
    }

    fn wait_for_signal(&self) -> Result<(), Error> {
        match self.tracee.wait_one()? {
            WaitStatus::Exited(_, code) => {
                self.hooks.on_exit(code);
                Err(Error::ProcessExit(code))
            }
            WaitStatus::Signaled(_, signal, _) => {
                self.hooks.on_signal(signal);
                Err(Error::Crashed(signal))
            }
            WaitStatus::Stopped(_, Signal::SIGTRAP) => {
                let info = match self.tracee.siginfo() {
                    Ok(info) => info,
                    // the process may die between the stop and the query
                    Err(Error::Ptrace(Errno::ESRCH)) => return Ok(()),
                    Err(e) => return Err(e),
                };
                self.handle_sigtrap(info)
            }
            WaitStatus::Stopped(_, signal) => {
                self.hooks.on_signal(signal);
                if is_fatal_signal(signal) {
                    Err(Error::Crashed(signal))
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    fn handle_sigtrap(&self, info: siginfo_t) -> Result<(), Error> {
        const SI_KERNEL: i32 = 0x80;
        const TRAP_BRKPT: i32 = 0x1;
        const TRAP_TRACE: i32 = 0x2;

        match info.si_code {
            // a software breakpoint: the trap instruction is one byte, so
            // the reported pc is one past the patched address
            SI_KERNEL | TRAP_BRKPT => {
                let pc = self.tracee.pc()?.offset(-1);
                self.tracee.set_pc(pc)?;
                let place = self
                    .debug_info
                    .find_place_from_pc(pc.into_global(self.load_addr.get()))
                    .ok();
                self.hooks.on_breakpoint(pc, place)
            }
            TRAP_TRACE => Ok(()),
            code => {
                warn!(target: "debugger", "unknown SIGTRAP code {code}");
                Ok(())
            }
        }
    }

    fn set_breakpoint(&self, addr: RelocatedAddress) -> Result<(), Error> {
        self.breakpoints
            .borrow_mut()
            .insert(self.tracee.pid, addr)
            .map(|_| ())
    }

    fn remove_breakpoint(&self, addr: RelocatedAddress) -> Result<(), Error> {
        self.breakpoints.borrow_mut().remove(addr).map(|_| ())
    }

    pub fn set_breakpoint_at_addr(&self, addr: RelocatedAddress) -> Result<RelocatedAddress, Error> {
        self.set_breakpoint(addr)?;
        Ok(addr)
    }

    pub fn remove_breakpoint_at_addr(&self, addr: RelocatedAddress) -> Result<(), Error> {
        self.remove_breakpoint(addr)
    }

    /// Install a breakpoint at the function entry, one line-table row past
    /// its low pc (the conventional prologue skip).
    pub fn set_breakpoint_at_fn(&self, name: &str) -> Result<RelocatedAddress, Error> {
        let func = self.debug_info.find_function_by_name(name)?;
        let low_pc = func.low_pc().ok_or(Error::NoSuitablePlace)?;
        let entry = self
            .debug_info
            .find_place_from_pc(low_pc)?
            .next()
            .ok_or(Error::NoSuitablePlace)?;

        let addr = self.relocate(entry.address);
        self.set_breakpoint(addr)?;
        Ok(addr)
    }

    /// Install a breakpoint at the first statement of `line` in a source
    /// file whose path ends with `file`.
    pub fn set_breakpoint_at_line(&self, file: &str, line: u64) -> Result<RelocatedAddress, Error> {
        let place = self.debug_info.find_stmt_place(file, line)?;
        let addr = self.relocate(place.address);
        self.set_breakpoint(addr)?;
        Ok(addr)
    }

    /// Addresses of all installed breakpoints.
    pub fn breakpoints_snapshot(&self) -> Vec<RelocatedAddress> {
        self.breakpoints.borrow().addresses()
    }

    pub fn read_word(&self, addr: RelocatedAddress) -> Result<u64, Error> {
        self.tracee.read_word(addr)
    }

    pub fn write_word(&self, addr: RelocatedAddress, value: u64) -> Result<(), Error> {
        self.tracee.write_word(addr, value)
    }

    pub fn get_register_value(&self, register_name: &str) -> Result<u64, Error> {
        register::get_register_value(self.tracee.pid, Register::from_name(register_name)?)
    }

    pub fn set_register_value(&self, register_name: &str, value: u64) -> Result<(), Error> {
        register::set_register_value(self.tracee.pid, Register::from_name(register_name)?, value)
    }

    /// Values of the whole register file, in dump order.
    pub fn dump_registers(&self) -> Result<Vec<(&'static str, u64)>, Error> {
        register::register_names()
            .map(|name| Ok((name, self.get_register_value(name)?)))
            .collect()
    }

    pub fn lookup_symbol(&self, name: &str) -> Result<Vec<&Symbol>, Error> {
        let symbols = self.debug_info.find_symbols(name);
        if symbols.is_empty() {
            return Err(Error::SymbolNotFound(name.to_string()));
        }
        Ok(symbols)
    }

    /// Variables of the enclosing function with their evaluated locations
    /// and an 8-byte read of each value.
    pub fn read_variables(&self) -> Result<Vec<VariableView>, Error> {
        let func = self.debug_info.find_function_by_pc(self.global_pc()?)?;
        let evaluator = ExpressionEvaluator::new(func.encoding);
        let ctx = TraceeContext::new(&self.tracee, self.load_addr.get());
        let frame_base = self.frame_base(func, &evaluator, &ctx)?;

        let mut result = Vec::with_capacity(func.variables.len());
        for var in &func.variables {
            let expr = match &var.location {
                VarLocation::Expr(expr) => expr.clone(),
                VarLocation::Unsupported => {
                    return Err(Error::UnsupportedVarLocation("not an exprloc"))
                }
                VarLocation::Absent => continue,
            };

            let mut opts = EvalOptions::new();
            if let Some(frame_base) = frame_base {
                opts = opts.with_frame_base(frame_base);
            }

            let (location, value) = match evaluator.evaluate(expr, &ctx, opts)? {
                EvalResult::Address(addr) => {
                    (VariableLocation::Address(addr), self.tracee.read_word(addr)?)
                }
                EvalResult::Register(reg) => (
                    VariableLocation::Register(Register::from_dwarf(reg.0)?),
                    ctx.register(reg)?,
                ),
            };

            result.push(VariableView {
                name: var.name.clone().unwrap_or_default(),
                location,
                value,
            });
        }
        Ok(result)
    }

    fn frame_base(
        &self,
        func: &FunctionDie,
        evaluator: &ExpressionEvaluator,
        ctx: &TraceeContext,
    ) -> Result<Option<u64>, Error> {
        let Some(expr) = func.frame_base.clone() else {
            return Ok(None);
        };
        match evaluator.evaluate(expr, ctx, EvalOptions::new()) {
            Ok(EvalResult::Register(reg)) => Ok(Some(ctx.register(reg)?)),
            Ok(EvalResult::Address(addr)) => Ok(Some(addr.as_u64())),
            Err(_) => Ok(None),
        }
    }

    /// Walk the saved-frame-pointer chain from the current pc down to
    /// `main`, innermost frame first.
    pub fn backtrace(&self) -> Result<Vec<FrameView>, Error> {
        const MAX_FRAMES: usize = 128;

        let frame_view = |func: &FunctionDie| FrameView {
            func_name: func
                .name
                .clone()
                .unwrap_or_else(|| String::from("unknown")),
            start: func.low_pc().unwrap_or_default(),
        };

        let mut frames = vec![];
        let mut func = self.debug_info.find_function_by_pc(self.global_pc()?)?;
        frames.push(frame_view(func));

        let mut frame_pointer =
            RelocatedAddress::from(register::get_register_value(self.tracee.pid, Register::Rbp)?);
        let mut ret_addr =
            RelocatedAddress::from(self.tracee.read_word(frame_pointer.offset(WORD_SIZE as isize))?);

        while func.name.as_deref() != Some("main") && frames.len() < MAX_FRAMES {
            func = self
                .debug_info
                .find_function_by_pc(ret_addr.into_global(self.load_addr.get()))?;
            frames.push(frame_view(func));
            frame_pointer = RelocatedAddress::from(self.tracee.read_word(frame_pointer)?);
            ret_addr = RelocatedAddress::from(
                self.tracee.read_word(frame_pointer.offset(WORD_SIZE as isize))?,
            );
        }

        Ok(frames)
    }
}

impl<H: EventHook> Drop for Debugger<H> {
    fn drop(&mut self) {
        // the debugee does not outlive its debug session
        if nix::sys::signal::kill(self.tracee.pid, None).is_ok() {
            let _ = nix::sys::signal::kill(self.tracee.pid, Signal::SIGKILL);
            let _ = nix::sys::wait::waitpid(self.tracee.pid, None);
        }
    }
}

fn is_fatal_signal(signal: Signal) -> bool {
    matches!(
        signal,
        Signal::SIGSEGV | Signal::SIGBUS | Signal::SIGILL | Signal::SIGFPE | Signal::SIGABRT
    )
}
