use crate::debugger::address::RelocatedAddress;
use crate::debugger::error::Error;
use crate::debugger::register::{self, Register};
use log::debug;
use nix::libc::{c_void, siginfo_t};
use nix::sys;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use std::mem;

/// Word size of the debugee ABI, also the distance between a saved frame
/// pointer and the saved return address.
pub const WORD_SIZE: usize = mem::size_of::<usize>();

/// The process attached over ptrace. Every operation requires the process
/// to be in a ptrace stop; the kernel serializes our access with the
/// debugee's own execution.
pub struct Tracee {
    pub pid: Pid,
}

impl Tracee {
    pub fn new(pid: Pid) -> Self {
        Self { pid }
    }

    /// Block until the next status change of the tracee.
    pub fn wait_one(&self) -> Result<WaitStatus, Error> {
        debug!(target: "tracee", "wait for tracee status, pid {}", self.pid);
        let status = waitpid(self.pid, None).map_err(Error::Waitpid)?;
        debug!(target: "tracee", "receive tracee status {status:?}, pid {}", self.pid);
        Ok(status)
    }

    /// Resume the tracee until the next signal.
    pub fn r#continue(&self) -> Result<(), Error> {
        debug!(target: "tracee", "continue execution, pid {}", self.pid);
        sys::ptrace::cont(self.pid, None).map_err(Error::Ptrace)
    }

    /// Execute a single machine instruction.
    pub fn single_step(&self) -> Result<(), Error> {
        sys::ptrace::step(self.pid, None).map_err(Error::Ptrace)
    }

    /// Signal information of the current stop.
    pub fn siginfo(&self) -> Result<siginfo_t, Error> {
        sys::ptrace::getsiginfo(self.pid).map_err(Error::Ptrace)
    }

    pub fn pc(&self) -> Result<RelocatedAddress, Error> {
        register::get_register_value(self.pid, Register::Rip).map(RelocatedAddress::from)
    }

    pub fn set_pc(&self, pc: RelocatedAddress) -> Result<(), Error> {
        register::set_register_value(self.pid, Register::Rip, pc.as_u64())
    }

    pub fn read_word(&self, addr: RelocatedAddress) -> Result<u64, Error> {
        sys::ptrace::read(self.pid, addr.as_usize() as *mut c_void)
            .map(|word| word as u64)
            .map_err(Error::Ptrace)
    }

    pub fn write_word(&self, addr: RelocatedAddress, value: u64) -> Result<(), Error> {
        unsafe {
            sys::ptrace::write(
                self.pid,
                addr.as_usize() as *mut c_void,
                value as *mut c_void,
            )
            .map_err(Error::Ptrace)
        }
    }

    /// Read `len` bytes starting at `addr`, word by word.
    pub fn read_memory(&self, addr: RelocatedAddress, len: usize) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(len);
        let mut cursor = addr;
        while bytes.len() < len {
            let word = self.read_word(cursor)?;
            let missing = len - bytes.len();
            bytes.extend(word.to_ne_bytes().into_iter().take(missing));
            cursor = cursor.offset(WORD_SIZE as isize);
        }
        Ok(bytes)
    }
}
