use crate::debugger::address::RelocatedAddress;
use crate::debugger::error::Error;
use nix::libc::c_void;
use nix::sys;
use nix::unistd::Pid;
use std::cell::Cell;
use std::collections::HashMap;

/// x86_64 `int3` opcode.
const TRAP_OPCODE: u8 = 0xCC;

/// Software breakpoint at a single debugee address.
///
/// While enabled the byte at `addr` is the trap opcode and `saved_byte`
/// holds the instruction byte it replaced; while disabled the original
/// byte is back in place.
pub struct Breakpoint {
    addr: RelocatedAddress,
    pid: Pid,
    saved_byte: Cell<u8>,
    enabled: Cell<bool>,
}

impl Breakpoint {
    pub fn new(addr: RelocatedAddress, pid: Pid) -> Self {
        Self {
            addr,
            pid,
            saved_byte: Cell::default(),
            enabled: Cell::default(),
        }
    }

    pub fn address(&self) -> RelocatedAddress {
        self.addr
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    /// Patch the trap opcode in, saving the original low byte.
    /// Callers must check [`Breakpoint::is_enabled`] first.
    pub fn enable(&self) -> Result<(), Error> {
        let ptr = self.addr.as_usize() as *mut c_void;
        let data = sys::ptrace::read(self.pid, ptr).map_err(Error::Ptrace)? as u64;
        self.saved_byte.set((data & 0xff) as u8);
        let patched = (data & !0xffu64) | TRAP_OPCODE as u64;
        unsafe {
            sys::ptrace::write(self.pid, ptr, patched as *mut c_void).map_err(Error::Ptrace)?;
        }
        self.enabled.set(true);
        Ok(())
    }

    /// Restore the saved instruction byte.
    /// Callers must check [`Breakpoint::is_enabled`] first.
    pub fn disable(&self) -> Result<(), Error> {
        let ptr = self.addr.as_usize() as *mut c_void;
        let data = sys::ptrace::read(self.pid, ptr).map_err(Error::Ptrace)? as u64;
        let restored = (data & !0xffu64) | self.saved_byte.get() as u64;
        unsafe {
            sys::ptrace::write(self.pid, ptr, restored as *mut c_void).map_err(Error::Ptrace)?;
        }
        self.enabled.set(false);
        Ok(())
    }
}

/// Address -> breakpoint table of one debugee session.
#[derive(Default)]
pub(super) struct BreakpointRegistry {
    table: HashMap<RelocatedAddress, Breakpoint>,
}

impl BreakpointRegistry {
    /// Create, enable and store a breakpoint at `addr`. Inserting at an
    /// occupied address is a no-op returning the existing entry.
    pub fn insert(&mut self, pid: Pid, addr: RelocatedAddress) -> Result<&Breakpoint, Error> {
        if !self.table.contains_key(&addr) {
            let brkpt = Breakpoint::new(addr, pid);
            brkpt.enable()?;
            self.table.insert(addr, brkpt);
        }
        Ok(&self.table[&addr])
    }

    /// Disable (if needed) and drop the breakpoint at `addr`. Removing an
    /// absent entry is a caller bug.
    pub fn remove(&mut self, addr: RelocatedAddress) -> Result<Option<Breakpoint>, Error> {
        debug_assert!(self.table.contains_key(&addr), "remove of an unknown breakpoint");
        match self.table.remove(&addr) {
            Some(brkpt) => {
                if brkpt.is_enabled() {
                    brkpt.disable()?;
                }
                Ok(Some(brkpt))
            }
            None => Ok(None),
        }
    }

    pub fn get(&self, addr: RelocatedAddress) -> Option<&Breakpoint> {
        self.table.get(&addr)
    }

    pub fn contains(&self, addr: RelocatedAddress) -> bool {
        self.table.contains_key(&addr)
    }

    pub fn addresses(&self) -> Vec<RelocatedAddress> {
        self.table.keys().copied().collect()
    }
}
