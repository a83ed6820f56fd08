use crate::debugger::error::Error;
use nix::libc::user_regs_struct;
use nix::sys;
use nix::unistd::Pid;

/// General purpose registers of the x86_64 register file.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Register {
    Rax,
    Rbx,
    Rcx,
    Rdx,
    Rdi,
    Rsi,
    Rbp,
    Rsp,
    R8,
    R9,
    R10,
    R11,
    R12,
    R13,
    R14,
    R15,
    Rip,
    Eflags,
    Cs,
    OrigRax,
    FsBase,
    GsBase,
    Fs,
    Gs,
    Ss,
    Ds,
    Es,
}

struct Descriptor {
    register: Register,
    // system V x86_64 ABI dwarf numbering, -1 for registers without one
    dwarf_num: i16,
    name: &'static str,
}

const DESCRIPTORS: [Descriptor; 27] = [
    Descriptor { register: Register::Rip, dwarf_num: -1, name: "rip" },
    Descriptor { register: Register::OrigRax, dwarf_num: -1, name: "orig_rax" },
    Descriptor { register: Register::Rax, dwarf_num: 0, name: "rax" },
    Descriptor { register: Register::Rdx, dwarf_num: 1, name: "rdx" },
    Descriptor { register: Register::Rcx, dwarf_num: 2, name: "rcx" },
    Descriptor { register: Register::Rbx, dwarf_num: 3, name: "rbx" },
    Descriptor { register: Register::Rsi, dwarf_num: 4, name: "rsi" },
    Descriptor { register: Register::Rdi, dwarf_num: 5, name: "rdi" },
    Descriptor { register: Register::Rbp, dwarf_num: 6, name: "rbp" },
    Descriptor { register: Register::Rsp, dwarf_num: 7, name: "rsp" },
    Descriptor { register: Register::R8, dwarf_num: 8, name: "r8" },
    Descriptor { register: Register::R9, dwarf_num: 9, name: "r9" },
    Descriptor { register: Register::R10, dwarf_num: 10, name: "r10" },
    Descriptor { register: Register::R11, dwarf_num: 11, name: "r11" },
    Descriptor { register: Register::R12, dwarf_num: 12, name: "r12" },
    Descriptor { register: Register::R13, dwarf_num: 13, name: "r13" },
    Descriptor { register: Register::R14, dwarf_num: 14, name: "r14" },
    Descriptor { register: Register::R15, dwarf_num: 15, name: "r15" },
    Descriptor { register: Register::Eflags, dwarf_num: 49, name: "eflags" },
    Descriptor { register: Register::Es, dwarf_num: 50, name: "es" },
    Descriptor { register: Register::Cs, dwarf_num: 51, name: "cs" },
    Descriptor { register: Register::Ss, dwarf_num: 52, name: "ss" },
    Descriptor { register: Register::Ds, dwarf_num: 53, name: "ds" },
    Descriptor { register: Register::Fs, dwarf_num: 54, name: "fs" },
    Descriptor { register: Register::Gs, dwarf_num: 55, name: "gs" },
    Descriptor { register: Register::FsBase, dwarf_num: 58, name: "fs_base" },
    Descriptor { register: Register::GsBase, dwarf_num: 59, name: "gs_base" },
];

impl Register {
    pub fn from_name(name: &str) -> Result<Self, Error> {
        DESCRIPTORS
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.register)
            .ok_or_else(|| Error::RegisterNameNotFound(name.to_string()))
    }

    pub fn from_dwarf(dwarf_num: u16) -> Result<Self, Error> {
        DESCRIPTORS
            .iter()
            .find(|d| d.dwarf_num == dwarf_num as i16)
            .map(|d| d.register)
            .ok_or(Error::DwarfRegisterNotFound(dwarf_num))
    }

    pub fn name(self) -> &'static str {
        DESCRIPTORS
            .iter()
            .find(|d| d.register == self)
            .map(|d| d.name)
            .expect("all registers are described")
    }

    fn value_of(self, regs: &user_regs_struct) -> u64 {
        match self {
            Register::Rax => regs.rax,
            Register::Rbx => regs.rbx,
            Register::Rcx => regs.rcx,
            Register::Rdx => regs.rdx,
            Register::Rdi => regs.rdi,
            Register::Rsi => regs.rsi,
            Register::Rbp => regs.rbp,
            Register::Rsp => regs.rsp,
            Register::R8 => regs.r8,
            Register::R9 => regs.r9,
            Register::R10 => regs.r10,
            Register::R11 => regs.r11,
            Register::R12 => regs.r12,
            Register::R13 => regs.r13,
            Register::R14 => regs.r14,
            Register::R15 => regs.r15,
            Register::Rip => regs.rip,
            Register::Eflags => regs.eflags,
            Register::Cs => regs.cs,
            Register::OrigRax => regs.orig_rax,
            Register::FsBase => regs.fs_base,
            Register::GsBase => regs.gs_base,
            Register::Fs => regs.fs,
            Register::Gs => regs.gs,
            Register::Ss => regs.ss,
            Register::Ds => regs.ds,
            Register::Es => regs.es,
        }
    }

    fn update(self, regs: &mut user_regs_struct, value: u64) {
        match self {
            Register::Rax => regs.rax = value,
            Register::Rbx => regs.rbx = value,
            Register::Rcx => regs.rcx = value,
            Register::Rdx => regs.rdx = value,
            Register::Rdi => regs.rdi = value,
            Register::Rsi => regs.rsi = value,
            Register::Rbp => regs.rbp = value,
            Register::Rsp => regs.rsp = value,
            Register::R8 => regs.r8 = value,
            Register::R9 => regs.r9 = value,
            Register::R10 => regs.r10 = value,
            Register::R11 => regs.r11 = value,
            Register::R12 => regs.r12 = value,
            Register::R13 => regs.r13 = value,
            Register::R14 => regs.r14 = value,
            Register::R15 => regs.r15 = value,
            Register::Rip => regs.rip = value,
            Register::Eflags => regs.eflags = value,
            Register::Cs => regs.cs = value,
            Register::OrigRax => regs.orig_rax = value,
            Register::FsBase => regs.fs_base = value,
            Register::GsBase => regs.gs_base = value,
            Register::Fs => regs.fs = value,
            Register::Gs => regs.gs = value,
            Register::Ss => regs.ss = value,
            Register::Ds => regs.ds = value,
            Register::Es => regs.es = value,
        }
    }
}

/// Names of all described registers, in dump order.
pub fn register_names() -> impl Iterator<Item = &'static str> {
    DESCRIPTORS.iter().map(|d| d.name)
}

pub fn get_register_value(pid: Pid, reg: Register) -> Result<u64, Error> {
    let regs = sys::ptrace::getregs(pid).map_err(Error::Ptrace)?;
    Ok(reg.value_of(&regs))
}

pub fn set_register_value(pid: Pid, reg: Register, value: u64) -> Result<(), Error> {
    let mut regs = sys::ptrace::getregs(pid).map_err(Error::Ptrace)?;
    reg.update(&mut regs, value);
    sys::ptrace::setregs(pid, regs).map_err(Error::Ptrace)
}

pub fn get_register_value_dwarf(pid: Pid, dwarf_num: u16) -> Result<u64, Error> {
    get_register_value(pid, Register::from_dwarf(dwarf_num)?)
}
