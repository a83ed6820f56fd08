use crate::debugger::address::GlobalAddress;
use nix::sys::signal::Signal;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // --------------------------------- generic errors --------------------------------------------
    #[error(transparent)]
    IO(#[from] std::io::Error),
    #[error("argument string contains a nul byte")]
    Argv(#[from] std::ffi::NulError),
    #[error("unexpected /proc/<pid>/maps format")]
    MapsFormat,

    // --------------------------------- debug information lookup ----------------------------------
    #[error("compilation unit not found at address {0}")]
    UnitNotFound(GlobalAddress),
    #[error("source place not found at address {0}")]
    PlaceNotFound(GlobalAddress),
    #[error("function not found at address {0}")]
    FunctionNotFound(GlobalAddress),
    #[error("function `{0}` not found")]
    FunctionNameNotFound(String),
    #[error("symbol `{0}` not found")]
    SymbolNotFound(String),
    #[error("there are no suitable places for this request")]
    NoSuitablePlace,
    #[error("unknown register {0}")]
    RegisterNameNotFound(String),
    #[error("invalid dwarf register number {0}")]
    DwarfRegisterNotFound(u16),

    // --------------------------------- syscall errors --------------------------------------------
    #[error("waitpid syscall error: {0}")]
    Waitpid(nix::Error),
    #[error("ptrace syscall error: {0}")]
    Ptrace(nix::Error),
    #[error("{0} syscall error: {1}")]
    Syscall(&'static str, nix::Error),

    // --------------------------------- parsing errors --------------------------------------------
    #[error("dwarf parsing error: {0}")]
    DwarfParsing(#[from] gimli::Error),
    #[error("object file parsing error: {0}")]
    ObjParsing(#[from] object::Error),

    // --------------------------------- location evaluation ---------------------------------------
    #[error("dwarf expression evaluation: option `{0}` required")]
    EvalOptionRequired(&'static str),
    #[error("unsupported variable location ({0})")]
    UnsupportedVarLocation(&'static str),

    // --------------------------------- debugee process -------------------------------------------
    #[error("debugee process exited with code {0}")]
    ProcessExit(i32),
    #[error("debugee stopped by fatal signal {0}")]
    Crashed(Signal),
}

impl Error {
    /// True for errors meaning the current pc left every known compilation
    /// unit. During a coverage run this is the expected end-of-run signal,
    /// not a failure.
    pub fn is_debug_info_exhausted(&self) -> bool {
        matches!(
            self,
            Error::UnitNotFound(_) | Error::PlaceNotFound(_) | Error::FunctionNotFound(_)
        )
    }

    /// Return a hint to an interface - continue the session after the error
    /// or tear it down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Waitpid(_)
                | Error::Ptrace(_)
                | Error::Syscall(_, _)
                | Error::ProcessExit(_)
                | Error::Crashed(_)
        )
    }
}

/// Transforms `Result` into `Option` and logs the error if it occurs.
#[macro_export]
macro_rules! weak_error {
    ($res: expr) => {
        match $res {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!(target: "debugger", "{:#}", e);
                None
            }
        }
    };
}
