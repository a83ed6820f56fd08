use crate::debugger::error::Error;
use log::debug;
use nix::sys;
use nix::sys::personality::Persona;
use nix::unistd::{execv, fork, ForkResult, Pid};
use std::ffi::CString;

/// Fork and exec a debugee.
///
/// The child disables address randomization, marks itself traceable and
/// execs `program` with exactly the given argv (the program path stands in
/// for argv[0] when `argv` is empty). The parent returns the child pid;
/// the initial exec stop must be reaped by the session before any other
/// trace operation.
pub fn launch(program: &str, argv: &[String]) -> Result<Pid, Error> {
    match unsafe { fork() }.map_err(|e| Error::Syscall("fork", e))? {
        ForkResult::Parent { child } => {
            debug!(target: "debugger", "debugee spawned, pid {child}");
            Ok(child)
        }
        ForkResult::Child => {
            let err = execute_debugee(program, argv)
                .expect_err("execv returns only on failure");
            eprintln!("cannot execute debugee: {err}");
            std::process::exit(1);
        }
    }
}

fn execute_debugee(program: &str, argv: &[String]) -> Result<(), Error> {
    sys::personality::set(Persona::ADDR_NO_RANDOMIZE)
        .map_err(|e| Error::Syscall("personality", e))?;
    sys::ptrace::traceme().map_err(Error::Ptrace)?;

    let program = CString::new(program)?;
    let argv: Vec<CString> = if argv.is_empty() {
        vec![program.clone()]
    } else {
        argv.iter()
            .map(|arg| CString::new(arg.as_str()))
            .collect::<Result<_, _>>()?
    };

    execv(&program, &argv).map_err(|e| Error::Syscall("execv", e))?;
    unreachable!("execv does not return on success")
}
