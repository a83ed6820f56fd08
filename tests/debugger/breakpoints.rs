use crate::common::{prepare_debugee_process, DebugeeRunInfo, TestHooks};
use crate::{assert_no_proc, CALC_APP, HELLO_APP};
use faultline::debugger::{Debugger, Error};
use serial_test::serial;
use std::mem;

#[test]
#[serial]
fn test_run_to_completion_without_breakpoints() {
    let pid = prepare_debugee_process(HELLO_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(HELLO_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    let result = debugger.continue_execution();
    assert!(matches!(result, Err(Error::ProcessExit(0))));
    assert_eq!(info.exit_code.take(), Some(0));

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_breakpoint_at_line() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_breakpoint_at_line("calc.c", 20).unwrap();

    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(20));
    assert!(info.file.take().unwrap().ends_with("calc.c"));

    let result = debugger.continue_execution();
    assert!(matches!(result, Err(Error::ProcessExit(0))));

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_breakpoint_at_function_skips_prologue() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_breakpoint_at_fn("main").unwrap();

    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(19));

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_breakpoint_hits_on_every_call() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    // sum2 is called three times: twice from sum3, once from twice
    debugger.set_breakpoint_at_fn("sum2").unwrap();

    for _ in 0..3 {
        debugger.continue_execution().unwrap();
        assert_eq!(info.line.take(), Some(4));
    }

    let result = debugger.continue_execution();
    assert!(matches!(result, Err(Error::ProcessExit(0))));

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_breakpoint_byte_patching_round_trip() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::default()).unwrap();
    debugger.start_debugee().unwrap();

    let addr = debugger.set_breakpoint_at_line("calc.c", 20).unwrap();
    let patched = debugger.read_word(addr).unwrap();
    assert_eq!(patched & 0xff, 0xCC);

    debugger.remove_breakpoint_at_addr(addr).unwrap();
    let restored = debugger.read_word(addr).unwrap();
    assert_ne!(restored & 0xff, 0xCC);
    assert_eq!(restored & !0xff, patched & !0xff);

    // re-enabling installs the very same trap byte
    debugger.set_breakpoint_at_addr(addr).unwrap();
    assert_eq!(debugger.read_word(addr).unwrap(), patched);

    debugger.remove_breakpoint_at_addr(addr).unwrap();
    assert_eq!(debugger.read_word(addr).unwrap(), restored);
}

#[test]
#[serial]
fn test_breakpoint_insert_is_idempotent() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::default()).unwrap();
    debugger.start_debugee().unwrap();

    let addr = debugger.set_breakpoint_at_line("calc.c", 20).unwrap();
    let patched = debugger.read_word(addr).unwrap();

    // second insert at the same address is a no-op
    debugger.set_breakpoint_at_addr(addr).unwrap();
    assert_eq!(debugger.read_word(addr).unwrap(), patched);
    assert_eq!(debugger.breakpoints_snapshot().len(), 1);

    debugger.remove_breakpoint_at_addr(addr).unwrap();
    assert!(debugger.breakpoints_snapshot().is_empty());
}
