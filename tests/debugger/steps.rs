use crate::common::{prepare_debugee_process, DebugeeRunInfo, TestHooks};
use crate::{assert_no_proc, CALC_APP};
use faultline::debugger::{Debugger, Error};
use serial_test::serial;
use std::mem;

#[test]
#[serial]
fn test_step_over() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_breakpoint_at_fn("main").unwrap();
    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(19));

    // the calls into sum3 and twice stay invisible
    debugger.step_over().unwrap();
    assert_eq!(info.line.take(), Some(20));
    debugger.step_over().unwrap();
    assert_eq!(info.line.take(), Some(21));

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_step_over_leaves_user_breakpoints_in_place() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_breakpoint_at_fn("main").unwrap();
    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(19));

    debugger.set_breakpoint_at_line("calc.c", 21).unwrap();
    let mut expected = debugger.breakpoints_snapshot();
    expected.sort();

    debugger.step_over().unwrap();
    assert_eq!(info.line.take(), Some(20));

    // no temporary breakpoint survived, no user breakpoint disappeared
    let mut actual = debugger.breakpoints_snapshot();
    actual.sort();
    assert_eq!(actual, expected);

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_step_into_descends_into_calls() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_breakpoint_at_fn("main").unwrap();
    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(19));

    debugger.step_into().unwrap();
    assert_eq!(info.line.take(), Some(8));
    assert!(info.file.take().unwrap().ends_with("calc.c"));

    debugger.step_into().unwrap();
    assert_eq!(info.line.take(), Some(9));

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_step_out_returns_to_call_site() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_breakpoint_at_fn("sum2").unwrap();
    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(4));

    debugger.step_out().unwrap();
    assert_eq!(info.line.take(), Some(9));

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_step_out_of_main_runs_close_to_completion() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_breakpoint_at_fn("main").unwrap();
    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(19));

    // stops on the temporary breakpoint at main's return address
    debugger.step_out().unwrap();

    let result = debugger.continue_execution();
    assert!(matches!(result, Err(Error::ProcessExit(0))));
    assert_eq!(info.exit_code.take(), Some(0));

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_backtrace_walks_to_main() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_breakpoint_at_fn("sum2").unwrap();
    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(4));

    let backtrace = debugger.backtrace().unwrap();
    let names: Vec<&str> = backtrace
        .iter()
        .map(|frame| frame.func_name.as_str())
        .collect();
    assert_eq!(names, vec!["sum2", "sum3", "main"]);

    mem::drop(debugger);
    assert_no_proc!(pid);
}

#[test]
#[serial]
fn test_read_variables_in_frame() {
    let pid = prepare_debugee_process(CALC_APP, &[]);
    let info = DebugeeRunInfo::default();
    let debugger = Debugger::new(CALC_APP, pid, TestHooks::new(info.clone())).unwrap();
    debugger.start_debugee().unwrap();

    // line 5: `r` of the first sum2(1, 2) call is already assigned
    debugger.set_breakpoint_at_line("calc.c", 5).unwrap();
    debugger.continue_execution().unwrap();
    assert_eq!(info.line.take(), Some(5));

    let vars = debugger.read_variables().unwrap();
    let r = vars.iter().find(|var| var.name == "r").expect("r exists");
    assert_eq!(r.value as u32, 3);

    mem::drop(debugger);
    assert_no_proc!(pid);
}
