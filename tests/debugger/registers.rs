use crate::common::{prepare_debugee_process, TestHooks};
use crate::HELLO_APP;
use faultline::debugger::address::RelocatedAddress;
use faultline::debugger::Debugger;
use serial_test::serial;

#[test]
#[serial]
fn test_register_write_read_round_trip() {
    let pid = prepare_debugee_process(HELLO_APP, &[]);
    let debugger = Debugger::new(HELLO_APP, pid, TestHooks::default()).unwrap();
    debugger.start_debugee().unwrap();

    debugger.set_register_value("r12", 0xdead_beef).unwrap();
    assert_eq!(debugger.get_register_value("r12").unwrap(), 0xdead_beef);
}

#[test]
#[serial]
fn test_memory_write_read_round_trip() {
    let pid = prepare_debugee_process(HELLO_APP, &[]);
    let debugger = Debugger::new(HELLO_APP, pid, TestHooks::default()).unwrap();
    debugger.start_debugee().unwrap();

    let stack_top = RelocatedAddress::from(debugger.get_register_value("rsp").unwrap());
    debugger.write_word(stack_top, 0x1122_3344_5566_7788).unwrap();
    assert_eq!(debugger.read_word(stack_top).unwrap(), 0x1122_3344_5566_7788);
}

#[test]
#[serial]
fn test_register_dump_contains_whole_file() {
    let pid = prepare_debugee_process(HELLO_APP, &[]);
    let debugger = Debugger::new(HELLO_APP, pid, TestHooks::default()).unwrap();
    debugger.start_debugee().unwrap();

    let dump = debugger.dump_registers().unwrap();
    assert_eq!(dump.len(), 27);
    assert!(dump.iter().any(|(name, value)| *name == "rip" && *value != 0));
}
