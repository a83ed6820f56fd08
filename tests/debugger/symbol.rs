use crate::common::{prepare_debugee_process, TestHooks};
use crate::HELLO_APP;
use faultline::debugger::{Debugger, Error};
use object::SymbolKind;
use serial_test::serial;

#[test]
#[serial]
fn test_symbol_lookup() {
    let pid = prepare_debugee_process(HELLO_APP, &[]);
    let debugger = Debugger::new(HELLO_APP, pid, TestHooks::default()).unwrap();
    debugger.start_debugee().unwrap();

    let symbols = debugger.lookup_symbol("main").unwrap();
    assert!(!symbols.is_empty());
    assert!(symbols
        .iter()
        .any(|sym| sym.kind == SymbolKind::Text && sym.address != 0));

    let symbols = debugger.lookup_symbol("greet").unwrap();
    assert!(symbols.iter().any(|sym| sym.kind == SymbolKind::Text));
}

#[test]
#[serial]
fn test_unknown_symbol() {
    let pid = prepare_debugee_process(HELLO_APP, &[]);
    let debugger = Debugger::new(HELLO_APP, pid, TestHooks::default()).unwrap();
    debugger.start_debugee().unwrap();

    let result = debugger.lookup_symbol("no_such_symbol_anywhere");
    assert!(matches!(result, Err(Error::SymbolNotFound(_))));
}
