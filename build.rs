//! Compiles the C debugee fixtures used by the integration tests.

use std::env;
use std::path::PathBuf;
use std::process::Command;

const FIXTURES: &[&str] = &["hello", "calc", "adder"];

fn main() {
    if !(cfg!(target_os = "linux") && cfg!(target_arch = "x86_64") && cfg!(target_env = "gnu")) {
        panic!(
            "{} only works with linux using glibc on x86_64",
            env!("CARGO_PKG_NAME")
        );
    }

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));
    let compiler = cc::Build::new().get_compiler();

    for fixture in FIXTURES {
        let src = PathBuf::from("fixtures").join(format!("{fixture}.c"));
        println!("cargo:rerun-if-changed={}", src.display());

        let status = Command::new(compiler.path())
            .args(["-g", "-O0", "-fno-omit-frame-pointer", "-o"])
            .arg(out_dir.join(fixture))
            .arg(&src)
            .status()
            .unwrap_or_else(|e| panic!("run C compiler for fixture {fixture}: {e}"));
        assert!(status.success(), "compilation of fixture {fixture} failed");
    }
}
