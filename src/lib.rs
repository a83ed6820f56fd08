//! Source-level debugger for x86_64 linux executables with a
//! spectrum-based fault-localization mode.
//!
//! [`debugger`] contains the debug-control engine and the debug-information
//! resolver, [`console`] the interactive terminal front-end and [`localize`]
//! the coverage-driven fault localizer.

pub mod console;
pub mod debugger;
pub mod localize;
