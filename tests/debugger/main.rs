mod common;

mod breakpoints;
mod localize;
mod registers;
mod steps;
mod symbol;

pub const HELLO_APP: &str = concat!(env!("OUT_DIR"), "/hello");
pub const CALC_APP: &str = concat!(env!("OUT_DIR"), "/calc");
pub const ADDER_APP: &str = concat!(env!("OUT_DIR"), "/adder");
