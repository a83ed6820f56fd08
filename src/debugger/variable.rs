use crate::debugger::address::RelocatedAddress;
use crate::debugger::register::Register;
use std::fmt::{Display, Formatter};

/// A variable of the current frame resolved to its storage and an 8-byte
/// read of its value.
pub struct VariableView {
    pub name: String,
    pub location: VariableLocation,
    pub value: u64,
}

pub enum VariableLocation {
    Address(RelocatedAddress),
    Register(Register),
}

impl Display for VariableView {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            VariableLocation::Address(addr) => {
                write!(f, "{} ({addr}) = {}", self.name, self.value)
            }
            VariableLocation::Register(reg) => {
                write!(f, "{} (reg {}) = {}", self.name, reg.name(), self.value)
            }
        }
    }
}
