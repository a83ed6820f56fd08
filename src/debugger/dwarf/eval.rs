use crate::debugger::address::{GlobalAddress, RelocatedAddress};
use crate::debugger::dwarf::EndianRcSlice;
use crate::debugger::error::Error;
use crate::debugger::register;
use crate::debugger::tracee::{Tracee, WORD_SIZE};
use gimli::{Encoding, EvaluationResult, Expression, Location, Value};

/// Live-state capability needed to finish a location evaluation: register
/// reads, sized memory dereferences and address relocation, all against
/// the stopped debugee.
pub trait EvalContext {
    fn register(&self, register: gimli::Register) -> Result<u64, Error>;
    fn deref_size(&self, addr: RelocatedAddress, size: u8) -> Result<u64, Error>;
    fn relocate(&self, addr: GlobalAddress) -> RelocatedAddress;
}

/// [`EvalContext`] over a live tracee.
pub struct TraceeContext<'a> {
    tracee: &'a Tracee,
    load_offset: usize,
}

impl<'a> TraceeContext<'a> {
    pub fn new(tracee: &'a Tracee, load_offset: usize) -> Self {
        Self {
            tracee,
            load_offset,
        }
    }
}

impl EvalContext for TraceeContext<'_> {
    fn register(&self, reg: gimli::Register) -> Result<u64, Error> {
        register::get_register_value_dwarf(self.tracee.pid, reg.0)
    }

    fn deref_size(&self, addr: RelocatedAddress, size: u8) -> Result<u64, Error> {
        if size == 0 || size as usize >= WORD_SIZE {
            return self.tracee.read_word(addr);
        }
        let bytes = self.tracee.read_memory(addr, size as usize)?;
        let mut word = [0u8; WORD_SIZE];
        word[..bytes.len()].copy_from_slice(&bytes);
        Ok(u64::from_ne_bytes(word))
    }

    fn relocate(&self, addr: GlobalAddress) -> RelocatedAddress {
        addr.relocate(self.load_offset)
    }
}

#[derive(Default)]
pub struct EvalOptions {
    frame_base: Option<u64>,
}

impl EvalOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_base(self, frame_base: u64) -> Self {
        Self {
            frame_base: Some(frame_base),
        }
    }
}

/// Storage a completed location expression points at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvalResult {
    Address(RelocatedAddress),
    Register(gimli::Register),
}

pub struct ExpressionEvaluator {
    encoding: Encoding,
}

impl ExpressionEvaluator {
    pub fn new(encoding: Encoding) -> Self {
        Self { encoding }
    }

    pub fn evaluate(
        &self,
        expr: Expression<EndianRcSlice>,
        ctx: &dyn EvalContext,
        opts: EvalOptions,
    ) -> Result<EvalResult, Error> {
        let mut eval = expr.evaluation(self.encoding);

        let mut result = eval.evaluate()?;
        while result != EvaluationResult::Complete {
            result = match result {
                EvaluationResult::RequiresRegister { register, .. } => {
                    eval.resume_with_register(Value::Generic(ctx.register(register)?))?
                }
                EvaluationResult::RequiresFrameBase => eval.resume_with_frame_base(
                    opts.frame_base.ok_or(Error::EvalOptionRequired("frame_base"))?,
                )?,
                EvaluationResult::RequiresMemory { address, size, .. } => {
                    let value = ctx.deref_size(RelocatedAddress::from(address), size)?;
                    eval.resume_with_memory(Value::Generic(value))?
                }
                EvaluationResult::RequiresRelocatedAddress(addr) => eval
                    .resume_with_relocated_address(
                        ctx.relocate(GlobalAddress::from(addr)).as_u64(),
                    )?,
                EvaluationResult::RequiresCallFrameCfa => {
                    // classical frame-pointer ABI, no CFI unwinding: the
                    // canonical frame address is two words above rbp
                    let rbp = ctx.register(gimli::X86_64::RBP)?;
                    eval.resume_with_call_frame_cfa(rbp + 2 * WORD_SIZE as u64)?
                }
                _ => return Err(Error::UnsupportedVarLocation("evaluation requirement")),
            };
        }

        let pieces = eval.result();
        match pieces.first().map(|piece| &piece.location) {
            Some(Location::Address { address }) => {
                Ok(EvalResult::Address(RelocatedAddress::from(*address)))
            }
            Some(Location::Register { register }) => Ok(EvalResult::Register(*register)),
            _ => Err(Error::UnsupportedVarLocation("completed location")),
        }
    }
}
