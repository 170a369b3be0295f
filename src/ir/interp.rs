//! A reference interpreter for [`Module`].
//!
//! Memory is a list of zero-initialized allocations, one per executed
//! `alloca`; an address is an allocation plus an element index. Arithmetic
//! wraps on overflow. `readln` consumes the provided input and `writeln` and
//! `printi` append to the output.

use std::collections::VecDeque;

use crate::{
    ast::Intrinsic,
    ir::{Addr, FuncId, Inst, Module, Terminator, Value},
    lower::ENTRY_POINT,
    target::ArithOp,
};

#[derive(Clone, Debug)]
pub struct Config {
    /// Instructions executed before giving up.
    pub step_limit: u64,
    pub max_call_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            step_limit: 10_000_000,
            max_call_depth: 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: i32,
    pub output: Vec<i32>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("module has no `main` function")]
    MissingEntryPoint,
    #[error("division by zero")]
    DivisionByZero,
    #[error("memory access out of bounds")]
    OutOfBounds,
    #[error("`readln` ran out of input")]
    InputExhausted,
    #[error("call to undefined function `{0}`")]
    UnknownExternal(Box<str>),
    #[error("call depth exceeded {0}")]
    CallDepthExceeded(usize),
    #[error("step limit of {0} exceeded")]
    StepLimitExceeded(u64),
    #[error("malformed module: {0}")]
    Malformed(&'static str),
}

/// Runs the module's entry point to completion.
pub fn run(
    module: &Module,
    input: impl IntoIterator<Item = i32>,
    config: &Config,
) -> Result<Outcome, Error> {
    let main = module.find(ENTRY_POINT).ok_or(Error::MissingEntryPoint)?;
    let mut machine = Machine::new(module, config, input);
    let exit_code = machine.call(main, &[], 0)?;
    Ok(Outcome {
        exit_code,
        output: machine.output,
    })
}

#[derive(Copy, Clone, Debug)]
enum Reg {
    Undef,
    Int(i32),
    Ptr { alloc: usize, index: i64 },
}

struct Machine<'m> {
    module: &'m Module,
    config: &'m Config,
    input: VecDeque<i32>,
    output: Vec<i32>,
    memory: Vec<Vec<i32>>,
    steps: u64,
}

struct Frame {
    regs: Vec<Reg>,
}

impl Frame {
    fn int(&self, value: Value) -> Result<i32, Error> {
        match self.regs.get(value.index()) {
            Some(Reg::Int(value)) => Ok(*value),
            _ => Err(Error::Malformed("expected an integer register")),
        }
    }

    fn ptr(&self, addr: Addr) -> Result<(usize, i64), Error> {
        match self.regs.get(addr.index()) {
            Some(Reg::Ptr { alloc, index }) => Ok((*alloc, *index)),
            _ => Err(Error::Malformed("expected an address register")),
        }
    }

    fn set(&mut self, index: usize, reg: Reg) -> Result<(), Error> {
        let slot = self
            .regs
            .get_mut(index)
            .ok_or(Error::Malformed("register out of range"))?;
        *slot = reg;
        Ok(())
    }
}

impl<'m> Machine<'m> {
    fn new(module: &'m Module, config: &'m Config, input: impl IntoIterator<Item = i32>) -> Self {
        Machine {
            module,
            config,
            input: input.into_iter().collect(),
            output: Vec::new(),
            memory: Vec::new(),
            steps: 0,
        }
    }

    /// Calls a function. Stack slots allocated by the callee are released
    /// when it returns.
    fn call(&mut self, id: FuncId, args: &[i32], depth: usize) -> Result<i32, Error> {
        let function = self.module.function(id);
        if function.is_external() {
            return self.call_external(&function.name, args);
        }
        if depth >= self.config.max_call_depth {
            return Err(Error::CallDepthExceeded(self.config.max_call_depth));
        }
        let mark = self.memory.len();
        let result = self.execute_body(id, args, depth);
        self.memory.truncate(mark);
        result
    }

    fn execute_body(&mut self, id: FuncId, args: &[i32], depth: usize) -> Result<i32, Error> {
        let function = self.module.function(id);

        let mut frame = Frame {
            regs: vec![Reg::Undef; function.register_count()],
        };
        let mut block = 0;
        let mut predecessor = None;
        loop {
            let current = function
                .blocks
                .get(block)
                .ok_or(Error::Malformed("branch to a missing block"))?;

            // Phis read the registers as they were on entry.
            let mut merged = Vec::new();
            for inst in &current.insts {
                let Inst::Phi { dst, incoming } = inst else {
                    break;
                };
                let from = predecessor.ok_or(Error::Malformed("phi in the entry block"))?;
                let (value, _) = incoming
                    .iter()
                    .find(|(_, block)| block.index as usize == from)
                    .ok_or(Error::Malformed("phi has no value for its predecessor"))?;
                merged.push((*dst, frame.int(*value)?));
            }
            for (dst, value) in merged {
                frame.set(dst.index(), Reg::Int(value))?;
            }

            for inst in &current.insts {
                self.tick()?;
                self.execute(&mut frame, inst, args, depth)?;
            }

            self.tick()?;
            predecessor = Some(block);
            match &current.terminator {
                Some(Terminator::Jump(target)) => block = target.index as usize,
                Some(Terminator::Branch {
                    cond,
                    then_block,
                    else_block,
                }) => {
                    let target = if frame.int(*cond)? != 0 {
                        then_block
                    } else {
                        else_block
                    };
                    block = target.index as usize;
                }
                Some(Terminator::Return(value)) => return frame.int(*value),
                None => return Err(Error::Malformed("block without terminator")),
            }
        }
    }

    fn execute(
        &mut self,
        frame: &mut Frame,
        inst: &Inst,
        args: &[i32],
        depth: usize,
    ) -> Result<(), Error> {
        let (dst, reg) = match inst {
            Inst::Phi { .. } => return Ok(()),
            Inst::Const { dst, value } => (dst.index(), Reg::Int(*value)),
            Inst::Param { dst, index } => {
                let value = args
                    .get(*index)
                    .ok_or(Error::Malformed("parameter out of range"))?;
                (dst.index(), Reg::Int(*value))
            }
            Inst::Alloca { dst, count } => {
                self.memory.push(vec![0; *count as usize]);
                let alloc = self.memory.len() - 1;
                (dst.index(), Reg::Ptr { alloc, index: 0 })
            }
            Inst::Offset { dst, base, offset } => {
                let (alloc, index) = frame.ptr(*base)?;
                let index = index + i64::from(frame.int(*offset)?);
                (dst.index(), Reg::Ptr { alloc, index })
            }
            Inst::Load { dst, addr } => {
                let value = *self.cell(frame.ptr(*addr)?)?;
                (dst.index(), Reg::Int(value))
            }
            Inst::Store { value, addr } => {
                let value = frame.int(*value)?;
                *self.cell(frame.ptr(*addr)?)? = value;
                return Ok(());
            }
            Inst::Arith { dst, op, lhs, rhs } => {
                let value = arithmetic(*op, frame.int(*lhs)?, frame.int(*rhs)?)?;
                (dst.index(), Reg::Int(value))
            }
            Inst::Cmp { dst, op, lhs, rhs } => {
                let holds = op.holds(frame.int(*lhs)?, frame.int(*rhs)?);
                (dst.index(), Reg::Int(i32::from(holds)))
            }
            Inst::Call { dst, callee, args } => {
                let args = args
                    .iter()
                    .map(|arg| frame.int(*arg))
                    .collect::<Result<Vec<_>, _>>()?;
                let value = self.call(*callee, &args, depth + 1)?;
                (dst.index(), Reg::Int(value))
            }
            Inst::Intrinsic {
                dst,
                intrinsic,
                addr,
            } => {
                let value = match intrinsic {
                    Intrinsic::Readln => self.input.pop_front().ok_or(Error::InputExhausted)?,
                    Intrinsic::Inc => self.cell(frame.ptr(*addr)?)?.wrapping_add(1),
                    Intrinsic::Dec => self.cell(frame.ptr(*addr)?)?.wrapping_sub(1),
                };
                *self.cell(frame.ptr(*addr)?)? = value;
                (dst.index(), Reg::Int(value))
            }
        };
        frame.set(dst, reg)
    }

    fn call_external(&mut self, name: &str, args: &[i32]) -> Result<i32, Error> {
        match (name, args) {
            ("writeln" | "printi", [value]) => {
                self.output.push(*value);
                Ok(0)
            }
            _ => Err(Error::UnknownExternal(name.into())),
        }
    }

    fn cell(&mut self, (alloc, index): (usize, i64)) -> Result<&mut i32, Error> {
        let allocation = self
            .memory
            .get_mut(alloc)
            .ok_or(Error::Malformed("address of a released stack slot"))?;
        usize::try_from(index)
            .ok()
            .and_then(|index| allocation.get_mut(index))
            .ok_or(Error::OutOfBounds)
    }

    fn tick(&mut self) -> Result<(), Error> {
        self.steps += 1;
        if self.steps > self.config.step_limit {
            return Err(Error::StepLimitExceeded(self.config.step_limit));
        }
        Ok(())
    }
}

fn arithmetic(op: ArithOp, lhs: i32, rhs: i32) -> Result<i32, Error> {
    Ok(match op {
        ArithOp::Add => lhs.wrapping_add(rhs),
        ArithOp::Sub => lhs.wrapping_sub(rhs),
        ArithOp::Mul => lhs.wrapping_mul(rhs),
        ArithOp::Div | ArithOp::Rem if rhs == 0 => return Err(Error::DivisionByZero),
        ArithOp::Div => lhs.wrapping_div(rhs),
        ArithOp::Rem => lhs.wrapping_rem(rhs),
        ArithOp::And => lhs & rhs,
        ArithOp::Or => lhs | rhs,
    })
}
