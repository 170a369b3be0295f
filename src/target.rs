//! The interface between lowering and a code generator.
//!
//! The lowering engine drives a [`Target`] the way a builder is driven: it
//! creates functions and basic blocks, moves the insertion point, and emits
//! one operation at a time into the current block. Every value is a 32-bit
//! integer; stack slots hold one or more of them.

use std::fmt;

use crate::ast::Intrinsic;

pub trait Target {
    type Function: Copy;
    type Block: Copy;
    type Value: Copy;
    type Slot: Copy;

    /// Creates a function. It stays an external declaration until a basic
    /// block is created in it.
    fn create_function(&mut self, name: &str, params: &[Box<str>]) -> Self::Function;

    /// The value of the incoming argument at `index`.
    fn param(&mut self, function: Self::Function, index: usize) -> Self::Value;

    fn create_basic_block(&mut self, function: Self::Function, label: &str) -> Self::Block;

    fn set_insertion_point(&mut self, block: Self::Block);

    /// Reserves `count` contiguous integers in the current function's frame.
    fn allocate_stack_slot(&mut self, count: u32) -> Self::Slot;

    fn load(&mut self, slot: Self::Slot) -> Self::Value;

    fn store(&mut self, value: Self::Value, slot: Self::Slot);

    /// Addresses the element `offset` integers away from `slot`.
    fn index_into(&mut self, slot: Self::Slot, offset: Self::Value) -> Self::Slot;

    fn constant(&mut self, value: i32) -> Self::Value;

    fn emit_arithmetic(&mut self, op: ArithOp, lhs: Self::Value, rhs: Self::Value) -> Self::Value;

    /// Yields 1 if the comparison holds, 0 otherwise.
    fn emit_compare(&mut self, op: CmpOp, lhs: Self::Value, rhs: Self::Value) -> Self::Value;

    fn emit_call(&mut self, callee: Self::Function, args: &[Self::Value]) -> Self::Value;

    /// Calls a library routine on the variable stored at `slot`.
    fn emit_intrinsic(&mut self, intrinsic: Intrinsic, slot: Self::Slot) -> Self::Value;

    fn branch(&mut self, target: Self::Block);

    /// Branches to `then_block` if `cond` is nonzero.
    fn conditional_branch(
        &mut self,
        cond: Self::Value,
        then_block: Self::Block,
        else_block: Self::Block,
    );

    /// Selects the value matching the predecessor control arrived from.
    fn merge_values(&mut self, incoming: &[(Self::Value, Self::Block)]) -> Self::Value;

    fn return_value(&mut self, value: Self::Value);
}

/// Signed integer arithmetic. `And` and `Or` are bitwise.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
}

impl ArithOp {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            ArithOp::Add => "add",
            ArithOp::Sub => "sub",
            ArithOp::Mul => "mul",
            ArithOp::Div => "div",
            ArithOp::Rem => "rem",
            ArithOp::And => "and",
            ArithOp::Or => "or",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    pub const fn mnemonic(self) -> &'static str {
        match self {
            CmpOp::Lt => "lt",
            CmpOp::Le => "le",
            CmpOp::Gt => "gt",
            CmpOp::Ge => "ge",
            CmpOp::Eq => "eq",
            CmpOp::Ne => "ne",
        }
    }

    pub fn holds(self, lhs: i32, rhs: i32) -> bool {
        match self {
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}
