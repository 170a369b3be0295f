//! An in-memory basic-block representation, built through [`Target`].
//!
//! Every instruction that yields something defines a fresh numbered
//! register, local to its function. Blocks are numbered in creation order
//! and printed as `label.index`.

use std::fmt;

use crate::{
    ast::Intrinsic,
    target::{ArithOp, CmpOp, Target},
};

pub mod interp;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FuncId(u32);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockId {
    pub func: FuncId,
    pub index: u32,
}

/// A register holding an integer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Value(u32);

/// A register holding the address of a stack cell.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Addr(u32);

impl FuncId {
    fn from_index(index: usize) -> FuncId {
        FuncId(u32::try_from(index).expect("function count fits in u32"))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Value {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Addr {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inst {
    Const { dst: Value, value: i32 },
    Param { dst: Value, index: usize },
    Alloca { dst: Addr, count: u32 },
    Offset { dst: Addr, base: Addr, offset: Value },
    Load { dst: Value, addr: Addr },
    Store { value: Value, addr: Addr },
    Arith { dst: Value, op: ArithOp, lhs: Value, rhs: Value },
    Cmp { dst: Value, op: CmpOp, lhs: Value, rhs: Value },
    Call { dst: Value, callee: FuncId, args: Vec<Value> },
    Intrinsic { dst: Value, intrinsic: Intrinsic, addr: Addr },
    Phi { dst: Value, incoming: Vec<(Value, BlockId)> },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    Jump(BlockId),
    Branch {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return(Value),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    pub label: Box<str>,
    pub insts: Vec<Inst>,
    pub terminator: Option<Terminator>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: Box<str>,
    pub params: Vec<Box<str>>,
    pub blocks: Vec<Block>,
    registers: u32,
}

impl Function {
    /// A function without blocks is only declared; its body lives elsewhere.
    pub fn is_external(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index as usize]
    }

    pub fn register_count(&self) -> usize {
        self.registers as usize
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    functions: Vec<Function>,
    cursor: Option<BlockId>,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("block `{label}` in `{function}` has no terminator")]
    Unterminated { function: Box<str>, label: Box<str> },
    #[error("phi in block `{label}` of `{function}` follows another instruction")]
    MisplacedPhi { function: Box<str>, label: Box<str> },
}

impl Module {
    pub fn new() -> Module {
        Module::default()
    }

    pub fn functions(&self) -> &[Function] {
        &self.functions
    }

    pub fn function(&self, id: FuncId) -> &Function {
        &self.functions[id.index()]
    }

    pub fn find(&self, name: &str) -> Option<FuncId> {
        let index = self.functions.iter().position(|f| &*f.name == name)?;
        Some(FuncId::from_index(index))
    }

    /// Checks that every block ends in a terminator and that phis come first.
    pub fn verify(&self) -> Result<(), VerifyError> {
        for function in &self.functions {
            for block in &function.blocks {
                let is_phi = |inst: &&Inst| matches!(inst, Inst::Phi { .. });
                if block.terminator.is_none() {
                    return Err(VerifyError::Unterminated {
                        function: function.name.clone(),
                        label: block.label.clone(),
                    });
                }
                let leading = block.insts.iter().take_while(is_phi).count();
                if block.insts.iter().filter(is_phi).count() != leading {
                    return Err(VerifyError::MisplacedPhi {
                        function: function.name.clone(),
                        label: block.label.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn cursor(&self) -> BlockId {
        self.cursor.expect("no insertion point set")
    }

    fn current_function(&mut self) -> &mut Function {
        let func = self.cursor().func;
        &mut self.functions[func.index()]
    }

    fn fresh(&mut self) -> u32 {
        let function = self.current_function();
        let register = function.registers;
        function.registers += 1;
        register
    }

    fn push(&mut self, inst: Inst) {
        let index = self.cursor().index as usize;
        self.current_function().blocks[index].insts.push(inst);
    }

    fn terminate(&mut self, terminator: Terminator) {
        let index = self.cursor().index as usize;
        let block = &mut self.current_function().blocks[index];
        debug_assert!(block.terminator.is_none(), "block `{}` terminated twice", block.label);
        block.terminator = Some(terminator);
    }

    fn define(&mut self, make: impl FnOnce(Value) -> Inst) -> Value {
        let dst = Value(self.fresh());
        self.push(make(dst));
        dst
    }

    fn define_addr(&mut self, make: impl FnOnce(Addr) -> Inst) -> Addr {
        let dst = Addr(self.fresh());
        self.push(make(dst));
        dst
    }
}

impl Target for Module {
    type Function = FuncId;
    type Block = BlockId;
    type Value = Value;
    type Slot = Addr;

    fn create_function(&mut self, name: &str, params: &[Box<str>]) -> FuncId {
        let id = FuncId::from_index(self.functions.len());
        self.functions.push(Function {
            name: name.into(),
            params: params.to_vec(),
            blocks: Vec::new(),
            registers: 0,
        });
        id
    }

    fn param(&mut self, function: FuncId, index: usize) -> Value {
        debug_assert_eq!(self.cursor().func, function);
        self.define(|dst| Inst::Param { dst, index })
    }

    fn create_basic_block(&mut self, function: FuncId, label: &str) -> BlockId {
        let blocks = &mut self.functions[function.index()].blocks;
        let index = u32::try_from(blocks.len()).expect("block count fits in u32");
        blocks.push(Block {
            label: label.into(),
            insts: Vec::new(),
            terminator: None,
        });
        BlockId {
            func: function,
            index,
        }
    }

    fn set_insertion_point(&mut self, block: BlockId) {
        self.cursor = Some(block);
    }

    fn allocate_stack_slot(&mut self, count: u32) -> Addr {
        self.define_addr(|dst| Inst::Alloca { dst, count })
    }

    fn load(&mut self, addr: Addr) -> Value {
        self.define(|dst| Inst::Load { dst, addr })
    }

    fn store(&mut self, value: Value, addr: Addr) {
        self.push(Inst::Store { value, addr });
    }

    fn index_into(&mut self, base: Addr, offset: Value) -> Addr {
        self.define_addr(|dst| Inst::Offset { dst, base, offset })
    }

    fn constant(&mut self, value: i32) -> Value {
        self.define(|dst| Inst::Const { dst, value })
    }

    fn emit_arithmetic(&mut self, op: ArithOp, lhs: Value, rhs: Value) -> Value {
        self.define(|dst| Inst::Arith { dst, op, lhs, rhs })
    }

    fn emit_compare(&mut self, op: CmpOp, lhs: Value, rhs: Value) -> Value {
        self.define(|dst| Inst::Cmp { dst, op, lhs, rhs })
    }

    fn emit_call(&mut self, callee: FuncId, args: &[Value]) -> Value {
        self.define(|dst| Inst::Call {
            dst,
            callee,
            args: args.to_vec(),
        })
    }

    fn emit_intrinsic(&mut self, intrinsic: Intrinsic, addr: Addr) -> Value {
        self.define(|dst| Inst::Intrinsic {
            dst,
            intrinsic,
            addr,
        })
    }

    fn branch(&mut self, target: BlockId) {
        self.terminate(Terminator::Jump(target));
    }

    fn conditional_branch(&mut self, cond: Value, then_block: BlockId, else_block: BlockId) {
        self.terminate(Terminator::Branch {
            cond,
            then_block,
            else_block,
        });
    }

    fn merge_values(&mut self, incoming: &[(Value, BlockId)]) -> Value {
        self.define(|dst| Inst::Phi {
            dst,
            incoming: incoming.to_vec(),
        })
    }

    fn return_value(&mut self, value: Value) {
        self.terminate(Terminator::Return(value));
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, function) in self.functions.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            self.fmt_function(f, function)?;
        }
        Ok(())
    }
}

impl Module {
    fn fmt_function(&self, f: &mut fmt::Formatter<'_>, function: &Function) -> fmt::Result {
        let params = function.params.join(", ");
        if function.is_external() {
            return writeln!(f, "declare {}({params})", function.name);
        }
        writeln!(f, "define {}({params}) {{", function.name)?;
        let label = |id: BlockId| {
            let block = function.block(id);
            format!("{}.{}", block.label, id.index)
        };
        for (index, block) in function.blocks.iter().enumerate() {
            writeln!(f, "{}.{index}:", block.label)?;
            for inst in &block.insts {
                f.write_str("  ")?;
                match inst {
                    Inst::Const { dst, value } => writeln!(f, "{dst} = const {value}")?,
                    Inst::Param { dst, index } => writeln!(f, "{dst} = param {index}")?,
                    Inst::Alloca { dst, count } => writeln!(f, "{dst} = alloca {count}")?,
                    Inst::Offset { dst, base, offset } => {
                        writeln!(f, "{dst} = offset {base}, {offset}")?;
                    }
                    Inst::Load { dst, addr } => writeln!(f, "{dst} = load {addr}")?,
                    Inst::Store { value, addr } => writeln!(f, "store {value}, {addr}")?,
                    Inst::Arith { dst, op, lhs, rhs } => writeln!(f, "{dst} = {op} {lhs}, {rhs}")?,
                    Inst::Cmp { dst, op, lhs, rhs } => {
                        writeln!(f, "{dst} = cmp {op} {lhs}, {rhs}")?;
                    }
                    Inst::Call { dst, callee, args } => {
                        let args = args.iter().map(Value::to_string).collect::<Vec<_>>();
                        let name = &self.function(*callee).name;
                        writeln!(f, "{dst} = call {name}({})", args.join(", "))?;
                    }
                    Inst::Intrinsic {
                        dst,
                        intrinsic,
                        addr,
                    } => writeln!(f, "{dst} = intrinsic {}({addr})", intrinsic.name())?,
                    Inst::Phi { dst, incoming } => {
                        let incoming = incoming
                            .iter()
                            .map(|(value, block)| format!("[{value}, {}]", label(*block)))
                            .collect::<Vec<_>>();
                        writeln!(f, "{dst} = phi {}", incoming.join(", "))?;
                    }
                }
            }
            f.write_str("  ")?;
            match &block.terminator {
                Some(Terminator::Jump(target)) => writeln!(f, "jump {}", label(*target))?,
                Some(Terminator::Branch {
                    cond,
                    then_block,
                    else_block,
                }) => writeln!(
                    f,
                    "branch {cond}, {}, {}",
                    label(*then_block),
                    label(*else_block)
                )?,
                Some(Terminator::Return(value)) => writeln!(f, "ret {value}")?,
                None => writeln!(f, "<unterminated>")?,
            }
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn build_abs() -> Module {
        let mut module = Module::new();
        let abs = module.create_function("abs", &["n".into()]);
        let entry = module.create_basic_block(abs, "entry");
        let neg = module.create_basic_block(abs, "neg");
        let done = module.create_basic_block(abs, "done");

        module.set_insertion_point(entry);
        let n = module.param(abs, 0);
        let zero = module.constant(0);
        let is_neg = module.emit_compare(CmpOp::Lt, n, zero);
        module.conditional_branch(is_neg, neg, done);

        module.set_insertion_point(neg);
        let negated = module.emit_arithmetic(ArithOp::Sub, zero, n);
        module.branch(done);

        module.set_insertion_point(done);
        let result = module.merge_values(&[(n, entry), (negated, neg)]);
        module.return_value(result);
        module
    }

    #[test]
    fn test_display() {
        let mut module = build_abs();
        module.create_function("printi", &["x".into()]);
        ::pretty_assertions::assert_eq!(
            module.to_string(),
            indoc! {"
                define abs(n) {
                entry.0:
                  %0 = param 0
                  %1 = const 0
                  %2 = cmp lt %0, %1
                  branch %2, neg.1, done.2
                neg.1:
                  %3 = sub %1, %0
                  jump done.2
                done.2:
                  %4 = phi [%0, entry.0], [%3, neg.1]
                  ret %4
                }

                declare printi(x)
            "}
        );
    }

    #[test]
    fn test_verify() {
        let module = build_abs();
        assert_eq!(module.verify(), Ok(()));
        assert_eq!(module.find("abs"), Some(FuncId(0)));
        assert_eq!(module.find("missing"), None);

        let mut module = Module::new();
        let f = module.create_function("f", &[]);
        let entry = module.create_basic_block(f, "entry");
        module.set_insertion_point(entry);
        module.constant(1);
        assert_eq!(
            module.verify(),
            Err(VerifyError::Unterminated {
                function: "f".into(),
                label: "entry".into(),
            })
        );
    }

    #[test]
    fn test_ids_follow_creation_order() {
        let mut module = Module::new();
        let f = module.create_function("f", &[]);
        let g = module.create_function("g", &[]);
        assert_eq!(module.find("g"), Some(g));
        assert_eq!(g.index(), 1);

        module.create_basic_block(f, "entry");
        let first = module.create_basic_block(g, "entry");
        let second = module.create_basic_block(g, "next");
        assert_eq!((first.func, first.index), (g, 0));
        assert_eq!((second.func, second.index), (g, 1));
    }

    #[test]
    fn test_registers_are_per_function() {
        let mut module = Module::new();
        let f = module.create_function("f", &[]);
        let g = module.create_function("g", &[]);
        let f_entry = module.create_basic_block(f, "entry");
        let g_entry = module.create_basic_block(g, "entry");

        module.set_insertion_point(f_entry);
        assert_eq!(module.constant(1), Value(0));
        module.set_insertion_point(g_entry);
        assert_eq!(module.constant(2), Value(0));
        module.set_insertion_point(f_entry);
        assert_eq!(module.constant(3), Value(1));

        assert_eq!(module.function(f).register_count(), 2);
        assert!(!module.function(g).is_external());
    }
}
