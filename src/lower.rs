use std::fmt;

use crate::{
    ast::{
        BinaryOperator, Direction, Function, FunctionKind, Intrinsic, Node, Program, Prototype,
        VariableDecl,
    },
    scope::{Binding, FunctionEntry, Globals, Locals, Shape},
    target::{ArithOp, CmpOp, Target},
};

/// Name of the function the top-level declarations and block lower into.
pub const ENTRY_POINT: &str = "main";

/// Library routines taking one integer, callable like user functions.
pub const LIBRARY_FUNCTIONS: &[&str] = &["writeln", "printi"];

type Result<T, E = Error> = std::result::Result<T, E>;

/// Lowers a whole program into `target`. The entry point returns zero.
pub fn lower_program<T: Target>(target: &mut T, program: &Program) -> Result<()> {
    Lowerer::new(target).lower_program(program)
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("{kind} `{name}` is already declared")]
    Redeclaration { kind: SymbolKind, name: Box<str> },
    #[error("unknown identifier `{0}`")]
    UnknownIdentifier(Box<str>),
    #[error("unknown function `{0}`")]
    UnknownFunction(Box<str>),
    #[error("`{function}` takes {expected} argument(s) but {actual} were supplied")]
    ArgumentCountMismatch {
        function: Box<str>,
        expected: usize,
        actual: usize,
    },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
    #[error("cannot assign to constant `{0}`")]
    AssignToConstant(Box<str>),
    #[error("loop variable `{0}` must be an integer variable")]
    InvalidLoopVariable(Box<str>),
    #[error("`{0}` is not an array")]
    NotAnArray(Box<str>),
    #[error("array `{0}` used without an index")]
    MissingIndex(Box<str>),
    #[error("function `{0}` is already defined")]
    FunctionRedefinition(Box<str>),
    #[error("`{function}` was declared with {declared} parameter(s) but has {actual}")]
    SignatureMismatch {
        function: Box<str>,
        declared: usize,
        actual: usize,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Constant,
    Variable,
    Parameter,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SymbolKind::Constant => "constant",
            SymbolKind::Variable => "variable",
            SymbolKind::Parameter => "parameter",
        })
    }
}

fn compare_op(op: BinaryOperator) -> CmpOp {
    match op {
        BinaryOperator::Lt => CmpOp::Lt,
        BinaryOperator::Le => CmpOp::Le,
        BinaryOperator::Gt => CmpOp::Gt,
        BinaryOperator::Ge => CmpOp::Ge,
        BinaryOperator::Eq => CmpOp::Eq,
        _ => CmpOp::Ne,
    }
}

enum Resolved<S> {
    Local(Binding<S>),
    Constant(i32),
}

/// State of one compilation: the global tables plus a stack of the
/// functions being lowered. Function definitions nest inside the entry
/// point, so the stack is at most two deep.
struct Lowerer<'t, T: Target> {
    target: &'t mut T,
    globals: Globals<T::Function>,
    frames: Vec<Frame<T>>,
}

struct Frame<T: Target> {
    function: T::Function,
    name: Box<str>,
    kind: FunctionKind,
    locals: Locals<T::Slot>,
    current: T::Block,
    return_block: T::Block,
    /// Every edge into `return_block` with the value it carries.
    returns: Vec<(T::Value, T::Block)>,
}

impl<'t, T: Target> Lowerer<'t, T> {
    fn new(target: &'t mut T) -> Lowerer<'t, T> {
        Lowerer {
            target,
            globals: Globals::with_capacity(16),
            frames: Vec::with_capacity(2),
        }
    }

    fn lower_program(mut self, program: &Program) -> Result<()> {
        let main = self.target.create_function(ENTRY_POINT, &[]);
        self.globals.register_function(
            ENTRY_POINT,
            FunctionEntry {
                handle: main,
                arity: 0,
                defined: true,
            },
        );
        self.enter(main, ENTRY_POINT, FunctionKind::Procedure);

        let param: Box<str> = "x".into();
        for &name in LIBRARY_FUNCTIONS {
            let handle = self
                .target
                .create_function(name, std::slice::from_ref(&param));
            let entry = FunctionEntry {
                handle,
                arity: 1,
                defined: true,
            };
            self.globals.register_function(name, entry);
        }

        for declaration in &program.declarations {
            self.lower(declaration)?;
        }
        self.lower(&program.body)?;
        let zero = self.target.constant(0);
        self.finish(zero);
        Ok(())
    }

    /// Lowers a node, returning the value it produces. Declarations produce
    /// none.
    fn lower(&mut self, node: &Node) -> Result<Option<T::Value>> {
        let value = match node {
            Node::Number(value) => self.target.constant(*value),
            Node::ConstantDecl { name, value } => {
                self.globals
                    .define_constant(name, *value)
                    .map_err(|()| Error::Redeclaration {
                        kind: SymbolKind::Constant,
                        name: name.clone(),
                    })?;
                return Ok(None);
            }
            Node::VariableDecl(decl) => {
                self.declare_variable(decl)?;
                return Ok(None);
            }
            Node::Variable(name) => match self.resolve(name)? {
                Resolved::Local(Binding {
                    slot,
                    shape: Shape::Scalar,
                }) => self.target.load(slot),
                Resolved::Local(_) => return Err(Error::MissingIndex(name.clone())),
                Resolved::Constant(value) => self.target.constant(value),
            },
            Node::ArrayElement { name, index } => {
                let slot = self.element_slot(name, index)?;
                self.target.load(slot)
            }
            Node::Binary {
                op: BinaryOperator::Assign,
                lhs,
                rhs,
            } => self.lower_assignment(lhs, rhs)?,
            Node::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs)?,
            Node::If {
                predicate,
                then_arm,
                else_arm,
            } => self.lower_if(predicate, then_arm, else_arm)?,
            Node::While { predicate, body } => self.lower_while(predicate, body)?,
            Node::For {
                variable,
                start,
                end,
                direction,
                body,
            } => self.lower_for(variable, start, end, *direction, body)?,
            Node::Call { callee, args } => self.lower_call(callee, args)?,
            Node::Intrinsic {
                intrinsic,
                argument,
            } => self.lower_intrinsic(*intrinsic, argument)?,
            Node::Return => self.lower_exit(),
            Node::Prototype(prototype) => {
                self.declare_prototype(prototype)?;
                return Ok(None);
            }
            Node::Function(function) => {
                self.lower_function(function)?;
                return Ok(None);
            }
            Node::List(nodes) => {
                let mut last = None;
                for node in nodes {
                    last = self.lower(node)?;
                }
                return Ok(last);
            }
        };
        Ok(Some(value))
    }

    /// Lowers a node whose value is needed, using zero if it has none.
    fn value(&mut self, node: &Node) -> Result<T::Value> {
        match self.lower(node)? {
            Some(value) => Ok(value),
            None => Ok(self.target.constant(0)),
        }
    }

    /// Lowers a node to 1 if its value is nonzero, 0 otherwise.
    fn condition(&mut self, node: &Node) -> Result<T::Value> {
        let value = self.value(node)?;
        Ok(self.booleanize(value))
    }

    fn booleanize(&mut self, value: T::Value) -> T::Value {
        let zero = self.target.constant(0);
        self.target.emit_compare(CmpOp::Ne, value, zero)
    }

    fn declare_variable(&mut self, decl: &VariableDecl) -> Result<()> {
        let binding = if decl.is_array() {
            let storage = self.target.allocate_stack_slot(decl.length);
            let bias = self.target.constant(decl.offset);
            Binding {
                slot: self.target.index_into(storage, bias),
                shape: Shape::Array,
            }
        } else {
            Binding {
                slot: self.target.allocate_stack_slot(1),
                shape: Shape::Scalar,
            }
        };
        self.frame_mut()
            .locals
            .declare(&decl.name, binding)
            .map_err(|()| Error::Redeclaration {
                kind: SymbolKind::Variable,
                name: decl.name.clone(),
            })
    }

    fn resolve(&self, name: &str) -> Result<Resolved<T::Slot>> {
        if let Some(binding) = self.frame().locals.get(name) {
            return Ok(Resolved::Local(binding));
        }
        self.globals
            .constant(name)
            .map(Resolved::Constant)
            .ok_or_else(|| Error::UnknownIdentifier(name.into()))
    }

    /// Resolves a name that denotes writable scalar storage.
    fn scalar_slot(&self, name: &str) -> Result<T::Slot> {
        match self.resolve(name)? {
            Resolved::Local(Binding {
                slot,
                shape: Shape::Scalar,
            }) => Ok(slot),
            Resolved::Local(_) => Err(Error::MissingIndex(name.into())),
            Resolved::Constant(_) => Err(Error::AssignToConstant(name.into())),
        }
    }

    fn element_slot(&mut self, name: &str, index: &Node) -> Result<T::Slot> {
        let Resolved::Local(Binding {
            slot,
            shape: Shape::Array,
        }) = self.resolve(name)?
        else {
            return Err(Error::NotAnArray(name.into()));
        };
        let index = self.value(index)?;
        Ok(self.target.index_into(slot, index))
    }

    /// The right side is evaluated before the target's address. The
    /// assignment yields the stored value.
    fn lower_assignment(&mut self, lhs: &Node, rhs: &Node) -> Result<T::Value> {
        let value = self.value(rhs)?;
        let slot = match lhs {
            Node::Variable(name) => self.scalar_slot(name)?,
            Node::ArrayElement { name, index } => self.element_slot(name, index)?,
            _ => return Err(Error::InvalidAssignmentTarget),
        };
        self.target.store(value, slot);
        Ok(value)
    }

    fn lower_binary(&mut self, op: BinaryOperator, lhs: &Node, rhs: &Node) -> Result<T::Value> {
        let lhs = self.value(lhs)?;
        let rhs = self.value(rhs)?;
        let arith = match op {
            BinaryOperator::Add => ArithOp::Add,
            BinaryOperator::Sub => ArithOp::Sub,
            BinaryOperator::Mul => ArithOp::Mul,
            BinaryOperator::Div => ArithOp::Div,
            BinaryOperator::Mod => ArithOp::Rem,
            // Both logical operators work on booleanized operands.
            BinaryOperator::And | BinaryOperator::Or => {
                let lhs = self.booleanize(lhs);
                let rhs = self.booleanize(rhs);
                let op = match op {
                    BinaryOperator::And => ArithOp::And,
                    _ => ArithOp::Or,
                };
                return Ok(self.target.emit_arithmetic(op, lhs, rhs));
            }
            BinaryOperator::Assign => return Err(Error::InvalidAssignmentTarget),
            _ => {
                let compare = compare_op(op);
                return Ok(self.target.emit_compare(compare, lhs, rhs));
            }
        };
        Ok(self.target.emit_arithmetic(arith, lhs, rhs))
    }

    fn lower_if(&mut self, predicate: &Node, then_arm: &Node, else_arm: &Node) -> Result<T::Value> {
        let cond = self.condition(predicate)?;
        let function = self.frame().function;
        let then_block = self.target.create_basic_block(function, "then");
        let else_block = self.target.create_basic_block(function, "else");
        let merge_block = self.target.create_basic_block(function, "ifcont");
        self.target.conditional_branch(cond, then_block, else_block);

        self.switch_to(then_block);
        let then_value = self.value(then_arm)?;
        let then_end = self.frame().current;
        self.target.branch(merge_block);

        self.switch_to(else_block);
        let else_value = self.value(else_arm)?;
        let else_end = self.frame().current;
        self.target.branch(merge_block);

        self.switch_to(merge_block);
        Ok(self
            .target
            .merge_values(&[(then_value, then_end), (else_value, else_end)]))
    }

    fn lower_while(&mut self, predicate: &Node, body: &Node) -> Result<T::Value> {
        let function = self.frame().function;
        let cond_block = self.target.create_basic_block(function, "cond");
        let body_block = self.target.create_basic_block(function, "loop");
        let exit_block = self.target.create_basic_block(function, "afterloop");
        self.target.branch(cond_block);

        self.switch_to(cond_block);
        let cond = self.condition(predicate)?;
        self.target.conditional_branch(cond, body_block, exit_block);

        self.switch_to(body_block);
        self.lower(body)?;
        self.target.branch(cond_block);

        self.switch_to(exit_block);
        Ok(self.target.constant(0))
    }

    /// Counts the variable from `start` to `end` inclusive. The bound is
    /// evaluated once and tested before the first iteration, so the body does
    /// not run if `start` is already past it. Later iterations are entered
    /// from the step, which tests the value it stepped from.
    fn lower_for(
        &mut self,
        variable: &str,
        start: &Node,
        end: &Node,
        direction: Direction,
        body: &Node,
    ) -> Result<T::Value> {
        let binding = match self.resolve(variable)? {
            Resolved::Local(binding @ Binding {
                shape: Shape::Scalar,
                ..
            }) => binding,
            _ => return Err(Error::InvalidLoopVariable(variable.into())),
        };
        let start = self.value(start)?;
        self.target.store(start, binding.slot);
        let end = self.value(end)?;
        let step = self.target.constant(direction.step());

        let function = self.frame().function;
        let cond_block = self.target.create_basic_block(function, "for.cond");
        let body_block = self.target.create_basic_block(function, "for.body");
        let exit_block = self.target.create_basic_block(function, "for.end");
        self.target.branch(cond_block);

        self.switch_to(cond_block);
        let current = self.target.load(binding.slot);
        let in_bounds = match direction {
            Direction::To => CmpOp::Le,
            Direction::Downto => CmpOp::Ge,
        };
        let cond = self.target.emit_compare(in_bounds, current, end);
        self.target.conditional_branch(cond, body_block, exit_block);

        self.switch_to(body_block);
        let saved = self.frame_mut().locals.shadow(variable, binding);
        self.lower(body)?;
        self.frame_mut().locals.restore(variable, saved);

        // Tested on the pre-step value: the step wraps at the integer edges.
        let current = self.target.load(binding.slot);
        let next = self.target.emit_arithmetic(ArithOp::Add, current, step);
        self.target.store(next, binding.slot);
        let short_of_bound = match direction {
            Direction::To => CmpOp::Lt,
            Direction::Downto => CmpOp::Gt,
        };
        let cond = self.target.emit_compare(short_of_bound, current, end);
        self.target.conditional_branch(cond, body_block, exit_block);

        self.switch_to(exit_block);
        Ok(self.target.constant(0))
    }

    fn lower_call(&mut self, callee: &str, args: &[Node]) -> Result<T::Value> {
        let entry = self
            .globals
            .function(callee)
            .ok_or_else(|| Error::UnknownFunction(callee.into()))?;
        if entry.arity != args.len() {
            return Err(Error::ArgumentCountMismatch {
                function: callee.into(),
                expected: entry.arity,
                actual: args.len(),
            });
        }
        let args = args
            .iter()
            .map(|arg| self.value(arg))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.target.emit_call(entry.handle, &args))
    }

    fn lower_intrinsic(&mut self, intrinsic: Intrinsic, argument: &str) -> Result<T::Value> {
        let slot = self.scalar_slot(argument)?;
        Ok(self.target.emit_intrinsic(intrinsic, slot))
    }

    /// Returns the current result (zero for procedures) and carries on in a
    /// fresh, unreachable block so that trailing statements still have a
    /// place to go.
    fn lower_exit(&mut self) -> T::Value {
        let frame = self.frame();
        let (kind, function, return_block) = (frame.kind, frame.function, frame.return_block);
        let result = match kind {
            FunctionKind::Function => frame.locals.get(&frame.name).map(|binding| binding.slot),
            FunctionKind::Procedure => None,
        };
        let value = match result {
            Some(slot) => self.target.load(slot),
            None => self.target.constant(0),
        };
        let frame = self.frame_mut();
        frame.returns.push((value, frame.current));
        self.target.branch(return_block);

        let after = self.target.create_basic_block(function, "afterexit");
        self.switch_to(after);
        self.target.constant(0)
    }

    fn declare_prototype(&mut self, prototype: &Prototype) -> Result<()> {
        let arity = prototype.params.len();
        match self.globals.function(&prototype.name) {
            Some(entry) if entry.arity != arity => Err(Error::SignatureMismatch {
                function: prototype.name.clone(),
                declared: entry.arity,
                actual: arity,
            }),
            Some(_) => Ok(()),
            None => {
                let handle = self
                    .target
                    .create_function(&prototype.name, &prototype.params);
                let entry = FunctionEntry {
                    handle,
                    arity,
                    defined: false,
                };
                self.globals.register_function(&prototype.name, entry);
                Ok(())
            }
        }
    }

    fn lower_function(&mut self, function: &Function) -> Result<()> {
        let Prototype { name, params, kind } = &function.prototype;
        let handle = match self.globals.function(name) {
            Some(entry) if entry.defined => {
                return Err(Error::FunctionRedefinition(name.clone()));
            }
            Some(entry) if entry.arity != params.len() => {
                return Err(Error::SignatureMismatch {
                    function: name.clone(),
                    declared: entry.arity,
                    actual: params.len(),
                });
            }
            Some(entry) => entry.handle,
            None => self.target.create_function(name, params),
        };
        // Registered before the body so that it may call itself.
        let entry = FunctionEntry {
            handle,
            arity: params.len(),
            defined: true,
        };
        self.globals.register_function(name, entry);

        self.enter(handle, name, *kind);
        for (index, param) in params.iter().enumerate() {
            let slot = self.target.allocate_stack_slot(1);
            let value = self.target.param(handle, index);
            self.target.store(value, slot);
            let binding = Binding {
                slot,
                shape: Shape::Scalar,
            };
            self.frame_mut()
                .locals
                .declare(param, binding)
                .map_err(|()| Error::Redeclaration {
                    kind: SymbolKind::Parameter,
                    name: param.clone(),
                })?;
        }

        let mut result = None;
        for node in &function.body {
            result = self.lower(node)?;
        }
        let result = match result {
            Some(value) => value,
            None => self.target.constant(0),
        };
        self.finish(result);
        Ok(())
    }
}

impl<T: Target> Lowerer<'_, T> {
    fn frame(&self) -> &Frame<T> {
        self.frames.last().expect("lowering always happens inside a function")
    }

    fn frame_mut(&mut self) -> &mut Frame<T> {
        self.frames
            .last_mut()
            .expect("lowering always happens inside a function")
    }

    fn switch_to(&mut self, block: T::Block) {
        self.target.set_insertion_point(block);
        self.frame_mut().current = block;
    }

    /// Starts lowering the body of `function`, with fresh locals.
    fn enter(&mut self, function: T::Function, name: &str, kind: FunctionKind) {
        let entry = self.target.create_basic_block(function, "entry");
        let return_block = self.target.create_basic_block(function, "return");
        self.target.set_insertion_point(entry);
        self.frames.push(Frame {
            function,
            name: name.into(),
            kind,
            locals: Locals::new(),
            current: entry,
            return_block,
            returns: Vec::with_capacity(2),
        });
    }

    /// Falls through into the shared return block with `result` and resumes
    /// the enclosing function, if any.
    fn finish(&mut self, result: T::Value) {
        let Some(mut frame) = self.frames.pop() else {
            return;
        };
        frame.returns.push((result, frame.current));
        self.target.branch(frame.return_block);

        self.target.set_insertion_point(frame.return_block);
        let value = match frame.returns.as_slice() {
            [(value, _)] => *value,
            incoming => self.target.merge_values(incoming),
        };
        self.target.return_value(value);

        if let Some(outer) = self.frames.last() {
            self.target.set_insertion_point(outer.current);
        }
    }
}
