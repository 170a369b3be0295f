//! The Mila abstract syntax tree.
//!
//! ```text
//! program     ::= "program" ID ";" declaration* block "."
//! declaration ::= var | const | function | procedure
//! var         ::= "var" ( ID ( "," ID )* ":" type ";" )+
//! type        ::= "integer" | "array" "[" INT ".." INT "]" "of" "integer"
//! const       ::= "const" ( ID "=" INT ";" )+
//! function    ::= "function" ID "(" params ")" ":" "integer" ";" body
//! procedure   ::= "procedure" ID "(" params ")" ";" body
//! params      ::= [ ID ":" "integer" ( ";" ID ":" "integer" )* ]
//! body        ::= "forward" ";" | var* block ";"
//! block       ::= "begin" statement ( ";" statement )* [ ";" ] "end"
//! statement   ::= block | if | while | for | command
//! command     ::= lvalue ":=" expr | ID "(" args ")" | "exit"
//!               | ( "readln" | "inc" | "dec" ) "(" ID ")"
//!               | "write" "(" "'" ... "'" ")"
//! expr        ::= operand ( binop operand )*
//! operand     ::= [ "-" ] INT | ID | ID "[" expr "]" | ID "(" args ")" | "(" expr ")"
//! ```

#[derive(Debug, PartialEq, Eq)]
pub struct Program {
    pub name: Box<str>,
    pub declarations: Vec<Node>,
    pub body: Node,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Node {
    Number(i32),
    ConstantDecl {
        name: Box<str>,
        value: i32,
    },
    VariableDecl(VariableDecl),
    Variable(Box<str>),
    ArrayElement {
        name: Box<str>,
        index: Box<Node>,
    },
    Binary {
        op: BinaryOperator,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    If {
        predicate: Box<Node>,
        then_arm: Box<Node>,
        else_arm: Box<Node>,
    },
    While {
        predicate: Box<Node>,
        body: Box<Node>,
    },
    For {
        variable: Box<str>,
        start: Box<Node>,
        end: Box<Node>,
        direction: Direction,
        body: Box<Node>,
    },
    Call {
        callee: Box<str>,
        args: Vec<Node>,
    },
    Intrinsic {
        intrinsic: Intrinsic,
        argument: Box<str>,
    },
    /// `exit`
    Return,
    /// A `forward` declaration.
    Prototype(Prototype),
    Function(Function),
    List(Vec<Node>),
}

impl Node {
    pub fn binary(op: BinaryOperator, lhs: Node, rhs: Node) -> Node {
        Node::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

/// Storage declaration.
///
/// Scalars have both `offset` and `length` set to zero. Arrays span the
/// user-visible indices `-offset ..= length - offset - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: Box<str>,
    pub offset: i32,
    pub length: u32,
}

impl VariableDecl {
    pub fn scalar(name: Box<str>) -> VariableDecl {
        VariableDecl {
            name,
            offset: 0,
            length: 0,
        }
    }

    /// Returns `None` if `high < low`.
    pub fn array(name: Box<str>, low: i32, high: i32) -> Option<VariableDecl> {
        let length = i64::from(high) - i64::from(low) + 1;
        let length = u32::try_from(length).ok().filter(|&len| len > 0)?;
        Some(VariableDecl {
            name,
            offset: low.checked_neg()?,
            length,
        })
    }

    pub fn is_array(&self) -> bool {
        self.length != 0
    }

    /// Inclusive bounds of an array declaration.
    pub fn bounds(&self) -> (i32, i32) {
        let low = -self.offset;
        let high = i64::from(low) + i64::from(self.length) - 1;
        (low, i32::try_from(high).unwrap_or(i32::MAX))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    pub name: Box<str>,
    pub params: Vec<Box<str>>,
    pub kind: FunctionKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FunctionKind {
    /// Returns the value of its result variable.
    Function,
    /// Always returns zero.
    Procedure,
}

impl FunctionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FunctionKind::Function => "function",
            FunctionKind::Procedure => "procedure",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Function {
    pub prototype: Prototype,
    /// Local declarations followed by the statements. The last node yields
    /// the returned value.
    pub body: Vec<Node>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    To,
    Downto,
}

impl Direction {
    pub fn step(self) -> i32 {
        match self {
            Direction::To => 1,
            Direction::Downto => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::To => "to",
            Direction::Downto => "downto",
        }
    }
}

/// Library routines that receive the address of a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Intrinsic {
    Readln,
    Inc,
    Dec,
}

impl Intrinsic {
    pub const fn name(self) -> &'static str {
        match self {
            Intrinsic::Readln => "readln",
            Intrinsic::Inc => "inc",
            Intrinsic::Dec => "dec",
        }
    }
}
