use std::io::{self, Write};

use crate::ast::*;

const INDENT_WIDTH: usize = 2;

pub fn print_program_string(program: &Program) -> String {
    let mut buf = Vec::with_capacity(1024);
    print_program(&mut buf, program).expect("writing to a Vec never fails");
    String::from_utf8(buf).expect("the printer only writes UTF-8")
}

pub fn print_node_string(node: &Node) -> String {
    let mut buf = Vec::with_capacity(512);
    print_node(&mut buf, 0, node).expect("writing to a Vec never fails");
    String::from_utf8(buf).expect("the printer only writes UTF-8")
}

pub fn print_program(w: &mut impl Write, program: &Program) -> io::Result<()> {
    writeln!(w, "program {}", program.name)?;
    for declaration in &program.declarations {
        print_node(w, 1, declaration)?;
    }
    print_node(w, 1, &program.body)
}

pub fn print_node(w: &mut impl Write, i: usize, node: &Node) -> io::Result<()> {
    sp(w, i)?;
    match node {
        Node::Number(value) => writeln!(w, "int {value}")?,
        Node::ConstantDecl { name, value } => writeln!(w, "const {name} = {value}")?,
        Node::VariableDecl(decl) if decl.is_array() => {
            let (low, high) = decl.bounds();
            writeln!(w, "var {}[{low}..{high}]", decl.name)?;
        }
        Node::VariableDecl(decl) => writeln!(w, "var {}", decl.name)?,
        Node::Variable(name) => writeln!(w, "ident {name}")?,
        Node::ArrayElement { name, index } => {
            writeln!(w, "index {name}")?;
            print_node(w, i + 1, index)?;
        }
        Node::Binary { op, lhs, rhs } => {
            writeln!(w, "binary {op:?}")?;
            print_node(w, i + 1, lhs)?;
            print_node(w, i + 1, rhs)?;
        }
        Node::If {
            predicate,
            then_arm,
            else_arm,
        } => {
            writeln!(w, "if")?;
            print_node(w, i + 1, predicate)?;
            print_node(w, i + 1, then_arm)?;
            print_node(w, i + 1, else_arm)?;
        }
        Node::While { predicate, body } => {
            writeln!(w, "while")?;
            print_node(w, i + 1, predicate)?;
            print_node(w, i + 1, body)?;
        }
        Node::For {
            variable,
            start,
            end,
            direction,
            body,
        } => {
            writeln!(w, "for {variable} {}", direction.as_str())?;
            print_node(w, i + 1, start)?;
            print_node(w, i + 1, end)?;
            print_node(w, i + 1, body)?;
        }
        Node::Call { callee, args } => {
            writeln!(w, "call {callee}")?;
            for arg in args {
                print_node(w, i + 1, arg)?;
            }
        }
        Node::Intrinsic {
            intrinsic,
            argument,
        } => writeln!(w, "intrinsic {}({argument})", intrinsic.name())?,
        Node::Return => writeln!(w, "exit")?,
        Node::Prototype(prototype) => {
            write!(w, "forward ")?;
            print_prototype(w, prototype)?;
        }
        Node::Function(Function { prototype, body }) => {
            print_prototype(w, prototype)?;
            for node in body {
                print_node(w, i + 1, node)?;
            }
        }
        Node::List(nodes) => {
            writeln!(w, "block")?;
            for node in nodes {
                print_node(w, i + 1, node)?;
            }
        }
    }
    Ok(())
}

fn print_prototype(w: &mut impl Write, prototype: &Prototype) -> io::Result<()> {
    write!(w, "{} {}(", prototype.kind.as_str(), prototype.name)?;
    for (idx, param) in prototype.params.iter().enumerate() {
        if idx > 0 {
            write!(w, ", ")?;
        }
        write!(w, "{param}")?;
    }
    writeln!(w, ")")
}

fn sp(w: &mut impl Write, i: usize) -> io::Result<()> {
    write!(w, "{:width$}", "", width = i * INDENT_WIDTH)
}
