/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST.
pub mod parser;

/// Regroups a flat operand/operator sequence by operator precedence.
pub mod precedence;

/// Lowering resolves names and maps the AST into basic blocks, driving a
/// [`target::Target`].
pub mod lower;

pub mod ast;
pub mod scope;
pub mod target;
pub mod token;

pub mod ir;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

use token::Spanned;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{0}")]
    Parse(#[from] Spanned<parser::Error>),
    #[error("{0}")]
    Lower(#[from] lower::Error),
}

/// Parses and lowers a whole program into a fresh [`ir::Module`].
pub fn compile(src: &str) -> Result<ir::Module, CompileError> {
    let program = parser::parse_program(src)?;
    let mut module = ir::Module::new();
    lower::lower_program(&mut module, &program)?;
    Ok(module)
}
