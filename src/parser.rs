use std::{fmt, io::Read};

use crate::{
    ast::{
        BinaryOperator, Direction, Function, FunctionKind, Intrinsic, Node, Program, Prototype,
        VariableDecl,
    },
    lexer::{self, Lexer},
    precedence,
    token::{Keyword, Operator, Span, Spanned, Token, TokenKind},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

pub fn parse_program(src: &str) -> Result<Program> {
    Parser::new(Lexer::new(src)).parse_program()
}

/// Parses a single expression spanning the whole input.
pub fn parse_expr(src: &str) -> Result<Node> {
    let mut p = Parser::new(Lexer::new(src));
    let expr = p.parse_expr()?;
    p.consume(TokenKind::Eof)?;
    Ok(expr)
}

/// Recursive descent parser with one token of lookahead.
///
/// Parsing stops at the first error.
pub struct Parser<R> {
    lexer: Lexer<R>,
}

impl<R: Read> Parser<R> {
    pub fn new(lexer: Lexer<R>) -> Parser<R> {
        Parser { lexer }
    }

    pub fn parse_program(&mut self) -> Result<Program> {
        self.consume(Keyword::Program)?;
        let name = self.parse_ident()?;
        self.consume(Operator::Semicolon)?;
        let declarations = self.parse_declarations()?;
        let body = self.parse_block()?;
        self.consume(Operator::Dot)?;
        self.consume(TokenKind::Eof)?;
        Ok(Program {
            name,
            declarations,
            body,
        })
    }

    fn parse_declarations(&mut self) -> Result<Vec<Node>> {
        let mut declarations = Vec::with_capacity(8);
        loop {
            let token = self.peek()?;
            match token.kind {
                TokenKind::Keyword(Keyword::Var) => declarations.extend(self.parse_var_decl()?),
                TokenKind::Keyword(Keyword::Const) => {
                    declarations.extend(self.parse_const_decl()?);
                }
                TokenKind::Keyword(Keyword::Function | Keyword::Procedure) => {
                    declarations.push(self.parse_subprogram()?);
                }
                TokenKind::Keyword(Keyword::Begin) => return Ok(declarations),
                _ => return Err(expected(Production::Declaration, token)),
            }
        }
    }

    fn parse_var_decl(&mut self) -> Result<Vec<Node>> {
        self.consume(Keyword::Var)?;
        let mut declarations = Vec::new();
        loop {
            let mut names = vec![self.parse_ident()?];
            while self.take(Operator::Comma)? {
                names.push(self.parse_ident()?);
            }
            self.consume(Operator::Colon)?;
            let bounds = self.parse_type()?;
            self.consume(Operator::Semicolon)?;

            for name in names {
                let decl = match bounds {
                    None => VariableDecl::scalar(name),
                    Some(ArrayBounds { low, high, span }) => VariableDecl::array(name, low, high)
                        .ok_or_else(|| span.wrap(Error::EmptyArrayRange { low, high }))?,
                };
                declarations.push(Node::VariableDecl(decl));
            }

            if !matches!(self.peek()?.kind, TokenKind::Identifier(_)) {
                return Ok(declarations);
            }
        }
    }

    /// Returns the bounds of an array type, or `None` for `integer`.
    fn parse_type(&mut self) -> Result<Option<ArrayBounds>> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Keyword(Keyword::Integer) => Ok(None),
            TokenKind::Keyword(Keyword::Array) => {
                self.consume(Operator::LBracket)?;
                let (low, low_span) = self.parse_number()?;
                self.consume(Operator::Range)?;
                let (high, high_span) = self.parse_number()?;
                self.consume(Operator::RBracket)?;
                self.consume(Keyword::Of)?;
                self.consume(Keyword::Integer)?;
                Ok(Some(ArrayBounds {
                    low,
                    high,
                    span: Span::new_of_bounds(low_span.lo..high_span.hi()),
                }))
            }
            _ => Err(expected(Production::Type, token)),
        }
    }

    fn parse_const_decl(&mut self) -> Result<Vec<Node>> {
        self.consume(Keyword::Const)?;
        let mut declarations = Vec::new();
        loop {
            let name = self.parse_ident()?;
            self.consume(Operator::Eq)?;
            let (value, _) = self.parse_number()?;
            self.consume(Operator::Semicolon)?;
            declarations.push(Node::ConstantDecl { name, value });

            if !matches!(self.peek()?.kind, TokenKind::Identifier(_)) {
                return Ok(declarations);
            }
        }
    }

    /// Parses a function or procedure, which is either a `forward`
    /// declaration or a full definition.
    ///
    /// A function body declares a result variable named after the function
    /// and ends by reading it; a procedure body ends with zero.
    fn parse_subprogram(&mut self) -> Result<Node> {
        let kind = match self
            .consume_any(&[Keyword::Function.into(), Keyword::Procedure.into()])?
            .kind
        {
            TokenKind::Keyword(Keyword::Function) => FunctionKind::Function,
            _ => FunctionKind::Procedure,
        };
        let name = self.parse_ident()?;
        let params = self.parse_params()?;
        if kind == FunctionKind::Function {
            self.consume(Operator::Colon)?;
            self.consume(Keyword::Integer)?;
        }
        self.consume(Operator::Semicolon)?;
        let prototype = Prototype { name, params, kind };

        if self.take(Keyword::Forward)? {
            self.consume(Operator::Semicolon)?;
            return Ok(Node::Prototype(prototype));
        }

        let mut body = Vec::new();
        while self.is(Keyword::Var)? {
            body.extend(self.parse_var_decl()?);
        }
        let result = match kind {
            FunctionKind::Function => {
                let name = prototype.name.clone();
                body.push(Node::VariableDecl(VariableDecl::scalar(name.clone())));
                Node::Variable(name)
            }
            FunctionKind::Procedure => Node::Number(0),
        };
        body.push(self.parse_block()?);
        self.consume(Operator::Semicolon)?;
        body.push(result);

        Ok(Node::Function(Function { prototype, body }))
    }

    fn parse_params(&mut self) -> Result<Vec<Box<str>>> {
        self.consume(Operator::LParen)?;
        let mut params = Vec::new();
        if self.take(Operator::RParen)? {
            return Ok(params);
        }
        loop {
            params.push(self.parse_ident()?);
            self.consume(Operator::Colon)?;
            self.consume(Keyword::Integer)?;
            let sep = self.consume_any(&[Operator::Semicolon.into(), Operator::RParen.into()])?;
            if sep.kind == Operator::RParen.into() {
                return Ok(params);
            }
        }
    }

    fn parse_block(&mut self) -> Result<Node> {
        self.consume(Keyword::Begin)?;
        let mut statements = Vec::with_capacity(4);
        statements.extend(self.parse_statement()?);
        loop {
            let sep = self.consume_any(&[Operator::Semicolon.into(), Keyword::End.into()])?;
            // A semicolon may also terminate the last statement.
            if sep.kind == Keyword::End.into() || self.take(Keyword::End)? {
                return Ok(Node::List(statements));
            }
            statements.extend(self.parse_statement()?);
        }
    }

    /// Returns `None` for statements that produce no code, which is only
    /// the case for `write`.
    fn parse_statement(&mut self) -> Result<Option<Node>> {
        let token = self.peek()?;
        let statement = match token.kind {
            TokenKind::Keyword(Keyword::Begin) => self.parse_block()?,
            TokenKind::Keyword(Keyword::If) => self.parse_if()?,
            TokenKind::Keyword(Keyword::While) => self.parse_while()?,
            TokenKind::Keyword(Keyword::For) => self.parse_for()?,
            TokenKind::Keyword(Keyword::Exit) => {
                self.advance()?;
                Node::Return
            }
            TokenKind::Keyword(Keyword::Readln) => self.parse_intrinsic(Intrinsic::Readln)?,
            TokenKind::Keyword(Keyword::Inc) => self.parse_intrinsic(Intrinsic::Inc)?,
            TokenKind::Keyword(Keyword::Dec) => self.parse_intrinsic(Intrinsic::Dec)?,
            TokenKind::Keyword(Keyword::Writeln) => {
                self.advance()?;
                Node::Call {
                    callee: Keyword::Writeln.as_str().into(),
                    args: self.parse_args()?,
                }
            }
            TokenKind::Keyword(Keyword::Write) => {
                self.skip_write()?;
                return Ok(None);
            }
            TokenKind::Identifier(_) => self.parse_command()?,
            _ => return Err(expected(Production::Statement, token)),
        };
        Ok(Some(statement))
    }

    /// Parses the statement that makes up a branch or a loop body.
    fn parse_branch(&mut self) -> Result<Node> {
        Ok(self.parse_statement()?.unwrap_or(Node::List(Vec::new())))
    }

    fn parse_if(&mut self) -> Result<Node> {
        self.consume(Keyword::If)?;
        let predicate = self.parse_expr()?;
        self.consume(Keyword::Then)?;
        let then_arm = self.parse_branch()?;
        let else_arm = if self.take(Keyword::Else)? {
            self.parse_branch()?
        } else {
            Node::Number(0)
        };
        Ok(Node::If {
            predicate: Box::new(predicate),
            then_arm: Box::new(then_arm),
            else_arm: Box::new(else_arm),
        })
    }

    fn parse_while(&mut self) -> Result<Node> {
        self.consume(Keyword::While)?;
        let predicate = self.parse_expr()?;
        self.consume(Keyword::Do)?;
        let body = self.parse_branch()?;
        Ok(Node::While {
            predicate: Box::new(predicate),
            body: Box::new(body),
        })
    }

    fn parse_for(&mut self) -> Result<Node> {
        self.consume(Keyword::For)?;
        let variable = self.parse_ident()?;
        self.consume(Operator::Assign)?;
        let start = self.parse_expr()?;
        let direction = match self
            .consume_any(&[Keyword::To.into(), Keyword::Downto.into()])?
            .kind
        {
            TokenKind::Keyword(Keyword::To) => Direction::To,
            _ => Direction::Downto,
        };
        let end = self.parse_expr()?;
        self.consume(Keyword::Do)?;
        let body = self.parse_branch()?;
        Ok(Node::For {
            variable,
            start: Box::new(start),
            end: Box::new(end),
            direction,
            body: Box::new(body),
        })
    }

    fn parse_intrinsic(&mut self, intrinsic: Intrinsic) -> Result<Node> {
        self.advance()?;
        self.consume(Operator::LParen)?;
        let argument = self.parse_ident()?;
        self.consume(Operator::RParen)?;
        Ok(Node::Intrinsic {
            intrinsic,
            argument,
        })
    }

    /// Skips `write('...')`. The quoted text is read as tokens and dropped,
    /// invalid ones included.
    fn skip_write(&mut self) -> Result<()> {
        self.consume(Keyword::Write)?;
        self.consume(Operator::LParen)?;
        self.consume(Operator::Quote)?;
        loop {
            let token = self.lexer.next_token();
            match token.kind {
                TokenKind::Operator(Operator::Quote) => break,
                TokenKind::Eof => {
                    return Err(token.span().wrap(Error::Unexpected {
                        expected: Operator::Quote.into(),
                        actual: TokenKind::Eof,
                    }))
                }
                _ => continue,
            }
        }
        self.consume(Operator::RParen)?;
        Ok(())
    }

    /// Parses an assignment or a call statement.
    fn parse_command(&mut self) -> Result<Node> {
        let name = self.parse_ident()?;
        if self.is(Operator::LParen)? {
            let args = self.parse_args()?;
            return Ok(Node::Call { callee: name, args });
        }
        let target = if self.take(Operator::LBracket)? {
            let index = self.parse_expr()?;
            self.consume(Operator::RBracket)?;
            Node::ArrayElement {
                name,
                index: Box::new(index),
            }
        } else {
            Node::Variable(name)
        };
        self.consume(Operator::Assign)?;
        let value = self.parse_expr()?;
        Ok(Node::binary(BinaryOperator::Assign, target, value))
    }

    fn parse_args(&mut self) -> Result<Vec<Node>> {
        self.consume(Operator::LParen)?;
        let mut args = Vec::new();
        if self.take(Operator::RParen)? {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            let sep = self.consume_any(&[Operator::Comma.into(), Operator::RParen.into()])?;
            if sep.kind == Operator::RParen.into() {
                return Ok(args);
            }
        }
    }

    /// Collects operands and the operators between them, stopping before the
    /// first token that may follow an expression, and hands them to the
    /// precedence reducer.
    fn parse_expr(&mut self) -> Result<Node> {
        let mut operands = vec![self.parse_operand()?];
        let mut operators = Vec::new();
        loop {
            let token = self.peek()?;
            if let Some(op) = binary_operator(&token.kind) {
                self.advance()?;
                operators.push(op);
                operands.push(self.parse_operand()?);
            } else if ends_expression(&token.kind) {
                return Ok(precedence::reduce(operands, operators, Node::binary));
            } else {
                return Err(expected(Production::Operator, token));
            }
        }
    }

    fn parse_operand(&mut self) -> Result<Node> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Integer(value) => Ok(Node::Number(value)),
            TokenKind::Operator(Operator::Minus) => {
                let token = self.advance()?;
                match token.kind {
                    TokenKind::Integer(value) => Ok(Node::Number(value.wrapping_neg())),
                    _ => Err(expected(Production::Number, token)),
                }
            }
            TokenKind::Identifier(name) => {
                if self.take(Operator::LBracket)? {
                    let index = self.parse_expr()?;
                    self.consume(Operator::RBracket)?;
                    Ok(Node::ArrayElement {
                        name,
                        index: Box::new(index),
                    })
                } else if self.is(Operator::LParen)? {
                    let args = self.parse_args()?;
                    Ok(Node::Call { callee: name, args })
                } else {
                    Ok(Node::Variable(name))
                }
            }
            TokenKind::Operator(Operator::LParen) => {
                let expr = self.parse_expr()?;
                self.consume(Operator::RParen)?;
                Ok(expr)
            }
            _ => Err(expected(Production::Operand, token)),
        }
    }

    fn parse_ident(&mut self) -> Result<Box<str>> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Identifier(name) => Ok(name),
            _ => Err(expected(Production::Identifier, token)),
        }
    }

    /// Parses an integer literal with an optional minus sign.
    fn parse_number(&mut self) -> Result<(i32, Span)> {
        let first = self.advance()?;
        let (negative, token) = if first.kind == Operator::Minus.into() {
            (true, self.advance()?)
        } else {
            (false, first.clone())
        };
        let span = Span::new_of_bounds(first.span().lo..token.span().hi());
        match token.kind {
            TokenKind::Integer(value) if negative => Ok((value.wrapping_neg(), span)),
            TokenKind::Integer(value) => Ok((value, span)),
            _ => Err(expected(Production::Number, token)),
        }
    }
}

impl<R: Read> Parser<R> {
    /// Returns the current token without consuming it.
    ///
    /// Invalid tokens become lexical errors.
    fn peek(&mut self) -> Result<Token> {
        let token = self.lexer.peek_token().clone();
        check_lexical(token)
    }

    /// Returns the current token and advances.
    fn advance(&mut self) -> Result<Token> {
        let token = self.lexer.next_token();
        check_lexical(token)
    }

    /// Checks whether the current token matches the given one.
    fn is(&mut self, expect: impl Into<TokenKind>) -> Result<bool> {
        Ok(self.peek()?.kind == expect.into())
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: impl Into<TokenKind>) -> Result<bool> {
        let taken = self.is(expect)?;
        if taken {
            self.advance()?;
        }
        Ok(taken)
    }

    /// Advances if the current token matches the provided one. If not, fails.
    fn consume(&mut self, expect: impl Into<TokenKind>) -> Result<Token> {
        let expect = expect.into();
        let token = self.advance()?;
        if token.kind == expect {
            Ok(token)
        } else {
            Err(token.span().wrap(Error::Unexpected {
                expected: expect,
                actual: token.kind,
            }))
        }
    }

    /// Advances if the current token matches any of the provided tokens. If
    /// not, fails.
    fn consume_any(&mut self, expect: &[TokenKind]) -> Result<Token> {
        let token = self.advance()?;
        if expect.contains(&token.kind) {
            Ok(token)
        } else {
            Err(token.span().wrap(Error::UnexpectedAny {
                expected: Box::from(expect),
                actual: token.kind,
            }))
        }
    }
}

fn check_lexical(token: Token) -> Result<Token> {
    let span = token.span();
    match token.kind {
        TokenKind::Error(error) => Err(span.wrap(Error::Lexical(error))),
        _ => Ok(token),
    }
}

fn expected(production: Production, token: Token) -> Spanned<Error> {
    token.span().wrap(Error::ExpectedProduction {
        expected: production,
        actual: token.kind,
    })
}

fn binary_operator(kind: &TokenKind) -> Option<BinaryOperator> {
    use BinaryOperator::*;
    let op = match kind {
        TokenKind::Operator(Operator::Plus) => Add,
        TokenKind::Operator(Operator::Minus) => Sub,
        TokenKind::Operator(Operator::Star) => Mul,
        TokenKind::Keyword(Keyword::Div) => Div,
        TokenKind::Keyword(Keyword::Mod) => Mod,
        TokenKind::Operator(Operator::Eq) => Eq,
        TokenKind::Operator(Operator::NotEq) => Ne,
        TokenKind::Operator(Operator::Less) => Lt,
        TokenKind::Operator(Operator::LessEq) => Le,
        TokenKind::Operator(Operator::Greater) => Gt,
        TokenKind::Operator(Operator::GreaterEq) => Ge,
        TokenKind::Keyword(Keyword::And) => And,
        TokenKind::Keyword(Keyword::Or) => Or,
        _ => return None,
    };
    Some(op)
}

fn ends_expression(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Operator(
            Operator::Semicolon
                | Operator::Assign
                | Operator::RParen
                | Operator::RBracket
                | Operator::Comma
        ) | TokenKind::Keyword(
            Keyword::Then | Keyword::Do | Keyword::Else | Keyword::End | Keyword::To | Keyword::Downto
        ) | TokenKind::Eof
    )
}

#[derive(Copy, Clone)]
struct ArrayBounds {
    low: i32,
    high: i32,
    span: Span,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("expected {expected}, got {actual}")]
    Unexpected {
        expected: TokenKind,
        actual: TokenKind,
    },
    #[error("expected one of {}, got {actual}", join(.expected))]
    UnexpectedAny {
        expected: Box<[TokenKind]>,
        actual: TokenKind,
    },
    #[error("expected {expected}, got {actual}")]
    ExpectedProduction {
        expected: Production,
        actual: TokenKind,
    },
    #[error(transparent)]
    Lexical(lexer::Error),
    #[error("array range {low}..{high} is empty")]
    EmptyArrayRange { low: i32, high: i32 },
}

/// Grammar constructs named in diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Production {
    Identifier,
    Number,
    Type,
    Declaration,
    Statement,
    Operand,
    Operator,
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Production::Identifier => "identifier",
            Production::Number => "number",
            Production::Type => "`integer` or `array`",
            Production::Declaration => "declaration or `begin`",
            Production::Statement => "statement",
            Production::Operand => "number, identifier or `(`",
            Production::Operator => "operator or end of expression",
        })
    }
}

fn join(kinds: &[TokenKind]) -> String {
    kinds
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use crate::util::test_utils::tree_tests;

    tree_tests!(
        fn test_end_to_end_program() {
            let program = "
                program t;
                const c = 5;
                var x: integer;
                begin
                  x := c + 1;
                end.
            ";
            let tree_ok = "
                program t
                  const c = 5
                  var x
                  block
                    binary Assign
                      ident x
                      binary Add
                        ident c
                        int 1
            ";
        }

        fn test_precedence_mul_over_add() {
            let expr = "2 + 3 * 4";
            let tree_ok = "
                binary Add
                  int 2
                  binary Mul
                    int 3
                    int 4
            ";
        }

        fn test_left_associative_sub() {
            let expr = "1 - 2 - 3";
            let tree_ok = "
                binary Sub
                  binary Sub
                    int 1
                    int 2
                  int 3
            ";
        }

        fn test_relational_binds_tighter_than_and() {
            let expr = "1 = 2 and 3 < 4";
            let tree_ok = "
                binary And
                  binary Eq
                    int 1
                    int 2
                  binary Lt
                    int 3
                    int 4
            ";
        }

        fn test_keyword_operators() {
            let expr = "a div b mod c or d <> e";
            let tree_ok = "
                binary Or
                  binary Mod
                    binary Div
                      ident a
                      ident b
                    ident c
                  binary Ne
                    ident d
                    ident e
            ";
        }

        fn test_operands() {
            let expr = "-5 * (a[i - 1] + f(x, 2)) - g()";
            let tree_ok = "
                binary Sub
                  binary Mul
                    int -5
                    binary Add
                      index a
                        binary Sub
                          ident i
                          int 1
                      call f
                        ident x
                        int 2
                  call g
            ";
        }

        fn test_number_bases() {
            let expr = "017 + $1F + &7 + 0x10";
            let tree_ok = "
                binary Add
                  binary Add
                    binary Add
                      int 15
                      int 31
                    int 7
                  int 16
            ";
        }

        fn test_subprograms_and_statements() {
            let program = "
                program p;
                var a: array [-3 .. 2] of integer;
                    i, x: integer;
                function f(n: integer; m: integer): integer; forward;
                function f(n: integer; m: integer): integer;
                var t: integer;
                begin
                  t := n;
                  if t > m then f := t else exit;
                end;
                procedure q();
                begin
                  for i := 10 downto 1 do inc(i);
                  while 0 do begin readln(x); write('Hello, world!') end;
                  writeln(f(1, 2))
                end;
                begin
                  q();
                  a[-3] := 1
                end.
            ";
            let tree_ok = "
                program p
                  var a[-3..2]
                  var i
                  var x
                  forward function f(n, m)
                  function f(n, m)
                    var t
                    var f
                    block
                      binary Assign
                        ident t
                        ident n
                      if
                        binary Gt
                          ident t
                          ident m
                        binary Assign
                          ident f
                          ident t
                        exit
                    ident f
                  procedure q()
                    block
                      for i downto
                        int 10
                        int 1
                        intrinsic inc(i)
                      while
                        int 0
                        block
                          intrinsic readln(x)
                      call writeln
                        call f
                          int 1
                          int 2
                    int 0
                  block
                    call q
                    binary Assign
                      index a
                        int -3
                      int 1
            ";
        }

        fn test_if_without_else_and_nested_blocks() {
            let program = "
                program p;
                begin
                  if x then begin if y then z := 1 end
                end.
            ";
            let tree_ok = "
                program p
                  block
                    if
                      ident x
                      block
                        if
                          ident y
                          binary Assign
                            ident z
                            int 1
                          int 0
                      int 0
            ";
        }

        fn test_error_incomplete_expr() {
            let expr = "1 +";
            let expected_error = "3..3: expected number, identifier or `(`, got end of input";
        }

        fn test_error_missing_dot() {
            let program = "program t; begin x := 1 end";
            let expected_error = "27..27: expected `.`, got end of input";
        }

        fn test_error_lexical() {
            let program = "program t; begin x := 018 end.";
            let expected_error = "22..25: number in base 8 cannot contain character `8`";
        }

        fn test_error_empty_array_range() {
            let program = "program t; var a: array [3..1] of integer; begin exit end.";
            let expected_error = "25..29: array range 3..1 is empty";
        }

        fn test_error_missing_operator() {
            let program = "program t; begin x := 1 y := 2 end.";
            let expected_error =
                "24..25: expected operator or end of expression, got identifier `y`";
        }

        fn test_error_bad_declaration() {
            let program = "program t; 1";
            let expected_error = "11..12: expected declaration or `begin`, got number `1`";
        }

        fn test_error_unterminated_write() {
            let program = "program t; begin write('oops) end.";
            let expected_error = "34..34: expected `'`, got end of input";
        }

        fn test_error_bad_statement() {
            let program = "program t; begin 1 end.";
            let expected_error = "17..18: expected statement, got number `1`";
        }

        fn test_error_param_separator() {
            let program =
                "program t; function f(a: integer, b: integer): integer; forward; begin exit end.";
            let expected_error = "32..33: expected one of `;`, `)`, got `,`";
        }
    );
}
