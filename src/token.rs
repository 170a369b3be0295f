use std::{error, fmt, ops::Range, str::FromStr};

use crate::lexer::{self, Lexer};

#[derive(Clone)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            len: span.len,
            lo: span.lo,
        }
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

// Two tokens are the same symbol regardless of where they were read.
impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for Token {}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        Self::new_of_length(lo, u32::try_from(hi - lo).unwrap_or(u32::MAX))
    }

    pub fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(self) -> usize {
        self.lo + self.len as usize
    }

    /// Attaches this span to the provided value.
    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.lo, self.hi())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.inner)
    }
}

impl<T: error::Error> error::Error for Spanned<T> {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.inner.source()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier(Box<str>),
    Integer(i32),
    Operator(Operator),
    Keyword(Keyword),
    Eof,
    Error(lexer::Error),
}

impl TokenKind {
    pub fn is_error(&self) -> bool {
        matches!(self, TokenKind::Error(_))
    }
}

impl From<Keyword> for TokenKind {
    fn from(keyword: Keyword) -> Self {
        TokenKind::Keyword(keyword)
    }
}

impl From<Operator> for TokenKind {
    fn from(operator: Operator) -> Self {
        TokenKind::Operator(operator)
    }
}

/// Builds the kind of the single symbol spelled by `s`, such as `":="`,
/// `"begin"` or `"42"`.
impl FromStr for TokenKind {
    type Err = lexer::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut lexer = Lexer::new(s);
        let first = lexer.next_token();
        if let TokenKind::Error(error) = first.kind {
            return Err(error);
        }
        if first.is_eof() || !lexer.next_token().is_eof() {
            return Err(lexer::Error::NotASingleToken(s.into()));
        }
        Ok(first.kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier `{name}`"),
            TokenKind::Integer(value) => write!(f, "number `{value}`"),
            TokenKind::Operator(operator) => write!(f, "`{operator}`"),
            TokenKind::Keyword(keyword) => write!(f, "`{keyword}`"),
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::Error(error) => write!(f, "invalid token ({error})"),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `.`
    Dot,
    /// `..`
    Range,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    /// `<>`
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    /// `:=`
    Assign,
    Colon,
    Semicolon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    /// Delimits the text passed to `write`.
    Quote,
}

impl Operator {
    pub const fn as_str(self) -> &'static str {
        match self {
            Operator::Dot => ".",
            Operator::Range => "..",
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Less => "<",
            Operator::LessEq => "<=",
            Operator::Greater => ">",
            Operator::GreaterEq => ">=",
            Operator::Assign => ":=",
            Operator::Colon => ":",
            Operator::Semicolon => ";",
            Operator::Comma => ",",
            Operator::LParen => "(",
            Operator::RParen => ")",
            Operator::LBracket => "[",
            Operator::RBracket => "]",
            Operator::Quote => "'",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Program,
    Var,
    Const,
    Function,
    Procedure,
    Begin,
    End,
    Forward,
    If,
    Then,
    Else,
    While,
    For,
    Do,
    To,
    Downto,
    Read,
    Write,
    Readln,
    Writeln,
    Exit,
    Dec,
    Inc,
    Div,
    Mod,
    Not,
    And,
    Or,
    Array,
    Of,
    Integer,
}

impl Keyword {
    pub const fn as_str(self) -> &'static str {
        match self {
            Keyword::Program => "program",
            Keyword::Var => "var",
            Keyword::Const => "const",
            Keyword::Function => "function",
            Keyword::Procedure => "procedure",
            Keyword::Begin => "begin",
            Keyword::End => "end",
            Keyword::Forward => "forward",
            Keyword::If => "if",
            Keyword::Then => "then",
            Keyword::Else => "else",
            Keyword::While => "while",
            Keyword::For => "for",
            Keyword::Do => "do",
            Keyword::To => "to",
            Keyword::Downto => "downto",
            Keyword::Read => "read",
            Keyword::Write => "write",
            Keyword::Readln => "readln",
            Keyword::Writeln => "writeln",
            Keyword::Exit => "exit",
            Keyword::Dec => "dec",
            Keyword::Inc => "inc",
            Keyword::Div => "div",
            Keyword::Mod => "mod",
            Keyword::Not => "not",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Array => "array",
            Keyword::Of => "of",
            Keyword::Integer => "integer",
        }
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords are case sensitive.
pub static KEYWORDS: phf::Map<&'static str, Keyword> = phf::phf_map! {
    "program" => Keyword::Program,
    "var" => Keyword::Var,
    "const" => Keyword::Const,
    "function" => Keyword::Function,
    "procedure" => Keyword::Procedure,
    "begin" => Keyword::Begin,
    "end" => Keyword::End,
    "forward" => Keyword::Forward,
    "if" => Keyword::If,
    "then" => Keyword::Then,
    "else" => Keyword::Else,
    "while" => Keyword::While,
    "for" => Keyword::For,
    "do" => Keyword::Do,
    "to" => Keyword::To,
    "downto" => Keyword::Downto,
    "read" => Keyword::Read,
    "write" => Keyword::Write,
    "readln" => Keyword::Readln,
    "writeln" => Keyword::Writeln,
    "exit" => Keyword::Exit,
    "dec" => Keyword::Dec,
    "inc" => Keyword::Inc,
    "div" => Keyword::Div,
    "mod" => Keyword::Mod,
    "not" => Keyword::Not,
    "and" => Keyword::And,
    "or" => Keyword::Or,
    "array" => Keyword::Array,
    "of" => Keyword::Of,
    "integer" => Keyword::Integer,
};

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_keyword_table_matches_spelling() {
        assert_eq!(KEYWORDS.len(), 31);
        for (text, keyword) in KEYWORDS.entries() {
            assert_eq!(keyword.as_str(), *text);
        }
    }

    #[test]
    fn test_token_equality_ignores_span() {
        let a = Token::new(TokenKind::Integer(7), Span::new_of_bounds(0..1));
        let b = Token::new(TokenKind::Integer(7), Span::new_of_bounds(10..13));
        let c = Token::new(TokenKind::Integer(8), Span::new_of_bounds(0..1));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(
            Token::new(TokenKind::Identifier("x".into()), a.span()),
            Token::new(TokenKind::Identifier("y".into()), a.span()),
        );
    }

    #[test]
    fn test_token_kind_from_str() {
        assert_eq!(":=".parse(), Ok(TokenKind::Operator(Operator::Assign)));
        assert_eq!("begin".parse(), Ok(TokenKind::Keyword(Keyword::Begin)));
        assert_eq!("x1".parse(), Ok(TokenKind::Identifier("x1".into())));
        assert_eq!(" 0x1F ".parse(), Ok(TokenKind::Integer(31)));
        assert_eq!(
            "a b".parse::<TokenKind>(),
            Err(lexer::Error::NotASingleToken("a b".into())),
        );
        assert_eq!(
            "".parse::<TokenKind>(),
            Err(lexer::Error::NotASingleToken("".into())),
        );
        assert_eq!(
            "#".parse::<TokenKind>(),
            Err(lexer::Error::UnrecognizedOperator('#')),
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(TokenKind::Identifier("x".into()).to_string(), "identifier `x`");
        assert_eq!(TokenKind::Integer(-3).to_string(), "number `-3`");
        assert_eq!(TokenKind::from(Operator::NotEq).to_string(), "`<>`");
        assert_eq!(TokenKind::from(Keyword::Downto).to_string(), "`downto`");
        assert_eq!(TokenKind::Eof.to_string(), "end of input");
        assert_eq!(Span::new_of_length(4, 3).to_string(), "4..7");
    }
}
