use std::{
    collections::VecDeque,
    io::{self, Read},
};

use crate::token::{Operator, Span, Token, TokenKind, KEYWORDS};

/// A convenience function that lexes the whole source string. The last token
/// is always [`TokenKind::Eof`].
pub fn lex(src: &str) -> Vec<Token> {
    Lexer::new(src).collect()
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("unrecognized operator `{0}`")]
    UnrecognizedOperator(char),
    #[error("unrecognized character `{0}`")]
    UnrecognizedCharacter(char),
    #[error("invalid UTF-8 byte `\\x{0:02X}`")]
    InvalidByte(u8),
    #[error("number in base {radix} cannot contain character `{digit}`")]
    InvalidDigit { radix: u32, digit: char },
    #[error("identifier cannot start with a number")]
    IdentifierStartsWithNumber,
    #[error("symbol `0x` is invalid")]
    EmptyHexLiteral,
    #[error("integer literal does not fit in 32 bits")]
    Overflow,
    #[error("failed to read input: {0}")]
    Read(io::ErrorKind),
    #[error("`{0}` is not a single token")]
    NotASingleToken(Box<str>),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Input {
    Byte(u8),
    End,
    Failure(io::ErrorKind),
}

/// The Mila lexer.
///
/// Tokens are produced on demand. Tokens handed back through
/// [`Lexer::push_back`] are returned again, in the order they were pushed,
/// before any fresh input is scanned.
pub struct Lexer<R> {
    bytes: io::Bytes<R>,
    lookahead: Option<Input>,
    cursor: usize,
    current_lo: usize,
    pushed_back: VecDeque<Token>,
    text: String,
    finished: bool,
}

impl<'src> Lexer<&'src [u8]> {
    pub fn new(src: &'src str) -> Self {
        Lexer::from_reader(src.as_bytes())
    }
}

impl<R: Read> Lexer<R> {
    pub fn from_reader(reader: R) -> Self {
        Lexer {
            bytes: reader.bytes(),
            lookahead: None,
            cursor: 0,
            current_lo: 0,
            pushed_back: VecDeque::with_capacity(4),
            text: String::with_capacity(32),
            finished: false,
        }
    }

    /// Returns the next token. Once the input is exhausted, every call yields
    /// [`TokenKind::Eof`].
    pub fn next_token(&mut self) -> Token {
        match self.pushed_back.pop_front() {
            Some(token) => token,
            None => self.scan(),
        }
    }

    pub fn push_back(&mut self, token: Token) {
        self.pushed_back.push_back(token);
    }

    /// Returns the token the next [`Lexer::next_token`] call will produce.
    pub fn peek_token(&mut self) -> &Token {
        if self.pushed_back.is_empty() {
            let token = self.scan();
            self.pushed_back.push_back(token);
        }
        &self.pushed_back[0]
    }

    /// Whether only whitespace is left, with no pushed back tokens.
    pub fn is_at_end(&mut self) -> bool {
        if !self.pushed_back.is_empty() {
            return false;
        }
        self.skip_whitespace();
        self.peek() == Input::End
    }

    fn scan(&mut self) -> Token {
        self.skip_whitespace();
        let kind = self.scan_token_kind();
        Token::new(kind, self.span())
    }

    fn scan_token_kind(&mut self) -> TokenKind {
        let c = match self.mark_advance() {
            Input::Byte(c) => c,
            Input::End => return TokenKind::Eof,
            Input::Failure(kind) => return TokenKind::Error(Error::Read(kind)),
        };
        match c {
            c if c.is_ascii_alphabetic() => self.identifier_or_keyword(c),
            b'0' => self.leading_zero(),
            c if c.is_ascii_digit() => self.number(10, u32::from(c - b'0')),
            b'$' if self.peek_byte().is_some_and(|c| c.is_ascii_hexdigit()) => self.number(16, 0),
            b'&' if self.peek_byte().is_some_and(|c| c.is_ascii_digit()) => self.number(8, 0),
            c if !c.is_ascii() => self.non_ascii(c),
            c => self.operator(c),
        }
    }

    /// Consumes the rest of a UTF-8 sequence so that it is reported as a
    /// single character.
    fn non_ascii(&mut self, first: u8) -> TokenKind {
        let width = match first {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        let mut buf = [first, 0, 0, 0];
        let mut len = 1;
        while len < width {
            match self.peek_byte() {
                Some(c) if c & 0xC0 == 0x80 => {
                    self.advance();
                    buf[len] = c;
                    len += 1;
                }
                _ => break,
            }
        }
        match std::str::from_utf8(&buf[..len]).ok().and_then(|s| s.chars().next()) {
            Some(c) => TokenKind::Error(Error::UnrecognizedCharacter(c)),
            None => TokenKind::Error(Error::InvalidByte(first)),
        }
    }

    fn identifier_or_keyword(&mut self, first: u8) -> TokenKind {
        self.text.clear();
        self.text.push(char::from(first));
        while let Some(c) = self.peek_byte().filter(|&c| is_identifier_suffix(c)) {
            self.advance();
            self.text.push(char::from(c));
        }
        match KEYWORDS.get(self.text.as_str()).copied() {
            Some(keyword) => TokenKind::Keyword(keyword),
            None => TokenKind::Identifier(self.text.as_str().into()),
        }
    }

    /// `0x1F` is hexadecimal, `017` is octal and a lone `0` is zero.
    fn leading_zero(&mut self) -> TokenKind {
        match self.peek_byte() {
            Some(b'x' | b'X') => {
                self.advance();
                if self.peek_byte().is_some_and(|c| c.is_ascii_alphanumeric()) {
                    self.number(16, 0)
                } else {
                    TokenKind::Error(Error::EmptyHexLiteral)
                }
            }
            Some(c) if c.is_ascii_digit() => self.number(8, 0),
            Some(c) if c.is_ascii_alphabetic() => {
                self.skip_while(is_identifier_suffix);
                TokenKind::Error(Error::IdentifierStartsWithNumber)
            }
            _ => TokenKind::Integer(0),
        }
    }

    /// Accumulates the remaining digits of a literal in the given radix.
    ///
    /// Any alphanumeric character continues the literal, so `018` is an
    /// invalid octal number rather than `01` followed by `8`.
    fn number(&mut self, radix: u32, initial: u32) -> TokenKind {
        const LIMIT: i64 = 1 << 31;

        let mut value = i64::from(initial);
        while let Some(c) = self.peek_byte().filter(u8::is_ascii_alphanumeric) {
            self.advance();
            let Some(digit) = char::from(c).to_digit(radix) else {
                self.skip_while(|c| c.is_ascii_alphanumeric());
                return TokenKind::Error(Error::InvalidDigit {
                    radix,
                    digit: char::from(c),
                });
            };
            value = (value * i64::from(radix) + i64::from(digit)).min(LIMIT);
        }
        i32::try_from(value).map_or(TokenKind::Error(Error::Overflow), TokenKind::Integer)
    }

    fn operator(&mut self, c: u8) -> TokenKind {
        use Operator::*;
        let operator = match c {
            b'.' => match self.peek_byte() {
                Some(b'.') => self.advance_with(Range),
                _ => Dot,
            },
            b'<' => match self.peek_byte() {
                Some(b'>') => self.advance_with(NotEq),
                Some(b'=') => self.advance_with(LessEq),
                _ => Less,
            },
            b'>' => match self.peek_byte() {
                Some(b'=') => self.advance_with(GreaterEq),
                _ => Greater,
            },
            b':' => match self.peek_byte() {
                Some(b'=') => self.advance_with(Assign),
                _ => Colon,
            },
            b'+' => Plus,
            b'-' => Minus,
            b'*' => Star,
            b'/' => Slash,
            b'%' => Percent,
            b'=' => Eq,
            b'(' => LParen,
            b')' => RParen,
            b'[' => LBracket,
            b']' => RBracket,
            b',' => Comma,
            b';' => Semicolon,
            b'\'' => Quote,
            other => return TokenKind::Error(Error::UnrecognizedOperator(char::from(other))),
        };
        TokenKind::Operator(operator)
    }
}

impl<R: Read> Lexer<R> {
    /// Starts a new token "mark" and advances the input.
    fn mark_advance(&mut self) -> Input {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the current input and advances past it.
    ///
    /// A read failure is reported once; the input is treated as exhausted
    /// afterwards.
    fn advance(&mut self) -> Input {
        let input = self.peek();
        self.lookahead = match input {
            Input::Byte(_) => {
                self.cursor += 1;
                None
            }
            Input::End | Input::Failure(_) => Some(Input::End),
        };
        input
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the current input without advancing.
    fn peek(&mut self) -> Input {
        if let Some(input) = self.lookahead {
            return input;
        }
        let input = loop {
            match self.bytes.next() {
                Some(Ok(c)) => break Input::Byte(c),
                Some(Err(error)) if error.kind() == io::ErrorKind::Interrupted => continue,
                Some(Err(error)) => break Input::Failure(error.kind()),
                None => break Input::End,
            }
        };
        self.lookahead = Some(input);
        input
    }

    fn peek_byte(&mut self) -> Option<u8> {
        match self.peek() {
            Input::Byte(c) => Some(c),
            Input::End | Input::Failure(_) => None,
        }
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        while self.peek_byte().is_some_and(&pred) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        self.skip_while(|c| c.is_ascii_whitespace());
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }
}

/// Yields every token up to and including the first [`TokenKind::Eof`].
impl<R: Read> Iterator for Lexer<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        self.finished = token.is_eof();
        Some(token)
    }
}

fn is_identifier_suffix(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::Keyword;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src).into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn test_demos_no_errors() {
        for input in [
            include_str!("../demos/factorial.mila"),
            include_str!("../demos/arrays.mila"),
            include_str!("../demos/big.mila"),
        ] {
            let has_errors = lex(input).into_iter().any(|t| t.kind.is_error());
            assert!(!has_errors);
        }
    }

    #[test]
    fn tests_with_span() {
        use Keyword::*;
        use Operator::*;
        use TokenKind::{Eof, Identifier as Id, Integer as Int};
        let cases = cases!(match .. {
            "017 23 0x17 $17 &27 0 0X1f" => [
                (Int(15), 0..3),
                (Int(23), 4..6),
                (Int(23), 7..11),
                (Int(23), 12..15),
                (Int(23), 16..19),
                (Int(0), 20..21),
                (Int(31), 22..26),
                (Eof, 26..26),
            ],
            "x:=x+1;" => [
                (Id("x".into()), 0..1),
                (Assign.into(), 1..3),
                (Id("x".into()), 3..4),
                (Plus.into(), 4..5),
                (Int(1), 5..6),
                (Semicolon.into(), 6..7),
                (Eof, 7..7),
            ],
            "a[-3..2] end." => [
                (Id("a".into()), 0..1),
                (LBracket.into(), 1..2),
                (Minus.into(), 2..3),
                (Int(3), 3..4),
                (Range.into(), 4..6),
                (Int(2), 6..7),
                (RBracket.into(), 7..8),
                (End.into(), 9..12),
                (Dot.into(), 12..13),
                (Eof, 13..13),
            ],
            "<><=>=:=:<>" => [
                (NotEq.into(), 0..2),
                (LessEq.into(), 2..4),
                (GreaterEq.into(), 4..6),
                (Assign.into(), 6..8),
                (Colon.into(), 8..9),
                (NotEq.into(), 9..11),
                (Eof, 11..11),
            ],
            "+-*/%=()[],;'" => [
                (Plus.into(), 0..1),
                (Minus.into(), 1..2),
                (Star.into(), 2..3),
                (Slash.into(), 3..4),
                (Percent.into(), 4..5),
                (Eq.into(), 5..6),
                (LParen.into(), 6..7),
                (RParen.into(), 7..8),
                (LBracket.into(), 8..9),
                (RBracket.into(), 9..10),
                (Comma.into(), 10..11),
                (Semicolon.into(), 11..12),
                (Quote.into(), 12..13),
                (Eof, 13..13),
            ],
            "  \n\t" => [(Eof, 4..4)],
        });

        for (input, tokens) in cases {
            let lexed: Vec<_> = lex(input).iter().map(|t| (t.kind.clone(), t.span())).collect();
            assert_eq!(&lexed, tokens);
        }
    }

    #[test]
    fn test_invalid_literals() {
        let cases = cases!(match .. {
            "018" => [
                (TokenKind::Error(Error::InvalidDigit { radix: 8, digit: '8' }), 0..3),
                (TokenKind::Eof, 3..3),
            ],
            "0x1g;" => [
                (TokenKind::Error(Error::InvalidDigit { radix: 16, digit: 'g' }), 0..4),
                (Operator::Semicolon.into(), 4..5),
                (TokenKind::Eof, 5..5),
            ],
            "12ab" => [
                (TokenKind::Error(Error::InvalidDigit { radix: 10, digit: 'a' }), 0..4),
                (TokenKind::Eof, 4..4),
            ],
            "0x;" => [
                (TokenKind::Error(Error::EmptyHexLiteral), 0..2),
                (Operator::Semicolon.into(), 2..3),
                (TokenKind::Eof, 3..3),
            ],
            "0abc" => [
                (TokenKind::Error(Error::IdentifierStartsWithNumber), 0..4),
                (TokenKind::Eof, 4..4),
            ],
            "2147483647 2147483648" => [
                (TokenKind::Integer(i32::MAX), 0..10),
                (TokenKind::Error(Error::Overflow), 11..21),
                (TokenKind::Eof, 21..21),
            ],
            "$ &x #" => [
                (TokenKind::Error(Error::UnrecognizedOperator('$')), 0..1),
                (TokenKind::Error(Error::UnrecognizedOperator('&')), 2..3),
                (TokenKind::Identifier("x".into()), 3..4),
                (TokenKind::Error(Error::UnrecognizedOperator('#')), 5..6),
                (TokenKind::Eof, 6..6),
            ],
            "x é;" => [
                (TokenKind::Identifier("x".into()), 0..1),
                (TokenKind::Error(Error::UnrecognizedCharacter('é')), 2..4),
                (Operator::Semicolon.into(), 4..5),
                (TokenKind::Eof, 5..5),
            ],
        });

        for (input, tokens) in cases {
            let lexed: Vec<_> = lex(input).iter().map(|t| (t.kind.clone(), t.span())).collect();
            assert_eq!(&lexed, tokens);
        }
    }

    #[test]
    fn test_keywords_and_identifiers() {
        for (text, keyword) in KEYWORDS.entries() {
            assert_eq!(kinds(text), [TokenKind::Keyword(*keyword), TokenKind::Eof]);
        }
        for ident in ["myVar1", "Begin", "my_var", "endx", "x_", "integer2"] {
            assert_eq!(kinds(ident), [TokenKind::Identifier(ident.into()), TokenKind::Eof]);
        }
        assert_eq!(
            kinds("_x"),
            [
                TokenKind::Error(Error::UnrecognizedOperator('_')),
                TokenKind::Identifier("x".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_push_back_order() {
        let mut lexer = Lexer::new("a b c");
        let a = lexer.next_token();
        let b = lexer.next_token();
        lexer.push_back(a.clone());
        lexer.push_back(b.clone());
        assert_eq!(lexer.next_token(), a);
        assert_eq!(lexer.next_token(), b);
        assert_eq!(lexer.next_token().kind, TokenKind::Identifier("c".into()));
        assert!(lexer.next_token().is_eof());
        assert!(lexer.next_token().is_eof());
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut lexer = Lexer::new("begin end");
        assert_eq!(lexer.peek_token().kind, Keyword::Begin.into());
        assert_eq!(lexer.peek_token().kind, Keyword::Begin.into());
        assert_eq!(lexer.next_token().kind, Keyword::Begin.into());
        assert_eq!(lexer.next_token().kind, Keyword::End.into());
    }

    #[test]
    fn test_is_at_end() {
        let mut lexer = Lexer::new(" x \n ");
        assert!(!lexer.is_at_end());
        let x = lexer.next_token();
        assert!(lexer.is_at_end());
        lexer.push_back(x);
        assert!(!lexer.is_at_end());
    }

    #[test]
    fn test_invalid_utf8() {
        let tokens: Vec<_> = Lexer::from_reader(&[0xFF, 0xC3, b';'][..])
            .map(|t| { let span = t.span(); (t.kind, span) })
            .collect();
        assert_eq!(
            tokens,
            [
                (TokenKind::Error(Error::InvalidByte(0xFF)), Span::new_of_bounds(0..1)),
                (TokenKind::Error(Error::InvalidByte(0xC3)), Span::new_of_bounds(1..2)),
                (Operator::Semicolon.into(), Span::new_of_bounds(2..3)),
                (TokenKind::Eof, Span::new_of_bounds(3..3)),
            ]
        );
        assert_eq!(
            Error::InvalidByte(0xC3).to_string(),
            "invalid UTF-8 byte `\\xC3`"
        );
        assert_eq!(
            Error::UnrecognizedCharacter('é').to_string(),
            "unrecognized character `é`"
        );
    }

    #[test]
    fn test_read_failure() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("disk on fire"))
            }
        }

        let tokens: Vec<_> = Lexer::from_reader(Broken).map(|t| t.kind).collect();
        assert_eq!(
            tokens,
            [TokenKind::Error(Error::Read(io::ErrorKind::Other)), TokenKind::Eof]
        );
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(($kind, Span::new_of_bounds($range.start..$range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
