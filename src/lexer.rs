use std::{iter::Peekable, num::ParseFloatError};

use crate::token::{Span, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided string, producing the tokens into the provided buffer.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    Lexer::new(src, tokens).lex();
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

/// The Paprika lexer
struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    ///
    /// Tokens are written into the provided tokens buffer.
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            let next = self.scan_token_kind();
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        match self.mark_advance() {
            '\0' => Eof,
            '+' => Plus,
            '-' => match self.peek() {
                '>' => self.advance_with(Arrow),
                _ => Minus,
            },
            '*' => Star,
            '/' => match self.peek() {
                '/' => self.comment(),
                _ => Slash,
            },
            '%' => Percent,
            '<' => Less,
            '>' => Greater,
            '=' => Eq,
            '!' => Bang,
            '.' => Dot,
            ',' => Comma,
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            '"' => self.string(),
            c if c.is_ascii_alphabetic() || c == '_' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_whitespace() => self.whitespace(),
            _ => ErrorUnexpectedChar,
        }
    }

    /// Strings have no escape sequences; everything up to the next quotation
    /// mark (line breaks included) belongs to the literal.
    fn string(&mut self) -> TokenKind {
        loop {
            match self.advance() {
                '\0' => return TokenKind::ErrorUnclosedString,
                '"' => return TokenKind::String,
                _ => (),
            }
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_';

        while valid_identifier_suffix(self.peek()) {
            self.advance();
        }
        KEYWORDS
            .get(self.substr())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    /// Digits with an optional fractional part. The dot is only taken when
    /// a digit follows it, so `1..2` still lexes as `1`, `.`, `.`, `2`.
    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_second().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        TokenKind::Number
    }

    fn whitespace(&mut self) -> TokenKind {
        while self.peek().is_whitespace() {
            self.advance();
        }
        TokenKind::Whitespace
    }

    fn comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '/');
        while !matches!(self.peek(), '\n' | '\0') {
            self.advance();
        }
        TokenKind::Comment
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next char and advances the iterator.
    fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next char without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the char after the next one, without advancing.
    fn peek_second(&self) -> char {
        self.src[self.cursor..].chars().nth(1).unwrap_or('\0')
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        self.tokens.push(Token::new(kind, self.span()));
    }
}

pub mod extract {
    use super::*;

    pub fn number(token: Token, src: &str) -> Result<f64, ParseFloatError> {
        debug_assert_eq!(token.kind, TokenKind::Number);
        token.span().substr(src).parse()
    }

    pub fn ident(token: Token, src: &str) -> &str {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.span().substr(src)
    }

    pub fn string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::String);
        let s = token.span().offset(1, -1).substr(src);
        s.to_string().into_boxed_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demos_no_errors() {
        for input in [
            include_str!("../demos/sum.pap"),
            include_str!("../demos/records.pap"),
            include_str!("../demos/ranges.pap"),
        ] {
            let has_errors = lex_in_new(input).into_iter().any(|t| t.kind.is_error());
            assert!(!has_errors);
        }
    }

    #[test]
    fn extract_values() {
        let src = r#"x1 2.5 "hi there""#;
        let tokens: Vec<_> = lex_in_new(src)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        assert_eq!(extract::ident(tokens[0], src), "x1");
        assert_eq!(extract::number(tokens[1], src), Ok(2.5));
        assert_eq!(&*extract::string(tokens[2], src), "hi there");
    }

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "+-*/%" => [
                (Plus, 0..1),
                (Minus, 1..2),
                (Star, 2..3),
                (Slash, 3..4),
                (Percent, 4..5),
                (Eof, 5..5),
            ],
            "func/Func/where/whereas" => [
                (Func, 0..4),
                (Slash, 4..5),
                (Identifier, 5..9),
                (Slash, 9..10),
                (Where, 10..15),
                (Slash, 15..16),
                (Identifier, 16..23),
                (Eof, 23..23),
            ],
            "1/2.5/3./01" => [
                (Number, 0..1),
                (Slash, 1..2),
                (Number, 2..5),
                (Slash, 5..6),
                (Number, 6..7),
                (Dot, 7..8),
                (Slash, 8..9),
                (Number, 9..11),
                (Eof, 11..11),
            ],
            "1..2" => [
                (Number, 0..1),
                (Dot, 1..2),
                (Dot, 2..3),
                (Number, 3..4),
                (Eof, 4..4),
            ],
            "a->b - >" => [
                (Identifier, 0..1),
                (Arrow, 1..3),
                (Identifier, 3..4),
                (Whitespace, 4..5),
                (Minus, 5..6),
                (Whitespace, 6..7),
                (Greater, 7..8),
                (Eof, 8..8),
            ],
            "x == y != z" => [
                (Identifier, 0..1),
                (Whitespace, 1..2),
                (Eq, 2..3),
                (Eq, 3..4),
                (Whitespace, 4..5),
                (Identifier, 5..6),
                (Whitespace, 6..7),
                (Bang, 7..8),
                (Eq, 8..9),
                (Whitespace, 9..10),
                (Identifier, 10..11),
                (Eof, 11..11),
            ],
            r#"""/"a \ b"/"oops"# => [
                (String, 0..2),
                (Slash, 2..3),
                (String, 3..10),
                (Slash, 10..11),
                (ErrorUnclosedString, 11..16),
                (Eof, 16..16),
            ],
            "Seq<Seq<Number>>" => [
                (Identifier, 0..3),
                (Less, 3..4),
                (Identifier, 4..7),
                (Less, 7..8),
                (Identifier, 8..14),
                (Greater, 14..15),
                (Greater, 15..16),
                (Eof, 16..16),
            ],
            "a // rest of line\nb" => [
                (Identifier, 0..1),
                (Whitespace, 1..2),
                (Comment, 2..17),
                (Whitespace, 17..18),
                (Identifier, 18..19),
                (Eof, 19..19),
            ],
            "[1 to 5 step 2] $" => [
                (LBracket, 0..1),
                (Number, 1..2),
                (Whitespace, 2..3),
                (To, 3..5),
                (Whitespace, 5..6),
                (Number, 6..7),
                (Whitespace, 7..8),
                (Step, 8..12),
                (Whitespace, 12..13),
                (Number, 13..14),
                (RBracket, 14..15),
                (Whitespace, 15..16),
                (ErrorUnexpectedChar, 16..17),
                (Eof, 17..17),
            ],
        });

        for (input, tokens) in cases {
            let lexed = lex_in_new(input);
            assert_eq!(lexed, tokens.as_slice());
        }
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, Span::new_of_bounds($range.start..$range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
