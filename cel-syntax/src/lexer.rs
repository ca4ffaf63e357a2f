//! Tokenizer for CEL expressions.
//!
//! Produces the whole token stream up front. Unrecognised input is reported
//! and skipped so that parsing can still diagnose the rest of the expression.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Ident,
    EscIdent,
    Int,
    Uint,
    Double,
    String,
    Bytes,
    True,
    False,
    Null,
    In,
    Eq,
    Ne,
    Lt,
    Le,
    Ge,
    Gt,
    And,
    Or,
    Not,
    Minus,
    Plus,
    Star,
    Slash,
    Percent,
    Question,
    Colon,
    Dot,
    Comma,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    LParen,
    RParen,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Code point offset of the first character.
    pub offset: usize,
}

impl Token {
    /// Text as shown in diagnostics.
    pub fn display(&self) -> String {
        match self.kind {
            TokenKind::Eof => "<EOF>".to_string(),
            _ => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub offset: usize,
    pub text: String,
}

pub(crate) fn tokenize(chars: &[char]) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer {
        chars,
        position: 0,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'a> {
    chars: &'a [char],
    position: usize,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'a> Lexer<'a> {
    fn run(&mut self) {
        loop {
            self.skip_trivia();
            let start = self.position;
            let Some(c) = self.peek(0) else {
                self.tokens.push(Token {
                    kind: TokenKind::Eof,
                    text: String::new(),
                    offset: start,
                });
                return;
            };
            match self.scan(c) {
                Ok(kind) => {
                    let text = self.chars[start..self.position].iter().collect();
                    self.tokens.push(Token {
                        kind,
                        text,
                        offset: start,
                    });
                }
                Err(()) => {
                    // The offending character is part of the reported text and skipped.
                    if self.position < self.chars.len() {
                        self.position += 1;
                    }
                    let text = self.chars[start..self.position].iter().collect();
                    self.errors.push(LexError {
                        offset: start,
                        text,
                    });
                }
            }
        }
    }

    fn peek(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.position + ahead).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek(0) {
            match c {
                ' ' | '\t' | '\n' | '\r' | '\u{0c}' => self.position += 1,
                '/' if self.peek(1) == Some('/') => {
                    while let Some(c) = self.peek(0) {
                        if c == '\n' {
                            break;
                        }
                        self.position += 1;
                    }
                }
                _ => break,
            }
        }
    }

    /// Scan one token starting at `c`. On failure the position is left on
    /// the offending character.
    fn scan(&mut self, c: char) -> Result<TokenKind, ()> {
        if let Some(kind) = self.scan_prefixed_string(c) {
            return kind;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.scan_identifier());
        }
        if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
            return Ok(self.scan_number());
        }
        if c == '"' || c == '\'' {
            return self.scan_string(false);
        }
        if c == '`' {
            return self.scan_escaped_identifier();
        }

        let two = |lexer: &mut Self, kind| {
            lexer.position += 2;
            Ok(kind)
        };
        let next = self.peek(1);
        match (c, next) {
            ('=', Some('=')) => return two(self, TokenKind::Eq),
            ('!', Some('=')) => return two(self, TokenKind::Ne),
            ('<', Some('=')) => return two(self, TokenKind::Le),
            ('>', Some('=')) => return two(self, TokenKind::Ge),
            ('&', Some('&')) => return two(self, TokenKind::And),
            ('|', Some('|')) => return two(self, TokenKind::Or),
            // Only valid as the first half of a pair; the character that
            // fails to complete it belongs to the error.
            ('=' | '&' | '|', _) => {
                self.position += 1;
                return Err(());
            }
            _ => {}
        }
        let kind = match c {
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '!' => TokenKind::Not,
            '-' => TokenKind::Minus,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            _ => return Err(()),
        };
        self.position += 1;
        Ok(kind)
    }

    fn scan_prefixed_string(&mut self, c: char) -> Option<Result<TokenKind, ()>> {
        let is_quote = |q: Option<char>| matches!(q, Some('"') | Some('\''));
        match c {
            'r' | 'R' if is_quote(self.peek(1)) => {
                self.position += 1;
                Some(self.scan_string(true).map(|_| TokenKind::String))
            }
            'b' | 'B' if is_quote(self.peek(1)) => {
                self.position += 1;
                Some(self.scan_string(false).map(|_| TokenKind::Bytes))
            }
            'b' | 'B' if matches!(self.peek(1), Some('r') | Some('R')) && is_quote(self.peek(2)) => {
                self.position += 2;
                Some(self.scan_string(true).map(|_| TokenKind::Bytes))
            }
            _ => None,
        }
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.position;
        while let Some(c) = self.peek(0) {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.position += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.position].iter().collect();
        match text.as_str() {
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "null" => TokenKind::Null,
            "in" => TokenKind::In,
            _ => TokenKind::Ident,
        }
    }

    fn scan_escaped_identifier(&mut self) -> Result<TokenKind, ()> {
        self.position += 1;
        let body_start = self.position;
        while let Some(c) = self.peek(0) {
            match c {
                '`' if self.position > body_start => {
                    self.position += 1;
                    return Ok(TokenKind::EscIdent);
                }
                c if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '/' | ' ') => {
                    self.position += 1;
                }
                _ => return Err(()),
            }
        }
        Err(())
    }

    fn scan_digits(&mut self, hex: bool) -> usize {
        let start = self.position;
        while let Some(c) = self.peek(0) {
            let ok = if hex { c.is_ascii_hexdigit() } else { c.is_ascii_digit() };
            if !ok {
                break;
            }
            self.position += 1;
        }
        self.position - start
    }

    fn scan_exponent(&mut self) -> bool {
        if !matches!(self.peek(0), Some('e') | Some('E')) {
            return false;
        }
        let sign = usize::from(matches!(self.peek(1), Some('+') | Some('-')));
        if !self.peek(1 + sign).is_some_and(|d| d.is_ascii_digit()) {
            return false;
        }
        self.position += 1 + sign;
        self.scan_digits(false);
        true
    }

    fn scan_unsigned_suffix(&mut self) -> bool {
        if matches!(self.peek(0), Some('u') | Some('U')) {
            self.position += 1;
            return true;
        }
        false
    }

    fn scan_number(&mut self) -> TokenKind {
        if self.peek(0) == Some('.') {
            self.position += 1;
            self.scan_digits(false);
            self.scan_exponent();
            return TokenKind::Double;
        }
        if self.peek(0) == Some('0')
            && matches!(self.peek(1), Some('x') | Some('X'))
            && self.peek(2).is_some_and(|d| d.is_ascii_hexdigit())
        {
            self.position += 2;
            self.scan_digits(true);
            return if self.scan_unsigned_suffix() {
                TokenKind::Uint
            } else {
                TokenKind::Int
            };
        }
        self.scan_digits(false);
        if self.peek(0) == Some('.') && self.peek(1).is_some_and(|d| d.is_ascii_digit()) {
            self.position += 1;
            self.scan_digits(false);
            self.scan_exponent();
            return TokenKind::Double;
        }
        if self.scan_exponent() {
            return TokenKind::Double;
        }
        if self.scan_unsigned_suffix() {
            return TokenKind::Uint;
        }
        TokenKind::Int
    }

    /// Scan a quoted literal whose opening quote is at the current position.
    fn scan_string(&mut self, raw: bool) -> Result<TokenKind, ()> {
        let Some(quote) = self.peek(0) else {
            return Err(());
        };
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        self.position += if triple { 3 } else { 1 };

        loop {
            let Some(c) = self.peek(0) else {
                return Err(());
            };
            if triple {
                if c == quote && self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                    self.position += 3;
                    return Ok(TokenKind::String);
                }
            } else if c == quote {
                self.position += 1;
                return Ok(TokenKind::String);
            } else if c == '\n' || c == '\r' {
                return Err(());
            }
            if c == '\\' && !raw {
                self.scan_escape()?;
            } else {
                self.position += 1;
            }
        }
    }

    fn scan_escape(&mut self) -> Result<(), ()> {
        self.position += 1;
        let Some(c) = self.peek(0) else {
            return Err(());
        };
        let hex_run = |lexer: &mut Self, width: usize| -> Result<(), ()> {
            lexer.position += 1;
            for _ in 0..width {
                match lexer.peek(0) {
                    Some(d) if d.is_ascii_hexdigit() => lexer.position += 1,
                    _ => return Err(()),
                }
            }
            Ok(())
        };
        match c {
            'a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '"' | '\'' | '\\' | '?' | '`' => {
                self.position += 1;
                Ok(())
            }
            'x' | 'X' => hex_run(self, 2),
            'u' => hex_run(self, 4),
            'U' => hex_run(self, 8),
            '0'..='3' => {
                self.position += 1;
                for _ in 0..2 {
                    match self.peek(0) {
                        Some(d) if ('0'..='7').contains(&d) => self.position += 1,
                        _ => return Err(()),
                    }
                }
                Ok(())
            }
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        let chars: Vec<char> = text.chars().collect();
        let (tokens, errors) = tokenize(&chars);
        assert!(errors.is_empty(), "unexpected lex errors: {:?}", errors);
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a <= b && !c || d != e"),
            vec![
                TokenKind::Ident,
                TokenKind::Le,
                TokenKind::Ident,
                TokenKind::And,
                TokenKind::Not,
                TokenKind::Ident,
                TokenKind::Or,
                TokenKind::Ident,
                TokenKind::Ne,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("1 0x1F 2u 0xAu 1.5 1e3 .5 1.5e-3"),
            vec![
                TokenKind::Int,
                TokenKind::Int,
                TokenKind::Uint,
                TokenKind::Uint,
                TokenKind::Double,
                TokenKind::Double,
                TokenKind::Double,
                TokenKind::Double,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_member_access_on_int_is_not_a_double() {
        assert_eq!(
            kinds("1.a"),
            vec![TokenKind::Int, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn test_keywords_and_strings() {
        assert_eq!(
            kinds("true false null in 'a' b\"c\" r'\\d' br'x' '''x\ny'''"),
            vec![
                TokenKind::True,
                TokenKind::False,
                TokenKind::Null,
                TokenKind::In,
                TokenKind::String,
                TokenKind::Bytes,
                TokenKind::String,
                TokenKind::Bytes,
                TokenKind::String,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(kinds("a // trailing\n+ b"), vec![
            TokenKind::Ident,
            TokenKind::Plus,
            TokenKind::Ident,
            TokenKind::Eof,
        ]);
    }

    #[test]
    fn test_escaped_identifier() {
        let chars: Vec<char> = "a.`b-c`".chars().collect();
        let (tokens, _) = tokenize(&chars);
        assert_eq!(tokens[2].kind, TokenKind::EscIdent);
        assert_eq!(tokens[2].text, "`b-c`");
    }

    #[test]
    fn test_bad_escape_reports_text_through_offending_char() {
        let chars: Vec<char> = r#""ab\>" "#.chars().collect();
        let (_, errors) = tokenize(&chars);
        assert_eq!(errors[0].offset, 0);
        assert_eq!(errors[0].text, r#""ab\>"#);
    }

    #[test]
    fn test_unknown_character() {
        let chars: Vec<char> = "a # b".chars().collect();
        let (tokens, errors) = tokenize(&chars);
        assert_eq!(errors, vec![LexError { offset: 2, text: "#".to_string() }]);
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_unpaired_operator_reports_following_character() {
        let chars: Vec<char> = "a | b".chars().collect();
        let (tokens, errors) = tokenize(&chars);
        assert_eq!(errors, vec![LexError { offset: 2, text: "| ".to_string() }]);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);

        let chars: Vec<char> = "a &b".chars().collect();
        let (tokens, errors) = tokenize(&chars);
        assert_eq!(errors, vec![LexError { offset: 2, text: "&b".to_string() }]);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_unpaired_operator_at_end_of_input() {
        let chars: Vec<char> = "a =".chars().collect();
        let (_, errors) = tokenize(&chars);
        assert_eq!(errors, vec![LexError { offset: 2, text: "=".to_string() }]);
    }
}
