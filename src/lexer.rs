//! Tokenizer for UCL source text.
//!
//! The grammar is whitespace-insensitive except for statement separators:
//! any run of newlines and semicolons (with interleaved blanks) collapses
//! into a single [`Token::Sep`].  Comments run from `#` to end of line and
//! are elided along with ordinary whitespace.
//!
//! Two lexical subtleties:
//!
//! - A `-` directly followed by a digit starts a negative integer literal;
//!   any other `-` starts an identifier, which is how switch flags such as
//!   `-sep` reach the parser.
//! - Identifiers may contain `-`, `_`, and digits after the first letter.

use crate::error::ParseError;

// ── Token ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Double-quoted string literal, with escapes already processed.
    Str(String),
    Int(i64),
    /// Bare identifier, possibly starting with `-` (a switch flag).
    Ident(String),
    Dollar,
    Colon,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Pipe,
    /// Statement separator: one or more `;` / newlines.
    Sep,
    Eof,
}

impl Token {
    /// Human-readable name for diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Token::Str(_) => "string literal".into(),
            Token::Int(_) => "integer literal".into(),
            Token::Ident(name) => format!("identifier \"{name}\""),
            Token::Dollar => "\"$\"".into(),
            Token::Colon => "\":\"".into(),
            Token::Dot => "\".\"".into(),
            Token::LParen => "\"(\"".into(),
            Token::RParen => "\")\"".into(),
            Token::LBracket => "\"[\"".into(),
            Token::RBracket => "\"]\"".into(),
            Token::LBrace => "\"{\"".into(),
            Token::RBrace => "\"}\"".into(),
            Token::Pipe => "\"|\"".into(),
            Token::Sep => "statement separator".into(),
            Token::Eof => "end of input".into(),
        }
    }
}

/// A token plus the 1-based source position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
    pub column: usize,
}

// ── Lexer ─────────────────────────────────────────────────────────────────────

struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
}

/// Tokenize a whole source string.  The result always ends with [`Token::Eof`].
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut lexer = Lexer {
        src: src.as_bytes(),
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut out = Vec::new();
    loop {
        let spanned = lexer.next_token()?;
        let done = spanned.token == Token::Eof;
        out.push(spanned);
        if done {
            return Ok(out);
        }
    }
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.src.get(self.pos).copied();
        if let Some(c) = ch {
            self.pos += 1;
            if c == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        ch
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(message, self.line, self.column)
    }

    /// Skip blanks and comments.  Newlines are significant and not skipped.
    fn skip_blank(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.advance();
                }
                Some(b'#') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Spanned, ParseError> {
        self.skip_blank();
        let (line, column) = (self.line, self.column);
        let at = |token| Spanned { token, line, column };

        let c = match self.advance() {
            None => return Ok(at(Token::Eof)),
            Some(c) => c,
        };

        let token = match c {
            b';' | b'\n' => {
                // Collapse the whole run of separators and surrounding
                // blanks (comments included) into one Sep.
                loop {
                    self.skip_blank();
                    match self.peek() {
                        Some(b';' | b'\n') => {
                            self.advance();
                        }
                        _ => break,
                    }
                }
                Token::Sep
            }
            b'$' => Token::Dollar,
            b':' => Token::Colon,
            b'.' => Token::Dot,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            b'|' => Token::Pipe,
            b'"' => self.read_string()?,
            b'-' => {
                if matches!(self.peek(), Some(b'0'..=b'9')) {
                    self.read_int(true)?
                } else {
                    self.read_ident(b'-')?
                }
            }
            b'0'..=b'9' => {
                // Put the digit back; read_int consumes the full run.
                self.pos -= 1;
                self.column -= 1;
                self.read_int(false)?
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.read_ident(c)?,
            other => {
                return Err(ParseError::new(
                    format!("unexpected character {:?}", other as char),
                    line,
                    column,
                ))
            }
        };

        Ok(at(token))
    }

    fn read_int(&mut self, negative: bool) -> Result<Token, ParseError> {
        let mut s = String::new();
        if negative {
            s.push('-');
        }
        while matches!(self.peek(), Some(b'0'..=b'9')) {
            s.push(self.advance().unwrap() as char);
        }
        s.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| self.error(format!("integer literal {s} out of range")))
    }

    fn read_string(&mut self) -> Result<Token, ParseError> {
        // Accumulate raw bytes; everything the loop inspects is ASCII, so
        // multi-byte sequences pass through untouched.
        let mut bytes = Vec::new();
        loop {
            match self.advance() {
                None => return Err(self.error("unterminated string literal")),
                Some(b'"') => {
                    return Ok(Token::Str(String::from_utf8_lossy(&bytes).into_owned()))
                }
                Some(b'\\') => match self.advance() {
                    Some(b'"') => bytes.push(b'"'),
                    Some(b'\\') => bytes.push(b'\\'),
                    Some(b'n') => bytes.push(b'\n'),
                    Some(b't') => bytes.push(b'\t'),
                    Some(b'r') => bytes.push(b'\r'),
                    Some(other) => {
                        return Err(self.error(format!(
                            "invalid escape sequence \"\\{}\"",
                            other as char
                        )))
                    }
                    None => return Err(self.error("unterminated string literal")),
                },
                Some(c) => bytes.push(c),
            }
        }
    }

    fn read_ident(&mut self, first: u8) -> Result<Token, ParseError> {
        let mut s = String::new();
        s.push(first as char);
        // Leading dashes; the first non-dash must be a letter or underscore.
        if first == b'-' {
            while self.peek() == Some(b'-') {
                s.push(self.advance().unwrap() as char);
            }
            match self.peek() {
                Some(b'a'..=b'z' | b'A'..=b'Z' | b'_') => {
                    s.push(self.advance().unwrap() as char);
                }
                _ => return Err(self.error("expected identifier after \"-\"")),
            }
        }
        while matches!(
            self.peek(),
            Some(b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_' | b'-')
        ) {
            s.push(self.advance().unwrap() as char);
        }
        Ok(Token::Ident(s))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
