//! Module `scanner` implements a one-pass, streaming lexer for the Quill language.
//!
//! It transforms a source string into a sequence of `Token<'a>`s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a `FusedIterator`,
//! it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src: &'a str) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token<'a>, QuillError>` on each `.next()`.
//!
//! - `tokenize(src) -> Result<Vec<Token>>`
//!   Collects the whole stream, stopping at the first lexical error.  This is what
//!   the parser consumes.
//!
//! # Token Recognition
//!
//! - Single-character tokens: `(`, `)`, `{`, `}`, `[`, `]`, `,`, `.`, `;`, `*`, `/`.
//! - Two-character operators: `!=`, `==`, `<=`, `>=`, `:=`, `++`, `--`, `&&`, `||`.
//! - String literals: `"` … `"` with `\n \t \r \" \\` escapes, allowed to span lines.
//! - Integer literals, and duration literals (`250ms`, `1h30m`) when digits are
//!   immediately followed by a unit.
//! - Time literals: `@"2024-01-02T15:04:05Z"`; the text is validated by the parser.
//! - Identifiers/keywords, resolved via a perfect-hash `KEYWORDS` map.
//!
//! Comment skipping uses `memchr` to jump straight to the next newline.

use crate::error::{QuillError, Result};
use crate::token::{Token, TokenType};
use log::{debug, info};
use memchr::memchr;
use phf::phf_map;
use std::iter::FusedIterator;

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile-time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"break"  => TokenType::BREAK,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"for"    => TokenType::FOR,
    b"func"   => TokenType::FUNC,
    b"if"     => TokenType::IF,
    b"nil"    => TokenType::NIL,
    b"return" => TokenType::RETURN,
    b"true"   => TokenType::TRUE,
    b"type"   => TokenType::TYPE,
    b"var"    => TokenType::VAR,
};

/// Nanoseconds per duration unit suffix.
fn unit_scale(unit: &[u8]) -> Option<i64> {
    match unit {
        b"ns" => Some(1),
        b"us" => Some(1_000),
        b"ms" => Some(1_000_000),
        b"s" => Some(1_000_000_000),
        b"m" => Some(60 * 1_000_000_000),
        b"h" => Some(3_600 * 1_000_000_000),
        _ => None,
    }
}

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s.  The lifetime `'a` ties every emitted token's
/// `lexeme` slice back to the original source buffer.
pub struct Scanner<'a> {
    text: &'a str,              // entire source file
    src: &'a [u8],              // byte view of `text`
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1-based line counter (\n increments)
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `text`.
    #[inline]
    pub fn new(text: &'a str) -> Self {
        info!("Scanner created over {} bytes", text.len());

        Self {
            text,
            src: text.as_bytes(),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.src.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it.  Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.src[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it.  Returns `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.src[self.curr]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Pick between a one- and a two-byte token depending on the next byte.
    #[inline(always)]
    fn either(&mut self, second: u8, double: TokenType, single: TokenType) {
        let tt = if self.match_byte(second) { double } else { single };

        self.pending = Some(tt);
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`.  If the lexeme produces an
    /// actual token the kind is stored in `self.pending`.  Whitespace and
    /// comments are skipped by returning `Ok(())` with `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        match b {
            // ── single-character punctuators ──────────────────────────────
            b'(' => self.pending = Some(TokenType::LEFT_PAREN),
            b')' => self.pending = Some(TokenType::RIGHT_PAREN),
            b'{' => self.pending = Some(TokenType::LEFT_BRACE),
            b'}' => self.pending = Some(TokenType::RIGHT_BRACE),
            b'[' => self.pending = Some(TokenType::LEFT_BRACKET),
            b']' => self.pending = Some(TokenType::RIGHT_BRACKET),
            b',' => self.pending = Some(TokenType::COMMA),
            b'.' => self.pending = Some(TokenType::DOT),
            b';' => self.pending = Some(TokenType::SEMICOLON),
            b'*' => self.pending = Some(TokenType::STAR),

            // ── one-or-two character operators ───────────────────────────
            b'!' => self.either(b'=', TokenType::BANG_EQUAL, TokenType::BANG),
            b'=' => self.either(b'=', TokenType::EQUAL_EQUAL, TokenType::EQUAL),
            b'<' => self.either(b'=', TokenType::LESS_EQUAL, TokenType::LESS),
            b'>' => self.either(b'=', TokenType::GREATER_EQUAL, TokenType::GREATER),
            b':' => self.either(b'=', TokenType::COLON_EQUAL, TokenType::COLON),
            b'+' => self.either(b'+', TokenType::PLUS_PLUS, TokenType::PLUS),
            b'-' => self.either(b'-', TokenType::MINUS_MINUS, TokenType::MINUS),

            // ── two-character only operators ─────────────────────────────
            b'&' => {
                if !self.match_byte(b'&') {
                    return Err(QuillError::lex(self.line, "Unexpected character: &"));
                }

                self.pending = Some(TokenType::AND_AND);
            }

            b'|' => {
                if !self.match_byte(b'|') {
                    return Err(QuillError::lex(self.line, "Unexpected character: |"));
                }

                self.pending = Some(TokenType::OR_OR);
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => {
                return Ok(());
            }

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            // ── comments (// … until newline) ────────────────────────────
            b'/' => {
                if self.match_byte(b'/') {
                    if let Some(pos) = memchr(b'\n', &self.src[self.curr..]) {
                        self.curr += pos;
                    } else {
                        self.curr = self.len();
                    }

                    return Ok(());
                }

                self.pending = Some(TokenType::SLASH);
            }

            // ── string literal " … " ─────────────────────────────────────
            b'"' => {
                let s: String = self.parse_string()?;

                self.pending = Some(TokenType::STRING(s));
            }

            // ── time literal @" … " ──────────────────────────────────────
            b'@' => {
                if !self.match_byte(b'"') {
                    return Err(QuillError::lex(
                        self.line,
                        "Expected a string literal after '@'",
                    ));
                }

                let s: String = self.parse_string()?;

                self.pending = Some(TokenType::TIME(s));
            }

            // ── number / duration literal (digit-leading) ────────────────
            b'0'..=b'9' => {
                self.parse_number()?;
            }

            // ── identifiers / keywords (alpha or underscore-leading) ─────
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.parse_identifier();
            }

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Skip the whole (possibly multi-byte) character so that the
                // next lexeme starts on a char boundary again.
                let ch: char = self.text[self.start..].chars().next().unwrap_or('\u{FFFD}');
                self.curr = self.start + ch.len_utf8();

                return Err(QuillError::lex(
                    self.line,
                    format!("Unexpected character: {}", ch),
                ));
            }
        }

        Ok(())
    }

    /// Parse the body of a double-quoted string literal, decoding escapes.
    ///
    /// On entry `self.curr` points just past the opening `"`; on return it
    /// points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<String> {
        let mut out: String = String::new();
        let mut chunk: usize = self.curr;

        while !self.is_at_end() && self.peek() != b'"' {
            match self.advance() {
                b'\n' => self.line += 1,

                b'\\' => {
                    out.push_str(&self.text[chunk..self.curr - 1]);

                    let decoded: char = match self.peek() {
                        b'n' => '\n',
                        b't' => '\t',
                        b'r' => '\r',
                        b'"' => '"',
                        b'\\' => '\\',
                        0 => return Err(QuillError::lex(self.line, "Unterminated string.")),
                        other => {
                            return Err(QuillError::lex(
                                self.line,
                                format!("Invalid escape sequence: \\{}", other as char),
                            ));
                        }
                    };

                    self.advance();
                    out.push(decoded);
                    chunk = self.curr;
                }

                _ => {}
            }
        }

        if self.is_at_end() {
            return Err(QuillError::lex(self.line, "Unterminated string."));
        }

        out.push_str(&self.text[chunk..self.curr]);
        self.advance(); // consume closing quote

        Ok(out)
    }

    /// Consume a run of digits starting at `from` and decode it.
    fn digits(&mut self, from: usize) -> Result<i64> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        self.text[from..self.curr]
            .parse::<i64>()
            .map_err(|_| QuillError::lex(self.line, "Integer literal out of range"))
    }

    /// Parse an integer literal, or a duration literal when the digits are
    /// immediately followed by a unit suffix (`ns us ms s m h`).  Units may be
    /// compounded: `1h30m`, `2s500ms`.
    fn parse_number(&mut self) -> Result<()> {
        let mut amount: i64 = self.digits(self.start)?;

        if !self.peek().is_ascii_alphabetic() {
            self.pending = Some(TokenType::NUMBER(amount));

            return Ok(());
        }

        let mut total: i64 = 0;

        loop {
            let unit_start: usize = self.curr;

            while self.peek().is_ascii_alphabetic() {
                self.advance();
            }

            let unit: &[u8] = &self.src[unit_start..self.curr];
            let scale: i64 = unit_scale(unit).ok_or_else(|| {
                QuillError::lex(
                    self.line,
                    format!("Invalid duration unit: {}", &self.text[unit_start..self.curr]),
                )
            })?;

            total = amount
                .checked_mul(scale)
                .and_then(|n| total.checked_add(n))
                .ok_or_else(|| QuillError::lex(self.line, "Duration literal out of range"))?;

            if !self.peek().is_ascii_digit() {
                break;
            }

            let from: usize = self.curr;
            amount = self.digits(from)?;

            if !self.peek().is_ascii_alphabetic() {
                return Err(QuillError::lex(
                    self.line,
                    "Missing unit in duration literal",
                ));
            }
        }

        self.pending = Some(TokenType::DURATION(total));

        Ok(())
    }

    /// Parse an identifier and decide if it is a **keyword** or a generic
    /// `IDENTIFIER` token.
    fn parse_identifier(&mut self) {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        let slice: &[u8] = &self.src[self.start..self.curr];

        let tt: TokenType = KEYWORDS
            .get(slice)
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER);

        self.pending = Some(tt);
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // 1. EOF guard: emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                return Some(Ok(Token::new(TokenType::EOF, "", self.line)));
            }

            // 2. Reset per-token state.
            self.start = self.curr;
            self.pending = None;

            // 3. Attempt to scan a token.
            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            // 4. If a real token was recognised, build and return it.
            if let Some(tt) = self.pending.take() {
                let lex: &'a str = &self.text[self.start..self.curr];
                debug!("Scanned token ({:?}) on line {}", tt, self.line);

                return Some(Ok(Token::new(tt, lex, self.line)));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan all of `text`, failing on the first lexical error.  The returned
/// vector always ends with a single `EOF` token.
pub fn tokenize(text: &str) -> Result<Vec<Token<'_>>> {
    let tokens: Vec<Token<'_>> = Scanner::new(text).collect::<Result<_>>()?;

    info!("Tokenized {} token(s)", tokens.len());

    Ok(tokens)
}
