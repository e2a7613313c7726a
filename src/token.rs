use log::trace;
use serde::Serialize;
use std::fmt;
use std::mem;

/// The different kinds of tokens recognized by the Quill scanner.
///
/// Variants without data represent punctuation, operator or keyword tokens.
/// `STRING`, `NUMBER`, `DURATION` and `TIME` carry their decoded literal
/// values.  `IDENTIFIER` is used for user-defined names.  `EOF` marks the
/// end of input.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Serialize)]
pub enum TokenType {
    /// '('
    LEFT_PAREN,

    /// ')'
    RIGHT_PAREN,

    /// '{'
    LEFT_BRACE,

    /// '}'
    RIGHT_BRACE,

    /// '['
    LEFT_BRACKET,

    /// ']'
    RIGHT_BRACKET,

    /// ','
    COMMA,

    /// '.'
    DOT,

    /// ';'
    SEMICOLON,

    /// ':'
    COLON,

    /// ':='
    COLON_EQUAL,

    /// '-'
    MINUS,

    /// '--'
    MINUS_MINUS,

    /// '+'
    PLUS,

    /// '++'
    PLUS_PLUS,

    /// '/'
    SLASH,

    /// '*'
    STAR,

    /// '!'
    BANG,

    /// '!='
    BANG_EQUAL,

    /// '='
    EQUAL,

    /// '=='
    EQUAL_EQUAL,

    /// '>'
    GREATER,

    /// '>='
    GREATER_EQUAL,

    /// '<'
    LESS,

    /// '<='
    LESS_EQUAL,

    /// '&&'
    AND_AND,

    /// '||'
    OR_OR,

    /// A user-defined identifier
    IDENTIFIER,

    /// A string literal (contents without quotes, escapes decoded)
    STRING(String),

    /// An integer literal
    #[serde(rename = "NUMBER")]
    NUMBER(i64),

    /// A duration literal such as `1h30m`, stored in nanoseconds
    DURATION(i64),

    /// A time literal `@"…"`, holding the raw RFC 3339 text
    TIME(String),

    /// 'break'
    BREAK,

    /// 'else'
    ELSE,

    /// 'false'
    FALSE,

    /// 'for'
    FOR,

    /// 'func'
    FUNC,

    /// 'if'
    IF,

    /// 'nil'
    NIL,

    /// 'return'
    RETURN,

    /// 'true'
    TRUE,

    /// 'type'
    TYPE,

    /// 'var'
    VAR,

    /// End-of-file marker
    EOF,
}

impl PartialEq for TokenType {
    /// Two TokenTypes are equal if they share the same variant
    /// (ignoring any inner data). Uses `mem::discriminant` to compare.
    fn eq(&self, other: &Self) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }
}

impl TokenType {
    /// Upper-case variant name without payload, as printed by `--emit tokens`.
    pub fn name(&self) -> &'static str {
        match self {
            TokenType::LEFT_PAREN => "LEFT_PAREN",
            TokenType::RIGHT_PAREN => "RIGHT_PAREN",
            TokenType::LEFT_BRACE => "LEFT_BRACE",
            TokenType::RIGHT_BRACE => "RIGHT_BRACE",
            TokenType::LEFT_BRACKET => "LEFT_BRACKET",
            TokenType::RIGHT_BRACKET => "RIGHT_BRACKET",
            TokenType::COMMA => "COMMA",
            TokenType::DOT => "DOT",
            TokenType::SEMICOLON => "SEMICOLON",
            TokenType::COLON => "COLON",
            TokenType::COLON_EQUAL => "COLON_EQUAL",
            TokenType::MINUS => "MINUS",
            TokenType::MINUS_MINUS => "MINUS_MINUS",
            TokenType::PLUS => "PLUS",
            TokenType::PLUS_PLUS => "PLUS_PLUS",
            TokenType::SLASH => "SLASH",
            TokenType::STAR => "STAR",
            TokenType::BANG => "BANG",
            TokenType::BANG_EQUAL => "BANG_EQUAL",
            TokenType::EQUAL => "EQUAL",
            TokenType::EQUAL_EQUAL => "EQUAL_EQUAL",
            TokenType::GREATER => "GREATER",
            TokenType::GREATER_EQUAL => "GREATER_EQUAL",
            TokenType::LESS => "LESS",
            TokenType::LESS_EQUAL => "LESS_EQUAL",
            TokenType::AND_AND => "AND_AND",
            TokenType::OR_OR => "OR_OR",
            TokenType::IDENTIFIER => "IDENTIFIER",
            TokenType::STRING(_) => "STRING",
            TokenType::NUMBER(_) => "NUMBER",
            TokenType::DURATION(_) => "DURATION",
            TokenType::TIME(_) => "TIME",
            TokenType::BREAK => "BREAK",
            TokenType::ELSE => "ELSE",
            TokenType::FALSE => "FALSE",
            TokenType::FOR => "FOR",
            TokenType::FUNC => "FUNC",
            TokenType::IF => "IF",
            TokenType::NIL => "NIL",
            TokenType::RETURN => "RETURN",
            TokenType::TRUE => "TRUE",
            TokenType::TYPE => "TYPE",
            TokenType::VAR => "VAR",
            TokenType::EOF => "EOF",
        }
    }
}

/// A scanned token, including its type, the original lexeme,
/// and the line number where it was found.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Token<'a> {
    /// The category of this token.
    pub token_type: TokenType,

    /// The exact substring from the source that produced this token.
    pub lexeme: &'a str,

    /// 1-based line number in the source.
    pub line: usize,
}

impl<'a> Token<'a> {
    /// Create a new Token with the given type, lexeme, and line.
    pub fn new(token_type: TokenType, lexeme: &'a str, line: usize) -> Self {
        trace!(
            "Creating new token: type={:?}, lexeme={}, line={}",
            token_type,
            lexeme,
            line
        );

        Self {
            token_type,
            lexeme,
            line,
        }
    }
}

impl<'a> fmt::Display for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant: &'static str = self.token_type.name();

        match &self.token_type {
            TokenType::STRING(s) | TokenType::TIME(s) => {
                write!(f, "{} {} {}", variant, self.lexeme, s)
            }

            TokenType::NUMBER(n) | TokenType::DURATION(n) => {
                let mut buf: itoa::Buffer = itoa::Buffer::new();
                write!(f, "{} {} {}", variant, self.lexeme, buf.format(*n))
            }

            _ => write!(f, "{} {} null", variant, self.lexeme),
        }
    }
}
