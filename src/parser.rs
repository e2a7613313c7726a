/*!
Recursive-descent parser for Quill
==================================

Consumes the token slice produced by [`tokenize`](crate::scanner::tokenize) and
builds the immutable [`Stmt`]/[`Expr`] tree.  There is no error recovery: the
first malformed construct aborts the parse with the offending token and line.

### Complexity

Every token is consumed once by `advance()`; lookahead never exceeds one token
and push-back never rewinds more than one, so parsing is **Θ(n)** in the number
of tokens.  Call-stack depth grows with syntactic nesting only.

### Logging Policy

| Location                       | Level   | Purpose                                   |
|--------------------------------|---------|-------------------------------------------|
| `Parser::new`, `parse`         | `info`  | Lifecycle milestones.                     |
| `declaration`, `statement`     | `debug` | High-level descent into grammar branches. |

--------------------------------------------------------------------------------
Grammar (condensed EBNF)
--------------------------------------------------------------------------------

```text
program     → declaration* EOF ;
declaration → "func" IDENT ( "." IDENT )? "(" params? ")" block
            | "type" IDENT "{" ( IDENT ( ":" expression )? ","? )* "}"
            | statement ;
statement   → ( varDecl | ifStmt | forStmt | "break" | "return" expression?
              | block | simple ) ";"* ;
varDecl     → "var" IDENT ( "=" expression )? ;
simple      → IDENT ":=" expression | expression ;
ifStmt      → "if" expression block ( "else" "if" expression block )*
              ( "else" block )? ;
forStmt     → "for" ( simple? ";" expression? ";" simple? | expression )? block ;
block       → "{" statement* "}" ;
expression  → binary ( "=" expression )? ;
binary      → unary ( OP binary )* ;              precedence climbing
unary       → ( "-" | "!" ) unary | postfix ;
postfix     → primary ( "(" args? ")" | "[" expression "]" | "." IDENT
              | "++" | "--" )* ;
primary     → NUMBER | STRING | DURATION | TIME | "true" | "false" | "nil"
            | TYPE_NAME "{" ( IDENT ":" expression ","? )* "}"
            | IDENT | "(" expression ")" | "[" elements? "]"
            | "func" "(" params? ")" block ;
```

Binary precedence, highest first: `* /`, `+ -`, `< <= > >= == !=`, `&&`,
`||`; all left-associative.

### Ambiguities

* `(`, `[`, `++` and `--` only continue a postfix expression when they sit on
  the same line as the token before them.
* `func` followed by an identifier is a declaration (top level only),
  otherwise a function literal.  The parser reads the keyword, peeks, and
  pushes the keyword back when it is not a declaration.
* `Name {` is a record instantiation when `Name` is a record type declared
  earlier in the source, *unless* the parser is in the condition position of
  an `if`/`for`, where `{` opens the body.  The position is tracked on an
  explicit status stack.
*/

use std::collections::HashSet;
use std::rc::Rc;

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::ast::{BinaryOp, ElseIf, Expr, FieldDecl, FunctionDecl, Literal, Stmt, TypeDecl, UnaryOp};
use crate::capture::CaptureTracker;
use crate::error::{QuillError, Result};
use crate::token::{Token, TokenType};

/// Maximum number of parameters / call arguments.
const MAX_ARGS: usize = 255;

/// Returned by `peek` when the token slice is exhausted or empty.
static EOF_TOKEN: Token<'static> = Token {
    token_type: TokenType::EOF,
    lexeme: "",
    line: 0,
};

/// What the parser is currently inside of.  Consulted to decide what `{`
/// means and whether `break` / `return` are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    /// Top level, or an argument/element list where `{` cannot open a body.
    Global,
    /// The condition of an `if` / `else if`.
    If,
    /// A `for` statement: its header while it is the top status, its body
    /// while a `Block` sits above it.
    For,
    /// A function body.
    Function,
    /// A braced statement list.
    Block,
}

/// Binary operator and its precedence for a token, if it is one.
fn binary_operator(tt: &TokenType) -> Option<(BinaryOp, u8)> {
    let entry: (BinaryOp, u8) = match tt {
        TokenType::OR_OR => (BinaryOp::Or, 1),
        TokenType::AND_AND => (BinaryOp::And, 2),
        TokenType::EQUAL_EQUAL => (BinaryOp::Equal, 3),
        TokenType::BANG_EQUAL => (BinaryOp::NotEqual, 3),
        TokenType::LESS => (BinaryOp::Less, 3),
        TokenType::LESS_EQUAL => (BinaryOp::LessEqual, 3),
        TokenType::GREATER => (BinaryOp::Greater, 3),
        TokenType::GREATER_EQUAL => (BinaryOp::GreaterEqual, 3),
        TokenType::PLUS => (BinaryOp::Add, 4),
        TokenType::MINUS => (BinaryOp::Sub, 4),
        TokenType::STAR => (BinaryOp::Mul, 5),
        TokenType::SLASH => (BinaryOp::Div, 5),
        _ => return None,
    };

    Some(entry)
}

/// Top-level parser over an immutable slice of tokens.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    status: Vec<Status>,
    captures: CaptureTracker,
    record_types: HashSet<Rc<str>>,
}

impl<'a> Parser<'a> {
    /// Construct a new parser.
    pub fn new(tokens: &'a [Token<'a>]) -> Self {
        info!("Parser created with {} tokens", tokens.len());

        Self {
            tokens,
            current: 0,
            status: vec![Status::Global],
            captures: CaptureTracker::new(),
            record_types: HashSet::new(),
        }
    }

    // ───────────────────────── public API ─────────────────────────

    /// Parse an entire program and return its statement list.
    pub fn parse(&mut self) -> Result<Vec<Stmt>> {
        info!("Beginning parse phase");

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.is_at_end() {
            statements.push(self.declaration()?);
        }

        info!("Parsed {} top-level statement(s)", statements.len());

        Ok(statements)
    }

    // ──────────────────────── declaration rules ───────────────────

    fn declaration(&mut self) -> Result<Stmt> {
        debug!("Entering declaration");

        if self.matches(TokenType::FUNC) {
            if self.check(TokenType::IDENTIFIER) {
                return self.function_declaration();
            }

            // A function literal used as an expression statement.
            self.push_back();
        } else if self.matches(TokenType::TYPE) {
            return self.type_declaration();
        }

        self.statement()
    }

    fn function_declaration(&mut self) -> Result<Stmt> {
        let name: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected function name")?;

        if self.matches(TokenType::DOT) {
            let method: &Token<'_> =
                self.consume(TokenType::IDENTIFIER, "Expected method name after '.'")?;

            let type_name: Rc<str> = Rc::from(name.lexeme);

            if !self.record_types.contains(&type_name) {
                return Err(self.error_at(
                    name,
                    format!("Undeclared record type '{}' for method", name.lexeme),
                ));
            }

            let mut params: Vec<Rc<str>> = vec![Rc::from("this")];
            params.extend(self.parameters(method)?);

            let body: Vec<Stmt> = self.function_body()?;

            debug!("Parsed method {}.{}", name.lexeme, method.lexeme);

            return Ok(Stmt::Method {
                type_name,
                name: Rc::from(method.lexeme),
                decl: Rc::new(FunctionDecl {
                    name: Some(Rc::from(format!("{}.{}", name.lexeme, method.lexeme))),
                    params,
                    body,
                    captures: Vec::new(),
                    line: name.line,
                }),
            });
        }

        let params: Vec<Rc<str>> = self.parameters(name)?;
        let body: Vec<Stmt> = self.function_body()?;

        debug!("Parsed function {}", name.lexeme);

        Ok(Stmt::Function(Rc::new(FunctionDecl {
            name: Some(Rc::from(name.lexeme)),
            params,
            body,
            captures: Vec::new(),
            line: name.line,
        })))
    }

    fn type_declaration(&mut self) -> Result<Stmt> {
        let name: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected type name")?;

        self.consume(TokenType::LEFT_BRACE, "Expected '{' before type body")?;
        self.status.push(Status::Global);

        let mut fields: Vec<FieldDecl> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            let field: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected field name")?;

            if fields.iter().any(|f| &*f.name == field.lexeme) {
                return Err(self.error_at(field, "Duplicate field in type declaration"));
            }

            let default: Option<Expr> = if self.matches(TokenType::COLON) {
                Some(self.expression()?)
            } else {
                None
            };

            fields.push(FieldDecl {
                name: Rc::from(field.lexeme),
                default,
            });

            self.matches(TokenType::COMMA);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after type body")?;
        self.status.pop();

        let type_name: Rc<str> = Rc::from(name.lexeme);
        self.record_types.insert(Rc::clone(&type_name));

        debug!("Parsed type {} with {} field(s)", name.lexeme, fields.len());

        Ok(Stmt::Type(Rc::new(TypeDecl {
            name: type_name,
            fields,
            line: name.line,
        })))
    }

    /// `"(" IDENT ( "," IDENT )* ")"`
    fn parameters(&mut self, owner: &Token<'_>) -> Result<Vec<Rc<str>>> {
        self.consume(TokenType::LEFT_PAREN, "Expected '(' before parameters")?;

        let mut params: Vec<Rc<str>> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if params.len() >= MAX_ARGS {
                    return Err(self.error_at(owner, "Cannot have more than 255 parameters"));
                }

                let param: &Token<'_> =
                    self.consume(TokenType::IDENTIFIER, "Expected parameter name")?;

                if params.iter().any(|p| &**p == param.lexeme) {
                    return Err(self.error_at(param, "Duplicate parameter name"));
                }

                params.push(Rc::from(param.lexeme));

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after parameters")?;

        Ok(params)
    }

    fn function_body(&mut self) -> Result<Vec<Stmt>> {
        self.status.push(Status::Function);
        let body: Result<Vec<Stmt>> = self.block("Expected '{' before function body");
        self.status.pop();

        body
    }

    // ───────────────────────── statement rules ────────────────────

    fn statement(&mut self) -> Result<Stmt> {
        debug!("Entering statement at line {}", self.peek().line);

        let stmt: Stmt = match self.peek().token_type {
            TokenType::VAR => {
                self.advance();
                self.var_declaration()?
            }

            TokenType::IF => {
                self.advance();
                self.if_statement()?
            }

            TokenType::FOR => {
                self.advance();
                self.for_statement()?
            }

            TokenType::BREAK => {
                self.advance();
                self.break_statement()?
            }

            TokenType::RETURN => {
                self.advance();
                self.return_statement()?
            }

            TokenType::LEFT_BRACE => Stmt::Block(self.block("Expected '{'")?),

            TokenType::TYPE => {
                return Err(self.error_at(
                    self.peek(),
                    "Type declarations are only allowed at top level",
                ));
            }

            _ => self.simple_statement()?,
        };

        while self.matches(TokenType::SEMICOLON) {}

        Ok(stmt)
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected variable name")?;

        let initializer: Option<Expr> = if self.matches(TokenType::EQUAL) {
            Some(self.expression()?)
        } else {
            None
        };

        // Declared only after the initializer: `var x = x + 1` reads the outer x.
        let name_rc: Rc<str> = Rc::from(name.lexeme);
        self.captures.declare(&name_rc);

        Ok(Stmt::Var {
            name: name_rc,
            initializer,
            line: name.line,
        })
    }

    /// `IDENT ":=" expression` or a plain expression statement.
    fn simple_statement(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::IDENTIFIER) {
            let name: &Token<'_> = self.previous();

            if self.matches(TokenType::COLON_EQUAL) {
                let initializer: Expr = self.expression()?;

                let name_rc: Rc<str> = Rc::from(name.lexeme);
                self.captures.declare(&name_rc);

                return Ok(Stmt::Var {
                    name: name_rc,
                    initializer: Some(initializer),
                    line: name.line,
                });
            }

            self.push_back();
        }

        Ok(Stmt::Expression(self.expression()?))
    }

    /// Parse an `if`/`for` condition with `status` on top of the stack, so a
    /// `{` after a record type name closes the condition.
    fn condition(&mut self, status: Status) -> Result<Expr> {
        self.status.push(status);
        let check: Result<Expr> = self.expression();
        self.status.pop();

        check
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let line: usize = self.previous().line;
        let check: Expr = self.condition(Status::If)?;
        let then_branch: Vec<Stmt> = self.block("Expected '{' after if condition")?;

        let mut else_ifs: Vec<ElseIf> = Vec::new();
        let mut else_branch: Option<Vec<Stmt>> = None;

        while self.matches(TokenType::ELSE) {
            if self.matches(TokenType::IF) {
                let check: Expr = self.condition(Status::If)?;
                let body: Vec<Stmt> = self.block("Expected '{' after else if condition")?;

                else_ifs.push(ElseIf { check, body });
            } else {
                else_branch = Some(self.block("Expected '{' after else")?);
                break;
            }
        }

        Ok(Stmt::If {
            check,
            then_branch,
            else_ifs,
            else_branch,
            line,
        })
    }

    /// `pre` clause of a three-clause `for`: a `var` or a simple statement.
    fn for_clause(&mut self) -> Result<Stmt> {
        if self.matches(TokenType::VAR) {
            self.var_declaration()
        } else {
            self.simple_statement()
        }
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        let line: usize = self.previous().line;

        // Stays on the stack for the body as well, so `break` can see it.
        self.status.push(Status::For);
        // The `pre` clause is scoped to the loop.
        self.captures.enter_block();

        let mut pre: Option<Box<Stmt>> = None;
        let mut check: Option<Expr> = None;
        let mut post: Option<Box<Stmt>> = None;

        if !self.check(TokenType::LEFT_BRACE) {
            let first: Option<Stmt> = if self.check(TokenType::SEMICOLON) {
                None
            } else {
                Some(self.for_clause()?)
            };

            if self.matches(TokenType::SEMICOLON) {
                pre = first.map(Box::new);

                if !self.check(TokenType::SEMICOLON) {
                    check = Some(self.expression()?);
                }

                self.consume(TokenType::SEMICOLON, "Expected ';' after loop condition")?;

                if !self.check(TokenType::LEFT_BRACE) {
                    post = Some(Box::new(self.simple_statement()?));
                }
            } else {
                match first {
                    Some(Stmt::Expression(expr)) => check = Some(expr),
                    _ => return Err(self.error_at(self.peek(), "Malformed for clause")),
                }
            }
        }

        let body: Vec<Stmt> = self.block("Expected '{' before loop body")?;

        self.captures.leave_block();
        self.status.pop();

        Ok(Stmt::For {
            pre,
            check,
            post,
            body,
            line,
        })
    }

    fn break_statement(&mut self) -> Result<Stmt> {
        let keyword: &Token<'_> = self.previous();

        if !self.in_loop() {
            return Err(self.error_at(keyword, "'break' used outside of a loop"));
        }

        Ok(Stmt::Break {
            line: keyword.line,
        })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword: &Token<'_> = self.previous();

        if !self.status.contains(&Status::Function) {
            return Err(self.error_at(keyword, "'return' used outside of function"));
        }

        let bare: bool = self.check(TokenType::RIGHT_BRACE)
            || self.check(TokenType::SEMICOLON)
            || self.is_at_end()
            || self.peek().line != keyword.line;

        let value: Option<Expr> = if bare { None } else { Some(self.expression()?) };

        Ok(Stmt::Return {
            value,
            line: keyword.line,
        })
    }

    fn block(&mut self, message: &str) -> Result<Vec<Stmt>> {
        self.consume(TokenType::LEFT_BRACE, message)?;
        self.status.push(Status::Block);
        self.captures.enter_block();

        let mut statements: Vec<Stmt> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            statements.push(self.statement()?);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after block")?;
        self.captures.leave_block();
        self.status.pop();

        Ok(statements)
    }

    // ─────────────────────── expression rules ─────────────────────

    fn expression(&mut self) -> Result<Expr> {
        let expr: Expr = self.binary(0)?;

        if self.matches(TokenType::EQUAL) {
            let equals: &Token<'_> = self.previous();

            if !expr.is_place() {
                return Err(self.error_at(equals, "Invalid assignment target"));
            }

            let value: Expr = self.expression()?;

            return Ok(Expr::Assign {
                target: Box::new(expr),
                value: Box::new(value),
                line: equals.line,
            });
        }

        Ok(expr)
    }

    /// Precedence climbing: folds every operator binding at least as tightly
    /// as `min_precedence` into `left`.
    fn binary(&mut self, min_precedence: u8) -> Result<Expr> {
        let mut left: Expr = self.unary()?;

        while let Some((op, precedence)) = binary_operator(&self.peek().token_type) {
            if precedence < min_precedence {
                break;
            }

            let line: usize = self.advance().line;
            let right: Expr = self.binary(precedence + 1)?;

            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                line,
            };
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op: Option<UnaryOp> = match self.peek().token_type {
            TokenType::MINUS => Some(UnaryOp::Negate),
            TokenType::BANG => Some(UnaryOp::Not),
            _ => None,
        };

        if let Some(op) = op {
            let line: usize = self.advance().line;
            let right: Expr = self.unary()?;

            return Ok(Expr::Unary {
                op,
                right: Box::new(right),
                line,
            });
        }

        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut expr: Expr = self.primary()?;

        loop {
            if self.check_same_line(TokenType::LEFT_PAREN) {
                self.advance();
                expr = self.finish_call(expr)?;
            } else if self.check_same_line(TokenType::LEFT_BRACKET) {
                let line: usize = self.advance().line;

                self.status.push(Status::Global);
                let index: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after index")?;
                self.status.pop();

                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    line,
                };
            } else if self.matches(TokenType::DOT) {
                let dot_line: usize = self.previous().line;
                let label: Rc<str> = Rc::from(
                    self.consume(TokenType::IDENTIFIER, "Expected member name after '.'")?
                        .lexeme,
                );

                expr = match expr {
                    Expr::Member {
                        object,
                        mut labels,
                        line,
                    } => {
                        labels.push(label);

                        Expr::Member {
                            object,
                            labels,
                            line,
                        }
                    }

                    other => Expr::Member {
                        object: Box::new(other),
                        labels: vec![label],
                        line: dot_line,
                    },
                };
            } else if self.check_same_line(TokenType::PLUS_PLUS)
                || self.check_same_line(TokenType::MINUS_MINUS)
            {
                let op: &Token<'_> = self.advance();

                if !expr.is_place() {
                    return Err(self.error_at(op, "Invalid increment target"));
                }

                let delta: i64 = if op.token_type == TokenType::PLUS_PLUS { 1 } else { -1 };

                expr = Expr::Step {
                    target: Box::new(expr),
                    delta,
                    line: op.line,
                };
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let line: usize = self.previous().line;

        self.status.push(Status::Global);

        let mut arguments: Vec<Expr> = Vec::new();

        if !self.check(TokenType::RIGHT_PAREN) {
            loop {
                if arguments.len() >= MAX_ARGS {
                    return Err(self.error_at(self.peek(), "Cannot have more than 255 arguments"));
                }

                arguments.push(self.expression()?);

                if !self.matches(TokenType::COMMA) {
                    break;
                }
            }
        }

        self.consume(TokenType::RIGHT_PAREN, "Expected ')' after arguments")?;
        self.status.pop();

        Ok(Expr::Call {
            callee: Box::new(callee),
            arguments,
            line,
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        let token: &'a Token<'a> = self.advance();

        match &token.token_type {
            TokenType::NUMBER(n) => Ok(Expr::Literal(Literal::Int(*n))),

            TokenType::STRING(s) => Ok(Expr::Literal(Literal::Str(Rc::from(s.as_str())))),

            TokenType::DURATION(ns) => Ok(Expr::Literal(Literal::Duration(*ns))),

            TokenType::TIME(text) => DateTime::parse_from_rfc3339(text)
                .map(|t| Expr::Literal(Literal::Time(t.with_timezone(&Utc))))
                .map_err(|e| self.error_at(token, format!("Invalid time literal: {}", e))),

            TokenType::TRUE => Ok(Expr::Literal(Literal::Bool(true))),

            TokenType::FALSE => Ok(Expr::Literal(Literal::Bool(false))),

            TokenType::NIL => Ok(Expr::Literal(Literal::Nil)),

            TokenType::IDENTIFIER => self.identifier(token),

            TokenType::LEFT_PAREN => {
                self.status.push(Status::Global);
                let expr: Expr = self.expression()?;
                self.consume(TokenType::RIGHT_PAREN, "Expected ')' after expression")?;
                self.status.pop();

                Ok(Expr::Grouping(Box::new(expr)))
            }

            TokenType::LEFT_BRACKET => self.array_literal(token),

            TokenType::FUNC => self.function_literal(token),

            _ => Err(self.error_at(token, "Expected expression")),
        }
    }

    fn identifier(&mut self, token: &'a Token<'a>) -> Result<Expr> {
        let name: Rc<str> = Rc::from(token.lexeme);

        if self.record_types.contains(&name)
            && self.check(TokenType::LEFT_BRACE)
            && !self.in_condition()
        {
            return self.instantiation(name, token.line);
        }

        self.captures.read(&name);

        Ok(Expr::Variable {
            name,
            line: token.line,
        })
    }

    /// `Type "{" ( IDENT ":" expression ","? )* "}"`
    fn instantiation(&mut self, type_name: Rc<str>, line: usize) -> Result<Expr> {
        self.consume(TokenType::LEFT_BRACE, "Expected '{' after type name")?;
        self.status.push(Status::Global);

        let mut fields: Vec<(Rc<str>, Expr)> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACE) && !self.is_at_end() {
            let field: &Token<'_> = self.consume(TokenType::IDENTIFIER, "Expected field name")?;

            self.consume(TokenType::COLON, "Expected ':' after field name")?;

            if fields.iter().any(|(name, _)| &**name == field.lexeme) {
                return Err(self.error_at(field, "Field initialized twice"));
            }

            let value: Expr = self.expression()?;
            fields.push((Rc::from(field.lexeme), value));

            self.matches(TokenType::COMMA);
        }

        self.consume(TokenType::RIGHT_BRACE, "Expected '}' after record fields")?;
        self.status.pop();

        Ok(Expr::Instantiate {
            type_name,
            fields,
            line,
        })
    }

    fn array_literal(&mut self, bracket: &Token<'_>) -> Result<Expr> {
        self.status.push(Status::Global);

        let mut elements: Vec<Expr> = Vec::new();

        while !self.check(TokenType::RIGHT_BRACKET) && !self.is_at_end() {
            elements.push(self.expression()?);

            if !self.matches(TokenType::COMMA) {
                break;
            }
        }

        self.consume(TokenType::RIGHT_BRACKET, "Expected ']' after array elements")?;
        self.status.pop();

        Ok(Expr::Array {
            elements,
            line: bracket.line,
        })
    }

    fn function_literal(&mut self, keyword: &Token<'_>) -> Result<Expr> {
        if self.check(TokenType::IDENTIFIER) {
            return Err(self.error_at(
                self.peek(),
                "Named functions may only be declared at top level",
            ));
        }

        let params: Vec<Rc<str>> = self.parameters(keyword)?;

        self.captures.push(&params);
        let body: Result<Vec<Stmt>> = self.function_body();
        let captures: Vec<Rc<str>> = self.captures.pop();

        debug!("Parsed function literal capturing {:?}", captures);

        Ok(Expr::Function(Rc::new(FunctionDecl {
            name: None,
            params,
            body: body?,
            captures,
            line: keyword.line,
        })))
    }

    // ────────────────────── utility helpers ───────────────────────

    /// Is a `for` loop open between here and the nearest function boundary?
    fn in_loop(&self) -> bool {
        for status in self.status.iter().rev() {
            match status {
                Status::For => return true,
                Status::Function => return false,
                _ => {}
            }
        }

        false
    }

    /// Is the parser sitting in an `if`/`for` condition?
    fn in_condition(&self) -> bool {
        matches!(self.status.last(), Some(Status::If | Status::For))
    }

    fn error_at<S: Into<String>>(&self, token: &Token<'_>, message: S) -> QuillError {
        QuillError::parse(token.line, token.lexeme, message)
    }

    #[inline(always)]
    fn matches(&mut self, ttype: TokenType) -> bool {
        if self.check(ttype) {
            self.advance();

            return true;
        }

        false
    }

    #[inline(always)]
    fn consume(&mut self, ttype: TokenType, message: &str) -> Result<&'a Token<'a>> {
        if self.check(ttype) {
            return Ok(self.advance());
        }

        Err(self.error_at(self.peek(), message))
    }

    #[inline(always)]
    fn check(&self, ttype: TokenType) -> bool {
        self.peek().token_type == ttype
    }

    /// `check`, additionally requiring the token to sit on the same line as
    /// the one just consumed.
    #[inline(always)]
    fn check_same_line(&self, ttype: TokenType) -> bool {
        self.check(ttype) && self.peek().line == self.previous().line
    }

    /// Consume the current token and return it.  At EOF nothing moves and
    /// the EOF token is returned.
    #[inline(always)]
    fn advance(&mut self) -> &'a Token<'a> {
        let token: &'a Token<'a> = self.peek();

        if !self.is_at_end() {
            self.current += 1;
        }

        token
    }

    /// Un-read the token consumed by the last `advance`.
    #[inline(always)]
    fn push_back(&mut self) {
        self.current = self.current.saturating_sub(1);
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        matches!(self.peek().token_type, TokenType::EOF)
    }

    #[inline(always)]
    fn peek(&self) -> &'a Token<'a> {
        self.tokens.get(self.current).unwrap_or(&EOF_TOKEN)
    }

    #[inline(always)]
    fn previous(&self) -> &'a Token<'a> {
        self.current
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .unwrap_or(&EOF_TOKEN)
    }
}
