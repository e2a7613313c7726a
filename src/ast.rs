//! Syntax tree for Quill programs.
//!
//! The tree is a closed set of node kinds: [`Expr`] for everything that
//! produces a value and [`Stmt`] for everything that may also produce a
//! control-flow sentinel (`return`, `break`).  Nodes are built once by the
//! [`Parser`](crate::parser::Parser) and never mutated afterwards.  Function
//! bodies and record prototypes sit behind `Rc` so that runtime values can
//! share them without copying the tree.

use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A literal constant that appears directly in the source code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Literal {
    Int(i64),
    Str(Rc<str>),
    Bool(bool),
    Nil,
    Time(DateTime<Utc>),
    /// Length in nanoseconds.
    Duration(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Expression nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Literal(Literal),

    /// Parenthesised sub-expression, kept so error messages can quote the
    /// callee the way it was written.
    Grouping(Box<Expr>),

    Variable {
        name: Rc<str>,
        line: usize,
    },

    Unary {
        op: UnaryOp,
        right: Box<Expr>,
        line: usize,
    },

    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
        line: usize,
    },

    /// `target = value` where target is a variable, member chain or index.
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        line: usize,
    },

    /// Postfix `target++` (`delta == 1`) or `target--` (`delta == -1`).
    Step {
        target: Box<Expr>,
        delta: i64,
        line: usize,
    },

    /// Member-access chain `object.l1.l2…`; `labels` is never empty.
    Member {
        object: Box<Expr>,
        labels: Vec<Rc<str>>,
        line: usize,
    },

    Array {
        elements: Vec<Expr>,
        line: usize,
    },

    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        line: usize,
    },

    /// Anonymous function literal (a closure).
    Function(Rc<FunctionDecl>),

    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
        line: usize,
    },

    /// `Type{field: value, …}`
    Instantiate {
        type_name: Rc<str>,
        fields: Vec<(Rc<str>, Expr)>,
        line: usize,
    },
}

impl Expr {
    pub fn line(&self) -> usize {
        match self {
            Expr::Literal(_) => 0,
            Expr::Grouping(inner) => inner.line(),
            Expr::Function(decl) => decl.line,
            Expr::Variable { line, .. }
            | Expr::Unary { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Assign { line, .. }
            | Expr::Step { line, .. }
            | Expr::Member { line, .. }
            | Expr::Array { line, .. }
            | Expr::Index { line, .. }
            | Expr::Call { line, .. }
            | Expr::Instantiate { line, .. } => *line,
        }
    }

    /// Can this expression appear on the left of `=` or before `++`?
    pub fn is_place(&self) -> bool {
        matches!(
            self,
            Expr::Variable { .. } | Expr::Member { .. } | Expr::Index { .. }
        )
    }
}

/// Shared body of named functions, methods and closures.
#[derive(Debug, PartialEq, Serialize)]
pub struct FunctionDecl {
    /// `None` for anonymous literals.
    pub name: Option<Rc<str>>,

    /// Parameter names; methods carry the implicit `this` first.
    pub params: Vec<Rc<str>>,

    pub body: Vec<Stmt>,

    /// Names read inside an anonymous literal but declared outside of it,
    /// in order of first use.  Always empty for named functions.
    pub captures: Vec<Rc<str>>,

    pub line: usize,
}

impl FunctionDecl {
    pub fn is_closure(&self) -> bool {
        self.name.is_none()
    }
}

/// One `field: default` entry of a record type declaration.
#[derive(Debug, PartialEq, Serialize)]
pub struct FieldDecl {
    pub name: Rc<str>,
    pub default: Option<Expr>,
}

/// `type Name { field: default, … }`
#[derive(Debug, PartialEq, Serialize)]
pub struct TypeDecl {
    pub name: Rc<str>,
    pub fields: Vec<FieldDecl>,
    pub line: usize,
}

/// `else if check { … }` clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElseIf {
    pub check: Expr,
    pub body: Vec<Stmt>,
}

/// Statement nodes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stmt {
    Expression(Expr),

    /// `var name = init` and `name := init`.
    Var {
        name: Rc<str>,
        initializer: Option<Expr>,
        line: usize,
    },

    /// Bare `{ … }` block.
    Block(Vec<Stmt>),

    If {
        check: Expr,
        then_branch: Vec<Stmt>,
        else_ifs: Vec<ElseIf>,
        else_branch: Option<Vec<Stmt>>,
        line: usize,
    },

    For {
        pre: Option<Box<Stmt>>,
        check: Option<Expr>,
        post: Option<Box<Stmt>>,
        body: Vec<Stmt>,
        line: usize,
    },

    Break {
        line: usize,
    },

    Return {
        value: Option<Expr>,
        line: usize,
    },

    /// Top-level `func name(…) { … }`.
    Function(Rc<FunctionDecl>),

    /// Top-level `func Type.name(…) { … }`.
    Method {
        type_name: Rc<str>,
        name: Rc<str>,
        decl: Rc<FunctionDecl>,
    },

    /// Top-level `type Name { … }`.
    Type(Rc<TypeDecl>),
}
