//! Tree-walking evaluator.
//!
//! Statements produce a [`Flow`]: either a normal value or one of the
//! `Return`/`Break` sentinels, which every statement list passes straight up
//! to whoever can consume it.  Nothing here uses unwinding for control flow;
//! errors are the only thing that travels through `?`.
//!
//! Every frame is pushed through [`Interpreter::with_frame`], which pops it
//! again on every exit path.

use std::io::{self, Write};
use std::rc::Rc;

use chrono::TimeDelta;
use log::{debug, info, trace};

use crate::ast::{BinaryOp, Expr, FunctionDecl, Literal, Stmt, UnaryOp};
use crate::ast_printer::AstPrinter;
use crate::builtins::Builtins;
use crate::environment::Environment;
use crate::error::{QuillError, Result};
use crate::value::{
    checked_index, Array, CaptureState, Members, NativeFunction, Record, RecordType, Slot,
    UserFunction, Value,
};

/// Result of executing a statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal(Value),
    Return(Value),
    Break,
}

/// Something that can be written to: a binding or an array element.
enum Place {
    Slot(Slot),
    Element(Rc<Array>, i64),
}

impl Place {
    fn load(&self) -> Result<Value> {
        match self {
            Place::Slot(slot) => Ok(slot.borrow().clone()),
            Place::Element(array, index) => array.get(*index),
        }
    }

    fn store(&self, value: Value) -> Result<()> {
        match self {
            Place::Slot(slot) => {
                *slot.borrow_mut() = value;
                Ok(())
            }
            Place::Element(array, index) => array.set(*index, value),
        }
    }
}

pub struct Interpreter {
    environment: Environment,
    builtins: Builtins,
    out: Box<dyn Write>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// An interpreter with the standard builtins, printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    pub fn with_output(out: Box<dyn Write>) -> Self {
        Self::with_builtins(Builtins::standard(), out)
    }

    pub fn with_builtins(builtins: Builtins, out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        Self {
            environment: Environment::new(),
            builtins,
            out,
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Run a program.  Top-level types, functions and methods are registered
    /// first, in source order; then the statements run.  The value of the last
    /// statement is returned.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<Value> {
        debug!("Interpreting {} statements", statements.len());

        self.hoist(statements)?;

        let flow: Result<Flow> = self.execute_block(statements);
        self.out.flush()?;
        let flow: Flow = flow?;

        info!("Interpretation completed successfully");

        match flow {
            Flow::Normal(value) | Flow::Return(value) => Ok(value),
            Flow::Break => Ok(Value::Nil),
        }
    }

    fn hoist(&mut self, statements: &[Stmt]) -> Result<()> {
        for stmt in statements {
            if let Stmt::Type(decl) = stmt {
                let record_type: Rc<RecordType> = Rc::new(RecordType::new(Rc::clone(decl)));
                self.environment
                    .add_record_type(Rc::clone(&decl.name), record_type)?;
            }
        }

        for stmt in statements {
            match stmt {
                Stmt::Function(decl) => {
                    let name: Rc<str> = decl
                        .name
                        .clone()
                        .ok_or_else(|| QuillError::Internal("unnamed function declaration".into()))?;

                    self.environment
                        .add_global_function(name, named_function(decl))?;
                }

                Stmt::Method {
                    type_name,
                    name,
                    decl,
                } => {
                    let record_type: Rc<RecordType> = self
                        .environment
                        .get_record_type(type_name)
                        .ok_or_else(|| QuillError::undefined(type_name.to_string()))?;

                    debug!("Attaching method '{}.{}'", type_name, name);

                    record_type.add_method(Rc::clone(name), named_function(decl))?;
                }

                _ => {}
            }
        }

        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statements
    // ─────────────────────────────────────────────────────────────────────────

    /// Push a frame, run `body`, pop the frame whatever `body` returned.
    fn with_frame<T>(
        &mut self,
        isolate: bool,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.environment.push_frame(isolate);

        let result: Result<T> = body(self);
        let popped: Result<()> = self.environment.pop_frame();

        let value: T = result?;
        popped?;

        Ok(value)
    }

    /// Run statements in order, stopping at the first sentinel.
    fn execute_block(&mut self, statements: &[Stmt]) -> Result<Flow> {
        let mut last: Value = Value::Nil;

        for stmt in statements {
            match self.execute(stmt)? {
                Flow::Normal(value) => last = value,
                sentinel => return Ok(sentinel),
            }
        }

        Ok(Flow::Normal(last))
    }

    pub fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => Ok(Flow::Normal(self.evaluate(expr)?)),

            Stmt::Var {
                name, initializer, ..
            } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                trace!("Defining '{}' = {}", name, value);

                let slot: Slot = self.environment.define(Rc::clone(name), value);

                // `var f = func() { f() }` refers to the binding being defined.
                if let (Some(Expr::Function(_)), Value::Function(function)) =
                    (initializer, &*slot.borrow())
                {
                    function.bind_pending(name, &slot);
                }

                Ok(Flow::Normal(Value::Nil))
            }

            Stmt::Block(statements) => self.with_frame(false, |it| it.execute_block(statements)),

            Stmt::If {
                check,
                then_branch,
                else_ifs,
                else_branch,
                line,
            } => {
                debug!("Evaluating if on line {}", line);

                if self.condition(check)? {
                    return self.with_frame(false, |it| it.execute_block(then_branch));
                }

                for clause in else_ifs {
                    if self.condition(&clause.check)? {
                        return self.with_frame(false, |it| it.execute_block(&clause.body));
                    }
                }

                match else_branch {
                    Some(body) => self.with_frame(false, |it| it.execute_block(body)),
                    None => Ok(Flow::Normal(Value::Nil)),
                }
            }

            Stmt::For {
                pre,
                check,
                post,
                body,
                line,
            } => {
                debug!("Entering for loop on line {}", line);

                self.with_frame(false, |it| {
                    it.run_loop(pre.as_deref(), check.as_ref(), post.as_deref(), body)
                })
            }

            Stmt::Break { .. } => Ok(Flow::Break),

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr)?,
                    None => Value::Nil,
                };

                Ok(Flow::Return(value))
            }

            // Registered before execution starts.
            Stmt::Function(_) | Stmt::Method { .. } | Stmt::Type(_) => {
                Ok(Flow::Normal(Value::Nil))
            }
        }
    }

    fn run_loop(
        &mut self,
        pre: Option<&Stmt>,
        check: Option<&Expr>,
        post: Option<&Stmt>,
        body: &[Stmt],
    ) -> Result<Flow> {
        if let Some(pre) = pre {
            self.execute(pre)?;
        }

        loop {
            if let Some(check) = check {
                if !self.condition(check)? {
                    break;
                }
            }

            match self.with_frame(false, |it| it.execute_block(body))? {
                Flow::Normal(_) => {}
                Flow::Break => break,
                Flow::Return(value) => return Ok(Flow::Return(value)),
            }

            if let Some(post) = post {
                self.execute(post)?;
            }
        }

        debug!("Exited for loop");

        Ok(Flow::Normal(Value::Nil))
    }

    fn condition(&mut self, check: &Expr) -> Result<bool> {
        match self.evaluate(check)? {
            Value::Bool(b) => Ok(b),
            other => Err(QuillError::type_error(format!(
                "condition must be a bool, found {}",
                other.kind()
            ))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expressions
    // ─────────────────────────────────────────────────────────────────────────

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(literal_value(literal)),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Variable { name, .. } => self.lookup_variable(name),

            Expr::Unary { op, right, .. } => {
                let value: Value = self.evaluate(right)?;
                unary(*op, value)
            }

            Expr::Binary {
                left, op, right, ..
            } => self.binary(left, *op, right),

            Expr::Assign { target, value, .. } => {
                let place: Place = self.place(target)?;
                let value: Value = self.evaluate(value)?;
                place.store(value.clone())?;

                Ok(value)
            }

            Expr::Step { target, delta, .. } => {
                let place: Place = self.place(target)?;

                match place.load()? {
                    Value::Int(n) => {
                        place.store(Value::Int(n.wrapping_add(*delta)))?;
                        Ok(Value::Int(n))
                    }
                    other => Err(QuillError::type_error(format!(
                        "'{}' needs an int operand, found {}",
                        if *delta > 0 { "++" } else { "--" },
                        other.kind()
                    ))),
                }
            }

            Expr::Member { object, labels, .. } => {
                let mut current: Value = self.evaluate(object)?;

                for label in labels {
                    current = self.member(&current, label)?;
                }

                Ok(current)
            }

            Expr::Array { elements, .. } => {
                let mut items: Vec<Value> = Vec::with_capacity(elements.len());

                for element in elements {
                    items.push(self.evaluate(element)?);
                }

                Ok(Value::array(items))
            }

            Expr::Index { object, index, .. } => {
                let object: Value = self.evaluate(object)?;
                let index: i64 = self.index(index)?;

                match object {
                    Value::Array(array) => array.get(index),

                    Value::Str(s) => {
                        let i: usize = checked_index(index, s.chars().count())?;
                        let c: String = s.chars().skip(i).take(1).collect();
                        Ok(Value::str(&c))
                    }

                    other => Err(QuillError::type_error(format!(
                        "cannot index into {}",
                        other.kind()
                    ))),
                }
            }

            Expr::Function(decl) => Ok(self.closure(decl)),

            Expr::Call {
                callee,
                arguments,
                line,
            } => {
                trace!("Call on line {}", line);
                self.call(callee, arguments)
            }

            Expr::Instantiate {
                type_name, fields, ..
            } => self.instantiate(type_name, fields),
        }
    }

    /// Bindings first, then global functions, record types and builtins.
    fn lookup_variable(&self, name: &str) -> Result<Value> {
        if let Some(value) = self.environment.get(name) {
            return Ok(value);
        }

        self.global(name)
            .ok_or_else(|| QuillError::undefined(name))
    }

    fn global(&self, name: &str) -> Option<Value> {
        self.environment
            .global_function(name)
            .or_else(|| self.environment.get_record_type(name).map(Value::Type))
            .or_else(|| self.builtins.function(name).map(Value::Native))
    }

    fn index(&mut self, index: &Expr) -> Result<i64> {
        match self.evaluate(index)? {
            Value::Int(n) => Ok(n),
            other => Err(QuillError::type_error(format!(
                "index must be an int, found {}",
                other.kind()
            ))),
        }
    }

    fn member(&self, value: &Value, label: &str) -> Result<Value> {
        let members: &dyn Members = value.members().ok_or_else(|| {
            QuillError::type_error(format!(
                "cannot access member '{}' of {}",
                label,
                value.kind()
            ))
        })?;

        members
            .get_member(label, &self.builtins)
            .ok_or_else(|| QuillError::undefined(format!("{}.{}", type_label(value), label)))
    }

    /// Resolve an assignment or step target.
    fn place(&mut self, target: &Expr) -> Result<Place> {
        match target {
            Expr::Variable { name, .. } => self
                .environment
                .lookup(name)
                .map(Place::Slot)
                .ok_or_else(|| QuillError::undefined(name.to_string())),

            Expr::Member { object, labels, .. } => {
                let (last, path) = labels
                    .split_last()
                    .ok_or_else(|| QuillError::Internal("empty member chain".into()))?;

                let mut current: Value = self.evaluate(object)?;

                for label in path {
                    current = self.member(&current, label)?;
                }

                let members: &dyn Members = current.members().ok_or_else(|| {
                    QuillError::type_error(format!(
                        "cannot assign member '{}' of {}",
                        last,
                        current.kind()
                    ))
                })?;

                Ok(Place::Slot(members.member_slot(last)?))
            }

            Expr::Index { object, index, .. } => {
                let object: Value = self.evaluate(object)?;
                let index: i64 = self.index(index)?;

                match object {
                    Value::Array(array) => Ok(Place::Element(array, index)),
                    other => Err(QuillError::type_error(format!(
                        "cannot assign through an index into {}",
                        other.kind()
                    ))),
                }
            }

            other => Err(QuillError::type_error(format!(
                "cannot assign to '{}'",
                AstPrinter::print(other)
            ))),
        }
    }

    fn instantiate(&mut self, type_name: &Rc<str>, fields: &[(Rc<str>, Expr)]) -> Result<Value> {
        let record_type: Rc<RecordType> = self
            .environment
            .get_record_type(type_name)
            .ok_or_else(|| QuillError::undefined(type_name.to_string()))?;

        let record: Rc<Record> = Rc::new(record_type.instantiate());

        for (name, expr) in fields {
            if !record_type.has_field(name) {
                return Err(QuillError::undefined(format!("{}.{}", type_name, name)));
            }

            let value: Value = self.evaluate(expr)?;
            record.define(Rc::clone(name), value);
        }

        for field in record_type.fields() {
            if record.has_member(&field.name) {
                continue;
            }

            let value: Value = match &field.default {
                Some(expr) => self.evaluate(expr)?,
                None => Value::Nil,
            };

            record.define(Rc::clone(&field.name), value);
        }

        Ok(Value::Record(record))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operators
    // ─────────────────────────────────────────────────────────────────────────

    fn binary(&mut self, left: &Expr, op: BinaryOp, right: &Expr) -> Result<Value> {
        match op {
            BinaryOp::And => {
                if !self.logical_operand(left, op)? {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.logical_operand(right, op)?))
            }

            BinaryOp::Or => {
                if self.logical_operand(left, op)? {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.logical_operand(right, op)?))
            }

            _ => {
                let lhs: Value = self.evaluate(left)?;
                let rhs: Value = self.evaluate(right)?;
                apply_binary(op, &lhs, &rhs)
            }
        }
    }

    fn logical_operand(&mut self, expr: &Expr, op: BinaryOp) -> Result<bool> {
        match self.evaluate(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(QuillError::type_error(format!(
                "operands of '{}' must be bool, found {}",
                op.symbol(),
                other.kind()
            ))),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Functions
    // ─────────────────────────────────────────────────────────────────────────

    /// Evaluate a function literal: remember which binding each captured name
    /// refers to right now.
    fn closure(&self, decl: &Rc<FunctionDecl>) -> Value {
        let pending: Vec<(Rc<str>, Option<Slot>)> = decl
            .captures
            .iter()
            .map(|name| (Rc::clone(name), self.environment.lookup(name)))
            .collect();

        Value::Function(Rc::new(UserFunction::closure(Rc::clone(decl), pending)))
    }

    fn call(&mut self, callee: &Expr, arguments: &[Expr]) -> Result<Value> {
        let (function, receiver) = match callee {
            Expr::Member { object, labels, .. } => {
                let (last, path) = labels
                    .split_last()
                    .ok_or_else(|| QuillError::Internal("empty member chain".into()))?;

                let mut receiver: Value = self.evaluate(object)?;

                for label in path {
                    receiver = self.member(&receiver, label)?;
                }

                (self.member(&receiver, last)?, Some(receiver))
            }

            _ => (self.evaluate(callee)?, None),
        };

        let mut args: Vec<Value> = Vec::with_capacity(arguments.len() + 1);

        if let Some(receiver) = receiver {
            if binds_receiver(&function) {
                args.push(receiver);
            }
        }

        for argument in arguments {
            args.push(self.evaluate(argument)?);
        }

        match function {
            Value::Function(function) => self.call_function(&function, args),
            Value::Native(native) => self.call_native(native, &args),
            other => Err(QuillError::NotCallable {
                callee: AstPrinter::print(callee),
                kind: other.kind(),
            }),
        }
    }

    fn call_native(&mut self, native: NativeFunction, args: &[Value]) -> Result<Value> {
        if let Some(expected) = native.arity {
            if expected != args.len() {
                return Err(QuillError::Arity {
                    name: native.name.to_owned(),
                    expected,
                    got: args.len(),
                });
            }
        }

        trace!("Calling native '{}' with {} argument(s)", native.name, args.len());

        (native.func)(&mut *self.out, args)
    }

    pub fn call_function(&mut self, function: &Rc<UserFunction>, args: Vec<Value>) -> Result<Value> {
        if args.len() != function.arity() {
            return Err(QuillError::Arity {
                name: function.name().to_owned(),
                expected: function.arity(),
                got: args.len(),
            });
        }

        debug!("Calling '{}'", function.name());

        let captured: Vec<(Rc<str>, Value)> = self.materialize(function)?;
        let decl: Rc<FunctionDecl> = Rc::clone(&function.decl);

        let flow: Flow = self.with_frame(true, |it| {
            for (name, value) in captured {
                it.environment.define(name, value);
            }

            for (param, value) in decl.params.iter().zip(args) {
                it.environment.define(Rc::clone(param), value);
            }

            it.execute_block(&decl.body)
        })?;

        match flow {
            Flow::Return(value) => Ok(value),
            _ => Ok(Value::Nil),
        }
    }

    /// Take the one-time capture snapshot if it has not been taken yet, and
    /// return it.
    fn materialize(&self, function: &UserFunction) -> Result<Vec<(Rc<str>, Value)>> {
        let mut state = function.captures().borrow_mut();

        let frozen: Option<Vec<(Rc<str>, Value)>> = match &*state {
            CaptureState::Pending(pending) => Some(self.snapshot(pending)?),
            CaptureState::Frozen(_) => None,
        };

        if let Some(frozen) = frozen {
            debug!(
                "Materialized {} capture(s) for '{}'",
                frozen.len(),
                function.name()
            );

            *state = CaptureState::Frozen(frozen);
        }

        match &*state {
            CaptureState::Frozen(values) => Ok(values.clone()),
            CaptureState::Pending(_) => Err(QuillError::Internal(
                "closure captures were not materialized".into(),
            )),
        }
    }

    fn snapshot(&self, pending: &[(Rc<str>, Option<Slot>)]) -> Result<Vec<(Rc<str>, Value)>> {
        let mut frozen: Vec<(Rc<str>, Value)> = Vec::with_capacity(pending.len());

        for (name, slot) in pending {
            // The caller's frames are not the defining environment: only
            // roots are consulted for names unbound at the literal.
            let value: Option<Value> = match slot {
                Some(slot) => Some(slot.borrow().clone()),
                None => self
                    .environment
                    .lookup_root(name)
                    .map(|slot| slot.borrow().clone()),
            };

            match value {
                Some(value) => frozen.push((Rc::clone(name), value)),
                None if self.global(name).is_some() => {}
                None => return Err(QuillError::undefined(name.to_string())),
            }
        }

        Ok(frozen)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn named_function(decl: &Rc<FunctionDecl>) -> Value {
    Value::Function(Rc::new(UserFunction::named(Rc::clone(decl))))
}

/// A member call passes its receiver as the first argument unless the member
/// is an anonymous closure.
fn binds_receiver(function: &Value) -> bool {
    match function {
        Value::Function(function) => !function.is_closure(),
        Value::Native(_) => true,
        _ => false,
    }
}

fn type_label(value: &Value) -> String {
    match value {
        Value::Record(record) => record.kind().name().to_string(),
        other => other.kind().to_owned(),
    }
}

fn literal_value(literal: &Literal) -> Value {
    match literal {
        Literal::Int(n) => Value::Int(*n),
        Literal::Str(s) => Value::Str(Rc::clone(s)),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Nil => Value::Nil,
        Literal::Time(t) => Value::Time(*t),
        Literal::Duration(nanos) => Value::Duration(TimeDelta::nanoseconds(*nanos)),
    }
}

fn unary(op: UnaryOp, value: Value) -> Result<Value> {
    match (op, value) {
        (UnaryOp::Negate, Value::Int(n)) => Ok(Value::Int(n.wrapping_neg())),
        (UnaryOp::Negate, Value::Duration(d)) => Ok(Value::Duration(-d)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (op, other) => Err(QuillError::type_error(format!(
            "unsupported operand for '{}': {}",
            match op {
                UnaryOp::Negate => "-",
                UnaryOp::Not => "!",
            },
            other.kind()
        ))),
    }
}

fn mismatch(op: BinaryOp, lhs: &Value, rhs: &Value) -> QuillError {
    QuillError::type_error(format!(
        "unsupported operands for '{}': {} and {}",
        op.symbol(),
        lhs.kind(),
        rhs.kind()
    ))
}

/// Relational and equality operators over any ordered type.
fn compare<T: PartialOrd>(op: BinaryOp, a: &T, b: &T) -> Option<bool> {
    match op {
        BinaryOp::Less => Some(a < b),
        BinaryOp::LessEqual => Some(a <= b),
        BinaryOp::Greater => Some(a > b),
        BinaryOp::GreaterEqual => Some(a >= b),
        BinaryOp::Equal => Some(a == b),
        BinaryOp::NotEqual => Some(a != b),
        _ => None,
    }
}

fn apply_binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    match (lhs, rhs) {
        (Value::Nil, _) | (_, Value::Nil) => match op {
            BinaryOp::Equal => Ok(Value::Bool(lhs.is_nil() && rhs.is_nil())),
            BinaryOp::NotEqual => Ok(Value::Bool(!(lhs.is_nil() && rhs.is_nil()))),
            _ => Err(mismatch(op, lhs, rhs)),
        },

        (Value::Int(a), Value::Int(b)) => match op {
            BinaryOp::Add => Ok(Value::Int(a.wrapping_add(*b))),
            BinaryOp::Sub => Ok(Value::Int(a.wrapping_sub(*b))),
            BinaryOp::Mul => Ok(Value::Int(a.wrapping_mul(*b))),
            BinaryOp::Div if *b == 0 => Err(QuillError::runtime("division by zero")),
            BinaryOp::Div => Ok(Value::Int(a.wrapping_div(*b))),
            _ => compare(op, a, b)
                .map(Value::Bool)
                .ok_or_else(|| mismatch(op, lhs, rhs)),
        },

        (Value::Bool(a), Value::Bool(b)) => match op {
            BinaryOp::Equal => Ok(Value::Bool(a == b)),
            BinaryOp::NotEqual => Ok(Value::Bool(a != b)),
            _ => Err(mismatch(op, lhs, rhs)),
        },

        (Value::Str(a), Value::Str(b)) => match op {
            BinaryOp::Add => {
                let mut joined: String = String::with_capacity(a.len() + b.len());
                joined.push_str(a);
                joined.push_str(b);
                Ok(Value::str(&joined))
            }
            BinaryOp::Equal => Ok(Value::Bool(a == b)),
            BinaryOp::NotEqual => Ok(Value::Bool(a != b)),
            _ => Err(mismatch(op, lhs, rhs)),
        },

        (Value::Duration(a), Value::Duration(b)) => match op {
            BinaryOp::Add => a
                .checked_add(b)
                .map(Value::Duration)
                .ok_or_else(|| QuillError::runtime("duration overflow")),
            BinaryOp::Sub => a
                .checked_sub(b)
                .map(Value::Duration)
                .ok_or_else(|| QuillError::runtime("duration overflow")),
            _ => compare(op, a, b)
                .map(Value::Bool)
                .ok_or_else(|| mismatch(op, lhs, rhs)),
        },

        (Value::Time(a), Value::Time(b)) => match op {
            BinaryOp::Sub => Ok(Value::Duration(a.signed_duration_since(*b))),
            _ => compare(op, a, b)
                .map(Value::Bool)
                .ok_or_else(|| mismatch(op, lhs, rhs)),
        },

        (Value::Time(t), Value::Duration(d)) => match op {
            BinaryOp::Add => t
                .checked_add_signed(*d)
                .map(Value::Time)
                .ok_or_else(|| QuillError::runtime("time overflow")),
            BinaryOp::Sub => t
                .checked_sub_signed(*d)
                .map(Value::Time)
                .ok_or_else(|| QuillError::runtime("time overflow")),
            _ => Err(mismatch(op, lhs, rhs)),
        },

        _ => Err(mismatch(op, lhs, rhs)),
    }
}
