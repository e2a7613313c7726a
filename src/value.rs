//! Runtime values.
//!
//! Scalars (`nil`, bools, ints, strings, times, durations) are copied on
//! assignment.  Arrays, record instances and functions are reference types:
//! assigning one stores another `Rc` to the same object, and only an explicit
//! [`Members::duplicate`] copies structure.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::rc::Rc;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use indexmap::IndexMap;

use crate::ast::{FieldDecl, FunctionDecl, TypeDecl};
use crate::builtins::Builtins;
use crate::error::{QuillError, Result};

/// A named, mutable value cell.  The binding stack and record instances hold
/// these; a closure keeps one alive after its frame is popped.
pub type Slot = Rc<RefCell<Value>>;

pub fn new_slot(value: Value) -> Slot {
    Rc::new(RefCell::new(value))
}

/// Host callable signature: the interpreter's output sink and the argument
/// list (receiver first for member calls).
pub type NativeFn = fn(&mut dyn Write, &[Value]) -> Result<Value>;

#[derive(Clone, Copy)]
pub struct NativeFunction {
    pub name: &'static str,

    /// Exact argument count, checked before the call; `None` is variadic.
    pub arity: Option<usize>,

    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Str(Rc<str>),
    Time(DateTime<Utc>),
    Duration(TimeDelta),
    Array(Rc<Array>),
    Record(Rc<Record>),
    Type(Rc<RecordType>),
    Function(Rc<UserFunction>),
    Native(NativeFunction),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(Array::new(items)))
    }

    /// Runtime kind name used in diagnostics and by `typeof`.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::Time(_) => "time",
            Value::Duration(_) => "duration",
            Value::Array(_) => "array",
            Value::Record(_) => "record",
            Value::Type(_) => "type",
            Value::Function(_) => "function",
            Value::Native(_) => "native function",
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The member-access capability of this value, if it has one.
    pub fn members(&self) -> Option<&dyn Members> {
        match self {
            Value::Record(record) => Some(&**record),
            Value::Array(array) => Some(&**array),
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// Identity for reference types, value equality for scalars.  The language's
/// own `==` lives in the interpreter; this is for hosts and tests.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::Duration(a), Value::Duration(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            (Value::Type(a), Value::Type(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Value::Nil"),
            Value::Bool(b) => write!(f, "Value::Bool({})", b),
            Value::Int(n) => write!(f, "Value::Int({})", n),
            Value::Str(s) => write!(f, "Value::Str({:?})", s),
            Value::Time(t) => write!(f, "Value::Time({})", t),
            Value::Duration(d) => write!(f, "Value::Duration({})", d),
            Value::Array(a) => write!(f, "Value::Array(len={})", a.len()),
            Value::Record(r) => write!(f, "Value::Record({})", r.kind().name()),
            Value::Type(t) => write!(f, "Value::Type({})", t.name()),
            Value::Function(func) => write!(f, "Value::Function({})", func.name()),
            Value::Native(n) => write!(f, "Value::Native({})", n.name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, &mut Vec::new())
    }
}

impl Value {
    /// `open` holds the containers currently being written; meeting one of
    /// them again prints an ellipsis instead of recursing.
    fn write_to(&self, f: &mut fmt::Formatter<'_>, open: &mut Vec<*const ()>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),

            Value::Bool(b) => write!(f, "{}", b),

            Value::Int(n) => {
                let mut buf: itoa::Buffer = itoa::Buffer::new();
                f.write_str(buf.format(*n))
            }

            Value::Str(s) => f.write_str(s),

            Value::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),

            Value::Duration(d) => write_duration(f, *d),

            Value::Array(array) => {
                let id: *const () = Rc::as_ptr(array).cast();
                if open.contains(&id) {
                    return f.write_str("[...]");
                }
                open.push(id);

                f.write_str("[")?;
                for (i, item) in array.items.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.write_to(f, open)?;
                }

                open.pop();
                f.write_str("]")
            }

            Value::Record(record) => {
                let id: *const () = Rc::as_ptr(record).cast();
                if open.contains(&id) {
                    return write!(f, "{}{{...}}", record.kind().name());
                }
                open.push(id);

                write!(f, "{}{{", record.kind().name())?;
                for (i, (name, slot)) in record.members.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: ", name)?;
                    slot.borrow().write_to(f, open)?;
                }

                open.pop();
                f.write_str("}")
            }

            Value::Type(t) => write!(f, "<type {}>", t.name()),

            Value::Function(func) if func.is_closure() => f.write_str("<closure>"),

            Value::Function(func) => write!(f, "<func {}>", func.name()),

            Value::Native(n) => write!(f, "<native fn {}>", n.name),
        }
    }
}

/// `1h2m3.5s` style rendering.
fn write_duration(f: &mut fmt::Formatter<'_>, d: TimeDelta) -> fmt::Result {
    const NANOS_PER_SEC: i128 = 1_000_000_000;

    let total: i128 = i128::from(d.num_seconds()) * NANOS_PER_SEC + i128::from(d.subsec_nanos());

    if total == 0 {
        return f.write_str("0s");
    }

    if total < 0 {
        f.write_str("-")?;
    }

    let nanos: i128 = total.abs();
    let secs: i128 = nanos / NANOS_PER_SEC;
    let frac: i128 = nanos % NANOS_PER_SEC;
    let (hours, minutes, seconds) = (secs / 3600, (secs / 60) % 60, secs % 60);

    if hours > 0 {
        write!(f, "{}h", hours)?;
    }

    if hours > 0 || minutes > 0 {
        write!(f, "{}m", minutes)?;
    }

    write!(f, "{}", seconds)?;

    if frac > 0 {
        let digits: String = format!("{:09}", frac);
        write!(f, ".{}", digits.trim_end_matches('0'))?;
    }

    f.write_str("s")
}

// ─────────────────────────────────────────────────────────────────────────────
// Member access
// ─────────────────────────────────────────────────────────────────────────────

/// The record capability set: anything that can appear before a `.` in a
/// member-access chain.
pub trait Members {
    /// Read member `name`.  Builtins supply the members of arrays and strings.
    fn get_member(&self, name: &str, builtins: &Builtins) -> Option<Value>;

    /// Fetch the binding for member `name`, allocating it if missing.
    fn member_slot(&self, name: &str) -> Result<Slot>;

    /// Structural (shallow) copy.
    fn duplicate(&self) -> Value;
}

// ─────────────────────────────────────────────────────────────────────────────
// Arrays
// ─────────────────────────────────────────────────────────────────────────────

/// Check `index` against `length`, converting it to a `usize`.
pub fn checked_index(index: i64, length: usize) -> Result<usize> {
    usize::try_from(index)
        .ok()
        .filter(|i| *i < length)
        .ok_or(QuillError::Bounds { index, length })
}

#[derive(Debug, Default)]
pub struct Array {
    items: RefCell<Vec<Value>>,
}

impl Array {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            items: RefCell::new(items),
        }
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    pub fn get(&self, index: i64) -> Result<Value> {
        let items = self.items.borrow();
        let i: usize = checked_index(index, items.len())?;

        Ok(items[i].clone())
    }

    pub fn set(&self, index: i64, value: Value) -> Result<()> {
        let mut items = self.items.borrow_mut();
        let i: usize = checked_index(index, items.len())?;
        items[i] = value;

        Ok(())
    }

    pub fn push(&self, value: Value) {
        self.items.borrow_mut().push(value);
    }

    pub fn pop(&self) -> Result<Value> {
        self.items
            .borrow_mut()
            .pop()
            .ok_or(QuillError::Bounds { index: 0, length: 0 })
    }

    /// Copy of the current elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.borrow().clone()
    }
}

impl Members for Array {
    fn get_member(&self, name: &str, builtins: &Builtins) -> Option<Value> {
        builtins.array_method(name).map(Value::Native)
    }

    fn member_slot(&self, name: &str) -> Result<Slot> {
        Err(QuillError::type_error(format!(
            "cannot assign to member '{}' of an array",
            name
        )))
    }

    fn duplicate(&self) -> Value {
        Value::array(self.to_vec())
    }
}

impl Members for Rc<str> {
    fn get_member(&self, name: &str, builtins: &Builtins) -> Option<Value> {
        builtins.string_method(name).map(Value::Native)
    }

    fn member_slot(&self, name: &str) -> Result<Slot> {
        Err(QuillError::type_error(format!(
            "cannot assign to member '{}' of a string",
            name
        )))
    }

    fn duplicate(&self) -> Value {
        Value::Str(Rc::clone(self))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Record types and instances
// ─────────────────────────────────────────────────────────────────────────────

/// A record prototype: the declared field templates plus the methods
/// attached with `func Type.name(…)`.
#[derive(Debug)]
pub struct RecordType {
    decl: Rc<TypeDecl>,
    methods: RefCell<HashMap<Rc<str>, Value>>,
}

impl RecordType {
    pub fn new(decl: Rc<TypeDecl>) -> Self {
        Self {
            decl,
            methods: RefCell::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &Rc<str> {
        &self.decl.name
    }

    /// Field templates in declaration order.
    pub fn fields(&self) -> &[FieldDecl] {
        &self.decl.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.decl.fields.iter().any(|f| &*f.name == name)
    }

    pub fn add_method(&self, name: Rc<str>, method: Value) -> Result<()> {
        let mut methods = self.methods.borrow_mut();

        if methods.contains_key(&name) {
            return Err(QuillError::Duplicate {
                kind: "method",
                name: format!("{}.{}", self.name(), name),
            });
        }

        methods.insert(name, method);

        Ok(())
    }

    pub fn method(&self, name: &str) -> Option<Value> {
        self.methods.borrow().get(name).cloned()
    }

    /// A fresh instance with an empty member table.  Field initializers are
    /// run by the interpreter; the prototype itself is never touched.
    pub fn instantiate(self: &Rc<Self>) -> Record {
        Record {
            kind: Rc::clone(self),
            members: RefCell::new(IndexMap::with_capacity(self.decl.fields.len())),
        }
    }
}

#[derive(Debug)]
pub struct Record {
    kind: Rc<RecordType>,
    members: RefCell<IndexMap<Rc<str>, Slot>>,
}

impl Record {
    pub fn kind(&self) -> &Rc<RecordType> {
        &self.kind
    }

    pub fn has_member(&self, name: &str) -> bool {
        self.members.borrow().contains_key(name)
    }

    /// Bind member `name` to `value`, replacing any previous binding.
    pub fn define(&self, name: Rc<str>, value: Value) {
        self.members.borrow_mut().insert(name, new_slot(value));
    }

    /// Current value of field `name` (methods not included).
    pub fn field(&self, name: &str) -> Option<Value> {
        self.members
            .borrow()
            .get(name)
            .map(|slot| slot.borrow().clone())
    }
}

impl Members for Record {
    fn get_member(&self, name: &str, _builtins: &Builtins) -> Option<Value> {
        self.field(name).or_else(|| self.kind.method(name))
    }

    fn member_slot(&self, name: &str) -> Result<Slot> {
        let mut members = self.members.borrow_mut();

        if let Some(slot) = members.get(name) {
            return Ok(Rc::clone(slot));
        }

        let slot: Slot = new_slot(Value::Nil);
        members.insert(Rc::from(name), Rc::clone(&slot));

        Ok(slot)
    }

    fn duplicate(&self) -> Value {
        let members: IndexMap<Rc<str>, Slot> = self
            .members
            .borrow()
            .iter()
            .map(|(name, slot)| (Rc::clone(name), new_slot(slot.borrow().clone())))
            .collect();

        Value::Record(Rc::new(Record {
            kind: Rc::clone(&self.kind),
            members: RefCell::new(members),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// User functions
// ─────────────────────────────────────────────────────────────────────────────

/// Capture state of a function value.
#[derive(Debug)]
pub enum CaptureState {
    /// Not yet invoked: the binding cells visible for each captured name when
    /// the literal was evaluated (`None` if the name was not visible then).
    Pending(Vec<(Rc<str>, Option<Slot>)>),

    /// Invoked at least once: the values snapshotted at the first call.
    Frozen(Vec<(Rc<str>, Value)>),
}

#[derive(Debug)]
pub struct UserFunction {
    pub decl: Rc<FunctionDecl>,
    captures: RefCell<CaptureState>,
}

impl UserFunction {
    /// A top-level function or method; it captures nothing.
    pub fn named(decl: Rc<FunctionDecl>) -> Self {
        Self {
            decl,
            captures: RefCell::new(CaptureState::Frozen(Vec::new())),
        }
    }

    pub fn closure(decl: Rc<FunctionDecl>, pending: Vec<(Rc<str>, Option<Slot>)>) -> Self {
        Self {
            decl,
            captures: RefCell::new(CaptureState::Pending(pending)),
        }
    }

    pub fn name(&self) -> &str {
        self.decl.name.as_deref().unwrap_or("<closure>")
    }

    pub fn is_closure(&self) -> bool {
        self.decl.is_closure()
    }

    pub fn arity(&self) -> usize {
        self.decl.params.len()
    }

    /// Point a still-pending capture of `name` that had no binding at the
    /// literal at `slot`.  Used when a closure is stored under a name it reads.
    pub fn bind_pending(&self, name: &str, slot: &Slot) {
        if let CaptureState::Pending(pending) = &mut *self.captures.borrow_mut() {
            for (captured, target) in pending.iter_mut() {
                if &**captured == name && target.is_none() {
                    *target = Some(Rc::clone(slot));
                }
            }
        }
    }

    /// Has the one-time capture snapshot been taken?
    pub fn is_materialized(&self) -> bool {
        matches!(*self.captures.borrow(), CaptureState::Frozen(_))
    }

    pub(crate) fn captures(&self) -> &RefCell<CaptureState> {
        &self.captures
    }
}
