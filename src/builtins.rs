//! Host-provided callables.
//!
//! A [`Builtins`] registry is built once per interpreter.  It holds three
//! tables: free functions (consulted for unqualified names that are not user
//! globals), and the members of arrays and strings (consulted by member
//! access on those values).  Member natives receive the receiver as their
//! first argument.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use chrono::Utc;
use log::debug;

use crate::error::{QuillError, Result};
use crate::value::{Array, NativeFn, NativeFunction, Value};

#[derive(Debug, Clone)]
pub struct Builtins {
    functions: HashMap<&'static str, NativeFunction>,
    array_methods: HashMap<&'static str, NativeFunction>,
    string_methods: HashMap<&'static str, NativeFunction>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::standard()
    }
}

impl Builtins {
    /// A registry with nothing in it.
    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
            array_methods: HashMap::new(),
            string_methods: HashMap::new(),
        }
    }

    /// The standard library.
    pub fn standard() -> Self {
        let mut builtins: Builtins = Self::empty();

        builtins.register("println", None, println);
        builtins.register("print", None, print);
        builtins.register("len", Some(1), len);
        builtins.register("str", Some(1), to_str);
        builtins.register("typeof", Some(1), type_of);
        builtins.register("now", Some(0), now);
        builtins.register("assert", None, assert);
        builtins.register("clone", Some(1), clone);

        builtins.register_array_method("append", Some(2), array_append);
        builtins.register_array_method("get", Some(2), array_get);
        builtins.register_array_method("set", Some(3), array_set);
        builtins.register_array_method("size", Some(1), array_size);
        builtins.register_array_method("pop", Some(1), array_pop);

        builtins.register_string_method("size", Some(1), string_size);
        builtins.register_string_method("upper", Some(1), string_upper);
        builtins.register_string_method("lower", Some(1), string_lower);
        builtins.register_string_method("contains", Some(2), string_contains);

        debug!(
            "Standard builtins ready: {} functions, {} array members, {} string members",
            builtins.functions.len(),
            builtins.array_methods.len(),
            builtins.string_methods.len()
        );

        builtins
    }

    /// Add or replace a free function.
    pub fn register(&mut self, name: &'static str, arity: Option<usize>, func: NativeFn) {
        self.functions
            .insert(name, NativeFunction { name, arity, func });
    }

    /// Add or replace an array member.  `arity` counts the receiver.
    pub fn register_array_method(&mut self, name: &'static str, arity: Option<usize>, func: NativeFn) {
        self.array_methods
            .insert(name, NativeFunction { name, arity, func });
    }

    /// Add or replace a string member.  `arity` counts the receiver.
    pub fn register_string_method(&mut self, name: &'static str, arity: Option<usize>, func: NativeFn) {
        self.string_methods
            .insert(name, NativeFunction { name, arity, func });
    }

    pub fn function(&self, name: &str) -> Option<NativeFunction> {
        self.functions.get(name).copied()
    }

    pub fn array_method(&self, name: &str) -> Option<NativeFunction> {
        self.array_methods.get(name).copied()
    }

    pub fn string_method(&self, name: &str) -> Option<NativeFunction> {
        self.string_methods.get(name).copied()
    }
}

// ───── argument helpers ──────────────────────────────────────────────────────

fn arg<'v>(args: &'v [Value], index: usize, name: &str) -> Result<&'v Value> {
    args.get(index).ok_or_else(|| QuillError::Arity {
        name: name.to_owned(),
        expected: index + 1,
        got: args.len(),
    })
}

fn array_arg<'v>(args: &'v [Value], index: usize, name: &str) -> Result<&'v Rc<Array>> {
    match arg(args, index, name)? {
        Value::Array(array) => Ok(array),
        other => Err(QuillError::type_error(format!(
            "{} expects an array, found {}",
            name,
            other.kind()
        ))),
    }
}

fn str_arg<'v>(args: &'v [Value], index: usize, name: &str) -> Result<&'v Rc<str>> {
    match arg(args, index, name)? {
        Value::Str(s) => Ok(s),
        other => Err(QuillError::type_error(format!(
            "{} expects a string, found {}",
            name,
            other.kind()
        ))),
    }
}

fn int_arg(args: &[Value], index: usize, name: &str) -> Result<i64> {
    match arg(args, index, name)? {
        Value::Int(n) => Ok(*n),
        other => Err(QuillError::type_error(format!(
            "{} expects an int, found {}",
            name,
            other.kind()
        ))),
    }
}

fn write_joined(out: &mut dyn Write, args: &[Value]) -> Result<()> {
    for (i, value) in args.iter().enumerate() {
        if i > 0 {
            out.write_all(b" ")?;
        }
        write!(out, "{}", value)?;
    }

    Ok(())
}

// ───── free functions ────────────────────────────────────────────────────────

fn println(out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    write_joined(out, args)?;
    out.write_all(b"\n")?;

    Ok(Value::Nil)
}

fn print(out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    write_joined(out, args)?;

    Ok(Value::Nil)
}

fn len(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    match arg(args, 0, "len")? {
        Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
        Value::Array(array) => Ok(Value::Int(array.len() as i64)),
        other => Err(QuillError::type_error(format!(
            "len expects a string or an array, found {}",
            other.kind()
        ))),
    }
}

fn to_str(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    Ok(Value::str(&arg(args, 0, "str")?.to_string()))
}

fn type_of(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    Ok(Value::str(arg(args, 0, "typeof")?.kind()))
}

fn now(_out: &mut dyn Write, _args: &[Value]) -> Result<Value> {
    Ok(Value::Time(Utc::now()))
}

/// `assert(cond)` or `assert(cond, message)`.
fn assert(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    if args.is_empty() || args.len() > 2 {
        return Err(QuillError::Arity {
            name: "assert".into(),
            expected: 1,
            got: args.len(),
        });
    }

    match &args[0] {
        Value::Bool(true) => Ok(Value::Nil),

        Value::Bool(false) => match args.get(1) {
            Some(message) => Err(QuillError::runtime(format!("assertion failed: {}", message))),
            None => Err(QuillError::runtime("assertion failed")),
        },

        other => Err(QuillError::type_error(format!(
            "assert expects a bool, found {}",
            other.kind()
        ))),
    }
}

fn clone(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    let value: &Value = arg(args, 0, "clone")?;

    Ok(match value.members() {
        Some(members) => members.duplicate(),
        None => value.clone(),
    })
}

// ───── array members ─────────────────────────────────────────────────────────

fn array_append(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    let array: &Rc<Array> = array_arg(args, 0, "append")?;
    array.push(arg(args, 1, "append")?.clone());

    Ok(Value::Nil)
}

fn array_get(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    array_arg(args, 0, "get")?.get(int_arg(args, 1, "get")?)
}

fn array_set(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    let array: &Rc<Array> = array_arg(args, 0, "set")?;
    array.set(int_arg(args, 1, "set")?, arg(args, 2, "set")?.clone())?;

    Ok(Value::Nil)
}

fn array_size(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    Ok(Value::Int(array_arg(args, 0, "size")?.len() as i64))
}

fn array_pop(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    array_arg(args, 0, "pop")?.pop()
}

// ───── string members ────────────────────────────────────────────────────────

fn string_size(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    Ok(Value::Int(str_arg(args, 0, "size")?.chars().count() as i64))
}

fn string_upper(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    Ok(Value::str(&str_arg(args, 0, "upper")?.to_uppercase()))
}

fn string_lower(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    Ok(Value::str(&str_arg(args, 0, "lower")?.to_lowercase()))
}

fn string_contains(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    let haystack: &Rc<str> = str_arg(args, 0, "contains")?;
    let needle: &Rc<str> = str_arg(args, 1, "contains")?;

    Ok(Value::Bool(haystack.contains(&**needle)))
}
