mod common;

use std::io::Write;

use common::{output, run, SharedBuf};
use quill::builtins::Builtins;
use quill::error::{QuillError, Result};
use quill::interpreter::Interpreter;
use quill::value::Value;

fn failure(source: &str) -> QuillError {
    run(source).0.expect_err("program should fail")
}

#[test]
fn println_joins_arguments_with_spaces() {
    assert_eq!(output("println(1, \"two\", true)\nprintln()"), "1 two true\n\n");
}

#[test]
fn print_omits_the_newline() {
    assert_eq!(output("print(\"a\")\nprint(\"b\", 1)"), "ab 1");
}

#[test]
fn len_str_and_typeof() {
    let out = output(
        "println(len(\"héllo\"), len([1, 2, 3]))
         println(str(42) + \"!\", typeof(str(1)))
         println(typeof(1), typeof(nil), typeof([]), typeof(1s), typeof(now()), typeof(len))",
    );

    assert_eq!(
        out,
        "5 3\n42! string\nint nil array duration time native function\n"
    );

    assert!(matches!(failure("len(1)"), QuillError::Type(_)));
}

#[test]
fn assert_reports_its_message() {
    let err = failure("assert(1 == 2, \"numbers differ\")");
    assert_eq!(err.to_string(), "Runtime error: assertion failed: numbers differ");

    assert_eq!(failure("assert(false)").to_string(), "Runtime error: assertion failed");
    assert!(matches!(failure("assert(1)"), QuillError::Type(_)));
    assert!(matches!(failure("assert()"), QuillError::Arity { .. }));
}

#[test]
fn fixed_arity_is_checked_before_the_call() {
    match failure("len()") {
        QuillError::Arity {
            name,
            expected,
            got,
        } => {
            assert_eq!(name, "len");
            assert_eq!((expected, got), (1, 0));
        }
        other => panic!("expected Arity, got {:?}", other),
    }
}

#[test]
fn clone_copies_records_shallowly() {
    let out = output(
        "type P { x: 1, tags: [] }
         var a = P{}
         var b = clone(a)
         b.x = 2
         b.tags.append(\"shared\")
         println(a.x, b.x, a.tags)",
    );

    assert_eq!(out, "1 2 [shared]\n");
}

#[test]
fn array_members() {
    let out = output(
        "var xs = [1, 2]
         xs.set(0, 10)
         xs.append(3)
         var last = xs.pop()
         println(xs, last, xs.size(), xs.get(1))",
    );

    assert_eq!(out, "[10, 2] 3 2 2\n");

    assert!(matches!(failure("[].pop()"), QuillError::Bounds { .. }));
    assert!(matches!(failure("[1].get(5)"), QuillError::Bounds { index: 5, length: 1 }));
    assert!(matches!(failure("[1].get(\"0\")"), QuillError::Type(_)));
    assert!(matches!(failure("[1].missing()"), QuillError::Undefined(_)));
}

#[test]
fn string_members() {
    let out = output(
        "var s = \"Hello\"
         println(s.upper(), s.lower(), s.size(), s.contains(\"ell\"), s.contains(\"xyz\"))",
    );

    assert_eq!(out, "HELLO hello 5 true false\n");
}

#[test]
fn user_methods_and_builtins_do_not_mix() {
    // A record type may declare a method with a builtin member's name.
    let out = output(
        "type Stack { items: [] }
         func Stack.size() { return this.items.size() }
         var s = Stack{}
         s.items.append(1)
         println(s.size())",
    );

    assert_eq!(out, "1\n");
}

fn double(_out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    match args.first() {
        Some(Value::Int(n)) => Ok(Value::Int(n * 2)),
        _ => Err(QuillError::type_error("double expects an int")),
    }
}

fn shout(out: &mut dyn Write, args: &[Value]) -> Result<Value> {
    writeln!(out, "{}!", args.len())?;
    Ok(Value::Nil)
}

#[test]
fn registry_is_per_interpreter_and_extensible() {
    let mut builtins = Builtins::empty();
    builtins.register("double", Some(1), double);
    builtins.register("shout", None, shout);

    let buf = SharedBuf::default();
    let mut interp = Interpreter::with_builtins(builtins, Box::new(buf.clone()));

    assert_eq!(quill::run("double(21)", &mut interp).unwrap(), Value::Int(42));

    quill::run("shout(1, 2, 3)", &mut interp).unwrap();
    assert_eq!(buf.contents(), "3!\n");

    // The standard library is not part of an empty registry.
    assert!(matches!(
        quill::run("println(1)", &mut interp),
        Err(QuillError::Undefined(_))
    ));

    // Other interpreters are unaffected.
    assert!(matches!(failure("double(1)"), QuillError::Undefined(_)));
}

#[test]
fn user_globals_shadow_builtins() {
    assert_eq!(
        output("func len(x) { return 99 }\nprintln(len([1]))"),
        "99\n"
    );
}
