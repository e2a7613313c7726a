use std::rc::Rc;

use quill::ast::TypeDecl;
use quill::environment::{Environment, FrameStats};
use quill::error::QuillError;
use quill::value::{RecordType, Value};

fn name(s: &str) -> Rc<str> {
    Rc::from(s)
}

fn record_type(type_name: &str) -> Rc<RecordType> {
    Rc::new(RecordType::new(Rc::new(TypeDecl {
        name: name(type_name),
        fields: Vec::new(),
        line: 1,
    })))
}

#[test]
fn allocate_always_creates_a_new_binding() {
    let mut env = Environment::new();

    let outer = env.define(name("x"), Value::Int(1));
    env.push_frame(false);
    let inner = env.define(name("x"), Value::Int(2));

    assert!(!Rc::ptr_eq(&outer, &inner));
    assert_eq!(env.get("x"), Some(Value::Int(2)));

    env.pop_frame().unwrap();

    assert_eq!(env.get("x"), Some(Value::Int(1)));
}

#[test]
fn lookup_misses_unknown_names() {
    let env = Environment::new();

    assert!(env.lookup("nope").is_none());
}

#[test]
fn isolating_frame_hides_caller_locals_but_not_roots() {
    let mut env = Environment::new();
    env.define(name("root"), Value::Int(0));

    env.push_frame(false);
    env.define(name("local"), Value::Int(1));

    env.push_frame(true);
    assert!(env.lookup("local").is_none());
    assert_eq!(env.get("root"), Some(Value::Int(0)));

    env.define(name("param"), Value::Int(2));

    // Non-isolating frames inside the call still see the call's locals.
    env.push_frame(false);
    assert_eq!(env.get("param"), Some(Value::Int(2)));
    assert!(env.lookup("local").is_none());
    env.pop_frame().unwrap();

    env.pop_frame().unwrap();
    assert_eq!(env.get("local"), Some(Value::Int(1)));

    env.pop_frame().unwrap();
    assert!(env.lookup("local").is_none());
}

#[test]
fn pop_frame_clears_bindings_above_the_boundary() {
    let mut env = Environment::new();
    env.define(name("keep"), Value::Nil);

    env.push_frame(false);
    for i in 0..5 {
        env.define(name(&format!("tmp{}", i)), Value::Int(i));
    }
    assert_eq!(env.live_bindings(), 6);

    env.pop_frame().unwrap();

    assert_eq!(env.live_bindings(), 1);
    assert!(env.lookup("tmp0").is_none());
}

#[test]
fn captured_slot_outlives_its_frame() {
    let mut env = Environment::new();

    env.push_frame(true);
    let slot = env.define(name("x"), Value::Int(7));
    env.pop_frame().unwrap();

    assert_eq!(*slot.borrow(), Value::Int(7));
    assert!(env.lookup("x").is_none());
}

#[test]
fn storage_grows_by_doubling() {
    let mut env = Environment::with_capacity(2);
    assert_eq!(env.capacity(), 2);

    for i in 0..5 {
        env.define(name(&format!("v{}", i)), Value::Int(i));
    }

    assert_eq!(env.capacity(), 8);
    assert_eq!(env.get("v4"), Some(Value::Int(4)));
    assert_eq!(env.get("v0"), Some(Value::Int(0)));
}

#[test]
fn popping_an_empty_frame_stack_is_internal_error() {
    let mut env = Environment::new();

    assert!(matches!(env.pop_frame(), Err(QuillError::Internal(_))));
}

#[test]
fn frame_stats_track_balance() {
    let mut env = Environment::new();

    env.push_frame(false);
    env.push_frame(true);
    assert_eq!(env.frame_depth(), 2);

    env.pop_frame().unwrap();
    env.pop_frame().unwrap();

    assert_eq!(env.frame_depth(), 0);
    assert_eq!(
        env.frame_stats(),
        FrameStats {
            pushed: 2,
            popped: 2
        }
    );
}

#[test]
fn globals_share_one_namespace() {
    let mut env = Environment::new();

    env.add_record_type(name("Point"), record_type("Point"))
        .unwrap();
    env.add_global_function(name("main"), Value::Nil).unwrap();

    assert!(env.get_record_type("Point").is_some());
    assert!(env.global_function("main").is_some());
    assert!(env.get_record_type("main").is_none());

    let dup = env.add_global_function(name("Point"), Value::Nil).unwrap_err();
    assert!(matches!(dup, QuillError::Duplicate { kind: "type", .. }));

    let dup = env.add_record_type(name("main"), record_type("main")).unwrap_err();
    assert!(matches!(dup, QuillError::Duplicate { kind: "function", .. }));

    let dup = env.add_global_function(name("main"), Value::Nil).unwrap_err();
    assert_eq!(dup.to_string(), "Lookup error: function 'main' is already declared");
}

#[test]
fn root_lookup_ignores_every_frame() {
    let mut env = Environment::new();
    env.define(name("g"), Value::Int(1));

    env.push_frame(false);
    env.define(name("local"), Value::Int(2));
    env.define(name("g"), Value::Int(3));

    assert!(env.lookup_root("local").is_none());
    assert_eq!(*env.lookup_root("g").unwrap().borrow(), Value::Int(1));
    assert_eq!(env.get("g"), Some(Value::Int(3)));

    env.pop_frame().unwrap();
}
