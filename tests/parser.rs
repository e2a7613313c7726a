use std::rc::Rc;

use quill::ast::{BinaryOp, Expr, Literal, Stmt};
use quill::error::QuillError;
use quill::parser::Parser;
use quill::scanner::tokenize;

fn parse(source: &str) -> Vec<Stmt> {
    let tokens = tokenize(source).expect("scans");
    Parser::new(&tokens).parse().expect("parses")
}

fn parse_err(source: &str) -> QuillError {
    let tokens = tokenize(source).expect("scans");
    Parser::new(&tokens)
        .parse()
        .expect_err("parse should fail")
}

fn expr(source: &str) -> Expr {
    match parse(source).pop() {
        Some(Stmt::Expression(expr)) => expr,
        other => panic!("expected an expression statement, got {:?}", other),
    }
}

fn int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

fn binary_parts(expr: &Expr) -> (&Expr, BinaryOp, &Expr) {
    match expr {
        Expr::Binary {
            left, op, right, ..
        } => (left, *op, right),
        other => panic!("expected a binary expression, got {:?}", other),
    }
}

fn function_literal(stmt: &Stmt) -> Rc<quill::ast::FunctionDecl> {
    match stmt {
        Stmt::Var {
            initializer: Some(Expr::Function(decl)),
            ..
        } => Rc::clone(decl),
        other => panic!("expected `var f = func…`, got {:?}", other),
    }
}

fn names(list: &[Rc<str>]) -> Vec<&str> {
    list.iter().map(|n| &**n).collect()
}

// ───── precedence ────────────────────────────────────────────────────────────

#[test]
fn multiplication_binds_tighter_than_addition() {
    let e = expr("1 + 2 * 3");
    let (left, op, right) = binary_parts(&e);

    assert_eq!(op, BinaryOp::Add);
    assert_eq!(left, &int(1));

    let (l, op, r) = binary_parts(right);
    assert_eq!((l, op, r), (&int(2), BinaryOp::Mul, &int(3)));
}

#[test]
fn operators_are_left_associative() {
    let e = expr("10 - 2 - 3");
    let (left, op, right) = binary_parts(&e);

    assert_eq!(op, BinaryOp::Sub);
    assert_eq!(right, &int(3));
    assert_eq!(binary_parts(left).1, BinaryOp::Sub);
}

#[test]
fn and_binds_tighter_than_or() {
    let e = expr("true || false && false");
    let (_, op, right) = binary_parts(&e);

    assert_eq!(op, BinaryOp::Or);
    assert_eq!(binary_parts(right).1, BinaryOp::And);
}

#[test]
fn comparison_binds_looser_than_arithmetic() {
    let e = expr("1 + 1 == 2");
    let (left, op, _) = binary_parts(&e);

    assert_eq!(op, BinaryOp::Equal);
    assert_eq!(binary_parts(left).1, BinaryOp::Add);
}

// ───── postfix ambiguities ───────────────────────────────────────────────────

#[test]
fn call_requires_paren_on_the_same_line() {
    let stmts = parse("f\n(1)");

    assert_eq!(stmts.len(), 2);
    assert!(matches!(&stmts[0], Stmt::Expression(Expr::Variable { .. })));
    assert!(matches!(&stmts[1], Stmt::Expression(Expr::Grouping(_))));

    assert!(matches!(expr("f(1, 2)"), Expr::Call { ref arguments, .. } if arguments.len() == 2));
}

#[test]
fn immediate_invocations_chain() {
    let e = expr("func() { return func() { return func() { return 1 } } }()()()");

    let mut depth = 0;
    let mut current = &e;

    while let Expr::Call { callee, .. } = current {
        depth += 1;
        current = callee;
    }

    assert_eq!(depth, 3);
    assert!(matches!(current, Expr::Function(_)));
}

#[test]
fn member_chain_collects_labels() {
    match expr("a.b.c") {
        Expr::Member { object, labels, .. } => {
            assert!(matches!(*object, Expr::Variable { ref name, .. } if &**name == "a"));
            assert_eq!(names(&labels), vec!["b", "c"]);
        }
        other => panic!("expected member chain, got {:?}", other),
    }
}

#[test]
fn member_chain_as_call_and_assignment_target() {
    assert!(matches!(
        expr("a.b.m(1)"),
        Expr::Call { ref callee, .. } if matches!(**callee, Expr::Member { .. })
    ));

    assert!(matches!(
        expr("a.b = 3"),
        Expr::Assign { ref target, .. } if matches!(**target, Expr::Member { .. })
    ));
}

#[test]
fn index_and_step() {
    assert!(matches!(expr("xs[0]"), Expr::Index { .. }));
    assert!(matches!(expr("xs[0] = 1"), Expr::Assign { .. }));
    assert!(matches!(expr("i++"), Expr::Step { delta: 1, .. }));
    assert!(matches!(expr("xs[1]--"), Expr::Step { delta: -1, .. }));
}

#[test]
fn array_literal_allows_trailing_comma() {
    match expr("[1, 2, 3,]") {
        Expr::Array { elements, .. } => assert_eq!(elements, vec![int(1), int(2), int(3)]),
        other => panic!("expected array literal, got {:?}", other),
    }
}

#[test]
fn time_and_duration_literals() {
    assert!(matches!(
        expr("1h30m"),
        Expr::Literal(Literal::Duration(5_400_000_000_000))
    ));
    assert!(matches!(
        expr(r#"@"2024-01-02T15:04:05Z""#),
        Expr::Literal(Literal::Time(_))
    ));

    let err = parse_err(r#"@"yesterday""#);
    assert!(err.to_string().contains("Invalid time literal"), "{}", err);
}

// ───── records ───────────────────────────────────────────────────────────────

#[test]
fn brace_after_type_name_instantiates_outside_conditions() {
    let stmts = parse("type U { id: 1, name }\nvar u = U{id: 2}");

    assert!(matches!(&stmts[0], Stmt::Type(decl) if decl.fields.len() == 2));

    match &stmts[1] {
        Stmt::Var {
            initializer: Some(Expr::Instantiate { type_name, fields, .. }),
            ..
        } => {
            assert_eq!(&**type_name, "U");
            assert_eq!(fields.len(), 1);
        }
        other => panic!("expected instantiation, got {:?}", other),
    }
}

#[test]
fn brace_after_type_name_in_condition_opens_the_body() {
    let stmts = parse("type U {}\nif t == U { println(1) }");

    match &stmts[1] {
        Stmt::If {
            check, then_branch, ..
        } => {
            let (_, op, right) = binary_parts(check);
            assert_eq!(op, BinaryOp::Equal);
            assert!(matches!(right, Expr::Variable { name, .. } if &**name == "U"));
            assert_eq!(then_branch.len(), 1);
        }
        other => panic!("expected if statement, got {:?}", other),
    }

    // Parenthesised, the instantiation is allowed again.
    let stmts = parse("type U {}\nif t == (U{}) { }");
    assert!(matches!(&stmts[1], Stmt::If { .. }));
}

#[test]
fn method_gets_implicit_receiver() {
    let stmts = parse("type P { x: 0 }\nfunc P.shift(d) { this.x = this.x + d }");

    match &stmts[1] {
        Stmt::Method {
            type_name,
            name,
            decl,
        } => {
            assert_eq!(&**type_name, "P");
            assert_eq!(&**name, "shift");
            assert_eq!(names(&decl.params), vec!["this", "d"]);
            assert!(!decl.is_closure());
        }
        other => panic!("expected method, got {:?}", other),
    }
}

// ───── closure capture lists ─────────────────────────────────────────────────

#[test]
fn captures_names_declared_outside_the_literal() {
    let stmts = parse(
        "var a = 1
         var f = func(x) {
             var y = 2
             return a + x + y + b + a
         }",
    );

    let decl = function_literal(&stmts[1]);
    assert_eq!(names(&decl.captures), vec!["a", "b"]);
}

#[test]
fn inner_captures_propagate_outwards() {
    let stmts = parse(
        "var f = func(p) {
             return func() { return p + z }
         }",
    );

    let outer = function_literal(&stmts[0]);
    assert_eq!(names(&outer.captures), vec!["z"]);

    let inner = match &outer.body[0] {
        Stmt::Return {
            value: Some(Expr::Function(decl)),
            ..
        } => Rc::clone(decl),
        other => panic!("expected returned literal, got {:?}", other),
    };
    assert_eq!(names(&inner.captures), vec!["p", "z"]);
}

#[test]
fn var_initializer_reads_before_declaring() {
    let stmts = parse("var f = func() { var n = n + 1; return n }");

    assert_eq!(names(&function_literal(&stmts[0]).captures), vec!["n"]);
}

#[test]
fn block_declarations_end_with_their_block() {
    let stmts = parse(
        "var f = func() {
             if true { var x = 1; var y = x }
             for i := 0; i < 2; i++ { }
             return x + i
         }",
    );

    assert_eq!(names(&function_literal(&stmts[0]).captures), vec!["x", "i"]);
}

#[test]
fn named_functions_capture_nothing() {
    match &parse("func g() { return outer }")[0] {
        Stmt::Function(decl) => assert!(decl.captures.is_empty()),
        other => panic!("expected function declaration, got {:?}", other),
    }
}

// ───── statements ────────────────────────────────────────────────────────────

#[test]
fn for_loop_forms() {
    let stmts = parse(
        "for i := 0; i < 3; i++ { }
         for var j = 0; j < 3; j = j + 1 { }
         for x < 10 { break }
         for { break }",
    );

    assert!(matches!(&stmts[0], Stmt::For { pre: Some(_), check: Some(_), post: Some(_), .. }));
    assert!(matches!(&stmts[1], Stmt::For { pre: Some(_), check: Some(_), post: Some(_), .. }));
    assert!(matches!(&stmts[2], Stmt::For { pre: None, check: Some(_), post: None, .. }));
    assert!(matches!(&stmts[3], Stmt::For { pre: None, check: None, post: None, .. }));
}

#[test]
fn if_else_if_else_chain() {
    match &parse("if a { } else if b { } else if c { } else { }")[0] {
        Stmt::If {
            else_ifs,
            else_branch,
            ..
        } => {
            assert_eq!(else_ifs.len(), 2);
            assert!(else_branch.is_some());
        }
        other => panic!("expected if statement, got {:?}", other),
    }
}

#[test]
fn semicolons_are_optional() {
    assert_eq!(parse("var a = 1; var b = 2;; a = b").len(), 3);
    assert_eq!(parse("var a = 1\nvar b = 2\na = b").len(), 3);
}

#[test]
fn bare_return_before_closing_brace() {
    let stmts = parse("func f() { return }");

    match &stmts[0] {
        Stmt::Function(decl) => {
            assert!(matches!(decl.body[0], Stmt::Return { value: None, .. }))
        }
        other => panic!("expected function declaration, got {:?}", other),
    }
}

// ───── errors ────────────────────────────────────────────────────────────────

#[test]
fn parse_errors_report_token_and_line() {
    let err = parse_err("var x = 1\nvar = 2");

    assert!(matches!(err, QuillError::Parse { line: 2, .. }), "{:?}", err);
    assert_eq!(err.to_string(), "[line 2] Error at '=': Expected variable name");

    let eof = parse_err("(1 + 2");
    assert!(eof.to_string().contains("Error at end"), "{}", eof);
}

#[test]
fn misplaced_control_flow_is_rejected() {
    assert!(parse_err("break").to_string().contains("outside of a loop"));
    assert!(parse_err("return 1").to_string().contains("outside of function"));

    // A closure body is a function boundary for `break`.
    let err = parse_err("for { var f = func() { break } }");
    assert!(err.to_string().contains("outside of a loop"), "{}", err);
}

#[test]
fn declarations_outside_top_level_are_rejected() {
    assert!(parse_err("{ type T {} }").to_string().contains("top level"));
    assert!(parse_err("var f = func g() {}").to_string().contains("top level"));
}

#[test]
fn method_on_undeclared_type_is_rejected() {
    let err = parse_err("func Ghost.walk() { }");
    assert!(err.to_string().contains("Undeclared record type"), "{}", err);
}

#[test]
fn malformed_clauses_are_rejected() {
    assert!(parse_err("for var i = 0 { }").to_string().contains("Malformed for clause"));
    assert!(parse_err("1 = 2").to_string().contains("Invalid assignment target"));
    assert!(parse_err("3++").to_string().contains("Invalid increment target"));
    assert!(parse_err("func f(a, a) { }").to_string().contains("Duplicate parameter"));
    assert!(parse_err("type T {}\nvar t = T{a: 1, a: 2}")
        .to_string()
        .contains("Field initialized twice"));
}
