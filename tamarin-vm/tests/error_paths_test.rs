// tamarin-vm - VM error path tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Runtime failures reported out-of-band from `VM::run`.

use tamarin_parser::parse;
use tamarin_vm::{Compiler, RuntimeError, VM};

fn run_expecting_error(source: &str) -> RuntimeError {
    let (program, errors) = parse(source);
    assert!(errors.is_empty(), "parse errors for {:?}: {:?}", source, errors);
    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .unwrap_or_else(|e| panic!("compile error for {:?}: {}", source, e));
    let mut vm = VM::new(compiler.bytecode());
    vm.run()
        .expect_err(&format!("expected runtime error for {:?}", source))
}

#[test]
fn test_binary_type_error_message() {
    let error = run_expecting_error("5 + true");
    assert_eq!(
        error.to_string(),
        "unsupported types for binary operation: INTEGER BOOLEAN"
    );
}

#[test]
fn test_execution_halts_at_first_error() {
    // The binding after the failing expression never runs; the error
    // surfaces immediately.
    let error = run_expecting_error("let a = 1; -true; let b = 2;");
    assert_eq!(error.to_string(), "unsupported type for negation: BOOLEAN");
}

#[test]
fn test_value_stack_overflow() {
    // An array literal pushes every element before collecting them; a
    // wide enough literal exhausts the 2048-slot stack.
    let elements = vec!["1"; 2100].join(", ");
    let source = format!("[{}]", elements);
    assert_eq!(run_expecting_error(&source), RuntimeError::StackOverflow);
}

#[test]
fn test_runaway_recursion_is_fatal() {
    // Each nested call costs both a frame and value-stack slots, so the
    // run dies on whichever limit it reaches first.
    let error = run_expecting_error("let loop = fn(n) { loop(n + 1) }; loop(0);");
    assert!(
        matches!(
            error,
            RuntimeError::StackOverflow | RuntimeError::FrameOverflow
        ),
        "unexpected error: {}",
        error
    );
}

#[test]
fn test_division_by_zero() {
    assert_eq!(
        run_expecting_error("10 / (5 - 5)"),
        RuntimeError::DivisionByZero
    );
}

#[test]
fn test_builtin_error_text_matches_evaluator() {
    // Builtins are shared with the evaluator, so the message text is
    // identical even though the channel differs.
    let error = run_expecting_error(r#"first("not an array")"#);
    assert_eq!(
        error.to_string(),
        "argument to `first` must be ARRAY, got STRING"
    );
}

#[test]
fn test_bad_call_and_bad_index() {
    assert_eq!(
        run_expecting_error("true()").to_string(),
        "calling non-function: BOOLEAN"
    );
    assert_eq!(
        run_expecting_error(r#""abc"[0]"#).to_string(),
        "index operator not supported: STRING"
    );
}
