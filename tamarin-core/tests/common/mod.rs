// tamarin-core - Common test utilities
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Shared helpers for Tamarin evaluator integration tests.
//!
//! In a test file, add:
//! ```ignore
//! mod common;
//! use common::*;
//! ```

#[allow(unused_imports)]
pub use tamarin_core::{Env, Value, eval};
#[allow(unused_imports)]
pub use tamarin_parser::parse;

/// Evaluate a source string in a fresh environment.
///
/// # Panics
///
/// Panics if the source fails to parse; runtime errors come back as
/// `Value::Error`.
pub fn eval_str(source: &str) -> Value {
    eval_str_with_env(source, &Env::new())
}

/// Evaluate a source string in the given environment.
pub fn eval_str_with_env(source: &str, env: &Env) -> Value {
    let (program, errors) = parse(source);
    assert!(
        errors.is_empty(),
        "parse errors for {:?}: {:?}",
        source,
        errors
    );
    eval(&program, env)
}

/// Assert that evaluating `input` produces the expected value.
#[macro_export]
macro_rules! assert_eval {
    ($input:expr, $expected:expr) => {
        let result = $crate::common::eval_str($input);
        assert_eq!(
            result, $expected,
            "evaluation of '{}' did not match expected",
            $input
        );
    };
}

/// Assert that evaluating `input` produces an error value with exactly the
/// given message.
#[macro_export]
macro_rules! assert_eval_err {
    ($input:expr, $message:expr) => {
        let result = $crate::common::eval_str($input);
        assert_eq!(
            result,
            $crate::common::Value::error($message),
            "expected error for '{}'",
            $input
        );
    };
}
