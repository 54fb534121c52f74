// tamarin-core - Property-based tests for evaluator semantics
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Property-based tests for the language invariants.
//!
//! Covers the truthiness law, totality of integer operators, closure
//! capture independence, and stability of parse -> print -> parse.

mod common;

use common::*;
use proptest::prelude::*;
use tamarin_parser::{BlockStatement, Expression, InfixOp, PrefixOp, Program, Statement};

// =============================================================================
// Truthiness: !x is true iff x is false or null
// =============================================================================

#[test]
fn truthiness_law_for_known_values() {
    // Snippets paired with whether they evaluate to a falsy value.
    let cases = [
        ("false", true),
        ("if (false) { 1 }", true), // evaluates to null
        ("true", false),
        ("0", false),
        ("1", false),
        (r#""""#, false),
        ("[]", false),
        ("{}", false),
    ];
    for (snippet, falsy) in cases {
        let result = eval_str(&format!("!{}", snippet));
        assert_eq!(result, Value::Boolean(falsy), "snippet: {}", snippet);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Double negation of any integer is true (integers are always truthy).
    #[test]
    fn double_bang_of_integer_is_true(n in any::<i32>()) {
        prop_assert_eq!(eval_str(&format!("!!({})", n)), Value::Boolean(true));
    }

    // =========================================================================
    // Integer operators are total (division excepted at zero)
    // =========================================================================

    /// Every arithmetic and comparison operator succeeds on any two
    /// integers; division succeeds whenever the divisor is non-zero.
    #[test]
    fn integer_operators_are_total(a in any::<i32>(), b in any::<i32>()) {
        let (a, b) = (i64::from(a), i64::from(b));

        let cases = [
            (format!("({}) + ({})", a, b), Value::Integer(a + b)),
            (format!("({}) - ({})", a, b), Value::Integer(a - b)),
            (format!("({}) * ({})", a, b), Value::Integer(a * b)),
            (format!("({}) < ({})", a, b), Value::Boolean(a < b)),
            (format!("({}) > ({})", a, b), Value::Boolean(a > b)),
            (format!("({}) == ({})", a, b), Value::Boolean(a == b)),
            (format!("({}) != ({})", a, b), Value::Boolean(a != b)),
        ];
        for (source, expected) in cases {
            prop_assert_eq!(eval_str(&source), expected, "source: {}", source);
        }

        let division = eval_str(&format!("({}) / ({})", a, b));
        if b == 0 {
            prop_assert_eq!(division, Value::error("division by zero"));
        } else {
            prop_assert_eq!(division, Value::Integer(a / b));
        }
    }

    // =========================================================================
    // Closure capture
    // =========================================================================

    /// Two closures made by the same factory capture independent
    /// environments.
    #[test]
    fn closures_capture_independently(x in any::<i32>(), y in any::<i32>()) {
        let env = Env::new();
        eval_str_with_env("let make = fn(v) { fn() { v } };", &env);
        eval_str_with_env(&format!("let a = make({});", x), &env);
        eval_str_with_env(&format!("let b = make({});", y), &env);
        prop_assert_eq!(eval_str_with_env("a()", &env), Value::Integer(i64::from(x)));
        prop_assert_eq!(eval_str_with_env("b()", &env), Value::Integer(i64::from(y)));
    }
}

// =============================================================================
// parse(print(parse(P))) == parse(P)
// =============================================================================

fn identifier() -> impl Strategy<Value = Expression> {
    prop::sample::select(vec!["x", "y", "foo", "bar_baz"])
        .prop_map(|name| Expression::Identifier(name.to_string()))
}

fn leaf() -> impl Strategy<Value = Expression> {
    prop_oneof![
        (0i64..1000).prop_map(Expression::Integer),
        any::<bool>().prop_map(Expression::Boolean),
        "[a-z]{0,8}".prop_map(Expression::Str),
        identifier(),
    ]
}

fn infix_op() -> impl Strategy<Value = InfixOp> {
    prop::sample::select(vec![
        InfixOp::Plus,
        InfixOp::Minus,
        InfixOp::Asterisk,
        InfixOp::Slash,
        InfixOp::Lt,
        InfixOp::Gt,
        InfixOp::Eq,
        InfixOp::NotEq,
    ])
}

/// A block holding exactly one expression statement: rendering joins block
/// statements with spaces, so single-statement blocks round-trip exactly.
fn block_of(expr: Expression) -> BlockStatement {
    BlockStatement {
        statements: vec![Statement::Expression(expr)],
    }
}

fn expression() -> impl Strategy<Value = Expression> {
    leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (inner.clone())
                .prop_map(|right| Expression::Prefix {
                    op: PrefixOp::Bang,
                    right: Box::new(right),
                }),
            (inner.clone())
                .prop_map(|right| Expression::Prefix {
                    op: PrefixOp::Minus,
                    right: Box::new(right),
                }),
            (inner.clone(), infix_op(), inner.clone()).prop_map(|(left, op, right)| {
                Expression::Infix {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Expression::Array),
            (inner.clone(), inner.clone()).prop_map(|(left, index)| Expression::Index {
                left: Box::new(left),
                index: Box::new(index),
            }),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(
                |(condition, consequence, alternative)| Expression::If {
                    condition: Box::new(condition),
                    consequence: block_of(consequence),
                    alternative: Some(block_of(alternative)),
                }
            ),
            (prop::collection::vec("[a-z]{1,4}", 0..3), inner.clone()).prop_map(
                |(parameters, body)| Expression::Function {
                    parameters,
                    body: block_of(body),
                    name: None,
                }
            ),
            (identifier(), prop::collection::vec(inner.clone(), 0..3)).prop_map(
                |(function, arguments)| Expression::Call {
                    function: Box::new(function),
                    arguments,
                }
            ),
            prop::collection::vec(("[a-z]{1,6}".prop_map(Expression::Str), inner.clone()), 0..3)
                .prop_map(Expression::Hash),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Rendering a program and re-parsing it yields a structurally equal
    /// program.
    #[test]
    fn printed_programs_reparse_identically(expr in expression()) {
        let program = Program {
            statements: vec![Statement::Expression(expr)],
        };
        let rendered = program.to_string();
        let (reparsed, errors) = parse(&rendered);
        prop_assert!(errors.is_empty(), "errors for {:?}: {:?}", rendered, errors);
        prop_assert_eq!(program, reparsed, "rendered: {}", rendered);
    }

    /// Every token literal produced by the lexer is an exact slice of its
    /// source.
    #[test]
    fn lexer_literals_are_source_slices(source in "[a-z0-9 =+*<>!(),;{}\\[\\]]{0,40}") {
        let mut lexer = tamarin_parser::Lexer::new(&source);
        loop {
            let token = lexer.next_token();
            if token.kind == tamarin_parser::TokenKind::Eof {
                break;
            }
            prop_assert!(
                source.contains(&token.literal),
                "literal {:?} not in {:?}",
                token.literal,
                source
            );
        }
    }
}
