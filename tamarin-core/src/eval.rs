// tamarin-core - Tree-walking evaluator
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! AST-walking evaluator for Tamarin programs.
//!
//! Evaluation is a single dispatch over node variants. Runtime errors are
//! themselves values (`Value::Error`) and short-circuit every composition
//! point; `return` produces a `Value::Return` marker that unwinds through
//! blocks and is unwrapped at program level and on function application.

use std::rc::Rc;

use im::OrdMap;

use tamarin_parser::{BlockStatement, Expression, InfixOp, PrefixOp, Program, Statement};

use crate::builtins;
use crate::env::Env;
use crate::object::{Function, HashPair, Value};

/// Evaluate a program against the given environment.
///
/// A `return` at the top level stops execution and yields the returned
/// value; an error stops execution and yields the error value; otherwise
/// the result is the last statement's result.
pub fn eval(program: &Program, env: &Env) -> Value {
    let mut result = Value::Null;
    for statement in &program.statements {
        result = eval_statement(statement, env);
        match result {
            Value::Return(value) => return *value,
            Value::Error(_) => return result,
            _ => {}
        }
    }
    result
}

fn eval_statement(statement: &Statement, env: &Env) -> Value {
    match statement {
        Statement::Let { name, value } => {
            let value = eval_expression(value, env);
            if is_error(&value) {
                return value;
            }
            env.define(name.clone(), value);
            Value::Null
        }
        Statement::Return(value) => {
            let value = eval_expression(value, env);
            if is_error(&value) {
                return value;
            }
            Value::Return(Box::new(value))
        }
        Statement::Expression(expression) => eval_expression(expression, env),
    }
}

/// Evaluate every statement in a block. `Return` markers short-circuit but
/// are deliberately not unwrapped here, so a `return` in a nested block
/// unwinds through every enclosing block to the function or program level.
fn eval_block(block: &BlockStatement, env: &Env) -> Value {
    let mut result = Value::Null;
    for statement in &block.statements {
        result = eval_statement(statement, env);
        if matches!(result, Value::Return(_) | Value::Error(_)) {
            return result;
        }
    }
    result
}

fn eval_expression(expression: &Expression, env: &Env) -> Value {
    match expression {
        Expression::Identifier(name) => eval_identifier(name, env),
        Expression::Integer(value) => Value::Integer(*value),
        Expression::Boolean(value) => Value::Boolean(*value),
        Expression::Str(value) => Value::string(value.clone()),
        Expression::Array(elements) => match eval_expressions(elements, env) {
            Ok(elements) => Value::array(elements),
            Err(error) => error,
        },
        Expression::Hash(pairs) => eval_hash_literal(pairs, env),
        Expression::Prefix { op, right } => {
            let right = eval_expression(right, env);
            if is_error(&right) {
                return right;
            }
            eval_prefix(*op, right)
        }
        Expression::Infix { op, left, right } => {
            let left = eval_expression(left, env);
            if is_error(&left) {
                return left;
            }
            let right = eval_expression(right, env);
            if is_error(&right) {
                return right;
            }
            eval_infix(*op, left, right)
        }
        Expression::If {
            condition,
            consequence,
            alternative,
        } => {
            let condition = eval_expression(condition, env);
            if is_error(&condition) {
                return condition;
            }
            if condition.is_truthy() {
                eval_block(consequence, env)
            } else if let Some(alternative) = alternative {
                eval_block(alternative, env)
            } else {
                Value::Null
            }
        }
        Expression::Function {
            parameters, body, ..
        } => Value::Function(Rc::new(Function {
            parameters: parameters.clone(),
            body: body.clone(),
            env: env.clone(),
        })),
        Expression::Call {
            function,
            arguments,
        } => {
            let function = eval_expression(function, env);
            if is_error(&function) {
                return function;
            }
            match eval_expressions(arguments, env) {
                Ok(args) => apply_function(&function, &args),
                Err(error) => error,
            }
        }
        Expression::Index { left, index } => {
            let left = eval_expression(left, env);
            if is_error(&left) {
                return left;
            }
            let index = eval_expression(index, env);
            if is_error(&index) {
                return index;
            }
            eval_index(left, index)
        }
    }
}

fn eval_identifier(name: &str, env: &Env) -> Value {
    if let Some(value) = env.lookup(name) {
        return value;
    }
    if let Some(builtin) = builtins::lookup(name) {
        return Value::Builtin(builtin);
    }
    Value::error(format!("identifier not found: {}", name))
}

/// Evaluate expressions left to right, stopping at the first error.
fn eval_expressions(expressions: &[Expression], env: &Env) -> Result<Vec<Value>, Value> {
    let mut results = Vec::with_capacity(expressions.len());
    for expression in expressions {
        let value = eval_expression(expression, env);
        if is_error(&value) {
            return Err(value);
        }
        results.push(value);
    }
    Ok(results)
}

fn eval_hash_literal(pairs: &[(Expression, Expression)], env: &Env) -> Value {
    let mut hash = OrdMap::new();
    for (key_expression, value_expression) in pairs {
        let key = eval_expression(key_expression, env);
        if is_error(&key) {
            return key;
        }
        let Some(hash_key) = key.hash_key() else {
            return Value::error(format!("unusable as hash key: {}", key.type_name()));
        };
        let value = eval_expression(value_expression, env);
        if is_error(&value) {
            return value;
        }
        hash.insert(hash_key, HashPair { key, value });
    }
    Value::Hash(hash)
}

fn eval_prefix(op: PrefixOp, right: Value) -> Value {
    match op {
        PrefixOp::Bang => Value::Boolean(!right.is_truthy()),
        PrefixOp::Minus => match right {
            Value::Integer(value) => Value::Integer(value.wrapping_neg()),
            other => Value::error(format!("unknown operator: -{}", other.type_name())),
        },
    }
}

fn eval_infix(op: InfixOp, left: Value, right: Value) -> Value {
    match (&left, &right) {
        (Value::Integer(l), Value::Integer(r)) => eval_integer_infix(op, *l, *r),
        (Value::Str(l), Value::Str(r)) => eval_string_infix(op, l, r),
        _ => match op {
            // Equality between non-integers is singleton equality: only the
            // shared true/false/null compare equal to themselves.
            InfixOp::Eq => Value::Boolean(left.identity_eq(&right)),
            InfixOp::NotEq => Value::Boolean(!left.identity_eq(&right)),
            _ if left.type_name() != right.type_name() => Value::error(format!(
                "type mismatch: {} {} {}",
                left.type_name(),
                op,
                right.type_name()
            )),
            _ => Value::error(format!(
                "unknown operator: {} {} {}",
                left.type_name(),
                op,
                right.type_name()
            )),
        },
    }
}

fn eval_integer_infix(op: InfixOp, left: i64, right: i64) -> Value {
    match op {
        InfixOp::Plus => Value::Integer(left.wrapping_add(right)),
        InfixOp::Minus => Value::Integer(left.wrapping_sub(right)),
        InfixOp::Asterisk => Value::Integer(left.wrapping_mul(right)),
        InfixOp::Slash => {
            if right == 0 {
                Value::error("division by zero")
            } else {
                Value::Integer(left.wrapping_div(right))
            }
        }
        InfixOp::Lt => Value::Boolean(left < right),
        InfixOp::Gt => Value::Boolean(left > right),
        InfixOp::Eq => Value::Boolean(left == right),
        InfixOp::NotEq => Value::Boolean(left != right),
    }
}

fn eval_string_infix(op: InfixOp, left: &str, right: &str) -> Value {
    match op {
        InfixOp::Plus => Value::string(format!("{}{}", left, right)),
        _ => Value::error(format!("unknown operator: STRING {} STRING", op)),
    }
}

fn eval_index(left: Value, index: Value) -> Value {
    match (&left, &index) {
        (Value::Array(elements), Value::Integer(i)) => {
            if *i < 0 || *i as usize >= elements.len() {
                Value::Null
            } else {
                elements[*i as usize].clone()
            }
        }
        (Value::Hash(pairs), _) => match index.hash_key() {
            Some(key) => pairs
                .get(&key)
                .map(|pair| pair.value.clone())
                .unwrap_or(Value::Null),
            None => Value::error(format!("unusable as hash key: {}", index.type_name())),
        },
        _ => Value::error(format!(
            "index operator not supported: {}",
            left.type_name()
        )),
    }
}

/// Call a function value with already-evaluated arguments.
///
/// User functions run their body in a fresh environment enclosed by the
/// captured one, with parameters bound positionally. A `Return` marker is
/// unwrapped here so it stops at the function boundary.
pub fn apply_function(function: &Value, args: &[Value]) -> Value {
    match function {
        Value::Function(function) => {
            if args.len() != function.parameters.len() {
                return Value::error(format!(
                    "wrong number of arguments: want={}, got={}",
                    function.parameters.len(),
                    args.len()
                ));
            }
            let call_env = function.env.enclosed();
            for (parameter, arg) in function.parameters.iter().zip(args) {
                call_env.define(parameter.clone(), arg.clone());
            }
            match eval_block(&function.body, &call_env) {
                Value::Return(value) => *value,
                other => other,
            }
        }
        Value::Builtin(builtin) => (builtin.func)(args),
        other => Value::error(format!("not a function: {}", other.type_name())),
    }
}

fn is_error(value: &Value) -> bool {
    matches!(value, Value::Error(_))
}

// ============================================================================
// Tests
// ============================================================================
