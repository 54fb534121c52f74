// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! # tamarin-vm
//!
//! Bytecode compiler and stack-based virtual machine for Tamarin.
//!
//! This crate provides an alternative execution model to the tree-walking
//! evaluator in `tamarin-core`. Programs are lowered to a flat byte stream
//! plus a constant pool, then executed on a value stack. The two back-ends
//! share the value model and agree on results.
//!
//! ```
//! use tamarin_parser::parse;
//! use tamarin_core::Value;
//! use tamarin_vm::{Compiler, VM};
//!
//! let (program, errors) = parse("let x = 2; x * 21");
//! assert!(errors.is_empty());
//!
//! let mut compiler = Compiler::new();
//! compiler.compile(&program).unwrap();
//!
//! let mut vm = VM::new(compiler.bytecode());
//! vm.run().unwrap();
//! assert_eq!(vm.last_popped(), &Value::Integer(42));
//! ```

pub mod compiler;
pub mod opcode;
pub mod symbol_table;
pub mod vm;

pub use compiler::{Bytecode, CompileError, Compiler};
pub use opcode::{Instructions, Op, disassemble, make};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
pub use vm::{GLOBALS_SIZE, RuntimeError, STACK_SIZE, VM};
