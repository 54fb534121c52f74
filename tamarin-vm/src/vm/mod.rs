// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Stack-based virtual machine executing Tamarin bytecode.
//!
//! The machine decodes the flat instruction stream one opcode at a time,
//! operating on a fixed-size value stack and a frame stack for calls.
//! Runtime failures are reported out-of-band from [`VM::run`] and halt
//! execution immediately.

pub mod frame;
pub mod stack;

use std::fmt;
use std::rc::Rc;

use im::OrdMap;

use tamarin_core::{HashPair, Value, builtins};

use crate::compiler::Bytecode;
use crate::opcode::{self, Op};

pub use frame::Frame;
pub use stack::{STACK_SIZE, ValueStack};

/// Size of the globals array; `SetGlobal`/`GetGlobal` operands index it
/// directly.
pub const GLOBALS_SIZE: usize = 65536;

/// Maximum call depth.
pub const MAX_FRAMES: usize = 1024;

/// Runtime error during VM execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Push onto a full value stack.
    StackOverflow,
    /// Pop from an empty value stack.
    StackUnderflow,
    /// Call depth exceeded `MAX_FRAMES`.
    FrameOverflow,
    /// Binary operation on operand types it is not defined for.
    UnsupportedBinaryTypes(&'static str, &'static str),
    /// String operands with an operator other than `+`.
    UnknownStringOperator(Op),
    /// Comparison operator undefined for the operand types.
    UnknownOperator {
        op: Op,
        left: &'static str,
        right: &'static str,
    },
    /// Integer division by zero.
    DivisionByZero,
    /// `Minus` applied to a non-integer.
    UnsupportedNegation(&'static str),
    /// Hash construction or lookup with an unhashable key.
    UnusableHashKey(&'static str),
    /// `Index` applied to a type that does not support it.
    IndexNotSupported(&'static str),
    /// `Call` applied to a non-function value.
    NotCallable(&'static str),
    /// Call with the wrong number of arguments.
    WrongArgumentCount { want: usize, got: usize },
    /// A builtin reported an error.
    Builtin(String),
    /// A byte that is not an opcode.
    UnknownOpcode(u8),
    /// Bytecode invariant violation (bad constant or builtin index).
    Internal(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::StackOverflow => write!(f, "stack overflow"),
            RuntimeError::StackUnderflow => write!(f, "stack underflow"),
            RuntimeError::FrameOverflow => write!(f, "frame stack overflow"),
            RuntimeError::UnsupportedBinaryTypes(left, right) => {
                write!(f, "unsupported types for binary operation: {} {}", left, right)
            }
            RuntimeError::UnknownStringOperator(op) => {
                write!(f, "unknown string operator: {}", op)
            }
            RuntimeError::UnknownOperator { op, left, right } => {
                write!(f, "unknown operator: {} ({} {})", op, left, right)
            }
            RuntimeError::DivisionByZero => write!(f, "division by zero"),
            RuntimeError::UnsupportedNegation(operand) => {
                write!(f, "unsupported type for negation: {}", operand)
            }
            RuntimeError::UnusableHashKey(key) => {
                write!(f, "unusable as hash key: {}", key)
            }
            RuntimeError::IndexNotSupported(left) => {
                write!(f, "index operator not supported: {}", left)
            }
            RuntimeError::NotCallable(callee) => {
                write!(f, "calling non-function: {}", callee)
            }
            RuntimeError::WrongArgumentCount { want, got } => {
                write!(f, "wrong number of arguments: want={}, got={}", want, got)
            }
            RuntimeError::Builtin(message) => f.write_str(message),
            RuntimeError::UnknownOpcode(byte) => write!(f, "unknown opcode: {}", byte),
            RuntimeError::Internal(message) => write!(f, "internal error: {}", message),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for VM operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// The Tamarin virtual machine.
pub struct VM {
    constants: Vec<Value>,
    stack: ValueStack,
    globals: Vec<Value>,
    frames: Vec<Frame>,
}

impl VM {
    /// Create a VM for the given bytecode.
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_globals(bytecode, vec![Value::Null; GLOBALS_SIZE])
    }

    /// Create a VM reusing an existing globals array (REPL sessions keep
    /// globals across lines).
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Value>) -> Self {
        let main_function = Rc::new(tamarin_core::CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        });
        VM {
            constants: bytecode.constants,
            stack: ValueStack::new(),
            globals,
            frames: vec![Frame::new(main_function, 0)],
        }
    }

    /// Take back the globals array for the next run.
    pub fn into_globals(self) -> Vec<Value> {
        self.globals
    }

    /// The most recently popped value: after a successful run, the result
    /// of the last expression statement.
    pub fn last_popped(&self) -> &Value {
        self.stack.last_popped()
    }

    /// Execute the bytecode to completion.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let (op_byte, at_end) = {
                let frame = self.current_frame();
                let instructions = frame.instructions();
                if frame.ip >= instructions.len() {
                    (0, true)
                } else {
                    (instructions[frame.ip], false)
                }
            };
            if at_end {
                // The main program simply runs off its end; function
                // frames always leave through Return/ReturnValue.
                return Ok(());
            }

            let op = Op::from_byte(op_byte).ok_or(RuntimeError::UnknownOpcode(op_byte))?;
            self.current_frame_mut().ip += 1;

            match op {
                Op::Constant => {
                    let index = self.read_u16_operand();
                    let constant = self.constant(index)?;
                    self.stack.push(constant)?;
                }
                Op::Pop => {
                    self.stack.pop()?;
                }

                Op::Add | Op::Sub | Op::Mul | Op::Div => {
                    self.execute_binary_operation(op)?;
                }

                Op::True => self.stack.push(Value::Boolean(true))?,
                Op::False => self.stack.push(Value::Boolean(false))?,
                Op::Null => self.stack.push(Value::Null)?,

                Op::Equal | Op::NotEqual | Op::GreaterThan => {
                    self.execute_comparison(op)?;
                }

                Op::Minus => {
                    let operand = self.stack.pop()?;
                    match operand {
                        Value::Integer(value) => {
                            self.stack.push(Value::Integer(value.wrapping_neg()))?;
                        }
                        other => {
                            return Err(RuntimeError::UnsupportedNegation(other.type_name()));
                        }
                    }
                }
                Op::Bang => {
                    let operand = self.stack.pop()?;
                    self.stack.push(Value::Boolean(!operand.is_truthy()))?;
                }

                Op::Jump => {
                    let target = self.read_u16_operand();
                    self.current_frame_mut().ip = target;
                }
                Op::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.stack.pop()?;
                    if !condition.is_truthy() {
                        self.current_frame_mut().ip = target;
                    }
                }

                Op::SetGlobal => {
                    let index = self.read_u16_operand();
                    let value = self.stack.pop()?;
                    self.globals[index] = value;
                }
                Op::GetGlobal => {
                    let index = self.read_u16_operand();
                    let value = self.globals[index].clone();
                    self.stack.push(value)?;
                }

                Op::Array => {
                    let count = self.read_u16_operand();
                    let elements = self.stack.pop_n(count)?;
                    self.stack.push(Value::array(elements))?;
                }
                Op::Hash => {
                    let count = self.read_u16_operand();
                    let hash = self.build_hash(count)?;
                    self.stack.push(hash)?;
                }
                Op::Index => {
                    let index = self.stack.pop()?;
                    let left = self.stack.pop()?;
                    self.execute_index(left, index)?;
                }

                Op::Call => {
                    let argc = self.read_u8_operand();
                    self.execute_call(argc)?;
                }
                Op::ReturnValue => {
                    let value = self.stack.pop()?;
                    if self.pop_frame_and_restore()? {
                        // A top-level return halts the program; the popped
                        // value is already recorded as the result.
                        return Ok(());
                    }
                    self.stack.push(value)?;
                }
                Op::Return => {
                    if self.pop_frame_and_restore()? {
                        return Ok(());
                    }
                    self.stack.push(Value::Null)?;
                }

                Op::SetLocal => {
                    let index = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.pop()?;
                    self.stack.set(base + index, value)?;
                }
                Op::GetLocal => {
                    let index = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack.get(base + index)?;
                    self.stack.push(value)?;
                }

                Op::GetBuiltin => {
                    let index = self.read_u8_operand();
                    let builtin = builtins::by_index(index).ok_or_else(|| {
                        RuntimeError::Internal(format!("builtin index {} out of range", index))
                    })?;
                    self.stack.push(Value::Builtin(builtin))?;
                }
            }
        }
    }

    // ========================================================================
    // Decoding helpers
    // ========================================================================

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("no active frame")
    }

    fn current_frame_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    fn read_u16_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let value = opcode::read_u16(&frame.func.instructions[frame.ip..]);
        frame.ip += 2;
        value as usize
    }

    fn read_u8_operand(&mut self) -> usize {
        let frame = self.current_frame_mut();
        let value = frame.func.instructions[frame.ip];
        frame.ip += 1;
        value as usize
    }

    fn constant(&self, index: usize) -> Result<Value> {
        self.constants.get(index).cloned().ok_or_else(|| {
            RuntimeError::Internal(format!("constant index {} out of range", index))
        })
    }

    // ========================================================================
    // Operation handlers
    // ========================================================================

    fn execute_binary_operation(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => match op {
                Op::Add => Value::Integer(l.wrapping_add(*r)),
                Op::Sub => Value::Integer(l.wrapping_sub(*r)),
                Op::Mul => Value::Integer(l.wrapping_mul(*r)),
                Op::Div => {
                    if *r == 0 {
                        return Err(RuntimeError::DivisionByZero);
                    }
                    Value::Integer(l.wrapping_div(*r))
                }
                _ => unreachable!("non-arithmetic opcode {}", op),
            },
            (Value::Str(l), Value::Str(r)) => {
                if op != Op::Add {
                    return Err(RuntimeError::UnknownStringOperator(op));
                }
                Value::string(format!("{}{}", l, r))
            }
            _ => {
                return Err(RuntimeError::UnsupportedBinaryTypes(
                    left.type_name(),
                    right.type_name(),
                ));
            }
        };

        self.stack.push(result)
    }

    fn execute_comparison(&mut self, op: Op) -> Result<()> {
        let right = self.stack.pop()?;
        let left = self.stack.pop()?;

        let result = match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => match op {
                Op::Equal => l == r,
                Op::NotEqual => l != r,
                Op::GreaterThan => l > r,
                _ => unreachable!("non-comparison opcode {}", op),
            },
            _ => match op {
                Op::Equal => left.identity_eq(&right),
                Op::NotEqual => !left.identity_eq(&right),
                _ => {
                    return Err(RuntimeError::UnknownOperator {
                        op,
                        left: left.type_name(),
                        right: right.type_name(),
                    });
                }
            },
        };

        self.stack.push(Value::Boolean(result))
    }

    fn build_hash(&mut self, count: usize) -> Result<Value> {
        let slots = self.stack.pop_n(count)?;
        let mut hash = OrdMap::new();
        for pair in slots.chunks_exact(2) {
            let key = pair[0].clone();
            let value = pair[1].clone();
            let hash_key = key
                .hash_key()
                .ok_or_else(|| RuntimeError::UnusableHashKey(key.type_name()))?;
            hash.insert(hash_key, HashPair { key, value });
        }
        Ok(Value::Hash(hash))
    }

    fn execute_index(&mut self, left: Value, index: Value) -> Result<()> {
        let result = match (&left, &index) {
            (Value::Array(elements), Value::Integer(i)) => {
                if *i < 0 || *i as usize >= elements.len() {
                    Value::Null
                } else {
                    elements[*i as usize].clone()
                }
            }
            (Value::Hash(pairs), _) => {
                let key = index
                    .hash_key()
                    .ok_or_else(|| RuntimeError::UnusableHashKey(index.type_name()))?;
                pairs
                    .get(&key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(Value::Null)
            }
            _ => return Err(RuntimeError::IndexNotSupported(left.type_name())),
        };
        self.stack.push(result)
    }

    fn execute_call(&mut self, argc: usize) -> Result<()> {
        let callee_index = self
            .stack
            .len()
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)?;
        let callee = self.stack.get(callee_index)?;

        match callee {
            Value::CompiledFunction(function) => {
                if argc != function.num_parameters {
                    return Err(RuntimeError::WrongArgumentCount {
                        want: function.num_parameters,
                        got: argc,
                    });
                }
                if self.frames.len() >= MAX_FRAMES {
                    return Err(RuntimeError::FrameOverflow);
                }

                // Arguments already sit where the frame's first locals go;
                // reserve the remaining local slots above them.
                let base_pointer = self.stack.len() - argc;
                for _ in 0..function.num_locals.saturating_sub(function.num_parameters) {
                    self.stack.push(Value::Null)?;
                }
                self.frames.push(Frame::new(function, base_pointer));
                Ok(())
            }
            Value::Builtin(builtin) => {
                let args = self.stack.pop_n(argc)?;
                self.stack.pop()?; // the builtin value itself
                match (builtin.func)(&args) {
                    Value::Error(message) => Err(RuntimeError::Builtin(message)),
                    result => self.stack.push(result),
                }
            }
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    /// Pop the current frame and drop its locals, arguments, and callee
    /// from the stack. Returns true when the popped frame was the main
    /// program's.
    fn pop_frame_and_restore(&mut self) -> Result<bool> {
        let frame = self
            .frames
            .pop()
            .ok_or_else(|| RuntimeError::Internal("no frame to pop".to_string()))?;
        if self.frames.is_empty() {
            return Ok(true);
        }
        self.stack.truncate(frame.base_pointer.saturating_sub(1));
        Ok(false)
    }
}

// ============================================================================
// Tests
// ============================================================================
