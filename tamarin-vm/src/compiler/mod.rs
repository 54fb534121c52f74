// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Bytecode compiler: lowers the AST to instructions plus a constant pool.
//!
//! Compilation is a recursive traversal. Function literals compile inside
//! an enclosed scope with their own instruction buffer and symbol table;
//! the finished body becomes a `CompiledFunction` constant. Jumps are
//! emitted with placeholder operands and back-patched once their target
//! offset is known.

use std::fmt;
use std::rc::Rc;

use tamarin_core::builtins;
use tamarin_core::{CompiledFunction, Value};
use tamarin_parser::{BlockStatement, Expression, InfixOp, PrefixOp, Program, Statement};

use crate::opcode::{self, Instructions, Op};
use crate::symbol_table::{SymbolScope, SymbolTable};

/// An error produced during compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    fn new(message: impl Into<String>) -> Self {
        CompileError {
            message: message.into(),
        }
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CompileError {}

/// The compiler's output: an instruction stream and its constant pool.
#[derive(Debug, Clone)]
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Value>,
}

/// A record of an emitted instruction, for the peephole rewrites around
/// `if` arms and implicit function returns.
#[derive(Debug, Clone, Copy)]
struct EmittedInstruction {
    opcode: Op,
    position: usize,
}

/// One function's (or the program's) in-progress instruction buffer.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last_instruction: Option<EmittedInstruction>,
    previous_instruction: Option<EmittedInstruction>,
}

/// The Tamarin bytecode compiler.
pub struct Compiler {
    constants: Vec<Value>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Compiler {
    /// Create a compiler with the builtin registry pre-defined.
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, builtin) in builtins::BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, builtin.name);
        }
        Compiler {
            constants: Vec::new(),
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Create a compiler that continues from an earlier one's symbol table
    /// and constants (REPL sessions compile line by line).
    pub fn with_state(symbol_table: SymbolTable, constants: Vec<Value>) -> Self {
        Compiler {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Take back the symbol table and constants for the next compilation.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbol_table, self.constants)
    }

    /// Compile a program into the current instruction stream.
    pub fn compile(&mut self, program: &Program) -> Result<(), CompileError> {
        for statement in &program.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// The bytecode compiled so far.
    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.scopes[0].instructions.clone(),
            constants: self.constants.clone(),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Let { name, value } => {
                // Defining before compiling the value lets a function body
                // refer to its own binding.
                let symbol = self.symbol_table.define(name);
                self.compile_expression(value)?;
                match symbol.scope {
                    SymbolScope::Local => self.emit(Op::SetLocal, &[symbol.index]),
                    _ => self.emit(Op::SetGlobal, &[symbol.index]),
                };
                Ok(())
            }
            Statement::Return(value) => {
                self.compile_expression(value)?;
                self.emit(Op::ReturnValue, &[]);
                Ok(())
            }
            Statement::Expression(expression) => {
                self.compile_expression(expression)?;
                // Keep the stack balanced: a statement's value is unused.
                self.emit(Op::Pop, &[]);
                Ok(())
            }
        }
    }

    fn compile_block(&mut self, block: &BlockStatement) -> Result<(), CompileError> {
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    fn compile_expression(&mut self, expression: &Expression) -> Result<(), CompileError> {
        match expression {
            Expression::Identifier(name) => {
                let Some(symbol) = self.symbol_table.resolve(name) else {
                    return Err(CompileError::new(format!("undefined variable {}", name)));
                };
                match symbol.scope {
                    SymbolScope::Global => self.emit(Op::GetGlobal, &[symbol.index]),
                    SymbolScope::Local => self.emit(Op::GetLocal, &[symbol.index]),
                    SymbolScope::Builtin => self.emit(Op::GetBuiltin, &[symbol.index]),
                };
                Ok(())
            }
            Expression::Integer(value) => {
                let index = self.add_constant(Value::Integer(*value));
                self.emit(Op::Constant, &[index]);
                Ok(())
            }
            Expression::Boolean(value) => {
                if *value {
                    self.emit(Op::True, &[]);
                } else {
                    self.emit(Op::False, &[]);
                }
                Ok(())
            }
            Expression::Str(value) => {
                let index = self.add_constant(Value::string(value.clone()));
                self.emit(Op::Constant, &[index]);
                Ok(())
            }
            Expression::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(Op::Array, &[elements.len()]);
                Ok(())
            }
            Expression::Hash(pairs) => {
                // Keys sort by their rendering so instruction output is
                // deterministic regardless of declaration order.
                let mut sorted: Vec<_> = pairs.iter().collect();
                sorted.sort_by_key(|(key, _)| key.to_string());
                for (key, value) in &sorted {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(Op::Hash, &[pairs.len() * 2]);
                Ok(())
            }
            Expression::Prefix { op, right } => {
                self.compile_expression(right)?;
                match op {
                    PrefixOp::Bang => self.emit(Op::Bang, &[]),
                    PrefixOp::Minus => self.emit(Op::Minus, &[]),
                };
                Ok(())
            }
            Expression::Infix { op, left, right } => {
                // No less-than opcode: reverse the operands and compare
                // with greater-than.
                if *op == InfixOp::Lt {
                    self.compile_expression(right)?;
                    self.compile_expression(left)?;
                    self.emit(Op::GreaterThan, &[]);
                    return Ok(());
                }

                self.compile_expression(left)?;
                self.compile_expression(right)?;
                match op {
                    InfixOp::Plus => self.emit(Op::Add, &[]),
                    InfixOp::Minus => self.emit(Op::Sub, &[]),
                    InfixOp::Asterisk => self.emit(Op::Mul, &[]),
                    InfixOp::Slash => self.emit(Op::Div, &[]),
                    InfixOp::Gt => self.emit(Op::GreaterThan, &[]),
                    InfixOp::Eq => self.emit(Op::Equal, &[]),
                    InfixOp::NotEq => self.emit(Op::NotEqual, &[]),
                    InfixOp::Lt => unreachable!("handled above"),
                };
                Ok(())
            }
            Expression::If {
                condition,
                consequence,
                alternative,
            } => self.compile_if(condition, consequence, alternative.as_ref()),
            Expression::Function {
                parameters, body, ..
            } => self.compile_function(parameters, body),
            Expression::Call {
                function,
                arguments,
            } => {
                self.compile_expression(function)?;
                for argument in arguments {
                    self.compile_expression(argument)?;
                }
                self.emit(Op::Call, &[arguments.len()]);
                Ok(())
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(Op::Index, &[]);
                Ok(())
            }
        }
    }

    fn compile_if(
        &mut self,
        condition: &Expression,
        consequence: &BlockStatement,
        alternative: Option<&BlockStatement>,
    ) -> Result<(), CompileError> {
        self.compile_expression(condition)?;

        // Placeholder operand, patched once the consequence is compiled.
        let jump_not_truthy_position = self.emit(Op::JumpNotTruthy, &[9999]);

        self.compile_block(consequence)?;
        if self.last_instruction_is(Op::Pop) {
            // The arm's value is the if-expression's value.
            self.remove_last_pop();
        }

        let jump_position = self.emit(Op::Jump, &[9999]);

        let after_consequence = self.current_position();
        self.change_operand(jump_not_truthy_position, after_consequence);

        match alternative {
            None => {
                self.emit(Op::Null, &[]);
            }
            Some(alternative) => {
                self.compile_block(alternative)?;
                if self.last_instruction_is(Op::Pop) {
                    self.remove_last_pop();
                }
            }
        }

        let after_alternative = self.current_position();
        self.change_operand(jump_position, after_alternative);

        Ok(())
    }

    fn compile_function(
        &mut self,
        parameters: &[String],
        body: &BlockStatement,
    ) -> Result<(), CompileError> {
        self.enter_scope();

        for parameter in parameters {
            self.symbol_table.define(parameter);
        }

        self.compile_block(body)?;

        // The body's final value is its return value; an empty body
        // returns null.
        if self.last_instruction_is(Op::Pop) {
            self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(Op::ReturnValue) {
            self.emit(Op::Return, &[]);
        }

        let num_locals = self.symbol_table.num_definitions();
        let instructions = self.leave_scope();

        let function = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: parameters.len(),
        };
        let index = self.add_constant(Value::CompiledFunction(Rc::new(function)));
        self.emit(Op::Constant, &[index]);
        Ok(())
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn emit(&mut self, op: Op, operands: &[usize]) -> usize {
        let instruction = opcode::make(op, operands);
        let position = self.current_position();

        let scope = self.current_scope_mut();
        scope.instructions.extend(instruction);
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction {
            opcode: op,
            position,
        });

        position
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("compiler scope stack empty")
    }

    fn current_position(&self) -> usize {
        self.scopes
            .last()
            .expect("compiler scope stack empty")
            .instructions
            .len()
    }

    fn last_instruction_is(&self, op: Op) -> bool {
        self.scopes
            .last()
            .and_then(|scope| scope.last_instruction)
            .is_some_and(|last| last.opcode == op)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        if let Some(last) = scope.last_instruction {
            scope.instructions.truncate(last.position);
            scope.last_instruction = scope.previous_instruction;
        }
    }

    /// Overwrite the instruction at `position` in place. The replacement
    /// must have the same width as the original.
    fn replace_instruction(&mut self, position: usize, instruction: Instructions) {
        let scope = self.current_scope_mut();
        scope.instructions[position..position + instruction.len()].copy_from_slice(&instruction);
    }

    fn replace_last_pop_with_return(&mut self) {
        let scope = self.current_scope_mut();
        let Some(mut last) = scope.last_instruction else {
            return;
        };
        let position = last.position;
        last.opcode = Op::ReturnValue;
        scope.last_instruction = Some(last);
        self.replace_instruction(position, opcode::make(Op::ReturnValue, &[]));
    }

    /// Back-patch a jump operand once the target is known.
    fn change_operand(&mut self, position: usize, operand: usize) {
        let scope = self.scopes.last().expect("compiler scope stack empty");
        let op = Op::from_byte(scope.instructions[position]).expect("patching unknown opcode");
        self.replace_instruction(position, opcode::make(op, &[operand]));
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        let outer = std::mem::take(&mut self.symbol_table);
        self.symbol_table = SymbolTable::enclosed(outer);
    }

    fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("compiler scope stack empty");
        let table = std::mem::take(&mut self.symbol_table);
        self.symbol_table = table
            .into_outer()
            .expect("left a scope with no enclosing symbol table");
        scope.instructions
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
