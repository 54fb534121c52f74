// tamarin-vm - Bytecode compiler and virtual machine for the Tamarin programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Call frames for the VM.

use std::rc::Rc;

use tamarin_core::CompiledFunction;

/// One call's execution state: the compiled function, an instruction
/// pointer into it, and the stack depth its locals sit above.
#[derive(Debug)]
pub struct Frame {
    pub func: Rc<CompiledFunction>,
    pub ip: usize,
    pub base_pointer: usize,
}

impl Frame {
    /// Create a frame starting at the function's first instruction.
    pub fn new(func: Rc<CompiledFunction>, base_pointer: usize) -> Self {
        Frame {
            func,
            ip: 0,
            base_pointer,
        }
    }

    /// The frame's instruction stream.
    pub fn instructions(&self) -> &[u8] {
        &self.func.instructions
    }
}
