//! The virtual machine side of the debugger boundary: program metadata,
//! memory layout, frames, and the hook the interpreter calls into.

mod frame;
mod instr;
mod loader;
mod memory;
mod program;

pub use frame::Frame;
pub use instr::{Instr, Op, Operand};
pub use loader::{ImageLoader, LoadError, Loader};
pub use memory::{data_words, ArrayView, BlockKind, Heap, IndexError, Word, FLOAT_STRIDE, NIL};
pub use program::{
    ClassId, DeclKind, ElementKind, MethodId, Program, StackClass, StackDclr, StackMethod,
    STRING_CLASS,
};

use std::io;

/// Interpreter state visible to the debugger while an instruction is pending.
#[derive(Clone, Copy)]
pub struct ExecState<'a> {
    pub program: &'a Program,
    pub heap: &'a Heap,
    pub frame: &'a Frame,
    /// Caller frames, outermost first.
    pub call_stack: &'a [Frame],
    pub line: i32,
    pub file: &'a str,
}

impl<'a> ExecState<'a> {
    pub fn call_stack_pos(&self) -> usize {
        self.call_stack.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    Continue,
    Halt,
}

/// Called by the interpreter before every instruction it executes.
pub trait DebugHook {
    fn on_instruction(&mut self, state: &ExecState<'_>) -> io::Result<Resume>;
}
