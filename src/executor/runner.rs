//! Reference interpreter for program images.
//!
//! Runs the entry method and reports every instruction to a [`DebugHook`]
//! before executing it, the same way the debugger expects a production VM
//! dispatch loop to.

use crate::vm::{
    DebugHook, DeclKind, ElementKind, ExecState, Frame, Heap, Op, Operand, Program, Resume, Word,
    NIL, STRING_CLASS,
};
use std::io;
use thiserror::Error;
use tracing::{info, trace};

const MAX_CALL_DEPTH: usize = 1024;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("unknown class '{0}'")]
    UnknownClass(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("invalid local slot {0}")]
    InvalidSlot(usize),

    #[error("invalid array element access")]
    InvalidElement,

    #[error("attempt to dereference Nil")]
    NilDereference,

    #[error("call stack overflow")]
    StackOverflow,

    #[error(transparent)]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Completed,
    /// The hook asked to stop the program.
    Halted,
}

pub struct Interpreter {
    program: Program,
    heap: Heap,
    frames: Vec<Frame>,
}

impl Interpreter {
    pub fn new(program: Program) -> Self {
        let mut heap = Heap::new();
        for klass in program.classes() {
            heap.alloc_static(klass.id, klass.class_size());
        }
        Self {
            program,
            heap,
            frames: Vec::new(),
        }
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    pub fn execute<H: DebugHook + ?Sized>(
        &mut self,
        args: &[String],
        hook: &mut H,
    ) -> Result<ExitStatus, RuntimeError> {
        let entry = self.program.entry();
        let (mut frame, args_index) = {
            let method = self
                .program
                .method(entry)
                .ok_or_else(|| RuntimeError::UnknownMethod(format!("{entry:?}")))?;
            let args_index = method
                .local_declaration("args")
                .filter(|dclr| dclr.kind == DeclKind::Array(ElementKind::Object))
                .map(|dclr| method.local_offset() + dclr.slot);
            (Frame::new(method, NIL), args_index)
        };
        if let Some(index) = args_index {
            let ptr = self.alloc_args(args)?;
            if let Some(cell) = frame.mem.get_mut(index) {
                *cell = ptr;
            }
        }

        info!(entry = %self.program.method_label(entry), "executing program");
        self.frames.clear();
        self.frames.push(frame);
        let status = self.run(hook);
        self.frames.clear();
        info!(?status, "program finished");
        status
    }

    fn run<H: DebugHook + ?Sized>(&mut self, hook: &mut H) -> Result<ExitStatus, RuntimeError> {
        loop {
            let Some((current, callers)) = self.frames.split_last() else {
                return Ok(ExitStatus::Completed);
            };
            let method = self.program.method(current.method).ok_or_else(|| {
                RuntimeError::UnknownMethod(format!("{:?}", current.method))
            })?;
            let Some(instr) = method.code.get(current.ip) else {
                // falling off the end of a method is an implicit return
                self.frames.pop();
                continue;
            };

            let (line, file) = match self.program.class(current.method.class) {
                Some(klass) if klass.is_debug => (instr.line, klass.file_name.as_str()),
                _ => (-1, ""),
            };
            trace!(
                target: "svdb::exec",
                line,
                ip = current.ip,
                depth = callers.len(),
                op = ?instr.op
            );
            let state = ExecState {
                program: &self.program,
                heap: &self.heap,
                frame: current,
                call_stack: callers,
                line,
                file,
            };
            if hook.on_instruction(&state)? == Resume::Halt {
                return Ok(ExitStatus::Halted);
            }

            let op = instr.op.clone();
            if let Some(frame) = self.frames.last_mut() {
                frame.ip += 1;
            }
            self.apply(&op)?;
        }
    }

    fn apply(&mut self, op: &Op) -> Result<(), RuntimeError> {
        match op {
            Op::Nop => {}
            Op::Store { slot, value } => {
                let word = self.operand(value)?;
                self.store_local(*slot, word)?;
            }
            Op::NewArray { slot, kind, dims } => {
                let ptr = self.heap.alloc_array(*kind, dims);
                self.store_local(*slot, ptr)?;
            }
            Op::StoreElement { slot, index, value } => {
                let ptr = self.load_local(*slot)?;
                let word = self.operand(value)?;
                let indices: Vec<i64> = index.iter().map(|&i| i as i64).collect();
                self.heap
                    .store_element(ptr, &indices, word)
                    .ok_or(RuntimeError::InvalidElement)?;
            }
            Op::NewObject { slot, class } => {
                let ptr = self.new_object(class)?;
                self.store_local(*slot, ptr)?;
            }
            Op::NewString { slot, value } => {
                let ptr = self.new_string(value)?;
                self.store_local(*slot, ptr)?;
            }
            Op::StoreField {
                object,
                field,
                value,
            } => {
                let target = self.operand(object)?;
                let word = self.operand(value)?;
                let class = self
                    .heap
                    .class_of(target)
                    .ok_or(RuntimeError::NilDereference)?;
                let slot = self
                    .program
                    .class(class)
                    .and_then(|klass| klass.instance_declaration(field))
                    .map(|dclr| dclr.slot)
                    .ok_or_else(|| RuntimeError::UnknownField(field.clone()))?;
                self.write(target, 1 + slot, word)?;
            }
            Op::StoreStatic {
                class,
                field,
                value,
            } => {
                let word = self.operand(value)?;
                let (id, slot) = {
                    let klass = self
                        .program
                        .class_by_name(class)
                        .ok_or_else(|| RuntimeError::UnknownClass(class.clone()))?;
                    let dclr = klass
                        .class_declaration(field)
                        .ok_or_else(|| RuntimeError::UnknownField(field.clone()))?;
                    (klass.id, dclr.slot)
                };
                let target = self
                    .heap
                    .class_memory(id)
                    .ok_or_else(|| RuntimeError::UnknownClass(class.clone()))?;
                self.write(target, slot, word)?;
            }
            Op::StoreFunction { slot, method } => {
                let id = self
                    .program
                    .find_method(method)
                    .ok_or_else(|| RuntimeError::UnknownMethod(method.clone()))?;
                self.store_local(*slot, id.class as Word)?;
                self.store_local(*slot + 1, id.index as Word)?;
            }
            Op::Free { slot } => {
                let ptr = self.load_local(*slot)?;
                self.heap.free(ptr);
                self.store_local(*slot, NIL)?;
            }
            Op::Call {
                method,
                receiver,
                args,
            } => self.call(method, receiver.as_ref(), args)?,
            Op::Return => {
                self.frames.pop();
            }
        }
        Ok(())
    }

    fn call(
        &mut self,
        name: &str,
        receiver: Option<&Operand>,
        args: &[Operand],
    ) -> Result<(), RuntimeError> {
        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(RuntimeError::StackOverflow);
        }
        let id = self
            .program
            .find_method(name)
            .ok_or_else(|| RuntimeError::UnknownMethod(name.to_string()))?;
        let receiver = match receiver {
            Some(operand) => self.operand(operand)?,
            None => NIL,
        };
        let words = args
            .iter()
            .map(|arg| self.operand(arg))
            .collect::<Result<Vec<_>, _>>()?;

        let method = self
            .program
            .method(id)
            .ok_or_else(|| RuntimeError::UnknownMethod(name.to_string()))?;
        let mut frame = Frame::new(method, receiver);
        let offset = method.local_offset();
        for (i, word) in words.into_iter().enumerate() {
            let cell = frame
                .mem
                .get_mut(offset + i)
                .ok_or(RuntimeError::InvalidSlot(i))?;
            *cell = word;
        }
        trace!(target: "svdb::exec", method = name, depth = self.frames.len(), "call");
        self.frames.push(frame);
        Ok(())
    }

    fn operand(&self, value: &Operand) -> Result<Word, RuntimeError> {
        let word = match value {
            Operand::Nil => NIL,
            Operand::Int(v) => *v as Word,
            Operand::Float(v) => v.to_bits(),
            Operand::Char(c) => *c as Word,
            Operand::Bool(b) => Word::from(*b),
            Operand::Local(slot) => self.load_local(*slot)?,
            Operand::SelfRef => self.frames.last().map(Frame::receiver).unwrap_or(NIL),
        };
        Ok(word)
    }

    fn local_index(&self, frame: &Frame, slot: usize) -> usize {
        let offset = self
            .program
            .method(frame.method)
            .map(|method| method.local_offset())
            .unwrap_or(1);
        offset + slot
    }

    fn load_local(&self, slot: usize) -> Result<Word, RuntimeError> {
        let frame = self.frames.last().ok_or(RuntimeError::InvalidSlot(slot))?;
        frame
            .mem
            .get(self.local_index(frame, slot))
            .copied()
            .ok_or(RuntimeError::InvalidSlot(slot))
    }

    fn store_local(&mut self, slot: usize, word: Word) -> Result<(), RuntimeError> {
        let frame = self.frames.last().ok_or(RuntimeError::InvalidSlot(slot))?;
        let index = self.local_index(frame, slot);
        let cell = self
            .frames
            .last_mut()
            .and_then(|frame| frame.mem.get_mut(index))
            .ok_or(RuntimeError::InvalidSlot(slot))?;
        *cell = word;
        Ok(())
    }

    fn write(&mut self, ptr: Word, index: usize, word: Word) -> Result<(), RuntimeError> {
        let cell = self
            .heap
            .block_mut(ptr)
            .and_then(|words| words.get_mut(index))
            .ok_or(RuntimeError::NilDereference)?;
        *cell = word;
        Ok(())
    }

    fn new_object(&mut self, class: &str) -> Result<Word, RuntimeError> {
        let (id, size) = self
            .program
            .class_by_name(class)
            .map(|klass| (klass.id, klass.instance_size()))
            .ok_or_else(|| RuntimeError::UnknownClass(class.to_string()))?;
        Ok(self.heap.alloc_object(id, size))
    }

    fn new_string(&mut self, value: &str) -> Result<Word, RuntimeError> {
        let chars: Vec<char> = value.chars().collect();
        let array = self.heap.alloc_array(ElementKind::Char, &[chars.len()]);
        for (i, ch) in chars.iter().enumerate() {
            self.heap
                .store_element(array, &[i as i64], *ch as Word)
                .ok_or(RuntimeError::InvalidElement)?;
        }
        let slot = self
            .program
            .class_by_name(STRING_CLASS)
            .and_then(|klass| klass.instance_declaration("string"))
            .map(|dclr| dclr.slot)
            .unwrap_or(0);
        let object = self.new_object(STRING_CLASS)?;
        self.write(object, 1 + slot, array)?;
        Ok(object)
    }

    fn alloc_args(&mut self, args: &[String]) -> Result<Word, RuntimeError> {
        let array = self.heap.alloc_array(ElementKind::Object, &[args.len()]);
        for (i, arg) in args.iter().enumerate() {
            let string = self.new_string(arg)?;
            self.heap
                .store_element(array, &[i as i64], string)
                .ok_or(RuntimeError::InvalidElement)?;
        }
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::ImageLoader;

    /// Records `(line, depth)` for every line-mapped instruction.
    #[derive(Default)]
    struct Recorder {
        seen: Vec<(i32, usize)>,
        halt_at: Option<i32>,
    }

    impl DebugHook for Recorder {
        fn on_instruction(&mut self, state: &ExecState<'_>) -> io::Result<Resume> {
            if state.line > 0 {
                self.seen.push((state.line, state.call_stack_pos()));
            }
            if self.halt_at == Some(state.line) {
                return Ok(Resume::Halt);
            }
            Ok(Resume::Continue)
        }
    }

    const IMAGE: &str = r#"{
        "entry": "Main:main",
        "classes": [{
            "name": "Main",
            "file": "main.obs",
            "methods": [
                {"name": "main", "locals": [{"name": "a", "kind": "int", "slot": 0}],
                 "code": [
                    {"line": 2, "op": "store", "slot": 0, "value": {"int": 1}},
                    {"line": 3, "op": "call", "method": "Main:helper", "args": [{"local": 0}]},
                    {"line": 4, "op": "return"}
                 ]},
                {"name": "helper", "locals": [{"name": "x", "kind": "int", "slot": 0}],
                 "code": [
                    {"line": 8, "op": "nop"},
                    {"op": "nop"},
                    {"line": 9, "op": "return"}
                 ]}
            ]
        }]
    }"#;

    #[test]
    fn reports_each_mapped_instruction_with_depth() {
        let program = ImageLoader.parse(IMAGE).unwrap();
        let mut vm = Interpreter::new(program);
        let mut hook = Recorder::default();
        let status = vm.execute(&[], &mut hook).unwrap();

        assert_eq!(status, ExitStatus::Completed);
        assert_eq!(hook.seen, vec![(2, 0), (3, 0), (8, 1), (9, 1), (4, 0)]);
    }

    #[test]
    fn halting_hook_stops_execution() {
        let program = ImageLoader.parse(IMAGE).unwrap();
        let mut vm = Interpreter::new(program);
        let mut hook = Recorder {
            halt_at: Some(8),
            ..Recorder::default()
        };
        let status = vm.execute(&[], &mut hook).unwrap();

        assert_eq!(status, ExitStatus::Halted);
        assert_eq!(hook.seen.last(), Some(&(8, 1)));
    }
}
