//! Resolves variable paths against frame, instance and class memory.
//!
//! A top-level reference is looked up in the current method's locals, then
//! the owning class's instance and class declarations, then as a class name,
//! and finally as an implicit `@self->name`. Every further `->` link is
//! resolved in the instance or class memory reached by the previous link.

use super::error::EvalError;
use super::expression::ExpressionEvaluator;
use super::value::Value;
use crate::parser::{Expression, Reference};
use crate::vm::{
    DeclKind, ElementKind, ExecState, Frame, Heap, Program, StackClass, StackDclr, Word, NIL,
};
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryContext {
    Local,
    Instance,
    Class,
}

/// Paused program state an evaluation reads from.
#[derive(Clone, Copy)]
pub struct EvalScope<'a> {
    pub program: &'a Program,
    pub heap: &'a Heap,
    pub frame: &'a Frame,
}

impl<'a> EvalScope<'a> {
    pub fn new(program: &'a Program, heap: &'a Heap, frame: &'a Frame) -> Self {
        Self {
            program,
            heap,
            frame,
        }
    }
}

impl<'a> From<&ExecState<'a>> for EvalScope<'a> {
    fn from(state: &ExecState<'a>) -> Self {
        Self::new(state.program, state.heap, state.frame)
    }
}

/// Block the current link of a reference is read from.
#[derive(Clone, Copy)]
struct Base<'a> {
    words: &'a [Word],
    /// Word index of slot 0.
    offset: usize,
    addr: Word,
}

pub struct ReferenceEvaluator<'a> {
    scope: EvalScope<'a>,
    ref_mem: Option<Base<'a>>,
    ref_klass: Option<&'a StackClass>,
}

impl<'a> ReferenceEvaluator<'a> {
    pub fn new(scope: EvalScope<'a>) -> Self {
        Self {
            scope,
            ref_mem: None,
            ref_klass: None,
        }
    }

    pub fn evaluate(&mut self, reference: &Reference) -> Result<Value, EvalError> {
        let value = self.evaluate_in(reference, MemoryContext::Local)?;
        trace!(target: "svdb::eval", name = %reference.name, ?value);
        Ok(value)
    }

    /// Instance and class contexts resolve against the block entered by the
    /// previous link.
    pub fn evaluate_in(
        &mut self,
        reference: &Reference,
        context: MemoryContext,
    ) -> Result<Value, EvalError> {
        let klass = match context {
            MemoryContext::Local => return self.evaluate_local(reference),
            MemoryContext::Instance | MemoryContext::Class => {
                self.ref_klass.ok_or(EvalError::NilReference)?
            }
        };
        let base = self.ref_mem.ok_or(EvalError::NilReference)?;
        let dclr = match context {
            MemoryContext::Class => klass.class_declaration(&reference.name),
            _ => klass.instance_declaration(&reference.name),
        }
        .ok_or_else(|| EvalError::UnknownVariable(reference.name.clone()))?;
        self.decode(reference, dclr, base)
    }

    fn evaluate_local(&mut self, reference: &Reference) -> Result<Value, EvalError> {
        let EvalScope { program, frame, .. } = self.scope;
        if frame.mem.is_empty() {
            return Err(EvalError::EmptyFrame);
        }
        let method = program.method(frame.method).ok_or(EvalError::EmptyFrame)?;

        if reference.is_self {
            let this = StackDclr::new("@self", DeclKind::Object, 0);
            let base = Base {
                words: &frame.mem,
                offset: 0,
                addr: NIL,
            };
            return self.decode(reference, &this, base);
        }

        if let Some(dclr) = method.local_declaration(&reference.name) {
            let base = Base {
                words: &frame.mem,
                offset: method.local_offset(),
                addr: NIL,
            };
            return self.decode(reference, dclr, base);
        }

        let owner = program
            .class(frame.method.class)
            .ok_or(EvalError::EmptyFrame)?;
        if owner.instance_declaration(&reference.name).is_some() {
            self.enter_object(frame.receiver())?;
            return self.evaluate_in(reference, MemoryContext::Instance);
        }
        if owner.class_declaration(&reference.name).is_some() {
            self.enter_class(owner)?;
            return self.evaluate_in(reference, MemoryContext::Class);
        }

        if let Some(klass) = program.class_by_name(&reference.name) {
            return self.class_reference(klass, reference);
        }
        if let Some((class_name, field)) = reference.name.rsplit_once('.') {
            if let Some(klass) = program.class_by_name(class_name) {
                let link = Reference {
                    name: field.to_string(),
                    ..reference.clone()
                };
                return self.class_reference(klass, &Reference::new(class_name).with_next(link));
            }
        }

        // implicit @self->name
        if frame.receiver() == NIL {
            return Err(EvalError::UnknownVariable(reference.name.clone()));
        }
        self.enter_object(frame.receiver())?;
        self.evaluate_in(reference, MemoryContext::Instance)
    }

    fn class_reference(
        &mut self,
        klass: &'a StackClass,
        reference: &Reference,
    ) -> Result<Value, EvalError> {
        let addr = self.enter_class(klass)?;
        if reference.indices.is_some() {
            return Err(EvalError::ScalarReference(reference.name.clone()));
        }
        match &reference.next {
            Some(next) => self.evaluate_in(next, MemoryContext::Class),
            None => Ok(Value::Object {
                addr,
                class: Some(klass.id),
            }),
        }
    }

    fn enter_object(&mut self, addr: Word) -> Result<(), EvalError> {
        if addr == NIL {
            return Err(EvalError::NilReference);
        }
        let EvalScope { program, heap, .. } = self.scope;
        let words = heap.block(addr).ok_or(EvalError::InvalidPointer(addr))?;
        let klass = heap
            .class_of(addr)
            .and_then(|id| program.class(id))
            .ok_or(EvalError::InvalidPointer(addr))?;
        self.ref_mem = Some(Base {
            words,
            offset: 1,
            addr,
        });
        self.ref_klass = Some(klass);
        Ok(())
    }

    fn enter_class(&mut self, klass: &'a StackClass) -> Result<Word, EvalError> {
        let heap = self.scope.heap;
        let addr = heap
            .class_memory(klass.id)
            .ok_or(EvalError::InvalidPointer(NIL))?;
        let words = heap.block(addr).ok_or(EvalError::InvalidPointer(addr))?;
        self.ref_mem = Some(Base {
            words,
            offset: 0,
            addr,
        });
        self.ref_klass = Some(klass);
        Ok(addr)
    }

    fn decode(
        &mut self,
        reference: &Reference,
        dclr: &StackDclr,
        base: Base<'a>,
    ) -> Result<Value, EvalError> {
        let index = base.offset + dclr.slot;
        let word = |at: usize| {
            base.words
                .get(at)
                .copied()
                .ok_or(EvalError::InvalidPointer(base.addr))
        };

        match dclr.kind {
            DeclKind::Char => {
                ensure_scalar(reference)?;
                Ok(Value::Char(to_char(word(index)? as u32)))
            }
            DeclKind::Int => {
                ensure_scalar(reference)?;
                Ok(Value::Int(word(index)? as i64))
            }
            DeclKind::Float => {
                ensure_scalar(reference)?;
                Ok(Value::Float(f64::from_bits(word(index)?)))
            }
            DeclKind::Function => {
                ensure_scalar(reference)?;
                Ok(Value::Function {
                    class: word(index)? as usize,
                    method: word(index + 1)? as usize,
                })
            }
            DeclKind::Object => {
                if reference.indices.is_some() {
                    return Err(EvalError::ScalarReference(reference.name.clone()));
                }
                self.object_value(word(index)?, reference.next.as_deref())
            }
            DeclKind::Array(kind) => self.array_value(reference, kind, word(index)?),
        }
    }

    fn object_value(&mut self, addr: Word, next: Option<&Reference>) -> Result<Value, EvalError> {
        match next {
            Some(next) => {
                self.enter_object(addr)?;
                self.evaluate_in(next, MemoryContext::Instance)
            }
            None if addr == NIL => Ok(Value::Nil),
            None => Ok(Value::Object {
                addr,
                class: self.scope.heap.class_of(addr),
            }),
        }
    }

    fn array_value(
        &mut self,
        reference: &Reference,
        kind: ElementKind,
        addr: Word,
    ) -> Result<Value, EvalError> {
        if addr == NIL {
            return Err(EvalError::NilArray);
        }
        let view = self
            .scope
            .heap
            .array(addr)
            .ok_or(EvalError::InvalidPointer(addr))?;

        let Some(indices) = &reference.indices else {
            if reference.next.is_some() {
                return Err(EvalError::ScalarReference(reference.name.clone()));
            }
            return Ok(Value::Array {
                addr,
                kind,
                dimensions: view.dimensions(),
                size: view.len(),
            });
        };

        let values = indices
            .iter()
            .map(|expression| self.index_value(expression))
            .collect::<Result<Vec<_>, _>>()?;
        let index = view.linear_index(&values)?;

        let element = match kind {
            ElementKind::Byte => view.byte(index).map(|byte| Value::Int(i64::from(byte))),
            ElementKind::Char => view.char_code(index).map(|code| Value::Char(to_char(code))),
            ElementKind::Int => view.word(index).map(|word| Value::Int(word as i64)),
            ElementKind::Float => view.float(index).map(Value::Float),
            ElementKind::Object => {
                let ptr = view.word(index).ok_or(EvalError::IndexOutOfBounds)?;
                return self.object_value(ptr, reference.next.as_deref());
            }
        }
        .ok_or(EvalError::IndexOutOfBounds)?;

        if reference.next.is_some() {
            return Err(EvalError::ScalarReference(reference.name.clone()));
        }
        Ok(element)
    }

    /// Index expressions are evaluated afresh from the local context.
    fn index_value(&self, expression: &Expression) -> Result<i64, EvalError> {
        let value = ExpressionEvaluator::new(Some(self.scope)).evaluate(expression)?;
        if value.is_float() {
            return Err(EvalError::NonIntegerIndex);
        }
        Ok(value.as_int())
    }
}

fn ensure_scalar(reference: &Reference) -> Result<(), EvalError> {
    if reference.indices.is_some() || reference.next.is_some() {
        return Err(EvalError::ScalarReference(reference.name.clone()));
    }
    Ok(())
}

fn to_char(code: u32) -> char {
    char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER)
}
