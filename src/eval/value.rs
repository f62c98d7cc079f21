use super::reference::EvalScope;
use crate::vm::{ClassId, ElementKind, Word, STRING_CLASS};

/// Result of evaluating a reference or expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Nil,
    Char(char),
    Int(i64),
    Float(f64),
    Bool(bool),
    Object {
        addr: Word,
        class: Option<ClassId>,
    },
    /// Unindexed array: base pointer plus header metadata.
    Array {
        addr: Word,
        kind: ElementKind,
        dimensions: usize,
        size: usize,
    },
    Function {
        class: ClassId,
        method: usize,
    },
}

impl Value {
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// Integer view used by arithmetic; pointers compare by address.
    pub fn as_int(&self) -> i64 {
        match *self {
            Value::Nil => 0,
            Value::Char(c) => i64::from(u32::from(c)),
            Value::Int(v) => v,
            Value::Float(v) => v as i64,
            Value::Bool(b) => i64::from(b),
            Value::Object { addr, .. } | Value::Array { addr, .. } => addr as i64,
            Value::Function { class, .. } => class as i64,
        }
    }

    pub fn as_float(&self) -> f64 {
        match *self {
            Value::Float(v) => v,
            other => other.as_int() as f64,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match *self {
            Value::Float(v) => v != 0.0,
            other => other.as_int() != 0,
        }
    }

    /// `type=..., value=...` rendering shown by `print`.
    pub fn describe(&self, scope: Option<&EvalScope<'_>>) -> String {
        match *self {
            Value::Nil => String::from("type=Nil, value=Nil"),
            Value::Char(c) => format!("type=Char, value={c}"),
            Value::Int(v) => format!("type=Int, value={v}"),
            Value::Float(v) => format!("type=Float, value={v}"),
            Value::Bool(b) => format!("type=Bool, value={b}"),
            Value::Array {
                addr,
                kind,
                dimensions,
                size,
            } => format!(
                "type={}[], value={addr:#x}, dimension={dimensions}, size={size}",
                kind.type_name()
            ),
            Value::Object { addr, class } => {
                let klass = scope
                    .zip(class)
                    .and_then(|(scope, id)| scope.program.class(id));
                match klass {
                    Some(klass) if klass.name == STRING_CLASS => {
                        match scope.and_then(|scope| string_text(scope, addr)) {
                            Some(text) => format!("type={STRING_CLASS}, value=\"{text}\""),
                            None => format!("type={STRING_CLASS}, value={addr:#x}"),
                        }
                    }
                    Some(klass) => format!("type={}, value={addr:#x}", klass.name),
                    None => format!("type=Object, value={addr:#x}"),
                }
            }
            Value::Function { class, method } => {
                let names = scope.and_then(|scope| {
                    let klass = scope.program.class(class)?;
                    let method = klass.methods.get(method)?;
                    Some((klass.name.as_str(), method.display_name()))
                });
                match names {
                    Some((class, method)) => {
                        format!("type=Function, class={class}, method={method}")
                    }
                    None => format!("type=Function, class={class}, method={method}"),
                }
            }
        }
    }
}

fn string_text(scope: &EvalScope<'_>, addr: Word) -> Option<String> {
    let klass = scope.program.class(scope.heap.class_of(addr)?)?;
    let slot = klass.instance_declaration("string")?.slot;
    let chars = *scope.heap.block(addr)?.get(1 + slot)?;
    Some(scope.heap.array(chars)?.text())
}
