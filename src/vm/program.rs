//! Program metadata produced by the loader: classes, methods and the
//! variable declarations the debugger resolves names against.
//!
//! Everything here is immutable for the lifetime of a run.

use super::instr::Instr;
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

/// Index of a class within its [`Program`].
pub type ClassId = usize;

/// Name of the builtin string class every program carries.
pub const STRING_CLASS: &str = "System.String";

/// Identity of a method: owning class plus its position in that class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId {
    pub class: ClassId,
    pub index: usize,
}

/// Element type of an array declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Byte,
    Char,
    Int,
    Float,
    Object,
}

impl ElementKind {
    pub fn type_name(self) -> &'static str {
        match self {
            ElementKind::Byte => "Byte",
            ElementKind::Char => "Char",
            ElementKind::Int => "Int",
            ElementKind::Float => "Float",
            ElementKind::Object => "Object",
        }
    }
}

/// Storage kind of a declared variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Char,
    Int,
    Float,
    Object,
    /// Two words: class id, then method index.
    Function,
    Array(ElementKind),
}

impl DeclKind {
    /// Words the declaration occupies in its memory block.
    pub fn width(self) -> usize {
        match self {
            DeclKind::Function => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclKind::Char => f.write_str("Char"),
            DeclKind::Int => f.write_str("Int"),
            DeclKind::Float => f.write_str("Float"),
            DeclKind::Object => f.write_str("Object"),
            DeclKind::Function => f.write_str("Function"),
            DeclKind::Array(element) => write!(f, "{}[]", element.type_name()),
        }
    }
}

impl FromStr for DeclKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "char" => DeclKind::Char,
            "int" => DeclKind::Int,
            "float" => DeclKind::Float,
            "object" => DeclKind::Object,
            "function" => DeclKind::Function,
            "byte[]" => DeclKind::Array(ElementKind::Byte),
            "char[]" => DeclKind::Array(ElementKind::Char),
            "int[]" => DeclKind::Array(ElementKind::Int),
            "float[]" => DeclKind::Array(ElementKind::Float),
            "object[]" => DeclKind::Array(ElementKind::Object),
            _ => return Err(s.to_string()),
        };
        Ok(kind)
    }
}

/// A declared variable: qualified name, kind, and word slot in its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackDclr {
    pub name: String,
    pub kind: DeclKind,
    pub slot: usize,
}

impl StackDclr {
    pub fn new(name: impl Into<String>, kind: DeclKind, slot: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            slot,
        }
    }

    /// The variable name without its `Class:method:` qualification.
    pub fn short_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn matches(&self, name: &str) -> bool {
        self.name == name || self.short_name() == name
    }
}

fn find_declaration<'a>(declarations: &'a [StackDclr], name: &str) -> Option<&'a StackDclr> {
    declarations.iter().find(|dclr| dclr.matches(name))
}

/// Words needed to hold every declaration in a block.
fn extent(declarations: &[StackDclr]) -> usize {
    declarations
        .iter()
        .map(|dclr| dclr.slot + dclr.kind.width())
        .max()
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct StackMethod {
    pub id: MethodId,
    pub name: String,
    pub params: String,
    pub declarations: Vec<StackDclr>,
    /// Compiler reserved a short-circuit temporary ahead of the locals.
    pub has_and_or: bool,
    pub code: Vec<Instr>,
}

impl StackMethod {
    pub fn local_declaration(&self, name: &str) -> Option<&StackDclr> {
        find_declaration(&self.declarations, name)
    }

    /// Word index of local slot 0 within the frame.
    pub fn local_offset(&self) -> usize {
        1 + usize::from(self.has_and_or)
    }

    pub fn frame_size(&self) -> usize {
        self.local_offset() + extent(&self.declarations)
    }

    pub fn display_name(&self) -> String {
        format!("{}({})", self.name, self.params)
    }

    pub fn line_at(&self, ip: usize) -> Option<i32> {
        self.code.get(ip).map(|instr| instr.line)
    }
}

#[derive(Debug, Clone)]
pub struct StackClass {
    pub id: ClassId,
    pub name: String,
    pub file_name: String,
    pub is_debug: bool,
    pub instance_declarations: Vec<StackDclr>,
    pub class_declarations: Vec<StackDclr>,
    pub methods: Vec<StackMethod>,
}

impl StackClass {
    pub fn instance_declaration(&self, name: &str) -> Option<&StackDclr> {
        find_declaration(&self.instance_declarations, name)
    }

    pub fn class_declaration(&self, name: &str) -> Option<&StackDclr> {
        find_declaration(&self.class_declarations, name)
    }

    /// Field words of an instance, not counting the class tag.
    pub fn instance_size(&self) -> usize {
        extent(&self.instance_declarations)
    }

    pub fn class_size(&self) -> usize {
        extent(&self.class_declarations)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a StackMethod> {
        self.methods.iter().filter(move |method| method.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    classes: Vec<StackClass>,
    entry: MethodId,
}

impl Program {
    pub fn new(classes: Vec<StackClass>, entry: MethodId) -> Self {
        Self { classes, entry }
    }

    pub fn entry(&self) -> MethodId {
        self.entry
    }

    pub fn classes(&self) -> &[StackClass] {
        &self.classes
    }

    pub fn class(&self, id: ClassId) -> Option<&StackClass> {
        self.classes.get(id)
    }

    pub fn class_by_name(&self, name: &str) -> Option<&StackClass> {
        self.classes.iter().find(|klass| klass.name == name)
    }

    pub fn method(&self, id: MethodId) -> Option<&StackMethod> {
        self.class(id.class)?.methods.get(id.index)
    }

    /// Resolves `Class:method` to the first method with that name.
    pub fn find_method(&self, qualified: &str) -> Option<MethodId> {
        let (class_name, method_name) = qualified.split_once(':')?;
        let klass = self.class_by_name(class_name)?;
        klass.methods_named(method_name).next().map(|method| method.id)
    }

    /// Owning class and method of a method id, for messages.
    pub fn method_label(&self, id: MethodId) -> String {
        match (self.class(id.class), self.method(id)) {
            (Some(klass), Some(method)) => format!("{}->{}(..)", klass.name, method.name),
            _ => String::from("<unknown>"),
        }
    }
}
