/// A variable path: `name[idx, ...]->field->...` or `@self->field`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub is_self: bool,
    pub indices: Option<Vec<Expression>>,
    pub next: Option<Box<Reference>>,
}

impl Reference {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_self: false,
            indices: None,
            next: None,
        }
    }

    pub fn self_ref() -> Self {
        Self {
            is_self: true,
            ..Self::new("@self")
        }
    }

    pub fn with_indices(mut self, indices: Vec<Expression>) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_next(mut self, next: Reference) -> Self {
        self.next = Some(Box::new(next));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eql,
    Neql,
    Les,
    LesEql,
    Gtr,
    GtrEql,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    /// Comparison and logical operators yield truth values.
    pub fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Eql
                | BinaryOp::Neql
                | BinaryOp::Les
                | BinaryOp::LesEql
                | BinaryOp::Gtr
                | BinaryOp::GtrEql
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Nil,
    Bool(bool),
    Char(char),
    Int(i64),
    Float(f64),
    Reference(Reference),
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    pub fn binary(op: BinaryOp, left: Expression, right: Expression) -> Self {
        Expression::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Expression::Binary { op, .. } if op.is_boolean())
    }
}

/// `[file:]line` argument; missing parts default to the current stop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilePosition {
    pub file: Option<String>,
    pub line: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    LoadExecutable(String),
    SourceDirectory(String),
    Arguments(String),
    Quit,
    List(FilePosition),
    Break(FilePosition),
    Breaks,
    Delete(FilePosition),
    Print(Expression),
    Run,
    Clear,
    StepInto,
    NextLine,
    StepOut,
    Continue,
    Memory,
    Info {
        class: Option<String>,
        method: Option<String>,
    },
    Stack,
}
