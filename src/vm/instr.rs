//! Instruction set of the program image.

use super::program::ElementKind;
use serde::Deserialize;

/// One instruction with the source line it was compiled from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Instr {
    #[serde(default = "unmapped_line")]
    pub line: i32,
    #[serde(flatten)]
    pub op: Op,
}

fn unmapped_line() -> i32 {
    -1
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Nop,
    Store {
        slot: usize,
        value: Operand,
    },
    NewArray {
        slot: usize,
        kind: ElementKind,
        dims: Vec<usize>,
    },
    StoreElement {
        slot: usize,
        index: Vec<usize>,
        value: Operand,
    },
    NewObject {
        slot: usize,
        class: String,
    },
    NewString {
        slot: usize,
        value: String,
    },
    StoreField {
        object: Operand,
        field: String,
        value: Operand,
    },
    StoreStatic {
        class: String,
        field: String,
        value: Operand,
    },
    StoreFunction {
        slot: usize,
        method: String,
    },
    Free {
        slot: usize,
    },
    Call {
        method: String,
        #[serde(default)]
        receiver: Option<Operand>,
        #[serde(default)]
        args: Vec<Operand>,
    },
    Return,
}

/// Source of a word written by an instruction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    Nil,
    Int(i64),
    Float(f64),
    Char(char),
    Bool(bool),
    Local(usize),
    #[serde(rename = "self")]
    SelfRef,
}
