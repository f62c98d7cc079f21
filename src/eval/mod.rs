//! Decoding paused VM memory into typed values.

mod error;
mod expression;
mod reference;
mod value;

pub use error::EvalError;
pub use expression::{calculate, ExpressionEvaluator};
pub use reference::{EvalScope, MemoryContext, ReferenceEvaluator};
pub use value::Value;
