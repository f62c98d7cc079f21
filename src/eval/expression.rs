use super::error::EvalError;
use super::reference::{EvalScope, ReferenceEvaluator};
use super::value::Value;
use crate::parser::{BinaryOp, Expression};

/// Evaluates `print` expressions bottom-up.
///
/// Without a scope only literal expressions can be evaluated; any variable
/// reference fails with [`EvalError::NotRunning`].
pub struct ExpressionEvaluator<'a> {
    scope: Option<EvalScope<'a>>,
}

impl<'a> ExpressionEvaluator<'a> {
    pub fn new(scope: Option<EvalScope<'a>>) -> Self {
        Self { scope }
    }

    pub fn evaluate(&self, expression: &Expression) -> Result<Value, EvalError> {
        match expression {
            Expression::Nil => Ok(Value::Nil),
            Expression::Bool(value) => Ok(Value::Bool(*value)),
            Expression::Char(value) => Ok(Value::Char(*value)),
            Expression::Int(value) => Ok(Value::Int(*value)),
            Expression::Float(value) => Ok(Value::Float(*value)),
            Expression::Reference(reference) => {
                let scope = self.scope.ok_or(EvalError::NotRunning)?;
                ReferenceEvaluator::new(scope).evaluate(reference)
            }
            Expression::Binary { op, left, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                calculate(*op, left, right)
            }
        }
    }
}

/// Applies `op` with numeric promotion: any float operand makes the whole
/// operation float, otherwise it is integer. Truth values come back as 0/1
/// in whichever numeric kind the operands used.
pub fn calculate(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    if op == BinaryOp::Mod {
        return modulus(left, right);
    }

    if left.is_float() || right.is_float() {
        let (l, r) = (left.as_float(), right.as_float());
        let truth = |b: bool| if b { 1.0 } else { 0.0 };
        let value = match op {
            BinaryOp::And => truth(l != 0.0 && r != 0.0),
            BinaryOp::Or => truth(l != 0.0 || r != 0.0),
            BinaryOp::Eql => truth(l == r),
            BinaryOp::Neql => truth(l != r),
            BinaryOp::Les => truth(l < r),
            BinaryOp::LesEql => truth(l <= r),
            BinaryOp::Gtr => truth(l > r),
            BinaryOp::GtrEql => truth(l >= r),
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
            BinaryOp::Mod => l % r,
        };
        return Ok(Value::Float(value));
    }

    let (l, r) = (left.as_int(), right.as_int());
    let value = match op {
        BinaryOp::And => i64::from(l != 0 && r != 0),
        BinaryOp::Or => i64::from(l != 0 || r != 0),
        BinaryOp::Eql => i64::from(l == r),
        BinaryOp::Neql => i64::from(l != r),
        BinaryOp::Les => i64::from(l < r),
        BinaryOp::LesEql => i64::from(l <= r),
        BinaryOp::Gtr => i64::from(l > r),
        BinaryOp::GtrEql => i64::from(l >= r),
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(EvalError::DivisionByZero);
            }
            l.wrapping_div(r)
        }
        BinaryOp::Mod => l.wrapping_rem(r),
    };
    Ok(Value::Int(value))
}

fn modulus(left: Value, right: Value) -> Result<Value, EvalError> {
    if left.is_float() || right.is_float() {
        return Err(EvalError::ModulusRequiresIntegers);
    }
    let (l, r) = (left.as_int(), right.as_int());
    if l == 0 || r == 0 {
        return Err(EvalError::ModulusRequiresIntegers);
    }
    Ok(Value::Int(l.wrapping_rem(r)))
}
