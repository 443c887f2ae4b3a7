//! Operator semantics over local values.
//!
//! Operands are promoted with the promotion tables first, then the operation
//! is applied to values of a promoted kind. Integral arithmetic wraps on overflow,
//! as the target language does. String concatenation needs the target and is done
//! by the interpreter.

use crate::debugger::error::Error;
use crate::debugger::eval::instruction::{BinaryOp, UnaryOp};
use crate::debugger::value::{promote, unary_promote, TypeKind, Value};

/// Apply binary operator to a pair of values.
pub fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, Error> {
    let (lk, rk) = (left.kind(), right.kind());
    let illegal = || Error::IllegalPromotion {
        op,
        left: lk,
        right: rk,
    };

    if matches!(op, BinaryOp::Equal | BinaryOp::NotEqual)
        && lk.is_reference()
        && rk.is_reference()
    {
        let same = left.as_object() == right.as_object();
        return Ok(Value::Boolean(same == (op == BinaryOp::Equal)));
    }

    if op.is_shift() {
        return shift(op, left, right).ok_or_else(illegal);
    }

    let kind = promote(lk, rk);
    let result = match kind {
        TypeKind::Boolean => boolean(op, left, right),
        TypeKind::Int => {
            let (l, r) = (int(left, kind)?, int(right, kind)?);
            integral_i32(op, l, r)?
        }
        TypeKind::Long => {
            let (l, r) = (long(left, kind)?, long(right, kind)?);
            integral_i64(op, l, r)?
        }
        TypeKind::Float => {
            let (l, r) = (float(left, kind)?, float(right, kind)?);
            floating(op, l as f64, r as f64).map(|v| match v {
                Value::Double(d) => Value::Float(d as f32),
                other => other,
            })
        }
        TypeKind::Double => {
            let (l, r) = (double(left, kind)?, double(right, kind)?);
            floating(op, l, r)
        }
        _ => None,
    };

    result.ok_or_else(illegal)
}

/// Apply unary operator to a value.
pub fn unary(op: UnaryOp, operand: Value) -> Result<Value, Error> {
    let kind = operand.kind();
    let illegal = || Error::IllegalUnaryOperand { op, kind };

    if op == UnaryOp::Not {
        return match operand {
            Value::Boolean(b) => Ok(Value::Boolean(!b)),
            _ => Err(illegal()),
        };
    }

    let promoted = unary_promote(kind);
    let value = operand.convert(promoted).ok_or_else(illegal)?;
    let result = match (op, value) {
        (UnaryOp::Plus, v) => v,
        (UnaryOp::Minus, Value::Int(v)) => Value::Int(v.wrapping_neg()),
        (UnaryOp::Minus, Value::Long(v)) => Value::Long(v.wrapping_neg()),
        (UnaryOp::Minus, Value::Float(v)) => Value::Float(-v),
        (UnaryOp::Minus, Value::Double(v)) => Value::Double(-v),
        (UnaryOp::Twiddle, Value::Int(v)) => Value::Int(!v),
        (UnaryOp::Twiddle, Value::Long(v)) => Value::Long(!v),
        _ => return Err(illegal()),
    };
    Ok(result)
}

/// Return a value of a boolean condition.
pub fn truth(value: Value) -> Result<bool, Error> {
    match value {
        Value::Boolean(b) => Ok(b),
        _ => Err(Error::InvalidOperand("condition must be a boolean")),
    }
}

/// Return an integral value as `i32` (array index or length).
pub fn index(value: Value) -> Result<i32, Error> {
    match unary_promote(value.kind()) {
        TypeKind::Int => int(value, TypeKind::Int),
        _ => Err(Error::InvalidOperand("index must be an integral value")),
    }
}

macro_rules! extract {
    ($name: ident, $ty: ty, $variant: ident) => {
        fn $name(value: Value, kind: TypeKind) -> Result<$ty, Error> {
            match value.convert(kind) {
                Some(Value::$variant(v)) => Ok(v),
                _ => Err(Error::InvalidOperand(concat!(
                    "expect value convertible to ",
                    stringify!($ty)
                ))),
            }
        }
    };
}

extract!(int, i32, Int);
extract!(long, i64, Long);
extract!(float, f32, Float);
extract!(double, f64, Double);

fn boolean(op: BinaryOp, left: Value, right: Value) -> Option<Value> {
    let (Value::Boolean(l), Value::Boolean(r)) = (left, right) else {
        return None;
    };
    let result = match op {
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
        BinaryOp::Xor => l ^ r,
        BinaryOp::Equal => l == r,
        BinaryOp::NotEqual => l != r,
        _ => return None,
    };
    Some(Value::Boolean(result))
}

macro_rules! integral {
    ($name: ident, $ty: ty, $variant: ident) => {
        fn $name(op: BinaryOp, l: $ty, r: $ty) -> Result<Option<Value>, Error> {
            let value = match op {
                BinaryOp::Add => Value::$variant(l.wrapping_add(r)),
                BinaryOp::Sub => Value::$variant(l.wrapping_sub(r)),
                BinaryOp::Mul => Value::$variant(l.wrapping_mul(r)),
                BinaryOp::Div | BinaryOp::Rem if r == 0 => return Err(Error::DivisionByZero),
                BinaryOp::Div => Value::$variant(l.wrapping_div(r)),
                BinaryOp::Rem => Value::$variant(l.wrapping_rem(r)),
                BinaryOp::And => Value::$variant(l & r),
                BinaryOp::Or => Value::$variant(l | r),
                BinaryOp::Xor => Value::$variant(l ^ r),
                BinaryOp::Less => Value::Boolean(l < r),
                BinaryOp::LessEq => Value::Boolean(l <= r),
                BinaryOp::Greater => Value::Boolean(l > r),
                BinaryOp::GreaterEq => Value::Boolean(l >= r),
                BinaryOp::Equal => Value::Boolean(l == r),
                BinaryOp::NotEqual => Value::Boolean(l != r),
                BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr => return Ok(None),
            };
            Ok(Some(value))
        }
    };
}

integral!(integral_i32, i32, Int);
integral!(integral_i64, i64, Long);

/// Float operations are computed in double precision, caller narrows the result back.
fn floating(op: BinaryOp, l: f64, r: f64) -> Option<Value> {
    let value = match op {
        BinaryOp::Add => Value::Double(l + r),
        BinaryOp::Sub => Value::Double(l - r),
        BinaryOp::Mul => Value::Double(l * r),
        BinaryOp::Div => Value::Double(l / r),
        BinaryOp::Rem => Value::Double(l % r),
        BinaryOp::Less => Value::Boolean(l < r),
        BinaryOp::LessEq => Value::Boolean(l <= r),
        BinaryOp::Greater => Value::Boolean(l > r),
        BinaryOp::GreaterEq => Value::Boolean(l >= r),
        BinaryOp::Equal => Value::Boolean(l == r),
        BinaryOp::NotEqual => Value::Boolean(l != r),
        _ => return None,
    };
    Some(value)
}

/// Shift operands are promoted separately, result has a kind of left operand.
fn shift(op: BinaryOp, left: Value, right: Value) -> Option<Value> {
    let distance = match right.convert(unary_promote(right.kind()))? {
        Value::Int(v) => v as i64,
        Value::Long(v) => v,
        _ => return None,
    };

    let value = match left.convert(unary_promote(left.kind()))? {
        Value::Int(l) => {
            let s = (distance & 0x1f) as u32;
            Value::Int(match op {
                BinaryOp::Shl => l.wrapping_shl(s),
                BinaryOp::Shr => l >> s,
                _ => ((l as u32) >> s) as i32,
            })
        }
        Value::Long(l) => {
            let s = (distance & 0x3f) as u32;
            Value::Long(match op {
                BinaryOp::Shl => l.wrapping_shl(s),
                BinaryOp::Shr => l >> s,
                _ => ((l as u64) >> s) as i64,
            })
        }
        _ => return None,
    };
    Some(value)
}
