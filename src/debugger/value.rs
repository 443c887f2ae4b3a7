use crate::debugger::remote::ObjectRef;
use std::fmt::{Display, Formatter};
use strum_macros::{Display as StrumDisplay, EnumIter};

/// Kind of value or type, used as an index into promotion tables.
///
/// Discriminants are table indexes, do not reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, StrumDisplay)]
#[strum(serialize_all = "lowercase")]
pub enum TypeKind {
    Undefined = 0,
    Object = 1,
    Char = 2,
    Byte = 3,
    Short = 4,
    Boolean = 5,
    Void = 6,
    Long = 7,
    Double = 8,
    Float = 9,
    Int = 10,
    String = 11,
    Null = 12,
}

impl TypeKind {
    /// Return kind of primitive type by its source name (`int`, `boolean`, etc.).
    pub fn from_primitive_name(name: &str) -> Option<TypeKind> {
        let kind = match name {
            "boolean" => TypeKind::Boolean,
            "byte" => TypeKind::Byte,
            "short" => TypeKind::Short,
            "char" => TypeKind::Char,
            "int" => TypeKind::Int,
            "long" => TypeKind::Long,
            "float" => TypeKind::Float,
            "double" => TypeKind::Double,
            "void" => TypeKind::Void,
            _ => return None,
        };
        Some(kind)
    }

    /// True for kinds that take part in numeric promotion.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            TypeKind::Char
                | TypeKind::Byte
                | TypeKind::Short
                | TypeKind::Int
                | TypeKind::Long
                | TypeKind::Float
                | TypeKind::Double
        )
    }

    /// True for integral kinds after unary promotion (`int` and `long`).
    pub fn is_integral(self) -> bool {
        matches!(self, TypeKind::Int | TypeKind::Long)
    }

    /// True for kinds whose values are handles into the target.
    pub fn is_reference(self) -> bool {
        matches!(self, TypeKind::Object | TypeKind::String | TypeKind::Null)
    }
}

const U: TypeKind = TypeKind::Undefined;
const B: TypeKind = TypeKind::Boolean;
const I: TypeKind = TypeKind::Int;
const J: TypeKind = TypeKind::Long;
const F: TypeKind = TypeKind::Float;
const D: TypeKind = TypeKind::Double;
const S: TypeKind = TypeKind::String;

/// Binary promotion table, indexed by `[left][right]`.
#[rustfmt::skip]
static PROMOTION_TABLE: [[TypeKind; 13]; 13] = [
    /*              undef obj char byte short bool void long double float int string null */
    /* undefined */ [U, U, U, U, U, U, U, U, U, U, U, U, U],
    /* object    */ [U, U, U, U, U, U, U, U, U, U, U, S, U],
    /* char      */ [U, U, I, I, I, U, U, J, D, F, I, S, U],
    /* byte      */ [U, U, I, I, I, U, U, J, D, F, I, S, U],
    /* short     */ [U, U, I, I, I, U, U, J, D, F, I, S, U],
    /* boolean   */ [U, U, U, U, U, B, U, U, U, U, U, S, U],
    /* void      */ [U, U, U, U, U, U, U, U, U, U, U, U, U],
    /* long      */ [U, U, J, J, J, U, U, J, D, F, J, S, U],
    /* double    */ [U, U, D, D, D, U, U, D, D, D, D, S, U],
    /* float     */ [U, U, F, F, F, U, U, F, D, F, F, S, U],
    /* int       */ [U, U, I, I, I, U, U, J, D, F, I, S, U],
    /* string    */ [U, S, S, S, S, S, U, S, S, S, S, S, S],
    /* null      */ [U, U, U, U, U, U, U, U, U, U, U, S, U],
];

/// Return a result kind of binary operation over `left` and `right` operands.
/// [`TypeKind::Undefined`] means that the combination is illegal, callers must check it.
pub fn promote(left: TypeKind, right: TypeKind) -> TypeKind {
    PROMOTION_TABLE[left as usize][right as usize]
}

/// Return a result kind of unary numeric operation (like unary minus) over an operand.
pub fn unary_promote(kind: TypeKind) -> TypeKind {
    promote(kind, TypeKind::Int)
}

/// Value of a target process.
///
/// Primitive values are copied into the controlling process,
/// strings and objects are opaque handles into the target and never dereferenced locally.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    StringRef(ObjectRef),
    ObjectRef(ObjectRef),
    Null,
    Void,
}

impl Value {
    pub fn kind(&self) -> TypeKind {
        match self {
            Value::Boolean(_) => TypeKind::Boolean,
            Value::Byte(_) => TypeKind::Byte,
            Value::Short(_) => TypeKind::Short,
            Value::Char(_) => TypeKind::Char,
            Value::Int(_) => TypeKind::Int,
            Value::Long(_) => TypeKind::Long,
            Value::Float(_) => TypeKind::Float,
            Value::Double(_) => TypeKind::Double,
            Value::StringRef(_) => TypeKind::String,
            Value::ObjectRef(_) => TypeKind::Object,
            Value::Null => TypeKind::Null,
            Value::Void => TypeKind::Void,
        }
    }

    /// Return a default (zero) value for a kind, `null` for reference kinds.
    pub fn default_for(kind: TypeKind) -> Option<Value> {
        let value = match kind {
            TypeKind::Boolean => Value::Boolean(false),
            TypeKind::Byte => Value::Byte(0),
            TypeKind::Short => Value::Short(0),
            TypeKind::Char => Value::Char(0),
            TypeKind::Int => Value::Int(0),
            TypeKind::Long => Value::Long(0),
            TypeKind::Float => Value::Float(0.0),
            TypeKind::Double => Value::Double(0.0),
            TypeKind::Object | TypeKind::String | TypeKind::Null => Value::Null,
            TypeKind::Void | TypeKind::Undefined => return None,
        };
        Some(value)
    }

    /// Return a handle of string or object value.
    pub fn as_object(&self) -> Option<ObjectRef> {
        match self {
            Value::StringRef(obj) | Value::ObjectRef(obj) => Some(*obj),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        self.kind().is_numeric() || matches!(self, Value::Boolean(_))
    }

    /// Convert primitive value into another primitive kind using the target language rules
    /// (widening or narrowing primitive conversion).
    ///
    /// Return `None` if conversion is not allowed (boolean to numeric, references, etc.).
    pub fn convert(self, kind: TypeKind) -> Option<Value> {
        if self.kind() == kind && self.is_primitive() {
            return Some(self);
        }

        match self {
            Value::Byte(v) => cast_integral(v as i64, kind),
            Value::Short(v) => cast_integral(v as i64, kind),
            Value::Char(v) => cast_integral(v as i64, kind),
            Value::Int(v) => cast_integral(v as i64, kind),
            Value::Long(v) => cast_integral(v, kind),
            Value::Float(v) => cast_floating(v as f64, kind),
            Value::Double(v) => cast_floating(v, kind),
            _ => None,
        }
    }

    /// Return textual representation of a primitive value, as the target language prints it.
    pub fn primitive_text(&self) -> Option<String> {
        let text = match self {
            Value::Boolean(b) => b.to_string(),
            Value::Byte(v) => v.to_string(),
            Value::Short(v) => v.to_string(),
            Value::Int(v) => v.to_string(),
            Value::Long(v) => v.to_string(),
            Value::Char(c) => char::from_u32(*c as u32)
                .unwrap_or(char::REPLACEMENT_CHARACTER)
                .to_string(),
            Value::Float(v) => floating_text(*v as f64, v.to_string(), format!("{v:e}")),
            Value::Double(v) => floating_text(*v, v.to_string(), format!("{v:e}")),
            _ => return None,
        };
        Some(text)
    }
}

fn cast_integral(v: i64, kind: TypeKind) -> Option<Value> {
    let value = match kind {
        TypeKind::Byte => Value::Byte(v as i8),
        TypeKind::Short => Value::Short(v as i16),
        TypeKind::Char => Value::Char(v as u16),
        TypeKind::Int => Value::Int(v as i32),
        TypeKind::Long => Value::Long(v),
        TypeKind::Float => Value::Float(v as f32),
        TypeKind::Double => Value::Double(v as f64),
        _ => return None,
    };
    Some(value)
}

fn cast_floating(v: f64, kind: TypeKind) -> Option<Value> {
    // narrowing to sub-int kinds goes through `int` first, `as` saturates and maps NaN to zero
    let value = match kind {
        TypeKind::Byte => Value::Byte(v as i32 as i8),
        TypeKind::Short => Value::Short(v as i32 as i16),
        TypeKind::Char => Value::Char(v as i32 as u16),
        TypeKind::Int => Value::Int(v as i32),
        TypeKind::Long => Value::Long(v as i64),
        TypeKind::Float => Value::Float(v as f32),
        TypeKind::Double => Value::Double(v),
        _ => return None,
    };
    Some(value)
}

/// Format a floating value the way the target does: plain decimal in `[1e-3, 1e7)`,
/// scientific notation (`1.5E10`) outside, always with a fraction digit.
/// `display` and `exp` are the shortest representations of the value in both notations.
fn floating_text(v: f64, display: String, exp: String) -> String {
    if v.is_nan() {
        return "NaN".to_string();
    }
    if v.is_infinite() {
        let text = if v > 0.0 { "Infinity" } else { "-Infinity" };
        return text.to_string();
    }

    let abs = v.abs();
    if abs == 0.0 || (1e-3..1e7).contains(&abs) {
        if v.fract() == 0.0 {
            return format!("{v:.1}");
        }
        return display;
    }

    match exp.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{mantissa}E{exponent}"),
        Some((mantissa, exponent)) => format!("{mantissa}.0E{exponent}"),
        None => display,
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::StringRef(obj) => write!(f, "string({obj})"),
            Value::ObjectRef(obj) => write!(f, "object({obj})"),
            Value::Null => f.write_str("null"),
            Value::Void => f.write_str("void"),
            primitive => {
                let text = primitive.primitive_text().unwrap_or_default();
                f.write_str(&text)
            }
        }
    }
}
