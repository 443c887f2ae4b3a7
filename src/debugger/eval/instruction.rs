use crate::debugger::value::Value;
use std::fmt::{Display, Formatter};
use std::ops::Index;

/// Binary operator of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    UShr,
    And,
    Or,
    Xor,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Equal,
    NotEqual,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::UShr => ">>>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        }
    }

    pub fn is_shift(self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr | BinaryOp::UShr)
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operator of an expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    Twiddle,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
            UnaryOp::Not => "!",
            UnaryOp::Twiddle => "~",
        };
        f.write_str(symbol)
    }
}

/// Literal constant of an expression.
///
/// Primitive literals turn into values locally, string literals are created in the target.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Boolean(bool),
    Byte(i8),
    Short(i16),
    Char(u16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Literal {
    /// Return a value of a primitive literal, `None` for string literals.
    pub fn primitive(&self) -> Option<Value> {
        let value = match self {
            Literal::Boolean(v) => Value::Boolean(*v),
            Literal::Byte(v) => Value::Byte(*v),
            Literal::Short(v) => Value::Short(*v),
            Literal::Char(v) => Value::Char(*v),
            Literal::Int(v) => Value::Int(*v),
            Literal::Long(v) => Value::Long(*v),
            Literal::Float(v) => Value::Float(*v),
            Literal::Double(v) => Value::Double(*v),
            Literal::String(_) => return None,
        };
        Some(value)
    }
}

impl From<i32> for Literal {
    fn from(v: i32) -> Self {
        Literal::Int(v)
    }
}

impl From<bool> for Literal {
    fn from(v: bool) -> Self {
        Literal::Boolean(v)
    }
}

impl From<&str> for Literal {
    fn from(v: &str) -> Self {
        Literal::String(v.to_string())
    }
}

/// Single step of an expression program.
///
/// Stack effects are written as `[before] -> [after]`, rightmost element is the top.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    // --------------------------------- push instructions -----------------------------------------
    /// `[] -> [value]`
    PushLiteral(Literal),
    /// `[] -> [null]`
    PushNull,
    /// `[] -> [this]`, receiver of the evaluation frame.
    PushThis,
    /// `[] -> [class object]`, class literal (`Foo.class`).
    PushClassObject { type_name: String },
    /// `[] -> [variable]`
    PushLocalVariable { name: String },
    /// `[object] -> [variable]`
    PushField { name: String },
    /// `[] -> [variable]`
    PushStaticField { type_name: String, name: String },
    /// `[] -> [variable]`
    PushInternalVariable { name: String },
    /// `[] -> []`, declare an internal variable initialized with a default value of its type.
    CreateInternalVariable { name: String, type_name: String },

    // --------------------------------- arrays ----------------------------------------------------
    /// `[array, index] -> [variable]`
    ArrayAccess,
    /// `[array] -> [int]`
    ArrayLength,
    /// `[length] -> [array]`
    ArrayAllocation { array_type: String },

    // --------------------------------- invocations -----------------------------------------------
    /// `[receiver, arg1 .. argN] -> [result]`
    SendMessage {
        selector: String,
        signature: String,
        arg_count: usize,
        non_virtual: bool,
    },
    /// `[arg1 .. argN] -> [result]`
    SendStaticMessage {
        type_name: String,
        selector: String,
        signature: String,
        arg_count: usize,
    },
    /// `[arg1 .. argN] -> [object]`
    Constructor {
        type_name: String,
        signature: String,
        arg_count: usize,
    },

    // --------------------------------- operators -------------------------------------------------
    /// `[left, right] -> [result]`
    Binary(BinaryOp),
    /// `[operand] -> [result]`
    Unary(UnaryOp),
    /// `[value] -> [value]`, primitive conversion or checked reference cast.
    Cast { type_name: String },
    /// `[value] -> [boolean]`
    InstanceOf { type_name: String },
    /// `[variable, value] -> [value]`
    Assign,
    /// `[variable, value] -> [value]`, `a op= b`.
    CompoundAssign(BinaryOp),

    // --------------------------------- stack and control flow ------------------------------------
    /// `[value] -> []`, popped value becomes the last value.
    Pop,
    /// `[value] -> [value, value]`
    Dup,
    /// Jump relative to the next instruction.
    Jump(isize),
    /// `[boolean] -> []`, jump relative to the next instruction if condition equals `jump_on`.
    ConditionalJump { offset: isize, jump_on: bool },
    /// Finish program.
    Return,
    NoOp,
}

impl Instruction {
    /// Instruction footprint, used for jump offset bookkeeping.
    pub fn size(&self) -> usize {
        1
    }
}

impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Instruction::PushLiteral(l) => write!(f, "push {l:?}"),
            Instruction::PushNull => f.write_str("push null"),
            Instruction::PushThis => f.write_str("push this"),
            Instruction::PushClassObject { type_name } => write!(f, "push {type_name}.class"),
            Instruction::PushLocalVariable { name } => write!(f, "push local {name}"),
            Instruction::PushField { name } => write!(f, "push field {name}"),
            Instruction::PushStaticField { type_name, name } => {
                write!(f, "push static {type_name}.{name}")
            }
            Instruction::PushInternalVariable { name } => write!(f, "push internal {name}"),
            Instruction::CreateInternalVariable { name, type_name } => {
                write!(f, "create internal {type_name} {name}")
            }
            Instruction::ArrayAccess => f.write_str("array access"),
            Instruction::ArrayLength => f.write_str("array length"),
            Instruction::ArrayAllocation { array_type } => write!(f, "new {array_type}"),
            Instruction::SendMessage {
                selector,
                arg_count,
                non_virtual,
                ..
            } => {
                let kind = if *non_virtual { "super " } else { "" };
                write!(f, "send {kind}{selector}/{arg_count}")
            }
            Instruction::SendStaticMessage {
                type_name,
                selector,
                arg_count,
                ..
            } => write!(f, "send static {type_name}.{selector}/{arg_count}"),
            Instruction::Constructor {
                type_name,
                arg_count,
                ..
            } => write!(f, "new {type_name}/{arg_count}"),
            Instruction::Binary(op) => write!(f, "'{op}'"),
            Instruction::Unary(op) => write!(f, "unary '{op}'"),
            Instruction::Cast { type_name } => write!(f, "cast ({type_name})"),
            Instruction::InstanceOf { type_name } => write!(f, "instanceof {type_name}"),
            Instruction::Assign => f.write_str("'='"),
            Instruction::CompoundAssign(op) => write!(f, "'{op}='"),
            Instruction::Pop => f.write_str("pop"),
            Instruction::Dup => f.write_str("dup"),
            Instruction::Jump(offset) => write!(f, "jump {offset}"),
            Instruction::ConditionalJump { offset, jump_on } => {
                write!(f, "jump {offset} if {jump_on}")
            }
            Instruction::Return => f.write_str("return"),
            Instruction::NoOp => f.write_str("no-op"),
        }
    }
}

/// Program of an expression, built once by a compiler front end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionSequence {
    instructions: Vec<Instruction>,
}

impl InstructionSequence {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    /// Return summary footprint of all instructions.
    pub fn size(&self) -> usize {
        self.instructions.iter().map(Instruction::size).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }
}

impl Index<usize> for InstructionSequence {
    type Output = Instruction;

    fn index(&self, index: usize) -> &Self::Output {
        &self.instructions[index]
    }
}

impl From<Vec<Instruction>> for InstructionSequence {
    fn from(instructions: Vec<Instruction>) -> Self {
        Self::new(instructions)
    }
}

impl FromIterator<Instruction> for InstructionSequence {
    fn from_iter<T: IntoIterator<Item = Instruction>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
