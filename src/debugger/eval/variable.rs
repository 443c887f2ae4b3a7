use crate::debugger::error::Error;
use crate::debugger::remote::{ObjectRef, RemoteProcess, ThreadRef, TypeRef};
use crate::debugger::value::{TypeKind, Value};
use indexmap::IndexMap;
use std::fmt::{Display, Formatter};

/// Assignable location, read lazily when used as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Variable {
    /// Interpreter scoped variable.
    Internal(String),
    /// Local variable of the evaluation frame.
    Local { name: String },
    Field { object: ObjectRef, name: String },
    StaticField { type_ref: TypeRef, name: String },
    ArrayElement { array: ObjectRef, index: i32 },
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Variable::Internal(name) => write!(f, "${name}"),
            Variable::Local { name } => f.write_str(name),
            Variable::Field { object, name } => write!(f, "{object}.{name}"),
            Variable::StaticField { type_ref, name } => write!(f, "{type_ref}.{name}"),
            Variable::ArrayElement { array, index } => write!(f, "{array}[{index}]"),
        }
    }
}

/// Element of the evaluation stack.
#[derive(Debug, Clone, PartialEq)]
pub enum StackEntry {
    Value(Value),
    Variable(Variable),
}

impl From<Value> for StackEntry {
    fn from(value: Value) -> Self {
        StackEntry::Value(value)
    }
}

impl From<Variable> for StackEntry {
    fn from(variable: Variable) -> Self {
        StackEntry::Variable(variable)
    }
}

/// Frame in which variables are read and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRef {
    pub thread: ThreadRef,
    pub frame: usize,
}

/// Internal variable slot.
#[derive(Debug, Clone, PartialEq)]
pub struct InternalVariable {
    pub kind: TypeKind,
    /// Declared reference type, `None` for primitives.
    pub type_ref: Option<TypeRef>,
    pub value: Value,
}

/// Namespace of interpreter scoped variables.
#[derive(Debug, Default)]
pub struct InternalVariables {
    vars: IndexMap<String, InternalVariable>,
}

impl InternalVariables {
    /// Declare a new variable, redeclaration is an error.
    pub fn create(&mut self, name: &str, var: InternalVariable) -> Result<(), Error> {
        if self.vars.contains_key(name) {
            return Err(Error::InternalVariableExists(name.to_string()));
        }
        self.vars.insert(name.to_string(), var);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&InternalVariable, Error> {
        self.vars
            .get(name)
            .ok_or_else(|| Error::InternalVariableNotFound(name.to_string()))
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), Error> {
        let var = self
            .vars
            .get_mut(name)
            .ok_or_else(|| Error::InternalVariableNotFound(name.to_string()))?;
        var.value = value;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.vars.clear();
    }
}

impl Variable {
    /// Read a current value of the variable.
    pub fn read(
        &self,
        remote: &dyn RemoteProcess,
        frame: FrameRef,
        internals: &InternalVariables,
    ) -> Result<Value, Error> {
        let value = match self {
            Variable::Internal(name) => internals.get(name)?.value,
            Variable::Local { name } => remote.local_value(frame.thread, frame.frame, name)?,
            Variable::Field { object, name } => remote.field_value(*object, name)?,
            Variable::StaticField { type_ref, name } => remote.static_field_value(*type_ref, name)?,
            Variable::ArrayElement { array, index } => remote.array_element(*array, *index)?,
        };
        Ok(value)
    }

    /// Write a value into the variable.
    pub fn write(
        &self,
        remote: &dyn RemoteProcess,
        frame: FrameRef,
        internals: &mut InternalVariables,
        value: Value,
    ) -> Result<(), Error> {
        match self {
            Variable::Internal(name) => internals.set(name, value)?,
            Variable::Local { name } => {
                remote.set_local_value(frame.thread, frame.frame, name, value)?
            }
            Variable::Field { object, name } => remote.set_field_value(*object, name, value)?,
            Variable::StaticField { type_ref, name } => {
                remote.set_static_field_value(*type_ref, name, value)?
            }
            Variable::ArrayElement { array, index } => {
                remote.set_array_element(*array, *index, value)?
            }
        }
        Ok(())
    }
}
