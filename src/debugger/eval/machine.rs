use crate::config::EvalConfig;
use crate::debugger::error::Error;
use crate::debugger::eval::instruction::{BinaryOp, Instruction, Literal};
use crate::debugger::eval::ops;
use crate::debugger::eval::resolve::{DeclaredType, TypeResolver};
use crate::debugger::eval::variable::{
    FrameRef, InternalVariable, InternalVariables, StackEntry, Variable,
};
use crate::debugger::remote::{ObjectRef, RemoteProcess, TypeCategory};
use crate::debugger::value::{promote, TypeKind, Value};

/// What to do after an instruction.
pub(super) enum Flow {
    Next,
    /// Jump relative to the next instruction.
    Jump(isize),
    Return,
}

/// Everything an instruction may talk to.
pub(super) struct Env<'a> {
    pub remote: &'a dyn RemoteProcess,
    pub frame: FrameRef,
    pub config: &'a EvalConfig,
}

impl Env<'_> {
    fn resolver(&self) -> TypeResolver<'_> {
        TypeResolver::new(self.remote, self.frame.thread, self.config)
    }
}

/// Mutable state of a single evaluation.
#[derive(Default)]
pub(super) struct Machine {
    stack: Vec<StackEntry>,
    internals: InternalVariables,
    last_value: Option<Value>,
}

impl Machine {
    pub fn reset(&mut self) {
        self.stack.clear();
        self.internals.clear();
        self.last_value = None;
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn internals(&self) -> &InternalVariables {
        &self.internals
    }

    /// Return an evaluation result: top of the stack if any, last popped value otherwise.
    pub fn result(&self, env: &Env) -> Result<Option<Value>, Error> {
        match self.stack.last() {
            Some(entry) => self.entry_value(entry, env).map(Some),
            None => Ok(self.last_value),
        }
    }

    fn entry_value(&self, entry: &StackEntry, env: &Env) -> Result<Value, Error> {
        match entry {
            StackEntry::Value(v) => Ok(*v),
            StackEntry::Variable(var) => var.read(env.remote, env.frame, &self.internals),
        }
    }

    fn push(&mut self, entry: impl Into<StackEntry>) {
        self.stack.push(entry.into());
    }

    fn pop(&mut self) -> Result<StackEntry, Error> {
        self.stack.pop().ok_or(Error::StackUnderflow)
    }

    /// Pop a value, variables are read.
    fn pop_value(&mut self, env: &Env) -> Result<Value, Error> {
        let entry = self.pop()?;
        self.entry_value(&entry, env)
    }

    fn pop_variable(&mut self) -> Result<Variable, Error> {
        match self.pop()? {
            StackEntry::Variable(var) => Ok(var),
            StackEntry::Value(_) => Err(Error::InvalidOperand(
                "left side of assignment must be a variable",
            )),
        }
    }

    /// Pop an object (or string) handle.
    fn pop_object(&mut self, env: &Env) -> Result<ObjectRef, Error> {
        match self.pop_value(env)? {
            Value::Null => Err(Error::NullReceiver),
            value => value
                .as_object()
                .ok_or(Error::InvalidOperand("expect an object")),
        }
    }

    /// Pop invocation arguments, first argument is the deepest one.
    fn pop_args(&mut self, count: usize, env: &Env) -> Result<Vec<Value>, Error> {
        let mut args = (0..count)
            .map(|_| self.pop_value(env))
            .collect::<Result<Vec<_>, _>>()?;
        args.reverse();
        Ok(args)
    }

    pub fn execute(&mut self, instruction: &Instruction, env: &Env) -> Result<Flow, Error> {
        let remote = env.remote;
        let thread = env.frame.thread;

        match instruction {
            Instruction::PushLiteral(literal) => {
                let value = match literal {
                    Literal::String(s) => remote.new_string(s)?,
                    primitive => primitive
                        .primitive()
                        .ok_or(Error::InvalidOperand("unsupported literal"))?,
                };
                self.push(value);
            }
            Instruction::PushNull => self.push(Value::Null),
            Instruction::PushThis => {
                let this = remote.this_object(thread, env.frame.frame)?;
                self.push(this);
            }
            Instruction::PushClassObject { type_name } => {
                let class_object = env.resolver().class_object(type_name)?;
                self.push(class_object);
            }
            Instruction::PushLocalVariable { name } => {
                self.push(Variable::Local { name: name.clone() });
            }
            Instruction::PushField { name } => {
                let object = self.pop_object(env)?;
                self.push(Variable::Field {
                    object,
                    name: name.clone(),
                });
            }
            Instruction::PushStaticField { type_name, name } => {
                let type_ref = env.resolver().resolve(type_name)?;
                self.push(Variable::StaticField {
                    type_ref,
                    name: name.clone(),
                });
            }
            Instruction::PushInternalVariable { name } => {
                if !self.internals.contains(name) {
                    return Err(Error::InternalVariableNotFound(name.clone()));
                }
                self.push(Variable::Internal(name.clone()));
            }
            Instruction::CreateInternalVariable { name, type_name } => {
                let var = match env.resolver().resolve_declared(type_name)? {
                    DeclaredType::Primitive(kind) => InternalVariable {
                        kind,
                        type_ref: None,
                        value: Value::default_for(kind)
                            .ok_or_else(|| Error::UnresolvableType(type_name.clone()))?,
                    },
                    DeclaredType::Reference(type_ref) => InternalVariable {
                        kind: TypeKind::Object,
                        type_ref: Some(type_ref),
                        value: Value::Null,
                    },
                };
                self.internals.create(name, var)?;
            }

            Instruction::ArrayAccess => {
                let index = ops::index(self.pop_value(env)?)?;
                let array = self.pop_object(env)?;
                self.push(Variable::ArrayElement { array, index });
            }
            Instruction::ArrayLength => {
                let array = self.pop_object(env)?;
                self.push(Value::Int(remote.array_length(array)?));
            }
            Instruction::ArrayAllocation { array_type } => {
                let length = ops::index(self.pop_value(env)?)?;
                if length < 0 {
                    return Err(Error::InvalidOperand("negative array size"));
                }
                let type_ref = env.resolver().resolve(array_type)?;
                if remote.type_category(type_ref)? != TypeCategory::Array {
                    return Err(Error::InvalidOperand("array allocation of a non array type"));
                }
                self.push(remote.new_array(type_ref, length)?);
            }

            Instruction::SendMessage {
                selector,
                signature,
                arg_count,
                non_virtual,
            } => {
                let args = self.pop_args(*arg_count, env)?;
                let receiver = self.pop_object(env)?;
                let result =
                    remote.invoke_method(receiver, selector, signature, &args, thread, *non_virtual)?;
                self.push(result);
            }
            Instruction::SendStaticMessage {
                type_name,
                selector,
                signature,
                arg_count,
            } => {
                let args = self.pop_args(*arg_count, env)?;
                let type_ref = env.resolver().resolve(type_name)?;
                self.push(remote.invoke_static(type_ref, selector, signature, &args, thread)?);
            }
            Instruction::Constructor {
                type_name,
                signature,
                arg_count,
            } => {
                let args = self.pop_args(*arg_count, env)?;
                let type_ref = env.resolver().resolve(type_name)?;
                self.push(remote.new_instance(type_ref, signature, &args, thread)?);
            }

            Instruction::Binary(op) => {
                let right = self.pop_value(env)?;
                let left = self.pop_value(env)?;
                let result = self.binary(*op, left, right, env)?;
                self.push(result);
            }
            Instruction::Unary(op) => {
                let operand = self.pop_value(env)?;
                self.push(ops::unary(*op, operand)?);
            }
            Instruction::Cast { type_name } => {
                let value = self.pop_value(env)?;
                let result = self.cast(value, type_name, env)?;
                self.push(result);
            }
            Instruction::InstanceOf { type_name } => {
                let value = self.pop_value(env)?;
                let result = match value {
                    Value::Null => false,
                    Value::ObjectRef(obj) | Value::StringRef(obj) => {
                        let ty = env.resolver().resolve(type_name)?;
                        remote.is_assignable(remote.type_of(obj)?, ty)?
                    }
                    _ => {
                        return Err(Error::InvalidOperand(
                            "instanceof requires a reference operand",
                        ))
                    }
                };
                self.push(Value::Boolean(result));
            }
            Instruction::Assign => {
                let value = self.pop_value(env)?;
                let var = self.pop_variable()?;
                let value = self.assignment_conversion(&var, value, env)?;
                var.write(remote, env.frame, &mut self.internals, value)?;
                self.push(value);
            }
            Instruction::CompoundAssign(op) => {
                let operand = self.pop_value(env)?;
                let var = self.pop_variable()?;
                let current = var.read(remote, env.frame, &self.internals)?;
                let mut result = self.binary(*op, current, operand, env)?;
                // implicit narrowing back to the variable kind, `b += 1` stays a byte
                if current.is_primitive() {
                    result = result.convert(current.kind()).ok_or(Error::InvalidCast {
                        from: result.kind(),
                        to: current.kind().to_string(),
                    })?;
                }
                var.write(remote, env.frame, &mut self.internals, result)?;
                self.push(result);
            }

            Instruction::Pop => {
                let value = self.pop_value(env)?;
                self.last_value = Some(value);
            }
            Instruction::Dup => {
                let top = self.stack.last().cloned().ok_or(Error::StackUnderflow)?;
                self.push(top);
            }
            Instruction::Jump(offset) => return Ok(Flow::Jump(*offset)),
            Instruction::ConditionalJump { offset, jump_on } => {
                let condition = ops::truth(self.pop_value(env)?)?;
                if condition == *jump_on {
                    return Ok(Flow::Jump(*offset));
                }
            }
            Instruction::Return => return Ok(Flow::Return),
            Instruction::NoOp => {}
        }

        Ok(Flow::Next)
    }

    fn binary(&self, op: BinaryOp, left: Value, right: Value, env: &Env) -> Result<Value, Error> {
        if op == BinaryOp::Add && promote(left.kind(), right.kind()) == TypeKind::String {
            let text = self.text_of(left, env)? + &self.text_of(right, env)?;
            return Ok(env.remote.new_string(&text)?);
        }
        ops::binary(op, left, right)
    }

    /// Return a string representation of a value for concatenation.
    fn text_of(&self, value: Value, env: &Env) -> Result<String, Error> {
        if let Some(text) = value.primitive_text() {
            return Ok(text);
        }
        let remote = env.remote;
        match value {
            Value::Null => Ok("null".to_string()),
            Value::StringRef(s) => Ok(remote.string_value(s)?),
            Value::ObjectRef(obj) => {
                let text = remote.invoke_method(
                    obj,
                    &env.config.to_string_method,
                    &env.config.to_string_signature,
                    &[],
                    env.frame.thread,
                    false,
                )?;
                match text {
                    Value::StringRef(s) => Ok(remote.string_value(s)?),
                    Value::Null => Ok("null".to_string()),
                    _ => Err(Error::InvalidOperand("string conversion returns a non string")),
                }
            }
            _ => Err(Error::InvalidOperand("value has no string representation")),
        }
    }

    fn cast(&self, value: Value, type_name: &str, env: &Env) -> Result<Value, Error> {
        let invalid = || Error::InvalidCast {
            from: value.kind(),
            to: type_name.to_string(),
        };

        match env.resolver().resolve_declared(type_name)? {
            DeclaredType::Primitive(kind) => value.convert(kind).ok_or_else(invalid),
            DeclaredType::Reference(ty) => match value {
                Value::Null => Ok(Value::Null),
                Value::ObjectRef(obj) | Value::StringRef(obj) => {
                    let remote = env.remote;
                    if remote.is_assignable(remote.type_of(obj)?, ty)? {
                        Ok(value)
                    } else {
                        Err(invalid())
                    }
                }
                _ => Err(invalid()),
            },
        }
    }

    /// Convert a primitive value into a kind of a variable: a declared kind of typed internal
    /// variable or a kind of a current value of a target variable (`long l = 5` stores a long).
    fn assignment_conversion(
        &self,
        var: &Variable,
        value: Value,
        env: &Env,
    ) -> Result<Value, Error> {
        let Variable::Internal(name) = var else {
            if !value.is_primitive() {
                return Ok(value);
            }
            let current = var.read(env.remote, env.frame, &self.internals)?;
            if !current.is_primitive() || current.kind() == value.kind() {
                return Ok(value);
            }
            return value.convert(current.kind()).ok_or(Error::InvalidCast {
                from: value.kind(),
                to: current.kind().to_string(),
            });
        };
        let declared = self.internals.get(name)?.kind;
        if declared == TypeKind::Object {
            if value.is_primitive() {
                return Err(Error::InvalidCast {
                    from: value.kind(),
                    to: declared.to_string(),
                });
            }
            return Ok(value);
        }
        value.convert(declared).ok_or(Error::InvalidCast {
            from: value.kind(),
            to: declared.to_string(),
        })
    }
}
