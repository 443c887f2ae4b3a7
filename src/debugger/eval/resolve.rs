use crate::config::EvalConfig;
use crate::debugger::error::Error;
use crate::debugger::remote::{ObjectRef, RemoteProcess, ThreadRef, TypeRef};
use crate::debugger::value::{TypeKind, Value};
use log::debug;

/// Type declared in an expression (cast, `instanceof`, internal variable declaration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Primitive(TypeKind),
    Reference(TypeRef),
}

/// Resolves types by qualified names in a context of a suspended thread.
pub struct TypeResolver<'a> {
    remote: &'a dyn RemoteProcess,
    thread: ThreadRef,
    config: &'a EvalConfig,
}

impl<'a> TypeResolver<'a> {
    pub fn new(remote: &'a dyn RemoteProcess, thread: ThreadRef, config: &'a EvalConfig) -> Self {
        Self {
            remote,
            thread,
            config,
        }
    }

    /// Force loading of a type by its qualified name.
    ///
    /// Return a class object of loaded type, `None` if target has no such type.
    /// Any other failure of the loading call is an error.
    pub fn load_or_find(&self, name: &str) -> Result<Option<ObjectRef>, Error> {
        let class_types = self.remote.all_types(&self.config.class_type)?;
        let [class_type] = class_types.as_slice() else {
            return Err(Error::UnresolvableType(self.config.class_type.clone()));
        };

        let arg = self.remote.new_string(name)?;
        let loaded = self.remote.invoke_static(
            *class_type,
            &self.config.for_name_method,
            &self.config.for_name_signature,
            &[arg],
            self.thread,
        );

        match loaded {
            Ok(class_object) => Ok(class_object.as_object()),
            Err(e) if e.is_exception_of(&self.config.not_found_exception) => {
                debug!(target: "interpreter", "type {name} not found by loader");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve a reference type by its qualified name.
    ///
    /// There may be several loaded types with the same name (loaded by different loaders).
    /// In this case a type which class object is the result of forced loading wins.
    pub fn resolve(&self, name: &str) -> Result<TypeRef, Error> {
        let class_object = self.load_or_find(name)?;
        let types = self.remote.all_types(name)?;

        match types.as_slice() {
            [] => Err(Error::UnresolvableType(name.to_string())),
            [single] => Ok(*single),
            candidates => {
                let Some(class_object) = class_object else {
                    return Err(Error::UnresolvableType(name.to_string()));
                };
                for &candidate in candidates {
                    if self.remote.class_object(candidate)? == Some(class_object) {
                        return Ok(candidate);
                    }
                }
                debug!(
                    target: "interpreter",
                    "none of {} types named {name} matches {class_object}",
                    candidates.len()
                );
                Err(Error::UnresolvableType(name.to_string()))
            }
        }
    }

    /// Resolve a primitive type name locally or a reference type in the target.
    pub fn resolve_declared(&self, name: &str) -> Result<DeclaredType, Error> {
        match TypeKind::from_primitive_name(name) {
            Some(TypeKind::Void) => Err(Error::UnresolvableType(name.to_string())),
            Some(kind) => Ok(DeclaredType::Primitive(kind)),
            None => self.resolve(name).map(DeclaredType::Reference),
        }
    }

    /// Return a class object (result of a class literal) of a named type.
    pub fn class_object(&self, name: &str) -> Result<Value, Error> {
        let ty = self.resolve(name)?;
        let object = self
            .remote
            .class_object(ty)?
            .ok_or_else(|| Error::UnresolvableType(name.to_string()))?;
        Ok(Value::ObjectRef(object))
    }
}
