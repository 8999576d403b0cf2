//! Per-loader type registry and function signatures.
//!
//! Each loader seeds a [`TypeRegistry`] with the type names its guest value
//! system natively understands. Discovery resolves annotated type names
//! through the registry and records the result in a [`Signature`]: an
//! ordered list of named parameter slots plus one optional return type.

use crate::error::{BridgeError, BridgeResult};
use crate::value::ValueId;
use serde::Serialize;
use std::collections::HashMap;

/// A named type known to one loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    /// Type name as written in guest annotations.
    pub name: String,

    /// Host-side type tag the name maps to.
    pub id: ValueId,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>, id: ValueId) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }
}

/// Table mapping type names to descriptors, one per loader.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a type name.
    ///
    /// Re-defining a name with the same id is a no-op; a different id is a
    /// collision and fails.
    pub fn define(&mut self, name: &str, id: ValueId) -> BridgeResult<()> {
        if let Some(existing) = self.types.get(name) {
            if existing.id == id {
                return Ok(());
            }
            return Err(BridgeError::TypeRegistration(format!(
                "type '{}' is already defined as {:?}, cannot redefine as {:?}",
                name, existing.id, id
            )));
        }

        self.types
            .insert(name.to_string(), TypeDescriptor::new(name, id));
        Ok(())
    }

    /// Look up a type by name.
    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor> {
        self.types.get(name)
    }

    /// Number of defined types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// One named, typed parameter slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeDescriptor,
}

/// Ordered parameter slots plus one optional return type.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Signature {
    params: Vec<Option<Parameter>>,
    ret: Option<TypeDescriptor>,
}

impl Signature {
    /// Create a signature with `count` empty parameter slots.
    pub fn with_count(count: usize) -> Self {
        Self {
            params: vec![None; count],
            ret: None,
        }
    }

    /// Set the return type.
    pub fn set_return(&mut self, ty: TypeDescriptor) {
        self.ret = Some(ty);
    }

    /// Fill the parameter slot at `index`.
    pub fn set(&mut self, index: usize, name: &str, ty: TypeDescriptor) -> BridgeResult<()> {
        let count = self.params.len();
        match self.params.get_mut(index) {
            Some(slot) => {
                *slot = Some(Parameter {
                    name: name.to_string(),
                    ty,
                });
                Ok(())
            }
            None => Err(BridgeError::Discovery(format!(
                "parameter index {} out of range for signature of {} slots",
                index, count
            ))),
        }
    }

    /// Number of parameter slots.
    pub fn count(&self) -> usize {
        self.params.len()
    }

    /// Declared type of the parameter at `index`, if the slot is filled.
    pub fn get_type(&self, index: usize) -> Option<&TypeDescriptor> {
        self.params.get(index).and_then(|p| p.as_ref()).map(|p| &p.ty)
    }

    /// Parameter slot at `index`.
    pub fn get(&self, index: usize) -> Option<&Parameter> {
        self.params.get(index).and_then(|p| p.as_ref())
    }

    /// Declared return type, if any.
    pub fn get_return(&self) -> Option<&TypeDescriptor> {
        self.ret.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_define_and_lookup() {
        let mut registry = TypeRegistry::new();
        registry.define("string", ValueId::String).unwrap();
        registry.define("int", ValueId::Long).unwrap();

        assert_eq!(registry.lookup("string").unwrap().id, ValueId::String);
        assert_eq!(registry.lookup("int").unwrap().id, ValueId::Long);
        assert!(registry.lookup("missing").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_redefine_same_id_is_noop() {
        let mut registry = TypeRegistry::new();
        registry.define("map", ValueId::Ptr).unwrap();
        registry.define("map", ValueId::Ptr).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_collision_fails() {
        let mut registry = TypeRegistry::new();
        registry.define("int", ValueId::Long).unwrap();
        let err = registry.define("int", ValueId::String).unwrap_err();
        assert!(matches!(err, BridgeError::TypeRegistration(_)));
    }

    #[test]
    fn test_signature_slots() {
        let mut sig = Signature::with_count(2);
        sig.set(0, "name", TypeDescriptor::new("string", ValueId::String))
            .unwrap();
        sig.set(1, "times", TypeDescriptor::new("int", ValueId::Long))
            .unwrap();
        sig.set_return(TypeDescriptor::new("string", ValueId::String));

        assert_eq!(sig.count(), 2);
        assert_eq!(sig.get_type(0).unwrap().id, ValueId::String);
        assert_eq!(sig.get(1).unwrap().name, "times");
        assert_eq!(sig.get_return().unwrap().id, ValueId::String);
    }

    #[test]
    fn test_signature_index_out_of_range() {
        let mut sig = Signature::with_count(1);
        let err = sig
            .set(3, "x", TypeDescriptor::new("int", ValueId::Long))
            .unwrap_err();
        assert!(matches!(err, BridgeError::Discovery(_)));
    }
}
