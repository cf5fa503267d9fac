//! Event Values
//!
//! An [`Object`] is a typed JSON payload. Objects whose type was defined by a
//! plugin keep that plugin's module alive, so a module is reclaimed only once
//! its handle and every value it produced are gone.

use std::fmt;
use std::sync::Arc;

use crate::module::Module;
use crate::types::{TypeInfo, TypeRef};

/// Anything that may have been produced by a loaded module
pub trait Provenance {
    /// The module that defined this value, if any
    fn owner(&self) -> Option<Arc<Module>>;
}

impl<T: Provenance + ?Sized> Provenance for Arc<T> {
    fn owner(&self) -> Option<Arc<Module>> {
        (**self).owner()
    }
}

/// A typed value that can be posted as an event
#[derive(Clone)]
pub struct Object {
    ty: TypeRef,
    data: serde_json::Value,
    origin: Option<Arc<Module>>,
}

impl Object {
    /// Create an object of the given type
    pub fn new(ty: TypeRef, data: serde_json::Value) -> Self {
        let origin = ty.owner();
        Self { ty, data, origin }
    }

    /// Runtime type of this object
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    pub fn into_data(self) -> serde_json::Value {
        self.data
    }

    /// Whether the runtime type is `ty` or one of its subtypes
    pub fn is_a(&self, ty: &TypeInfo) -> bool {
        self.ty.is_a(ty)
    }

    /// View this object as `ty`, if its runtime type allows it
    pub fn cast(&self, ty: &TypeInfo) -> Option<&Object> {
        self.is_a(ty).then_some(self)
    }

    /// Get a field from the object data
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Get a string field from the object data
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }

    /// The payload itself, when it is a string
    pub fn as_str(&self) -> Option<&str> {
        self.data.as_str()
    }

    /// Deserialize the object data to a specific type
    pub fn parse_data<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

impl Provenance for Object {
    fn owner(&self) -> Option<Arc<Module>> {
        self.origin.clone()
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("type", &self.ty.name())
            .field("data", &self.data)
            .finish()
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.ty.name(), self.data)
    }
}
