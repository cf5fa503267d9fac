//! Symbols
//!
//! A symbol is one named definition inside an archive. Its bytes are decoded
//! by a [`SymbolDecoder`] into a [`SymbolManifest`], which the owning module
//! turns into a [`Definition`]: a runtime type plus the functions it declares.

mod decoder;
mod manifest;

pub use decoder::*;
pub use manifest::*;

use std::fmt;
use std::sync::Arc;

use crate::module::Module;
use crate::types::TypeRef;
use crate::value::{Object, Provenance};

/// A loaded symbol, owned by the module that defined it
pub struct Definition {
    name: String,
    ty: TypeRef,
    functions: Vec<FunctionDecl>,
}

impl Definition {
    pub(crate) fn new(name: impl Into<String>, ty: TypeRef, functions: Vec<FunctionDecl>) -> Self {
        Self {
            name: name.into(),
            ty,
            functions,
        }
    }

    /// Qualified symbol name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The runtime type this symbol defines
    pub fn ty(&self) -> &TypeRef {
        &self.ty
    }

    /// Functions declared directly by this symbol
    pub fn functions(&self) -> &[FunctionDecl] {
        &self.functions
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Create an object of this symbol's type
    pub fn instantiate(&self, data: serde_json::Value) -> Object {
        Object::new(Arc::clone(&self.ty), data)
    }
}

impl Provenance for Definition {
    fn owner(&self) -> Option<Arc<Module>> {
        self.ty.owner()
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("name", &self.name)
            .field("ty", &self.ty)
            .field("functions", &self.functions.len())
            .finish()
    }
}
