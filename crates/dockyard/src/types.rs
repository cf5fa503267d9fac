//! Runtime Type Model
//!
//! Every event carries a runtime type. Types form a single-inheritance tree
//! rooted at [`ROOT_TYPE`]; dispatch walks that tree from the most specific
//! type upwards. Host types live in the shared [`TypeTable`], while types
//! defined by plugin symbols belong to the module that defined them and hold
//! only a weak reference back to it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use dashmap::DashMap;

use crate::error::TypeError;
use crate::module::Module;
use crate::value::{Object, Provenance};

/// Name of the root type every other type descends from
pub const ROOT_TYPE: &str = "object";

/// Name of the built-in text type
pub const STRING_TYPE: &str = "string";

/// Built-in value kinds that cannot be used as handler parameters
pub const PRIMITIVE_TYPES: &[&str] = &["bool", "i64", "f64", "char"];

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

// ─────────────────────────────────────────────────────────────────────────────
// Type Info
// ─────────────────────────────────────────────────────────────────────────────

/// Process-unique identity of a runtime type
///
/// Two modules defining the same type name get two distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(u64);

/// Kind of a runtime type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Object,
    Primitive,
    Array,
}

/// Shared reference to a runtime type
pub type TypeRef = Arc<TypeInfo>;

/// A runtime type
pub struct TypeInfo {
    id: TypeId,
    name: String,
    kind: TypeKind,
    supertype: Option<TypeRef>,
    owner: Weak<Module>,
}

impl TypeInfo {
    pub(crate) fn new(
        name: impl Into<String>,
        kind: TypeKind,
        supertype: Option<TypeRef>,
        owner: Weak<Module>,
    ) -> TypeRef {
        Arc::new(Self {
            id: TypeId(NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.into(),
            kind,
            supertype,
            owner,
        })
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Immediate supertype, `None` only for the root type
    pub fn supertype(&self) -> Option<&TypeRef> {
        self.supertype.as_ref()
    }

    pub fn is_primitive(&self) -> bool {
        self.kind == TypeKind::Primitive
    }

    pub fn is_array(&self) -> bool {
        self.kind == TypeKind::Array
    }

    /// Whether `self` is `other` or one of its subtypes
    pub fn is_a(&self, other: &TypeInfo) -> bool {
        if self.id == other.id {
            return true;
        }
        let mut current = self.supertype.as_ref();
        while let Some(ty) = current {
            if ty.id == other.id {
                return true;
            }
            current = ty.supertype.as_ref();
        }
        false
    }
}

impl Provenance for TypeInfo {
    fn owner(&self) -> Option<Arc<Module>> {
        self.owner.upgrade()
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("supertype", &self.supertype.as_ref().map(|s| s.name()))
            .finish()
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ancestor Chain
// ─────────────────────────────────────────────────────────────────────────────

/// Iterator over a type and all its supertypes, most specific first
pub struct Ancestors {
    next: Option<TypeRef>,
}

impl Iterator for Ancestors {
    type Item = TypeRef;

    fn next(&mut self) -> Option<TypeRef> {
        let current = self.next.take()?;
        self.next = current.supertype.clone();
        Some(current)
    }
}

/// Walk the ancestor-type chain of `ty`
///
/// The chain always starts with `ty` itself and ends at the root type.
pub fn ancestors(ty: &TypeRef) -> Ancestors {
    Ancestors {
        next: Some(Arc::clone(ty)),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Type Table
// ─────────────────────────────────────────────────────────────────────────────

/// Host-level types shared by every module
///
/// Modules resolve names here first, so plugins cannot shadow host types.
pub struct TypeTable {
    types: DashMap<String, TypeRef>,
    root: TypeRef,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    /// Create a table holding the built-in types
    pub fn new() -> Self {
        let root = TypeInfo::new(ROOT_TYPE, TypeKind::Object, None, Weak::new());
        let types = DashMap::new();
        types.insert(ROOT_TYPE.to_string(), Arc::clone(&root));

        let string = TypeInfo::new(
            STRING_TYPE,
            TypeKind::Object,
            Some(Arc::clone(&root)),
            Weak::new(),
        );
        types.insert(STRING_TYPE.to_string(), string);

        for name in PRIMITIVE_TYPES {
            let primitive = TypeInfo::new(
                *name,
                TypeKind::Primitive,
                Some(Arc::clone(&root)),
                Weak::new(),
            );
            types.insert(name.to_string(), primitive);
        }

        Self { types, root }
    }

    /// Create a new table wrapped in an Arc
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn root(&self) -> &TypeRef {
        &self.root
    }

    /// Look up a host type
    ///
    /// `T[]` names resolve to the array type of `T`, created on first use.
    pub fn get(&self, name: &str) -> Option<TypeRef> {
        if let Some(ty) = self.types.get(name) {
            return Some(Arc::clone(ty.value()));
        }

        let element = name.strip_suffix("[]")?;
        let element = self.get(element)?;
        Some(self.array_of(&element))
    }

    /// Array type of a host element type
    pub fn array_of(&self, element: &TypeRef) -> TypeRef {
        let name = format!("{}[]", element.name());
        let entry = self.types.entry(name.clone()).or_insert_with(|| {
            TypeInfo::new(
                name,
                TypeKind::Array,
                Some(Arc::clone(&self.root)),
                Weak::new(),
            )
        });
        Arc::clone(entry.value())
    }

    /// Register a host event type extending `supertype`
    pub fn register(&self, name: &str, supertype: &str) -> Result<TypeRef, TypeError> {
        if name.ends_with("[]") || self.types.contains_key(name) {
            return Err(TypeError::AlreadyRegistered(name.to_string()));
        }

        let parent = self
            .get(supertype)
            .ok_or_else(|| TypeError::UnknownType(supertype.to_string()))?;
        if parent.kind() != TypeKind::Object {
            return Err(TypeError::NotAnObjectType(supertype.to_string()));
        }

        let entry = self.types.entry(name.to_string());
        match entry {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(TypeError::AlreadyRegistered(name.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                let ty = TypeInfo::new(name, TypeKind::Object, Some(parent), Weak::new());
                vacant.insert(Arc::clone(&ty));
                Ok(ty)
            }
        }
    }

    /// Create an object of a host type
    pub fn object(&self, name: &str, data: serde_json::Value) -> Result<Object, TypeError> {
        let ty = self
            .get(name)
            .ok_or_else(|| TypeError::UnknownType(name.to_string()))?;
        Ok(Object::new(ty, data))
    }

    /// Create a `string` object
    pub fn string(&self, text: impl Into<String>) -> Object {
        let ty = self
            .get(STRING_TYPE)
            .unwrap_or_else(|| Arc::clone(&self.root));
        Object::new(ty, serde_json::Value::String(text.into()))
    }

    /// Number of host types (including array types created so far)
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
