// Symbol Manifest - The declared shape of a symbol
//
// Symbols carry no executable code of their own. Function bodies name host
// natives, which the module links when it discovers event handlers.

use serde::{Deserialize, Serialize};

/// Decoded contents of one symbol entry
///
/// # Example
/// ```text
/// {
///   "extends": "chat.Event",
///   "functions": [
///     {
///       "name": "on_message",
///       "attributes": ["subscribe"],
///       "visibility": "public",
///       "params": ["chat.Message"],
///       "native": "audit.record"
///     }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolManifest {
    /// Supertype name; the root type when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Functions declared directly by this symbol
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
}

/// Visibility of a declared function
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

/// A function declared by a symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// Marker attributes (e.g. "subscribe")
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    /// Whether the function takes a receiver
    #[serde(default)]
    pub instance: bool,
    /// Parameter type names
    #[serde(default)]
    pub params: Vec<String>,
    /// Host native implementing the body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<String>,
}

impl FunctionDecl {
    /// Create a private, module-level function with no parameters
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            visibility: Visibility::Private,
            instance: false,
            params: Vec::new(),
            native: None,
        }
    }

    /// Create a public handler marked with `attribute`, accepting `param`
    pub fn handler(
        name: impl Into<String>,
        attribute: impl Into<String>,
        param: impl Into<String>,
        native: impl Into<String>,
    ) -> Self {
        Self::new(name)
            .with_attribute(attribute)
            .with_visibility(Visibility::Public)
            .with_param(param)
            .with_native(native)
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_instance(mut self, instance: bool) -> Self {
        self.instance = instance;
        self
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    pub fn with_native(mut self, native: impl Into<String>) -> Self {
        self.native = Some(native.into());
        self
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }
}
