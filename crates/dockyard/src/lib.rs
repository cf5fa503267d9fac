//! Dockyard - Plugin host with isolated modules and typed event dispatch
//!
//! This crate provides the engine behind the `dockyard` binary:
//! - Loading plugin archives into isolated modules
//! - Discovering event handlers declared by plugin symbols
//! - Dispatching typed events up the ancestor-type chain
//! - Tracing values back to the plugin that produced them

// Re-export the archive collaborators
pub use dockyard_archive;

// Host configuration (dockyard.toml)
pub mod config;

// Error types
pub mod error;

// Runtime types and values
pub mod types;
pub mod value;

// Symbols and the natives that implement their functions
pub mod native;
pub mod symbol;

// Isolated modules and their handler registries
pub mod module;

// Event dispatch
pub mod dispatch;

// Plugin handles and the host
pub mod host;

pub use config::{ConfigError, HostConfig};
pub use dispatch::EventDispatcher;
pub use error::{ConstructionError, DecodeError, LoadError, MalformedHandler, PostError, TypeError};
pub use host::{Plugin, PluginHost};
pub use module::{HandlerAdapter, HandlerRegistry, Module, ModuleId};
pub use native::{FnNative, Invocation, Linker, NativeFunction};
pub use symbol::{Definition, FunctionDecl, ManifestDecoder, SymbolDecoder, SymbolManifest};
pub use types::{TypeId, TypeInfo, TypeKind, TypeRef, TypeTable};
pub use value::{Object, Provenance};
