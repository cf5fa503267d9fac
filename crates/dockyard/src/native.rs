// Native Linker - Host functions that back plugin handlers
//
// Symbols only declare functions; the bodies are natives registered by the
// host application under a name. When a module discovers an event handler it
// links the handler to the native named in its declaration.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::info;

use crate::host::Plugin;
use crate::symbol::Definition;
use crate::value::Object;

// ─────────────────────────────────────────────────────────────────────────────
// Invocation
// ─────────────────────────────────────────────────────────────────────────────

/// A single call of a native on behalf of a plugin function
pub struct Invocation<'a> {
    /// Symbol declaring the function being called
    pub definition: &'a Arc<Definition>,
    /// Name of the declared function
    pub function: &'a str,
    /// The event being delivered
    pub event: &'a Object,
}

impl Invocation<'_> {
    /// `symbol.function` name of the called function
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.definition.name(), self.function)
    }

    /// The plugin this call is running inside
    pub fn plugin(&self) -> Option<Plugin> {
        Plugin::context(self.definition)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Native Function Trait
// ─────────────────────────────────────────────────────────────────────────────

/// A host function callable from plugin symbols
///
/// The returned object, if any, is discarded by event dispatch.
pub trait NativeFunction: Send + Sync {
    fn call(&self, invocation: &Invocation<'_>) -> anyhow::Result<Option<Object>>;
}

/// Closure-based native function
pub struct FnNative<F>
where
    F: Fn(&Invocation<'_>) -> anyhow::Result<Option<Object>> + Send + Sync,
{
    func: F,
}

impl<F> FnNative<F>
where
    F: Fn(&Invocation<'_>) -> anyhow::Result<Option<Object>> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> NativeFunction for FnNative<F>
where
    F: Fn(&Invocation<'_>) -> anyhow::Result<Option<Object>> + Send + Sync,
{
    fn call(&self, invocation: &Invocation<'_>) -> anyhow::Result<Option<Object>> {
        (self.func)(invocation)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Linker
// ─────────────────────────────────────────────────────────────────────────────

/// Table of natives available to plugin symbols
#[derive(Clone, Default)]
pub struct Linker {
    natives: HashMap<String, Arc<dyn NativeFunction>>,
}

impl Linker {
    /// Create an empty linker
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a linker holding the `std.*` natives
    pub fn with_builtins() -> Self {
        let mut linker = Self::new();
        linker.register_fn("std.log", |call| {
            let plugin = call.plugin().map(|p| p.id().to_string());
            info!(
                plugin = plugin.as_deref().unwrap_or("-"),
                "{} received {}",
                call.qualified_name(),
                call.event
            );
            Ok(None)
        });
        linker.register_fn("std.noop", |_| Ok(None));
        linker
    }

    /// Register a native, replacing any previous one with the same name
    pub fn register(&mut self, name: impl Into<String>, native: Arc<dyn NativeFunction>) {
        self.natives.insert(name.into(), native);
    }

    /// Register a closure as a native
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<Option<Object>> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(FnNative::new(func)));
    }

    /// Look up a native by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn NativeFunction>> {
        self.natives.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.natives.contains_key(name)
    }

    /// Names of all registered natives
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.natives.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.natives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.natives.is_empty()
    }
}

impl fmt::Debug for Linker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("Linker").field("natives", &names).finish()
    }
}
