//! Modules
//!
//! A [`Module`] is the isolated namespace created for one loaded archive. It
//! owns every definition made from that archive and the handler registry
//! those definitions populate.
//!
//! Definitions are created at most once per name. All define requests for a
//! module go through a single lock, and lazy definitions triggered while
//! resolving a supertype or handler parameter run under that same
//! acquisition.
//!
//! A define request is all-or-nothing. Handler discovery runs only after
//! every definition the request created is complete, and the request's
//! adapters are published together. If any step fails, the definitions the
//! request created are removed again.

mod adapter;
mod discovery;
mod registry;

pub use adapter::HandlerAdapter;
pub use registry::HandlerRegistry;

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use dockyard_archive::SymbolMap;
use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DecodeError, LoadError};
use crate::native::Linker;
use crate::symbol::{Definition, SymbolDecoder};
use crate::types::{TypeInfo, TypeKind, TypeRef, TypeTable};

// ─────────────────────────────────────────────────────────────────────────────
// Module Id
// ─────────────────────────────────────────────────────────────────────────────

/// Process-unique 128-bit module identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(Uuid);

impl ModuleId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Environment
// ─────────────────────────────────────────────────────────────────────────────

/// Host services a module needs while defining symbols
#[derive(Clone)]
pub(crate) struct Environment {
    pub types: Arc<TypeTable>,
    pub linker: Arc<Linker>,
    pub decoder: Arc<dyn SymbolDecoder>,
    pub handler_attribute: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Symbol Table
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SymbolTable {
    /// Definitions created so far; never overwritten
    defined: HashMap<String, Arc<Definition>>,
    /// Raw bytes staged for lazy definition
    pending: BTreeMap<String, Vec<u8>>,
    /// Names currently being defined on this call stack
    in_progress: HashSet<String>,
    /// Definitions created by the current request, awaiting discovery
    undiscovered: VecDeque<Arc<Definition>>,
    /// Names created by the current request, removed if it fails
    created: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Module
// ─────────────────────────────────────────────────────────────────────────────

/// Isolated namespace holding the symbols of one archive
pub struct Module {
    id: ModuleId,
    archive: PathBuf,
    this: Weak<Module>,
    env: Environment,
    symbols: Mutex<SymbolTable>,
    registry: HandlerRegistry,
    handle_issued: AtomicBool,
}

impl Module {
    pub(crate) fn new(archive: impl Into<PathBuf>, env: Environment) -> Arc<Self> {
        let archive = archive.into();
        Arc::new_cyclic(|this| Self {
            id: ModuleId::new(),
            archive,
            this: this.clone(),
            env,
            symbols: Mutex::new(SymbolTable::default()),
            registry: HandlerRegistry::new(),
            handle_issued: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    /// Path of the archive this module was loaded from
    pub fn archive(&self) -> &Path {
        &self.archive
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Number of event handlers registered by this module
    pub fn handler_count(&self) -> usize {
        self.registry.len()
    }

    /// Names of every symbol defined so far, sorted
    pub fn symbol_names(&self) -> Vec<String> {
        let table = self.symbols.lock();
        let mut names: Vec<_> = table.defined.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Define a symbol from raw bytes
    ///
    /// If `name` is already defined the existing definition is returned
    /// unchanged and handler discovery does not run again.
    pub fn define(&self, name: &str, bytes: &[u8]) -> Result<Arc<Definition>, DecodeError> {
        let mut table = self.symbols.lock();
        self.define_request(&mut table, name, bytes)
    }

    /// Look up a symbol, defining it from staged bytes if needed
    pub fn resolve(&self, name: &str) -> Result<Option<Arc<Definition>>, DecodeError> {
        let mut table = self.symbols.lock();
        if let Some(definition) = table.defined.get(name) {
            return Ok(Some(Arc::clone(definition)));
        }
        let Some(bytes) = table.pending.get(name).cloned() else {
            return Ok(None);
        };
        self.define_request(&mut table, name, &bytes).map(Some)
    }

    /// Define every extracted symbol, then drop the raw bytes
    pub(crate) fn install(&self, symbols: SymbolMap) -> Result<(), LoadError> {
        let mut table = self.symbols.lock();
        table.pending.extend(symbols);

        let names: Vec<String> = table.pending.keys().cloned().collect();
        let mut result = Ok(());
        for name in names {
            let Some(bytes) = table.pending.get(&name).cloned() else {
                // Already defined lazily by an earlier symbol
                continue;
            };
            if let Err(source) = self.define_request(&mut table, &name, &bytes) {
                result = Err(LoadError::Decode { name, source });
                break;
            }
        }

        table.pending = BTreeMap::new();
        result
    }

    /// Record that the module's handle has been created
    ///
    /// Returns `false` if a handle already existed.
    pub(crate) fn claim_handle(&self) -> bool {
        !self.handle_issued.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn has_handle(&self) -> bool {
        self.handle_issued.load(Ordering::SeqCst)
    }

    /// Run one define request: create, discover, then publish or roll back
    fn define_request(
        &self,
        table: &mut SymbolTable,
        name: &str,
        bytes: &[u8],
    ) -> Result<Arc<Definition>, DecodeError> {
        let result = self.define_and_discover(table, name, bytes);
        let created = std::mem::take(&mut table.created);
        table.undiscovered.clear();

        match result {
            Ok((definition, adapters)) => {
                for name in &created {
                    table.pending.remove(name);
                }
                self.registry.publish(adapters);
                Ok(definition)
            }
            Err(e) => {
                for name in &created {
                    table.defined.remove(name);
                }
                Err(e)
            }
        }
    }

    fn define_and_discover(
        &self,
        table: &mut SymbolTable,
        name: &str,
        bytes: &[u8],
    ) -> Result<(Arc<Definition>, Vec<Arc<HandlerAdapter>>), DecodeError> {
        let definition = self.define_locked(table, name, bytes)?;

        // Every definition of this request is complete here, so handler
        // parameters may name any of them
        let mut adapters = Vec::new();
        while let Some(next) = table.undiscovered.pop_front() {
            let found =
                discovery::discover(&next, &self.env, |ty| self.resolve_type_locked(table, ty))?;
            if !found.is_empty() {
                debug!(
                    "Discovered {} event handler(s) in {}",
                    found.len(),
                    next.name()
                );
            }
            adapters.extend(found);
        }

        Ok((definition, adapters))
    }

    fn define_locked(
        &self,
        table: &mut SymbolTable,
        name: &str,
        bytes: &[u8],
    ) -> Result<Arc<Definition>, DecodeError> {
        if let Some(definition) = table.defined.get(name) {
            return Ok(Arc::clone(definition));
        }
        if !table.in_progress.insert(name.to_string()) {
            return Err(DecodeError::CyclicSupertype(name.to_string()));
        }
        let result = self.create_definition(table, name, bytes);
        table.in_progress.remove(name);
        let definition = result?;

        table.created.push(name.to_string());
        table.undiscovered.push_back(Arc::clone(&definition));
        Ok(definition)
    }

    fn create_definition(
        &self,
        table: &mut SymbolTable,
        name: &str,
        bytes: &[u8],
    ) -> Result<Arc<Definition>, DecodeError> {
        let manifest = self.env.decoder.decode(name, bytes)?;

        let supertype = match &manifest.extends {
            None => Arc::clone(self.env.types.root()),
            Some(parent) => self
                .resolve_type_locked(table, parent)?
                .ok_or_else(|| DecodeError::UnknownType(parent.clone()))?,
        };
        if supertype.kind() != TypeKind::Object {
            return Err(DecodeError::NotAnObjectType(supertype.name().to_string()));
        }

        let ty = TypeInfo::new(name, TypeKind::Object, Some(supertype), self.this.clone());
        let definition = Arc::new(Definition::new(name, ty, manifest.functions));
        table
            .defined
            .insert(name.to_string(), Arc::clone(&definition));
        debug!("Defined symbol {} in module {}", name, self.id);

        Ok(definition)
    }

    /// Resolve a type name: host types first, then this module's symbols
    fn resolve_type_locked(
        &self,
        table: &mut SymbolTable,
        name: &str,
    ) -> Result<Option<TypeRef>, DecodeError> {
        if let Some(ty) = self.env.types.get(name) {
            return Ok(Some(ty));
        }
        if let Some(definition) = table.defined.get(name) {
            return Ok(Some(Arc::clone(definition.ty())));
        }
        if table.in_progress.contains(name) {
            return Err(DecodeError::CyclicSupertype(name.to_string()));
        }
        match table.pending.get(name).cloned() {
            Some(bytes) => {
                let definition = self.define_locked(table, name, &bytes)?;
                Ok(Some(Arc::clone(definition.ty())))
            }
            None => Ok(None),
        }
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("archive", &self.archive)
            .field("handlers", &self.registry.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::ManifestDecoder;
    use crate::value::Provenance;

    fn environment() -> Environment {
        Environment {
            types: TypeTable::new_shared(),
            linker: Arc::new(Linker::with_builtins()),
            decoder: Arc::new(ManifestDecoder),
            handler_attribute: "subscribe".to_string(),
        }
    }

    fn listener() -> Vec<u8> {
        br#"{
            "functions": [{
                "name": "on_text",
                "attributes": ["subscribe"],
                "visibility": "public",
                "params": ["string"],
                "native": "std.noop"
            }]
        }"#
        .to_vec()
    }

    #[test]
    fn test_define_is_idempotent() {
        let module = Module::new("/plugins/chat.par", environment());

        let first = module.define("chat.Listener", &listener()).unwrap();
        assert_eq!(module.handler_count(), 1);

        let second = module.define("chat.Listener", b"not even json").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(module.handler_count(), 1);
    }

    #[test]
    fn test_definitions_point_back_to_module() {
        let module = Module::new("/plugins/chat.par", environment());
        let definition = module.define("chat.Listener", b"{}").unwrap();

        let owner = definition.owner().unwrap();
        assert_eq!(owner.id(), module.id());
        assert_eq!(definition.ty().supertype().unwrap().name(), "object");
    }

    #[test]
    fn test_install_defines_supertypes_lazily() {
        let module = Module::new("/plugins/chat.par", environment());
        let mut symbols = SymbolMap::new();
        // "a.Message" sorts before "b.Event", so the supertype is defined lazily
        symbols.insert("a.Message".to_string(), br#"{"extends": "b.Event"}"#.to_vec());
        symbols.insert("b.Event".to_string(), b"{}".to_vec());

        module.install(symbols).unwrap();

        assert_eq!(module.symbol_names(), vec!["a.Message", "b.Event"]);
        let message = module.resolve("a.Message").unwrap().unwrap();
        let event = module.resolve("b.Event").unwrap().unwrap();
        assert!(message.ty().is_a(event.ty()));
    }

    #[test]
    fn test_resolve_pending_symbol() {
        let module = Module::new("/plugins/chat.par", environment());
        module.symbols.lock().pending.insert("chat.Event".to_string(), b"{}".to_vec());

        assert!(module.symbol_names().is_empty());
        assert!(module.resolve("chat.Event").unwrap().is_some());
        assert_eq!(module.symbol_names(), vec!["chat.Event"]);
        assert!(module.resolve("chat.Missing").unwrap().is_none());
    }

    #[test]
    fn test_cyclic_supertypes_fail() {
        let module = Module::new("/plugins/chat.par", environment());
        let mut symbols = SymbolMap::new();
        symbols.insert("a.First".to_string(), br#"{"extends": "b.Second"}"#.to_vec());
        symbols.insert("b.Second".to_string(), br#"{"extends": "a.First"}"#.to_vec());

        let result = module.install(symbols);
        assert!(matches!(
            result,
            Err(LoadError::Decode {
                source: DecodeError::CyclicSupertype(_),
                ..
            })
        ));
    }

    #[test]
    fn test_unknown_supertype_fails() {
        let module = Module::new("/plugins/chat.par", environment());
        let result = module.define("chat.Message", br#"{"extends": "chat.Missing"}"#);
        assert!(matches!(result, Err(DecodeError::UnknownType(_))));
    }

    #[test]
    fn test_primitive_supertype_fails() {
        let module = Module::new("/plugins/chat.par", environment());
        let result = module.define("chat.Counter", br#"{"extends": "i64"}"#);
        assert!(matches!(result, Err(DecodeError::NotAnObjectType(_))));
    }

    #[test]
    fn test_same_name_in_two_modules_is_two_types() {
        let env = environment();
        let left = Module::new("/plugins/left.par", env.clone());
        let right = Module::new("/plugins/right.par", env);

        let a = left.define("chat.Event", b"{}").unwrap();
        let b = right.define("chat.Event", b"{}").unwrap();

        assert_ne!(a.ty().id(), b.ty().id());
        assert!(!a.ty().is_a(b.ty()));
        assert_ne!(left.id(), right.id());
    }

    #[test]
    fn test_host_types_shadow_symbols() {
        let module = Module::new("/plugins/chat.par", environment());
        let definition = module.define("string", b"{}").unwrap();
        let message = module
            .define("chat.Message", br#"{"extends": "string"}"#)
            .unwrap();

        let parent = message.ty().supertype().unwrap();
        assert_ne!(parent.id(), definition.ty().id());
        assert!(parent.owner().is_none());
    }

    #[test]
    fn test_concurrent_defines_converge() {
        let module = Module::new("/plugins/chat.par", environment());
        let bytes = listener();

        let definitions: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| module.define("chat.Listener", &bytes).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(definitions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(module.handler_count(), 1);
    }

    fn handler_for(param: &str) -> String {
        serde_json::json!({
            "functions": [{
                "name": "on_event",
                "attributes": ["subscribe"],
                "visibility": "public",
                "params": [param],
                "native": "std.noop"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_supertype_handler_may_take_subtype() {
        for (base, derived) in [("a.Base", "z.Derived"), ("z.Base", "a.Derived")] {
            let module = Module::new("/plugins/chat.par", environment());
            let mut symbols = SymbolMap::new();
            symbols.insert(base.to_string(), handler_for(derived).into_bytes());
            symbols.insert(
                derived.to_string(),
                serde_json::json!({ "extends": base }).to_string().into_bytes(),
            );

            module.install(symbols).unwrap();

            assert_eq!(module.handler_count(), 1, "{derived} extends {base}");
            let derived = module.resolve(derived).unwrap().unwrap();
            let handlers = module.registry().handlers_for(derived.ty());
            assert_eq!(handlers.len(), 1);
        }
    }

    #[test]
    fn test_failed_define_leaves_nothing_behind() {
        let module = Module::new("/plugins/chat.par", environment());
        module
            .symbols
            .lock()
            .pending
            .insert("chat.Broken".to_string(), b"{ not json".to_vec());
        let listener = handler_for("chat.Broken");

        let result = module.define("chat.Listener", listener.as_bytes());
        assert!(matches!(result, Err(DecodeError::Json(_))));
        assert!(module.symbol_names().is_empty());
        assert_eq!(module.handler_count(), 0);

        // Once the parameter type decodes, the same name defines and
        // discovers its handler
        module
            .symbols
            .lock()
            .pending
            .insert("chat.Broken".to_string(), b"{}".to_vec());
        module.define("chat.Listener", listener.as_bytes()).unwrap();
        assert_eq!(module.symbol_names(), vec!["chat.Broken", "chat.Listener"]);
        assert_eq!(module.handler_count(), 1);
    }

    #[test]
    fn test_failed_supertype_rolls_back_lazy_definitions() {
        let module = Module::new("/plugins/chat.par", environment());
        {
            let mut table = module.symbols.lock();
            table
                .pending
                .insert("chat.Event".to_string(), br#"{"extends": "chat.Missing"}"#.to_vec());
            table.pending.insert("chat.Base".to_string(), b"{}".to_vec());
        }

        let result = module.define("chat.Message", br#"{"extends": "chat.Event"}"#);
        assert!(matches!(result, Err(DecodeError::UnknownType(_))));
        assert!(module.symbol_names().is_empty());

        // Staged bytes survive a failed request
        assert!(module.resolve("chat.Base").unwrap().is_some());
    }

    #[test]
    fn test_claim_handle_once() {
        let module = Module::new("/plugins/chat.par", environment());
        assert!(!module.has_handle());
        assert!(module.claim_handle());
        assert!(!module.claim_handle());
        assert!(module.has_handle());
    }
}
