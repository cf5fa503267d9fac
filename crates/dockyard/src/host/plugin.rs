// Plugin Handle - The externally visible representative of a loaded module
//
// Exactly one handle is issued per module, and only by the host's load
// pipeline. Clones of a handle denote the same plugin.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::Arc;

use crate::dispatch::EventDispatcher;
use crate::error::{ConstructionError, DecodeError, PostError};
use crate::module::{Module, ModuleId};
use crate::symbol::Definition;
use crate::value::{Object, Provenance};

/// Handle to a loaded plugin
#[derive(Clone)]
pub struct Plugin {
    module: Arc<Module>,
}

impl Plugin {
    /// Issue the handle for a freshly created module
    pub(in crate::host) fn issue(module: Arc<Module>) -> Result<Self, ConstructionError> {
        if !module.claim_handle() {
            return Err(ConstructionError::HandleAlreadyIssued(module.id()));
        }
        Ok(Self { module })
    }

    /// The plugin whose module produced `value`
    ///
    /// Returns `None` for host values and for modules that never finished
    /// receiving a handle.
    pub fn context(value: &dyn Provenance) -> Option<Plugin> {
        let module = value.owner()?;
        module.has_handle().then_some(Self { module })
    }

    pub fn id(&self) -> ModuleId {
        self.module.id()
    }

    /// Path of the archive this plugin was loaded from
    pub fn archive(&self) -> &Path {
        self.module.archive()
    }

    /// The isolated namespace behind this handle
    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Look up a symbol defined by this plugin
    pub fn resolve(&self, name: &str) -> Result<Option<Arc<Definition>>, DecodeError> {
        self.module.resolve(name)
    }

    pub fn handler_count(&self) -> usize {
        self.module.handler_count()
    }

    /// Post an event to this plugin's handlers
    ///
    /// Accepts `&Object` or `None`; posting `None` fails with
    /// [`PostError::NullEvent`].
    pub fn post<'a>(&self, event: impl Into<Option<&'a Object>>) -> Result<(), PostError> {
        EventDispatcher::new(self.module.registry()).post(event.into())
    }
}

impl Provenance for Plugin {
    fn owner(&self) -> Option<Arc<Module>> {
        Some(Arc::clone(&self.module))
    }
}

impl PartialEq for Plugin {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for Plugin {}

impl Hash for Plugin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("id", &self.id())
            .field("archive", &self.archive())
            .field("handlers", &self.handler_count())
            .finish()
    }
}

impl fmt::Display for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.archive().display(), self.id())
    }
}
