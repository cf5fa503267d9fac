//! Plugin Host
//!
//! The top-level directory of loaded plugins. The host turns filesystem paths
//! into archives, runs each archive through validation, module creation,
//! symbol extraction and definition, and keeps the resulting [`Plugin`]
//! handles so values can be traced back to the plugin that produced them.
//!
//! Per-archive failures are logged and skipped during batch loads. Violations
//! of the one-handle-per-module invariant terminate the process.

mod plugin;

pub use plugin::Plugin;

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use dockyard_archive::{
    Archive, ArchiveLocator, ArchiveValidator, SymbolExtractor, ZipExtractor, ZipValidator,
};
use futures::future::join_all;
use tracing::{debug, error, info};

use crate::config::HostConfig;
use crate::error::{ConstructionError, LoadError, PostError};
use crate::module::{Environment, Module, ModuleId};
use crate::native::Linker;
use crate::symbol::{ManifestDecoder, SymbolDecoder};
use crate::types::TypeTable;
use crate::value::{Object, Provenance};

/// Loads plugin archives and tracks the resulting plugins
pub struct PluginHost {
    config: HostConfig,
    types: Arc<TypeTable>,
    linker: Arc<Linker>,
    decoder: Arc<dyn SymbolDecoder>,
    locator: ArchiveLocator,
    validator: Arc<dyn ArchiveValidator>,
    extractor: Arc<dyn SymbolExtractor>,
    plugins: DashMap<ModuleId, Plugin>,
}

impl Default for PluginHost {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

impl PluginHost {
    /// Create a host using the ZIP collaborators configured by `config`
    pub fn new(config: HostConfig) -> Self {
        Self {
            locator: ArchiveLocator::new(&config.archive.extension),
            validator: Arc::new(ZipValidator::new(&config.archive.extension)),
            extractor: Arc::new(ZipExtractor::new(&config.symbols.extension)),
            types: TypeTable::new_shared(),
            linker: Arc::new(Linker::with_builtins()),
            decoder: Arc::new(ManifestDecoder),
            plugins: DashMap::new(),
            config,
        }
    }

    /// Share a host type table with other hosts or the application
    pub fn with_types(mut self, types: Arc<TypeTable>) -> Self {
        self.types = types;
        self
    }

    /// Replace the natives available to plugin handlers
    pub fn with_linker(mut self, linker: Linker) -> Self {
        self.linker = Arc::new(linker);
        self
    }

    pub fn with_validator(mut self, validator: impl ArchiveValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_extractor(mut self, extractor: impl SymbolExtractor + 'static) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    pub fn with_decoder(mut self, decoder: impl SymbolDecoder + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Host types shared by every plugin
    pub fn types(&self) -> &Arc<TypeTable> {
        &self.types
    }

    pub fn linker(&self) -> &Linker {
        &self.linker
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Loading
    // ─────────────────────────────────────────────────────────────────────────

    /// Load every archive found under `inputs`
    ///
    /// Inputs may be archive files or directories. Archives reached through
    /// several inputs are loaded once. Archives that fail to load are logged
    /// and left out of the result.
    pub fn load<P: AsRef<Path>>(&self, inputs: &[P]) -> Vec<Plugin> {
        let archives = self.locator.locate(inputs);
        debug!("Located {} plugin archive(s)", archives.len());

        let mut loaded = Vec::with_capacity(archives.len());
        for archive in archives {
            match self.load_archive(archive.path()) {
                Ok(plugin) => loaded.push(plugin),
                Err(e) => error!("Failed to load plugin archive {}: {}", archive, e),
            }
        }
        loaded
    }

    /// Load a batch of archives in parallel
    ///
    /// The archive set is computed up front; each archive then loads on the
    /// blocking pool into its own module.
    pub async fn load_concurrent<P: AsRef<Path>>(self: &Arc<Self>, inputs: &[P]) -> Vec<Plugin> {
        let archives = self.locator.locate(inputs);
        debug!("Located {} plugin archive(s)", archives.len());

        let tasks = archives.into_iter().map(|archive| {
            let host = Arc::clone(self);
            tokio::task::spawn_blocking(move || {
                let result = host.load_archive(archive.path());
                (archive, result)
            })
        });

        let mut loaded = Vec::new();
        for joined in join_all(tasks).await {
            match joined {
                Ok((_, Ok(plugin))) => loaded.push(plugin),
                Ok((archive, Err(e))) => {
                    error!("Failed to load plugin archive {}: {}", archive, e)
                }
                Err(e) => error!("Plugin load task failed: {}", e),
            }
        }
        loaded
    }

    /// Load exactly one archive
    pub fn load_archive(&self, path: impl AsRef<Path>) -> Result<Plugin, LoadError> {
        let archive = Archive::new(path);
        self.validator.validate(archive.path())?;

        let module = Module::new(archive.path(), self.environment());
        let plugin = Plugin::issue(Arc::clone(&module)).unwrap_or_else(|e| abort(e));

        let extraction = self.extractor.extract(&archive)?;
        module.install(extraction.into_symbols())?;

        match self.plugins.entry(plugin.id()) {
            Entry::Occupied(_) => abort(ConstructionError::DuplicateModule(plugin.id())),
            Entry::Vacant(slot) => {
                slot.insert(plugin.clone());
            }
        }

        info!(
            "Loaded plugin {} from {} ({} symbol(s), {} handler(s))",
            plugin.id(),
            archive,
            module.symbol_names().len(),
            module.handler_count()
        );
        Ok(plugin)
    }

    fn environment(&self) -> Environment {
        Environment {
            types: Arc::clone(&self.types),
            linker: Arc::clone(&self.linker),
            decoder: Arc::clone(&self.decoder),
            handler_attribute: self.config.handlers.attribute.clone(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Directory
    // ─────────────────────────────────────────────────────────────────────────

    /// All loaded plugins, ordered by archive path
    pub fn plugins(&self) -> Vec<Plugin> {
        let mut plugins: Vec<_> = self.plugins.iter().map(|p| p.value().clone()).collect();
        plugins.sort_by(|a, b| a.archive().cmp(b.archive()));
        plugins
    }

    pub fn get(&self, id: ModuleId) -> Option<Plugin> {
        self.plugins.get(&id).map(|p| p.value().clone())
    }

    /// Stop tracking a plugin
    ///
    /// The module is reclaimed once the returned handle, its clones and every
    /// value the plugin produced are dropped.
    pub fn unload(&self, id: ModuleId) -> Option<Plugin> {
        let (_, plugin) = self.plugins.remove(&id)?;
        info!("Unloaded plugin {}", plugin);
        Some(plugin)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// The loaded plugin that produced `value`, if this host tracks it
    pub fn resolve_owner(&self, value: &dyn Provenance) -> Option<Plugin> {
        let module = value.owner()?;
        self.get(module.id())
    }

    /// Post an event to every loaded plugin
    ///
    /// Stops at the first handler failure.
    pub fn broadcast(&self, event: &Object) -> Result<(), PostError> {
        for plugin in self.plugins() {
            plugin.post(event)?;
        }
        Ok(())
    }
}

/// Report a construction invariant violation and terminate
fn abort(e: ConstructionError) -> ! {
    error!("Fatal: {}", e);
    std::process::exit(1);
}
