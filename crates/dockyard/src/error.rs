//! Error types for the plugin host.

use dockyard_archive::{ExtractionError, ValidationError};

use crate::module::ModuleId;

/// Errors raised by the host type table
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type already registered: {0}")]
    AlreadyRegistered(String),

    #[error("Type not found: {0}")]
    UnknownType(String),

    #[error("Type {0} cannot be extended")]
    NotAnObjectType(String),
}

/// Errors raised while turning symbol bytes into a definition
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("Invalid symbol manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Type not found: {0}")]
    UnknownType(String),

    #[error("Cyclic supertype chain through {0}")]
    CyclicSupertype(String),

    #[error("Type {0} cannot be extended")]
    NotAnObjectType(String),
}

/// Errors raised while loading a single archive
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Failed to define symbol {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },
}

/// Reasons a function marked as an event handler is skipped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedHandler {
    #[error("instance functions cannot receive events")]
    InstanceFunction,

    #[error("handler is not public")]
    NotPublic,

    #[error("handler must accept exactly one parameter (was {0})")]
    Arity(usize),

    #[error("handler may not take a primitive argument ({0})")]
    PrimitiveParameter(String),

    #[error("handler may not take an array argument ({0})")]
    ArrayParameter(String),

    #[error("unknown parameter type {0}")]
    UnknownParameterType(String),

    #[error("no native function linked ({0})")]
    Unlinked(String),
}

/// Errors returned from posting an event
#[derive(Debug, thiserror::Error)]
pub enum PostError {
    #[error("Cannot post a null event")]
    NullEvent,

    #[error("Event handler {handler} failed: {source}")]
    Handler {
        handler: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Violations of the one-handle-per-module invariant
///
/// These indicate a defect in the host itself and are never recovered.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConstructionError {
    #[error("Module {0} already has a handle")]
    HandleAlreadyIssued(ModuleId),

    #[error("Module {0} is already registered")]
    DuplicateModule(ModuleId),
}
