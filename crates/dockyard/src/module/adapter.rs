//! Handler adapters.

use std::fmt;
use std::sync::Arc;

use anyhow::anyhow;

use crate::native::{Invocation, NativeFunction};
use crate::symbol::Definition;
use crate::types::TypeRef;
use crate::value::Object;

/// Uniform single-argument entry point wrapping one discovered handler
///
/// Adapters are indexed by the exact declared parameter type, so dispatch
/// only ever hands them events of that type or a subtype.
pub struct HandlerAdapter {
    accepts: TypeRef,
    definition: Arc<Definition>,
    function: String,
    native: Arc<dyn NativeFunction>,
}

impl HandlerAdapter {
    pub(crate) fn new(
        accepts: TypeRef,
        definition: Arc<Definition>,
        function: impl Into<String>,
        native: Arc<dyn NativeFunction>,
    ) -> Self {
        Self {
            accepts,
            definition,
            function: function.into(),
            native,
        }
    }

    /// The event type this handler was declared for
    pub fn accepts(&self) -> &TypeRef {
        &self.accepts
    }

    /// `symbol.function` name of the wrapped handler
    pub fn name(&self) -> String {
        format!("{}.{}", self.definition.name(), self.function)
    }

    /// Deliver an event, discarding whatever the handler returns
    pub fn invoke(&self, event: &Object) -> anyhow::Result<()> {
        let event = event.cast(&self.accepts).ok_or_else(|| {
            anyhow!(
                "{} accepts {}, not {}",
                self.name(),
                self.accepts.name(),
                event.ty().name()
            )
        })?;

        let invocation = Invocation {
            definition: &self.definition,
            function: &self.function,
            event,
        };
        self.native.call(&invocation).map(drop)
    }
}

impl fmt::Debug for HandlerAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerAdapter")
            .field("handler", &self.name())
            .field("accepts", &self.accepts.name())
            .finish()
    }
}
