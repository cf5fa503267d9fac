//! Event Dispatch
//!
//! Delivers an event to the handlers of one module. The event's runtime type
//! and each of its supertypes are visited in order, most specific first, and
//! every adapter registered for a visited type is invoked.

use tracing::trace;

use crate::error::PostError;
use crate::module::HandlerRegistry;
use crate::types;
use crate::value::Object;

/// Posts events against a single module's handler registry
pub struct EventDispatcher<'a> {
    registry: &'a HandlerRegistry,
}

impl<'a> EventDispatcher<'a> {
    pub fn new(registry: &'a HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Invoke every handler whose declared type is the event's type or one
    /// of its ancestors
    ///
    /// Handlers for a given type run in registration order. The first failing
    /// handler aborts the post; handlers after it are not invoked.
    pub fn post(&self, event: Option<&Object>) -> Result<(), PostError> {
        let event = event.ok_or(PostError::NullEvent)?;

        for ty in types::ancestors(event.ty()) {
            // Snapshot, so handlers published mid-post wait for the next one
            let handlers = self.registry.handlers_for(&ty);
            for handler in handlers {
                trace!("Dispatching {} to {}", event, handler.name());
                handler
                    .invoke(event)
                    .map_err(|source| PostError::Handler {
                        handler: handler.name(),
                        source,
                    })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use anyhow::anyhow;
    use parking_lot::Mutex;

    use crate::module::HandlerAdapter;
    use crate::native::{FnNative, Invocation, NativeFunction};
    use crate::symbol::{Definition, FunctionDecl};
    use crate::types::{ROOT_TYPE, TypeRef, TypeTable};

    fn native<F>(func: F) -> Arc<dyn NativeFunction>
    where
        F: Fn(&Invocation<'_>) -> anyhow::Result<Option<Object>> + Send + Sync + 'static,
    {
        Arc::new(FnNative::new(func))
    }

    fn recording(log: &Arc<Mutex<Vec<String>>>, label: &str) -> Arc<dyn NativeFunction> {
        let log = Arc::clone(log);
        let label = label.to_string();
        native(move |_| {
            log.lock().push(label.clone());
            Ok(None)
        })
    }

    fn adapter(
        accepts: &TypeRef,
        function: &str,
        native: Arc<dyn NativeFunction>,
    ) -> Arc<HandlerAdapter> {
        let definition = Arc::new(Definition::new(
            "chat.Listener",
            Arc::clone(accepts),
            vec![FunctionDecl::new(function)],
        ));
        Arc::new(HandlerAdapter::new(
            Arc::clone(accepts),
            definition,
            function,
            native,
        ))
    }

    #[test]
    fn test_null_event_is_rejected() {
        let registry = HandlerRegistry::new();
        let dispatcher = EventDispatcher::new(&registry);
        assert!(matches!(dispatcher.post(None), Err(PostError::NullEvent)));
    }

    #[test]
    fn test_most_specific_type_first() {
        let types = TypeTable::new();
        let event = types.register("chat.Event", ROOT_TYPE).unwrap();
        let message = types.register("chat.Message", "chat.Event").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let registry = HandlerRegistry::new();
        registry.publish(vec![
            adapter(types.root(), "any", recording(&log, "object")),
            adapter(&event, "on_event", recording(&log, "event")),
            adapter(&message, "on_message", recording(&log, "message")),
            adapter(&event, "on_event_again", recording(&log, "event again")),
        ]);

        let object = types.object("chat.Message", serde_json::Value::Null).unwrap();
        EventDispatcher::new(&registry).post(Some(&object)).unwrap();

        assert_eq!(
            *log.lock(),
            vec!["message", "event", "event again", "object"]
        );
    }

    #[test]
    fn test_supertype_event_skips_subtype_handlers() {
        let types = TypeTable::new();
        let event = types.register("chat.Event", ROOT_TYPE).unwrap();
        let message = types.register("chat.Message", "chat.Event").unwrap();
        let log = Arc::new(Mutex::new(Vec::new()));

        let registry = HandlerRegistry::new();
        registry.publish(vec![
            adapter(&event, "on_event", recording(&log, "event")),
            adapter(&message, "on_message", recording(&log, "message")),
        ]);

        let object = types.object("chat.Event", serde_json::Value::Null).unwrap();
        EventDispatcher::new(&registry).post(Some(&object)).unwrap();

        assert_eq!(*log.lock(), vec!["event"]);
    }

    #[test]
    fn test_no_handlers_is_ok() {
        let types = TypeTable::new();
        let registry = HandlerRegistry::new();
        let dispatcher = EventDispatcher::new(&registry);
        assert!(dispatcher.post(Some(&types.string("ignored"))).is_ok());
    }

    #[test]
    fn test_first_failure_aborts_post() {
        let types = TypeTable::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let string = types.get("string").unwrap();

        let registry = HandlerRegistry::new();
        registry.publish(vec![
            adapter(&string, "first", recording(&log, "first")),
            adapter(&string, "broken", native(|_| Err(anyhow!("boom")))),
            adapter(&string, "last", recording(&log, "last")),
            adapter(types.root(), "root", recording(&log, "root")),
        ]);

        let result = EventDispatcher::new(&registry).post(Some(&types.string("hi")));
        match result {
            Err(PostError::Handler { handler, source }) => {
                assert_eq!(handler, "chat.Listener.broken");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected handler failure, got {other:?}"),
        }
        assert_eq!(*log.lock(), vec!["first"]);
    }
}
