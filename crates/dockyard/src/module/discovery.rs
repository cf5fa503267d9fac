// Handler Discovery - Finds event handlers in freshly defined symbols
//
// A declared function is an event handler when it carries the configured
// marker attribute. Marked functions that cannot be handlers are logged and
// skipped so one bad declaration never blocks the rest of a load.

use std::sync::Arc;

use tracing::warn;

use crate::error::{DecodeError, MalformedHandler};
use crate::native::NativeFunction;
use crate::symbol::{Definition, FunctionDecl};
use crate::types::{TypeKind, TypeRef};

use super::{Environment, HandlerAdapter};

/// Why a marked function was not turned into an adapter
enum Rejection {
    Malformed(MalformedHandler),
    Decode(DecodeError),
}

impl From<MalformedHandler> for Rejection {
    fn from(e: MalformedHandler) -> Self {
        Rejection::Malformed(e)
    }
}

impl From<DecodeError> for Rejection {
    fn from(e: DecodeError) -> Self {
        Rejection::Decode(e)
    }
}

/// Build adapters for every valid handler declared by `definition`
///
/// `resolve` maps a parameter type name to a type visible from the module,
/// defining pending symbols as needed. Failures to define such a symbol are
/// returned; malformed handlers are only logged.
pub(super) fn discover(
    definition: &Arc<Definition>,
    env: &Environment,
    mut resolve: impl FnMut(&str) -> Result<Option<TypeRef>, DecodeError>,
) -> Result<Vec<Arc<HandlerAdapter>>, DecodeError> {
    let mut adapters = Vec::new();

    for function in definition.functions() {
        if !function.has_attribute(&env.handler_attribute) {
            continue;
        }

        match check(function, env, &mut resolve) {
            Ok((accepts, native)) => {
                adapters.push(Arc::new(HandlerAdapter::new(
                    accepts,
                    Arc::clone(definition),
                    function.name.clone(),
                    native,
                )));
            }
            Err(Rejection::Malformed(reason)) => {
                warn!(
                    "Skipping event handler {}.{}({}) marked with {}: {}",
                    definition.name(),
                    function.name,
                    function.params.join(","),
                    env.handler_attribute,
                    reason
                );
            }
            Err(Rejection::Decode(e)) => return Err(e),
        }
    }

    Ok(adapters)
}

fn check(
    function: &FunctionDecl,
    env: &Environment,
    resolve: &mut impl FnMut(&str) -> Result<Option<TypeRef>, DecodeError>,
) -> Result<(TypeRef, Arc<dyn NativeFunction>), Rejection> {
    if function.instance {
        return Err(MalformedHandler::InstanceFunction.into());
    }
    if !function.is_public() {
        return Err(MalformedHandler::NotPublic.into());
    }

    let [param] = function.params.as_slice() else {
        return Err(MalformedHandler::Arity(function.params.len()).into());
    };
    if param.ends_with("[]") {
        return Err(MalformedHandler::ArrayParameter(param.clone()).into());
    }

    let accepts = resolve(param.as_str())?
        .ok_or_else(|| MalformedHandler::UnknownParameterType(param.clone()))?;
    match accepts.kind() {
        TypeKind::Object => {}
        TypeKind::Primitive => {
            return Err(MalformedHandler::PrimitiveParameter(param.clone()).into());
        }
        TypeKind::Array => return Err(MalformedHandler::ArrayParameter(param.clone()).into()),
    }

    let native = function
        .native
        .as_deref()
        .and_then(|name| env.linker.get(name))
        .ok_or_else(|| {
            let name = function.native.as_deref().unwrap_or("none");
            MalformedHandler::Unlinked(name.to_string())
        })?;

    Ok((accepts, native))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::Linker;
    use crate::symbol::{ManifestDecoder, Visibility};
    use crate::types::{ROOT_TYPE, TypeTable};

    fn environment() -> Environment {
        let types = TypeTable::new_shared();
        types.register("chat.Message", ROOT_TYPE).unwrap();
        Environment {
            types,
            linker: Arc::new(Linker::with_builtins()),
            decoder: Arc::new(ManifestDecoder),
            handler_attribute: "subscribe".to_string(),
        }
    }

    fn run(env: &Environment, functions: Vec<FunctionDecl>) -> Vec<Arc<HandlerAdapter>> {
        let definition = Arc::new(Definition::new(
            "chat.Listener",
            Arc::clone(env.types.root()),
            functions,
        ));
        discover(&definition, env, |name| Ok(env.types.get(name))).unwrap()
    }

    fn handler(param: &str) -> FunctionDecl {
        FunctionDecl::handler("on_event", "subscribe", param, "std.noop")
    }

    #[test]
    fn test_valid_handler() {
        let env = environment();
        let adapters = run(&env, vec![handler("chat.Message")]);

        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].accepts().name(), "chat.Message");
        assert_eq!(adapters[0].name(), "chat.Listener.on_event");
    }

    #[test]
    fn test_unmarked_functions_are_ignored() {
        let env = environment();
        let plain = FunctionDecl::new("helper")
            .with_visibility(Visibility::Public)
            .with_param("chat.Message")
            .with_native("std.noop");
        let other_marker = FunctionDecl::handler("on_event", "listen", "chat.Message", "std.noop");

        assert!(run(&env, vec![plain, other_marker]).is_empty());
    }

    #[test]
    fn test_malformed_handlers_are_skipped() {
        let env = environment();
        let functions = vec![
            handler("chat.Message").with_instance(true),
            handler("chat.Message").with_visibility(Visibility::Private),
            handler("chat.Message").with_param("string"),
            FunctionDecl::new("no_params")
                .with_attribute("subscribe")
                .with_visibility(Visibility::Public)
                .with_native("std.noop"),
            handler("i64"),
            handler("string[]"),
            handler("chat.Missing"),
            FunctionDecl::new("unlinked")
                .with_attribute("subscribe")
                .with_visibility(Visibility::Public)
                .with_param("chat.Message"),
            FunctionDecl::handler("bad_link", "subscribe", "chat.Message", "std.missing"),
            handler("string"),
        ];

        let adapters = run(&env, functions);
        assert_eq!(adapters.len(), 1);
        assert_eq!(adapters[0].accepts().name(), "string");
    }

    fn reason(env: &Environment, function: FunctionDecl) -> Option<MalformedHandler> {
        match check(&function, env, &mut |name: &str| Ok(env.types.get(name))) {
            Err(Rejection::Malformed(reason)) => Some(reason),
            _ => None,
        }
    }

    #[test]
    fn test_check_reasons() {
        let env = environment();

        assert_eq!(
            reason(&env, handler("chat.Message").with_instance(true)),
            Some(MalformedHandler::InstanceFunction)
        );
        assert_eq!(
            reason(&env, handler("chat.Message").with_visibility(Visibility::Private)),
            Some(MalformedHandler::NotPublic)
        );
        assert_eq!(
            reason(&env, handler("chat.Message").with_param("string")),
            Some(MalformedHandler::Arity(2))
        );
        assert_eq!(
            reason(&env, handler("f64")),
            Some(MalformedHandler::PrimitiveParameter("f64".to_string()))
        );
        assert_eq!(
            reason(&env, handler("chat.Message[]")),
            Some(MalformedHandler::ArrayParameter("chat.Message[]".to_string()))
        );
        assert_eq!(
            reason(&env, handler("chat.Missing")),
            Some(MalformedHandler::UnknownParameterType("chat.Missing".to_string()))
        );
        assert_eq!(
            reason(&env, FunctionDecl::handler("x", "subscribe", "string", "std.missing")),
            Some(MalformedHandler::Unlinked("std.missing".to_string()))
        );
        assert_eq!(reason(&env, handler("chat.Message")), None);
    }

    #[test]
    fn test_decode_failures_propagate() {
        let env = environment();
        let definition = Arc::new(Definition::new(
            "chat.Listener",
            Arc::clone(env.types.root()),
            vec![handler("chat.Broken")],
        ));

        let result = discover(&definition, &env, |name| {
            Err(DecodeError::UnknownType(name.to_string()))
        });
        assert!(matches!(result, Err(DecodeError::UnknownType(_))));
    }
}
