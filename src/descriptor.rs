use std::{collections::HashMap, fmt};

use http::Method;

use crate::invoke::{Instance, InvokeFn, ParamSpec};

/// One invocable method, resolved once at build time.
#[derive(Clone)]
pub struct ActionDescriptor {
    /// Logical action name; the method name for hooks and defaults.
    pub name: String,
    /// The Rust method behind this action.
    pub method: &'static str,
    pub params: Vec<ParamSpec>,
    /// Empty: answers the registry's default verbs.
    pub verbs: Vec<Method>,
    pub invoke: InvokeFn,
}

impl ActionDescriptor {
    /// Whether this action may answer `verb`.
    pub fn answers(&self, verb: &Method, default_verbs: &[Method]) -> bool {
        if self.verbs.is_empty() {
            default_verbs.contains(verb)
        } else {
            self.verbs.contains(verb)
        }
    }
}

impl fmt::Debug for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionDescriptor")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("params", &self.params)
            .field("verbs", &self.verbs)
            .finish()
    }
}

/// Hooks of one interceptor listed by a controller, resolved at build time.
pub struct InterceptorDescriptor {
    pub type_name: &'static str,
    pub before: Option<ActionDescriptor>,
    pub after: Option<ActionDescriptor>,
    pub factory: fn() -> Instance,
}

impl InterceptorDescriptor {
    pub(crate) fn new(type_name: &'static str, factory: fn() -> Instance) -> Self {
        Self {
            type_name,
            before: None,
            after: None,
            factory,
        }
    }
}

impl fmt::Debug for InterceptorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorDescriptor")
            .field("type_name", &self.type_name)
            .field("before", &self.before.as_ref().map(|a| a.method))
            .field("after", &self.after.as_ref().map(|a| a.method))
            .finish()
    }
}

/// The full action/hook/default table of one controller class.
pub struct HandlerDescriptor {
    pub route: String,
    pub type_name: &'static str,
    pub actions: HashMap<String, ActionDescriptor>,
    /// Unnamed verb-restricted actions, at most one per verb.
    pub verb_actions: HashMap<Method, ActionDescriptor>,
    pub before: Option<ActionDescriptor>,
    pub after: Option<ActionDescriptor>,
    pub default_action: Option<ActionDescriptor>,
    pub init: Option<ActionDescriptor>,
    /// Outermost first: before-hooks run in this order, after-hooks in reverse.
    pub interceptors: Vec<InterceptorDescriptor>,
    pub application_default: bool,
    pub factory: fn() -> Instance,
}

impl HandlerDescriptor {
    pub(crate) fn new(route: String, type_name: &'static str, factory: fn() -> Instance) -> Self {
        Self {
            route,
            type_name,
            actions: HashMap::new(),
            verb_actions: HashMap::new(),
            before: None,
            after: None,
            default_action: None,
            init: None,
            interceptors: Vec::new(),
            application_default: false,
            factory,
        }
    }

    pub fn action(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.get(name)
    }

    pub fn verb_action(&self, verb: &Method) -> Option<&ActionDescriptor> {
        self.verb_actions.get(verb)
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("route", &self.route)
            .field("type_name", &self.type_name)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("verb_actions", &self.verb_actions.keys().collect::<Vec<_>>())
            .field("before", &self.before.as_ref().map(|a| a.method))
            .field("after", &self.after.as_ref().map(|a| a.method))
            .field("default_action", &self.default_action.as_ref().map(|a| a.method))
            .field("init", &self.init.as_ref().map(|a| a.method))
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.type_name).collect::<Vec<_>>(),
            )
            .field("application_default", &self.application_default)
            .finish()
    }
}
