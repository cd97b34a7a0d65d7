//! Candidate controller classes and the metadata the registry builder reads from them.
//!
//! `#[controller]` on a struct implements [`ControllerType`]; on an impl block it
//! implements [`ControllerMethods`] and submits a [`ControllerRegistration`] through
//! `inventory`. Classes can also be described by hand with [`ControllerClass::new`].
//!
//! `#[interceptor]` does the same for [`InterceptorClass`] but registers nothing:
//! an interceptor only runs for the controllers that list it.
use std::{any::Any, borrow::Cow, fmt};

use http::Method;

use crate::invoke::{Instance, InvokeFn, ParamSpec};

/// The role a tagged method plays in its controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Role {
    /// Named action; `name: None` means the method name. Empty `verbs` means the
    /// configured default verbs.
    Action {
        name: Option<String>,
        verbs: Vec<Method>,
    },
    /// Unnamed action answering exactly one verb; the default for that verb.
    VerbAction(Method),
    DefaultAction,
    BeforeHook,
    AfterHook,
    Init,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Action { .. } => "action",
            Role::VerbAction(_) => "verb action",
            Role::DefaultAction => "default action",
            Role::BeforeHook => "before action",
            Role::AfterHook => "after action",
            Role::Init => "init",
        }
    }
}

/// One declared method of a candidate class.
#[derive(Clone)]
pub struct MethodMeta {
    pub ident: &'static str,
    pub roles: Vec<Role>,
    pub params: Vec<ParamSpec>,
    pub invoke: InvokeFn,
}

impl MethodMeta {
    pub fn new(ident: &'static str, invoke: InvokeFn) -> Self {
        Self {
            ident,
            roles: Vec::new(),
            params: Vec::new(),
            invoke,
        }
    }

    pub fn role(mut self, role: Role) -> Self {
        self.roles.push(role);
        self
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }
}

impl fmt::Debug for MethodMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMeta")
            .field("ident", &self.ident)
            .field("roles", &self.roles)
            .field("params", &self.params)
            .finish()
    }
}

/// A candidate handler class as the build pass sees it.
#[derive(Clone)]
pub struct ControllerClass {
    pub type_name: &'static str,
    pub route: Option<&'static str>,
    pub application_default: bool,
    pub factory: fn() -> Instance,
    pub methods: Vec<MethodMeta>,
    /// Wrapping interceptors, outermost first.
    pub interceptors: Vec<InterceptorClass>,
}

impl ControllerClass {
    pub fn new(type_name: &'static str, factory: fn() -> Instance) -> Self {
        Self {
            type_name,
            route: None,
            application_default: false,
            factory,
            methods: Vec::new(),
            interceptors: Vec::new(),
        }
    }

    pub fn route(mut self, route: &'static str) -> Self {
        self.route = Some(route);
        self
    }

    pub fn application_default(mut self) -> Self {
        self.application_default = true;
        self
    }

    pub fn method(mut self, m: MethodMeta) -> Self {
        self.methods.push(m);
        self
    }

    pub fn interceptor(mut self, i: InterceptorClass) -> Self {
        self.interceptors.push(i);
        self
    }

    /// The class as declared through `#[controller]` on both struct and impl.
    pub fn of<T: ControllerType + ControllerMethods>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            route: T::route_variable(),
            application_default: T::is_application_default(),
            factory: T::instantiate,
            methods: T::methods(),
            interceptors: T::interceptors(),
        }
    }
}

impl fmt::Debug for ControllerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerClass")
            .field("type_name", &self.type_name)
            .field("route", &self.route)
            .field("application_default", &self.application_default)
            .field("methods", &self.methods)
            .field(
                "interceptors",
                &self.interceptors.iter().map(|i| i.type_name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A type whose before/after hooks wrap every action of the controllers listing it.
/// Only [`Role::BeforeHook`] and [`Role::AfterHook`] are meaningful on its methods.
#[derive(Clone)]
pub struct InterceptorClass {
    pub type_name: &'static str,
    pub factory: fn() -> Instance,
    pub methods: Vec<MethodMeta>,
}

impl InterceptorClass {
    pub fn new(type_name: &'static str, factory: fn() -> Instance) -> Self {
        Self {
            type_name,
            factory,
            methods: Vec::new(),
        }
    }

    pub fn method(mut self, m: MethodMeta) -> Self {
        self.methods.push(m);
        self
    }

    /// The class as declared through `#[interceptor]` on both struct and impl.
    pub fn of<T: InterceptorType + ControllerMethods>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            factory: T::instantiate,
            methods: T::methods(),
        }
    }
}

impl fmt::Debug for InterceptorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorClass")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Handler-level metadata, implemented by `#[controller]` on a struct.
///
/// `Sync` is required because an async `&self` method keeps `&Self` inside its
/// future, and invocation futures are `Send`.
pub trait ControllerType: Any + Send + Sync {
    fn route_variable() -> Option<&'static str>;
    fn is_application_default() -> bool;
    fn instantiate() -> Instance;
    fn interceptors() -> Vec<InterceptorClass> {
        Vec::new()
    }
}

/// Implemented by `#[interceptor]` on a struct.
pub trait InterceptorType: Any + Send + Sync {
    fn instantiate() -> Instance;
}

/// Method-level metadata, implemented by `#[controller]` or `#[interceptor]` on an impl block.
pub trait ControllerMethods {
    fn methods() -> Vec<MethodMeta>;
}

pub struct ControllerRegistration {
    pub class: fn() -> ControllerClass,
}

inventory::collect!(ControllerRegistration);

/// Every controller declared with `#[controller]` in the final binary.
pub fn discovered() -> Vec<ControllerClass> {
    inventory::iter::<ControllerRegistration>
        .into_iter()
        .map(|reg| (reg.class)())
        .collect()
}

/// The abstract view of class metadata the registry builder consumes.
pub trait MetadataSource {
    fn route_variable_of<'a>(&self, class: &'a ControllerClass) -> Cow<'a, str>;
    fn is_application_default(&self, class: &ControllerClass) -> bool;
    fn roles_of<'a>(&self, method: &'a MethodMeta) -> &'a [Role];

    /// Interceptors wrapping `class`, outermost first.
    fn interceptors_of<'a>(&self, class: &'a ControllerClass) -> &'a [InterceptorClass] {
        &class.interceptors
    }
}

/// Reads what the attributes recorded. An undeclared route variable is the
/// snake_case form of the type's own name.
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeMetadata;

impl MetadataSource for AttributeMetadata {
    fn route_variable_of<'a>(&self, class: &'a ControllerClass) -> Cow<'a, str> {
        match class.route {
            Some(r) => Cow::Borrowed(r),
            None => Cow::Owned(snake_case(short_type_name(class.type_name))),
        }
    }

    fn is_application_default(&self, class: &ControllerClass) -> bool {
        class.application_default
    }

    fn roles_of<'a>(&self, method: &'a MethodMeta) -> &'a [Role] {
        &method.roles
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

fn snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for c in s.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    out
}
