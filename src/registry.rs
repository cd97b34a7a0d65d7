//! Registry builder, the frozen controller registry and the slot it is published through.
use std::{
    collections::HashMap,
    sync::{Arc, LazyLock},
};

use arc_swap::ArcSwapOption;
use http::Method;

use crate::{
    config::DispatchConfig,
    controller::{AttributeMetadata, ControllerClass, InterceptorClass, MetadataSource, MethodMeta, Role},
    descriptor::{ActionDescriptor, HandlerDescriptor, InterceptorDescriptor},
    error::{BuildErrors, ConfigurationError},
};

/// One-shot build pass over a candidate class set.
pub struct RegistryBuilder<M: MetadataSource = AttributeMetadata> {
    metadata: M,
    default_verbs: Vec<Method>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self {
            metadata: AttributeMetadata,
            default_verbs: DispatchConfig::default().default_verbs,
        }
    }
}

impl<M: MetadataSource> RegistryBuilder<M> {
    pub fn with_metadata<N: MetadataSource>(self, metadata: N) -> RegistryBuilder<N> {
        RegistryBuilder {
            metadata,
            default_verbs: self.default_verbs,
        }
    }

    pub fn default_verbs(mut self, verbs: Vec<Method>) -> Self {
        self.default_verbs = verbs;
        self
    }

    /// All-or-nothing: every violation in the set is reported, and no registry
    /// exists unless there are none. A class whose route is empty or taken is
    /// still checked in full; it is just never registered.
    pub fn build<I>(&self, classes: I) -> Result<ControllerRegistry, BuildErrors>
    where
        I: IntoIterator<Item = ControllerClass>,
    {
        let mut errors = Vec::new();
        let mut by_route: HashMap<String, HandlerDescriptor> = HashMap::new();
        let mut app_default: Option<(String, &'static str)> = None;

        for class in classes {
            tracing::debug!(class = class.type_name, "found controller class");
            let route = self.metadata.route_variable_of(&class).into_owned();
            let mut registrable = true;
            if route.is_empty() {
                errors.push(ConfigurationError::EmptyRoute {
                    class: class.type_name,
                });
                registrable = false;
            } else if let Some(existing) = by_route.get(&route) {
                errors.push(ConfigurationError::DuplicateRoute {
                    route: route.clone(),
                    class: class.type_name,
                    existing: existing.type_name,
                });
                registrable = false;
            }
            let mut handler = HandlerDescriptor::new(route.clone(), class.type_name, class.factory);
            if self.metadata.is_application_default(&class) {
                match &app_default {
                    Some((_, existing)) => errors.push(ConfigurationError::MultipleDefaultHandlers {
                        class: class.type_name,
                        existing: *existing,
                    }),
                    None if registrable => {
                        handler.application_default = true;
                        app_default = Some((route.clone(), class.type_name));
                    }
                    None => {}
                }
            }
            for m in &class.methods {
                self.add_method(&mut handler, m, &mut errors);
            }
            for i in self.metadata.interceptors_of(&class) {
                let resolved = self.resolve_interceptor(class.type_name, i, &mut errors);
                handler.interceptors.push(resolved);
            }
            if !registrable {
                continue;
            }
            tracing::debug!(
                route = %route,
                class = class.type_name,
                actions = handler.actions.len(),
                verb_actions = handler.verb_actions.len(),
                interceptors = handler.interceptors.len(),
                "registered controller"
            );
            by_route.insert(route, handler);
        }

        if !errors.is_empty() {
            return Err(BuildErrors(errors));
        }
        let by_route: HashMap<String, Arc<HandlerDescriptor>> = by_route
            .into_iter()
            .map(|(k, v)| (k, Arc::new(v)))
            .collect();
        let application_default = app_default.and_then(|(route, _)| by_route.get(&route).cloned());
        Ok(ControllerRegistry {
            by_route,
            application_default,
            default_verbs: self.default_verbs.clone(),
        })
    }

    fn add_method(
        &self,
        handler: &mut HandlerDescriptor,
        m: &MethodMeta,
        errors: &mut Vec<ConfigurationError>,
    ) {
        let class = handler.type_name;
        let role = match self.metadata.roles_of(m) {
            [] => return,
            [role] => role,
            many => {
                errors.push(ConfigurationError::MultipleRoles {
                    class,
                    method: m.ident,
                    roles: many.iter().map(Role::label).collect::<Vec<_>>().join(", "),
                });
                return;
            }
        };
        let descriptor = |name: String, verbs: Vec<Method>| ActionDescriptor {
            name,
            method: m.ident,
            params: m.params.clone(),
            verbs,
            invoke: m.invoke,
        };
        match role {
            Role::Action { name, verbs } => {
                let name = name.clone().unwrap_or_else(|| m.ident.to_string());
                if name.is_empty() {
                    errors.push(ConfigurationError::EmptyActionName {
                        class,
                        method: m.ident,
                    });
                    return;
                }
                if let Some(first) = handler.actions.get(&name) {
                    errors.push(ConfigurationError::DuplicateAction {
                        class,
                        action: name,
                        first: first.method,
                        second: m.ident,
                    });
                    return;
                }
                tracing::debug!(route = %handler.route, action = %name, method = m.ident, "mapped action");
                handler
                    .actions
                    .insert(name.clone(), descriptor(name, verbs.clone()));
            }
            Role::VerbAction(verb) => {
                if let Some(first) = handler.verb_actions.get(verb) {
                    errors.push(ConfigurationError::DuplicateVerbAction {
                        class,
                        verb: verb.clone(),
                        first: first.method,
                        second: m.ident,
                    });
                    return;
                }
                handler.verb_actions.insert(
                    verb.clone(),
                    descriptor(m.ident.to_string(), vec![verb.clone()]),
                );
            }
            Role::DefaultAction => set_once(
                &mut handler.default_action,
                descriptor(m.ident.to_string(), Vec::new()),
                class,
                role,
                errors,
            ),
            Role::BeforeHook => set_once(
                &mut handler.before,
                descriptor(m.ident.to_string(), Vec::new()),
                class,
                role,
                errors,
            ),
            Role::AfterHook => set_once(
                &mut handler.after,
                descriptor(m.ident.to_string(), Vec::new()),
                class,
                role,
                errors,
            ),
            Role::Init => set_once(
                &mut handler.init,
                descriptor(m.ident.to_string(), Vec::new()),
                class,
                role,
                errors,
            ),
        }
    }

    fn resolve_interceptor(
        &self,
        class: &'static str,
        interceptor: &InterceptorClass,
        errors: &mut Vec<ConfigurationError>,
    ) -> InterceptorDescriptor {
        let mut desc = InterceptorDescriptor::new(interceptor.type_name, interceptor.factory);
        for m in &interceptor.methods {
            match self.metadata.roles_of(m) {
                [] => {}
                [role @ Role::BeforeHook] => {
                    set_once(&mut desc.before, hook(m), interceptor.type_name, role, errors)
                }
                [role @ Role::AfterHook] => {
                    set_once(&mut desc.after, hook(m), interceptor.type_name, role, errors)
                }
                [role] => errors.push(ConfigurationError::InterceptorRole {
                    class,
                    interceptor: interceptor.type_name,
                    method: m.ident,
                    role: role.label(),
                }),
                many => errors.push(ConfigurationError::MultipleRoles {
                    class: interceptor.type_name,
                    method: m.ident,
                    roles: many.iter().map(Role::label).collect::<Vec<_>>().join(", "),
                }),
            }
        }
        tracing::debug!(class, interceptor = interceptor.type_name, "attached interceptor");
        desc
    }
}

fn hook(m: &MethodMeta) -> ActionDescriptor {
    ActionDescriptor {
        name: m.ident.to_string(),
        method: m.ident,
        params: m.params.clone(),
        verbs: Vec::new(),
        invoke: m.invoke,
    }
}

fn set_once(
    slot: &mut Option<ActionDescriptor>,
    desc: ActionDescriptor,
    class: &'static str,
    role: &Role,
    errors: &mut Vec<ConfigurationError>,
) {
    match slot {
        Some(first) => errors.push(ConfigurationError::DuplicateRole {
            class,
            role: role.label(),
            first: first.method,
            second: desc.method,
        }),
        None => *slot = Some(desc),
    }
}

/// Route variable → handler table. Immutable once built; every read is a plain
/// lookup and needs no synchronization.
#[derive(Debug)]
pub struct ControllerRegistry {
    by_route: HashMap<String, Arc<HandlerDescriptor>>,
    application_default: Option<Arc<HandlerDescriptor>>,
    default_verbs: Vec<Method>,
}

impl ControllerRegistry {
    pub fn lookup_handler(&self, route: &str) -> Option<&Arc<HandlerDescriptor>> {
        self.by_route.get(route)
    }

    /// Fails if `handler` does not belong to this registry; a missing action is `None`.
    pub fn lookup_action<'h>(
        &self,
        handler: &'h HandlerDescriptor,
        action: &str,
    ) -> Result<Option<&'h ActionDescriptor>, ConfigurationError> {
        if !self.contains(handler) {
            return Err(ConfigurationError::UnknownHandler {
                route: handler.route.clone(),
            });
        }
        Ok(handler.action(action))
    }

    pub fn lookup_before_hook<'h>(&self, handler: &'h HandlerDescriptor) -> Option<&'h ActionDescriptor> {
        handler.before.as_ref()
    }

    pub fn lookup_after_hook<'h>(&self, handler: &'h HandlerDescriptor) -> Option<&'h ActionDescriptor> {
        handler.after.as_ref()
    }

    /// Interceptors of `handler`, outermost first.
    pub fn lookup_interceptors<'h>(&self, handler: &'h HandlerDescriptor) -> &'h [InterceptorDescriptor] {
        &handler.interceptors
    }

    pub fn lookup_default_action<'h>(
        &self,
        handler: &'h HandlerDescriptor,
    ) -> Option<&'h ActionDescriptor> {
        handler.default_action.as_ref()
    }

    pub fn application_default_handler(&self) -> Option<&Arc<HandlerDescriptor>> {
        self.application_default.as_ref()
    }

    pub fn default_verbs(&self) -> &[Method] {
        &self.default_verbs
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<HandlerDescriptor>> {
        self.by_route.values()
    }

    pub fn len(&self) -> usize {
        self.by_route.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_route.is_empty()
    }

    fn contains(&self, handler: &HandlerDescriptor) -> bool {
        self.by_route
            .get(&handler.route)
            .is_some_and(|h| std::ptr::eq(Arc::as_ptr(h), handler))
    }
}

/// Single-writer publication point for a built registry: installed once at
/// startup, loaded by readers without locking, cleared at shutdown.
pub struct RegistrySlot {
    inner: ArcSwapOption<ControllerRegistry>,
}

impl Default for RegistrySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistrySlot {
    pub fn new() -> Self {
        Self {
            inner: ArcSwapOption::empty(),
        }
    }

    pub fn install(&self, registry: Arc<ControllerRegistry>) -> Result<(), ConfigurationError> {
        let prev = self
            .inner
            .compare_and_swap(&None::<Arc<ControllerRegistry>>, Some(registry));
        if prev.is_some() {
            return Err(ConfigurationError::AlreadyInstalled);
        }
        tracing::info!("controller registry installed");
        Ok(())
    }

    pub fn load(&self) -> Option<Arc<ControllerRegistry>> {
        self.inner.load_full()
    }

    pub fn is_installed(&self) -> bool {
        self.inner.load().is_some()
    }

    pub fn clear(&self) -> Option<Arc<ControllerRegistry>> {
        let prev = self.inner.swap(None);
        if prev.is_some() {
            tracing::info!("controller registry cleared");
        }
        prev
    }
}

static GLOBAL: LazyLock<RegistrySlot> = LazyLock::new(RegistrySlot::new);

/// The process-wide registry slot.
pub fn global() -> &'static RegistrySlot {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        controller::ControllerClass,
        invoke::{Args, Instance, InvokeFuture, Outcome},
        request::RequestContext,
    };
    use std::{any::Any, borrow::Cow};

    fn unit() -> Instance {
        Box::new(())
    }

    fn nop<'a>(_t: &'a mut (dyn Any + Send), _c: &'a mut RequestContext, _a: Args) -> InvokeFuture<'a> {
        Box::pin(async { Outcome::Ok(None) })
    }

    fn action(ident: &'static str, name: Option<&str>, verbs: Vec<Method>) -> MethodMeta {
        MethodMeta::new(ident, nop).role(Role::Action {
            name: name.map(str::to_string),
            verbs,
        })
    }

    fn class(ty: &'static str, route: &'static str) -> ControllerClass {
        ControllerClass::new(ty, unit).route(route)
    }

    #[test]
    fn builds_lookup_table() {
        let reg = RegistryBuilder::new()
            .build([
                class("A", "a")
                    .method(action("go", None, vec![]))
                    .method(action("trace_it", Some("t"), vec![Method::TRACE]))
                    .method(MethodMeta::new("dflt", nop).role(Role::DefaultAction)),
                class("B", "b").application_default(),
            ])
            .unwrap();
        assert_eq!(reg.len(), 2);
        let a = reg.lookup_handler("a").unwrap();
        assert_eq!(a.type_name, "A");
        assert_eq!(reg.lookup_action(a, "go").unwrap().unwrap().method, "go");
        assert_eq!(reg.lookup_action(a, "t").unwrap().unwrap().verbs, vec![Method::TRACE]);
        assert!(reg.lookup_action(a, "missing").unwrap().is_none());
        assert_eq!(reg.lookup_default_action(a).unwrap().method, "dflt");
        assert!(reg.lookup_before_hook(a).is_none());
        assert!(reg.lookup_after_hook(a).is_none());
        assert_eq!(reg.application_default_handler().unwrap().route, "b");
        assert!(reg.lookup_handler("c").is_none());
    }

    #[test]
    fn duplicate_route_fails_whole_build() {
        let err = RegistryBuilder::new()
            .build([class("A", "x"), class("B", "x")])
            .unwrap_err();
        assert_eq!(
            err.0,
            vec![ConfigurationError::DuplicateRoute {
                route: "x".into(),
                class: "B",
                existing: "A",
            }]
        );
    }

    #[test]
    fn second_application_default_rejected() {
        let err = RegistryBuilder::new()
            .build([class("A", "a").application_default(), class("B", "b").application_default()])
            .unwrap_err();
        assert!(matches!(
            err.0.as_slice(),
            [ConfigurationError::MultipleDefaultHandlers { class: "B", existing: "A" }]
        ));
    }

    #[test]
    fn collects_every_violation() {
        let err = RegistryBuilder::new()
            .build([class("A", "a")
                .method(action("one", Some("same"), vec![]))
                .method(action("two", Some("same"), vec![]))
                .method(MethodMeta::new("b1", nop).role(Role::BeforeHook))
                .method(MethodMeta::new("b2", nop).role(Role::BeforeHook))
                .method(MethodMeta::new("v1", nop).role(Role::VerbAction(Method::TRACE)))
                .method(MethodMeta::new("v2", nop).role(Role::VerbAction(Method::TRACE)))
                .method(
                    MethodMeta::new("both", nop)
                        .role(Role::AfterHook)
                        .role(Role::DefaultAction),
                )])
            .unwrap_err();
        assert_eq!(err.len(), 4);
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::DuplicateAction { first: "one", second: "two", .. })));
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::DuplicateRole { role: "before action", .. })));
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::DuplicateVerbAction { .. })));
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::MultipleRoles { method: "both", .. })));
    }

    #[test]
    fn rejected_classes_are_still_checked() {
        let err = RegistryBuilder::new()
            .build([
                class("A", "x"),
                class("B", "x")
                    .application_default()
                    .method(action("one", Some("same"), vec![]))
                    .method(action("two", Some("same"), vec![])),
                class("C", "").method(
                    MethodMeta::new("hook", nop)
                        .role(Role::BeforeHook)
                        .role(Role::AfterHook),
                ),
            ])
            .unwrap_err();
        assert_eq!(err.len(), 4);
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::DuplicateRoute { class: "B", .. })));
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::DuplicateAction { class: "B", .. })));
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::EmptyRoute { class: "C" })));
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::MultipleRoles { class: "C", .. })));
    }

    #[test]
    fn rejected_class_does_not_claim_application_default() {
        let err = RegistryBuilder::new()
            .build([
                class("A", "x"),
                class("B", "x").application_default(),
                class("C", "c").application_default(),
            ])
            .unwrap_err();
        // C is not reported as a second default
        assert_eq!(err.len(), 1);
        assert!(matches!(err.0[0], ConfigurationError::DuplicateRoute { class: "B", .. }));
    }

    #[test]
    fn interceptors_keep_declared_order() {
        let reg = RegistryBuilder::new()
            .build([class("A", "a")
                .interceptor(
                    InterceptorClass::new("Audit", unit)
                        .method(MethodMeta::new("log", nop).role(Role::AfterHook)),
                )
                .interceptor(
                    InterceptorClass::new("Auth", unit)
                        .method(MethodMeta::new("check", nop).role(Role::BeforeHook))
                        .method(MethodMeta::new("helper", nop)),
                )])
            .unwrap();
        let a = reg.lookup_handler("a").unwrap();
        let chain = reg.lookup_interceptors(a);
        assert_eq!(chain.iter().map(|i| i.type_name).collect::<Vec<_>>(), ["Audit", "Auth"]);
        assert!(chain[0].before.is_none());
        assert_eq!(chain[0].after.as_ref().map(|h| h.method), Some("log"));
        assert_eq!(chain[1].before.as_ref().map(|h| h.method), Some("check"));
        assert!(chain[1].after.is_none());
    }

    #[test]
    fn interceptors_take_hooks_only() {
        let bad = InterceptorClass::new("Bad", unit)
            .method(action("act", None, vec![]))
            .method(MethodMeta::new("setup", nop).role(Role::Init))
            .method(MethodMeta::new("b1", nop).role(Role::BeforeHook))
            .method(MethodMeta::new("b2", nop).role(Role::BeforeHook));
        let err = RegistryBuilder::new()
            .build([class("A", "a").interceptor(bad)])
            .unwrap_err();
        assert_eq!(err.len(), 3);
        assert!(err.iter().any(|e| matches!(
            e,
            ConfigurationError::InterceptorRole { class: "A", interceptor: "Bad", method: "act", role: "action" }
        )));
        assert!(err.iter().any(|e| matches!(e, ConfigurationError::InterceptorRole { method: "setup", .. })));
        assert!(err.iter().any(|e| matches!(
            e,
            ConfigurationError::DuplicateRole { class: "Bad", first: "b1", second: "b2", .. }
        )));
    }

    /// Prefixes every route, picks the default by name and hides `_`-methods.
    struct Prefixed;

    impl MetadataSource for Prefixed {
        fn route_variable_of<'a>(&self, class: &'a ControllerClass) -> Cow<'a, str> {
            Cow::Owned(format!("api_{}", AttributeMetadata.route_variable_of(class)))
        }

        fn is_application_default(&self, class: &ControllerClass) -> bool {
            class.type_name == "B"
        }

        fn roles_of<'a>(&self, method: &'a MethodMeta) -> &'a [Role] {
            if method.ident.starts_with('_') {
                &[]
            } else {
                &method.roles
            }
        }
    }

    #[test]
    fn custom_metadata_source_drives_the_build() {
        let reg = RegistryBuilder::new()
            .with_metadata(Prefixed)
            .build([
                class("A", "a")
                    .application_default()
                    .method(action("go", None, vec![]))
                    .method(action("_hidden", None, vec![])),
                class("B", "b"),
            ])
            .unwrap();
        assert!(reg.lookup_handler("a").is_none());
        let a = reg.lookup_handler("api_a").unwrap();
        assert!(reg.lookup_action(a, "go").unwrap().is_some());
        assert!(reg.lookup_action(a, "_hidden").unwrap().is_none());
        assert_eq!(reg.application_default_handler().unwrap().route, "api_b");
        let mut routes: Vec<_> = reg.handlers().map(|h| h.route.as_str()).collect();
        routes.sort_unstable();
        assert_eq!(routes, ["api_a", "api_b"]);
    }

    #[test]
    fn untagged_methods_are_ignored() {
        let reg = RegistryBuilder::new()
            .build([class("A", "a").method(MethodMeta::new("helper", nop))])
            .unwrap();
        assert!(reg.lookup_handler("a").unwrap().actions.is_empty());
    }

    #[test]
    fn lookup_with_foreign_handler_fails_loudly() {
        let r1 = RegistryBuilder::new().build([class("A", "a")]).unwrap();
        let r2 = RegistryBuilder::new().build([class("A", "a")]).unwrap();
        let foreign = r2.lookup_handler("a").unwrap();
        assert_eq!(
            r1.lookup_action(foreign, "x").unwrap_err(),
            ConfigurationError::UnknownHandler { route: "a".into() }
        );
    }

    #[test]
    fn slot_installs_once_and_clears() {
        let slot = RegistrySlot::new();
        assert!(slot.load().is_none());
        let reg = Arc::new(RegistryBuilder::new().build([class("A", "a")]).unwrap());
        slot.install(reg.clone()).unwrap();
        assert!(Arc::ptr_eq(&slot.load().unwrap(), &reg));
        assert_eq!(slot.install(reg.clone()), Err(ConfigurationError::AlreadyInstalled));
        assert!(slot.clear().is_some());
        assert!(!slot.is_installed());
        slot.install(reg).unwrap();
    }
}
