//! Per-request resolution and invocation against a frozen registry.
//!
//! A dispatch walks: resolve handler → resolve action → instantiate (+ init) →
//! before-hooks → action → after-hooks → done. Interceptor before-hooks run
//! outermost first ahead of the controller's own, and their after-hooks run in
//! reverse after it. Any failure on the way ends the request in the error
//! handler; nothing is retried and no fault is dropped.
use std::{any::Any, sync::Arc};

use async_trait::async_trait;
use http::Method;

use crate::{
    descriptor::{ActionDescriptor, HandlerDescriptor, InterceptorDescriptor},
    error::{DispatchError, InvocationFault, Phase, ResolutionError, Result},
    invoke::{self, Instance},
    registry::{ControllerRegistry, RegistrySlot},
    request::{Request, RequestContext},
    view::{Renderer, View},
};

/// Builds handler instances; dependency injection lives behind this seam.
#[async_trait]
pub trait InstanceProvider: Send + Sync {
    async fn instantiate(&self, handler: &HandlerDescriptor) -> anyhow::Result<Instance>;

    async fn instantiate_interceptor(&self, interceptor: &InterceptorDescriptor) -> anyhow::Result<Instance> {
        Ok((interceptor.factory)())
    }
}

/// Calls the factory recorded for the class (its `Default` impl for macro-declared controllers).
#[derive(Debug, Default, Clone, Copy)]
pub struct FactoryInstances;

#[async_trait]
impl InstanceProvider for FactoryInstances {
    async fn instantiate(&self, handler: &HandlerDescriptor) -> anyhow::Result<Instance> {
        Ok((handler.factory)())
    }
}

/// Turns a request-time failure into the response the client gets.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, error: DispatchError) -> View;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn handle(&self, error: DispatchError) -> View {
        match &error {
            DispatchError::Resolution(ResolutionError::VerbNotAllowed { .. }) => {
                View::error(405, &error.to_string())
            }
            DispatchError::Resolution(_) => View::error(404, &error.to_string()),
            DispatchError::Binding { .. } => View::error(400, &error.to_string()),
            DispatchError::Invocation(_) => View::error(500, "internal server error"),
        }
    }
}

/// Picks the handler for `route`, falling back to the application default.
pub fn resolve_handler<'r>(
    registry: &'r ControllerRegistry,
    route: Option<&str>,
) -> Result<&'r Arc<HandlerDescriptor>, ResolutionError> {
    if let Some(h) = route.and_then(|r| registry.lookup_handler(r)) {
        return Ok(h);
    }
    match registry.application_default_handler() {
        Some(h) => {
            tracing::debug!(route = ?route, fallback = %h.route, "using default controller");
            Ok(h)
        }
        None => Err(ResolutionError::NoSuchHandler {
            route: route.unwrap_or_default().to_string(),
        }),
    }
}

/// Picks exactly one action of `handler` for `action` under `verb`.
///
/// A named action answers if it has no verb restriction and `verb` is one of
/// the registry's default verbs, or if its restriction lists `verb`. Otherwise
/// the verb-specific action for `verb` answers, then the default action. The
/// default action answers the default verbs only, and a verb-restricted action
/// never answers a verb it does not list.
pub fn resolve_action<'h>(
    registry: &ControllerRegistry,
    handler: &'h HandlerDescriptor,
    action: Option<&str>,
    verb: &Method,
) -> Result<&'h ActionDescriptor, ResolutionError> {
    let miss = match action.filter(|a| !a.is_empty()) {
        Some(name) => match handler.action(name) {
            Some(a) if a.answers(verb, registry.default_verbs()) => return Ok(a),
            Some(_) => ResolutionError::VerbNotAllowed {
                route: handler.route.clone(),
                action: name.to_string(),
                verb: verb.clone(),
            },
            None => ResolutionError::UnknownAction {
                route: handler.route.clone(),
                action: name.to_string(),
                verb: verb.clone(),
            },
        },
        None => ResolutionError::NoDefaultAction {
            route: handler.route.clone(),
            verb: verb.clone(),
        },
    };
    if let Some(a) = handler.verb_action(verb) {
        return Ok(a);
    }
    if let Some(a) = registry
        .lookup_default_action(handler)
        .filter(|a| a.answers(verb, registry.default_verbs()))
    {
        if action.is_some() {
            tracing::debug!(route = %handler.route, reason = %miss, "falling back to default action");
        }
        return Ok(a);
    }
    Err(miss)
}

/// Cheap to clone; every clone reads the same frozen registry.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<ControllerRegistry>,
    instances: Arc<dyn InstanceProvider>,
    errors: Arc<dyn ErrorHandler>,
}

impl Dispatcher {
    pub fn new(registry: Arc<ControllerRegistry>) -> Self {
        Self {
            registry,
            instances: Arc::new(FactoryInstances),
            errors: Arc::new(DefaultErrorHandler),
        }
    }

    pub(crate) fn from_parts(
        registry: Arc<ControllerRegistry>,
        instances: Arc<dyn InstanceProvider>,
        errors: Arc<dyn ErrorHandler>,
    ) -> Self {
        Self {
            registry,
            instances,
            errors,
        }
    }

    /// `None` until a registry has been installed in `slot`.
    pub fn from_slot(slot: &RegistrySlot) -> Option<Self> {
        slot.load().map(Self::new)
    }

    pub fn with_instances<P: InstanceProvider + 'static>(mut self, provider: P) -> Self {
        self.instances = Arc::new(provider);
        self
    }

    pub fn with_error_handler<E: ErrorHandler + 'static>(mut self, handler: E) -> Self {
        self.errors = Arc::new(handler);
        self
    }

    pub fn registry(&self) -> &Arc<ControllerRegistry> {
        &self.registry
    }

    /// Dispatches and hands the final view to `renderer`.
    pub async fn serve<R: Renderer>(&self, request: Request, renderer: &R) -> R::Output {
        renderer.render(self.dispatch(request).await)
    }

    /// Request-time errors never escape: they become the error handler's view.
    pub async fn dispatch(&self, request: Request) -> View {
        let mut ctx = RequestContext::new(request);
        match self.try_dispatch(&mut ctx).await {
            Ok(view) => view,
            Err(e) => {
                match &e {
                    DispatchError::Invocation(f) => {
                        tracing::error!(route = %f.route, method = f.method, phase = %f.phase, error = ?f.source, "dispatch failed")
                    }
                    other => tracing::warn!(error = %other, "request not dispatched"),
                }
                self.errors.handle(e)
            }
        }
    }

    pub async fn try_dispatch(&self, ctx: &mut RequestContext) -> Result<View> {
        let verb = ctx.request().method.clone();
        let handler = resolve_handler(&self.registry, ctx.request().route.as_deref())?.clone();
        let action = resolve_action(&self.registry, &handler, ctx.request().action.as_deref(), &verb)?;
        ctx.set_resolved_action(action.method);

        let mut instance = self.instances.instantiate(&handler).await.map_err(|source| InvocationFault {
            phase: Phase::Instantiate,
            route: handler.route.clone(),
            method: handler.type_name,
            source,
        })?;
        let mut chain = Vec::with_capacity(handler.interceptors.len());
        for i in &handler.interceptors {
            let inst = self.instances.instantiate_interceptor(i).await.map_err(|source| InvocationFault {
                phase: Phase::Instantiate,
                route: handler.route.clone(),
                method: i.type_name,
                source,
            })?;
            chain.push((i, inst));
        }
        let target: &mut (dyn Any + Send) = &mut *instance;

        if let Some(init) = &handler.init {
            run_phase(Phase::Init, &handler, init, target, ctx).await?;
        }
        let mut result = None;
        for (i, inst) in chain.iter_mut() {
            let Some(before) = &i.before else { continue };
            result = run_phase(Phase::Before, &handler, before, &mut **inst, ctx).await?;
            if result.is_some() {
                tracing::debug!(route = %handler.route, interceptor = i.type_name, hook = before.method, "before-action short-circuited");
                break;
            }
        }
        if result.is_none() {
            if let Some(before) = &handler.before {
                result = run_phase(Phase::Before, &handler, before, target, ctx).await?;
                if result.is_some() {
                    tracing::debug!(route = %handler.route, hook = before.method, "before-action short-circuited");
                }
            }
        }
        if result.is_none() {
            result = run_phase(Phase::Action, &handler, action, target, ctx).await?;
        }
        ctx.set_result(result);
        if let Some(after) = &handler.after {
            if let Some(v) = run_phase(Phase::After, &handler, after, target, ctx).await? {
                ctx.set_result(Some(v));
            }
        }
        for (i, inst) in chain.iter_mut().rev() {
            let Some(after) = &i.after else { continue };
            if let Some(v) = run_phase(Phase::After, &handler, after, &mut **inst, ctx).await? {
                ctx.set_result(Some(v));
            }
        }
        Ok(ctx.take_result().unwrap_or_else(View::no_content))
    }
}

async fn run_phase(
    phase: Phase,
    handler: &HandlerDescriptor,
    action: &ActionDescriptor,
    target: &mut (dyn Any + Send),
    ctx: &mut RequestContext,
) -> Result<Option<View>> {
    let args = invoke::bind(&action.params, ctx.request()).map_err(|source| DispatchError::Binding {
        route: handler.route.clone(),
        method: action.method,
        source,
    })?;
    (action.invoke)(target, ctx, args).await.map_err(|source| {
        DispatchError::from(InvocationFault {
            phase,
            route: handler.route.clone(),
            method: action.method,
            source,
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        controller::{ControllerClass, MethodMeta, Role},
        invoke::{Args, InvokeFuture, Outcome},
        registry::RegistryBuilder,
    };

    fn unit() -> Instance {
        Box::new(())
    }

    fn nop<'a>(_t: &'a mut (dyn Any + Send), _c: &'a mut RequestContext, _a: Args) -> InvokeFuture<'a> {
        Box::pin(async { Outcome::Ok(None) })
    }

    fn action(ident: &'static str, verbs: Vec<Method>) -> MethodMeta {
        MethodMeta::new(ident, nop).role(Role::Action { name: None, verbs })
    }

    fn registry(with_default: bool) -> ControllerRegistry {
        let mut c = ControllerClass::new("H", unit)
            .route("h")
            .method(action("a", vec![]))
            .method(action("b", vec![Method::TRACE]));
        if with_default {
            c = c.method(MethodMeta::new("dflt", nop).role(Role::DefaultAction));
        }
        RegistryBuilder::new().build([c]).unwrap()
    }

    fn pick(reg: &ControllerRegistry, action: Option<&str>, verb: Method) -> std::result::Result<&'static str, ResolutionError> {
        let h = reg.lookup_handler("h").unwrap();
        resolve_action(reg, h, action, &verb).map(|a| a.method)
    }

    #[test]
    fn unrestricted_action_answers_default_verbs() {
        let reg = registry(false);
        assert_eq!(pick(&reg, Some("a"), Method::GET), Ok("a"));
        assert_eq!(pick(&reg, Some("a"), Method::POST), Ok("a"));
    }

    #[test]
    fn restricted_action_needs_exact_verb() {
        let reg = registry(true);
        assert_eq!(pick(&reg, Some("b"), Method::TRACE), Ok("b"));
        assert_eq!(pick(&reg, Some("b"), Method::GET), Ok("dflt"));
    }

    #[test]
    fn verb_mismatch_and_unknown_name_are_distinct() {
        let reg = registry(false);
        assert!(matches!(
            pick(&reg, Some("b"), Method::GET),
            Err(ResolutionError::VerbNotAllowed { .. })
        ));
        assert!(matches!(
            pick(&reg, Some("zzz"), Method::GET),
            Err(ResolutionError::UnknownAction { .. })
        ));
        assert!(matches!(
            pick(&reg, None, Method::GET),
            Err(ResolutionError::NoDefaultAction { .. })
        ));
        assert!(matches!(
            pick(&reg, Some("a"), Method::DELETE),
            Err(ResolutionError::VerbNotAllowed { .. })
        ));
    }

    #[test]
    fn verb_action_is_default_for_its_verb_only() {
        let reg = RegistryBuilder::new()
            .build([ControllerClass::new("H", unit)
                .route("h")
                .method(MethodMeta::new("dflt", nop).role(Role::DefaultAction))
                .method(MethodMeta::new("trace", nop).role(Role::VerbAction(Method::TRACE)))])
            .unwrap();
        assert_eq!(pick(&reg, None, Method::TRACE), Ok("trace"));
        assert_eq!(pick(&reg, None, Method::GET), Ok("dflt"));
        assert_eq!(pick(&reg, Some("nope"), Method::TRACE), Ok("trace"));
    }

    #[test]
    fn default_action_answers_default_verbs_only() {
        let reg = RegistryBuilder::new()
            .build([ControllerClass::new("H", unit)
                .route("h")
                .method(MethodMeta::new("dflt", nop).role(Role::DefaultAction))])
            .unwrap();
        assert_eq!(pick(&reg, None, Method::POST), Ok("dflt"));
        assert!(matches!(
            pick(&reg, None, Method::DELETE),
            Err(ResolutionError::NoDefaultAction { .. })
        ));
        assert!(matches!(
            pick(&reg, Some("zzz"), Method::TRACE),
            Err(ResolutionError::UnknownAction { .. })
        ));
    }

    #[test]
    fn empty_action_name_means_none() {
        let reg = registry(true);
        assert_eq!(pick(&reg, Some(""), Method::GET), Ok("dflt"));
    }

    #[test]
    fn unknown_route_without_default_is_no_such_handler() {
        let reg = registry(false);
        assert_eq!(
            resolve_handler(&reg, Some("x")).unwrap_err(),
            ResolutionError::NoSuchHandler { route: "x".into() }
        );
        assert!(resolve_handler(&reg, None).is_err());
    }

    #[test]
    fn unknown_route_falls_back_to_application_default() {
        let reg = RegistryBuilder::new()
            .build([
                ControllerClass::new("H", unit).route("h"),
                ControllerClass::new("D", unit).route("d").application_default(),
            ])
            .unwrap();
        assert_eq!(resolve_handler(&reg, Some("x")).unwrap().route, "d");
        assert_eq!(resolve_handler(&reg, None).unwrap().route, "d");
        assert_eq!(resolve_handler(&reg, Some("h")).unwrap().route, "h");
    }

    #[test]
    fn default_error_handler_status_mapping() {
        let h = DefaultErrorHandler;
        let v = h.handle(ResolutionError::NoSuchHandler { route: "x".into() }.into());
        assert_eq!(v.status, 404);
        let v = h.handle(
            ResolutionError::VerbNotAllowed {
                route: "x".into(),
                action: "a".into(),
                verb: Method::GET,
            }
            .into(),
        );
        assert_eq!(v.status, 405);
        let v = h.handle(
            InvocationFault {
                phase: Phase::Action,
                route: "x".into(),
                method: "a",
                source: anyhow::anyhow!("secret"),
            }
            .into(),
        );
        assert_eq!(v.status, 500);
        assert!(!format!("{:?}", v.body).contains("secret"));
    }
}
