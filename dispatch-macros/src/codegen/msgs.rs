// Compile-time diagnostics of the macro codegen layer.

pub(super) const ERR_CONTROLLER_TARGET: &str = "#[controller] only supports struct or impl blocks";
pub(super) const ERR_CONTROLLER_ARG: &str =
    "#[controller] accepts a route string, `route = \"...\"`, `default` and `interceptors(...)`";
pub(super) const ERR_INTERCEPTOR_ARG: &str = "#[interceptor] does not take arguments";
pub(super) const ERR_CONTROLLER_ROUTE_DUP: &str = "#[controller] route given more than once";
pub(super) const ERR_CONTROLLER_GENERIC: &str = "#[controller] does not support generic controllers";
pub(super) const ERR_CONTROLLER_TRAIT_IMPL: &str =
    "#[controller] goes on an inherent impl block, not a trait impl";

pub(super) const ERR_ACTION_ARG: &str =
    "#[action] accepts a name string, `name = \"...\"` and `verbs(...)`";
pub(super) const ERR_ACTION_NAME_DUP: &str = "#[action] name given more than once";
pub(super) const ERR_VERB_ACTION_ARG: &str = "#[verb_action] requires exactly one verb, e.g. #[verb_action(TRACE)]";
pub(super) const ERR_NO_ARGS: &str = "this attribute does not take arguments";
pub(super) const ERR_UNKNOWN_VERB: &str =
    "unknown HTTP verb; expected one of GET, POST, PUT, DELETE, HEAD, OPTIONS, CONNECT, PATCH, TRACE";

pub(super) const ERR_RECEIVER: &str = "controller methods must take &self or &mut self";
pub(super) const ERR_CTX_DUP: &str = "at most one &RequestContext / &mut RequestContext parameter";
pub(super) const ERR_PARAM_PAT: &str = "controller method parameters must be plain identifiers";
pub(super) const ERR_PARAM_REF: &str =
    "request parameters are taken by value (String, i64, bool, Option<T>, ...); only RequestContext may be borrowed";
