//! Error taxonomy: build-time configuration violations and request-time dispatch failures.
use std::fmt;

use http::Method;
use thiserror::Error;

/// Violations found while building the registry, or a lookup made with a handler
/// that was never registered. Fatal to startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("controller variable `{route}` declared by {class} already exists (first declared by {existing})")]
    DuplicateRoute {
        route: String,
        class: &'static str,
        existing: &'static str,
    },
    #[error("only one controller class can be the application default: {class} conflicts with {existing}")]
    MultipleDefaultHandlers {
        class: &'static str,
        existing: &'static str,
    },
    #[error("{class}::{method} carries more than one role ({roles})")]
    MultipleRoles {
        class: &'static str,
        method: &'static str,
        roles: String,
    },
    #[error("{class}: action `{action}` is declared by both {first} and {second}")]
    DuplicateAction {
        class: &'static str,
        action: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("{class}: {role} is declared by both {first} and {second}")]
    DuplicateRole {
        class: &'static str,
        role: &'static str,
        first: &'static str,
        second: &'static str,
    },
    #[error("{class}: {verb} action is declared by both {first} and {second}")]
    DuplicateVerbAction {
        class: &'static str,
        verb: Method,
        first: &'static str,
        second: &'static str,
    },
    #[error("{class}: interceptor {interceptor}::{method} is a {role}; interceptors only take before and after actions")]
    InterceptorRole {
        class: &'static str,
        interceptor: &'static str,
        method: &'static str,
        role: &'static str,
    },
    #[error("{class}: route variable must not be empty")]
    EmptyRoute { class: &'static str },
    #[error("{class}::{method}: action name must not be empty")]
    EmptyActionName {
        class: &'static str,
        method: &'static str,
    },
    #[error("controller `{route}` was not registered in this registry")]
    UnknownHandler { route: String },
    #[error("a controller registry is already installed in this slot")]
    AlreadyInstalled,
}

/// The structured list of violations produced by a failed build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildErrors(pub Vec<ConfigurationError>);

impl BuildErrors {
    pub fn iter(&self) -> impl Iterator<Item = &ConfigurationError> {
        self.0.iter()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for BuildErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s)", self.0.len())?;
        for e in &self.0 {
            write!(f, "; {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BuildErrors {}

impl From<ConfigurationError> for BuildErrors {
    fn from(e: ConfigurationError) -> Self {
        BuildErrors(vec![e])
    }
}

/// No handler/action could be selected for a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("no controller for `{route}` and no default controller configured")]
    NoSuchHandler { route: String },
    #[error("controller `{route}` has no action `{action}` and no default action answers {verb}")]
    UnknownAction {
        route: String,
        action: String,
        verb: Method,
    },
    #[error("action `{action}` of controller `{route}` does not answer {verb} and no default action answers it")]
    VerbNotAllowed {
        route: String,
        action: String,
        verb: Method,
    },
    #[error("controller `{route}` has no default action answering {verb}")]
    NoDefaultAction { route: String, verb: Method },
}

/// A request parameter could not be bound to a method's declared parameter shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("missing required parameter `{param}`")]
    Missing { param: &'static str },
    #[error("parameter `{param}` is not a valid {expected}: `{value}`")]
    Invalid {
        param: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Which step of the dispatch sequence a fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Instantiate,
    Init,
    Before,
    Action,
    After,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Instantiate => "instantiate",
            Phase::Init => "init",
            Phase::Before => "before-action",
            Phase::Action => "action",
            Phase::After => "after-action",
        };
        f.write_str(s)
    }
}

/// A handler method raised during execution. The original cause is kept as `source`.
#[derive(Debug, Error)]
#[error("{phase} `{method}` of controller `{route}` failed: {source}")]
pub struct InvocationFault {
    pub phase: Phase,
    pub route: String,
    pub method: &'static str,
    #[source]
    pub source: anyhow::Error,
}

/// Every request-time failure. Handed to the error handler, never to the transport.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("controller `{route}`, `{method}`: {source}")]
    Binding {
        route: String,
        method: &'static str,
        #[source]
        source: BindingError,
    },
    #[error(transparent)]
    Invocation(#[from] InvocationFault),
}

impl DispatchError {
    /// The handler's own error, if this is an invocation fault.
    pub fn cause(&self) -> Option<&anyhow::Error> {
        match self {
            DispatchError::Invocation(f) => Some(&f.source),
            _ => None,
        }
    }
}

pub type Result<T = (), E = DispatchError> = std::result::Result<T, E>;
