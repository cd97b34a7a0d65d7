use std::{any::Any, collections::HashMap};

use http::Method;
use smallvec::SmallVec;

use crate::{config::DispatchConfig, view::View};

/// Most requests carry only a handful of parameters.
pub const MAX_INLINE_PARAMS: usize = 8;

pub type ParamVec = SmallVec<[(String, String); MAX_INLINE_PARAMS]>;

/// The part of an inbound request the dispatcher needs.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub route: Option<String>,
    pub action: Option<String>,
    pub params: ParamVec,
}

impl Request {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            route: None,
            action: None,
            params: ParamVec::new(),
        }
    }

    pub fn get(route: &str) -> Self {
        Self::new(Method::GET).route(route)
    }

    pub fn route(mut self, route: &str) -> Self {
        self.route = Some(route.to_string());
        self
    }

    pub fn action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.params.push((name.to_string(), value.to_string()));
        self
    }

    /// Last write wins for repeated names.
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .rfind(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Splits `/route/action?query`. Without a path route, the configured
    /// route/action query parameters are used instead.
    pub fn from_uri(method: Method, uri: &str, cfg: &DispatchConfig) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (uri, None),
        };
        let mut req = Self::new(method);
        if let Some(q) = query {
            for pair in q.split('&').filter(|p| !p.is_empty()) {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                req.params.push((decode(k), decode(v)));
            }
        }
        let mut segs = path.split('/').filter(|s| !s.is_empty());
        req.route = segs.next().map(decode);
        req.action = segs.next().map(decode);
        if req.route.is_none() {
            req.route = req.get_param(&cfg.route_param).map(str::to_string);
        }
        if req.action.is_none() {
            req.action = req.get_param(&cfg.action_param).map(str::to_string);
        }
        req
    }
}

fn decode(s: &str) -> String {
    let plus = s.replace('+', " ");
    match urlencoding::decode(&plus) {
        Ok(d) => d.into_owned(),
        Err(_) => plus,
    }
}

/// Per-request state: the request itself, a request-scoped attribute store and
/// the current result. Owned by one dispatch and never shared.
pub struct RequestContext {
    request: Request,
    attributes: HashMap<String, Box<dyn Any + Send + Sync>>,
    result: Option<View>,
    resolved_action: Option<&'static str>,
}

impl RequestContext {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            attributes: HashMap::new(),
            result: None,
            resolved_action: None,
        }
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.request.get_param(name)
    }

    pub fn attribute<T: Any + Send + Sync>(&self, name: &str) -> Option<&T> {
        self.attributes.get(name).and_then(|v| v.downcast_ref::<T>())
    }

    pub fn set_attribute<T: Any + Send + Sync>(&mut self, name: &str, value: T) {
        self.attributes.insert(name.to_string(), Box::new(value));
    }

    pub fn remove_attribute(&mut self, name: &str) -> bool {
        self.attributes.remove(name).is_some()
    }

    /// Result of the action (or short-circuiting before-hook); visible to the after-hook.
    pub fn result(&self) -> Option<&View> {
        self.result.as_ref()
    }

    /// Method name of the action selected for this request.
    pub fn resolved_action(&self) -> Option<&'static str> {
        self.resolved_action
    }

    pub(crate) fn set_result(&mut self, view: Option<View>) {
        self.result = view;
    }

    pub(crate) fn take_result(&mut self) -> Option<View> {
        self.result.take()
    }

    pub(crate) fn set_resolved_action(&mut self, method: &'static str) {
        self.resolved_action = Some(method);
    }
}
