//! Action registry indexed by name and by HTTP route

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::Method;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use super::action::{Action, ActionEntry};

/// Errors raised while building the registry at startup
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Action '{0}' is already registered")]
    DuplicateName(String),

    #[error("Route {method} {path} is already bound to action '{existing}'")]
    DuplicateRoute {
        method: Method,
        path: String,
        existing: String,
    },

    #[error("Invalid route '{path}' for action '{action}': {message}")]
    InvalidRoute {
        action: String,
        path: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

impl Segment {
    fn same_shape(&self, other: &Segment) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Param(_), Self::Param(_)) => true,
            _ => false,
        }
    }
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: String,
    segments: Vec<Segment>,
    action: Arc<ActionEntry>,
}

impl Route {
    /// Captured params when `path` matches segment for segment
    fn capture(&self, path: &[&str]) -> Option<Map<String, Value>> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = Map::new();

        for (segment, part) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(literal) if literal == part => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), Value::String((*part).to_string()));
                }
            }
        }

        Some(params)
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn parse_route(action: &str, path: &str) -> Result<Vec<Segment>, RegistryError> {
    split_path(path)
        .into_iter()
        .map(|part| match part.strip_prefix(':') {
            Some("") => Err(RegistryError::InvalidRoute {
                action: action.to_string(),
                path: path.to_string(),
                message: "empty param name".to_string(),
            }),
            Some(name) => Ok(Segment::Param(name.to_string())),
            None => Ok(Segment::Literal(part.to_string())),
        })
        .collect()
}

/// Every registered action. Built once at startup, read-only afterwards.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    actions: HashMap<&'static str, Arc<ActionEntry>>,
    routes: Vec<Route>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action; names and (method, path) pairs must be unique
    pub fn register<A: Action>(&mut self, action: A) -> Result<(), RegistryError> {
        self.insert(ActionEntry::new(action))
    }

    fn insert(&mut self, entry: ActionEntry) -> Result<(), RegistryError> {
        if self.actions.contains_key(entry.name()) {
            return Err(RegistryError::DuplicateName(entry.name().to_string()));
        }

        let entry = Arc::new(entry);

        if let Some(binding) = entry.web_binding() {
            let segments = parse_route(entry.name(), binding.path())?;

            if let Some(existing) = self.routes.iter().find(|route| {
                route.method == binding.method()
                    && route.segments.len() == segments.len()
                    && route
                        .segments
                        .iter()
                        .zip(&segments)
                        .all(|(a, b)| a.same_shape(b))
            }) {
                return Err(RegistryError::DuplicateRoute {
                    method: binding.method().clone(),
                    path: binding.path().to_string(),
                    existing: existing.action.name().to_string(),
                });
            }

            self.routes.push(Route {
                method: binding.method().clone(),
                path: binding.path().to_string(),
                segments,
                action: entry.clone(),
            });
        }

        debug!(action = entry.name(), "Registered action");
        self.actions.insert(entry.name(), entry);
        Ok(())
    }

    /// Look up an action by name, for WebSocket frames
    pub fn get(&self, name: &str) -> Option<Arc<ActionEntry>> {
        self.actions.get(name).cloned()
    }

    /// Match an HTTP request path (relative to `/api`) against bound routes.
    ///
    /// Routes are tried in registration order; the first match wins.
    pub fn resolve_http(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(Arc<ActionEntry>, Map<String, Value>)> {
        let parts = split_path(path);

        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                route
                    .capture(&parts)
                    .map(|params| (route.action.clone(), params))
            })
    }

    /// `(method, path, action)` for every bound route
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str, &str)> {
        self.routes
            .iter()
            .map(|route| (&route.method, route.path.as_str(), route.action.name()))
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::action::{NoParams, WebBinding};
    use crate::api::connection::Connection;
    use crate::domain::TypedError;
    use async_trait::async_trait;
    use serde_json::json;

    struct Named {
        name: &'static str,
        binding: Option<WebBinding>,
    }

    fn action(name: &'static str, binding: Option<WebBinding>) -> Named {
        Named { name, binding }
    }

    #[async_trait]
    impl Action for Named {
        type Params = NoParams;

        fn name(&self) -> &'static str {
            self.name
        }

        fn web_binding(&self) -> Option<WebBinding> {
            self.binding.clone()
        }

        async fn run(&self, _: NoParams, _: &mut Connection) -> Result<Value, TypedError> {
            Ok(json!({}))
        }
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = ActionRegistry::new();
        registry.register(action("agent:view", None)).unwrap();

        let err = registry.register(action("agent:view", None)).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateName("agent:view".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_route_rejected() {
        let mut registry = ActionRegistry::new();
        registry
            .register(action("agent:view", Some(WebBinding::get("/agent/:id"))))
            .unwrap();

        let err = registry
            .register(action("agent:show", Some(WebBinding::get("/agent/:agentId"))))
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateRoute { ref existing, .. } if existing == "agent:view"));

        registry
            .register(action("agent:edit", Some(WebBinding::post("/agent/:id"))))
            .unwrap();
    }

    #[test]
    fn test_invalid_route_rejected() {
        let mut registry = ActionRegistry::new();

        let err = registry
            .register(action("broken", Some(WebBinding::get("/agent/:"))))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidRoute { .. }));
    }

    #[test]
    fn test_resolve_http_captures_params() {
        let mut registry = ActionRegistry::new();
        registry
            .register(action("agent:list", Some(WebBinding::get("/agents"))))
            .unwrap();
        registry
            .register(action("agent:view", Some(WebBinding::get("/agent/:id"))))
            .unwrap();

        let (entry, params) = registry.resolve_http(&Method::GET, "agent/abc").unwrap();
        assert_eq!(entry.name(), "agent:view");
        assert_eq!(Value::Object(params), json!({"id": "abc"}));

        let (entry, params) = registry.resolve_http(&Method::GET, "/agents/").unwrap();
        assert_eq!(entry.name(), "agent:list");
        assert!(params.is_empty());

        assert!(registry.resolve_http(&Method::DELETE, "/agents").is_none());
        assert!(registry.resolve_http(&Method::GET, "/agent/abc/extra").is_none());
        assert!(registry.resolve_http(&Method::GET, "/agent").is_none());
    }

    #[test]
    fn test_get_by_name() {
        let mut registry = ActionRegistry::new();
        registry.register(action("status", None)).unwrap();

        assert!(registry.get("status").is_some());
        assert!(registry.get("missing").is_none());
        assert!(registry.routes().next().is_none());
    }
}
