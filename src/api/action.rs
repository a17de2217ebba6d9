//! Action definition and its type-erased registry form

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::domain::action::{Schema, ValidatedParams};
use crate::domain::TypedError;

use super::connection::Connection;
use super::middleware::Middleware;

/// HTTP verb and path an action answers to, relative to `/api`.
///
/// Path segments written as `:name` capture a param.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebBinding {
    method: Method,
    path: String,
}

impl WebBinding {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for WebBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Params type for actions that take no input
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct NoParams {}

/// A named unit of business capability reachable over HTTP and WebSocket.
///
/// `run` receives `Params` deserialized from the schema-validated input; the
/// returned value is sent to the caller as-is.
#[async_trait]
pub trait Action: Send + Sync + 'static {
    type Params: DeserializeOwned + Send;

    /// Unique name, `noun:verb` by convention
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str {
        ""
    }

    fn web_binding(&self) -> Option<WebBinding> {
        None
    }

    /// Run in order before `run`
    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        Vec::new()
    }

    fn input_schema(&self) -> Option<Schema> {
        None
    }

    async fn run(
        &self,
        params: Self::Params,
        connection: &mut Connection,
    ) -> Result<Value, TypedError>;
}

#[async_trait]
trait ErasedRun: Send + Sync {
    async fn run(
        &self,
        params: ValidatedParams,
        connection: &mut Connection,
    ) -> Result<Value, TypedError>;
}

struct Typed<A>(A);

#[async_trait]
impl<A: Action> ErasedRun for Typed<A> {
    async fn run(
        &self,
        params: ValidatedParams,
        connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let params = params.parse::<A::Params>()?;
        self.0.run(params, connection).await
    }
}

/// Registered form of an [`Action`], with everything the dispatcher needs
/// captured once at registration.
pub struct ActionEntry {
    name: &'static str,
    description: &'static str,
    web_binding: Option<WebBinding>,
    middleware: Vec<Arc<dyn Middleware>>,
    schema: Option<Schema>,
    handler: Box<dyn ErasedRun>,
}

impl ActionEntry {
    pub fn new<A: Action>(action: A) -> Self {
        Self {
            name: action.name(),
            description: action.description(),
            web_binding: action.web_binding(),
            middleware: action.middleware(),
            schema: action.input_schema(),
            handler: Box::new(Typed(action)),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn web_binding(&self) -> Option<&WebBinding> {
        self.web_binding.as_ref()
    }

    pub fn middleware(&self) -> &[Arc<dyn Middleware>] {
        &self.middleware
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Validate raw input; actions without a schema receive it unchanged
    pub fn validate(&self, raw: &Map<String, Value>) -> Result<ValidatedParams, TypedError> {
        match &self.schema {
            Some(schema) => schema.validate(raw),
            None => Ok(ValidatedParams::unchecked(raw.clone())),
        }
    }

    /// Params as they may appear in logs
    pub fn redact(&self, params: &Map<String, Value>) -> Value {
        match &self.schema {
            Some(schema) => schema.redact(params),
            None => Value::Object(params.clone()),
        }
    }

    pub async fn run(
        &self,
        params: ValidatedParams,
        connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        self.handler.run(params, connection).await
    }
}

impl fmt::Debug for ActionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let middleware: Vec<&str> = self.middleware.iter().map(|m| m.name()).collect();

        f.debug_struct("ActionEntry")
            .field("name", &self.name)
            .field("web_binding", &self.web_binding)
            .field("middleware", &middleware)
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::connection::test_support::{connection, session_store};
    use crate::domain::action::Field;
    use crate::domain::ErrorKind;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct GreetParams {
        name: String,
        times: i64,
    }

    struct Greet;

    #[async_trait]
    impl Action for Greet {
        type Params = GreetParams;

        fn name(&self) -> &'static str {
            "greet"
        }

        fn web_binding(&self) -> Option<WebBinding> {
            Some(WebBinding::get("/greet/:name"))
        }

        fn input_schema(&self) -> Option<Schema> {
            Some(
                Schema::new()
                    .field(Field::string("name"))
                    .field(Field::integer("times").default_value(1))
                    .field(Field::string("token").optional().secret()),
            )
        }

        async fn run(
            &self,
            params: GreetParams,
            _connection: &mut Connection,
        ) -> Result<Value, TypedError> {
            Ok(json!({ "greeting": format!("hello {}", params.name), "times": params.times }))
        }
    }

    #[tokio::test]
    async fn test_entry_runs_typed_params() {
        let entry = ActionEntry::new(Greet);
        let mut conn = connection(json!({}), session_store());

        let params = entry
            .validate(json!({"name": "ada", "times": "3"}).as_object().unwrap())
            .unwrap();
        let result = entry.run(params, &mut conn).await.unwrap();

        assert_eq!(result, json!({"greeting": "hello ada", "times": 3}));
        assert_eq!(entry.web_binding().unwrap().to_string(), "GET /greet/:name");
    }

    #[tokio::test]
    async fn test_unvalidated_params_that_do_not_fit_fail_as_precondition() {
        let entry = ActionEntry::new(Greet);
        let mut conn = connection(json!({}), session_store());

        let err = entry
            .run(ValidatedParams::unchecked(Map::new()), &mut conn)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ActionParamValidation);
    }

    #[test]
    fn test_redact_uses_schema() {
        let entry = ActionEntry::new(Greet);
        let params = json!({"name": "ada", "token": "hunter2"});

        let redacted = entry.redact(params.as_object().unwrap());
        assert_eq!(redacted, json!({"name": "ada", "token": "[[secret]]"}));
    }
}
