//! Dispatcher - validate, run middleware, run the action, log the invocation

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde_json::Value;
use tracing::{error, info};

use crate::domain::{ErrorKind, TypedError};

use super::action::ActionEntry;
use super::connection::{Connection, Transport};

/// Transport-specific sink for the outcome of one invocation
pub trait Reply {
    type Output;

    fn respond(&self, connection: &Connection, payload: Value) -> Self::Output;

    fn fail(&self, connection: &Connection, error: TypedError) -> Self::Output;
}

/// One structured log line per invocation. Secret params are already redacted.
#[derive(Debug, Clone)]
pub struct InvocationLog {
    pub action: String,
    pub transport: Transport,
    pub connection_id: String,
    pub outcome: Option<ErrorKind>,
    pub duration: Duration,
    pub params: Value,
}

impl InvocationLog {
    pub fn outcome_str(&self) -> &'static str {
        self.outcome.map_or("ok", |kind| kind.as_str())
    }
}

impl fmt::Display for InvocationLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[action @ {}] {} ({}) {} in {}ms params={}",
            self.transport,
            self.action,
            self.connection_id,
            self.outcome_str(),
            self.duration.as_millis(),
            self.params
        )
    }
}

/// Result of [`Dispatcher::invoke`], before logging
#[derive(Debug)]
pub struct Invocation {
    pub outcome: Result<Value, TypedError>,
    pub log: InvocationLog,
}

#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    hide_stacks: bool,
}

impl Dispatcher {
    /// `hide_stacks` strips error stacks before they reach a transport
    pub fn new(hide_stacks: bool) -> Self {
        Self { hide_stacks }
    }

    /// Resolve-or-fail, run, log and hand the outcome to `reply`
    pub async fn handle<R: Reply>(
        &self,
        action: Option<&ActionEntry>,
        requested: &str,
        connection: &mut Connection,
        reply: &R,
    ) -> R::Output {
        let outcome = match action {
            Some(action) => self.dispatch(action, connection).await,
            None => {
                let log = InvocationLog {
                    action: requested.to_string(),
                    transport: connection.transport(),
                    connection_id: connection.id().to_string(),
                    outcome: Some(ErrorKind::ActionNotFound),
                    duration: Duration::ZERO,
                    params: Value::Null,
                };
                emit(&log);
                Err(TypedError::action_not_found(requested))
            }
        };

        match outcome {
            Ok(payload) => reply.respond(connection, payload),
            Err(error) => reply.fail(connection, error),
        }
    }

    /// Fail an invocation that never reached validation, such as an
    /// unreadable request body, logging it like any other
    pub fn reject<R: Reply>(
        &self,
        action: &ActionEntry,
        connection: &Connection,
        error: TypedError,
        reply: &R,
    ) -> R::Output {
        emit(&InvocationLog {
            action: action.name().to_string(),
            transport: connection.transport(),
            connection_id: connection.id().to_string(),
            outcome: Some(error.kind()),
            duration: Duration::ZERO,
            params: action.redact(connection.raw_params()),
        });

        reply.fail(connection, self.strip(error))
    }

    fn strip(&self, error: TypedError) -> TypedError {
        if self.hide_stacks {
            error.without_stack()
        } else {
            error
        }
    }

    /// Run an action and emit its invocation log line
    pub async fn dispatch(
        &self,
        action: &ActionEntry,
        connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let invocation = self.invoke(action, connection).await;
        emit(&invocation.log);

        invocation.outcome.map_err(|err| self.strip(err))
    }

    /// Validate, run middleware in order, then run the action.
    ///
    /// The first failure short-circuits. A panic inside the action or its
    /// middleware becomes `ACTION_RUN`.
    pub async fn invoke(&self, action: &ActionEntry, connection: &mut Connection) -> Invocation {
        let started = Instant::now();

        let (outcome, params) = match action.validate(connection.raw_params()) {
            Err(err) => (Err(err), action.redact(connection.raw_params())),
            Ok(validated) => {
                let logged = action.redact(validated.as_map());
                let outcome = AssertUnwindSafe(async {
                    for middleware in action.middleware() {
                        middleware.before(connection).await?;
                    }
                    action.run(validated, connection).await
                })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let message = panic_message(panic.as_ref());
                    error!(action = action.name(), "Action panicked: {}", message);
                    Err(TypedError::action_run(format!(
                        "Action '{}' failed unexpectedly",
                        action.name()
                    ))
                    .with_stack(message))
                });
                (outcome, logged)
            }
        };

        let log = InvocationLog {
            action: action.name().to_string(),
            transport: connection.transport(),
            connection_id: connection.id().to_string(),
            outcome: outcome.as_ref().err().map(TypedError::kind),
            duration: started.elapsed(),
            params,
        };

        Invocation { outcome, log }
    }
}

fn emit(log: &InvocationLog) {
    info!(
        target: "agentflow::action",
        action = %log.action,
        transport = %log.transport,
        connection_id = %log.connection_id,
        outcome = log.outcome_str(),
        duration_ms = log.duration.as_millis() as u64,
        "{}",
        log
    );
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
