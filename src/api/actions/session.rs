//! Sign-in and sign-out

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::api::action::{Action, NoParams, WebBinding};
use crate::api::connection::Connection;
use crate::api::middleware::{Middleware, SESSION_USER_KEY};
use crate::domain::action::{Field, Schema};
use crate::domain::TypedError;
use crate::infrastructure::user::UserService;

use super::signed_in;

#[derive(Debug, Deserialize)]
pub struct SessionCreateParams {
    email: String,
    password: String,
}

/// Sign in
#[derive(Debug)]
pub struct SessionCreate {
    users: Arc<UserService>,
}

impl SessionCreate {
    pub fn new(users: Arc<UserService>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Action for SessionCreate {
    type Params = SessionCreateParams;

    fn name(&self) -> &'static str {
        "session:create"
    }

    fn description(&self) -> &'static str {
        "Sign in with email and password"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::put("/session"))
    }

    fn input_schema(&self) -> Option<Schema> {
        Some(
            Schema::new()
                .field(Field::string("email").email().message("This is not a valid email"))
                .field(Field::string("password").secret().min_length(1)),
        )
    }

    async fn run(
        &self,
        params: SessionCreateParams,
        connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let user = self
            .users
            .authenticate(&params.email, &params.password)
            .await?
            .ok_or_else(|| {
                TypedError::param_validation("password", None, "Email or password is incorrect")
            })?;

        let mut data = Map::new();
        data.insert(SESSION_USER_KEY.to_string(), Value::String(user.id().to_string()));
        let session = connection.update_session(Value::Object(data)).await?;

        Ok(json!({ "user": user, "session": session }))
    }
}

/// Sign out
#[derive(Debug, Clone, Copy)]
pub struct SessionDestroy;

#[async_trait]
impl Action for SessionDestroy {
    type Params = NoParams;

    fn name(&self) -> &'static str {
        "session:destroy"
    }

    fn description(&self) -> &'static str {
        "Sign out and forget the session"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::delete("/session"))
    }

    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        signed_in()
    }

    async fn run(&self, _params: NoParams, connection: &mut Connection) -> Result<Value, TypedError> {
        connection.destroy_session().await?;

        Ok(json!({ "success": true }))
    }
}
