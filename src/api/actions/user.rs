//! Sign-up and the current user

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::action::{Action, NoParams, WebBinding};
use crate::api::connection::Connection;
use crate::api::middleware::{session_user_id, Middleware};
use crate::domain::action::{Field, Schema};
use crate::domain::{DomainError, TypedError};
use crate::infrastructure::user::{CreateUserRequest, UserService};

use super::signed_in;

#[derive(Debug, Deserialize)]
pub struct UserCreateParams {
    name: String,
    email: String,
    password: String,
}

/// Sign up
#[derive(Debug)]
pub struct UserCreate {
    users: Arc<UserService>,
}

impl UserCreate {
    pub fn new(users: Arc<UserService>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Action for UserCreate {
    type Params = UserCreateParams;

    fn name(&self) -> &'static str {
        "user:create"
    }

    fn description(&self) -> &'static str {
        "Create a new user"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::put("/user"))
    }

    fn input_schema(&self) -> Option<Schema> {
        Some(
            Schema::new()
                .field(
                    Field::string("name")
                        .min_length(3)
                        .max_length(256)
                        .message("This field is required and must be at least 3 characters long"),
                )
                .field(
                    Field::string("email")
                        .email()
                        .max_length(256)
                        .message("This is not a valid email"),
                )
                .field(
                    Field::string("password")
                        .secret()
                        .min_length(8)
                        .max_length(256)
                        .message("Password must be at least 8 characters long"),
                ),
        )
    }

    async fn run(
        &self,
        params: UserCreateParams,
        _connection: &mut Connection,
    ) -> Result<Value, TypedError> {
        let user = self
            .users
            .create(CreateUserRequest {
                name: params.name,
                email: params.email,
                password: params.password,
            })
            .await?;

        Ok(json!({ "user": user }))
    }
}

/// The signed-in user
#[derive(Debug)]
pub struct UserView {
    users: Arc<UserService>,
}

impl UserView {
    pub fn new(users: Arc<UserService>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Action for UserView {
    type Params = NoParams;

    fn name(&self) -> &'static str {
        "user:view"
    }

    fn description(&self) -> &'static str {
        "View the signed-in user"
    }

    fn web_binding(&self) -> Option<WebBinding> {
        Some(WebBinding::get("/user"))
    }

    fn middleware(&self) -> Vec<Arc<dyn Middleware>> {
        signed_in()
    }

    async fn run(&self, _params: NoParams, connection: &mut Connection) -> Result<Value, TypedError> {
        let user_id = session_user_id(connection)?;
        let user = self
            .users
            .get(&user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found"))?;

        Ok(json!({ "user": user }))
    }
}
