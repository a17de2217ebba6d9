//! Session entity

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::domain::DomainError;

/// Server-side session state referenced by an opaque cookie value.
///
/// `id` is fixed for the lifetime of the session; only `data` changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData<T = Value> {
    id: String,
    cookie_name: String,
    data: T,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<T> SessionData<T> {
    pub fn new(id: impl Into<String>, cookie_name: impl Into<String>, data: T) -> Self {
        let now = Utc::now();

        Self {
            id: id.into(),
            cookie_name: cookie_name.into(),
            data,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Replace the payload, keeping id and creation time
    pub fn replace_data(&mut self, data: T) {
        self.data = data;
        self.updated_at = Utc::now();
    }
}

impl SessionData<Value> {
    /// Deserialize the payload into a concrete type
    pub fn data_as<U: DeserializeOwned>(&self) -> Result<U, DomainError> {
        serde_json::from_value(self.data.clone())
            .map_err(|e| DomainError::internal(format!("Malformed session data: {}", e)))
    }
}
