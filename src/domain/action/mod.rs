//! Action domain - typed errors and input schemas shared by every action

mod error;
mod schema;

pub use error::{ErrorEnvelope, ErrorKind, TypedError};
pub use schema::{Constraint, Field, FieldType, Schema, ValidatedParams, SECRET_PLACEHOLDER};
