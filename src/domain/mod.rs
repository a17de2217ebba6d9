//! Domain layer - Core types, errors and storage abstractions

pub mod action;
pub mod agent;
pub mod cache;
pub mod error;
pub mod session;
pub mod storage;
pub mod user;

pub use action::{ErrorKind, TypedError};
pub use agent::{Agent, AgentChanges};
pub use error::DomainError;
pub use session::{SessionData, SessionStore};
pub use user::User;
