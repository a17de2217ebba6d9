//! API layer - action framework, HTTP and WebSocket adapters

pub mod action;
pub mod actions;
pub mod connection;
pub mod cookie;
pub mod dispatcher;
pub mod health;
pub mod http;
pub mod middleware;
pub mod registry;
pub mod router;
pub mod state;
pub mod types;
pub mod ws;

pub use action::{Action, ActionEntry, NoParams, WebBinding};
pub use connection::{Connection, SessionChange, Transport};
pub use dispatcher::{Dispatcher, InvocationLog, Reply};
pub use registry::{ActionRegistry, RegistryError};
pub use router::create_router;
pub use state::Server;
