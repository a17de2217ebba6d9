//! Session domain - server-side session state keyed by an opaque id

mod entity;
mod store;

pub use entity::SessionData;
pub use store::SessionStore;
