//! User domain

mod entity;

pub use entity::{normalize_email, User};
