//! Wire types shared by the HTTP handlers

pub mod error;
