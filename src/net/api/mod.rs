//! Typed endpoint bindings, one function per backend operation.
//!
//! Each binding returns the envelope's `data` payload; non-zero result codes
//! come back as `ApiError::Application` / `ApiError::AuthExpired`.

pub mod app;
pub mod chat_history;
pub mod user;
