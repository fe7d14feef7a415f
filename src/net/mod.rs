//! Networking modules for the REST envelope API and the chat event stream.
//!
//! SYSTEM CONTEXT
//! ==============
//! `http` owns the intercepted client, `interceptor` the request/response
//! hooks, `api` the per-endpoint bindings, `sse` the chat stream decoder,
//! and `envelope`/`types` the shared wire schema.

pub mod api;
pub mod envelope;
pub mod http;
pub mod interceptor;
pub mod sse;
pub mod types;
