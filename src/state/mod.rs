//! Shared client-side state.
//!
//! DESIGN
//! ======
//! Only the session lives here today; it is an injectable store rather than
//! ambient global state so guards and tests can hold their own instance.

pub mod session;
