//! # zerocode-client
//!
//! Client core for the zero-code app platform: users manage apps generated
//! from prompts, chat with the code-generation backend over server-sent
//! events, and administer users/apps behind role-gated routes.
//!
//! This crate contains the intercepted HTTP wrapper, the typed endpoint
//! bindings, the process-wide session store, and the navigation guard that
//! runs before every in-app route transition.
//!
//! CONTROL FLOW
//! ============
//! `NavigationGuard` populates the `SessionStore` on first navigation, the
//! store calls the "current user" binding, and every binding goes through
//! `ApiClient`, whose response interceptors may force a login redirect
//! independently of the guard.

pub mod config;
pub mod error;
pub mod guard;
pub mod nav;
pub mod net;
pub mod state;
pub mod telemetry;

pub use config::ClientConfig;
pub use error::ApiError;
pub use guard::{GuardDecision, NavigationGuard, RouteRule};
pub use nav::{HeadlessNavigator, Navigator, Notifier, TracingNotifier};
pub use net::http::ApiClient;
pub use state::session::{Session, SessionSource, SessionStore};
