//! Client-side authentication state.

pub mod manager;
pub mod token;

pub use manager::{ListenerId, Scope, Session, SessionManager, SessionState};
pub use token::{check_token, TokenClaims};
