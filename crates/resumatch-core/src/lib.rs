//! # Resumatch Core Library
//!
//! Client-side logic for the Resumatch resume/job-description matching
//! service. The `resumatch` CLI is a thin front end over this crate.
//!
//! ## Architecture
//!
//! - **Session**: a single observable store for the bearer credential,
//!   persisted in a durable or a tab-lived scope and checked for expiry
//! - **HTTP**: a client whose default `Authorization` header follows the
//!   session, with a 401 interception stage that logs out
//! - **API**: typed wrappers over the backend endpoints
//! - **Matcher**: reconciles the server's met/missing verdict with user
//!   corrections and derives a score
//! - **Storage**: TOML configuration and key-value credential scopes
//!
//! ## Key Components
//!
//! - [`SessionManager`]: session store and observer registry
//! - [`ApiClient`]: backend client with the 401 stage
//! - [`MatchReconciler`]: requirement overrides and score
//! - [`App`]: everything above wired together from a [`Config`]

pub mod api;
pub mod app;
pub mod error;
pub mod http;
pub mod matcher;
pub mod router;
pub mod session;
pub mod storage;

pub use api::matching::{AiSuggestion, MatchReport};
pub use api::profile::{Profile, Trend};
pub use api::UploadFile;
pub use app::App;
pub use error::{AuthError, ConfigError, CoreError, StorageError, TransportError, ValidationError};
pub use http::{ApiClient, AuthHeader};
pub use matcher::{MatchReconciler, MatchRequest, MatchSession, Score};
pub use router::{Route, Router};
pub use session::{Scope, Session, SessionManager, SessionState};
pub use storage::{Config, Theme};
