pub mod client;

pub use client::{detail_message, error_for_response, ApiClient, ApiClientBuilder, AuthHeader, UnauthorizedHook};
