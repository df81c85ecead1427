pub mod account;
pub mod auth;
pub mod config;
pub mod matching;
pub mod profile;
pub mod theme;
