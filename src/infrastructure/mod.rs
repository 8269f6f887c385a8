pub mod auth;
pub mod config;
pub mod logging;
pub mod persistence;
