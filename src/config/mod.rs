//! Configuration module
//!
//! Settings for the case table viewer, stored as TOML in the user's config
//! directory.

pub mod config;

pub use config::Config;
