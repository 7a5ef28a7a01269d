//! Configuration module for the scraping service
//!
//! Split into the core type, its accessors, a fluent builder and the
//! environment loader.

pub mod builder;
pub mod env;
pub mod getters;
pub mod types;

pub use builder::ServiceConfigBuilder;
pub use types::ServiceConfig;
