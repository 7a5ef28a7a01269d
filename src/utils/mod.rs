pub mod constants;
pub mod domain;
pub mod process;

pub use constants::*;
pub use domain::{cache_key, validate_domain};
