//! Scout Common - shared configuration, logging, and validation for coin scout.
//!
//! This crate provides:
//! - Configuration types and modular JSON loading
//! - Configuration validation
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod config_loader;
pub mod logging;
pub mod validation;

pub use config::{Config, HttpConfig, ObservabilityConfig};
pub use validation::{Validate, ValidationError, ValidationResult};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, HttpConfig, ObservabilityConfig};
    pub use crate::config_loader::load_modular_config;
    pub use crate::logging::init_logging;
    pub use crate::validation::{Validate, ValidationError};
}
