//! Engine configuration.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//! - Validation on load with automatic defaults
//!
//! # Example
//!
//! ```no_run
//! use vpo_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/vpo.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Logs folder: {}", config.settings().paths.logs_folder);
//!
//! config.settings_mut().execution.max_workers = 4;
//! config.update_section(ConfigSection::Execution).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, ExecutionSettings, LanguageSettings, LoggingSettings, PathSettings, Settings,
};
