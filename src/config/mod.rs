//! Configuration module for statekeeper
//!
//! This module provides configuration management including:
//! - Base directory resolution
//! - Settings persistence (app name, store roots, retention)

pub mod paths;
pub mod settings;

pub use paths::StatekeeperPaths;
pub use settings::Settings;
