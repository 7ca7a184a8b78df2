//! Shared types, error model, and configuration for examplegen.
//!
//! This crate is the foundation depended on by all other examplegen crates.
//! It provides:
//! - [`ExampleGenError`], the unified error type
//! - Domain types ([`Category`], [`DiscoveredItem`], [`Inventory`])
//! - Configuration ([`GeneratorConfig`], [`DiscoveryConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    CONFIG_FILE_NAME, CategoryConfig, CiConfig, DeploymentsConfig, DiscoveryConfig,
    GeneratorConfig, KernelSpec, NotebookConfig, config_file_path, init_config, load_config,
    load_config_from, validate_config,
};
pub use error::{ExampleGenError, Result};
pub use types::{Category, DiscoveredItem, Inventory};
