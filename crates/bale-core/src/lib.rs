//! Core types and configuration for bale.
//!
//! This crate defines the `bale.toml` schema ([`BaleConfig`]), the bundle
//! data model ([`PathMapping`], [`Artifact`], [`CachePolicy`]), ignore rules
//! ([`IgnoreRules`]), and shared error types.

pub mod config;
pub mod error;
pub mod ignore;
pub mod mapping;

pub use config::{BaleConfig, CONFIG_FILE_NAME, FunctionConfig, RevisionConfig};
pub use error::{Error, Result};
pub use ignore::{IGNORE_FILE_NAME, IgnoreRules};
pub use mapping::{Artifact, CachePolicy, PathMapping, append_unique};
