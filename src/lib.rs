//! Precached AutoDMG image builder for Munki repositories
//!
//! This library provides the pieces of the `autodmg_cache_build` tool:
//! - Munki manifest and catalog resolution
//! - A local package cache reconciled against the resolved install list
//! - Support packages, the AutoDMG template, and the AutoDMG invocation
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod builder;
pub mod cache;
pub mod cli;
pub mod error;
pub mod munki;
pub mod repo;
pub mod utils;

// Re-export commonly used types
pub use error::{ConfigError, Error, Result};
