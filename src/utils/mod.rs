//! Filesystem and hashing helpers shared by the cache and builder modules.

pub mod checksum;
pub mod fs;
