//! AutoDMG cache builder - builds precached macOS images from a Munki repo.
//!
//! This binary resolves a Munki manifest, keeps a local cache of the
//! packages it requires, and drives AutoDMG to build the image.

use autodmg_cache_builder::cli;
use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging, `RUST_LOG` overrides the default
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Run CLI and get exit code
    let exit_code = match cli::run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            e.exit_code()
        }
    };

    process::exit(exit_code);
}
