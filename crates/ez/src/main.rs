//! ez - EZ Infrastructure Tools
//!
//! Modern infrastructure management from one CLI: SOPS/Age secrets,
//! Kubernetes contexts, Helm deployments, and Nginx configuration.
//! Encryption, decryption, and deployment are delegated to the wrapped
//! binaries; this tool owns argument parsing, subprocess invocation, and
//! output shaping.

mod cli;
mod deploy;
mod k8s;
mod keypath;
mod nginx;
mod render;
mod secrets;

use clap::Parser;
use ez_core::format;
use tracing_subscriber::EnvFilter;

use cli::Cli;

fn main() {
    // Logs go to stderr; stdout carries decrypted output
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = cli::run(cli) {
        format::error(&format!("{err:#}"));
        std::process::exit(1);
    }
}
