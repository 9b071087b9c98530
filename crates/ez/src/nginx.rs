//! Nginx status reporting

use anyhow::Result;
use colored::Colorize;

use ez_core::exec;

pub fn info() -> Result<()> {
    println!("Nginx configuration management");
    println!();

    // nginx -v reports its version on stderr
    match exec::tool_version("nginx", &["-v"]) {
        Some(version) => println!("{} {}", "ok".green(), version),
        None => println!("{} nginx - not found", "!".yellow()),
    }

    Ok(())
}
