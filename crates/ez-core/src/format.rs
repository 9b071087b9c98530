//! Colored status lines
//!
//! Status goes to stderr so stdout stays clean for machine-readable output
//! (env lines, YAML, JSON).

use colored::Colorize;

/// Print an info line in green
pub fn info(msg: &str) {
    eprintln!("{}", format!("[INFO] {msg}").green());
}

/// Print a warning line in yellow
pub fn warn(msg: &str) {
    eprintln!("{}", format!("[WARN] {msg}").yellow());
}

/// Print an error line in red
pub fn error(msg: &str) {
    eprintln!("{}", format!("[ERROR] {msg}").red());
}

/// Print a success message with checkmark
pub fn success(msg: &str) {
    eprintln!("{}", format!("✓ {msg}").green());
}
