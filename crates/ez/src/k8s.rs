//! Kubernetes context reporting
//!
//! Read-only kubectl queries: presence, version, current context and
//! namespace. Context switching itself stays with kubectl.

use std::process::Command;

use anyhow::Result;
use colored::Colorize;

use ez_core::exec;

pub fn info() -> Result<()> {
    println!("Kubernetes context management");
    println!();

    match exec::tool_version("kubectl", &["version", "--client"]) {
        Some(version) => {
            println!("{} kubectl ({})", "ok".green(), version);
            match current_context() {
                Some(context) => println!("Current context: {context}"),
                None => println!("Current context: {}", "none".dimmed()),
            }
            println!("Current namespace: {}", current_namespace());
        }
        None => {
            println!("{} kubectl - not found", "!".yellow());
            println!("Install with: brew install kubectl");
        }
    }

    Ok(())
}

/// Active kubeconfig context, if any
pub fn current_context() -> Option<String> {
    let mut cmd = Command::new("kubectl");
    cmd.args(["config", "current-context"]);

    let output = exec::run_capture(cmd, "kubectl").ok()?;
    if !output.status.success() {
        return None;
    }

    let context = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!context.is_empty()).then_some(context)
}

/// Namespace from the active kubeconfig context, `default` when unset or
/// kubectl is unavailable
pub fn current_namespace() -> String {
    let mut cmd = Command::new("kubectl");
    cmd.args([
        "config",
        "view",
        "--minify",
        "--output",
        "jsonpath={..namespace}",
    ]);

    match exec::run_capture(cmd, "kubectl") {
        Ok(output) if output.status.success() => {
            let namespace = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if namespace.is_empty() {
                "default".to_string()
            } else {
                namespace
            }
        }
        _ => "default".to_string(),
    }
}
