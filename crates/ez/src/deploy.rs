//! Helm chart deployment
//!
//! Wraps `helm upgrade --install` / `helm uninstall` for project charts,
//! layering base values, environment values, and a transient decrypted
//! secrets values file that is removed on every exit path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use tempfile::NamedTempFile;

use ez_core::exec;
use ez_core::format;
use ez_core::ProjectPaths;

use crate::k8s;
use crate::keypath;
use crate::secrets::SecretsStore;

pub fn info() -> Result<()> {
    println!("Helm deployment management");
    println!();

    match exec::tool_version("helm", &["version", "--short"]) {
        Some(version) => println!("{} helm ({})", "ok".green(), version),
        None => {
            println!("{} helm - not found", "!".yellow());
            println!("Install with: brew install helm");
        }
    }

    println!();
    println!("Deploy a chart with: ez helm deploy <project> --environment <env>");

    Ok(())
}

/// Deploy a project Helm chart
pub fn deploy(
    paths: &ProjectPaths,
    project: &str,
    environment: Option<&str>,
    namespace: Option<&str>,
) -> Result<()> {
    let project_dir = paths.root.join(project);
    let chart_dir = project_dir.join("helm");

    if !chart_dir.exists() {
        bail!("helm directory not found: {}", chart_dir.display());
    }
    if !chart_dir.join("Chart.yaml").exists() {
        bail!("Chart.yaml not found: {}", chart_dir.join("Chart.yaml").display());
    }

    format::info(&format!("Deploying Helm chart from: {}", chart_dir.display()));

    let namespace = resolve_namespace(namespace);
    format::info(&format!("Target namespace: {namespace}"));

    let release = release_name(project, environment);

    let mut value_files = Vec::new();

    let base_values = chart_dir.join("values.yaml");
    if base_values.exists() {
        format::info(&format!("Using base values: {}", base_values.display()));
        value_files.push(base_values);
    }

    // keeps the decrypted values file alive until helm has run
    let mut _secrets_values: Option<NamedTempFile> = None;

    if let Some(environment) = environment {
        let env_values = project_dir
            .join("environments")
            .join(environment)
            .join("values.yaml");
        if env_values.exists() {
            format::info(&format!(
                "Using environment values: {}",
                env_values.display()
            ));
            value_files.push(env_values);
        } else {
            format::warn(&format!(
                "Environment values file not found: {}",
                env_values.display()
            ));
        }

        format::info("Generating temporary secrets file...");
        match secrets_values_file(paths, project, environment) {
            Ok(Some(tmp)) => {
                format::info(&format!("Using secrets values: {}", tmp.path().display()));
                value_files.push(tmp.path().to_path_buf());
                _secrets_values = Some(tmp);
            }
            Ok(None) => {
                format::warn("Secrets store not initialized, continuing without secrets");
            }
            Err(err) => {
                format::warn(&format!(
                    "Failed to generate secrets file, continuing without secrets: {err:#}"
                ));
            }
        }
    }

    let args = build_deploy_args(&release, &chart_dir, &namespace, &value_files);
    format::info(&format!("Executing: helm {}", args.join(" ")));

    let mut cmd = Command::new("helm");
    cmd.args(&args);
    let output = exec::run_checked(cmd, "helm").context("failed to deploy Helm chart")?;

    print!("{}", String::from_utf8_lossy(&output.stdout));
    format::success(&format!(
        "Successfully deployed {release} to namespace {namespace}"
    ));

    Ok(())
}

/// Uninstall a deployed Helm release
pub fn undeploy(
    _paths: &ProjectPaths,
    project: &str,
    environment: Option<&str>,
    namespace: Option<&str>,
) -> Result<()> {
    let namespace = resolve_namespace(namespace);
    format::info(&format!("Target namespace: {namespace}"));

    let release = release_name(project, environment);
    format::info(&format!("Undeploying Helm release: {release}"));

    let args = build_undeploy_args(&release, &namespace);
    format::info(&format!("Executing: helm {}", args.join(" ")));

    let mut cmd = Command::new("helm");
    cmd.args(&args);
    let output = exec::run_checked(cmd, "helm").context("failed to undeploy Helm release")?;

    print!("{}", String::from_utf8_lossy(&output.stdout));
    format::success(&format!(
        "Successfully undeployed {release} from namespace {namespace}"
    ));

    Ok(())
}

fn resolve_namespace(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) => ns.to_string(),
        None => k8s::current_namespace(),
    }
}

/// `<project>` or `<project>-<environment>`
pub fn release_name(project: &str, environment: Option<&str>) -> String {
    match environment {
        Some(env) => format!("{project}-{env}"),
        None => project.to_string(),
    }
}

fn build_deploy_args(
    release: &str,
    chart_dir: &Path,
    namespace: &str,
    value_files: &[PathBuf],
) -> Vec<String> {
    let mut args = vec![
        "upgrade".to_string(),
        "--install".to_string(),
        release.to_string(),
        chart_dir.display().to_string(),
        "--namespace".to_string(),
        namespace.to_string(),
        "--create-namespace".to_string(),
    ];

    for file in value_files {
        args.push("-f".to_string());
        args.push(file.display().to_string());
    }

    args
}

fn build_undeploy_args(release: &str, namespace: &str) -> Vec<String> {
    vec![
        "uninstall".to_string(),
        release.to_string(),
        "--namespace".to_string(),
        namespace.to_string(),
    ]
}

/// Decrypt the store and write the values for `<project>.<environment>`
/// (the whole document when that path is absent) to a 0600 temp file.
/// `None` when the store was never set up.
fn secrets_values_file(
    paths: &ProjectPaths,
    project: &str,
    environment: &str,
) -> Result<Option<NamedTempFile>> {
    let store = SecretsStore::new(paths.clone());
    if !store.is_initialized() {
        return Ok(None);
    }

    let plaintext = store.decrypt_document()?;
    let doc: serde_yaml::Value =
        serde_yaml::from_str(&plaintext).context("decrypted document is not valid YAML")?;

    let values = keypath::resolve(&doc, &format!("{project}.{environment}"))
        .cloned()
        .unwrap_or(doc);
    let rendered = serde_yaml::to_string(&values)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!("{project}-{environment}-secret-values-"))
        .suffix(".yaml")
        .tempfile()
        .context("failed to create secrets values file")?;
    tmp.write_all(rendered.as_bytes())
        .context("failed to write secrets values file")?;

    Ok(Some(tmp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_name() {
        assert_eq!(release_name("myapp", None), "myapp");
        assert_eq!(release_name("myapp", Some("prod")), "myapp-prod");
    }

    #[test]
    fn test_build_deploy_args() {
        let args = build_deploy_args(
            "myapp-dev",
            Path::new("/work/myapp/helm"),
            "apps",
            &[PathBuf::from("/work/myapp/helm/values.yaml")],
        );
        assert_eq!(
            args,
            vec![
                "upgrade",
                "--install",
                "myapp-dev",
                "/work/myapp/helm",
                "--namespace",
                "apps",
                "--create-namespace",
                "-f",
                "/work/myapp/helm/values.yaml",
            ]
        );
    }

    #[test]
    fn test_build_deploy_args_without_values() {
        let args = build_deploy_args("myapp", Path::new("charts/helm"), "default", &[]);
        assert!(!args.contains(&"-f".to_string()));
    }

    #[test]
    fn test_build_undeploy_args() {
        assert_eq!(
            build_undeploy_args("myapp-prod", "apps"),
            vec!["uninstall", "myapp-prod", "--namespace", "apps"]
        );
    }
}
