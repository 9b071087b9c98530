//! Secrets management backed by SOPS and Age
//!
//! All cryptography is delegated to `sops` and `age-keygen`; this module
//! owns the path layout, the transient plaintext lifecycle, and output
//! shaping. Plaintext only ever exists in 0600 temp files under `secrets/`
//! that are removed on every exit path.

use std::fs::{self, Permissions};
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use anyhow::{bail, Context, Result};
use colored::Colorize;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use ez_core::exec;
use ez_core::format;
use ez_core::ProjectPaths;

use crate::render::{self, OutputFormat};

/// Tools the secrets commands shell out to
const REQUIRED_TOOLS: &[&str] = &["sops", "age", "age-keygen"];

/// Starter document, encrypted by `setup`
const INITIAL_SECRETS: &str = r#"# Add your secrets here in YAML format
# Example structure below:
database:
  username: ""
  password: ""
api:
  key: ""
  secret: ""
"#;

/// Secrets-specific errors
#[derive(Error, Debug)]
pub enum SecretsError {
    #[error("age key already exists: {0} (remove it before running setup again)")]
    KeyExists(PathBuf),

    #[error("encrypted secrets file already exists: {0}")]
    SecretsExist(PathBuf),

    #[error("encrypted secrets file not found: {0} (run 'ez secrets setup' first)")]
    SecretsMissing(PathBuf),

    #[error("age key file not found: {0} (run 'ez secrets setup' first)")]
    KeyMissing(PathBuf),

    #[error("key '{0}' not found in secrets")]
    KeyPathNotFound(String),

    #[error("missing required tools: {0}")]
    MissingTools(String),

    #[error("could not determine public key from age-keygen")]
    NoPublicKey,
}

/// The secrets store for one project
pub struct SecretsStore {
    paths: ProjectPaths,
}

impl SecretsStore {
    pub fn new(paths: ProjectPaths) -> Self {
        Self { paths }
    }

    /// Both the key and the encrypted document exist
    pub fn is_initialized(&self) -> bool {
        self.paths.age_key_file.exists() && self.paths.secrets_file.exists()
    }

    fn ensure_initialized(&self) -> Result<()> {
        if !self.paths.secrets_file.exists() {
            bail!(SecretsError::SecretsMissing(self.paths.secrets_file.clone()));
        }
        if !self.paths.age_key_file.exists() {
            bail!(SecretsError::KeyMissing(self.paths.age_key_file.clone()));
        }
        Ok(())
    }

    // setup must never overwrite an existing key or document
    fn ensure_uninitialized(&self) -> Result<()> {
        if self.paths.age_key_file.exists() {
            bail!(SecretsError::KeyExists(self.paths.age_key_file.clone()));
        }
        if self.paths.secrets_file.exists() {
            bail!(SecretsError::SecretsExist(self.paths.secrets_file.clone()));
        }
        Ok(())
    }

    /// sops invocation with the project's age key
    fn sops_cmd(&self) -> Command {
        let mut cmd = Command::new("sops");
        cmd.env("SOPS_AGE_KEY_FILE", &self.paths.age_key_file);
        cmd
    }

    /// Generate the key pair, write .sops.yaml, create the encrypted document
    pub fn setup(&self) -> Result<()> {
        require_tools()?;
        self.ensure_uninitialized()?;

        fs::create_dir_all(&self.paths.secrets_dir)
            .context("failed to create secrets directory")?;

        let public_key = self.generate_age_key()?;
        self.write_sops_config(&public_key)?;
        self.create_initial_secrets()?;

        format::info("Secrets setup complete!");
        format::info(&format!("Age key: {}", self.paths.age_key_file.display()));
        format::info(&format!(
            "Secrets file: {}",
            self.paths.secrets_file.display()
        ));
        format::info(&format!(
            "SOPS config: {}",
            self.paths.sops_config.display()
        ));
        eprintln!();
        eprintln!("Next steps:");
        eprintln!("  1. Backup your age key to a secure location");
        eprintln!("  2. Edit secrets with: ez secrets edit");
        eprintln!("  3. Decrypt secrets with: ez secrets decrypt");

        Ok(())
    }

    /// Run age-keygen and return the public key
    fn generate_age_key(&self) -> Result<String> {
        format::info("Generating new age key...");

        let mut cmd = Command::new("age-keygen");
        cmd.arg("-o").arg(&self.paths.age_key_file);
        let output = exec::run_checked(cmd, "age-keygen")?;

        fs::set_permissions(&self.paths.age_key_file, Permissions::from_mode(0o600))
            .context("failed to restrict age key permissions")?;

        format::info(&format!(
            "Age key generated: {}",
            self.paths.age_key_file.display()
        ));
        format::warn("IMPORTANT: Store this key securely and add it to your password manager!");

        // age-keygen reports the public key on stderr
        let stderr = String::from_utf8_lossy(&output.stderr);
        if let Some(key) = stderr
            .lines()
            .find_map(|line| line.strip_prefix("Public key:"))
        {
            return Ok(key.trim().to_string());
        }

        self.public_key_from_file()
    }

    /// Fall back to the `# public key:` comment inside the key file
    fn public_key_from_file(&self) -> Result<String> {
        let content = fs::read_to_string(&self.paths.age_key_file)
            .context("failed to read age key file")?;

        content
            .lines()
            .find_map(|line| line.strip_prefix("# public key:"))
            .map(|key| key.trim().to_string())
            .ok_or_else(|| SecretsError::NoPublicKey.into())
    }

    /// Write .sops.yaml binding the recipient to secrets/*.yaml.
    /// An existing config is left untouched.
    fn write_sops_config(&self, public_key: &str) -> Result<()> {
        if self.paths.sops_config.exists() {
            format::info(&format!(
                ".sops.yaml already exists: {}",
                self.paths.sops_config.display()
            ));
            return Ok(());
        }

        let content = format!(
            "keys:\n - &age_key {public_key}\ncreation_rules:\n - path_regex: secrets/.*\\.yaml$\n   age: *age_key\n"
        );
        fs::write(&self.paths.sops_config, content).context("failed to write .sops.yaml")?;

        format::info(&format!(
            "Created .sops.yaml: {}",
            self.paths.sops_config.display()
        ));
        Ok(())
    }

    /// Encrypt the starter template into the secrets file. The plaintext
    /// lives in a temp file that is removed on every exit path.
    fn create_initial_secrets(&self) -> Result<()> {
        format::info("Creating initial encrypted secrets file...");

        let mut plaintext = self.plaintext_temp_file("setup")?;
        plaintext
            .write_all(INITIAL_SECRETS.as_bytes())
            .context("failed to write starter template")?;

        let encrypted = self.encrypt_file(plaintext.path())?;
        fs::write(&self.paths.secrets_file, encrypted)
            .context("failed to write encrypted secrets file")?;

        format::info(&format!(
            "Created encrypted secrets file: {}",
            self.paths.secrets_file.display()
        ));
        Ok(())
    }

    /// Decrypt, open in the user's editor, re-encrypt on clean exit
    pub fn edit(&self) -> Result<()> {
        self.ensure_initialized()?;

        format::info("Opening encrypted secrets file for editing...");
        format::info(&format!("File: {}", self.paths.secrets_file.display()));

        let original = self.decrypt_document()?;

        let mut plaintext = self.plaintext_temp_file("edit")?;
        plaintext
            .write_all(original.as_bytes())
            .context("failed to write decrypted temp file")?;

        let status = launch_editor(plaintext.path())?;
        if !status.success() {
            bail!("editor exited with {status}; secrets left unchanged");
        }

        let edited = fs::read_to_string(plaintext.path())
            .context("failed to read edited temp file")?;
        if edited == original {
            format::info("No changes made.");
            return Ok(());
        }

        let encrypted = self.encrypt_file(plaintext.path())?;
        fs::write(&self.paths.secrets_file, encrypted)
            .context("failed to write encrypted secrets file")?;

        format::info("Secrets file updated.");
        Ok(())
    }

    /// Decrypt and print the document (or a single key) to stdout
    pub fn decrypt(&self, format: OutputFormat, key: Option<&str>) -> Result<()> {
        let plaintext = self.decrypt_document()?;
        let rendered = render::render(&plaintext, format, key)?;
        println!("{}", rendered.trim_end_matches('\n'));
        Ok(())
    }

    /// Decrypt the document and return the plaintext YAML
    pub fn decrypt_document(&self) -> Result<String> {
        self.ensure_initialized()?;

        let mut cmd = self.sops_cmd();
        cmd.arg("--decrypt").arg(&self.paths.secrets_file);
        let output =
            exec::run_checked(cmd, "sops").context("failed to decrypt secrets")?;

        String::from_utf8(output.stdout).context("sops produced non-UTF-8 output")
    }

    /// Encrypt a plaintext file with sops, returning the encrypted bytes.
    /// The file must live under `secrets/` so the creation rules in
    /// .sops.yaml apply.
    fn encrypt_file(&self, plaintext: &Path) -> Result<Vec<u8>> {
        let mut cmd = self.sops_cmd();
        cmd.arg("--encrypt")
            .arg(plaintext)
            .current_dir(&self.paths.root);
        let output =
            exec::run_checked(cmd, "sops").context("failed to encrypt secrets")?;
        Ok(output.stdout)
    }

    // 0600 on unix, removed when the guard drops
    fn plaintext_temp_file(&self, label: &str) -> Result<NamedTempFile> {
        tempfile::Builder::new()
            .prefix(&format!(".{label}-"))
            .suffix(".yaml")
            .tempfile_in(&self.paths.secrets_dir)
            .context("failed to create temp file in secrets directory")
    }
}

/// Dependency report entry for `secrets check`
#[derive(Serialize)]
struct ToolStatus {
    name: &'static str,
    installed: bool,
    version: Option<String>,
}

/// Report presence and versions of the required tools. Missing tools are
/// reported, not fatal.
pub fn check(json: bool) -> Result<()> {
    let statuses: Vec<ToolStatus> = REQUIRED_TOOLS
        .iter()
        .map(|&name| {
            let installed = exec::is_installed(name);
            let version = if installed {
                exec::tool_version(name, &["--version"])
            } else {
                None
            };
            ToolStatus {
                name,
                installed,
                version,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
        return Ok(());
    }

    for status in &statuses {
        match &status.version {
            Some(version) => println!("{} {} ({})", "ok".green(), status.name, version),
            None if status.installed => println!("{} {}", "ok".green(), status.name),
            None => println!("{} {} - not found", "!".yellow(), status.name),
        }
    }

    let missing: Vec<&str> = statuses
        .iter()
        .filter(|s| !s.installed)
        .map(|s| s.name)
        .collect();

    if missing.is_empty() {
        format::info("All dependencies are installed.");
    } else {
        format::warn(&format!("Missing required tools: {}", missing.join(", ")));
        print_install_hints(&missing);
    }

    Ok(())
}

/// Fail unless every required tool is installed
fn require_tools() -> Result<()> {
    format::info("Checking dependencies...");

    let missing: Vec<&str> = REQUIRED_TOOLS
        .iter()
        .copied()
        .filter(|tool| !exec::is_installed(tool))
        .collect();

    if missing.is_empty() {
        format::info("All dependencies are installed.");
        return Ok(());
    }

    print_install_hints(&missing);
    bail!(SecretsError::MissingTools(missing.join(", ")));
}

fn print_install_hints(missing: &[&str]) {
    eprintln!();
    eprintln!("Install with:");
    let mut packages: Vec<&str> = missing.iter().map(|tool| install_package(tool)).collect();
    packages.dedup();
    for package in packages {
        eprintln!("  brew install {package}");
    }
}

// age-keygen ships with the age package
fn install_package(tool: &str) -> &str {
    match tool {
        "age-keygen" => "age",
        other => other,
    }
}

fn launch_editor(path: &Path) -> Result<ExitStatus> {
    let editor = resolve_editor(
        std::env::var("VISUAL").ok().as_deref(),
        std::env::var("EDITOR").ok().as_deref(),
    );

    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or("vi").to_string();
    let mut cmd = Command::new(&program);
    cmd.args(parts).arg(path);

    Ok(exec::run_interactive(cmd, &program)?)
}

/// $VISUAL, then $EDITOR, then vi
fn resolve_editor(visual: Option<&str>, editor: Option<&str>) -> String {
    [visual, editor]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "vi".to_string())
}
