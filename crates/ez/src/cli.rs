//! CLI command definitions and dispatch

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ez_core::ProjectPaths;

use crate::deploy;
use crate::k8s;
use crate::nginx;
use crate::render::OutputFormat;
use crate::secrets::{self, SecretsStore};

/// ez - EZ Infrastructure Tools
#[derive(Parser)]
#[command(name = "ez")]
#[command(version)]
#[command(about = "Modern infrastructure management - secrets, K8s contexts, Helm, Nginx")]
#[command(after_help = "\
EXAMPLES:
    ez secrets setup                       Generate an age key and encrypted secrets file
    ez secrets edit                        Edit secrets in $EDITOR
    ez secrets decrypt                     Print secrets as KEY=value lines
    ez secrets decrypt --format json       Print secrets as JSON
    ez secrets decrypt --key db.password   Print a single value
    ez helm deploy myapp --environment dev Deploy a project Helm chart
    ez k8s info                            Show kubectl context and namespace

FILES:
    .sops.yaml              SOPS creation rules (commit this)
    secrets/secrets.yaml    Encrypted secrets document (commit this)
    secrets/age-key.txt     Age private key (NEVER commit this)")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Project root (default: current directory)
    #[arg(short = 'C', long = "dir", global = true)]
    pub dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Say hello - a simple hello world command
    Hello {
        /// Name to greet
        #[arg(long, default_value = "World")]
        name: String,
    },

    /// Manage secrets with SOPS and Age
    Secrets {
        #[command(subcommand)]
        command: SecretsCommands,
    },

    /// Manage Kubernetes contexts
    K8s {
        #[command(subcommand)]
        command: K8sCommands,
    },

    /// Manage Helm deployments
    Helm {
        #[command(subcommand)]
        command: HelmCommands,
    },

    /// Manage Nginx configurations
    Nginx {
        #[command(subcommand)]
        command: NginxCommands,
    },
}

#[derive(Subcommand)]
pub enum SecretsCommands {
    /// Generate an age key, write .sops.yaml, create the encrypted document
    Setup,

    /// Decrypt to a temp file, open in $EDITOR, re-encrypt
    Edit,

    /// Decrypt and print the document, or a single key
    Decrypt {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Env)]
        format: OutputFormat,

        /// Dot-delimited key path (e.g. database.password)
        #[arg(long)]
        key: Option<String>,
    },

    /// Check that sops and age are installed and report their versions
    Check {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum K8sCommands {
    /// Show kubectl status, current context, and namespace
    Info,
}

#[derive(Subcommand)]
pub enum HelmCommands {
    /// Show helm status
    Info,

    /// Deploy a project Helm chart with environment-specific values
    Deploy {
        /// Project name (chart lives at <project>/helm)
        project: String,

        /// Environment name (e.g. dev, prod)
        #[arg(long, short = 'e')]
        environment: Option<String>,

        /// Kubernetes namespace (default: current context namespace)
        #[arg(long, short = 'n')]
        namespace: Option<String>,
    },

    /// Uninstall a deployed Helm release
    Undeploy {
        /// Project name
        project: String,

        /// Environment name (e.g. dev, prod)
        #[arg(long, short = 'e')]
        environment: Option<String>,

        /// Kubernetes namespace (default: current context namespace)
        #[arg(long, short = 'n')]
        namespace: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum NginxCommands {
    /// Show nginx status
    Info,
}

/// Run the CLI
pub fn run(cli: Cli) -> Result<()> {
    let root = match cli.dir {
        Some(dir) => dir,
        None => std::env::current_dir().context("failed to get current directory")?,
    };
    let paths = ProjectPaths::new(root);
    tracing::debug!(root = %paths.root.display(), "resolved project root");

    match cli.command {
        Commands::Hello { name } => cmd_hello(&name),
        Commands::Secrets { command } => match command {
            SecretsCommands::Setup => SecretsStore::new(paths).setup(),
            SecretsCommands::Edit => SecretsStore::new(paths).edit(),
            SecretsCommands::Decrypt { format, key } => {
                SecretsStore::new(paths).decrypt(format, key.as_deref())
            }
            SecretsCommands::Check { json } => secrets::check(json),
        },
        Commands::K8s { command } => match command {
            K8sCommands::Info => k8s::info(),
        },
        Commands::Helm { command } => match command {
            HelmCommands::Info => deploy::info(),
            HelmCommands::Deploy {
                project,
                environment,
                namespace,
            } => deploy::deploy(&paths, &project, environment.as_deref(), namespace.as_deref()),
            HelmCommands::Undeploy {
                project,
                environment,
                namespace,
            } => deploy::undeploy(&paths, &project, environment.as_deref(), namespace.as_deref()),
        },
        Commands::Nginx { command } => match command {
            NginxCommands::Info => nginx::info(),
        },
    }
}

fn cmd_hello(name: &str) -> Result<()> {
    println!("Hello, {}!", name);
    println!("Welcome to EZ Infrastructure Tools!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_hello() {
        let cli = Cli::try_parse_from(["ez", "hello"]).unwrap();
        assert!(matches!(cli.command, Commands::Hello { name } if name == "World"));

        let cli = Cli::try_parse_from(["ez", "hello", "--name", "Ada"]).unwrap();
        assert!(matches!(cli.command, Commands::Hello { name } if name == "Ada"));
    }

    #[test]
    fn test_cli_parse_decrypt() {
        let cli = Cli::try_parse_from(["ez", "secrets", "decrypt"]).unwrap();
        if let Commands::Secrets {
            command: SecretsCommands::Decrypt { format, key },
        } = cli.command
        {
            assert_eq!(format, OutputFormat::Env);
            assert!(key.is_none());
        } else {
            panic!("Expected secrets decrypt");
        }

        let cli = Cli::try_parse_from([
            "ez",
            "secrets",
            "decrypt",
            "--format",
            "json",
            "--key",
            "database.password",
        ])
        .unwrap();
        if let Commands::Secrets {
            command: SecretsCommands::Decrypt { format, key },
        } = cli.command
        {
            assert_eq!(format, OutputFormat::Json);
            assert_eq!(key.as_deref(), Some("database.password"));
        } else {
            panic!("Expected secrets decrypt");
        }
    }

    #[test]
    fn test_cli_parse_helm_deploy() {
        let cli = Cli::try_parse_from([
            "ez", "helm", "deploy", "myapp", "-e", "prod", "-n", "apps",
        ])
        .unwrap();
        if let Commands::Helm {
            command:
                HelmCommands::Deploy {
                    project,
                    environment,
                    namespace,
                },
        } = cli.command
        {
            assert_eq!(project, "myapp");
            assert_eq!(environment.as_deref(), Some("prod"));
            assert_eq!(namespace.as_deref(), Some("apps"));
        } else {
            panic!("Expected helm deploy");
        }
    }

    #[test]
    fn test_cli_parse_global_dir() {
        let cli = Cli::try_parse_from(["ez", "secrets", "check", "-C", "/tmp/project"]).unwrap();
        assert_eq!(cli.dir, Some(PathBuf::from("/tmp/project")));
    }

    #[test]
    fn test_cli_rejects_unknown_commands() {
        assert!(Cli::try_parse_from(["ez", "frobnicate"]).is_err());
        assert!(Cli::try_parse_from(["ez", "secrets", "rotate"]).is_err());
        assert!(Cli::try_parse_from(["ez", "secrets", "decrypt", "--format", "toml"]).is_err());
    }
}
