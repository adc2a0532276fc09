//! CLI Tooling
//!
//! Command-line interface for running exports and inspecting the effective
//! configuration.

use crate::config::{CanopyConfig, ConfigLoader};
use crate::directory::HttpDirectoryConnector;
use crate::error::ExportError;
use crate::session;
use crate::summary::{format_summary_json, format_summary_text, ExportSummary};
use crate::walker;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Canopy CLI - Hierarchical repository export
#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Snapshot a hierarchical metadata repository onto the local filesystem")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Export the repository tree into the export directory
    Export {
        /// Export directory (overrides config)
        #[arg(long)]
        export_dir: Option<PathBuf>,
        /// Repository path of the folder to start from (overrides config)
        #[arg(long)]
        root_path: Option<String>,
        /// Summary format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration with secrets masked
    Show {
        /// Output format (toml or json)
        #[arg(long, default_value = "toml")]
        format: String,
    },
}

/// Rendered command result plus the process exit status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    fn ok(text: String) -> Self {
        Self { text, exit_code: 0 }
    }
}

/// CLI context holding the loaded configuration
pub struct CliContext {
    config: CanopyConfig,
    config_path: Option<PathBuf>,
}

impl CliContext {
    /// Create a new CLI context, loading configuration from the usual layers
    pub fn new(config_path: Option<PathBuf>) -> Result<Self, ExportError> {
        let config = match &config_path {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };
        Ok(Self {
            config,
            config_path,
        })
    }

    /// Create a context around an already-built configuration
    pub fn with_config(config: CanopyConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    pub fn config(&self) -> &CanopyConfig {
        &self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Execute a CLI command
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, ExportError> {
        match command {
            Commands::Export {
                export_dir,
                root_path,
                format,
            } => self.handle_export(export_dir.as_ref(), root_path.as_deref(), format),
            Commands::Config {
                command: ConfigCommands::Show { format },
            } => self.handle_config_show(format).map(CommandOutput::ok),
        }
    }

    /// Configuration for an export, with command-line overrides applied.
    pub fn export_config(
        &self,
        export_dir: Option<&PathBuf>,
        root_path: Option<&str>,
    ) -> CanopyConfig {
        let mut config = self.config.clone();
        if let Some(dir) = export_dir {
            config.export_dir = Some(dir.clone());
        }
        if let Some(path) = root_path {
            config.root_path = path.to_string();
        }
        config
    }

    fn handle_export(
        &self,
        export_dir: Option<&PathBuf>,
        root_path: Option<&str>,
        format: &str,
    ) -> Result<CommandOutput, ExportError> {
        let format = SummaryFormat::parse(format)?;
        let config = self.export_config(export_dir, root_path);
        config.validate()?;
        let export_dir = config.resolve_export_dir()?;

        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ExportError::Runtime(format!("Failed to create runtime: {}", e)))?;
        eprintln!("Export dir: {}", export_dir.display());
        let summary = rt.block_on(async {
            let connector = HttpDirectoryConnector::new(&config.directory)?;
            let session = session::bootstrap(&connector, &config.admin_credentials()).await?;
            info!("Starting export of {}", config.root_path);
            walker::run(&export_dir, &config.root_path, &session, &config.content).await
        })?;

        Ok(CommandOutput {
            text: format.render(&summary)?,
            exit_code: summary.exit_code(),
        })
    }

    fn handle_config_show(&self, format: &str) -> Result<String, ExportError> {
        let redacted = self.config.redacted();
        match format {
            "toml" => toml::to_string_pretty(&redacted).map_err(|e| {
                ExportError::ConfigError(format!("Failed to render configuration: {}", e))
            }),
            "json" => Ok(serde_json::to_string_pretty(&redacted)?),
            other => Err(ExportError::ConfigError(format!(
                "Unknown config format '{}' (expected toml or json)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SummaryFormat {
    Text,
    Json,
}

impl SummaryFormat {
    fn parse(format: &str) -> Result<Self, ExportError> {
        match format {
            "text" => Ok(SummaryFormat::Text),
            "json" => Ok(SummaryFormat::Json),
            other => Err(ExportError::ConfigError(format!(
                "Unknown summary format '{}' (expected text or json)",
                other
            ))),
        }
    }

    fn render(self, summary: &ExportSummary) -> Result<String, ExportError> {
        match self {
            SummaryFormat::Text => Ok(format_summary_text(summary)),
            SummaryFormat::Json => format_summary_json(summary),
        }
    }
}
