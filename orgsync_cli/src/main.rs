use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::*;
use orgsync_cli::config::{ConfigManager, get_config, validate};
use orgsync_cli::error::{CliError, ExitCode};
use orgsync_cli::orchestrators::{
    MappingOrchestrator, SyncCommandOptions, SyncOrchestrator, format_check, format_entries,
    format_tree_summary,
};
use orgsync_cli::output::ReportFormat;
use orgsync_cli::terminal;
use orgsync_core::CancellationToken;

#[derive(Parser)]
#[command(name = "orgsync")]
#[command(author, version, about = "Mirror an organizational hierarchy into a catalog", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one sync pass from the directory to the catalog
    Sync {
        /// Compute and report the changes without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Output format (defaults to output.default_format)
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,

        /// Stop submitting batches after this many seconds (0 disables)
        #[arg(long, value_name = "SECONDS")]
        timeout: Option<u64>,
    },

    /// Fetch the directory and check that it forms a valid hierarchy
    Validate,

    /// Inspect the identity mapping
    Mapping {
        #[command(subcommand)]
        command: MappingCommand,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum MappingCommand {
    /// List recorded entries
    Show {
        #[arg(short, long, value_enum, default_value = "human")]
        format: ReportFormat,
    },

    /// Compare recorded entries with the live catalog
    Check {
        #[arg(short, long, value_enum, default_value = "human")]
        format: ReportFormat,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Get a configuration value
    Get {
        /// Configuration key (e.g., sync.batch_size)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., sync.batch_size)
        key: String,

        /// Value to set
        value: String,
    },

    /// List all configuration values
    List,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on debug flag
    if cli.debug {
        env_logger::Builder::from_env(env_logger::Env::default())
            .filter_level(log::LevelFilter::Info)
            .filter_module("orgsync_core", log::LevelFilter::Debug)
            .filter_module("orgsync_cli", log::LevelFilter::Debug)
            .format_timestamp_millis()
            .init();
        eprintln!("Debug logging enabled");
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    if !terminal::supports_color(true) {
        colored::control::set_override(false);
    }

    let code = match run(cli.command).await {
        Ok(code) => code,
        Err(error) => {
            let error = CliError::from(error);
            eprint!("{}", error.format_for_user(cli.debug));
            error.exit_code()
        }
    };
    std::process::exit(code as i32);
}

async fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Sync {
            dry_run,
            format,
            timeout,
        } => {
            let options = SyncCommandOptions {
                dry_run,
                format,
                timeout_seconds: timeout,
            };
            sync_command(options).await
        }
        Commands::Validate => validate_command().await,
        Commands::Mapping { command } => mapping_command(command).await,
        Commands::Config { command } => {
            config_command(command)?;
            Ok(ExitCode::Success)
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(ExitCode::Success)
        }
    }
}

fn load_config() -> Result<orgsync_cli::config::AppConfig> {
    let config = get_config().context("Failed to load configuration")?;
    validate(&config).map_err(|e| CliError::misuse(&format!("{e:#}")))?;
    Ok(config)
}

async fn sync_command(options: SyncCommandOptions) -> Result<ExitCode> {
    let config = load_config()?;
    let use_color = terminal::supports_color(config.output.color_enabled);
    let orchestrator = SyncOrchestrator::new(config)?;

    // First Ctrl+C stops new batches; in-flight ones still complete
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, finishing in-flight batches...".yellow());
            signal_token.cancel();
        }
    });

    let run = orchestrator.sync(&options, &cancel).await?;
    println!("{}", run.rendered.trim_end());
    if let Some(path) = &run.report_file {
        let line = format!("Report written to {}", path.display());
        if use_color {
            eprintln!("{}", line.dimmed());
        } else {
            eprintln!("{line}");
        }
    }

    Ok(if run.is_incomplete() {
        ExitCode::GeneralError
    } else {
        ExitCode::Success
    })
}

async fn validate_command() -> Result<ExitCode> {
    let config = load_config()?;
    let use_color = terminal::supports_color(config.output.color_enabled);
    let orchestrator = SyncOrchestrator::new(config)?;

    let tree = orchestrator.validate().await?;
    println!("{}", format_tree_summary(&tree, use_color).trim_end());
    Ok(ExitCode::Success)
}

async fn mapping_command(command: MappingCommand) -> Result<ExitCode> {
    let config = load_config()?;
    let use_color = terminal::supports_color(config.output.color_enabled);
    let orchestrator = MappingOrchestrator::new(config)?;

    match command {
        MappingCommand::Show { format } => {
            let entries = orchestrator.show()?;
            println!("{}", format_entries(&entries, format)?.trim_end());
            Ok(ExitCode::Success)
        }
        MappingCommand::Check { format } => {
            let check = orchestrator.check().await?;
            println!("{}", format_check(&check, format, use_color)?.trim_end());
            Ok(if check.is_consistent() {
                ExitCode::Success
            } else {
                ExitCode::DataIntegrityError
            })
        }
    }
}

fn config_command(command: ConfigCommand) -> Result<()> {
    let mut manager = ConfigManager::new();

    match command {
        ConfigCommand::Get { key } => {
            let value = manager
                .get(&key)
                .map_err(|e| CliError::misuse(&format!("{e:#}")))?;
            println!("{value}");
        }
        ConfigCommand::Set { key, value } => {
            manager
                .set(&key, &value)
                .map_err(|e| CliError::misuse(&format!("{e:#}")))?;
            eprintln!("{}", format!("Set {key} = {value}").green());
            eprintln!(
                "Configuration saved to: {}",
                manager.get_config_path().display()
            );
        }
        ConfigCommand::List => {
            let items = manager.list()?;
            eprintln!("{}", "Configuration:".bold().blue());
            eprintln!("Config file: {}", manager.get_config_path().display());
            eprintln!();

            let mut current_section = String::new();
            for (key, value) in items {
                let (section, name) = key.split_once('.').unwrap_or(("general", key.as_str()));
                if section != current_section {
                    if !current_section.is_empty() {
                        println!();
                    }
                    println!("[{}]", section.yellow());
                    current_section = section.to_string();
                }
                println!("  {} = {}", name.cyan(), value);
            }
        }
    }

    Ok(())
}

fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut std::io::stdout());
}
