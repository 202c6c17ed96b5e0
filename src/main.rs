use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use ami_automation_stack::{CfnResource, StackConfig, build};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

/// Synthesize the AMI update automation stack as a CloudFormation template
#[derive(Parser)]
#[command(name = "ami-stack")]
#[command(version)]
#[command(about = "Synthesize the AMI update automation stack", long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log output format (logs go to stderr)
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Build the stack and print the template
    Synth {
        /// Write the template here instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Pin a parameter-store lookup to a fixed value
        #[arg(long, value_name = "PATH=VALUE", value_parser = parse_pin)]
        pin: Vec<(String, String)>,

        /// Repeat the managed policy inline on the worker role
        #[arg(long)]
        worker_inline_policy: bool,
    },
    /// List the declared resources
    Ls,
}

fn parse_pin(raw: &str) -> Result<(String, String)> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected PATH=VALUE, got '{raw}'"))?;
    if path.is_empty() || value.is_empty() {
        anyhow::bail!("expected PATH=VALUE, got '{raw}'");
    }
    Ok((path.to_string(), value.to_string()))
}

fn init_tracing(format: LogFormat) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    // Default to INFO level, override with RUST_LOG
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init(),
        LogFormat::Text => registry.with(fmt::layer().with_writer(io::stderr)).init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config =
        StackConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Synth {
            output,
            pin,
            worker_inline_policy,
        } => {
            for (path, value) in pin {
                config.pin(path, value);
            }
            if worker_inline_policy {
                config.compat.worker_inline_policy = true;
            }
            config.validate().context("Invalid command-line overrides")?;
            synth(&config, output)
        }
        Command::Ls => ls(&config),
    }
}

fn synth(config: &StackConfig, output: Option<PathBuf>) -> Result<()> {
    let built = build(config).context("Failed to build stack")?;
    let template = built
        .stack
        .synth()
        .with_context(|| format!("Failed to synthesize {}", config.stack_name))?;
    let json = template.to_json_pretty()?;
    let fingerprint = template.fingerprint()?;

    match &output {
        Some(path) => fs::write(path, format!("{json}\n"))
            .with_context(|| format!("Failed to write template to {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{json}").context("Failed to write template to stdout")?;
        }
    }

    info!(
        event = "Synth",
        phase = "Written",
        stack = config.stack_name.as_str(),
        fingerprint = fingerprint.as_str(),
        output = output
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "-".to_string())
    );
    Ok(())
}

fn ls(config: &StackConfig) -> Result<()> {
    let built = build(config).context("Failed to build stack")?;
    let mut stdout = io::stdout().lock();
    for construct in built.stack.constructs() {
        writeln!(
            stdout,
            "{}\t{}",
            construct.logical_id(),
            construct.resource_type()
        )?;
    }
    Ok(())
}
