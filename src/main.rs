//! Profile Translator - CLI entry point
//!
//! Reads a recorded application profile, optionally templates it and adapts
//! it to a target kernel, and writes it out in the requested format.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ptx::compat::CompatibilityDatabase;
use ptx::config::{CompatibilityOverrides, TemplateConfig};
use ptx::translator::{TranslateOptions, Translator};
use ptx::utils::fs::{read_profile, write_atomically};

/// Profile Translator - Convert and adapt runtime application profiles
///
/// Translates profiles between formats, replaces workload identities with
/// placeholders and drops syscalls unavailable on the target kernel.
///
/// # Examples
///
/// Re-emit a profile without changes:
///     translate-profile --input recorded.yaml --output out.yaml
///
/// Template and filter for an older kernel:
///     translate-profile --input recorded.yaml --output out.yaml \
///         --config template.yaml --output-kernel 5.4
///
/// Emit an OCI seccomp profile:
///     translate-profile -i recorded.yaml -o seccomp.json --output-format seccomp
#[derive(Parser, Debug)]
#[command(name = "translate-profile")]
#[command(about = "Profile Translator - Convert and adapt runtime application profiles")]
#[command(version)]
pub struct Cli {
    /// Input profile file
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Output profile file
    ///
    /// Written atomically; an existing file is only replaced once the
    /// whole translation has succeeded.
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Input format (kubescape, neuvector, apparmor)
    #[arg(long, default_value = "kubescape")]
    input_format: String,

    /// Output format (kubescape, neuvector, apparmor, seccomp)
    #[arg(long, default_value = "kubescape")]
    output_format: String,

    /// Kernel version the profile was recorded on
    #[arg(long)]
    input_kernel: Option<String>,

    /// Kernel version the profile will run on
    ///
    /// Syscalls and capabilities introduced after this version are removed.
    #[arg(long)]
    output_kernel: Option<String>,

    /// Path to template configuration (YAML or JSON)
    ///
    /// If provided, workload name, namespace, template hash, IPs and ports
    /// are replaced with the configured values.
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Path to supplementary kernel compatibility entries (YAML or JSON)
    #[arg(long)]
    compat_db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    debug: bool,
}

impl Cli {
    /// Builds the translation options, loading the template config if set.
    fn translate_options(&self) -> Result<TranslateOptions> {
        let template = match &self.config {
            Some(path) => {
                tracing::info!("Loading template configuration from: {}", path.display());
                let config = TemplateConfig::from_file(path)?;
                tracing::debug!("Template configuration:\n{}", config.to_json_string()?);
                Some(config)
            }
            None => None,
        };

        Ok(TranslateOptions {
            input_format: self.input_format.clone(),
            output_format: self.output_format.clone(),
            template,
            source_kernel: self.input_kernel.clone(),
            target_kernel: self.output_kernel.clone(),
        })
    }

    fn database(&self) -> Result<CompatibilityDatabase> {
        let database = match &self.compat_db {
            Some(path) => {
                tracing::info!("Loading compatibility entries from: {}", path.display());
                let overrides = CompatibilityOverrides::from_file(path)?;
                CompatibilityDatabase::with_overrides(&overrides)
            }
            None => CompatibilityDatabase::builtin(),
        };

        tracing::debug!(
            "Compatibility database has {} syscall and {} capability entries",
            database.syscall_count(),
            database.capability_count()
        );
        Ok(database)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logging(cli.debug)?;

    run(&cli)?;

    println!(
        "Successfully translated profile from {} to {}: {}",
        cli.input_format,
        cli.output_format,
        cli.output.display()
    );
    Ok(())
}

/// Runs one translation from `cli.input` to `cli.output`.
fn run(cli: &Cli) -> Result<()> {
    let translator = Translator::new(cli.database()?);
    let options = cli.translate_options()?;

    let raw = read_profile(&cli.input)?;
    let output = translator
        .translate(&raw, &options)
        .with_context(|| format!("Failed to translate {}", cli.input.display()))?;

    write_atomically(&cli.output, &output)?;
    tracing::info!("Wrote {} bytes to {}", output.len(), cli.output.display());

    Ok(())
}

/// Initializes the logging system.
///
/// Logs go to stderr so they never mix with profile output. `debug`
/// selects DEBUG instead of INFO; `RUST_LOG` overrides both.
fn initialize_logging(debug: bool) -> Result<()> {
    let log_level = if debug { "debug" } else { "info" };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_level(true)
        .init();

    Ok(())
}
