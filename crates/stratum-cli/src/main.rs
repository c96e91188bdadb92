mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{CliError, EXIT_FAILURE};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use stratum_core::{Options, Orchestrator};
use stratum_schema::{parse_duration, Operation, ProviderType};

#[derive(Debug, Parser)]
#[command(
    name = "stratum",
    version,
    about = "Provision, inspect and tear down clusters through an infrastructure-as-code engine"
)]
struct Cli {
    /// Directory holding cluster workspaces [default: ~/.stratum].
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// TOML file with orchestrator options. Flags take precedence.
    #[arg(long, global = true)]
    options: Option<PathBuf>,

    /// Keep workspaces after each operation.
    #[arg(long, default_value_t = false, global = true)]
    persistent: bool,

    /// Engine backend: terraform or mock.
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Engine binary to run (terraform, tofu, ...).
    #[arg(long, global = true)]
    engine_binary: Option<String>,

    /// Override an operation timeout, e.g. `apply=90m`. Repeatable.
    #[arg(long = "timeout", value_name = "OP=DURATION", value_parser = parse_timeout_arg, global = true)]
    timeouts: Vec<(Operation, Duration)>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable debug logging and show the engine's own output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Provision a cluster.
    Create {
        /// Provider: gardener, gcp, azure, aws or kind.
        provider: ProviderType,
        /// Provider configuration file (.toml or .json).
        #[arg(long)]
        config: PathBuf,
        /// Write the resulting state artifact to this file.
        #[arg(long)]
        state_out: Option<PathBuf>,
    },
    /// Report whether a cluster is provisioned.
    Status {
        /// Provider: gardener, gcp, azure, aws or kind.
        provider: ProviderType,
        /// Provider configuration file (.toml or .json).
        #[arg(long)]
        config: PathBuf,
        /// State artifact to inspect instead of the workspace state.
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Tear down a cluster.
    Delete {
        /// Provider: gardener, gcp, azure, aws or kind.
        provider: ProviderType,
        /// Provider configuration file (.toml or .json).
        #[arg(long)]
        config: PathBuf,
        /// State artifact to destroy from; replaces the workspace state.
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Check engine prerequisites and the data directory.
    Doctor,
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("STRATUM_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let result = build_options(&cli).and_then(|options| run(cli, options));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.code)
        }
    }
}

fn run(cli: Cli, options: Options) -> Result<u8, CliError> {
    let json_output = cli.json;

    let needs_engine = matches!(cli.command, Commands::Create { .. } | Commands::Delete { .. });
    if needs_engine
        && options.backend != "mock"
        && std::env::var("STRATUM_SKIP_PREREQS").as_deref() != Ok("1")
    {
        let missing = stratum_engine::check_engine_prereqs(&options.engine_binary);
        if !missing.is_empty() {
            return Err(CliError::new(
                EXIT_FAILURE,
                stratum_engine::format_missing(&missing),
            ));
        }
    }

    match cli.command {
        Commands::Create {
            provider,
            config,
            state_out,
        } => {
            let orch = Orchestrator::new(options)?;
            commands::create::run(&orch, provider, &config, state_out.as_deref(), json_output)
        }
        Commands::Status {
            provider,
            config,
            state,
        } => {
            let orch = Orchestrator::new(options)?;
            commands::status::run(&orch, provider, &config, state.as_deref(), json_output)
        }
        Commands::Delete {
            provider,
            config,
            state,
        } => {
            let orch = Orchestrator::new(options)?;
            commands::delete::run(&orch, provider, &config, state.as_deref(), json_output)
        }
        Commands::Doctor => commands::doctor::run(&options, json_output).map_err(CliError::from),
        Commands::Completions { shell } => {
            commands::completions::run::<Cli>(shell).map_err(CliError::from)
        }
    }
}

/// Defaults, then the `--options` file, then individual flags.
fn build_options(cli: &Cli) -> Result<Options, CliError> {
    let mut opts = match &cli.options {
        Some(path) => Options::load(path)?,
        None => Options::new(),
    };
    if let Some(dir) = &cli.data_dir {
        opts = opts.data_dir(expand_tilde(dir));
    }
    if cli.persistent {
        opts = opts.persistent(true);
    }
    if cli.verbose || cli.trace {
        opts = opts.verbose(true);
    }
    if let Some(backend) = &cli.backend {
        opts = opts.backend(backend.as_str());
    }
    if let Some(binary) = &cli.engine_binary {
        opts = opts.engine_binary(binary.as_str());
    }
    for (op, timeout) in &cli.timeouts {
        opts = opts.timeout(*op, *timeout);
    }
    Ok(opts)
}

fn parse_timeout_arg(s: &str) -> Result<(Operation, Duration), String> {
    let (op, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OP=DURATION, got '{s}'"))?;
    let op: Operation = op.trim().parse()?;
    let timeout = parse_duration(value.trim())?;
    if timeout.is_zero() {
        return Err("timeout must be greater than zero".to_owned());
    }
    Ok((op, timeout))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(stripped);
        }
    }
    PathBuf::from(path)
}
