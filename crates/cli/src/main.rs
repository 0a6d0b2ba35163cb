mod commands;
mod config;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use commands::eval::EvalArgs;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Arbiter authorization policy toolchain.
#[derive(Parser)]
#[command(name = "arbiter", version, about = "Arbiter authorization policy toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to the configuration file (default: ./arbiter.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level filter, overridden by RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a policy file and print its JSON AST
    Compile {
        /// Path to the policy source file
        file: PathBuf,
    },

    /// Evaluate a policy against one or more requests
    Eval {
        /// Policy source file, or a JSON AST when the extension is .json
        policy: PathBuf,
        /// JSON file holding a request object or an array of request objects
        #[arg(long)]
        request: PathBuf,
        /// Extra request parameter, applied to every request
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,
        /// Refuse REST calls instead of performing them
        #[arg(long)]
        offline: bool,
        /// Exit with status 1 when any rule fails to evaluate
        #[arg(long)]
        fail_on_error: bool,
    },

    /// Validate a JSON AST against the rule set schema
    Validate {
        /// Path to the JSON AST file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let mut config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(msg) => {
            report_error(&msg, cli.output, cli.quiet);
            process::exit(1);
        }
    };
    if let Some(level) = cli.log_level {
        config.log.level = level;
    }
    init_logging(&config.log.level);

    match cli.command {
        Commands::Compile { file } => {
            commands::compile::cmd_compile(&file, cli.output, cli.quiet);
        }
        Commands::Eval {
            policy,
            request,
            params,
            offline,
            fail_on_error,
        } => {
            let args = EvalArgs {
                policy: &policy,
                request: &request,
                params: &params,
                offline,
                fail_on_error,
            };
            commands::eval::cmd_eval(&args, &config, cli.output, cli.quiet);
        }
        Commands::Validate { file } => {
            commands::validate::cmd_validate(&file, cli.output, cli.quiet);
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
