// Curricula CLI - batch analysis of curricular program records

mod analyze;
mod config_cmd;
mod detect;
mod exit_codes;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use curricula_analysis::AnalysisError;
use exit_codes::{analysis_exit_code, EXIT_IO, EXIT_PARSE, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "curricula")]
#[command(about = "Thematic detection and quality indicators for curricular programs")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze program records and build the consolidated matrices
    #[command(after_help = "\
Examples:
  curricula analyze programs.json
  curricula analyze administracion.json contaduria.json --json
  curricula analyze programs.json --config facultad.toml --output result.json
  curricula analyze programs.json --sequential
  curricula analyze programs.json --workers 8 -v

Each records file holds one program record or a JSON array of them.
Exit code 11 means the batch finished but some programs could not be analyzed.")]
    Analyze {
        /// JSON records files
        #[arg(required = true)]
        records: Vec<PathBuf>,

        /// Analysis config (TOML); built-in catalog and weights when omitted
        #[arg(long, short = 'c', env = "CURRICULA_CONFIG")]
        config: Option<PathBuf>,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Analyze programs one at a time
        #[arg(long, conflicts_with = "workers")]
        sequential: bool,

        /// Worker threads for parallel analysis
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Detect thematics in a piece of text
    #[command(after_help = "\
Examples:
  curricula detect 'Desarrollo sostenible y responsabilidad ambiental'
  echo 'Ética empresarial e inteligencia artificial' | curricula detect -
  curricula detect 'Gestión del cambio' --config facultad.toml")]
    Detect {
        /// Text to scan ('-' reads stdin)
        text: String,

        /// Analysis config (TOML)
        #[arg(long, short = 'c', env = "CURRICULA_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Inspect or validate analysis configs
    #[command(subcommand)]
    Config(config_cmd::ConfigCommands),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("CURRICULA_COMMIT"), ")",
        "\nengine:  curricula-analysis ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("CURRICULA_TARGET"), " (", env!("CURRICULA_PROFILE"), ")",
    )
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Also installs the `log` bridge, so engine crates logging via `log` show up here.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let json_errors = matches!(cli.command, Commands::Analyze { json: true, .. });

    let result = match cli.command {
        Commands::Analyze { records, config, json, output, sequential, workers } => {
            analyze::cmd_analyze(analyze::AnalyzeArgs { records, config, json, output, sequential, workers })
        }
        Commands::Detect { text, config } => detect::cmd_detect(text, config),
        Commands::Config(cmd) => config_cmd::cmd_config(cmd),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if json_errors {
                exit_codes::ErrorOutput { error: message, hint, exit_code: code }.print();
            } else {
                if !message.is_empty() {
                    eprintln!("error: {}", message);
                }
                if let Some(hint) = hint {
                    eprintln!("hint:  {}", hint);
                }
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self { code: EXIT_PARSE, message: msg.into(), hint: None }
    }

    /// Create error from an engine error with the matching exit code.
    pub fn analysis(err: AnalysisError) -> Self {
        let code = analysis_exit_code(&err);
        let hint = match &err {
            AnalysisError::InvalidWeights { .. } => {
                Some("the six [weights] entries must add up to 1.0".to_string())
            }
            AnalysisError::UnknownField { table, .. } => {
                Some(format!("valid fields for {table}: {}", table.fields().join(", ")))
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Prefix the message with the file it came from.
    pub fn with_context(mut self, path: &std::path::Path) -> Self {
        self.message = format!("{}: {}", path.display(), self.message);
        self
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
