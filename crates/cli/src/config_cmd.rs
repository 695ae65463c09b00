//! `curricula config`: inspect and validate analysis configs.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use curricula_analysis::{AnalysisConfig, WritingSource};

use crate::CliError;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Validate a config file without analyzing anything
    #[command(after_help = "\
Examples:
  curricula config validate facultad.toml")]
    Validate {
        /// Path to the TOML config file
        file: PathBuf,
    },

    /// Print the effective config (built-in defaults merged with the file)
    #[command(after_help = "\
Examples:
  curricula config show
  curricula config show --config facultad.toml --json")]
    Show {
        /// Analysis config (TOML)
        #[arg(long, short = 'c', env = "CURRICULA_CONFIG")]
        config: Option<PathBuf>,

        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },
}

pub fn cmd_config(cmd: ConfigCommands) -> Result<(), CliError> {
    match cmd {
        ConfigCommands::Validate { file } => cmd_config_validate(file),
        ConfigCommands::Show { config, json } => cmd_config_show(config, json),
    }
}

/// Load and validate a config, or the built-in defaults when no path is given.
pub fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, CliError> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };

    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| {
            CliError::io(format!("cannot read config {}: {}", path.display(), e))
                .with_hint("omit --config (and unset CURRICULA_CONFIG) to use the built-in defaults")
        })?;

    AnalysisConfig::from_toml(&toml_str)
        .map_err(|e| CliError::analysis(e).with_context(path))
}

fn cmd_config_validate(file: PathBuf) -> Result<(), CliError> {
    let config = load_config(Some(&file))?;

    let keywords: usize = config.thematics.iter().map(|t| t.keywords.len()).sum();
    let name = if config.name.is_empty() { "(unnamed)" } else { config.name.as_str() };
    println!("valid: {}", name);
    println!("  thematics: {} ({} keywords)", config.thematics.len(), keywords);
    println!("  weights:   sum {:.4}", config.weights.sum());
    println!(
        "  bloom:     basico <= {}, intermedio <= {}, default level {}",
        config.bloom.basico_max, config.bloom.intermedio_max, config.bloom.default_level
    );
    println!(
        "  writing:   {}",
        match config.scoring.redaccion {
            WritingSource::Fixed => format!("fixed {}", config.scoring.redaccion_default),
            WritingSource::Validator => format!(
                "validator ({}-{} words)",
                config.scoring.min_palabras, config.scoring.max_palabras
            ),
        }
    );
    println!(
        "  batch:     {}",
        if config.batch.parallel {
            format!("parallel, up to {} workers", config.batch.max_workers)
        } else {
            "sequential".to_string()
        }
    );
    Ok(())
}

fn cmd_config_show(config: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let config = load_config(config.as_deref())?;

    let rendered = if json {
        serde_json::to_string_pretty(&config)
            .map_err(|e| CliError { code: crate::exit_codes::EXIT_ERROR, message: e.to_string(), hint: None })?
    } else {
        toml::to_string_pretty(&config)
            .map_err(|e| CliError { code: crate::exit_codes::EXIT_ERROR, message: e.to_string(), hint: None })?
    };
    println!("{}", rendered);
    Ok(())
}
