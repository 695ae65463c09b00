//! `curricula analyze`: batch analysis of program records.

use std::path::{Path, PathBuf};

use curricula_analysis::{Analyzer, BatchResult, ProgramOutcome};
use curricula_core::ProgramRecord;

use crate::config_cmd::load_config;
use crate::exit_codes::{EXIT_ERROR, EXIT_FAILED_PROGRAMS};
use crate::CliError;

pub struct AnalyzeArgs {
    pub records: Vec<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub output: Option<PathBuf>,
    pub sequential: bool,
    pub workers: Option<usize>,
}

pub fn cmd_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let mut config = load_config(args.config.as_deref())?;

    if args.sequential {
        config.batch.parallel = false;
    }
    if let Some(workers) = args.workers {
        if workers == 0 {
            return Err(CliError::args("--workers must be at least 1"));
        }
        config.batch.parallel = workers > 1;
        config.batch.max_workers = workers;
    }

    let mut records = Vec::new();
    for path in &args.records {
        records.extend(load_records(path)?);
    }

    let analyzer = Analyzer::new(config).map_err(CliError::analysis)?;
    let result = analyzer.run_batch(&records).map_err(CliError::analysis)?;

    if args.json || args.output.is_some() {
        let json = serde_json::to_string_pretty(&result)
            .map_err(|e| CliError { code: EXIT_ERROR, message: e.to_string(), hint: None })?;

        if let Some(ref path) = args.output {
            std::fs::write(path, &json)
                .map_err(|e| CliError::io(format!("cannot write {}: {}", path.display(), e)))?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{}", json);
        }
    }

    print_summary(&result);

    let failed = result.failed_count();
    if failed > 0 {
        return Err(CliError {
            code: EXIT_FAILED_PROGRAMS,
            message: format!("{} of {} programs could not be analyzed", failed, result.programas.len()),
            hint: Some("every program needs a 'programa' name or a 'source_id'".into()),
        });
    }
    Ok(())
}

/// A records file holds either one program record or an array of them.
pub fn load_records(path: &Path) -> Result<Vec<ProgramRecord>, CliError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {}", path.display(), e)))?;

    let value: serde_json::Value = serde_json::from_str(&content)
        .map_err(|e| CliError::parse(format!("{}: invalid JSON: {}", path.display(), e)))?;

    let records = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| {
                serde_json::from_value::<ProgramRecord>(item).map_err(|e| {
                    CliError::parse(format!("{}: record {}: {}", path.display(), i + 1, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        value @ serde_json::Value::Object(_) => {
            let record = serde_json::from_value::<ProgramRecord>(value)
                .map_err(|e| CliError::parse(format!("{}: {}", path.display(), e)))?;
            vec![record]
        }
        _ => {
            return Err(CliError::parse(format!(
                "{}: expected a program record or an array of records",
                path.display()
            )))
        }
    };

    log::debug!("loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Human summary, on stderr so it never mixes with `--json` output.
fn print_summary(result: &BatchResult) {
    let resumen = &result.resumen;
    eprintln!(
        "analyzed {} of {} programs{} ({})",
        resumen.analizados,
        resumen.total_programas,
        if resumen.fallidos > 0 { format!(", {} failed", resumen.fallidos) } else { String::new() },
        if result.meta.parallel { format!("{} workers", result.meta.workers) } else { "sequential".into() },
    );

    for outcome in &result.programas {
        match outcome {
            ProgramOutcome::Analyzed(program) => {
                let ind = &program.indicadores;
                eprintln!(
                    "  {:<40} score {:>6.2}  thematics {:>2}  findings {}",
                    outcome.programa(),
                    ind.calidad.total,
                    program.tematicas.num_tematicas,
                    ind.hallazgos.len(),
                );
            }
            ProgramOutcome::Failed { reason, .. } => {
                eprintln!("  {:<40} FAILED: {}", outcome.programa(), reason);
            }
        }
    }

    if resumen.analizados > 0 {
        eprintln!("mean quality score: {:.2}", resumen.score_promedio);
    }
    if let Some(top) = resumen.tematicas_mas_frecuentes.first() {
        eprintln!(
            "most frequent thematic: {} ({} programs, {:.1}%)",
            top.tematica, top.programas, top.porcentaje_programas
        );
    }
}
