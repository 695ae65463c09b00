use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;

use curricula_core::ProgramRecord;

use crate::config::AnalysisConfig;
use crate::consolidate::{aggregate, compute_summary, AnalyzedProgram, BatchSummary, ConsolidatedMatrix, ProgramOutcome};
use crate::error::AnalysisError;
use crate::indicators::IndicatorEngine;
use crate::scoring::WritingQuality;
use crate::thematic::ThematicMatcher;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub parallel: bool,
    pub workers: usize,
}

/// Everything a batch run produces, ready for a rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub meta: BatchMeta,
    pub resumen: BatchSummary,
    pub programas: Vec<ProgramOutcome>,
    pub consolidado: ConsolidatedMatrix,
}

impl BatchResult {
    pub fn failed_count(&self) -> usize {
        self.programas.iter().filter(|p| p.is_failed()).count()
    }
}

/// Matcher, indicator engine and scorer built from one validated config.
///
/// Construction is the only fallible step for configuration; once built,
/// analysis never fails for config reasons and is safe to share across
/// worker threads.
pub struct Analyzer {
    config: AnalysisConfig,
    matcher: ThematicMatcher,
    engine: IndicatorEngine,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let matcher = ThematicMatcher::new(&config);
        let engine = IndicatorEngine::new(&config)?;
        Ok(Self { config, matcher, engine })
    }

    pub fn with_writing_quality(mut self, writing: Arc<dyn WritingQuality>) -> Self {
        self.engine = self.engine.with_writing_quality(writing);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn matcher(&self) -> &ThematicMatcher {
        &self.matcher
    }

    pub fn engine(&self) -> &IndicatorEngine {
        &self.engine
    }

    /// Analyze one program. Fails only when the record has no identity.
    pub fn analyze(&self, record: &ProgramRecord) -> Result<AnalyzedProgram, AnalysisError> {
        self.analyze_at(0, record)
    }

    fn analyze_at(&self, index: usize, record: &ProgramRecord) -> Result<AnalyzedProgram, AnalysisError> {
        if record.label().is_empty() {
            return Err(AnalysisError::InvalidRecord {
                index,
                reason: "program has neither a name nor a source identifier".into(),
            });
        }
        Ok(AnalyzedProgram {
            tematicas: self.matcher.analyze_programa(record),
            indicadores: self.engine.compute(record),
        })
    }

    fn outcome_at(&self, index: usize, record: &ProgramRecord) -> ProgramOutcome {
        match self.analyze_at(index, record) {
            Ok(program) => ProgramOutcome::Analyzed(Box::new(program)),
            Err(e) => {
                log::warn!("skipping program #{index}: {e}");
                ProgramOutcome::Failed {
                    index,
                    programa: format!("#{}", index + 1),
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Analyze every record, then consolidate. Results keep input order;
    /// a program that cannot be analyzed becomes a marker row and the batch
    /// carries on.
    pub fn run_batch(&self, records: &[ProgramRecord]) -> Result<BatchResult, AnalysisError> {
        let batch = &self.config.batch;
        let workers = batch.max_workers.min(records.len()).max(1);
        let parallel = batch.parallel && workers > 1;

        log::info!(
            "analyzing {} programs ({})",
            records.len(),
            if parallel { format!("{workers} workers") } else { "sequential".to_string() }
        );

        let programas: Vec<ProgramOutcome> = if parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(workers)
                .build()
                .map_err(|e| AnalysisError::WorkerPool(e.to_string()))?;
            // Indexed collect keeps each result in its input slot.
            pool.install(|| {
                records
                    .par_iter()
                    .enumerate()
                    .map(|(i, record)| self.outcome_at(i, record))
                    .collect()
            })
        } else {
            records.iter().enumerate().map(|(i, record)| self.outcome_at(i, record)).collect()
        };

        let consolidado = aggregate(&programas, &self.matcher.thematic_names());
        let resumen = compute_summary(&programas, &consolidado);

        log::info!("batch done: {} analyzed, {} failed", resumen.analizados, resumen.fallidos);

        Ok(BatchResult {
            meta: BatchMeta {
                config_name: self.config.name.clone(),
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                parallel,
                workers: if parallel { workers } else { 1 },
            },
            resumen,
            programas,
            consolidado,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThematicDefinition;
    use curricula_core::{Competency, LearningOutcome};

    fn record(name: &str, text: &str) -> ProgramRecord {
        ProgramRecord::new(name, format!("{name}.xlsx"))
            .with_competencias(vec![Competency {
                numero: 1.into(),
                redaccion: text.into(),
                ..Default::default()
            }])
            .with_resultados(vec![LearningOutcome {
                competencia: 1.into(),
                tipo_saber: "Saber Hacer".into(),
                nivel_dominio: 3.into(),
                redaccion: text.into(),
                ..Default::default()
            }])
    }

    fn records() -> Vec<ProgramRecord> {
        vec![
            record("Administración", "Gestionar organizaciones sostenibles"),
            record("Contaduría", "Aplicar análisis de datos financieros"),
            ProgramRecord::new("", ""),
            record("Economía", "Evaluar el impacto de la inteligencia artificial"),
            record("Mercadeo", "Diseñar estrategias de comercio electrónico"),
        ]
    }

    #[test]
    fn new_rejects_invalid_config() {
        let mut config = AnalysisConfig::default();
        config.weights.completitud = 0.5;
        assert!(matches!(Analyzer::new(config), Err(AnalysisError::InvalidWeights { .. })));

        let mut config = AnalysisConfig::default();
        config.thematics.push(ThematicDefinition::new("VACIA", &[], &[]));
        assert!(matches!(Analyzer::new(config), Err(AnalysisError::EmptyKeywords { .. })));
    }

    #[test]
    fn blank_identity_becomes_failed_outcome() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let result = analyzer.run_batch(&records()).unwrap();
        assert_eq!(result.programas.len(), 5);
        assert_eq!(result.failed_count(), 1);
        assert!(result.programas[2].is_failed());
        assert_eq!(result.programas[2].programa(), "#3");
        assert_eq!(result.consolidado.tematicas.rows.len(), 5);
        assert_eq!(result.resumen.analizados, 4);
    }

    #[test]
    fn parallel_matches_sequential() {
        let mut config = AnalysisConfig::default();
        config.batch.parallel = false;
        let sequential = Analyzer::new(config.clone()).unwrap().run_batch(&records()).unwrap();

        config.batch.parallel = true;
        config.batch.max_workers = 3;
        let parallel = Analyzer::new(config).unwrap().run_batch(&records()).unwrap();

        assert!(parallel.meta.parallel);
        assert_eq!(parallel.meta.workers, 3);
        assert!(!sequential.meta.parallel);
        assert_eq!(parallel.programas, sequential.programas);
        assert_eq!(parallel.consolidado, sequential.consolidado);
        assert_eq!(parallel.resumen, sequential.resumen);
    }

    #[test]
    fn empty_batch() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let result = analyzer.run_batch(&[]).unwrap();
        assert!(result.programas.is_empty());
        assert!(result.consolidado.tematicas.rows.is_empty());
        assert_eq!(result.consolidado.tematicas.columns.len(), 10);
        assert!(!result.meta.parallel);
    }

    #[test]
    fn analyze_single_program() {
        let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
        let program = analyzer.analyze(&record("Economía", "Desarrollo sostenible")).unwrap();
        assert_eq!(program.tematicas.tematicas_presentes, vec!["SOSTENIBILIDAD"]);
        assert_eq!(program.indicadores.cobertura.porcentaje_cobertura, 100.0);

        let err = analyzer.analyze(&ProgramRecord::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidRecord { index: 0, .. }));
    }
}
