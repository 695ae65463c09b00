use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use curricula_core::{KnowledgeType, ProgramRecord, TableKind, TableRow};

use crate::config::{
    AnalysisConfig, BalanceConfig, BloomConfig, CompletenessConfig, ThresholdConfig, WritingSource,
};
use crate::error::{AnalysisError, DataWarning, WarningKind};
use crate::normalize::normalize;
use crate::scoring::{
    FixedWritingQuality, QualityScore, QualityScorer, ValidatorWritingQuality, WritingQuality,
};
use crate::taxonomy::{infer_level, ComplexityBucket, LevelSource};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Indicator groups computed for one program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorReport {
    pub programa: String,
    pub source_id: String,
    pub totales: Totals,
    pub balance: BalanceIndicator,
    pub complejidad: ComplexityIndicator,
    pub cobertura: CoverageIndicator,
    pub diversidad: DiversityIndicator,
    pub completitud: CompletenessIndicator,
    pub carga: WorkloadIndicator,
    pub calidad: QualityScore,
    pub hallazgos: Vec<ThresholdFinding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataWarning>,
}

impl IndicatorReport {
    /// All-zero report; what an empty record produces before scoring.
    pub fn empty(programa: &str, source_id: &str) -> Self {
        Self {
            programa: programa.to_string(),
            source_id: source_id.to_string(),
            totales: Totals::default(),
            balance: BalanceIndicator::default(),
            complejidad: ComplexityIndicator::default(),
            cobertura: CoverageIndicator::default(),
            diversidad: DiversityIndicator::default(),
            completitud: CompletenessIndicator::default(),
            carga: WorkloadIndicator::default(),
            calidad: QualityScore::default(),
            hallazgos: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub competencias: usize,
    pub resultados_aprendizaje: usize,
    pub estrategias_meso: usize,
    pub estrategias_micro: usize,
}

/// One value per knowledge type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct KnowledgeShare<T> {
    pub saber: T,
    pub saber_hacer: T,
    pub saber_ser: T,
}

impl<T: Copy> KnowledgeShare<T> {
    pub fn get(&self, kind: KnowledgeType) -> T {
        match kind {
            KnowledgeType::Saber => self.saber,
            KnowledgeType::SaberHacer => self.saber_hacer,
            KnowledgeType::SaberSer => self.saber_ser,
        }
    }

    fn get_mut(&mut self, kind: KnowledgeType) -> &mut T {
        match kind {
            KnowledgeType::Saber => &mut self.saber,
            KnowledgeType::SaberHacer => &mut self.saber_hacer,
            KnowledgeType::SaberSer => &mut self.saber_ser,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BalanceIndicator {
    /// Outcomes with a recognized knowledge type (the percentage base).
    pub total_clasificados: usize,
    pub sin_clasificar: usize,
    pub conteo: KnowledgeShare<usize>,
    pub porcentajes: KnowledgeShare<f64>,
    /// Population std-dev of the three percentages.
    pub desviacion_estandar: f64,
    pub balanceado: bool,
}

/// One value per complexity bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct BucketShare<T> {
    pub basico: T,
    pub intermedio: T,
    pub avanzado: T,
}

impl<T: Copy> BucketShare<T> {
    pub fn get(&self, bucket: ComplexityBucket) -> T {
        match bucket {
            ComplexityBucket::Basico => self.basico,
            ComplexityBucket::Intermedio => self.intermedio,
            ComplexityBucket::Avanzado => self.avanzado,
        }
    }

    fn get_mut(&mut self, bucket: ComplexityBucket) -> &mut T {
        match bucket {
            ComplexityBucket::Basico => &mut self.basico,
            ComplexityBucket::Intermedio => &mut self.intermedio,
            ComplexityBucket::Avanzado => &mut self.avanzado,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ComplexityIndicator {
    pub conteo: BucketShare<usize>,
    pub porcentajes: BucketShare<f64>,
    pub nivel_promedio: f64,
    /// Mean level rescaled from 1..=6 to 0..=100.
    pub indice_complejidad: f64,
    /// Outcomes whose level fell back to the default.
    pub niveles_por_defecto: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CoverageIndicator {
    pub total_competencias: usize,
    pub competencias_con_ra: usize,
    pub porcentaje_cobertura: f64,
    pub promedio_ra_por_competencia: f64,
    /// Labels of competencies no outcome links to.
    pub competencias_sin_ra: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyFrequency {
    pub estrategia: String,
    pub frecuencia: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiversityIndicator {
    pub total_estrategias: usize,
    pub num_estrategias_unicas: usize,
    pub top_estrategias: Vec<StrategyFrequency>,
    pub metodologias_activas: usize,
    pub porcentaje_metodologias_activas: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCompleteness {
    pub tabla: TableKind,
    pub filas: usize,
    pub campos_requeridos: usize,
    pub celdas_llenas: usize,
    pub porcentaje: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletenessIndicator {
    pub por_tabla: Vec<TableCompleteness>,
    /// Unweighted mean of the four table percentages.
    pub completitud_total: f64,
}

/// Student workload declared by the micro strategies.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkloadIndicator {
    pub horas_presenciales: f64,
    pub horas_autonomas: f64,
    pub horas_totales: f64,
    /// Independent hours per direct hour; `None` without direct hours.
    pub ratio_autonomas_presenciales: Option<f64>,
    /// Micro strategies with at least one usable hours value.
    pub filas_con_horas: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingRule {
    MinCompetencias,
    MinRaPorCompetencia,
    MinCompletitud,
}

/// A program below one of the configured minimums.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdFinding {
    pub regla: FindingRule,
    pub esperado: f64,
    pub observado: f64,
    pub mensaje: String,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Computes an [`IndicatorReport`] per program. Immutable after construction.
pub struct IndicatorEngine {
    balance: BalanceConfig,
    bloom: BloomConfig,
    top_n: usize,
    active_methodologies: Vec<String>,
    completeness: CompletenessConfig,
    thresholds: ThresholdConfig,
    scorer: QualityScorer,
    writing: Arc<dyn WritingQuality>,
}

impl IndicatorEngine {
    pub fn new(config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let scorer = QualityScorer::new(config.weights, &config.scoring)?;
        let writing: Arc<dyn WritingQuality> = match config.scoring.redaccion {
            WritingSource::Fixed => Arc::new(FixedWritingQuality(config.scoring.redaccion_default)),
            WritingSource::Validator => Arc::new(ValidatorWritingQuality::new(&config.bloom, &config.scoring)),
        };
        Ok(Self {
            balance: config.balance.clone(),
            bloom: config.bloom.clone(),
            top_n: config.diversity.top_n,
            active_methodologies: config
                .diversity
                .active_methodologies
                .iter()
                .map(|m| normalize(m))
                .filter(|m| !m.is_empty())
                .collect(),
            completeness: config.completeness.clone(),
            thresholds: config.thresholds.clone(),
            scorer,
            writing,
        })
    }

    pub fn with_writing_quality(mut self, writing: Arc<dyn WritingQuality>) -> Self {
        self.writing = writing;
        self
    }

    pub fn scorer(&self) -> &QualityScorer {
        &self.scorer
    }

    pub fn compute(&self, record: &ProgramRecord) -> IndicatorReport {
        let label = record.label();
        let mut report = IndicatorReport::empty(record.programa.trim(), &record.source_id);

        for table in record.missing_tables() {
            log::warn!("{label}: table '{table}' not provided");
            report.warnings.push(DataWarning::missing_table(table));
        }

        report.totales = Totals {
            competencias: record.competencias().len(),
            resultados_aprendizaje: record.resultados().len(),
            estrategias_meso: record.estrategias_meso().len(),
            estrategias_micro: record.estrategias_micro().len(),
        };
        report.balance = self.balance(record, &mut report.warnings);
        report.complejidad = self.complexity(record, &mut report.warnings);
        report.cobertura = coverage(record);
        report.diversidad = self.diversity(record, label, &mut report.warnings);
        report.completitud = self.completeness(record);
        report.carga = workload(record, label, &mut report.warnings);
        report.hallazgos = self.findings(&report);
        report.calidad = self.scorer.score(&report, self.writing.assess(record));

        log::debug!("{label}: quality score {:.1}", report.calidad.total);
        report
    }

    fn balance(&self, record: &ProgramRecord, warnings: &mut Vec<DataWarning>) -> BalanceIndicator {
        let mut out = BalanceIndicator::default();
        for (row, ra) in record.resultados().iter().enumerate() {
            match ra.knowledge_type() {
                Some(kind) => *out.conteo.get_mut(kind) += 1,
                None => {
                    out.sin_clasificar += 1;
                    warnings.push(DataWarning::row(
                        WarningKind::UnknownKnowledgeType,
                        TableKind::ResultadosAprendizaje,
                        row,
                        format!(
                            "knowledge type '{}' not recognized; left out of the balance",
                            ra.tipo_saber.raw_display()
                        ),
                    ));
                }
            }
        }

        out.total_clasificados = out.conteo.saber + out.conteo.saber_hacer + out.conteo.saber_ser;
        if out.total_clasificados == 0 {
            return out;
        }

        let total = out.total_clasificados as f64;
        for kind in KnowledgeType::ALL {
            *out.porcentajes.get_mut(kind) = out.conteo.get(kind) as f64 / total * 100.0;
        }
        let values = KnowledgeType::ALL.map(|k| out.porcentajes.get(k));
        out.desviacion_estandar = population_std(&values);
        out.balanceado = out.desviacion_estandar < self.balance.threshold;
        out
    }

    fn complexity(&self, record: &ProgramRecord, warnings: &mut Vec<DataWarning>) -> ComplexityIndicator {
        let mut out = ComplexityIndicator::default();
        let mut level_sum = 0u32;
        let resultados = record.resultados();

        for (row, ra) in resultados.iter().enumerate() {
            let inferred = infer_level(ra, &self.bloom);
            if inferred.source == LevelSource::Default {
                out.niveles_por_defecto += 1;
                warnings.push(DataWarning::row(
                    WarningKind::UnresolvedLevel,
                    TableKind::ResultadosAprendizaje,
                    row,
                    format!("Bloom level not resolved; using default {}", inferred.level),
                ));
            }
            level_sum += u32::from(inferred.level);
            *out.conteo.get_mut(ComplexityBucket::from_level(inferred.level, &self.bloom)) += 1;
        }

        if resultados.is_empty() {
            return out;
        }

        let n = resultados.len() as f64;
        for bucket in ComplexityBucket::ALL {
            *out.porcentajes.get_mut(bucket) = out.conteo.get(bucket) as f64 / n * 100.0;
        }
        out.nivel_promedio = f64::from(level_sum) / n;
        out.indice_complejidad = (out.nivel_promedio - 1.0) / 5.0 * 100.0;
        out
    }

    fn diversity(&self, record: &ProgramRecord, label: &str, warnings: &mut Vec<DataWarning>) -> DiversityIndicator {
        // (display name, occurrences), first-seen order
        let mut seen: Vec<(String, usize)> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut out = DiversityIndicator::default();

        for (row, micro) in record.estrategias_micro().iter().enumerate() {
            let (name, coerced) = micro.estrategia.text_or_empty();
            if coerced {
                log::warn!("{label}: estrategias_micro row {row}: non-text 'estrategia' read as empty");
                warnings.push(DataWarning::non_text(TableKind::EstrategiasMicro, row, "estrategia"));
            }
            let key = normalize(name);
            if key.is_empty() {
                continue;
            }

            out.total_estrategias += 1;
            if self.active_methodologies.iter().any(|m| key.contains(m.as_str())) {
                out.metodologias_activas += 1;
            }
            match index.get(&key) {
                Some(&i) => seen[i].1 += 1,
                None => {
                    index.insert(key, seen.len());
                    seen.push((name.trim().to_string(), 1));
                }
            }
        }

        out.num_estrategias_unicas = seen.len();
        if out.total_estrategias > 0 {
            out.porcentaje_metodologias_activas =
                out.metodologias_activas as f64 / out.total_estrategias as f64 * 100.0;
        }

        // Stable sort keeps first-seen order among equal counts.
        seen.sort_by(|a, b| b.1.cmp(&a.1));
        out.top_estrategias = seen
            .into_iter()
            .take(self.top_n)
            .map(|(estrategia, frecuencia)| StrategyFrequency { estrategia, frecuencia })
            .collect();
        out
    }

    fn completeness(&self, record: &ProgramRecord) -> CompletenessIndicator {
        let required = &self.completeness.required;
        let por_tabla = vec![
            table_completeness(record.competencias(), required.for_table(TableKind::Competencias)),
            table_completeness(record.resultados(), required.for_table(TableKind::ResultadosAprendizaje)),
            table_completeness(record.estrategias_meso(), required.for_table(TableKind::EstrategiasMeso)),
            table_completeness(record.estrategias_micro(), required.for_table(TableKind::EstrategiasMicro)),
        ];
        let completitud_total = por_tabla.iter().map(|t| t.porcentaje).sum::<f64>() / por_tabla.len() as f64;
        CompletenessIndicator {
            por_tabla,
            completitud_total,
        }
    }

    fn findings(&self, report: &IndicatorReport) -> Vec<ThresholdFinding> {
        let t = &self.thresholds;
        let mut findings = Vec::new();

        let competencias = report.totales.competencias;
        if competencias < t.min_competencias {
            findings.push(ThresholdFinding {
                regla: FindingRule::MinCompetencias,
                esperado: t.min_competencias as f64,
                observado: competencias as f64,
                mensaje: format!("{competencias} competencies, at least {} expected", t.min_competencias),
            });
        }

        let promedio = report.cobertura.promedio_ra_por_competencia;
        if competencias > 0 && promedio < t.min_ra_por_competencia {
            findings.push(ThresholdFinding {
                regla: FindingRule::MinRaPorCompetencia,
                esperado: t.min_ra_por_competencia,
                observado: promedio,
                mensaje: format!(
                    "{promedio:.2} learning outcomes per competency, at least {} expected",
                    t.min_ra_por_competencia
                ),
            });
        }

        let completitud = report.completitud.completitud_total;
        if completitud < t.min_completitud {
            findings.push(ThresholdFinding {
                regla: FindingRule::MinCompletitud,
                esperado: t.min_completitud,
                observado: completitud,
                mensaje: format!("completeness {completitud:.1}%, at least {}% expected", t.min_completitud),
            });
        }
        findings
    }
}

/// A competency is covered when some outcome's `competencia` equals its
/// number or its full text.
fn coverage(record: &ProgramRecord) -> CoverageIndicator {
    let competencias = record.competencias();
    let resultados = record.resultados();

    let mut links: Vec<(Option<String>, String)> = Vec::with_capacity(resultados.len());
    for ra in resultados {
        let text = ra.competencia.as_text().map(normalize).unwrap_or_default();
        links.push((ra.competencia.as_key(), text));
    }

    let mut out = CoverageIndicator {
        total_competencias: competencias.len(),
        ..Default::default()
    };
    for (i, comp) in competencias.iter().enumerate() {
        let key = comp.numero.as_key();
        let text = comp.redaccion.as_text().map(normalize).unwrap_or_default();
        let linked = links.iter().any(|(ra_key, ra_text)| {
            (key.is_some() && *ra_key == key) || (!text.is_empty() && *ra_text == text)
        });
        if linked {
            out.competencias_con_ra += 1;
        } else {
            let label = match comp.numero.raw_display() {
                s if s.trim().is_empty() => format!("#{}", i + 1),
                s => s,
            };
            out.competencias_sin_ra.push(label);
        }
    }

    if !competencias.is_empty() {
        let n = competencias.len() as f64;
        out.porcentaje_cobertura = out.competencias_con_ra as f64 / n * 100.0;
        out.promedio_ra_por_competencia = resultados.len() as f64 / n;
    }
    out
}

fn workload(record: &ProgramRecord, label: &str, warnings: &mut Vec<DataWarning>) -> WorkloadIndicator {
    let mut out = WorkloadIndicator::default();

    for (row, micro) in record.estrategias_micro().iter().enumerate() {
        let mut usable = false;
        for (field, cell, total) in [
            ("horas_presenciales", &micro.horas_presenciales, &mut out.horas_presenciales),
            ("horas_autonomas", &micro.horas_autonomas, &mut out.horas_autonomas),
        ] {
            if cell.is_empty() {
                continue;
            }
            match cell.as_number().filter(|h| *h >= 0.0) {
                Some(hours) => {
                    *total += hours;
                    usable = true;
                }
                None => {
                    log::warn!("{label}: estrategias_micro row {row}: '{field}' is not a number of hours");
                    warnings.push(DataWarning::non_numeric(TableKind::EstrategiasMicro, row, field));
                }
            }
        }
        if usable {
            out.filas_con_horas += 1;
        }
    }

    out.horas_totales = out.horas_presenciales + out.horas_autonomas;
    if out.horas_presenciales > 0.0 {
        out.ratio_autonomas_presenciales = Some(out.horas_autonomas / out.horas_presenciales);
    }
    out
}

fn table_completeness<R: TableRow>(rows: &[R], required: &[String]) -> TableCompleteness {
    let celdas_llenas = rows
        .iter()
        .map(|row| {
            required
                .iter()
                .filter(|f| row.field(f).is_some_and(|cell| cell.is_filled()))
                .count()
        })
        .sum::<usize>();
    let expected = rows.len() * required.len();
    let porcentaje = if rows.is_empty() {
        0.0
    } else if required.is_empty() {
        100.0
    } else {
        celdas_llenas as f64 / expected as f64 * 100.0
    };
    TableCompleteness {
        tabla: R::TABLE,
        filas: rows.len(),
        campos_requeridos: required.len(),
        celdas_llenas,
        porcentaje,
    }
}

fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}
