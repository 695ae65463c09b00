use serde::Serialize;

use crate::indicators::IndicatorReport;
use crate::thematic::ThematicResult;

// ---------------------------------------------------------------------------
// Per-program outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzedProgram {
    pub tematicas: ThematicResult,
    pub indicadores: IndicatorReport,
}

/// Result slot of one program in a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProgramOutcome {
    Analyzed(Box<AnalyzedProgram>),
    Failed {
        index: usize,
        programa: String,
        reason: String,
    },
}

impl ProgramOutcome {
    pub fn programa(&self) -> &str {
        match self {
            Self::Analyzed(p) => &p.indicadores.programa,
            Self::Failed { programa, .. } => programa,
        }
    }

    pub fn analyzed(&self) -> Option<&AnalyzedProgram> {
        match self {
            Self::Analyzed(p) => Some(p),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowStatus {
    Analyzed,
    /// Marker row: the program could not be analyzed; values are zero.
    Failed,
}

// ---------------------------------------------------------------------------
// Program x Thematic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThematicRow {
    pub programa: String,
    pub status: RowStatus,
    /// Match count per column.
    pub counts: Vec<u32>,
    pub num_tematicas: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThematicCoverage {
    pub tematica: String,
    pub programas: usize,
    pub porcentaje_programas: f64,
    pub total_coincidencias: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ThematicTable {
    /// Catalog order.
    pub columns: Vec<String>,
    pub rows: Vec<ThematicRow>,
    /// Column sums over analyzed rows.
    pub totals: Vec<u32>,
}

impl ThematicTable {
    pub fn new(columns: Vec<String>, rows: Vec<ThematicRow>) -> Self {
        let mut totals = vec![0u32; columns.len()];
        for row in rows.iter().filter(|r| r.status == RowStatus::Analyzed) {
            for (total, count) in totals.iter_mut().zip(&row.counts) {
                *total += count;
            }
        }
        Self { columns, rows, totals }
    }

    pub fn column(&self, thematic: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == thematic)
    }

    /// Programs with at least `min` matches of `thematic`, highest first;
    /// ties keep input order.
    pub fn programs_with(&self, thematic: &str, min: u32) -> Vec<(String, u32)> {
        let Some(col) = self.column(thematic) else {
            return Vec::new();
        };
        let mut hits: Vec<(String, u32)> = self
            .rows
            .iter()
            .filter(|r| r.status == RowStatus::Analyzed)
            .filter_map(|r| {
                let count = r.counts.get(col).copied().unwrap_or(0);
                (count >= min.max(1)).then(|| (r.programa.clone(), count))
            })
            .collect();
        hits.sort_by(|a, b| b.1.cmp(&a.1));
        hits
    }

    /// How many analyzed programs address each thematic.
    pub fn coverage(&self) -> Vec<ThematicCoverage> {
        let analyzed: Vec<&ThematicRow> = self.rows.iter().filter(|r| r.status == RowStatus::Analyzed).collect();
        self.columns
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let programas = analyzed.iter().filter(|r| r.counts.get(col).is_some_and(|c| *c > 0)).count();
                let porcentaje_programas = if analyzed.is_empty() {
                    0.0
                } else {
                    programas as f64 / analyzed.len() as f64 * 100.0
                };
                ThematicCoverage {
                    tematica: name.clone(),
                    programas,
                    porcentaje_programas,
                    total_coincidencias: self.totals.get(col).copied().unwrap_or(0),
                }
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Program x Indicator
// ---------------------------------------------------------------------------

/// Indicator columns, in definition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorColumn {
    TotalCompetencias,
    TotalResultados,
    TotalEstrategiasMeso,
    TotalEstrategiasMicro,
    PorcentajeSaber,
    PorcentajeSaberHacer,
    PorcentajeSaberSer,
    DesviacionBalance,
    Balanceado,
    PorcentajeBasico,
    PorcentajeIntermedio,
    PorcentajeAvanzado,
    NivelPromedio,
    IndiceComplejidad,
    PorcentajeCobertura,
    PromedioRaPorCompetencia,
    EstrategiasUnicas,
    PorcentajeMetodologiasActivas,
    CompletitudTotal,
    HorasPresenciales,
    HorasAutonomas,
    RatioAutonomasPresenciales,
    ScoreCalidad,
}

impl IndicatorColumn {
    pub const ALL: [IndicatorColumn; 23] = [
        Self::TotalCompetencias,
        Self::TotalResultados,
        Self::TotalEstrategiasMeso,
        Self::TotalEstrategiasMicro,
        Self::PorcentajeSaber,
        Self::PorcentajeSaberHacer,
        Self::PorcentajeSaberSer,
        Self::DesviacionBalance,
        Self::Balanceado,
        Self::PorcentajeBasico,
        Self::PorcentajeIntermedio,
        Self::PorcentajeAvanzado,
        Self::NivelPromedio,
        Self::IndiceComplejidad,
        Self::PorcentajeCobertura,
        Self::PromedioRaPorCompetencia,
        Self::EstrategiasUnicas,
        Self::PorcentajeMetodologiasActivas,
        Self::CompletitudTotal,
        Self::HorasPresenciales,
        Self::HorasAutonomas,
        Self::RatioAutonomasPresenciales,
        Self::ScoreCalidad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TotalCompetencias => "total_competencias",
            Self::TotalResultados => "total_resultados",
            Self::TotalEstrategiasMeso => "total_estrategias_meso",
            Self::TotalEstrategiasMicro => "total_estrategias_micro",
            Self::PorcentajeSaber => "porcentaje_saber",
            Self::PorcentajeSaberHacer => "porcentaje_saber_hacer",
            Self::PorcentajeSaberSer => "porcentaje_saber_ser",
            Self::DesviacionBalance => "desviacion_balance",
            Self::Balanceado => "balanceado",
            Self::PorcentajeBasico => "porcentaje_basico",
            Self::PorcentajeIntermedio => "porcentaje_intermedio",
            Self::PorcentajeAvanzado => "porcentaje_avanzado",
            Self::NivelPromedio => "nivel_promedio",
            Self::IndiceComplejidad => "indice_complejidad",
            Self::PorcentajeCobertura => "porcentaje_cobertura",
            Self::PromedioRaPorCompetencia => "promedio_ra_por_competencia",
            Self::EstrategiasUnicas => "estrategias_unicas",
            Self::PorcentajeMetodologiasActivas => "porcentaje_metodologias_activas",
            Self::CompletitudTotal => "completitud_total",
            Self::HorasPresenciales => "horas_presenciales",
            Self::HorasAutonomas => "horas_autonomas",
            Self::RatioAutonomasPresenciales => "ratio_autonomas_presenciales",
            Self::ScoreCalidad => "score_calidad",
        }
    }

    /// Read this column from a report. Flags are 1.0 / 0.0; an undefined
    /// hours ratio reads as 0.0 like any other missing value in the matrix.
    pub fn value(&self, r: &IndicatorReport) -> f64 {
        match self {
            Self::TotalCompetencias => r.totales.competencias as f64,
            Self::TotalResultados => r.totales.resultados_aprendizaje as f64,
            Self::TotalEstrategiasMeso => r.totales.estrategias_meso as f64,
            Self::TotalEstrategiasMicro => r.totales.estrategias_micro as f64,
            Self::PorcentajeSaber => r.balance.porcentajes.saber,
            Self::PorcentajeSaberHacer => r.balance.porcentajes.saber_hacer,
            Self::PorcentajeSaberSer => r.balance.porcentajes.saber_ser,
            Self::DesviacionBalance => r.balance.desviacion_estandar,
            Self::Balanceado => {
                if r.balance.balanceado {
                    1.0
                } else {
                    0.0
                }
            }
            Self::PorcentajeBasico => r.complejidad.porcentajes.basico,
            Self::PorcentajeIntermedio => r.complejidad.porcentajes.intermedio,
            Self::PorcentajeAvanzado => r.complejidad.porcentajes.avanzado,
            Self::NivelPromedio => r.complejidad.nivel_promedio,
            Self::IndiceComplejidad => r.complejidad.indice_complejidad,
            Self::PorcentajeCobertura => r.cobertura.porcentaje_cobertura,
            Self::PromedioRaPorCompetencia => r.cobertura.promedio_ra_por_competencia,
            Self::EstrategiasUnicas => r.diversidad.num_estrategias_unicas as f64,
            Self::PorcentajeMetodologiasActivas => r.diversidad.porcentaje_metodologias_activas,
            Self::CompletitudTotal => r.completitud.completitud_total,
            Self::HorasPresenciales => r.carga.horas_presenciales,
            Self::HorasAutonomas => r.carga.horas_autonomas,
            Self::RatioAutonomasPresenciales => r.carga.ratio_autonomas_presenciales.unwrap_or(0.0),
            Self::ScoreCalidad => r.calidad.total,
        }
    }
}

impl std::fmt::Display for IndicatorColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorRow {
    pub programa: String,
    pub status: RowStatus,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorTable {
    pub columns: Vec<IndicatorColumn>,
    pub rows: Vec<IndicatorRow>,
}

impl Default for IndicatorTable {
    fn default() -> Self {
        Self {
            columns: IndicatorColumn::ALL.to_vec(),
            rows: Vec::new(),
        }
    }
}

impl IndicatorTable {
    pub fn value(&self, row: usize, column: IndicatorColumn) -> Option<f64> {
        let col = self.columns.iter().position(|c| *c == column)?;
        self.rows.get(row)?.values.get(col).copied()
    }
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsolidatedMatrix {
    pub tematicas: ThematicTable,
    pub indicadores: IndicatorTable,
}

/// Build both tables from per-program outcomes. Nothing is recomputed; row
/// order is input order and failed programs become zero marker rows.
pub fn aggregate(outcomes: &[ProgramOutcome], thematic_names: &[String]) -> ConsolidatedMatrix {
    let mut thematic_rows = Vec::with_capacity(outcomes.len());
    let mut indicator_rows = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        match outcome {
            ProgramOutcome::Analyzed(p) => {
                // Align by name so a result from another catalog cannot shift columns.
                let counts = thematic_names
                    .iter()
                    .map(|name| p.tematicas.get(name).map(|t| t.total_coincidencias).unwrap_or(0))
                    .collect();
                thematic_rows.push(ThematicRow {
                    programa: label(&p.tematicas.programa, &p.tematicas.source_id),
                    status: RowStatus::Analyzed,
                    counts,
                    num_tematicas: p.tematicas.num_tematicas,
                });
                indicator_rows.push(IndicatorRow {
                    programa: label(&p.indicadores.programa, &p.indicadores.source_id),
                    status: RowStatus::Analyzed,
                    values: IndicatorColumn::ALL.iter().map(|c| c.value(&p.indicadores)).collect(),
                });
            }
            ProgramOutcome::Failed { programa, .. } => {
                thematic_rows.push(ThematicRow {
                    programa: programa.clone(),
                    status: RowStatus::Failed,
                    counts: vec![0; thematic_names.len()],
                    num_tematicas: 0,
                });
                indicator_rows.push(IndicatorRow {
                    programa: programa.clone(),
                    status: RowStatus::Failed,
                    values: vec![0.0; IndicatorColumn::ALL.len()],
                });
            }
        }
    }

    ConsolidatedMatrix {
        tematicas: ThematicTable::new(thematic_names.to_vec(), thematic_rows),
        indicadores: IndicatorTable {
            columns: IndicatorColumn::ALL.to_vec(),
            rows: indicator_rows,
        },
    }
}

fn label(programa: &str, source_id: &str) -> String {
    if programa.trim().is_empty() {
        source_id.trim().to_string()
    } else {
        programa.trim().to_string()
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramScore {
    pub programa: String,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total_programas: usize,
    pub analizados: usize,
    pub fallidos: usize,
    pub score_promedio: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_maximo: Option<ProgramScore>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_minimo: Option<ProgramScore>,
    /// Highest scores first; ties keep input order.
    pub ranking: Vec<ProgramScore>,
    pub tematicas_mas_frecuentes: Vec<ThematicCoverage>,
}

/// Number of entries kept in `BatchSummary::ranking`.
pub const RANKING_LEN: usize = 5;

pub fn compute_summary(outcomes: &[ProgramOutcome], matrix: &ConsolidatedMatrix) -> BatchSummary {
    let mut scores: Vec<ProgramScore> = outcomes
        .iter()
        .filter_map(ProgramOutcome::analyzed)
        .map(|p| ProgramScore {
            programa: label(&p.indicadores.programa, &p.indicadores.source_id),
            score: p.indicadores.calidad.total,
        })
        .collect();

    let analizados = scores.len();
    let score_promedio = if scores.is_empty() {
        0.0
    } else {
        scores.iter().map(|s| s.score).sum::<f64>() / analizados as f64
    };

    scores.sort_by(|a, b| b.score.total_cmp(&a.score));
    let score_maximo = scores.first().cloned();
    let score_minimo = scores.last().cloned();
    scores.truncate(RANKING_LEN);

    let mut tematicas_mas_frecuentes = matrix.tematicas.coverage();
    tematicas_mas_frecuentes.sort_by(|a, b| b.programas.cmp(&a.programas));
    tematicas_mas_frecuentes.retain(|t| t.programas > 0);

    BatchSummary {
        total_programas: outcomes.len(),
        analizados,
        fallidos: outcomes.len() - analizados,
        score_promedio,
        score_maximo,
        score_minimo,
        ranking: scores,
        tematicas_mas_frecuentes,
    }
}
