use serde::Serialize;

use curricula_core::{CellValue, Competency, LearningOutcome, ProgramRecord};

use crate::config::{BloomConfig, QualityWeights, ScoringConfig};
use crate::error::AnalysisError;
use crate::indicators::IndicatorReport;
use crate::normalize::normalize;
use crate::taxonomy::{declared_level, verb_level};

// ---------------------------------------------------------------------------
// Writing quality
// ---------------------------------------------------------------------------

/// Supplies the writing-quality sub-score (0-100) for a program.
///
/// Assessing prose is outside the engine; callers plug in their own
/// assessor, the default returns a fixed value.
pub trait WritingQuality: Send + Sync {
    fn assess(&self, record: &ProgramRecord) -> f64;
}

#[derive(Debug, Clone, Copy)]
pub struct FixedWritingQuality(pub f64);

impl WritingQuality for FixedWritingQuality {
    fn assess(&self, _record: &ProgramRecord) -> f64 {
        self.0
    }
}

/// Rule checks on one competency or outcome text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextCheck {
    /// Some word of the text is a taxonomy verb.
    pub tiene_verbo: bool,
    pub longitud_minima: bool,
    pub longitud_maxima: bool,
    /// Outcomes only: the verb's level equals the declared `nivel_dominio`.
    pub coherencia_nivel: Option<bool>,
}

impl TextCheck {
    /// Share of applicable rules passed, 0-100.
    pub fn score(&self) -> f64 {
        let mut rules = vec![self.tiene_verbo, self.longitud_minima, self.longitud_maxima];
        rules.extend(self.coherencia_nivel);
        let passed = rules.iter().filter(|ok| **ok).count();
        passed as f64 / rules.len() as f64 * 100.0
    }
}

/// Scores the competency and outcome texts of a program against the
/// taxonomy: verb present, word count within bounds and, for outcomes,
/// verb level matching the declared level. The program score is the mean
/// over all texts; a program without texts scores 0.
#[derive(Debug, Clone)]
pub struct ValidatorWritingQuality {
    bloom: BloomConfig,
    min_palabras: usize,
    max_palabras: usize,
}

impl ValidatorWritingQuality {
    pub fn new(bloom: &BloomConfig, scoring: &ScoringConfig) -> Self {
        Self {
            bloom: bloom.clone(),
            min_palabras: scoring.min_palabras,
            max_palabras: scoring.max_palabras,
        }
    }

    pub fn check_competency(&self, competency: &Competency) -> TextCheck {
        self.check_text(&competency.redaccion)
    }

    pub fn check_outcome(&self, outcome: &LearningOutcome) -> TextCheck {
        let mut check = self.check_text(&outcome.redaccion);
        let verb = match outcome.verbo.as_text().map(normalize) {
            Some(v) if !v.is_empty() => v,
            _ => outcome.redaccion.as_text().map(normalize).unwrap_or_default(),
        };
        let used = verb.split(' ').next().and_then(|w| verb_level(w, &self.bloom));
        let declared = declared_level(&outcome.nivel_dominio, &self.bloom);
        check.coherencia_nivel = Some(match (used, declared) {
            (Some(v), Some(d)) => v == d,
            _ => false,
        });
        check
    }

    fn check_text(&self, cell: &CellValue) -> TextCheck {
        let text = cell.as_text().map(normalize).unwrap_or_default();
        let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();
        if words.is_empty() {
            return TextCheck {
                tiene_verbo: false,
                longitud_minima: false,
                longitud_maxima: false,
                coherencia_nivel: None,
            };
        }
        TextCheck {
            tiene_verbo: words.iter().any(|w| verb_level(w, &self.bloom).is_some()),
            longitud_minima: words.len() >= self.min_palabras,
            longitud_maxima: words.len() <= self.max_palabras,
            coherencia_nivel: None,
        }
    }
}

impl WritingQuality for ValidatorWritingQuality {
    fn assess(&self, record: &ProgramRecord) -> f64 {
        let scores: Vec<f64> = record
            .competencias()
            .iter()
            .map(|c| self.check_competency(c).score())
            .chain(record.resultados().iter().map(|ra| self.check_outcome(ra).score()))
            .collect();
        if scores.is_empty() {
            return 0.0;
        }
        scores.iter().sum::<f64>() / scores.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// The six 0-100 sub-scores, in weight order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SubScores {
    pub completitud: f64,
    pub complejidad_cognitiva: f64,
    pub balance_tipo_saber: f64,
    pub diversidad_metodologica: f64,
    pub cobertura_competencias: f64,
    pub calidad_redaccion: f64,
}

impl SubScores {
    fn as_array(&self) -> [f64; 6] {
        [
            self.completitud,
            self.complejidad_cognitiva,
            self.balance_tipo_saber,
            self.diversidad_metodologica,
            self.cobertura_competencias,
            self.calidad_redaccion,
        ]
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct QualityScore {
    pub total: f64,
    pub subscores: SubScores,
}

/// Weighted fold of the indicator groups into a single score.
#[derive(Debug, Clone)]
pub struct QualityScorer {
    weights: QualityWeights,
    balance_scale: f64,
}

impl QualityScorer {
    /// Fails when the weights do not sum to 1.0; they are never renormalized.
    pub fn new(weights: QualityWeights, scoring: &ScoringConfig) -> Result<Self, AnalysisError> {
        weights.validate()?;
        Ok(Self {
            weights,
            balance_scale: scoring.balance_scale,
        })
    }

    pub fn weights(&self) -> &QualityWeights {
        &self.weights
    }

    pub fn subscores(&self, report: &IndicatorReport, redaccion: f64) -> SubScores {
        let balance = if report.balance.total_clasificados == 0 {
            0.0
        } else {
            clamp_score(100.0 - report.balance.desviacion_estandar * self.balance_scale)
        };
        SubScores {
            completitud: clamp_score(report.completitud.completitud_total),
            complejidad_cognitiva: clamp_score(report.complejidad.indice_complejidad),
            balance_tipo_saber: balance,
            diversidad_metodologica: clamp_score(report.diversidad.porcentaje_metodologias_activas),
            cobertura_competencias: clamp_score(report.cobertura.porcentaje_cobertura),
            calidad_redaccion: clamp_score(redaccion),
        }
    }

    /// `Σ weight × subscore`, within 0..=100.
    pub fn score(&self, report: &IndicatorReport, redaccion: f64) -> QualityScore {
        let subscores = self.subscores(report, redaccion);
        let total = self
            .weights
            .as_array()
            .iter()
            .zip(subscores.as_array())
            .map(|(w, s)| w * s)
            .sum::<f64>();
        QualityScore {
            total: clamp_score(total),
            subscores,
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorReport;

    fn report() -> IndicatorReport {
        let mut report = IndicatorReport::empty("Contaduría", "cont.xlsx");
        report.balance.total_clasificados = 9;
        report.balance.desviacion_estandar = 4.0;
        report.complejidad.indice_complejidad = 55.0;
        report.cobertura.porcentaje_cobertura = 100.0;
        report.diversidad.porcentaje_metodologias_activas = 40.0;
        report.completitud.completitud_total = 90.0;
        report
    }

    #[test]
    fn weighted_sum_with_default_weights() {
        let scorer = QualityScorer::new(QualityWeights::default(), &ScoringConfig::default()).unwrap();
        let score = scorer.score(&report(), 80.0);
        assert_eq!(score.subscores.balance_tipo_saber, 80.0);
        // 0.25*90 + 0.20*55 + 0.15*80 + 0.15*40 + 0.15*100 + 0.10*80
        let expected = 22.5 + 11.0 + 12.0 + 6.0 + 15.0 + 8.0;
        assert!((score.total - expected).abs() < 1e-9);
    }

    #[test]
    fn balance_subscore_clamps_at_zero() {
        let scorer = QualityScorer::new(QualityWeights::default(), &ScoringConfig::default()).unwrap();
        let mut r = report();
        r.balance.desviacion_estandar = 47.14;
        assert_eq!(scorer.subscores(&r, 80.0).balance_tipo_saber, 0.0);
    }

    #[test]
    fn no_outcomes_gives_zero_balance() {
        let scorer = QualityScorer::new(QualityWeights::default(), &ScoringConfig::default()).unwrap();
        let empty = IndicatorReport::empty("Vacío", "v");
        let score = scorer.score(&empty, 80.0);
        assert_eq!(score.subscores.balance_tipo_saber, 0.0);
        // Only the writing-quality sub-score contributes.
        assert!((score.total - 8.0).abs() < 1e-9);
    }

    #[test]
    fn rejects_bad_weights() {
        let mut weights = QualityWeights::default();
        weights.completitud = 0.15;
        let err = QualityScorer::new(weights, &ScoringConfig::default()).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidWeights { .. }));

        weights.completitud = 0.35;
        assert!(QualityScorer::new(weights, &ScoringConfig::default()).is_err());
    }

    fn validator() -> ValidatorWritingQuality {
        ValidatorWritingQuality::new(&BloomConfig::default(), &ScoringConfig::default())
    }

    fn competency(text: &str) -> Competency {
        Competency { redaccion: text.into(), ..Default::default() }
    }

    fn outcome(verbo: &str, nivel: CellValue, text: &str) -> LearningOutcome {
        LearningOutcome {
            verbo: verbo.into(),
            nivel_dominio: nivel,
            redaccion: text.into(),
            ..Default::default()
        }
    }

    #[test]
    fn text_without_taxonomy_verb() {
        let check = validator().check_competency(&competency("El estudiante y la contabilidad del sector"));
        assert!(!check.tiene_verbo);
        assert!(check.longitud_minima);
        assert!((check.score() - 200.0 / 3.0).abs() < 1e-9);

        let check = validator().check_competency(&competency("Analiza estados financieros de empresas locales"));
        assert!(check.tiene_verbo);
        assert_eq!(check.score(), 100.0);
    }

    #[test]
    fn text_below_minimum_words() {
        let check = validator().check_competency(&competency("Analizar costos"));
        assert!(check.tiene_verbo);
        assert!(!check.longitud_minima);
        assert!(check.longitud_maxima);
    }

    #[test]
    fn text_above_maximum_words() {
        let long = format!("Evaluar {}", vec!["proyectos"; 50].join(" "));
        let check = validator().check_competency(&competency(&long));
        assert!(check.longitud_minima);
        assert!(!check.longitud_maxima);
    }

    #[test]
    fn outcome_verb_must_match_declared_level() {
        let v = validator();
        let text = "Diseñar planes de negocio para empresas regionales";
        let ok = v.check_outcome(&outcome("Diseñar", "Nivel 6".into(), text));
        assert_eq!(ok.coherencia_nivel, Some(true));
        assert_eq!(ok.score(), 100.0);

        let mismatch = v.check_outcome(&outcome("Diseñar", 2.into(), text));
        assert_eq!(mismatch.coherencia_nivel, Some(false));
        assert_eq!(mismatch.score(), 75.0);

        // No declared level to compare against.
        let untagged = v.check_outcome(&outcome("Diseñar", CellValue::Empty, text));
        assert_eq!(untagged.coherencia_nivel, Some(false));
    }

    #[test]
    fn blank_text_fails_every_rule() {
        assert_eq!(validator().check_competency(&competency("  ")).score(), 0.0);
        let ra = validator().check_outcome(&outcome("", CellValue::Empty, ""));
        assert_eq!(ra.score(), 0.0);
        assert_eq!(validator().assess(&ProgramRecord::new("Vacío", "v")), 0.0);
    }

    #[test]
    fn validator_score_feeds_weighted_total() {
        let record = ProgramRecord::new("Contaduría", "cont.xlsx")
            .with_competencias(vec![
                // 100: verb, 6 words
                competency("Analiza estados financieros de empresas locales"),
                // 66.67: verb, too short
                competency("Analizar costos"),
            ])
            .with_resultados(vec![
                // 100: level 4 tag, level 4 verb
                outcome("Analizar", 4.into(), "Analizar la estructura de costos industriales"),
                // 75: declared 1, verb at 6
                outcome("Crear", 1.into(), "Crear un portafolio de inversión diversificado"),
            ]);
        let redaccion = validator().assess(&record);
        let expected = (100.0 + 200.0 / 3.0 + 100.0 + 75.0) / 4.0;
        assert!((redaccion - expected).abs() < 1e-9);

        let scorer = QualityScorer::new(QualityWeights::default(), &ScoringConfig::default()).unwrap();
        let score = scorer.score(&report(), redaccion);
        assert!((score.subscores.calidad_redaccion - expected).abs() < 1e-9);
        // 0.25*90 + 0.20*55 + 0.15*80 + 0.15*40 + 0.15*100 + 0.10*redaccion
        let total = 22.5 + 11.0 + 12.0 + 6.0 + 15.0 + 0.10 * expected;
        assert!((score.total - total).abs() < 1e-9);
    }

    #[test]
    fn score_stays_in_range() {
        let scorer = QualityScorer::new(QualityWeights::default(), &ScoringConfig::default()).unwrap();
        let score = scorer.score(&report(), 250.0);
        assert_eq!(score.subscores.calidad_redaccion, 100.0);
        assert!(score.total <= 100.0);
    }
}
