use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use curricula_core::TableKind;

use crate::error::AnalysisError;

/// Tolerance used when checking that quality weights add up to 1.0.
pub const WEIGHT_EPSILON: f64 = 1e-6;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Everything the engines need, built once and shared read-only.
///
/// Every section has defaults, so an empty TOML document yields the
/// built-in catalog and weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    pub name: String,
    pub matching: MatchingConfig,
    pub thematics: Vec<ThematicDefinition>,
    pub balance: BalanceConfig,
    pub bloom: BloomConfig,
    pub diversity: DiversityConfig,
    pub completeness: CompletenessConfig,
    pub weights: QualityWeights,
    pub scoring: ScoringConfig,
    pub thresholds: ThresholdConfig,
    pub batch: BatchConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            matching: MatchingConfig::default(),
            thematics: default_thematics(),
            balance: BalanceConfig::default(),
            bloom: BloomConfig::default(),
            diversity: DiversityConfig::default(),
            completeness: CompletenessConfig::default(),
            weights: QualityWeights::default(),
            scoring: ScoringConfig::default(),
            thresholds: ThresholdConfig::default(),
            batch: BatchConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Thematic catalog
// ---------------------------------------------------------------------------

/// A named emergent topic and the keywords that reveal it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThematicDefinition {
    pub name: String,
    pub keywords: Vec<String>,
    /// Phrases that corroborate the topic; counted separately, never enough
    /// on their own to mark it present.
    #[serde(default)]
    pub context_keywords: Vec<String>,
}

impl ThematicDefinition {
    pub fn new(name: &str, keywords: &[&str], context_keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            context_keywords: context_keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchingConfig {
    /// Characters of original text kept on each side of a match.
    pub context_window: usize,
    /// Sample contexts kept per thematic in a program result.
    pub max_contexts: usize,
    /// Matches needed before a thematic counts as present.
    pub min_matches: u32,
    /// Keywords at least this long also match as word prefixes.
    pub min_prefix_len: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            context_window: 100,
            max_contexts: 3,
            min_matches: 1,
            min_prefix_len: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BalanceConfig {
    /// Std-dev (percentage points) below which the knowledge types are balanced.
    pub threshold: f64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self { threshold: 10.0 }
    }
}

/// Bloom taxonomy: bucket limits, fallback level and verbs per level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BloomConfig {
    /// Highest level counted as "Básico".
    pub basico_max: u8,
    /// Highest level counted as "Intermedio"; above is "Avanzado".
    pub intermedio_max: u8,
    /// Level used when nothing else resolves.
    pub default_level: u8,
    pub verbs: Vec<BloomLevelVerbs>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloomLevelVerbs {
    pub level: u8,
    pub name: String,
    pub verbs: Vec<String>,
}

impl Default for BloomConfig {
    fn default() -> Self {
        let level = |level: u8, name: &str, verbs: &[&str]| BloomLevelVerbs {
            level,
            name: name.to_string(),
            verbs: verbs.iter().map(|v| v.to_string()).collect(),
        };
        Self {
            basico_max: 2,
            intermedio_max: 4,
            default_level: 2,
            verbs: vec![
                level(1, "Recordar", &["definir", "listar", "recordar", "identificar", "nombrar", "reconocer", "reproducir", "seleccionar", "enumerar"]),
                level(2, "Comprender", &["explicar", "describir", "interpretar", "resumir", "clasificar", "comparar", "ejemplificar", "parafrasear", "ilustrar"]),
                level(3, "Aplicar", &["aplicar", "ejecutar", "implementar", "usar", "utilizar", "demostrar", "resolver", "calcular", "operar"]),
                level(4, "Analizar", &["analizar", "diferenciar", "organizar", "atribuir", "contrastar", "examinar", "investigar", "categorizar"]),
                level(5, "Evaluar", &["evaluar", "criticar", "juzgar", "verificar", "validar", "argumentar", "defender", "apoyar", "justificar"]),
                level(6, "Crear", &["crear", "diseñar", "construir", "planificar", "producir", "generar", "desarrollar", "formular", "proponer"]),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiversityConfig {
    /// Length of the most-frequent strategies list.
    pub top_n: usize,
    /// Fragments identifying active methodologies (matched on normalized names).
    pub active_methodologies: Vec<String>,
}

impl Default for DiversityConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            active_methodologies: [
                "abp",
                "aprendizaje basado en proyectos",
                "aprendizaje basado en problemas",
                "caso",
                "problema",
                "proyecto",
                "simulación",
                "debate",
                "taller",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompletenessConfig {
    pub required: RequiredFields,
}

/// Fields that must be filled in each table. Defaults to every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RequiredFields {
    pub competencias: Vec<String>,
    pub resultados_aprendizaje: Vec<String>,
    pub estrategias_meso: Vec<String>,
    pub estrategias_micro: Vec<String>,
}

impl Default for RequiredFields {
    fn default() -> Self {
        let all = |table: TableKind| table.fields().iter().map(|f| f.to_string()).collect();
        Self {
            competencias: all(TableKind::Competencias),
            resultados_aprendizaje: all(TableKind::ResultadosAprendizaje),
            estrategias_meso: all(TableKind::EstrategiasMeso),
            estrategias_micro: all(TableKind::EstrategiasMicro),
        }
    }
}

impl RequiredFields {
    pub fn for_table(&self, table: TableKind) -> &[String] {
        match table {
            TableKind::Competencias => &self.competencias,
            TableKind::ResultadosAprendizaje => &self.resultados_aprendizaje,
            TableKind::EstrategiasMeso => &self.estrategias_meso,
            TableKind::EstrategiasMicro => &self.estrategias_micro,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Weights of the six sub-scores folded into the quality score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QualityWeights {
    pub completitud: f64,
    pub complejidad_cognitiva: f64,
    pub balance_tipo_saber: f64,
    pub diversidad_metodologica: f64,
    pub cobertura_competencias: f64,
    pub calidad_redaccion: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            completitud: 0.25,
            complejidad_cognitiva: 0.20,
            balance_tipo_saber: 0.15,
            diversidad_metodologica: 0.15,
            cobertura_competencias: 0.15,
            calidad_redaccion: 0.10,
        }
    }
}

impl QualityWeights {
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.completitud,
            self.complejidad_cognitiva,
            self.balance_tipo_saber,
            self.diversidad_metodologica,
            self.cobertura_competencias,
            self.calidad_redaccion,
        ]
    }

    pub fn sum(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Weights must be finite, non-negative and add up to 1.0. They are
    /// never renormalized.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AnalysisError::ConfigValidation(
                "quality weights must be finite and non-negative".into(),
            ));
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(AnalysisError::InvalidWeights { sum });
        }
        Ok(())
    }
}

/// Where the writing-quality sub-score comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WritingSource {
    /// Constant `redaccion_default`.
    #[default]
    Fixed,
    /// Rule checks over competency and outcome texts.
    Validator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoringConfig {
    /// Points subtracted from the balance sub-score per point of std-dev.
    pub balance_scale: f64,
    pub redaccion: WritingSource,
    /// Writing-quality sub-score used when no assessor supplies one.
    pub redaccion_default: f64,
    /// Word bounds a competency or outcome text should respect.
    pub min_palabras: usize,
    pub max_palabras: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            balance_scale: 5.0,
            redaccion: WritingSource::Fixed,
            redaccion_default: 80.0,
            min_palabras: 5,
            max_palabras: 50,
        }
    }
}

/// Minimums a program is expected to meet; violations become findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    pub min_competencias: usize,
    pub min_ra_por_competencia: f64,
    pub min_completitud: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            min_competencias: 3,
            min_ra_por_competencia: 2.0,
            min_completitud: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub parallel: bool,
    pub max_workers: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            max_workers: 4,
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl AnalysisConfig {
    pub fn from_toml(input: &str) -> Result<Self, AnalysisError> {
        let config: AnalysisConfig =
            toml::from_str(input).map_err(|e| AnalysisError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn thematic_names(&self) -> Vec<String> {
        self.thematics.iter().map(|t| t.name.clone()).collect()
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.weights.validate()?;

        // Catalog
        if self.thematics.is_empty() {
            return Err(AnalysisError::ConfigValidation(
                "at least one thematic is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for thematic in &self.thematics {
            if thematic.name.trim().is_empty() {
                return Err(AnalysisError::ConfigValidation("thematic with blank name".into()));
            }
            if !seen.insert(thematic.name.as_str()) {
                return Err(AnalysisError::ConfigValidation(format!(
                    "duplicate thematic '{}'",
                    thematic.name
                )));
            }
            if thematic.keywords.is_empty() {
                return Err(AnalysisError::EmptyKeywords {
                    thematic: thematic.name.clone(),
                });
            }
            let blank = thematic
                .keywords
                .iter()
                .chain(thematic.context_keywords.iter())
                .any(|k| crate::normalize::normalize(k).is_empty());
            if blank {
                return Err(AnalysisError::ConfigValidation(format!(
                    "thematic '{}': keywords must contain letters or digits",
                    thematic.name
                )));
            }
        }

        // Matching
        if self.matching.min_matches == 0 {
            return Err(AnalysisError::ConfigValidation("matching.min_matches must be at least 1".into()));
        }
        if self.matching.min_prefix_len == 0 {
            return Err(AnalysisError::ConfigValidation("matching.min_prefix_len must be at least 1".into()));
        }

        // Balance
        if !self.balance.threshold.is_finite() || self.balance.threshold < 0.0 {
            return Err(AnalysisError::ConfigValidation(
                "balance.threshold must be a non-negative number".into(),
            ));
        }

        // Bloom buckets: 1 <= basico_max < intermedio_max < 6
        let b = &self.bloom;
        if !(1 <= b.basico_max && b.basico_max < b.intermedio_max && b.intermedio_max < 6) {
            return Err(AnalysisError::ConfigValidation(format!(
                "bloom thresholds must satisfy 1 <= basico_max < intermedio_max < 6, got {} / {}",
                b.basico_max, b.intermedio_max
            )));
        }
        if !(1..=6).contains(&b.default_level) {
            return Err(AnalysisError::ConfigValidation(format!(
                "bloom.default_level must be within 1..=6, got {}",
                b.default_level
            )));
        }
        if let Some(bad) = b.verbs.iter().find(|v| !(1..=6).contains(&v.level)) {
            return Err(AnalysisError::ConfigValidation(format!(
                "bloom verbs '{}': level {} outside 1..=6",
                bad.name, bad.level
            )));
        }

        // Completeness
        for table in TableKind::ALL {
            let declared = table.fields();
            for field in self.completeness.required.for_table(table) {
                if !declared.contains(&field.as_str()) {
                    return Err(AnalysisError::UnknownField {
                        table,
                        field: field.clone(),
                    });
                }
            }
        }

        // Scoring
        if !self.scoring.balance_scale.is_finite() || self.scoring.balance_scale < 0.0 {
            return Err(AnalysisError::ConfigValidation(
                "scoring.balance_scale must be a non-negative number".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.scoring.redaccion_default) {
            return Err(AnalysisError::ConfigValidation(
                "scoring.redaccion_default must be within 0..=100".into(),
            ));
        }
        if self.scoring.min_palabras > self.scoring.max_palabras {
            return Err(AnalysisError::ConfigValidation(format!(
                "scoring.min_palabras ({}) exceeds scoring.max_palabras ({})",
                self.scoring.min_palabras, self.scoring.max_palabras
            )));
        }

        if self.batch.max_workers == 0 {
            return Err(AnalysisError::ConfigValidation("batch.max_workers must be at least 1".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Built-in catalog
// ---------------------------------------------------------------------------

pub fn default_thematics() -> Vec<ThematicDefinition> {
    vec![
        ThematicDefinition::new(
            "SOSTENIBILIDAD",
            &[
                "sostenibilidad", "sostenible", "sustentabilidad", "sustentable", "ambiental",
                "medio ambiente", "ecológico", "ecología", "cambio climático", "responsabilidad ambiental",
                "desarrollo sostenible", "ods", "objetivos de desarrollo sostenible", "huella de carbono",
                "economía circular", "verde", "green",
            ],
            &["dimensiones económicas, ambientales y sociales", "triple línea de base", "stakeholders", "responsabilidad social"],
        ),
        ThematicDefinition::new(
            "INTELIGENCIA ARTIFICIAL",
            &[
                "inteligencia artificial", "ia", "ai", "machine learning", "aprendizaje automático",
                "deep learning", "aprendizaje profundo", "redes neuronales", "algoritmos", "big data",
                "ciencia de datos", "data science", "minería de datos", "nlp",
                "procesamiento de lenguaje natural", "visión por computador", "chatbot", "gpt", "llm",
            ],
            &["modelos predictivos", "automatización", "análisis de datos"],
        ),
        ThematicDefinition::new(
            "RESPONSABILIDAD SOCIAL EMPRESARIAL",
            &[
                "responsabilidad social empresarial", "rse", "rsc", "responsabilidad corporativa",
                "ética empresarial", "gobierno corporativo", "stakeholders", "grupos de interés",
                "valor compartido", "impacto social", "filantropía", "pacto global", "triple resultado",
            ],
            &[],
        ),
        ThematicDefinition::new(
            "TRANSFORMACIÓN DIGITAL",
            &[
                "transformación digital", "digitalización", "industria 4.0", "internet of things", "iot",
                "blockchain", "cloud computing", "nube", "big data", "analítica", "ciberseguridad",
                "automatización", "robotización", "erp", "crm", "e-commerce", "comercio electrónico", "fintech",
            ],
            &["disrupción digital", "tecnologías emergentes"],
        ),
        ThematicDefinition::new(
            "INNOVACIÓN Y EMPRENDIMIENTO",
            &[
                "innovación", "emprendimiento", "emprendedor", "startup", "modelo de negocio", "canvas",
                "design thinking", "lean startup", "prototipado", "mvp", "producto mínimo viable", "pitch",
                "escalabilidad", "disrupción", "creatividad", "ideación",
            ],
            &["mentalidad emprendedora", "oportunidades de negocio"],
        ),
        ThematicDefinition::new(
            "GLOBALIZACIÓN Y PERSPECTIVA GLOCAL",
            &[
                "globalización", "glocal", "global", "internacional", "internacionalización",
                "comercio internacional", "mercados globales", "multiculturalidad", "interculturalidad",
                "exportación", "importación", "tratados comerciales", "competitividad global",
                "cadena de valor global",
            ],
            &["pensamiento global", "acción local"],
        ),
        ThematicDefinition::new(
            "ÉTICA Y VALORES",
            &[
                "ética", "ético", "valores", "moral", "integridad", "transparencia", "honestidad",
                "responsabilidad", "código de ética", "dilema ético", "deontología", "bioética", "justicia",
                "equidad", "respeto",
            ],
            &["toma de decisiones éticas", "comportamiento profesional"],
        ),
        ThematicDefinition::new(
            "LIDERAZGO Y HABILIDADES BLANDAS",
            &[
                "liderazgo", "líder", "trabajo en equipo", "comunicación", "soft skills", "habilidades blandas",
                "inteligencia emocional", "empatía", "negociación", "resolución de conflictos",
                "pensamiento crítico", "creatividad", "adaptabilidad", "resiliencia", "colaboración", "asertividad",
            ],
            &["gestión de equipos", "competencias socioemocionales"],
        ),
        ThematicDefinition::new(
            "ANÁLISIS DE DATOS",
            &[
                "análisis de datos", "analítica", "data analytics", "estadística", "visualización de datos",
                "dashboard", "kpi", "indicadores", "métricas", "business intelligence", "bi",
                "tablero de control", "python", "r", "sql", "excel avanzado", "power bi", "tableau",
            ],
            &["toma de decisiones basada en datos", "data-driven"],
        ),
        ThematicDefinition::new(
            "GESTIÓN DEL CAMBIO",
            &[
                "gestión del cambio", "cambio organizacional", "transformación organizacional",
                "resistencia al cambio", "cultura organizacional", "desarrollo organizacional", "agilidad",
                "adaptación", "flexibilidad", "scrum", "agile",
            ],
            &["procesos de cambio", "adaptación al entorno"],
        ),
    ]
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
