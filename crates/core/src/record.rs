use serde::{Deserialize, Serialize};

use crate::cell::CellValue;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// The four curricular tables of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Competencias,
    ResultadosAprendizaje,
    EstrategiasMeso,
    EstrategiasMicro,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Competencias,
        TableKind::ResultadosAprendizaje,
        TableKind::EstrategiasMeso,
        TableKind::EstrategiasMicro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Competencias => "competencias",
            Self::ResultadosAprendizaje => "resultados_aprendizaje",
            Self::EstrategiasMeso => "estrategias_meso",
            Self::EstrategiasMicro => "estrategias_micro",
        }
    }

    /// Field names declared by the row type of this table.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Competencias => Competency::FIELDS,
            Self::ResultadosAprendizaje => LearningOutcome::FIELDS,
            Self::EstrategiasMeso => MesoStrategy::FIELDS,
            Self::EstrategiasMicro => MicroStrategy::FIELDS,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl std::fmt::Display for TableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row types expose their fields by name so completeness rules can be
/// configured per table without knowing the concrete struct.
pub trait TableRow {
    const TABLE: TableKind;
    const FIELDS: &'static [&'static str];

    fn field(&self, name: &str) -> Option<&CellValue>;
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A program-level capability statement (verb + object + purpose).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Competency {
    pub numero: CellValue,
    pub verbo: CellValue,
    pub objeto_conceptual: CellValue,
    pub finalidad: CellValue,
    pub condicion_contexto: CellValue,
    pub redaccion: CellValue,
    pub tipo: CellValue,
}

impl TableRow for Competency {
    const TABLE: TableKind = TableKind::Competencias;
    const FIELDS: &'static [&'static str] = &[
        "numero",
        "verbo",
        "objeto_conceptual",
        "finalidad",
        "condicion_contexto",
        "redaccion",
        "tipo",
    ];

    fn field(&self, name: &str) -> Option<&CellValue> {
        match name {
            "numero" => Some(&self.numero),
            "verbo" => Some(&self.verbo),
            "objeto_conceptual" => Some(&self.objeto_conceptual),
            "finalidad" => Some(&self.finalidad),
            "condicion_contexto" => Some(&self.condicion_contexto),
            "redaccion" => Some(&self.redaccion),
            "tipo" => Some(&self.tipo),
            _ => None,
        }
    }
}

impl Competency {
    pub fn tipo_competencia(&self) -> Option<CompetencyType> {
        self.tipo.as_text().and_then(CompetencyType::parse)
    }
}

/// An assessable learning outcome (RA) derived from a competency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningOutcome {
    /// Id of the competency this outcome develops.
    pub competencia: CellValue,
    pub numero: CellValue,
    pub tipo_saber: CellValue,
    /// Bloom-domain level tag ("3", "Aplicar", "Nivel 4 - Analizar", ...).
    pub nivel_dominio: CellValue,
    pub verbo: CellValue,
    pub redaccion: CellValue,
}

impl TableRow for LearningOutcome {
    const TABLE: TableKind = TableKind::ResultadosAprendizaje;
    const FIELDS: &'static [&'static str] = &[
        "competencia",
        "numero",
        "tipo_saber",
        "nivel_dominio",
        "verbo",
        "redaccion",
    ];

    fn field(&self, name: &str) -> Option<&CellValue> {
        match name {
            "competencia" => Some(&self.competencia),
            "numero" => Some(&self.numero),
            "tipo_saber" => Some(&self.tipo_saber),
            "nivel_dominio" => Some(&self.nivel_dominio),
            "verbo" => Some(&self.verbo),
            "redaccion" => Some(&self.redaccion),
            _ => None,
        }
    }
}

impl LearningOutcome {
    pub fn knowledge_type(&self) -> Option<KnowledgeType> {
        self.tipo_saber.as_text().and_then(KnowledgeType::parse)
    }
}

/// Program-level pedagogical strategy attached to an outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MesoStrategy {
    pub resultado: CellValue,
    pub estrategia: CellValue,
    pub descripcion: CellValue,
    pub indicador_impacto: CellValue,
}

impl TableRow for MesoStrategy {
    const TABLE: TableKind = TableKind::EstrategiasMeso;
    const FIELDS: &'static [&'static str] = &["resultado", "estrategia", "descripcion", "indicador_impacto"];

    fn field(&self, name: &str) -> Option<&CellValue> {
        match name {
            "resultado" => Some(&self.resultado),
            "estrategia" => Some(&self.estrategia),
            "descripcion" => Some(&self.descripcion),
            "indicador_impacto" => Some(&self.indicador_impacto),
            _ => None,
        }
    }
}

/// Activity-level teaching/learning strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MicroStrategy {
    pub tipo_saber: CellValue,
    pub estrategia: CellValue,
    pub recursos: CellValue,
    pub horas_autonomas: CellValue,
    pub horas_presenciales: CellValue,
    pub criterios_evaluacion: CellValue,
}

impl TableRow for MicroStrategy {
    const TABLE: TableKind = TableKind::EstrategiasMicro;
    const FIELDS: &'static [&'static str] = &[
        "tipo_saber",
        "estrategia",
        "recursos",
        "horas_autonomas",
        "horas_presenciales",
        "criterios_evaluacion",
    ];

    fn field(&self, name: &str) -> Option<&CellValue> {
        match name {
            "tipo_saber" => Some(&self.tipo_saber),
            "estrategia" => Some(&self.estrategia),
            "recursos" => Some(&self.recursos),
            "horas_autonomas" => Some(&self.horas_autonomas),
            "horas_presenciales" => Some(&self.horas_presenciales),
            "criterios_evaluacion" => Some(&self.criterios_evaluacion),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Categorical labels
// ---------------------------------------------------------------------------

/// Knowledge category of a learning outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnowledgeType {
    Saber,
    SaberHacer,
    SaberSer,
}

impl KnowledgeType {
    pub const ALL: [KnowledgeType; 3] = [KnowledgeType::Saber, KnowledgeType::SaberHacer, KnowledgeType::SaberSer];

    /// Accepts the spellings found in real sheets: "Saber Hacer",
    /// "saber_hacer", "SABER-SER", "Saber hacer (procedimental)".
    pub fn parse(label: &str) -> Option<Self> {
        let folded = fold_label(label);
        if folded.starts_with("saberhacer") {
            Some(Self::SaberHacer)
        } else if folded.starts_with("saberser") {
            Some(Self::SaberSer)
        } else if folded.starts_with("saber") {
            Some(Self::Saber)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Saber => "Saber",
            Self::SaberHacer => "SaberHacer",
            Self::SaberSer => "SaberSer",
        }
    }
}

impl std::fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompetencyType {
    Specific,
    Generic,
}

impl CompetencyType {
    pub fn parse(label: &str) -> Option<Self> {
        let folded = fold_label(label);
        if folded.starts_with("especific") || folded.starts_with("specific") || folded.starts_with("disciplinar") {
            Some(Self::Specific)
        } else if folded.starts_with("generic") || folded.starts_with("transversal") {
            Some(Self::Generic)
        } else {
            None
        }
    }
}

/// Lower-case ASCII letters only, with Spanish accents folded.
fn fold_label(label: &str) -> String {
    label
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

// ---------------------------------------------------------------------------
// Program record
// ---------------------------------------------------------------------------

/// Everything the extractor produced for one academic program.
///
/// A table the extractor could not find is `None`; accessors return an empty
/// slice for it, and `has_table` lets the engine report the absence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramRecord {
    pub programa: String,
    pub source_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub competencias: Option<Vec<Competency>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resultados_aprendizaje: Option<Vec<LearningOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estrategias_meso: Option<Vec<MesoStrategy>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estrategias_micro: Option<Vec<MicroStrategy>>,
}

impl ProgramRecord {
    pub fn new(programa: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            programa: programa.into(),
            source_id: source_id.into(),
            ..Default::default()
        }
    }

    pub fn with_competencias(mut self, rows: Vec<Competency>) -> Self {
        self.competencias = Some(rows);
        self
    }

    pub fn with_resultados(mut self, rows: Vec<LearningOutcome>) -> Self {
        self.resultados_aprendizaje = Some(rows);
        self
    }

    pub fn with_meso(mut self, rows: Vec<MesoStrategy>) -> Self {
        self.estrategias_meso = Some(rows);
        self
    }

    pub fn with_micro(mut self, rows: Vec<MicroStrategy>) -> Self {
        self.estrategias_micro = Some(rows);
        self
    }

    pub fn competencias(&self) -> &[Competency] {
        self.competencias.as_deref().unwrap_or(&[])
    }

    pub fn resultados(&self) -> &[LearningOutcome] {
        self.resultados_aprendizaje.as_deref().unwrap_or(&[])
    }

    pub fn estrategias_meso(&self) -> &[MesoStrategy] {
        self.estrategias_meso.as_deref().unwrap_or(&[])
    }

    pub fn estrategias_micro(&self) -> &[MicroStrategy] {
        self.estrategias_micro.as_deref().unwrap_or(&[])
    }

    pub fn has_table(&self, table: TableKind) -> bool {
        match table {
            TableKind::Competencias => self.competencias.is_some(),
            TableKind::ResultadosAprendizaje => self.resultados_aprendizaje.is_some(),
            TableKind::EstrategiasMeso => self.estrategias_meso.is_some(),
            TableKind::EstrategiasMicro => self.estrategias_micro.is_some(),
        }
    }

    pub fn row_count(&self, table: TableKind) -> usize {
        match table {
            TableKind::Competencias => self.competencias().len(),
            TableKind::ResultadosAprendizaje => self.resultados().len(),
            TableKind::EstrategiasMeso => self.estrategias_meso().len(),
            TableKind::EstrategiasMicro => self.estrategias_micro().len(),
        }
    }

    /// Tables the extractor did not deliver at all.
    pub fn missing_tables(&self) -> Vec<TableKind> {
        TableKind::ALL.into_iter().filter(|t| !self.has_table(*t)).collect()
    }

    /// Display label: program name, falling back to the source identifier.
    pub fn label(&self) -> &str {
        if self.programa.trim().is_empty() {
            self.source_id.trim()
        } else {
            self.programa.trim()
        }
    }
}
