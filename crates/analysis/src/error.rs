use std::fmt;

use serde::Serialize;

use curricula_core::TableKind;

#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (bad threshold, duplicate thematic, etc.).
    ConfigValidation(String),
    /// Quality weights do not add up to 1.0.
    InvalidWeights { sum: f64 },
    /// A thematic definition without keywords.
    EmptyKeywords { thematic: String },
    /// Required-field map names a field the table does not have.
    UnknownField { table: TableKind, field: String },
    /// A program that cannot be analyzed at all (no identity).
    InvalidRecord { index: usize, reason: String },
    /// Worker pool could not be started.
    WorkerPool(String),
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidWeights { sum } => {
                write!(f, "quality weights must sum to 1.0, found {sum:.4}")
            }
            Self::EmptyKeywords { thematic } => {
                write!(f, "thematic '{thematic}' has no keywords")
            }
            Self::UnknownField { table, field } => {
                write!(f, "table '{table}': unknown required field '{field}'")
            }
            Self::InvalidRecord { index, reason } => {
                write!(f, "program #{index}: {reason}")
            }
            Self::WorkerPool(msg) => write!(f, "worker pool error: {msg}"),
        }
    }
}

impl std::error::Error for AnalysisError {}

impl AnalysisError {
    /// Configuration problems invalidate every score and must stop the run
    /// before any program is processed.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse(_) | Self::ConfigValidation(_) | Self::InvalidWeights { .. } | Self::EmptyKeywords { .. } | Self::UnknownField { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// Data warnings
// ---------------------------------------------------------------------------

/// Kind of degradation applied while reading a program's tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// The extractor delivered no table at all.
    MissingTable,
    /// A text field held a number or boolean; read as empty text.
    NonTextValue,
    /// Knowledge type label not recognized; outcome left out of the balance.
    UnknownKnowledgeType,
    /// Bloom level could not be inferred; default level used.
    UnresolvedLevel,
    /// An hours field held something other than a non-negative number; skipped.
    NonNumericValue,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTable => write!(f, "missing_table"),
            Self::NonTextValue => write!(f, "non_text_value"),
            Self::UnknownKnowledgeType => write!(f, "unknown_knowledge_type"),
            Self::UnresolvedLevel => write!(f, "unresolved_level"),
            Self::NonNumericValue => write!(f, "non_numeric_value"),
        }
    }
}

/// A structured warning attached to a program's results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataWarning {
    pub kind: WarningKind,
    pub table: TableKind,
    /// Zero-based row index, absent for table-level warnings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    pub message: String,
}

impl DataWarning {
    pub fn missing_table(table: TableKind) -> Self {
        Self {
            kind: WarningKind::MissingTable,
            table,
            row: None,
            message: format!("table '{table}' not provided; treated as empty"),
        }
    }

    pub fn non_text(table: TableKind, row: usize, field: &str) -> Self {
        Self {
            kind: WarningKind::NonTextValue,
            table,
            row: Some(row),
            message: format!("field '{field}' is not text; treated as empty"),
        }
    }

    pub fn non_numeric(table: TableKind, row: usize, field: &str) -> Self {
        Self {
            kind: WarningKind::NonNumericValue,
            table,
            row: Some(row),
            message: format!("field '{field}' is not a number of hours; left out of the totals"),
        }
    }

    pub fn row(kind: WarningKind, table: TableKind, row: usize, message: impl Into<String>) -> Self {
        Self {
            kind,
            table,
            row: Some(row),
            message: message.into(),
        }
    }
}
