//! `curricula-analysis`: Thematic detection and curricular quality indicators.
//!
//! Pure engine crate: receives already-extracted program records, returns
//! per-program results and cross-program matrices. No CLI or IO dependencies.

pub mod batch;
pub mod config;
pub mod consolidate;
pub mod error;
pub mod indicators;
pub mod normalize;
pub mod scoring;
pub mod taxonomy;
pub mod thematic;

pub use batch::{Analyzer, BatchMeta, BatchResult};
pub use config::{AnalysisConfig, WritingSource};
pub use consolidate::{aggregate, ConsolidatedMatrix, IndicatorColumn, ProgramOutcome, RowStatus};
pub use error::{AnalysisError, DataWarning, WarningKind};
pub use indicators::{IndicatorEngine, IndicatorReport};
pub use normalize::normalize;
pub use scoring::{
    FixedWritingQuality, QualityScore, QualityScorer, TextCheck, ValidatorWritingQuality, WritingQuality,
};
pub use thematic::{TextDetection, ThematicMatcher, ThematicResult};
