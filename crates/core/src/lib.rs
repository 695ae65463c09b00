//! `curricula-core`: Program records as delivered by the extraction step.
//!
//! Typed tables with named fields; every field is a [`CellValue`] so the
//! engine sees exactly what the spreadsheet held.

pub mod cell;
pub mod record;

pub use cell::CellValue;
pub use record::{
    Competency, CompetencyType, KnowledgeType, LearningOutcome, MesoStrategy, MicroStrategy, ProgramRecord,
    TableKind, TableRow,
};
