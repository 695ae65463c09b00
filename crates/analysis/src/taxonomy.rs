//! Bloom level inference for learning outcomes.

use serde::Serialize;

use curricula_core::{CellValue, LearningOutcome};

use crate::config::BloomConfig;
use crate::normalize::normalize;

/// Where an inferred level came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelSource {
    /// Numeric level tag (`3`, `"4"`, `"Nivel 5 - Evaluar"`).
    Tag,
    /// Verb found in the Bloom verb lists.
    Verb,
    /// Textual level tag ("Aplicación", "Analizar").
    TagText,
    /// Nothing resolved; configured default used.
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInference {
    pub level: u8,
    pub source: LevelSource,
}

/// Complexity bucket of a Bloom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ComplexityBucket {
    Basico,
    Intermedio,
    Avanzado,
}

impl ComplexityBucket {
    pub const ALL: [ComplexityBucket; 3] = [Self::Basico, Self::Intermedio, Self::Avanzado];

    pub fn from_level(level: u8, bloom: &BloomConfig) -> Self {
        if level <= bloom.basico_max {
            Self::Basico
        } else if level <= bloom.intermedio_max {
            Self::Intermedio
        } else {
            Self::Avanzado
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Basico => "Básico",
            Self::Intermedio => "Intermedio",
            Self::Avanzado => "Avanzado",
        }
    }
}

/// Stems checked in order against a textual level tag.
const TAG_STEMS: &[(&str, u8)] = &[
    ("analis", 4),
    ("evalua", 5),
    ("critica", 5),
    ("crea", 6),
    ("disen", 6),
    ("aplic", 3),
    ("comprend", 2),
    ("entiend", 2),
    ("record", 1),
    ("memoriz", 1),
];

/// Infer the Bloom level (1..=6) of an outcome.
///
/// Tries, in order: a numeric level tag, the outcome verb (or the first word
/// of its text when the verb is blank) against the configured verb lists, a
/// textual level tag, and finally `bloom.default_level`.
pub fn infer_level(outcome: &LearningOutcome, bloom: &BloomConfig) -> LevelInference {
    if let Some(level) = numeric_tag(&outcome.nivel_dominio) {
        return LevelInference { level, source: LevelSource::Tag };
    }

    let verb = match outcome.verbo.as_text().map(normalize) {
        Some(v) if !v.is_empty() => v,
        _ => outcome.redaccion.as_text().map(normalize).unwrap_or_default(),
    };
    if let Some(first) = verb.split(' ').next() {
        if let Some(level) = verb_level(first, bloom) {
            return LevelInference { level, source: LevelSource::Verb };
        }
    }

    if let Some(tag) = outcome.nivel_dominio.as_text() {
        if let Some(level) = text_tag(&normalize(tag), bloom) {
            return LevelInference { level, source: LevelSource::TagText };
        }
    }

    LevelInference {
        level: bloom.default_level,
        source: LevelSource::Default,
    }
}

/// `3`, `3.0`, `"3"` or a text with a standalone digit 1-6 ("Nivel 4").
fn numeric_tag(cell: &CellValue) -> Option<u8> {
    if let Some(n) = cell.as_number() {
        return (n.fract() == 0.0 && (1.0..=6.0).contains(&n)).then_some(n as u8);
    }
    let text = normalize(cell.as_text()?);
    text.split(' ')
        .filter(|token| token.len() == 1)
        .filter_map(|token| token.parse::<u8>().ok())
        .find(|level| (1..=6).contains(level))
}

/// Level stated by a `nivel_dominio` tag, numeric or textual.
pub(crate) fn declared_level(tag: &CellValue, bloom: &BloomConfig) -> Option<u8> {
    numeric_tag(tag).or_else(|| text_tag(&normalize(tag.as_text()?), bloom))
}

/// A word matches a taxonomy verb exactly, or shares its stem (the infinitive
/// without its -ar/-er/-ir ending) when that stem has at least 3 letters.
pub(crate) fn verb_level(word: &str, bloom: &BloomConfig) -> Option<u8> {
    if word.is_empty() {
        return None;
    }
    for level in &bloom.verbs {
        for verb in &level.verbs {
            let verb = normalize(verb);
            if word == verb {
                return Some(level.level);
            }
            let stem = verb
                .strip_suffix("ar")
                .or_else(|| verb.strip_suffix("er"))
                .or_else(|| verb.strip_suffix("ir"))
                .unwrap_or(&verb);
            if stem.len() >= 3 && stem.len() < verb.len() && word.starts_with(stem) {
                return Some(level.level);
            }
        }
    }
    None
}

fn text_tag(tag: &str, bloom: &BloomConfig) -> Option<u8> {
    if tag.is_empty() {
        return None;
    }
    // Level names first ("recordar", "comprender", ...)
    for level in &bloom.verbs {
        let name = normalize(&level.name);
        if !name.is_empty() && tag.contains(name.as_str()) {
            return Some(level.level);
        }
    }
    TAG_STEMS
        .iter()
        .find(|(stem, _)| tag.contains(stem))
        .map(|(_, level)| *level)
}
