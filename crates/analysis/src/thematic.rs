use std::collections::BTreeSet;

use serde::Serialize;

use curricula_core::{CellValue, ProgramRecord, TableKind};

use crate::config::{AnalysisConfig, MatchingConfig};
use crate::consolidate::{RowStatus, ThematicRow, ThematicTable};
use crate::error::DataWarning;
use crate::normalize::{NormalizedText, Span};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Detection over a single text, one entry per catalog thematic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextDetection {
    pub tematicas: Vec<ThematicHit>,
}

impl TextDetection {
    pub fn get(&self, name: &str) -> Option<&ThematicHit> {
        self.tematicas.iter().find(|h| h.nombre == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThematicHit {
    pub nombre: String,
    pub presente: bool,
    pub coincidencias: u32,
    /// Distinct matched words, sorted.
    pub keywords_encontradas: Vec<String>,
    pub coincidencias_contexto: u32,
    /// One window of original text per counted occurrence.
    pub contextos: Vec<String>,
}

/// Thematic profile of one program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThematicResult {
    pub programa: String,
    pub source_id: String,
    pub tematicas: Vec<ThematicSummary>,
    /// Present thematics in catalog order.
    pub tematicas_presentes: Vec<String>,
    pub num_tematicas: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<DataWarning>,
}

impl ThematicResult {
    pub fn get(&self, name: &str) -> Option<&ThematicSummary> {
        self.tematicas.iter().find(|t| t.nombre == name)
    }

    /// Total match count per thematic, catalog order.
    pub fn counts(&self) -> Vec<u32> {
        self.tematicas.iter().map(|t| t.total_coincidencias).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThematicSummary {
    pub nombre: String,
    pub presente: bool,
    pub frecuencia_competencias: u32,
    pub frecuencia_ra: u32,
    pub total_coincidencias: u32,
    pub keywords_encontradas: Vec<String>,
    pub coincidencias_contexto: u32,
    pub contextos: Vec<String>,
}

// ---------------------------------------------------------------------------
// Matcher
// ---------------------------------------------------------------------------

struct CompiledKeyword {
    chars: Vec<char>,
    allow_prefix: bool,
}

struct CompiledThematic {
    name: String,
    keywords: Vec<CompiledKeyword>,
    context_keywords: Vec<CompiledKeyword>,
}

/// Keyword matcher over the thematic catalog. Keywords are normalized once
/// here; the matcher is immutable afterwards and can be shared across threads.
pub struct ThematicMatcher {
    thematics: Vec<CompiledThematic>,
    matching: MatchingConfig,
}

impl ThematicMatcher {
    /// Expects a validated config.
    pub fn new(config: &AnalysisConfig) -> Self {
        let compile = |keywords: &[String]| -> Vec<CompiledKeyword> {
            keywords
                .iter()
                .map(|k| NormalizedText::new(k).chars().to_vec())
                .filter(|chars| !chars.is_empty())
                .map(|chars| CompiledKeyword {
                    allow_prefix: chars.len() >= config.matching.min_prefix_len,
                    chars,
                })
                .collect()
        };

        let thematics = config
            .thematics
            .iter()
            .map(|t| CompiledThematic {
                name: t.name.clone(),
                keywords: compile(&t.keywords),
                context_keywords: compile(&t.context_keywords),
            })
            .collect();

        Self {
            thematics,
            matching: config.matching.clone(),
        }
    }

    pub fn thematic_names(&self) -> Vec<String> {
        self.thematics.iter().map(|t| t.name.clone()).collect()
    }

    pub fn detect_in_text(&self, text: &str) -> TextDetection {
        let normalized = NormalizedText::new(text);
        let tematicas = self
            .thematics
            .iter()
            .map(|thematic| {
                let spans = merged_spans(&normalized, &thematic.keywords);
                let context_spans = merged_spans(&normalized, &thematic.context_keywords);
                let keywords: BTreeSet<String> = spans.iter().map(|s| normalized.slice(*s)).collect();
                let count = spans.len() as u32;
                ThematicHit {
                    nombre: thematic.name.clone(),
                    presente: count >= self.matching.min_matches,
                    coincidencias: count,
                    keywords_encontradas: keywords.into_iter().collect(),
                    coincidencias_contexto: context_spans.len() as u32,
                    contextos: spans
                        .iter()
                        .map(|s| normalized.context(*s, self.matching.context_window))
                        .collect(),
                }
            })
            .collect();
        TextDetection { tematicas }
    }

    /// Detect over competency texts and outcome texts separately and sum.
    /// Absent tables and non-text cells read as empty, with a warning.
    pub fn analyze_programa(&self, record: &ProgramRecord) -> ThematicResult {
        let mut warnings = Vec::new();
        let label = record.label();

        let comp_cells: Vec<&CellValue> = record.competencias().iter().map(|c| &c.redaccion).collect();
        let ra_cells: Vec<&CellValue> = record.resultados().iter().map(|r| &r.redaccion).collect();

        for table in [TableKind::Competencias, TableKind::ResultadosAprendizaje] {
            if !record.has_table(table) {
                warnings.push(DataWarning::missing_table(table));
            }
        }

        let comp_texts = read_texts(label, TableKind::Competencias, &comp_cells, &mut warnings);
        let ra_texts = read_texts(label, TableKind::ResultadosAprendizaje, &ra_cells, &mut warnings);

        let comp_hits = self.detect_all(&comp_texts);
        let ra_hits = self.detect_all(&ra_texts);

        let tematicas: Vec<ThematicSummary> = self
            .thematics
            .iter()
            .enumerate()
            .map(|(i, thematic)| {
                let c = &comp_hits[i];
                let r = &ra_hits[i];
                let total = c.coincidencias + r.coincidencias;
                let keywords: BTreeSet<String> = c
                    .keywords_encontradas
                    .iter()
                    .chain(r.keywords_encontradas.iter())
                    .cloned()
                    .collect();
                ThematicSummary {
                    nombre: thematic.name.clone(),
                    presente: total >= self.matching.min_matches,
                    frecuencia_competencias: c.coincidencias,
                    frecuencia_ra: r.coincidencias,
                    total_coincidencias: total,
                    keywords_encontradas: keywords.into_iter().collect(),
                    coincidencias_contexto: c.coincidencias_contexto + r.coincidencias_contexto,
                    contextos: c
                        .contextos
                        .iter()
                        .chain(r.contextos.iter())
                        .take(self.matching.max_contexts)
                        .cloned()
                        .collect(),
                }
            })
            .collect();

        let tematicas_presentes: Vec<String> =
            tematicas.iter().filter(|t| t.presente).map(|t| t.nombre.clone()).collect();

        log::debug!(
            "{label}: {} of {} thematics present",
            tematicas_presentes.len(),
            tematicas.len()
        );

        ThematicResult {
            programa: record.programa.trim().to_string(),
            source_id: record.source_id.clone(),
            num_tematicas: tematicas_presentes.len(),
            tematicas,
            tematicas_presentes,
            warnings,
        }
    }

    /// One row per record, input order, every catalog column.
    pub fn generate_thematic_matrix(&self, records: &[ProgramRecord]) -> ThematicTable {
        let rows = records
            .iter()
            .map(|record| {
                let result = self.analyze_programa(record);
                ThematicRow {
                    programa: record.label().to_string(),
                    status: RowStatus::Analyzed,
                    counts: result.counts(),
                    num_tematicas: result.num_tematicas,
                }
            })
            .collect();
        ThematicTable::new(self.thematic_names(), rows)
    }

    /// Per-thematic hits summed over several texts; each text is matched on
    /// its own so keywords never span two fields.
    fn detect_all(&self, texts: &[&str]) -> Vec<ThematicHit> {
        let mut acc: Vec<ThematicHit> = self
            .thematics
            .iter()
            .map(|t| ThematicHit {
                nombre: t.name.clone(),
                presente: false,
                coincidencias: 0,
                keywords_encontradas: Vec::new(),
                coincidencias_contexto: 0,
                contextos: Vec::new(),
            })
            .collect();

        for text in texts.iter().filter(|t| !t.trim().is_empty()) {
            let detection = self.detect_in_text(text);
            for (sum, hit) in acc.iter_mut().zip(detection.tematicas) {
                sum.coincidencias += hit.coincidencias;
                sum.coincidencias_contexto += hit.coincidencias_contexto;
                sum.keywords_encontradas.extend(hit.keywords_encontradas);
                sum.contextos.extend(hit.contextos);
            }
        }

        for sum in &mut acc {
            sum.keywords_encontradas.sort();
            sum.keywords_encontradas.dedup();
            sum.presente = sum.coincidencias >= self.matching.min_matches;
        }
        acc
    }
}

/// Spans of every keyword, sorted and merged so overlapping matches from
/// different keywords count once.
fn merged_spans(text: &NormalizedText, keywords: &[CompiledKeyword]) -> Vec<Span> {
    let mut spans: Vec<Span> = keywords
        .iter()
        .flat_map(|k| text.find_keyword(&k.chars, k.allow_prefix))
        .collect();
    spans.sort();

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if last.overlaps(&span) => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

fn read_texts<'a>(
    label: &str,
    table: TableKind,
    cells: &[&'a CellValue],
    warnings: &mut Vec<DataWarning>,
) -> Vec<&'a str> {
    cells
        .iter()
        .enumerate()
        .map(|(row, cell)| {
            let (text, coerced) = cell.text_or_empty();
            if coerced {
                log::warn!("{label}: {table} row {row}: non-text 'redaccion' read as empty");
                warnings.push(DataWarning::non_text(table, row, "redaccion"));
            }
            text
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThematicDefinition;
    use curricula_core::{Competency, LearningOutcome};

    fn config(thematics: Vec<ThematicDefinition>) -> AnalysisConfig {
        AnalysisConfig {
            thematics,
            ..Default::default()
        }
    }

    fn sostenibilidad() -> AnalysisConfig {
        config(vec![
            ThematicDefinition::new("SOSTENIBILIDAD", &["sostenib", "sustentab"], &["triple línea de base"]),
            ThematicDefinition::new("INTELIGENCIA ARTIFICIAL", &["inteligencia artificial", "ia"], &[]),
        ])
    }

    fn competency(text: &str) -> Competency {
        Competency {
            redaccion: text.into(),
            ..Default::default()
        }
    }

    fn outcome(text: &str) -> LearningOutcome {
        LearningOutcome {
            redaccion: text.into(),
            ..Default::default()
        }
    }

    #[test]
    fn detects_prefix_keyword() {
        let matcher = ThematicMatcher::new(&sostenibilidad());
        let d = matcher.detect_in_text("Desarrollo sostenible y responsabilidad ambiental");
        let hit = d.get("SOSTENIBILIDAD").unwrap();
        assert!(hit.presente);
        assert!(hit.coincidencias >= 1);
        assert_eq!(hit.keywords_encontradas, vec!["sostenible"]);
        assert!(!d.get("INTELIGENCIA ARTIFICIAL").unwrap().presente);
    }

    #[test]
    fn counts_every_occurrence() {
        let matcher = ThematicMatcher::new(&sostenibilidad());
        let d = matcher.detect_in_text("Sostenibilidad, SOSTENIBLE y sustentabilidad");
        let hit = d.get("SOSTENIBILIDAD").unwrap();
        assert_eq!(hit.coincidencias, 3);
        assert_eq!(hit.contextos.len(), 3);
        assert_eq!(hit.keywords_encontradas, vec!["sostenibilidad", "sostenible", "sustentabilidad"]);
    }

    #[test]
    fn short_keyword_needs_whole_word() {
        let matcher = ThematicMatcher::new(&sostenibilidad());
        let d = matcher.detect_in_text("Gestión de la IA en la industria");
        let hit = d.get("INTELIGENCIA ARTIFICIAL").unwrap();
        assert_eq!(hit.coincidencias, 1);
    }

    #[test]
    fn overlapping_keywords_count_once() {
        let cfg = config(vec![ThematicDefinition::new(
            "SOSTENIBILIDAD",
            &["desarrollo sostenible", "sostenible"],
            &[],
        )]);
        let matcher = ThematicMatcher::new(&cfg);
        let d = matcher.detect_in_text("Promover el desarrollo sostenible");
        assert_eq!(d.get("SOSTENIBILIDAD").unwrap().coincidencias, 1);
    }

    #[test]
    fn context_keywords_alone_do_not_mark_presence() {
        let matcher = ThematicMatcher::new(&sostenibilidad());
        let d = matcher.detect_in_text("Modelo de triple linea de base");
        let hit = d.get("SOSTENIBILIDAD").unwrap();
        assert_eq!(hit.coincidencias_contexto, 1);
        assert_eq!(hit.coincidencias, 0);
        assert!(!hit.presente);
    }

    #[test]
    fn min_matches_threshold() {
        let mut cfg = sostenibilidad();
        cfg.matching.min_matches = 2;
        let matcher = ThematicMatcher::new(&cfg);
        let d = matcher.detect_in_text("Una mención a la sostenibilidad");
        let hit = d.get("SOSTENIBILIDAD").unwrap();
        assert_eq!(hit.coincidencias, 1);
        assert!(!hit.presente);
    }

    #[test]
    fn context_window_is_configurable() {
        let mut cfg = sostenibilidad();
        cfg.matching.context_window = 5;
        let matcher = ThematicMatcher::new(&cfg);
        let d = matcher.detect_in_text("Este programa forma en sostenibilidad corporativa");
        let ctx = &d.get("SOSTENIBILIDAD").unwrap().contextos[0];
        assert_eq!(ctx, "...a en sostenibilidad corp...");

        // A zero window keeps only the matched word.
        cfg.matching.context_window = 0;
        let matcher = ThematicMatcher::new(&cfg);
        let d = matcher.detect_in_text("Este programa forma en sostenibilidad corporativa");
        let hit = d.get("SOSTENIBILIDAD").unwrap();
        assert_eq!(hit.coincidencias, 1);
        assert_eq!(hit.contextos[0], "...sostenibilidad...");
        let d = matcher.detect_in_text("Sostenible");
        assert_eq!(d.get("SOSTENIBILIDAD").unwrap().contextos[0], "Sostenible");
    }

    #[test]
    fn program_sums_competencies_and_outcomes() {
        let matcher = ThematicMatcher::new(&sostenibilidad());
        let record = ProgramRecord::new("Administración", "adm.xlsx")
            .with_competencias(vec![
                competency("Gestionar organizaciones sostenibles"),
                competency("Aplicar inteligencia artificial a la sostenibilidad"),
            ])
            .with_resultados(vec![outcome("Evaluar proyectos sustentables")]);
        let result = matcher.analyze_programa(&record);

        let s = result.get("SOSTENIBILIDAD").unwrap();
        assert_eq!(s.frecuencia_competencias, 2);
        assert_eq!(s.frecuencia_ra, 1);
        assert_eq!(s.total_coincidencias, 3);
        assert_eq!(s.contextos.len(), 3);
        assert_eq!(result.tematicas_presentes, vec!["SOSTENIBILIDAD", "INTELIGENCIA ARTIFICIAL"]);
        assert_eq!(result.num_tematicas, 2);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn contexts_capped_per_program() {
        let mut cfg = sostenibilidad();
        cfg.matching.max_contexts = 2;
        let matcher = ThematicMatcher::new(&cfg);
        let record = ProgramRecord::new("P", "p")
            .with_competencias(vec![competency("sostenible sostenible sostenible")])
            .with_resultados(vec![]);
        let result = matcher.analyze_programa(&record);
        let s = result.get("SOSTENIBILIDAD").unwrap();
        assert_eq!(s.total_coincidencias, 3);
        assert_eq!(s.contextos.len(), 2);
    }

    #[test]
    fn empty_program_is_valid() {
        let matcher = ThematicMatcher::new(&AnalysisConfig::default());
        let result = matcher.analyze_programa(&ProgramRecord::new("Vacío", "vacio.xlsx"));
        assert_eq!(result.tematicas.len(), 10);
        assert!(result.tematicas_presentes.is_empty());
        assert!(result.counts().iter().all(|c| *c == 0));
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn non_text_cells_read_as_empty() {
        let matcher = ThematicMatcher::new(&sostenibilidad());
        let record = ProgramRecord::new("P", "p")
            .with_competencias(vec![Competency {
                redaccion: CellValue::Number(42.0),
                ..Default::default()
            }])
            .with_resultados(vec![outcome("Sostenibilidad")]);
        let result = matcher.analyze_programa(&record);
        assert_eq!(result.get("SOSTENIBILIDAD").unwrap().total_coincidencias, 1);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].row, Some(0));
    }

    #[test]
    fn matrix_keeps_input_order_and_zero_fills() {
        let matcher = ThematicMatcher::new(&sostenibilidad());
        let records = vec![
            ProgramRecord::new("B", "b").with_competencias(vec![competency("Inteligencia artificial")]),
            ProgramRecord::new("A", "a"),
            ProgramRecord::new("C", "c").with_resultados(vec![outcome("Sostenibilidad")]),
        ];
        let table = matcher.generate_thematic_matrix(&records);
        assert_eq!(table.columns, vec!["SOSTENIBILIDAD", "INTELIGENCIA ARTIFICIAL"]);
        let names: Vec<_> = table.rows.iter().map(|r| r.programa.as_str()).collect();
        assert_eq!(names, vec!["B", "A", "C"]);
        assert_eq!(table.rows[0].counts, vec![0, 1]);
        assert_eq!(table.rows[1].counts, vec![0, 0]);
        assert_eq!(table.rows[2].counts, vec![1, 0]);
    }

    #[test]
    fn detection_is_deterministic() {
        let matcher = ThematicMatcher::new(&AnalysisConfig::default());
        let text = "Ética empresarial, innovación y análisis de datos con Python";
        assert_eq!(matcher.detect_in_text(text), matcher.detect_in_text(text));
    }
}
