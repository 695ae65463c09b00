use std::path::PathBuf;

use curricula_analysis::batch::{Analyzer, BatchResult};
use curricula_analysis::config::AnalysisConfig;
use curricula_analysis::consolidate::{IndicatorColumn, ProgramOutcome, RowStatus};
use curricula_analysis::indicators::FindingRule;
use curricula_analysis::{AnalysisError, ThematicMatcher, WarningKind};
use curricula_core::{KnowledgeType, ProgramRecord};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_records() -> Vec<ProgramRecord> {
    let path = fixtures_dir().join("programs.json");
    let json = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    serde_json::from_str(&json).unwrap()
}

fn load_config(name: &str) -> Result<AnalysisConfig, AnalysisError> {
    let toml = std::fs::read_to_string(fixtures_dir().join(name)).unwrap();
    AnalysisConfig::from_toml(&toml)
}

fn run_default() -> BatchResult {
    let analyzer = Analyzer::new(AnalysisConfig::default()).unwrap();
    analyzer.run_batch(&load_records()).unwrap()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// -------------------------------------------------------------------------
// Batch shape
// -------------------------------------------------------------------------

#[test]
fn batch_keeps_input_order_with_marker_row() {
    let result = run_default();

    let names: Vec<_> = result.programas.iter().map(|p| p.programa()).collect();
    assert_eq!(names, vec!["Administración de Empresas", "Contaduría Pública", "Economía", "#4"]);
    assert!(result.programas[3].is_failed());

    let thematic = &result.consolidado.tematicas;
    assert_eq!(thematic.rows.len(), 4);
    assert_eq!(thematic.columns.len(), 10);
    assert_eq!(thematic.rows[3].status, RowStatus::Failed);
    assert!(thematic.rows[3].counts.iter().all(|c| *c == 0));

    let indicators = &result.consolidado.indicadores;
    assert_eq!(indicators.rows.len(), 4);
    assert_eq!(indicators.columns, IndicatorColumn::ALL.to_vec());
    assert_eq!(indicators.rows[3].status, RowStatus::Failed);

    assert_eq!(result.resumen.total_programas, 4);
    assert_eq!(result.resumen.analizados, 3);
    assert_eq!(result.resumen.fallidos, 1);
    assert_eq!(result.resumen.ranking[0].programa, "Administración de Empresas");
}

#[test]
fn batch_is_deterministic() {
    let first = run_default();
    let second = run_default();
    assert_eq!(first.programas, second.programas);
    assert_eq!(first.consolidado, second.consolidado);
    assert_eq!(
        serde_json::to_string(&first.programas).unwrap(),
        serde_json::to_string(&second.programas).unwrap()
    );
}

// -------------------------------------------------------------------------
// Complete program
// -------------------------------------------------------------------------

#[test]
fn complete_program_indicators() {
    let result = run_default();
    let program = result.programas[0].analyzed().unwrap();
    let r = &program.indicadores;

    assert_eq!(r.totales.competencias, 3);
    assert_eq!(r.totales.resultados_aprendizaje, 6);
    assert_eq!(r.totales.estrategias_meso, 2);
    assert_eq!(r.totales.estrategias_micro, 5);

    for kind in KnowledgeType::ALL {
        assert!(approx(r.balance.porcentajes.get(kind), 100.0 / 3.0));
    }
    assert!(r.balance.balanceado);

    assert_eq!(r.complejidad.conteo.basico, 1);
    assert_eq!(r.complejidad.conteo.intermedio, 3);
    assert_eq!(r.complejidad.conteo.avanzado, 2);
    assert!(approx(r.complejidad.nivel_promedio, 23.0 / 6.0));

    assert_eq!(r.cobertura.porcentaje_cobertura, 100.0);
    assert_eq!(r.cobertura.promedio_ra_por_competencia, 2.0);

    assert_eq!(r.diversidad.num_estrategias_unicas, 4);
    assert_eq!(r.diversidad.porcentaje_metodologias_activas, 80.0);
    assert_eq!(r.diversidad.top_estrategias[0].estrategia, "Taller");
    assert_eq!(r.diversidad.top_estrategias[0].frecuencia, 2);

    assert_eq!(r.completitud.completitud_total, 100.0);
    assert_eq!(r.carga.horas_presenciales, 46.0);
    assert_eq!(r.carga.horas_autonomas, 62.0);
    assert_eq!(r.carga.filas_con_horas, 5);
    assert!(approx(r.carga.ratio_autonomas_presenciales.unwrap(), 62.0 / 46.0));
    assert!(r.hallazgos.is_empty());
    assert!(r.warnings.is_empty());

    // 0.25*100 + 0.20*56.67 + 0.15*100 + 0.15*80 + 0.15*100 + 0.10*80
    assert!(approx(r.calidad.total, 86.0 + 1.0 / 3.0));
}

#[test]
fn complete_program_thematics() {
    let result = run_default();
    let t = &result.programas[0].analyzed().unwrap().tematicas;

    let sost = t.get("SOSTENIBILIDAD").unwrap();
    assert!(sost.presente);
    assert_eq!(sost.frecuencia_competencias, 1);
    assert_eq!(sost.frecuencia_ra, 2);
    assert_eq!(sost.total_coincidencias, 3);
    assert_eq!(sost.coincidencias_contexto, 1);
    assert_eq!(sost.contextos.len(), 3);

    let ia = t.get("INTELIGENCIA ARTIFICIAL").unwrap();
    assert_eq!(ia.total_coincidencias, 3);
    assert!(!t.get("ANÁLISIS DE DATOS").unwrap().presente);

    assert_eq!(&t.tematicas_presentes[..2], &["SOSTENIBILIDAD", "INTELIGENCIA ARTIFICIAL"]);
    assert_eq!(t.num_tematicas, t.tematicas_presentes.len());

    let row = &result.consolidado.tematicas.rows[0];
    assert_eq!(row.counts, t.counts());
}

// -------------------------------------------------------------------------
// Degraded programs
// -------------------------------------------------------------------------

#[test]
fn degraded_program_reports_warnings() {
    let result = run_default();
    let program = result.programas[1].analyzed().unwrap();
    let r = &program.indicadores;

    assert_eq!(r.balance.total_clasificados, 2);
    assert_eq!(r.balance.sin_clasificar, 1);
    assert_eq!(r.balance.porcentajes.saber, 50.0);
    assert_eq!(r.balance.porcentajes.saber_ser, 0.0);
    assert!(!r.balance.balanceado);

    // "Nivel 3 - Aplicar" -> 3, verb "Examinar" -> 4, verb "Reconocer" -> 1
    assert_eq!(r.complejidad.conteo.basico, 1);
    assert_eq!(r.complejidad.conteo.intermedio, 2);
    assert_eq!(r.complejidad.niveles_por_defecto, 0);

    assert_eq!(r.cobertura.porcentaje_cobertura, 50.0);
    assert_eq!(r.cobertura.competencias_sin_ra, vec!["2"]);
    assert_eq!(r.diversidad.total_estrategias, 0);

    let kinds: Vec<_> = r.warnings.iter().map(|w| w.kind).collect();
    assert_eq!(kinds, vec![WarningKind::MissingTable, WarningKind::UnknownKnowledgeType]);

    let rules: Vec<_> = r.hallazgos.iter().map(|f| f.regla).collect();
    assert_eq!(
        rules,
        vec![FindingRule::MinCompetencias, FindingRule::MinRaPorCompetencia, FindingRule::MinCompletitud]
    );

    let t = &program.tematicas;
    assert_eq!(t.warnings.len(), 1);
    assert_eq!(t.warnings[0].kind, WarningKind::NonTextValue);
    assert_eq!(t.warnings[0].row, Some(1));
}

#[test]
fn empty_program_is_fully_defined() {
    let result = run_default();
    let program = result.programas[2].analyzed().unwrap();
    let r = &program.indicadores;

    assert_eq!(r.balance.total_clasificados, 0);
    assert_eq!(r.balance.porcentajes.saber + r.balance.porcentajes.saber_hacer + r.balance.porcentajes.saber_ser, 0.0);
    assert_eq!(r.complejidad.indice_complejidad, 0.0);
    assert_eq!(r.cobertura.porcentaje_cobertura, 0.0);
    assert_eq!(r.completitud.completitud_total, 0.0);
    assert_eq!(r.warnings.len(), 4);
    assert!(approx(r.calidad.total, 8.0));
    assert!(program.tematicas.tematicas_presentes.is_empty());
}

#[test]
fn percentages_sum_to_hundred() {
    let result = run_default();
    for program in result.programas.iter().filter_map(ProgramOutcome::analyzed) {
        let r = &program.indicadores;
        let balance: f64 = KnowledgeType::ALL.iter().map(|k| r.balance.porcentajes.get(*k)).sum();
        let buckets = r.complejidad.porcentajes.basico + r.complejidad.porcentajes.intermedio + r.complejidad.porcentajes.avanzado;
        if r.balance.total_clasificados > 0 {
            assert!((balance - 100.0).abs() <= 0.01, "{}: balance sums to {balance}", r.programa);
        } else {
            assert_eq!(balance, 0.0);
        }
        if r.totales.resultados_aprendizaje > 0 {
            assert!((buckets - 100.0).abs() <= 0.01, "{}: buckets sum to {buckets}", r.programa);
        } else {
            assert_eq!(buckets, 0.0);
        }
    }
}

// -------------------------------------------------------------------------
// Configuration
// -------------------------------------------------------------------------

#[test]
fn faculty_config_changes_catalog_and_completeness() {
    let config = load_config("faculty.toml").unwrap();
    assert_eq!(config.name, "Facultad de Ciencias Administrativas");
    let analyzer = Analyzer::new(config).unwrap();
    let result = analyzer.run_batch(&load_records()).unwrap();

    assert!(result.meta.parallel);
    assert_eq!(result.meta.workers, 2);
    assert_eq!(result.consolidado.tematicas.columns, vec!["SOSTENIBILIDAD", "INTELIGENCIA ARTIFICIAL", "ÉTICA"]);
    assert_eq!(result.consolidado.tematicas.rows[0].counts, vec![3, 2, 2]);
    assert_eq!(result.consolidado.tematicas.rows[1].counts, vec![0, 0, 1]);

    let admin = result.programas[0].analyzed().unwrap();
    assert_eq!(admin.tematicas.get("SOSTENIBILIDAD").unwrap().contextos.len(), 2);

    let conta = result.programas[1].analyzed().unwrap();
    assert!(approx(conta.indicadores.completitud.completitud_total, (100.0 + 1100.0 / 12.0) / 4.0));

    let coverage = result.consolidado.tematicas.coverage();
    let etica = coverage.iter().find(|c| c.tematica == "ÉTICA").unwrap();
    assert_eq!(etica.programas, 2);
    assert!(approx(etica.porcentaje_programas, 200.0 / 3.0));

    let hits = result.consolidado.tematicas.programs_with("ÉTICA", 1);
    assert_eq!(hits[0], ("Administración de Empresas".to_string(), 2));
}

#[test]
fn bad_weights_fail_before_any_program() {
    let err = load_config("bad-weights.toml").unwrap_err();
    assert!(matches!(err, AnalysisError::InvalidWeights { .. }));
    assert!(err.is_config());
}

#[test]
fn sustainability_keywords_scenario() {
    let config = load_config("faculty.toml").unwrap();
    let matcher = ThematicMatcher::new(&config);
    let detection = matcher.detect_in_text("Desarrollo sostenible y responsabilidad ambiental");
    let hit = detection.get("SOSTENIBILIDAD").unwrap();
    assert!(hit.presente);
    assert!(hit.coincidencias >= 1);
}

#[test]
fn thematic_matrix_has_one_row_per_record() {
    let records = load_records();
    let matcher = ThematicMatcher::new(&AnalysisConfig::default());
    let table = matcher.generate_thematic_matrix(&records);
    assert_eq!(table.rows.len(), records.len());
    assert!(table.rows.iter().all(|r| r.counts.len() == 10));
    assert_eq!(table.rows[2].programa, "Economía");
    assert!(table.rows[2].counts.iter().all(|c| *c == 0));
}

#[test]
fn sequential_and_parallel_agree() {
    let records = load_records();
    let mut config = load_config("faculty.toml").unwrap();
    let parallel = Analyzer::new(config.clone()).unwrap().run_batch(&records).unwrap();
    config.batch.parallel = false;
    let sequential = Analyzer::new(config).unwrap().run_batch(&records).unwrap();
    assert_eq!(parallel.programas, sequential.programas);
    assert_eq!(parallel.consolidado, sequential.consolidado);
}
