//! Integration tests for the analysis engine and report composer.
//!
//! These tests drive the public API end to end: CSV fixture in, keyed
//! results out, composed into template sections.

use lex_analysis::ai::{
    EnhancementFailure, NarrativeEnhancer, ProviderEnhancer, TextGenerator,
};
use lex_analysis::computers::detect_and_correct;
use lex_analysis::reporting::describe_result;
use lex_analysis::{
    AnalysisEngine, AnalysisMethod, AnalysisRequest, ContentBlock, Dataset, EngineConfig,
    FailureReason, Provenance, ReportComposer, ResultSet, Role, Status, TemplateRegistry,
    ValidationError, recommend,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::{Strategy, prop, prop_assert, prop_assert_eq, proptest};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_survey() -> Dataset {
    let path = fixtures_path().join("survey.csv");
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file");
    Dataset::from_frame(df).with_reverse_hints(["q5"])
}

fn survey_requests() -> Vec<(&'static str, AnalysisRequest)> {
    vec![
        (
            "descriptive",
            AnalysisRequest::new(AnalysisMethod::Descriptive).bind_all(Role::Variables, ["age", "q1"]),
        ),
        (
            "frequency",
            AnalysisRequest::new(AnalysisMethod::Frequency)
                .bind_all(Role::Variables, ["gender", "region"]),
        ),
        (
            "reliability",
            AnalysisRequest::new(AnalysisMethod::Reliability)
                .bind_all(Role::Items, ["q1", "q2", "q3", "q4"]),
        ),
        (
            "quality",
            AnalysisRequest::new(AnalysisMethod::QuestionnaireQuality)
                .bind_all(Role::Items, ["q1", "q2", "q3", "q4", "q5"])
                .param("scale_min", 1)
                .param("scale_max", 5),
        ),
        (
            "multi_select",
            AnalysisRequest::new(AnalysisMethod::MultiSelect)
                .bind_all(Role::Items, ["opt_email", "opt_phone", "opt_web"]),
        ),
    ]
}

fn survey_results() -> ResultSet {
    AnalysisEngine::default().run_batch(&load_survey(), &survey_requests())
}

/// Generator that returns a fixed text and counts its calls.
struct ScriptedGenerator {
    calls: AtomicUsize,
}

impl TextGenerator for ScriptedGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok("  Written by the model.  ".to_string())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

struct FailingGenerator;

impl TextGenerator for FailingGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
        Err(EnhancementFailure::Provider("HTTP 503".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}

struct SlowGenerator;

impl TextGenerator for SlowGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, EnhancementFailure> {
        std::thread::sleep(Duration::from_secs(2));
        Ok("too late".to_string())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

fn composer_with(generator: Arc<dyn TextGenerator>, timeout: Duration) -> ReportComposer {
    let enhancer: Arc<dyn NarrativeEnhancer> = Arc::new(ProviderEnhancer::new(generator, timeout));
    ReportComposer::new(enhancer)
}

// ============================================================================
// Sample Floors and Pairwise Deletion
// ============================================================================

#[test]
fn test_correlation_uses_pairwise_rows() {
    let df = df![
        "a" => [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)],
        "b" => [Some(2.0), None, Some(3.0), Some(4.0), Some(5.0)],
    ]
    .unwrap();
    let request = AnalysisRequest::new(AnalysisMethod::Correlation).bind_all(Role::Variables, ["a", "b"]);

    let result = AnalysisEngine::default()
        .run(&Dataset::from_frame(df), &request)
        .unwrap();

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.number("n"), Some(3.0));
}

#[test]
fn test_request_alpha_reaches_the_narrative() {
    // r = 0.69, p = 0.028
    let df = df![
        "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "b" => [3.0, 1.0, 4.0, 2.0, 7.0, 3.0, 5.0, 9.0, 6.0, 6.0],
    ]
    .unwrap();
    let dataset = Dataset::from_frame(df);
    let engine = AnalysisEngine::default();
    let request = AnalysisRequest::new(AnalysisMethod::Correlation).bind_all(Role::Variables, ["a", "b"]);

    let lenient = engine.run(&dataset, &request).unwrap();
    assert_eq!(lenient.flag("significant"), Some(true));
    assert!(!describe_result(&lenient).contains("not statistically significant"));

    let strict = engine.run(&dataset, &request.clone().param("alpha", 0.01)).unwrap();
    let p = strict.number("p_value").unwrap();
    assert!(p > 0.01 && p < 0.05, "p = {p}");
    assert_eq!(strict.flag("significant"), Some(false));
    assert!(describe_result(&strict).contains("not statistically significant"));
}

#[test]
fn test_below_floor_pairwise_sample_is_a_failed_result() {
    // each column passes the marginal floor of 3; only 2 rows overlap
    let df = df![
        "a" => [Some(1.0), Some(2.0), Some(3.0), None, None],
        "b" => [None, Some(4.0), Some(1.0), Some(2.0), None],
    ]
    .unwrap();
    let request = AnalysisRequest::new(AnalysisMethod::Correlation).bind_all(Role::Variables, ["a", "b"]);

    let result = AnalysisEngine::default()
        .run(&Dataset::from_frame(df), &request)
        .unwrap();

    assert_eq!(result.status, Status::Failed);
    assert!(result.findings.is_empty());
    assert_eq!(
        result.failure,
        Some(FailureReason::InsufficientPairwiseSample {
            required: 3,
            found: 2
        })
    );
}

#[test]
fn test_marginal_floor_rejects_before_computation() {
    let df = df![
        "a" => [Some(1.0), Some(2.0), None, None],
        "b" => [Some(1.0), Some(2.0), Some(3.0), Some(4.0)],
    ]
    .unwrap();
    let request = AnalysisRequest::new(AnalysisMethod::Correlation).bind_all(Role::Variables, ["a", "b"]);

    let err = AnalysisEngine::default()
        .run(&Dataset::from_frame(df), &request)
        .unwrap_err();

    assert_eq!(err.error_code(), "INSUFFICIENT_SAMPLE");
}

#[test]
fn test_wrong_column_kind_is_rejected() {
    let err = AnalysisEngine::default()
        .run(
            &load_survey(),
            &AnalysisRequest::new(AnalysisMethod::Correlation).bind_all(Role::Variables, ["age", "gender"]),
        )
        .unwrap_err();

    assert!(matches!(err, ValidationError::WrongColumnKind { .. }));
}

proptest! {
    #[test]
    fn prop_correlation_n_is_the_pairwise_count(
        a in prop::collection::vec(prop::option::weighted(0.7, -100.0f64..100.0), 12),
        b in prop::collection::vec(prop::option::weighted(0.7, -100.0f64..100.0), 12),
    ) {
        let pairwise = a.iter().zip(&b).filter(|(x, y)| x.is_some() && y.is_some()).count();
        let df = df!["a" => a, "b" => b].unwrap();
        let request = AnalysisRequest::new(AnalysisMethod::Correlation)
            .bind_all(Role::Variables, ["a", "b"]);

        // rejected requests only fail the marginal floor
        if let Ok(result) = AnalysisEngine::default().run(&Dataset::from_frame(df), &request) {
            if result.status == Status::Success {
                prop_assert_eq!(result.number("n"), Some(pairwise as f64));
            }
            if pairwise < 3 {
                prop_assert_eq!(result.status, Status::Failed);
            }
        }
    }
}

// ============================================================================
// Reverse Items and Reliability
// ============================================================================

#[test]
fn test_survey_reverse_item_is_detected() {
    let dataset = load_survey();
    let items: Vec<Vec<f64>> = ["q1", "q2", "q3", "q4", "q5"]
        .iter()
        .map(|name| {
            dataset
                .numeric(name)
                .unwrap()
                .into_iter()
                .map(|v| v.unwrap())
                .collect()
        })
        .collect();

    let corrected = detect_and_correct(&items, 1.0, 5.0, 0.1);
    assert_eq!(corrected.flagged, vec![4]);
    assert!(detect_and_correct(&corrected.items, 1.0, 5.0, 0.1).flagged.is_empty());
}

proptest! {
    #[test]
    fn prop_reverse_correction_is_idempotent(
        items in (2usize..8, 3usize..25).prop_flat_map(|(k, n)| {
            prop::collection::vec(prop::collection::vec(1u8..=5, n), k)
        })
    ) {
        let items: Vec<Vec<f64>> = items
            .into_iter()
            .map(|c| c.into_iter().map(f64::from).collect())
            .collect();

        let once = detect_and_correct(&items, 1.0, 5.0, 0.1);
        let twice = detect_and_correct(&once.items, 1.0, 5.0, 0.1);

        prop_assert!(twice.flagged.is_empty(), "second pass flagged {:?}", twice.flagged);
        prop_assert_eq!(twice.items, once.items);
    }
}

#[test]
fn test_correcting_a_reverse_item_raises_alpha() {
    let base = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 2.0, 4.0, 6.0, 3.0, 5.0];
    let shift = [0.0, 1.0, 0.0, -1.0, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0, 1.0, 0.0];
    let mut rotated = shift;
    rotated.rotate_left(3);
    let item = |offsets: &[f64]| -> Vec<f64> {
        base.iter()
            .zip(offsets)
            .map(|(b, s)| (b + s).clamp(1.0, 7.0))
            .collect()
    };
    let q1: Vec<f64> = base.to_vec();
    let q2 = item(&shift);
    let q3 = item(&shift.map(|s| -s));
    let q4 = item(&rotated);
    let q5: Vec<f64> = q1.iter().map(|v| 8.0 - v).collect();
    let df = df!["q1" => q1, "q2" => q2, "q3" => q3, "q4" => q4, "q5" => q5].unwrap();

    let request = AnalysisRequest::new(AnalysisMethod::QuestionnaireQuality)
        .bind_all(Role::Items, ["q1", "q2", "q3", "q4", "q5"])
        .param("scale_min", 1)
        .param("scale_max", 7);
    let result = AnalysisEngine::default()
        .run(&Dataset::from_frame(df), &request)
        .unwrap();

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.number("reverse_items_flagged"), Some(1.0));
    assert_eq!(result.text("reverse_items"), Some("q5"));
    let raw_alpha = result.number("raw_alpha").unwrap();
    let corrected_alpha = result.number("corrected_alpha").unwrap();
    assert!(
        corrected_alpha > raw_alpha,
        "alpha should rise after correction: {} -> {}",
        raw_alpha,
        corrected_alpha
    );
}

#[test]
fn test_survey_quality_matches_declared_reverse_item() {
    let results = survey_results();
    let quality = &results["quality"];

    assert_eq!(quality.status, Status::Success);
    assert_eq!(quality.text("reverse_items"), Some("q5"));
    assert!(quality.number("corrected_alpha").unwrap() > 0.9);
    // q5 is both declared and detected: no mismatch warnings
    assert!(quality.warnings.iter().all(|w| !w.contains("reverse-coded")));
}

// ============================================================================
// Recommendations
// ============================================================================

#[test]
fn test_recommendations_for_survey_outcome() {
    let dataset = load_survey();
    let recommendations = recommend(&dataset, Some("age")).unwrap();

    let first = &recommendations[0];
    assert_eq!(first.method, AnalysisMethod::LinearRegression);
    assert!(first.reason.contains("distinct values"));

    let t_test = recommendations
        .iter()
        .find(|r| r.method == AnalysisMethod::IndependentTTest)
        .unwrap();
    assert_eq!(t_test.request.columns_for(Role::Grouping), vec!["gender"]);
    let anova = recommendations
        .iter()
        .find(|r| r.method == AnalysisMethod::Anova)
        .unwrap();
    assert_eq!(anova.request.columns_for(Role::Grouping), vec!["region"]);

    let engine = AnalysisEngine::default();
    for recommendation in &recommendations {
        assert!(engine.run(&dataset, &recommendation.request).is_ok());
    }
}

// ============================================================================
// Multi-Algorithm Methods
// ============================================================================

#[test]
fn test_classification_comparison_partial_when_one_algorithm_fails() {
    // perfectly separable: logistic regression cannot converge
    let x: Vec<f64> = (1..=20).map(f64::from).collect();
    let label: Vec<&str> = (1..=20).map(|i| if i <= 10 { "low" } else { "high" }).collect();
    let dataset = Dataset::from_frame(df!["x" => x, "label" => label].unwrap());
    let request = AnalysisRequest::new(AnalysisMethod::ClassificationComparison)
        .bind(Role::Dependent, "label")
        .bind(Role::Independent, "x")
        .param(
            "algorithms",
            serde_json::json!(["logistic_regression", "naive_bayes", "knn"]),
        );

    let result = AnalysisEngine::default().run(&dataset, &request).unwrap();

    assert_eq!(result.status, Status::Partial);
    assert_eq!(result.algorithms.len(), 3);
    assert_eq!(result.algorithms["logistic_regression"].status, Status::Failed);
    assert_eq!(result.algorithms["naive_bayes"].status, Status::Success);
    assert_eq!(result.algorithms["knn"].status, Status::Success);
}

// ============================================================================
// Report Composition
// ============================================================================

#[test]
fn test_every_builtin_template_composes_from_no_results() {
    let registry = TemplateRegistry::with_builtins();
    let composer = ReportComposer::deterministic();
    let empty = ResultSet::new();

    for name in registry.names() {
        let template = registry.resolve(name).unwrap();
        let report = composer.generate(&registry, name, &empty).unwrap();

        assert_eq!(report.sections.len(), template.sections.len(), "{}", name);
        for section in &report.sections {
            assert!(section.is_placeholder(), "{}/{}", name, section.key);
            assert_eq!(section.provenance, Provenance::Fallback);
            assert!(section.sources_used.is_empty());
        }
    }
}

#[test]
fn test_survey_report_end_to_end() {
    let results = survey_results();
    assert_eq!(results.len(), survey_requests().len());

    let registry = TemplateRegistry::with_builtins();
    let report = ReportComposer::deterministic()
        .generate(&registry, "questionnaire_report", &results)
        .unwrap();

    assert_eq!(report.template, "questionnaire_report");
    let keys: Vec<&str> = report.sections.iter().map(|s| s.key.as_str()).collect();
    assert_eq!(
        keys,
        vec!["sample", "quality", "reliability", "validity", "multi_select"]
    );

    let reliability = &report.sections[2];
    assert_eq!(reliability.sources_used, vec!["reliability".to_string()]);
    assert!(reliability.narrative().unwrap().contains("Cronbach's alpha"));

    // no factor analysis was run
    let validity = &report.sections[3];
    assert!(validity.is_placeholder());
    assert_eq!(validity.sources_missing, vec!["factor_analysis".to_string()]);

    let quality = &report.sections[1];
    assert!(
        quality
            .blocks
            .iter()
            .any(|b| matches!(b, ContentBlock::Table { key, .. } if key == "reverse_items"))
    );
}

#[test]
fn test_ai_written_sections_are_marked() {
    let generator = Arc::new(ScriptedGenerator {
        calls: AtomicUsize::new(0),
    });
    let composer = composer_with(generator.clone(), Duration::from_secs(5));
    let registry = TemplateRegistry::with_builtins();

    let report = composer
        .generate(&registry, "questionnaire_report", &survey_results())
        .unwrap();

    // the validity section has no results and never reaches the model
    assert_eq!(report.enhanced_sections(), 4);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 4);
    assert_eq!(report.sections[2].narrative(), Some("Written by the model."));
    assert_eq!(report.sections[3].provenance, Provenance::Fallback);
}

#[test]
fn test_failing_ai_falls_back_everywhere() {
    let composer = composer_with(Arc::new(FailingGenerator), Duration::from_secs(5));
    let registry = TemplateRegistry::with_builtins();

    let report = composer
        .generate(&registry, "questionnaire_report", &survey_results())
        .unwrap();

    assert_eq!(report.enhanced_sections(), 0);
    for section in &report.sections {
        assert_eq!(section.provenance, Provenance::Fallback);
        assert!(section.narrative().is_some() || section.notes().count() > 0);
    }
}

#[test]
fn test_slow_ai_times_out_into_fallback() {
    let composer = composer_with(Arc::new(SlowGenerator), Duration::from_millis(50));
    let registry = TemplateRegistry::with_builtins();
    let mut results = ResultSet::new();
    let reliability = survey_results().remove("reliability").unwrap();
    results.insert("reliability".to_string(), reliability);

    let report = composer
        .generate(&registry, "questionnaire_report", &results)
        .unwrap();

    let section = &report.sections[2];
    assert_eq!(section.provenance, Provenance::Fallback);
    assert!(section.narrative().unwrap().contains("Cronbach's alpha"));
}

#[test]
fn test_unknown_template_is_an_error() {
    let registry = TemplateRegistry::with_builtins();
    let err = ReportComposer::deterministic()
        .generate(&registry, "quarterly_review", &ResultSet::new())
        .unwrap_err();

    assert!(err.to_string().contains("quarterly_review"));
}

#[test]
fn test_engine_config_drives_enhancer_choice() {
    let config = EngineConfig::builder()
        .use_ai_enhancement(false)
        .build()
        .unwrap();
    let enhancer = lex_analysis::ai::enhancer_for(
        &config,
        Some(Arc::new(FailingGenerator) as Arc<dyn TextGenerator>),
    );

    assert_eq!(enhancer.enhance("prompt"), Err(EnhancementFailure::Unavailable));
}
