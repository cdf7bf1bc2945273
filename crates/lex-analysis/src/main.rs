//! CLI entry point for the analysis engine and report composer.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use lex_analysis::ai::{TextGenerator, enhancer_for};
use lex_analysis::{
    AnalysisEngine, AnalysisMethod, AnalysisRequest, ColumnKind, ComposedReport, ContentBlock,
    Dataset, EngineConfig, Recommendation, ReportComposer, ResultSet, Role, TemplateRegistry,
    recommend,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

#[cfg(feature = "ai")]
use lex_analysis::ai::OpenRouterGenerator;
#[cfg(feature = "ai")]
use std::env;

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Statistical analysis and report composition for survey data",
    long_about = "Runs statistical analyses over a CSV file and composes report sections.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  OPENROUTER_API_KEY    API key for OpenRouter (AI-written narratives)\n\n\
                  EXAMPLES:\n  \
                  # One analysis\n  \
                  lex-analysis -i data.csv --method correlation --bind variables=age,income\n\n  \
                  # With parameters\n  \
                  lex-analysis -i data.csv --method anova --bind dependent=score --bind grouping=class --param alpha=0.01\n\n  \
                  # An analysis plan composed into a report\n  \
                  lex-analysis -i data.csv --plan plan.json --template academic_paper\n\n  \
                  # Suggested analyses for an outcome column\n  \
                  lex-analysis -i data.csv --recommend --target income\n\n  \
                  # Deterministic narratives only, JSON output\n  \
                  lex-analysis -i data.csv --plan plan.json --template business_report --no-ai --json"
)]
struct Args {
    /// Path to the CSV file to analyse
    #[arg(short, long, required_unless_present = "list_templates")]
    input: Option<String>,

    /// Analysis method to run (e.g. correlation, anova, reliability)
    #[arg(short, long, conflicts_with = "plan")]
    method: Option<String>,

    /// Role binding as role=col1,col2 (repeatable)
    #[arg(short, long = "bind", value_name = "ROLE=COLUMNS")]
    bindings: Vec<String>,

    /// Method parameter as key=value; values are read as JSON when possible (repeatable)
    #[arg(short, long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// JSON analysis plan: {"template": "...", "analyses": {"key": request, ...}}
    #[arg(long)]
    plan: Option<PathBuf>,

    /// Compose a report with this template
    #[arg(short, long)]
    template: Option<String>,

    /// Directory of additional JSON templates
    #[arg(long)]
    templates_dir: Option<PathBuf>,

    /// List available templates and exit
    #[arg(long)]
    list_templates: bool,

    /// Suggest analyses for the dataset instead of running any
    #[arg(long, conflicts_with_all = ["method", "plan"])]
    recommend: bool,

    /// Outcome column for --recommend
    #[arg(long, requires = "recommend")]
    target: Option<String>,

    /// Columns to treat as categorical regardless of dtype
    #[arg(long, value_delimiter = ',')]
    categorical: Vec<String>,

    /// Columns holding one option of a multi-select question
    #[arg(long, value_delimiter = ',')]
    multi_select: Vec<String>,

    /// Columns known to be reverse-coded items
    #[arg(long, value_delimiter = ',')]
    reverse_items: Vec<String>,

    /// Disable AI-written narratives (deterministic text only)
    #[arg(long, default_value = "false")]
    no_ai: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of a human-readable summary
    ///
    /// Disables all logs; only the final JSON is written.
    /// Useful for piping to other tools: `... --json | jq .results`
    #[arg(long)]
    json: bool,
}

/// An analysis plan read from `--plan`.
#[derive(Debug, Deserialize)]
struct AnalysisPlan {
    #[serde(default)]
    template: Option<String>,
    analyses: BTreeMap<String, AnalysisRequest>,
}

#[derive(Serialize)]
struct CliOutput<'a> {
    results: &'a ResultSet,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<&'a ComposedReport>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    // Load environment variables from .env file
    dotenv().ok();

    let mut registry = TemplateRegistry::with_builtins();
    if let Some(dir) = &args.templates_dir {
        let loaded = registry.load_dir(dir)?;
        info!("Loaded {} template(s) from {}", loaded.len(), dir.display());
    }

    if args.list_templates {
        print_templates(&registry)?;
        return Ok(());
    }

    let input = args
        .input
        .as_deref()
        .ok_or_else(|| anyhow!("--input is required"))?;
    if !Path::new(input).exists() {
        return Err(anyhow!("Input file not found: {}", input));
    }

    info!("Loading dataset from: {}", input);
    let data = load_csv_with_fallbacks(input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());
    let dataset = build_dataset(&args, data)?;

    if args.recommend {
        let recommendations = recommend(&dataset, args.target.as_deref())?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&recommendations)?);
        } else {
            print_recommendations(&recommendations);
        }
        return Ok(());
    }

    let config = EngineConfig::builder()
        .use_ai_enhancement(!args.no_ai)
        .build()?;
    let engine = AnalysisEngine::new(config.clone())?;

    let (results, plan_template) = run_analyses(&args, &engine, &dataset)?;

    let template = args.template.clone().or(plan_template);
    let report = match template {
        Some(name) => {
            let composer = ReportComposer::new(enhancer_for(&config, build_generator(&args)?));
            Some(composer.generate(&registry, &name, &results)?)
        }
        None => None,
    };

    if args.json {
        let output = CliOutput {
            results: &results,
            report: report.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_results(&results);
        if let Some(report) = &report {
            print_report(report);
        }
    }
    Ok(())
}

/// Wrap the frame and apply the kind overrides and reverse-item hints.
fn build_dataset(args: &Args, data: DataFrame) -> Result<Dataset> {
    let mut dataset = Dataset::from_frame(data);
    for column in &args.categorical {
        dataset = dataset.with_kind(column, ColumnKind::Categorical)?;
    }
    for column in &args.multi_select {
        dataset = dataset.with_kind(column, ColumnKind::MultiSelect)?;
    }
    if !args.reverse_items.is_empty() {
        debug!("Reverse-coded hints: {:?}", args.reverse_items);
        dataset = dataset.with_reverse_hints(args.reverse_items.iter().cloned());
    }
    Ok(dataset)
}

/// Run the single `--method` request or the `--plan` batch.
fn run_analyses(
    args: &Args,
    engine: &AnalysisEngine,
    dataset: &Dataset,
) -> Result<(ResultSet, Option<String>)> {
    if let Some(path) = &args.plan {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Reading plan {}", path.display()))?;
        let plan: AnalysisPlan = serde_json::from_str(&text)
            .with_context(|| format!("Parsing plan {}", path.display()))?;
        info!("Running plan with {} analyses", plan.analyses.len());

        let requests: Vec<(String, AnalysisRequest)> = plan.analyses.into_iter().collect();
        let results = engine.run_batch(dataset, &requests);
        if results.len() < requests.len() {
            warn!(
                "{} analyses were rejected; see the log for details",
                requests.len() - results.len()
            );
        }
        return Ok((results, plan.template));
    }

    let method = args
        .method
        .as_deref()
        .ok_or_else(|| anyhow!("Either --method or --plan is required"))?;
    let request = build_request(method, &args.bindings, &args.params)?;
    let result = engine.run(dataset, &request).map_err(|e| {
        error!("Request rejected: {}", e);
        anyhow!("Request rejected ({}): {}", e.error_code(), e)
    })?;

    let mut results = ResultSet::new();
    results.insert(request.method.id().to_string(), result);
    Ok((results, None))
}

/// Build a request from `--method`, `--bind` and `--param` values.
fn build_request(method: &str, bindings: &[String], params: &[String]) -> Result<AnalysisRequest> {
    let method: AnalysisMethod = method.parse().map_err(|e: String| anyhow!(e))?;
    let mut request = AnalysisRequest::new(method);

    for binding in bindings {
        let (role, columns) = binding
            .split_once('=')
            .ok_or_else(|| anyhow!("Binding '{}' is not role=columns", binding))?;
        let role: Role = role.parse().map_err(|e: String| anyhow!(e))?;
        let columns = columns.split(',').map(str::trim).filter(|c| !c.is_empty());
        request = request.bind_all(role, columns);
    }

    for param in params {
        let (key, value) = param
            .split_once('=')
            .ok_or_else(|| anyhow!("Parameter '{}' is not key=value", param))?;
        let value = serde_json::from_str(value.trim())
            .unwrap_or_else(|_| serde_json::Value::String(value.trim().to_string()));
        request = request.param(key.trim(), value);
    }
    Ok(request)
}

/// Build the narrative generator when AI support is compiled in and configured.
#[cfg(feature = "ai")]
fn build_generator(args: &Args) -> Result<Option<Arc<dyn TextGenerator>>> {
    if args.no_ai {
        info!("Report narratives: deterministic (AI disabled)");
        return Ok(None);
    }

    match env::var("OPENROUTER_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            info!("Report narratives: OpenRouter");
            let generator: Arc<dyn TextGenerator> = Arc::new(OpenRouterGenerator::new(key)?);
            Ok(Some(generator))
        }
        _ => {
            warn!("OPENROUTER_API_KEY not set. Falling back to deterministic narratives.");
            Ok(None)
        }
    }
}

/// Build the narrative generator (deterministic only when the "ai" feature is disabled)
#[cfg(not(feature = "ai"))]
fn build_generator(args: &Args) -> Result<Option<Arc<dyn TextGenerator>>> {
    if !args.no_ai {
        warn!("AI support not compiled in. Using deterministic narratives.");
        warn!("Compile with --features ai to enable AI support.");
    }
    Ok(None)
}

fn print_templates(registry: &TemplateRegistry) -> Result<()> {
    println!("Available templates:");
    for name in registry.names() {
        let template = registry.resolve(name)?;
        println!("  {:<22} {}", name, template.description);
        for section in &template.sections {
            println!("      - {} [{}]", section.title, section.sources.join(", "));
        }
    }
    Ok(())
}

fn print_recommendations(recommendations: &[Recommendation]) {
    println!("Suggested analyses:");
    for recommendation in recommendations {
        let columns: Vec<&str> = recommendation
            .request
            .bindings
            .iter()
            .map(|b| b.column.as_str())
            .collect();
        println!(
            "  {:>3}  {:<28} {}",
            recommendation.score,
            recommendation.method.label(),
            recommendation.reason
        );
        println!("       columns: {}", columns.join(", "));
    }
}

/// Print results for humans.
///
/// Note: uses `println!` intentionally; this is the primary CLI output and
/// must be visible regardless of log level.
fn print_results(results: &ResultSet) {
    for (key, result) in results {
        println!();
        println!("{}", "=".repeat(80));
        println!("{} [{}] - {}", result.method.label(), key, result.status);
        println!("{}", "=".repeat(80));

        if let Some(reason) = &result.failure {
            println!("Failed: {}", reason);
        }
        if !result.findings.is_empty() {
            println!("Findings:");
            for (name, value) in &result.findings {
                println!("  {:<28} {}", name, value);
            }
        }
        if !result.algorithms.is_empty() {
            println!("Algorithms:");
            for (name, outcome) in &result.algorithms {
                match &outcome.failure {
                    Some(reason) => println!("  {:<20} failed: {}", name, reason),
                    None => println!("  {:<20} {}", name, outcome.status),
                }
            }
        }
        for (name, table) in &result.tables {
            print_table(name, table);
        }
        if !result.warnings.is_empty() {
            println!("Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    }
}

fn print_table(name: &str, table: &lex_analysis::Table) {
    println!();
    println!("{} ({})", table.title, name);
    println!("{}", "-".repeat(40));
    println!(
        "{}",
        table
            .columns
            .iter()
            .map(|c| format!("{:<14}", truncate_str(c, 13)))
            .collect::<String>()
    );
    for row in &table.rows {
        println!(
            "{}",
            row.iter()
                .map(|cell| format!("{:<14}", truncate_str(&cell.to_string(), 13)))
                .collect::<String>()
        );
    }
}

fn print_report(report: &ComposedReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!(
        "REPORT: {} (generated {}, {} of {} sections AI-written)",
        report.template,
        report.generated_at,
        report.enhanced_sections(),
        report.sections.len()
    );
    println!("{}", "=".repeat(80));

    for section in &report.sections {
        println!();
        println!("## {}", section.title);
        for block in &section.blocks {
            match block {
                ContentBlock::Narrative(text) => println!("\n{}", text),
                ContentBlock::Note(text) => println!("\n> {}", text),
                ContentBlock::Table { table, key, .. } => print_table(key, table),
                ContentBlock::Figure { figure, .. } => {
                    println!("\n[figure: {:?} \"{}\"]", figure.kind, figure.title)
                }
            }
        }
    }
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn load_csv_with_fallbacks(path: &str) -> Result<DataFrame> {
    // Strategy 1: Standard loading with quote handling and date parsing
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_try_parse_dates(true),
        )
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Standard loading failed: {}", e);
        }
    }

    // Strategy 2: Without quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(100))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => {
            debug!("Loading without quotes failed: {}", e);
        }
    }

    // Strategy 3: Pre-clean content
    match std::fs::read_to_string(path) {
        Ok(content) => {
            let cleaned = clean_csv_content(&content);
            let cursor = std::io::Cursor::new(cleaned);

            CsvReadOptions::default()
                .with_infer_schema_length(Some(100))
                .with_has_header(true)
                .into_reader_with_file_handle(cursor)
                .finish()
                .map_err(|e| e.into())
        }
        Err(e) => {
            error!("Could not read file: {}", e);
            Err(e.into())
        }
    }
}

/// Clean CSV content
fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_from_flags() {
        let request = build_request(
            "independent-t-test",
            &["dependent=score".to_string(), "grouping=class".to_string()],
            &["alpha=0.01".to_string(), "label=north".to_string()],
        )
        .unwrap();

        assert_eq!(request.method, AnalysisMethod::IndependentTTest);
        assert_eq!(request.columns_for(Role::Dependent), vec!["score"]);
        assert_eq!(request.parameters.f64("alpha"), Some(0.01));
        assert_eq!(request.parameters.str("label"), Some("north"));
    }

    #[test]
    fn test_bind_splits_columns() {
        let request = build_request("correlation", &["variables=a, b,c".to_string()], &[]).unwrap();
        assert_eq!(request.columns_for(Role::Variables), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_flags_are_errors() {
        assert!(build_request("correlation", &["variables".to_string()], &[]).is_err());
        assert!(build_request("nope", &[], &[]).is_err());
        assert!(build_request("correlation", &[], &["alpha".to_string()]).is_err());
    }

    #[test]
    fn test_recommend_flags() {
        let args = Args::try_parse_from([
            "lex-analysis", "-i", "data.csv", "--recommend", "--target", "age",
        ])
        .unwrap();
        assert!(args.recommend);
        assert_eq!(args.target.as_deref(), Some("age"));

        assert!(Args::try_parse_from(["lex-analysis", "-i", "d.csv", "--target", "age"]).is_err());
        let conflicting = ["lex-analysis", "-i", "d.csv", "--recommend", "--method", "anova"];
        assert!(Args::try_parse_from(conflicting).is_err());
    }

    #[test]
    fn test_plan_deserializes() {
        let json = r#"{
            "template": "academic_paper",
            "analyses": {
                "correlation": {
                    "method": "correlation",
                    "bindings": [
                        {"role": "variables", "column": "a"},
                        {"role": "variables", "column": "b"}
                    ]
                }
            }
        }"#;
        let plan: AnalysisPlan = serde_json::from_str(json).unwrap();
        assert_eq!(plan.template.as_deref(), Some("academic_paper"));
        assert_eq!(plan.analyses["correlation"].bindings.len(), 2);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a_long_column_name", 10), "a_long_...");
    }
}
