use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::agent::ai_model::{AiFormAnalyzer, MistralBackend};
use crate::agent::analyzer::{FieldAnalyzer, ProfileAnalyzer};
use crate::agent::autofill_model::AutofillReport;
use crate::agent::orchestrator::Autofill;
use crate::agent::recovery::ErrorRecovery;
use crate::cli::config::{AppConfig, resolve_api_key};
use crate::dom::document::Document;
use crate::fill::delay::{ThreadDelay, TypingCadence};
use crate::fill::filler::FormFiller;
use crate::form::form_model::FormSnapshot;
use crate::form::scanner::scan;
use crate::profile::profile_model::Profile;
use crate::profile::validation::{ValidationReport, validate_profile};
use crate::storage::responses::ResponseStore;
use crate::storage::store::JsonFileStore;
use crate::trace::logger::TraceLogger;
use crate::trace::overlay::DebugOverlay;

// ============================================================================
// scan subcommand
// ============================================================================

pub fn cmd_scan(page_path: &str, format: &str) -> Result<FormSnapshot, Box<dyn Error>> {
    let doc = load_page(page_path)?;
    let snapshot = scan(&doc);

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        _ => print!("{}", format_scan_table(&snapshot)),
    }
    Ok(snapshot)
}

/// One line per field: selector, type, purpose, required marker and label.
pub fn format_scan_table(snapshot: &FormSnapshot) -> String {
    let width = snapshot
        .fields
        .iter()
        .map(|f| f.selector.len())
        .max()
        .unwrap_or(8)
        .max(8);

    let mut out = format!(
        "{} fields ({} forms) at {}\n",
        snapshot.fields.len(),
        snapshot.form_count,
        if snapshot.url.is_empty() { "(unknown)" } else { &snapshot.url }
    );
    out.push_str(&format!(
        "{:<width$}  {:<10}  {:<14}  {:<3}  {}\n",
        "SELECTOR", "TYPE", "PURPOSE", "REQ", "LABEL"
    ));
    for field in &snapshot.fields {
        let location = if field.frame.is_empty() {
            String::new()
        } else {
            format!(" (frame {:?})", field.frame)
        };
        out.push_str(&format!(
            "{:<width$}  {:<10}  {:<14}  {:<3}  {}{}\n",
            field.selector,
            field.field_type,
            field.purpose.as_str(),
            if field.required { "*" } else { "" },
            field.label,
            location
        ));
    }
    out
}

// ============================================================================
// fill subcommand
// ============================================================================

#[allow(clippy::too_many_arguments)]
pub fn cmd_fill(
    page_path: &str,
    profile_path: &str,
    analyzer_name: Option<&str>,
    output: Option<&str>,
    no_delay: bool,
    store_path: Option<&str>,
    config: &AppConfig,
    cli_api_key: Option<&str>,
) -> Result<AutofillReport, Box<dyn Error>> {
    let mut doc = load_page(page_path)?;
    let profile = load_profile(profile_path)?;

    let analyzer_name = analyzer_name.unwrap_or(if config.ai.enabled { "ai" } else { "local" });
    let api_key = resolve_api_key(cli_api_key, config);
    let analyzer = build_analyzer(analyzer_name, profile, store_path, api_key.as_deref(), config)?;

    let filler = if no_delay {
        FormFiller::instant()
    } else {
        FormFiller::default().with_cadence(TypingCadence::new(
            config.typing.min_delay_ms,
            config.typing.max_delay_ms,
        ))
    };

    let mut overlay = DebugOverlay::new();
    if config.settings.debug_mode {
        overlay.show();
    }
    let tracer = match &config.trace_file {
        Some(path) => TraceLogger::new(path),
        None => TraceLogger::disabled(),
    };
    let settle = if no_delay {
        Duration::ZERO
    } else {
        Duration::from_millis(config.settings.delay_ms)
    };

    let mut autofill = Autofill::new(filler)
        .with_tracer(tracer)
        .with_overlay(overlay)
        .with_settle_delay(settle);
    let report = autofill.run(&mut doc, analyzer.as_ref());

    println!("{}", report.status_line());
    for result in &report.results {
        let mark = match (result.success, result.skipped) {
            (true, false) => "filled ",
            (true, true) => "skipped",
            _ => "FAILED ",
        };
        match &result.error {
            Some(e) => println!("  {} {} ({})", mark, result.selector, e),
            None => println!("  {} {}", mark, result.selector),
        }
    }
    if !report.missing_required.is_empty() {
        println!("Required fields left empty: {}", report.missing_required.join(", "));
    }

    if autofill.overlay().is_visible() {
        for line in autofill.overlay().render() {
            eprintln!("{}", line);
        }
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&doc.to_snapshot())?;
        std::fs::write(path, json)?;
        info!(path, "filled page written");
    }

    Ok(report)
}

// ============================================================================
// validate subcommand
// ============================================================================

pub fn cmd_validate(profile_path: &str) -> Result<ValidationReport, Box<dyn Error>> {
    let profile = load_profile(profile_path)?;
    let report = validate_profile(&profile);

    if report.is_valid {
        println!("Profile is valid");
    } else {
        println!("Profile has {} problems:", report.errors.len());
        for error in &report.errors {
            println!("  - {}", error);
        }
    }
    Ok(report)
}

// ============================================================================
// remember / recall subcommands
// ============================================================================

pub fn cmd_remember(store_path: &str, question: &str, answer: &str) -> Result<String, Box<dyn Error>> {
    let responses = ResponseStore::new(Arc::new(JsonFileStore::open(store_path)));
    let key = responses.save_response(question, answer)?;
    println!("Saved answer for \"{}\"", key);
    Ok(key)
}

pub fn cmd_recall(store_path: &str, question: &str) -> Result<Option<String>, Box<dyn Error>> {
    let responses = ResponseStore::new(Arc::new(JsonFileStore::open(store_path)));
    match responses.find_similar_response(question)? {
        Some(found) => {
            println!(
                "{} (matched \"{}\", similarity {:.2})",
                found.response.answer, found.response.original_question, found.similarity
            );
            Ok(Some(found.response.answer))
        }
        None => {
            println!("No saved answer for \"{}\"", question);
            Ok(None)
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

pub fn load_page(path: &str) -> Result<Document, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(Document::from_json(&content)?)
}

pub fn load_profile(path: &str) -> Result<Profile, Box<dyn Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Build the FieldAnalyzer named on the command line.
fn build_analyzer(
    name: &str,
    profile: Profile,
    store_path: Option<&str>,
    api_key: Option<&str>,
    config: &AppConfig,
) -> Result<Box<dyn FieldAnalyzer>, Box<dyn Error>> {
    match name {
        "ai" => {
            let key = api_key.ok_or("AI analyzer needs an API key (--api-key, ai.api_key or MISTRAL_API_KEY)")?;
            let backend = MistralBackend::new(key)
                .with_base_url(&config.ai.base_url)
                .with_model(&config.ai.model)
                .with_timeout(Duration::from_secs(config.ai.timeout_secs));
            let recovery = ErrorRecovery::new(config.ai.max_retries, Box::new(ThreadDelay));
            Ok(Box::new(
                AiFormAnalyzer::new(Box::new(backend), profile).with_recovery(recovery),
            ))
        }
        "local" => {
            let analyzer = ProfileAnalyzer::new(profile);
            Ok(Box::new(match store_path {
                Some(path) => analyzer.with_answers(Box::new(ResponseStore::new(Arc::new(
                    JsonFileStore::open(path),
                )))),
                None => analyzer,
            }))
        }
        other => Err(format!("unknown analyzer '{}' (expected local or ai)", other).into()),
    }
}
