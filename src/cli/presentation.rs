//! CLI presentation: text and json formatters per command.

use crate::cli::parse::OutputFormat;
use crate::error::{ApiError, ConfigurationError, StorageError};
use crate::fact::{FactResult, FactValue};
use crate::flow::{ChecklistItem, NextKind, NextScreen, RouteLocation};
use crate::graph::SaveOutcome;
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::Encoding(e.to_string())))
}

/// Section heading with bold/underline
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

pub fn format_fact(
    path: &str,
    result: &FactResult<FactValue>,
    format: OutputFormat,
) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(&json!({ "path": path, "result": result }));
    }
    Ok(match result {
        FactResult::Complete(value) => format!("{} = {}", path, value),
        FactResult::Placeholder(value) => format!("{} = {} (placeholder)", path, value),
        FactResult::Incomplete => format!("{} is incomplete", path),
    })
}

/// Outcome of a command that saved the graph
pub fn format_save_outcome(
    action: &str,
    outcome: &SaveOutcome,
    format: OutputFormat,
) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(&json!({ "action": action, "outcome": outcome }));
    }
    if outcome.valid {
        return Ok(format!("{}: saved", action));
    }
    let mut s = format!(
        "{}: not saved, {} limit violation(s):",
        action,
        outcome.limit_violations.len()
    );
    for violation in &outcome.limit_violations {
        s.push_str(&format!("\n  - {}", violation));
    }
    Ok(s)
}

pub fn format_validate_result(
    findings: &[ConfigurationError],
    screens: usize,
    facts: usize,
    format: OutputFormat,
) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        let errors: Vec<String> = findings.iter().map(|f| f.to_string()).collect();
        return to_json(&json!({
            "valid": findings.is_empty(),
            "screens": screens,
            "facts": facts,
            "errors": errors,
        }));
    }
    if findings.is_empty() {
        return Ok(format!(
            "Validation passed:\n  Screens: {}\n  Facts: {}\n  All checks passed",
            screens, facts
        ));
    }
    let mut s = format!(
        "Validation completed with issues:\n  Screens: {}\n  Facts: {}\n\nErrors ({}):",
        screens,
        facts,
        findings.len()
    );
    for finding in findings {
        s.push_str(&format!("\n  - {}", finding));
    }
    Ok(s)
}

pub fn format_next_screen(next: &NextScreen, format: OutputFormat) -> Result<String, ApiError> {
    let location = RouteLocation::from(next).to_string();
    if format == OutputFormat::Json {
        return to_json(&json!({
            "location": location,
            "route": next.route,
            "collectionId": next.collection_id,
            "kind": next.kind,
        }));
    }
    Ok(match next.kind {
        NextKind::Screen => location,
        NextKind::Knockout => format!("{} (knockout)", location),
        NextKind::Terminal => format!("{} (end of flow)", location),
    })
}

pub fn format_checklist(items: &[ChecklistItem], format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(&json!({
            "subcategories": items,
            "complete": items.iter().filter(|i| i.complete).count(),
            "total": items.len(),
        }));
    }
    let mut out = format!("{}\n\n", format_section_heading("Checklist"));
    if items.is_empty() {
        out.push_str("No subcategories in flow.\n");
        return Ok(out);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Category", "Subcategory", "Available", "Complete"]);
    for item in items {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        table.add_row(vec![
            item.category.as_str(),
            item.route.as_str(),
            yes_no(item.available),
            yes_no(item.complete),
        ]);
    }
    out.push_str(&format!("{}\n", table));
    out.push_str(&format!(
        "\n{} of {} complete",
        items.iter().filter(|i| i.complete).count(),
        items.len()
    ));
    Ok(out)
}

pub fn format_return_list(ids: &[String], format: OutputFormat) -> Result<String, ApiError> {
    if format == OutputFormat::Json {
        return to_json(&json!({ "returns": ids, "total": ids.len() }));
    }
    if ids.is_empty() {
        return Ok("No stored returns.".to_string());
    }
    let mut lines: Vec<String> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| format!("  {}. {}", i + 1, id))
        .collect();
    lines.insert(0, "Stored returns:".to_string());
    Ok(lines.join("\n"))
}

pub fn format_message(message: &str, format: OutputFormat) -> Result<String, ApiError> {
    match format {
        OutputFormat::Json => to_json(&json!({ "message": message })),
        OutputFormat::Text => Ok(message.to_string()),
    }
}
