//! Maps raw extraction output onto [`IntelligenceReport`].
//!
//! Model output is untrusted. Text that is not a JSON object yields the
//! fallback report; an object is read field by field with explicit
//! defaults, so a missing or mistyped field never discards the rest. Every
//! configured category is present in the result, and only configured
//! categories are kept. Category values are not checked against the
//! transcript or rewritten.

use serde_json::{Map, Value};

use lure_types::intelligence::{
    CategorySet, ExtractedIntelligence, IntelligenceReport, ThreatLevel,
};

/// Parse one extraction response.
pub fn parse_report(raw: &str, categories: &CategorySet) -> IntelligenceReport {
    let text = strip_code_fence(raw);

    let object = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => object,
        Ok(other) => {
            tracing::warn!(kind = json_kind(&other), "extraction output is not a JSON object; using fallback report");
            return IntelligenceReport::fallback(categories);
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                content_preview = preview(text),
                "failed to parse extraction JSON; using fallback report"
            );
            return IntelligenceReport::fallback(categories);
        }
    };

    let extracted_data = match object.get("extractedData") {
        Some(Value::Object(data)) => read_categories(data, categories),
        Some(other) => {
            tracing::warn!(kind = json_kind(other), "extractedData is not an object; substituting empty categories");
            ExtractedIntelligence::empty(categories)
        }
        None => {
            tracing::debug!("extractedData missing; substituting empty categories");
            ExtractedIntelligence::empty(categories)
        }
    };

    IntelligenceReport {
        is_scam: read_bool(object.get("isScam")),
        scam_type: read_string(object.get("scamType")),
        threat_level: read_threat_level(object.get("threatLevel")),
        confidence: read_confidence(object.get("confidence")),
        extracted_data,
        indicators: read_list(object.get("indicators")),
        summary: read_string(object.get("summary")).unwrap_or_default(),
        agent_notes: read_string(object.get("agentNotes")).unwrap_or_default(),
    }
}

/// Unwrap a Markdown code fence around the payload, if present.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn read_categories(data: &Map<String, Value>, categories: &CategorySet) -> ExtractedIntelligence {
    let mut out = ExtractedIntelligence::empty(categories);
    for key in categories.iter() {
        out.insert(key, read_list(data.get(key)));
    }
    let ignored: Vec<&str> = data
        .keys()
        .map(String::as_str)
        .filter(|k| !categories.contains(k))
        .collect();
    if !ignored.is_empty() {
        tracing::debug!(?ignored, "ignoring unconfigured extraction categories");
    }
    out
}

fn read_bool(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Non-blank string, trimmed. Numbers are rendered; everything else is absent.
fn read_string(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn read_threat_level(value: Option<&Value>) -> ThreatLevel {
    match value {
        Some(Value::String(s)) => s.parse().unwrap_or_else(|e| {
            tracing::debug!(error = %e, "unrecognized threat level; defaulting to low");
            ThreatLevel::Low
        }),
        _ => ThreatLevel::Low,
    }
}

fn read_confidence(value: Option<&Value>) -> u8 {
    let number = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    };
    match number {
        Some(n) if n.is_finite() => n.round().clamp(0.0, 100.0) as u8,
        _ => 0,
    }
}

/// A list of strings, kept as the model returned them. A lone string is
/// taken as a one-element list, numbers are rendered, and nulls and nested
/// values are skipped.
fn read_list(value: Option<&Value>) -> Vec<String> {
    let items: Vec<&Value> = match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) if single.is_string() || single.is_number() => vec![single],
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
