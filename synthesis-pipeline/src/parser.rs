//! Converts raw model output into ordered checklist steps.
//!
//! Two dialects are supported: a strict JSON object and a Markdown list.
//! JSON is attempted first; Markdown is the fallback. Neither producing
//! steps is the caller's problem (it synthesizes a fallback step).

use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use common::types::checklist::{ChecklistStep, StepPriority};

/// What could be recovered from a model response.
#[derive(Debug, Clone, Default)]
pub struct ParsedResponse {
    pub summary: Option<String>,
    pub steps: Vec<ChecklistStep>,
}

#[derive(Debug, Deserialize)]
struct LlmChecklistResponse {
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    steps: Vec<LlmStep>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmStep {
    #[serde(default)]
    order: Option<u32>,
    instruction: String,
    #[serde(default)]
    rationale: Option<String>,
    #[serde(default)]
    current_value: Option<String>,
    #[serde(default)]
    expected_value: Option<String>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    commands: Vec<String>,
}

pub fn parse_response(response: &str) -> ParsedResponse {
    if let Some(parsed) = try_parse_json(response) {
        return parsed;
    }
    parse_markdown(response)
}

fn try_parse_json(response: &str) -> Option<ParsedResponse> {
    let candidate = json_candidate(response)?;
    let parsed: LlmChecklistResponse = serde_json::from_str(candidate).ok()?;

    let steps: Vec<ChecklistStep> = parsed
        .steps
        .into_iter()
        .filter(|step| !step.instruction.trim().is_empty())
        .enumerate()
        .map(|(index, step)| ChecklistStep {
            order: step.order.unwrap_or(index as u32 + 1),
            instruction: step.instruction.trim().to_string(),
            rationale: step.rationale.filter(|r| !r.trim().is_empty()),
            current_value: step.current_value,
            expected_value: step.expected_value,
            priority: step
                .priority
                .as_deref()
                .and_then(parse_priority)
                .unwrap_or_default(),
            commands: step.commands,
        })
        .collect();

    if steps.is_empty() {
        return None;
    }

    Some(ParsedResponse {
        summary: parsed.summary.filter(|s| !s.trim().is_empty()),
        steps,
    })
}

/// The JSON text to attempt: the whole trimmed response when it looks like an
/// object, otherwise the interior of the first fenced block.
fn json_candidate(response: &str) -> Option<&str> {
    let trimmed = response.trim();
    if trimmed.starts_with('{') {
        return Some(trimmed);
    }

    let after_open = trimmed.split_once("```")?.1;
    let inner = after_open.split_once("```")?.0;
    let inner = inner.strip_prefix("json").unwrap_or(inner).trim();
    inner.starts_with('{').then_some(inner)
}

fn parse_priority(value: &str) -> Option<StepPriority> {
    match value.trim().to_uppercase().as_str() {
        "HIGH" => Some(StepPriority::High),
        "MEDIUM" => Some(StepPriority::Medium),
        "LOW" => Some(StepPriority::Low),
        _ => None,
    }
}

fn step_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^\s*(?:step\s+\d+\s*:\s*|\d+\.\s+|[-*]\s+)(.+)$")
            .unwrap_or_else(|e| unreachable!("step pattern is a valid regex: {e}"))
    })
}

fn parse_markdown(response: &str) -> ParsedResponse {
    let mut steps = Vec::new();

    for line in response.lines() {
        if let Some(captures) = step_pattern().captures(line) {
            let instruction = captures
                .get(1)
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default();
            if instruction.is_empty() {
                continue;
            }

            let lowered = instruction.to_lowercase();
            let priority = if lowered.contains("urgent") || lowered.contains("critical") {
                StepPriority::High
            } else {
                StepPriority::Medium
            };

            let order = steps.len() as u32 + 1;
            steps.push(ChecklistStep::new(order, instruction).with_priority(priority));
        }
    }

    ParsedResponse {
        summary: None,
        steps,
    }
}
