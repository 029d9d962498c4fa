use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priority attached to a checklist step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepPriority {
    High,
    Medium,
    Low,
}

impl Default for StepPriority {
    fn default() -> Self {
        StepPriority::Medium
    }
}

/// One ordered, actionable step of a troubleshooting checklist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChecklistStep {
    pub order: u32,
    pub instruction: String,
    #[serde(default)]
    pub rationale: Option<String>,
    #[serde(default)]
    pub current_value: Option<String>,
    #[serde(default)]
    pub expected_value: Option<String>,
    #[serde(default)]
    pub priority: StepPriority,
    #[serde(default)]
    pub commands: Vec<String>,
}

impl ChecklistStep {
    pub fn new(order: u32, instruction: String) -> Self {
        Self {
            order,
            instruction,
            rationale: None,
            current_value: None,
            expected_value: None,
            priority: StepPriority::default(),
            commands: Vec::new(),
        }
    }

    pub fn with_priority(mut self, priority: StepPriority) -> Self {
        self.priority = priority;
        self
    }
}

/// The synthesized checklist returned to the caller and fanned out to sinks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicChecklist {
    pub alert_id: String,
    pub summary: String,
    pub steps: Vec<ChecklistStep>,
    /// Distinct origin paths of the chunks cited, in order of first appearance.
    pub source_runbooks: Vec<String>,
    pub generated_at: DateTime<Utc>,
    pub llm_provider_id: String,
}
