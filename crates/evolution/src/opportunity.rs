//! Improvement opportunities proposed by a model during a cycle.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "high" => Some(Priority::High),
            "medium" => Some(Priority::Medium),
            "low" => Some(Priority::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    pub priority: Priority,
    pub implementation: String,
    #[serde(default)]
    pub benefits: String,
    #[serde(default)]
    pub risks: String,
}

impl Opportunity {
    /// Read one entry of a model's answer. Entries without a description or
    /// a recognisable priority are dropped.
    pub fn from_value(value: &Value) -> Option<Self> {
        let text = |key: &str| match value.get(key) {
            Some(Value::String(s)) => s.trim().to_string(),
            // Models sometimes answer with a list of points
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .collect::<Vec<_>>()
                .join("; "),
            _ => String::new(),
        };

        let description = text("description");
        if description.is_empty() {
            return None;
        }
        let priority = Priority::parse(&text("priority"))?;
        let kind = match text("type") {
            k if k.is_empty() => "feature".to_string(),
            k => k,
        };

        Some(Self {
            kind,
            description,
            priority,
            implementation: text("implementation"),
            benefits: text("benefits"),
            risks: text("risks"),
        })
    }

    /// The feature request submitted to the construction pipeline.
    pub fn candidate(&self) -> String {
        format!("{}: {} - {}", self.kind, self.description, self.implementation)
    }
}

/// Parse an extracted answer: either a bare array or an object wrapping one
/// under `opportunities`.
pub fn parse(answer: &Value) -> Vec<Opportunity> {
    let entries = match answer {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("opportunities") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return Opportunity::from_value(answer).into_iter().collect(),
        },
        _ => return Vec::new(),
    };
    entries.iter().filter_map(Opportunity::from_value).collect()
}

/// Keep high and medium priority (high first, order otherwise preserved)
/// and cap at `max`.
pub fn rank(mut opportunities: Vec<Opportunity>, max: usize) -> Vec<Opportunity> {
    opportunities.retain(|o| o.priority != Priority::Low);
    opportunities.sort_by_key(|o| o.priority);
    opportunities.truncate(max);
    opportunities
}
