//! Prompt scaffolding that asks a backend for bare JSON.

use serde_json::{Value, json};

/// Wrap `instruction` with the "JSON only" contract and, if given, the
/// expected structure.
pub fn json_prompt(instruction: &str, schema: Option<&Value>) -> String {
    let mut prompt = format!(
        "{instruction}\n\n\
         IMPORTANT: Respond ONLY with valid JSON. No extra text, no markdown, no explanation.\n\
         Do not wrap the answer in ```json or any other code fence.\n\
         Respond directly with the JSON value.\n"
    );

    if let Some(schema) = schema {
        let rendered = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
        prompt.push_str("\nExpected structure:\n");
        prompt.push_str(&rendered);
    }

    prompt
}

/// Shape of the Architect's answer.
pub fn architecture_schema() -> Value {
    json!({
        "overview": "string",
        "components": ["list", "of", "components"],
        "dependencies": ["list", "of", "dependencies"],
        "files_to_create": ["list", "of", "file", "paths"],
        "files_to_modify": ["list", "of", "file", "paths"],
        "database_changes": ["list", "of", "changes"],
        "api_endpoints": ["list", "of", "endpoints"],
        "testing_strategy": "string",
        "deployment_steps": ["list", "of", "steps"]
    })
}

/// Shape of the Coder's answer.
pub fn code_schema() -> Value {
    json!({
        "files": {"file_path": "file_content"},
        "installation_commands": ["list", "of", "commands"],
        "setup_instructions": ["list", "of", "instructions"]
    })
}

/// Shape of the Reviewer's answer.
pub fn review_schema() -> Value {
    json!({
        "approved": "boolean",
        "score": "number (0-10)",
        "strengths": ["list", "of", "strengths"],
        "issues": ["list", "of", "issues"],
        "suggestions": ["list", "of", "suggestions"],
        "security_check": "string",
        "performance_check": "string",
        "compatibility_check": "string"
    })
}

/// Shape of the scheduler's opportunity ranking.
pub fn opportunities_schema() -> Value {
    json!([{
        "type": "feature|optimization|update|integration",
        "description": "string",
        "priority": "high|medium|low",
        "implementation": "string",
        "benefits": "string",
        "risks": "string"
    }])
}
