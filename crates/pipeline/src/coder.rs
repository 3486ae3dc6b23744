//! Coder — turns an [`Architecture`] into a [`CodeBundle`].

use autoforge_core::error::ProviderError;
use autoforge_core::record::{Architecture, CodeBundle, FeatureRequest};
use autoforge_extract::json_prompt;
use autoforge_extract::prompt::code_schema;
use tracing::info;

use crate::stage::StageContext;

const SEARCH_RESULTS: usize = 3;

fn instruction(architecture: &Architecture, examples: &str) -> String {
    let plan = serde_json::to_string_pretty(architecture).unwrap_or_default();
    let examples = if examples.is_empty() { "(none)" } else { examples };
    format!(
        "You are the Coder of an autonomous software construction system.\n\n\
         Architecture:\n{plan}\n\n\
         Code examples found:\n{examples}\n\n\
         Implement the complete code following the architecture. Make sure the code:\n\
         1. Is documented\n\
         2. Handles errors\n\
         3. Fits the existing project structure\n\
         Use paths relative to the project root."
    )
}

/// Implement `architecture`. Unusable model output yields an empty bundle.
pub async fn implement(
    ctx: &StageContext,
    request: &FeatureRequest,
    architecture: &Architecture,
) -> Result<CodeBundle, ProviderError> {
    let stack = architecture.dependencies.join(" ");
    let query = format!("{stack} {} code example", architecture.overview);
    let examples = ctx.search_context(query.trim(), SEARCH_RESULTS).await;

    let schema = code_schema();
    let prompt = json_prompt(&instruction(architecture, &examples), Some(&schema));
    let routing_context = format!("{}\nImplement {}", request.text, architecture.overview);
    let raw = ctx.router.route(&prompt, &routing_context).await?;

    let code = ctx
        .extractor
        .safe_extract_for("coder", &raw, CodeBundle::default());

    info!(
        files = code.files.len(),
        install_commands = code.install_commands.len(),
        "Code implemented"
    );
    Ok(code)
}
