//! Architect — turns a feature request into an [`Architecture`].

use autoforge_core::error::ProviderError;
use autoforge_core::record::{Architecture, FeatureRequest};
use autoforge_extract::json_prompt;
use autoforge_extract::prompt::architecture_schema;
use tracing::info;

use crate::stage::StageContext;

const SEARCH_RESULTS: usize = 3;

fn instruction(feature: &str, research: &str) -> String {
    let research = if research.is_empty() { "(none)" } else { research };
    format!(
        "You are the Architect of an autonomous software construction system.\n\n\
         Requirement: {feature}\n\n\
         Research from the web:\n{research}\n\n\
         Design a detailed, minimal architecture that satisfies the requirement."
    )
}

/// Plan `request`. Unusable model output yields the minimal architecture
/// naming the request; only backend failures are errors.
pub async fn plan(ctx: &StageContext, request: &FeatureRequest) -> Result<Architecture, ProviderError> {
    let feature = request.text.as_str();
    let research = ctx
        .search_context(&format!("{feature} implementation architecture"), SEARCH_RESULTS)
        .await;

    let schema = architecture_schema();
    let prompt = json_prompt(&instruction(feature, &research), Some(&schema));
    let raw = ctx.router.route(&prompt, feature).await?;

    let mut architecture =
        ctx.extractor
            .safe_extract_for("architect", &raw, Architecture::minimal(feature));
    if architecture.overview.trim().is_empty() {
        architecture.overview = Architecture::minimal(feature).overview;
    }

    info!(
        components = architecture.components.len(),
        files = architecture.files_to_create.len(),
        "Architecture planned"
    );
    Ok(architecture)
}
