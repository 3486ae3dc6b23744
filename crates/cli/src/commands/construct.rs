//! `autoforge construct` — One pipeline run.

use autoforge_core::record::{ConstructionRecord, Outcome};

use super::runtime::{Runtime, load_config};

pub async fn run(request: &str) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build(load_config()?).await?;

    let record = runtime.pipeline.auto_construct(request).await;

    println!("{}", serde_json::to_string_pretty(&record)?);
    eprintln!("\n{}", summary(&record));
    Ok(())
}

fn summary(record: &ConstructionRecord) -> String {
    match record.outcome {
        Outcome::Deployed if record.success => {
            let files = record.deployment.as_ref().map_or(0, |d| d.files_written.len());
            format!("✅ Deployed {files} file(s)")
        }
        Outcome::Deployed => "⚠️  Deployed with failures (see deployment)".to_string(),
        Outcome::Rejected => format!("❌ Rejected: {}", record.rejection_reasons.join("; ")),
        Outcome::Aborted if record.action_required => format!(
            "🔑 Aborted, action required (check credentials/permissions): {}",
            record.error.as_deref().unwrap_or_default()
        ),
        Outcome::Aborted => format!("💥 Aborted: {}", record.error.as_deref().unwrap_or_default()),
    }
}
