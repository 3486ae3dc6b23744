//! `autoforge history` — Recorded construction runs.

use autoforge_core::store::{CONSTRUCTION_RECORDS, RecordFilter};

use super::runtime::{load_config, open_store};

pub async fn run(limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config);

    let records = store
        .query(CONSTRUCTION_RECORDS, &RecordFilter::all().newest(limit))
        .await?;

    if records.is_empty() {
        println!("No construction records yet.");
        return Ok(());
    }

    println!("📜 Construction history ({} shown)", records.len());
    println!("================================");
    for record in records.iter().rev() {
        let text = |key: &str| record[key].as_str().unwrap_or("?").to_string();
        let flag = if record["success"].as_bool().unwrap_or(false) {
            "✅"
        } else if record["action_required"].as_bool().unwrap_or(false) {
            "🔑"
        } else {
            "❌"
        };
        println!(
            "{flag} {}  {:<8}  {}",
            text("timestamp"),
            text("outcome"),
            record["request"]["text"].as_str().unwrap_or("?")
        );
    }

    Ok(())
}
