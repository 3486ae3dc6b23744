//! `autoforge cycle` — Force a single evolution cycle.

use super::runtime::{Runtime, load_config};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build(load_config()?).await?;

    println!("🧬 Forcing an evolution cycle...");
    let cycle = runtime.scheduler.force_cycle_now().await?;

    println!("{}", serde_json::to_string_pretty(cycle.as_ref())?);
    println!(
        "\n✅ Cycle {} finished: {} construction(s), {} error(s)",
        cycle.id,
        cycle.records.len(),
        cycle.errors.len()
    );
    Ok(())
}
