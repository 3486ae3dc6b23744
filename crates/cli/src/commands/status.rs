//! `autoforge status` — Configuration and scheduler state.

use autoforge_config::AppConfig;
use autoforge_core::record::EvolutionCycle;
use autoforge_core::store::{CONSTRUCTION_RECORDS, EVOLUTION_CYCLES, RecordFilter};
use autoforge_evolution::CycleGate;
use autoforge_providers::build_from_config;
use chrono::Utc;

use super::runtime::{load_config, open_store};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let store = open_store(&config);

    println!("⚒️  Autoforge Status");
    println!("===================");
    println!("  Config dir:   {}", AppConfig::config_dir().display());
    println!("  Workspace:    {}", config.pipeline.workspace_root.display());
    println!("  Records:      {}", config.store.dir.display());
    println!("  Provider:     {}", config.router.default_provider);
    println!("  Local:        {}", config.router.local_provider);
    println!(
        "  Search:       {}",
        config.search.endpoint.as_deref().unwrap_or("disabled")
    );
    println!("  Commit:       {}", if config.pipeline.commit { "enabled" } else { "disabled" });

    match build_from_config(&config) {
        Ok(router) => println!("  Terminal:     {}", router.terminal()),
        Err(e) => println!("  Terminal:     ⚠️  {e}"),
    }

    let records = store.query(CONSTRUCTION_RECORDS, &RecordFilter::all()).await?;
    let deployed = records
        .iter()
        .filter(|r| r["success"].as_bool().unwrap_or(false))
        .count();
    println!("\n  Constructions: {} recorded, {deployed} successful", records.len());

    let cycles: Vec<EvolutionCycle> = store
        .query(EVOLUTION_CYCLES, &RecordFilter::all())
        .await?
        .into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect();
    let starts: Vec<_> = cycles.iter().map(|c| c.timestamp).collect();
    let gate = CycleGate::new(config.evolution.max_daily_cycles, config.evolution.interval());

    println!(
        "  Evolution:     {} ({} cycles total)",
        if config.evolution.enabled { "enabled" } else { "disabled" },
        cycles.len()
    );
    if let Some(last) = cycles.last() {
        println!(
            "  Last cycle:    {} ({} construction(s), {} error(s))",
            last.timestamp.to_rfc3339(),
            last.records.len(),
            last.errors.len()
        );
    }
    if let Some(wait) = gate.next_admission(Utc::now(), &starts) {
        println!("  Next cycle in: {}s", wait.as_secs());
    }

    let config_path = AppConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file — run `autoforge onboard` first");
    }

    Ok(())
}
