//! `autoforge evolve` — Run the evolution scheduler until Ctrl-C.

use autoforge_core::event::DomainEvent;
use tracing::info;

use super::runtime::{Runtime, load_config};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::build(load_config()?).await?;
    let evolution = &runtime.config.evolution;

    if !evolution.enabled {
        println!("⚠️  Evolution is disabled; set [evolution] enabled = true to run it.");
        return Ok(());
    }

    println!("🧬 Autoforge Evolution — Starting scheduler");
    println!("   Interval:    {}s", evolution.interval_secs);
    println!("   Daily cap:   {}", evolution.max_daily_cycles);
    println!("   Topics:      {}", evolution.topics.join(", "));

    let mut events = runtime.events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event.as_ref() {
                DomainEvent::CycleCompleted {
                    cycle_id,
                    records,
                    errors,
                    ..
                } => println!("✅ Cycle {cycle_id}: {records} construction(s), {errors} error(s)"),
                DomainEvent::RunRecorded {
                    run_id,
                    outcome,
                    success,
                    ..
                } => println!("   Run {run_id}: {outcome:?} (success: {success})"),
                _ => {}
            }
        }
    });

    runtime.scheduler.start()?;
    info!("Evolution scheduler running, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    println!("\n🛑 Stopping scheduler (a running cycle finishes first)...");
    runtime.scheduler.stop().await;

    Ok(())
}
