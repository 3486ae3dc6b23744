//! `autoforge providers` — Backend profiles and routing preview.

use autoforge_providers::build_from_config;

use super::runtime::load_config;

/// Sample contexts that exercise each routing rule.
const PREVIEW: &[&str] = &[
    "Urgent: fix the failing deploy",
    "Routine cleanup of old logs",
    "Add input validation helper",
];

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let router = build_from_config(&config)?;

    println!("🤖 Model Backends");
    println!("=================");
    println!();
    println!("  {:<12} {:>8}  {:<11} {:<6}", "Provider", "Priority", "Credentials", "Usable");
    for profile in router.profiles() {
        let credentials = if profile.is_local {
            "local"
        } else if profile.has_credentials {
            "yes"
        } else {
            "missing"
        };
        println!(
            "  {:<12} {:>8}  {:<11} {:<6}",
            profile.id,
            profile.priority,
            credentials,
            if profile.is_usable() { "✅" } else { "—" }
        );
    }

    println!();
    println!("  Default:  {}", config.router.default_provider);
    println!("  Terminal: {} (fallback target)", router.terminal());
    println!();
    println!("  Routing preview:");
    for context in PREVIEW {
        println!("    {:<40} → {}", context, router.select(context));
    }

    Ok(())
}
