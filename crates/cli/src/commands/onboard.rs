//! `autoforge onboard` — First-time setup.

use autoforge_config::AppConfig;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");
    let workspace_dir = AppConfig::workspace_dir();

    println!("⚒️  Autoforge — First-Time Setup");
    println!("===============================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if !workspace_dir.exists() {
        std::fs::create_dir_all(&workspace_dir)?;
        println!("✅ Created workspace directory: {}", workspace_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("✅ Created config.toml at: {}", config_path.display());
        println!("\n📝 Next steps:");
        println!("   1. Add an API key under [providers.<id>] or export OPENAI_API_KEY,");
        println!("      GOOGLE_API_KEY or GROQ_API_KEY (or run Ollama locally)");
        println!("   2. Run: autoforge construct \"Add input validation helper\"");
        println!("   3. Set [evolution] enabled = true and run `autoforge evolve`\n");
    }

    println!("🎉 Setup complete!\n");

    Ok(())
}
