//! `ragline init`: Print or write the default configuration.

use ragline_config::AppConfig;

pub async fn run(write: bool) -> Result<(), Box<dyn std::error::Error>> {
    let toml = AppConfig::default_toml();
    if !write {
        print!("{toml}");
        return Ok(());
    }

    let config_dir = AppConfig::config_dir();
    let config_path = config_dir.join("config.toml");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("Created config directory: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("Config already exists: {}", config_path.display());
    } else {
        std::fs::write(&config_path, toml)?;
        println!("Created {}", config_path.display());
    }

    println!();
    println!("Next steps:");
    println!("   1. Set GEMINI_API_KEY (or switch generation.provider)");
    println!("   2. Put .md/.txt documents in the corpus directory");
    println!("   3. Run: ragline serve");

    Ok(())
}
