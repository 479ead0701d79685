use anyhow::Result;
use partdb_embed::{config, Config};

/// Show the current effective configuration.
pub fn show_config(config: &Config) -> Result<()> {
    println!("Current Configuration");
    println!("=====================\n");

    println!("Config file: {}", config::config_file_path().display());

    let exists = config::config_file_path().exists();
    println!("File exists: {}\n", if exists { "yes" } else { "no (using defaults)" });

    let api_key = config.api_key();
    println!("Settings:");
    println!("  database_path: {}", config.database_path.display());
    println!("  provider: {:?}", config.provider);
    println!(
        "  openai_api_key: {}",
        api_key.as_deref().map_or_else(|| "<not set>".to_string(), mask_key)
    );
    println!("  openai_base_url: {}", config.openai_base_url);
    println!("  embedding_model: {}", config.embedding_model);
    println!("  embedding_dimensions: {}", config.embedding_dimensions);
    println!("  batch_size: {}", config.batch_size);
    println!("  requests_per_second: {}", config.requests_per_second);
    println!("  search_limit: {}", config.search_limit);
    println!("  log_level: {}", config.log_level);

    println!("\nPriority: CLI args > ENV vars (PARTDB_*) > Config file > Defaults");

    Ok(())
}

/// Show the config file path.
pub fn show_path() -> Result<()> {
    println!("{}", config::config_file_path().display());
    Ok(())
}

/// Show example configuration.
pub fn show_example() -> Result<()> {
    print!("{}", config::example_config());
    Ok(())
}

/// Initialize config file with defaults.
pub fn init_config() -> Result<()> {
    let created = config::ensure_config_file()?;
    let config_path = config::config_file_path();

    if created {
        println!("✓ Created config file: {}", config_path.display());
        println!("\nEdit this file to configure partdb.");
    } else {
        println!("Config file already exists: {}", config_path.display());
    }

    Ok(())
}

/// Keep the first and last four characters of a secret.
fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-abcdefghijkl"), "sk-a...ijkl");
        assert_eq!(mask_key("short"), "*****");
    }
}
