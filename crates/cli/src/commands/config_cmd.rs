//! `zeroloop config`: Configuration management commands.

use zeroloop_config::{AppConfig, MemoryBackendKind};

pub async fn validate() -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ok  Config parsed successfully");

            let mut warnings = Vec::new();

            if config.api_key_for(&config.chat_model).is_none() {
                warnings.push("No API key set (set ZEROLOOP_API_KEY or OPENAI_API_KEY)");
            }
            if config.rate_limit.requests == 0
                && config.rate_limit.input_tokens == 0
                && config.rate_limit.output_tokens == 0
            {
                warnings.push("Rate limiting is disabled");
            }
            if config.memory.backend == MemoryBackendKind::None && config.agent.auto_memory_count > 0 {
                warnings.push("auto_memory_count is set but no memory backend is configured");
            }

            if warnings.is_empty() {
                println!("   ok  All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   !!  {w}");
                }
            }

            println!();
            println!("   Chat model:     {} ({})", config.chat_model.model, config.chat_model.base_url);
            println!("   Utility model:  {} ({})", config.utility_model.model, config.utility_model.base_url);
            println!(
                "   History:        max {} (keep {} + {})",
                config.agent.msgs_keep_max, config.agent.msgs_keep_start, config.agent.msgs_keep_end
            );
            println!(
                "   Rate limit:     {} calls / {} in / {} out per {}s",
                config.rate_limit.requests,
                config.rate_limit.input_tokens,
                config.rate_limit.output_tokens,
                config.rate_limit.seconds
            );
            println!("   Memory:         {:?}", config.memory.backend);
        }
        Err(e) => {
            println!("   !!  Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    // Never echo secrets.
    if config.api_key.is_some() {
        config.api_key = Some("[REDACTED]".into());
    }
    for model in [&mut config.chat_model, &mut config.utility_model] {
        if model.api_key.is_some() {
            model.api_key = Some("[REDACTED]".into());
        }
    }
    println!("{}", config.to_toml());
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
