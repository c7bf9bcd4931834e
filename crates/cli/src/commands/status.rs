//! `stratadesk status`: Show the effective configuration.

use std::path::Path;

use stratadesk_config::AppConfig;
use stratadesk_providers::AwsAuth;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    let auth = if config.provider == "bedrock" {
        AwsAuth::resolve(config.api_key_for("bedrock")).scheme()
    } else if config.api_key_for(&config.provider).is_some() {
        "api key"
    } else {
        "none"
    };

    println!("StrataDesk Status");
    println!("=================");
    println!("  Config dir:    {}", AppConfig::config_dir().display());
    println!("  Provider:      {} ({})", config.provider, config.region);
    println!("  Credentials:   {auth}");
    println!("  Draft model:   {}", config.generation.model);
    println!(
        "  Sampling:      max_tokens={} temperature={} top_p={}",
        config.generation.max_tokens,
        config.generation.temperature,
        config
            .generation
            .top_p
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".into())
    );
    if config.judge.enabled {
        println!("  Judge model:   {}", config.judge.model);
    } else {
        println!("  Judge:         disabled (always retrieve)");
    }
    println!("  Retrieval:     {}", config.retrieval.backend);
    for source in &config.retrieval.sources {
        let store = if source.store_id.trim().is_empty() {
            "not configured"
        } else {
            source.store_id.as_str()
        };
        println!("    - {:<12} top_k={} store={store}", source.label, source.top_k);
    }
    println!(
        "  Context:       {} tokens ({} counter, {} normalization, {})",
        config.retrieval.context_token_limit,
        config.retrieval.token_counter,
        config.retrieval.score_normalization,
        if config.retrieval.concurrent { "concurrent" } else { "sequential" }
    );
    println!("  History:       last {} turns", config.prompt.history_turns);
    println!(
        "  Policy:        {}",
        if config.prompt.policy_override.is_some() { "custom" } else { "default" }
    );

    let config_file = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"));
    if config_file.exists() {
        println!("\n  ✅ Config file found: {}", config_file.display());
    } else {
        println!("\n  ⚠️  No config file — run `stratadesk onboard` first");
    }

    Ok(())
}
