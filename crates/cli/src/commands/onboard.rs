//! `stratadesk onboard`: First-time setup.
//!
//! Writes `config.toml` (at `--config` when given) and a sample
//! `knowledge.jsonl` beside it.

use std::path::{Path, PathBuf};

use stratadesk_config::AppConfig;
use stratadesk_knowledge::FileStore;

/// Where onboarding writes its files.
struct OnboardPaths {
    dir: PathBuf,
    config: PathBuf,
    knowledge: PathBuf,
}

impl OnboardPaths {
    fn resolve(config_path: Option<&Path>) -> Self {
        match config_path {
            Some(config) => {
                let dir = match config.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                Self {
                    knowledge: dir.join("knowledge.jsonl"),
                    config: config.to_path_buf(),
                    dir,
                }
            }
            None => Self {
                dir: AppConfig::config_dir(),
                config: AppConfig::config_dir().join("config.toml"),
                knowledge: AppConfig::default_knowledge_file(),
            },
        }
    }
}

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let paths = OnboardPaths::resolve(config_path);

    println!("StrataDesk: First-Time Setup");
    println!("============================\n");

    if !paths.dir.exists() {
        std::fs::create_dir_all(&paths.dir)?;
        println!("✅ Created config directory: {}", paths.dir.display());
    } else {
        println!("  Config directory exists: {}", paths.dir.display());
    }

    if paths.knowledge.exists() {
        println!("  Knowledge file exists: {}", paths.knowledge.display());
    } else {
        std::fs::write(&paths.knowledge, FileStore::sample_jsonl("building-a", "global"))?;
        println!("✅ Created sample knowledge file: {}", paths.knowledge.display());
    }

    if paths.config.exists() {
        println!("\n⚠️  Config already exists at: {}", paths.config.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
    } else {
        let mut config = AppConfig::default();
        config.retrieval.knowledge_file = Some(paths.knowledge.clone());
        std::fs::write(&paths.config, config.to_toml())?;
        println!("✅ Created config.toml at: {}", paths.config.display());
        println!("\n📝 Next steps:");
        println!("   1. Set AWS credentials (AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY)");
        println!("      or AWS_BEARER_TOKEN_BEDROCK");
        println!("   2. Put your knowledge base ids in [[retrieval.sources]]");
        println!("      (or set retrieval.backend = \"file\" with store ids");
        println!("       \"building-a\" and \"global\" to use the sample file)");
        if config_path.is_some() {
            println!("   3. Run: stratadesk --config {} chat --demo\n", paths.config.display());
        } else {
            println!("   3. Run: stratadesk chat --demo\n");
        }
    }

    println!("🎉 Setup complete! Run `stratadesk chat` to start drafting.\n");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_beside_the_given_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("desk").join("custom.toml");

        run(Some(&config_path)).await.unwrap();

        let knowledge = dir.path().join("desk").join("knowledge.jsonl");
        assert!(config_path.exists());
        assert!(knowledge.exists());

        let config = AppConfig::load_from(&config_path).unwrap();
        assert_eq!(config.retrieval.knowledge_file.as_deref(), Some(knowledge.as_path()));
    }

    #[tokio::test]
    async fn existing_config_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, "provider = \"anthropic\"\n").unwrap();

        run(Some(&config_path)).await.unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert_eq!(content, "provider = \"anthropic\"\n");
        assert!(dir.path().join("knowledge.jsonl").exists());
    }

    #[test]
    fn bare_file_name_resolves_to_current_dir() {
        let paths = OnboardPaths::resolve(Some(Path::new("desk.toml")));
        assert_eq!(paths.dir, PathBuf::from("."));
        assert_eq!(paths.knowledge, PathBuf::from("./knowledge.jsonl"));
    }
}
