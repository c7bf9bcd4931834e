//! `stratadesk chat`: Interactive, single-message, or demo drafting.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use stratadesk_agent::retrieval::SourceStatus;
use stratadesk_agent::{Conversation, DraftOutcome, DraftPipeline, demo_conversation};
use stratadesk_config::AppConfig;
use stratadesk_providers::AwsCredentials;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::warn;

pub async fn run(
    config_path: Option<&Path>,
    message: Option<String>,
    demo: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    if !has_credentials(&config) {
        eprintln!();
        eprintln!("  ERROR: No credentials configured for '{}'!", config.provider);
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    AWS_ACCESS_KEY_ID + AWS_SECRET_ACCESS_KEY   (Bedrock, SigV4)");
        eprintln!("    AWS_BEARER_TOKEN_BEDROCK                    (Bedrock API key)");
        eprintln!("    ANTHROPIC_API_KEY                           (provider = \"anthropic\")");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No credentials found. See above for setup instructions.".into());
    }

    let router = stratadesk_providers::router::build_from_config(&config);
    let provider = router.default().ok_or_else(|| {
        format!(
            "Unknown provider '{}' (available: {})",
            config.provider,
            router.list().join(", ")
        )
    })?;
    let store = stratadesk_knowledge::build_from_config(&config)?;
    let pipeline = Arc::new(DraftPipeline::from_config(&config, provider, store)?);

    if demo {
        let (history, query) = demo_conversation();
        let mut conversation = Conversation::with_history(pipeline, history);
        println!("\n  Demo history:");
        for turn in conversation.history().turns() {
            println!("    {}", turn.transcript_line());
        }
        println!("\n  Client > {query}");
        let outcome = conversation.submit(query).await;
        print!("{}", render_outcome(&outcome));
        return Ok(());
    }

    let mut conversation = Conversation::new(pipeline);

    if let Some(msg) = message {
        eprint!("  Drafting...");
        let outcome = conversation.submit(&msg).await;
        eprint!("\r             \r");
        print!("{}", render_outcome(&outcome));
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        StrataDesk — Interactive Drafting     ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {} ({})", config.provider, config.region);
    println!("  Model:     {}", config.generation.model);
    println!(
        "  Judge:     {}",
        if config.judge.enabled { config.judge.model.as_str() } else { "disabled" }
    );
    println!("  Sources:   {}", config.retrieval.sources.len());
    println!();
    println!("  Type the client's message and press Enter.");
    println!("  Type 'exit' or 'quit' (or Ctrl+D) to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut read_errors = 0;
    loop {
        print!("  Client > ");
        std::io::stdout().flush()?;

        match read_input(&mut lines, &mut read_errors).await {
            Input::Query(query) => {
                let outcome = conversation.submit(&query).await;
                print!("{}", render_outcome(&outcome));
            }
            Input::Skip => {}
            Input::Quit => break,
        }
    }

    println!("\n  Session ended after {} turns.", conversation.history().len());
    Ok(())
}

/// Consecutive unreadable lines before the session gives up on stdin.
const MAX_READ_ERRORS: u32 = 5;

#[derive(Debug, PartialEq, Eq)]
enum Input {
    Query(String),
    Skip,
    Quit,
}

/// Read one line. Blank and unreadable lines are skipped; EOF, `exit` and
/// `quit` end the session.
async fn read_input<R>(lines: &mut Lines<R>, read_errors: &mut u32) -> Input
where
    R: AsyncBufRead + Unpin,
{
    match lines.next_line().await {
        Ok(None) => Input::Quit,
        Ok(Some(line)) => {
            *read_errors = 0;
            match line.trim() {
                "" => Input::Skip,
                "exit" | "quit" => Input::Quit,
                query => Input::Query(query.to_string()),
            }
        }
        Err(e) => {
            *read_errors += 1;
            if *read_errors >= MAX_READ_ERRORS {
                warn!(error = %e, "Input keeps failing, ending session");
                Input::Quit
            } else {
                warn!(error = %e, "Could not read input line, skipping it");
                Input::Skip
            }
        }
    }
}

fn has_credentials(config: &AppConfig) -> bool {
    match config.provider.as_str() {
        "bedrock" => {
            AwsCredentials::from_env().is_some() || config.api_key_for("bedrock").is_some()
        }
        other => config.api_key_for(other).is_some(),
    }
}

/// Human-readable report of one drafting pass.
fn render_outcome(outcome: &DraftOutcome) -> String {
    let mut out = String::new();
    out.push_str(&format!("\n  Retrieval needed: {}\n", outcome.judge.summary()));

    if let Some(fanout) = &outcome.retrieval {
        for report in &fanout.reports {
            let status = match &report.status {
                SourceStatus::Retrieved { passages } => format!("{passages} passage(s)"),
                SourceStatus::NotConfigured => "not configured".to_string(),
                SourceStatus::Failed(e) => format!("failed: {e}"),
            };
            out.push_str(&format!("    {}: {status}\n", report.label));
        }
        for entry in &outcome.context.included {
            out.push_str(&format!(
                "    + {} (score {:.3}, ~{} tokens)\n",
                entry.source_label, entry.relevance_score, entry.tokens
            ));
        }
        for entry in &outcome.context.dropped {
            out.push_str(&format!("    - {} (over budget)\n", entry.source_label));
        }
        out.push_str(&format!(
            "  Context: ~{} / {} tokens\n",
            outcome.context.total_tokens, outcome.context.budget
        ));
    }

    out.push_str(&format!(
        "\n  ======== DRAFT RESPONSE (generated in {:.2}s) ========\n",
        outcome.generation_time.as_secs_f64()
    ));
    out.push_str(&outcome.response.to_string());
    out.push_str("\n  =====================================================\n\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn inputs(bytes: &'static [u8]) -> Vec<Input> {
        let mut lines = BufReader::new(bytes).lines();
        let mut read_errors = 0;
        let mut seen = Vec::new();
        loop {
            let input = read_input(&mut lines, &mut read_errors).await;
            let done = input == Input::Quit;
            seen.push(input);
            if done {
                return seen;
            }
        }
    }

    #[tokio::test]
    async fn blank_lines_are_skipped_and_quit_ends() {
        let seen = inputs(b"\n  When is the AGM?  \nquit\nnever read\n").await;
        assert_eq!(
            seen,
            vec![
                Input::Skip,
                Input::Query("When is the AGM?".into()),
                Input::Quit
            ]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_line_does_not_end_the_session() {
        let seen = inputs(b"\xff\xfe\nWhere can visitors park?\n").await;
        assert_eq!(
            seen,
            vec![
                Input::Skip,
                Input::Query("Where can visitors park?".into()),
                Input::Quit
            ]
        );
    }

    #[test]
    fn vendor_key_does_not_satisfy_the_other_provider() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| (key == "ANTHROPIC_API_KEY").then(|| "sk-ant".to_string()))
            .unwrap();
        if AwsCredentials::from_env().is_none() {
            assert!(!has_credentials(&config));
        }
        config.provider = "anthropic".into();
        assert!(has_credentials(&config));
    }
}
