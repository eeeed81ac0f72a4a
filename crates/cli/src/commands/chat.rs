//! `ragline chat`: Interactive or single-message chat on one session.

use ragline_agent::AgentRequest;
use ragline_config::AppConfig;
use ragline_core::message::SessionId;
use tokio::io::{self, AsyncBufReadExt, BufReader};

use crate::runtime::Runtime;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let runtime = Runtime::build(&config).map_err(|e| {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Set the key for your generation backend, e.g.:");
        eprintln!("    export GEMINI_API_KEY=...     (provider = \"gemini\")");
        eprintln!("    export OPENAI_API_KEY=sk-...  (provider = \"openai\")");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        e
    })?;
    runtime.ingest_corpus(&config.corpus.directory).await;

    let orch = &runtime.orchestrator;
    let session_id = SessionId::new();

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let response = orch.process(AgentRequest::new(msg, Some(session_id))).await;
        eprint!("\r              \r");
        let response = response?;
        println!("{}", response.reply);
        if !response.context_used.is_empty() {
            eprintln!("  Sources: {}", response.context_used.join(", "));
        }
        return Ok(());
    }

    println!();
    println!("  Ragline Agent (interactive)");
    println!();
    println!("  Provider:  {}", config.generation.provider);
    println!("  Model:     {}", config.generation.model);
    println!("  Tools:     {}", orch.tools().names().join(", "));
    println!("  Chunks:    {}", orch.index().len().await);
    println!("  Session:   {session_id}");
    println!();
    println!("  Type your message and press Enter.");
    println!("  Type 'exit' or Ctrl+D to quit.");
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();
    prompt()?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line == "exit" || line == "quit" {
            break;
        }
        if line.is_empty() {
            prompt()?;
            continue;
        }

        eprint!("  ...");
        let result = orch
            .process(AgentRequest::new(line, Some(session_id.clone())))
            .await;
        eprint!("\r     \r");

        match result {
            Ok(response) => {
                println!();
                for reply_line in response.reply.lines() {
                    println!("  Assistant > {reply_line}");
                }
                if !response.plugins_used.is_empty() {
                    println!("  (tools: {})", response.plugins_used.join(", "));
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }

        prompt()?;
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn prompt() -> std::io::Result<()> {
    use std::io::Write;
    print!("  You > ");
    std::io::stdout().flush()
}
