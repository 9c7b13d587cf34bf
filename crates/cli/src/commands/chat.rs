//! `cocochat chat`: run one exchange from the terminal.

use std::io::{self, Write};
use std::sync::Arc;

use cocochat_agent::{
    Orchestrator, OrchestratorEvent, OrchestratorSettings, system_prompt, to_sse_line,
};
use cocochat_config::AppConfig;
use cocochat_core::message::{Message, MessageLog};

pub async fn run(
    config: AppConfig,
    message: &str,
    stream: bool,
    raw: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if message.trim().is_empty() {
        return Err("Message must not be empty".into());
    }

    // A custom endpoint may not need a key; the default one always does.
    if config.model.api_key.is_none() && config.model.api_url.is_none() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    COCOCHAT_API_KEY=sk-...");
        eprintln!("    OPENAI_API_KEY=sk-...");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = cocochat_providers::build_from_config(&config)?;
    let tools = Arc::new(cocochat_tools::default_registry(&config)?);
    let settings = OrchestratorSettings::from_config(&config).with_streaming(stream);
    let orchestrator = Orchestrator::new(provider, tools, settings);

    let mut log = MessageLog::with_system_prompt(system_prompt(&config.agent));
    log.push(Message::user(message))?;

    let mut rx = orchestrator.spawn(log);
    let mut stdout = io::stdout();
    let mut stderr = io::stderr();
    let mut failure = None;

    while let Some(event) = rx.recv().await {
        render(&event, raw, &mut stdout, &mut stderr)?;
        if let OrchestratorEvent::Error { message } = event {
            failure = Some(message);
        }
    }

    match failure {
        Some(message) => Err(message.into()),
        None => Ok(()),
    }
}

/// Write one event to the terminal.
///
/// Assistant text goes to `out` as it arrives; tool activity and errors go
/// to `diag`. In raw mode every event is written to `out` as its wire record.
fn render(
    event: &OrchestratorEvent,
    raw: bool,
    out: &mut dyn Write,
    diag: &mut dyn Write,
) -> io::Result<()> {
    if raw {
        write!(out, "{}", to_sse_line(event))?;
        return out.flush();
    }

    match event {
        OrchestratorEvent::AssistantDelta { content } => {
            write!(out, "{content}")?;
            out.flush()?;
        }
        OrchestratorEvent::ToolCallAnnounced { call } => {
            writeln!(diag, "  [tool] {} {}", call.name, call.arguments)?;
        }
        OrchestratorEvent::ToolResultReady { result } => {
            let status = if result.is_error() { "failed" } else { "ok" };
            writeln!(diag, "  [tool] {} {status}", result.name)?;
            if result.is_error() {
                writeln!(diag, "         {}", result.content_text())?;
            }
        }
        OrchestratorEvent::Error { message } => {
            writeln!(out)?;
            writeln!(diag, "  [error] {message}")?;
        }
        OrchestratorEvent::Done {
            rounds,
            tool_calls_made,
            ..
        } => {
            writeln!(out)?;
            tracing::debug!(rounds, tool_calls = tool_calls_made, "Exchange finished");
        }
    }
    Ok(())
}
