//! `zeroloop chat`: Interactive or single-message chat mode.
//!
//! While a turn is running, stdin stays live: a typed line is delivered to
//! the streaming agent as an intervention, and `/pause` / `/resume` toggle
//! the shared pause flag.

use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use zeroloop_agent::{Agent, AgentControl, FilePromptLoader, Prompts};
use zeroloop_config::{AppConfig, MemoryBackendKind};
use zeroloop_core::event::{AgentEvent, EventBus};
use zeroloop_core::memory::MemoryBackend;
use zeroloop_memory::{FileBackend, InMemoryBackend};

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Exit,
    Pause,
    Resume,
    Text(String),
}

fn parse_input(line: &str) -> Input {
    match line.trim() {
        "" => Input::Empty,
        "exit" | "quit" | "/exit" | "/quit" => Input::Exit,
        "/pause" => Input::Pause,
        "/resume" => Input::Resume,
        text => Input::Text(text.to_string()),
    }
}

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if config.api_key_for(&config.chat_model).is_none() && config.chat_model.base_url.contains("api.openai.com") {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    ZEROLOOP_API_KEY = 'sk-...'");
        eprintln!("    OPENAI_API_KEY   = 'sk-...'");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let control = Arc::new(AgentControl::new());
    let event_bus = Arc::new(EventBus::default());
    let mut agent = build_agent(&config, control.clone(), event_bus.clone())?;

    let printer = tokio::spawn(print_events(event_bus.clone()));

    if let Some(msg) = message {
        let response = agent.message_loop(&msg).await?;
        eprintln!();
        println!("{response}");
        printer.abort();
        return Ok(());
    }

    println!();
    println!("  zeroloop: interactive mode");
    println!();
    println!("  Chat model:     {}", config.chat_model.model);
    println!("  Utility model:  {}", config.utility_model.model);
    println!("  Memory:         {:?}", config.memory.backend);
    println!();
    println!("  Type while the agent works to intervene.");
    println!("  /pause and /resume hold the agent; 'exit' or Ctrl+C quits.");
    println!();

    let mut lines = spawn_stdin_reader();

    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.recv().await else {
            break;
        };

        let text = match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => break,
            Input::Pause => {
                control.pause();
                println!("  [paused]");
                continue;
            }
            Input::Resume => {
                control.resume();
                println!("  [resumed]");
                continue;
            }
            Input::Text(text) => text,
        };

        let turn = agent.message_loop(&text);
        tokio::pin!(turn);

        let result = loop {
            tokio::select! {
                result = &mut turn => break result,
                Some(line) = lines.recv() => match parse_input(&line) {
                    Input::Pause => {
                        control.pause();
                        eprintln!("\n  [paused]");
                    }
                    Input::Resume => {
                        control.resume();
                        eprintln!("\n  [resumed]");
                    }
                    Input::Text(text) => {
                        if !control.intervene(text) {
                            eprintln!("\n  [no agent is streaming; message dropped]");
                        }
                    }
                    Input::Empty | Input::Exit => {}
                },
            }
        };

        eprintln!();
        match result {
            Ok(response) => {
                println!();
                for line in response.lines() {
                    println!("  Agent > {line}");
                }
                println!();
            }
            Err(e) => {
                eprintln!("  [Error] {e}");
                println!();
            }
        }
    }

    printer.abort();
    println!();
    println!("  Goodbye!");
    println!();

    Ok(())
}

/// Assemble an agent from configuration.
fn build_agent(
    config: &AppConfig,
    control: Arc<AgentControl>,
    event_bus: Arc<EventBus>,
) -> Result<Agent, Box<dyn std::error::Error>> {
    let loader = match &config.prompts_dir {
        Some(dir) => FilePromptLoader::with_dir(dir.clone()),
        None => FilePromptLoader::builtin(),
    };
    let prompts = Prompts::load(&loader)?;

    let chat = zeroloop_providers::chat_model(config, &config.chat_model)?;
    let utility = zeroloop_providers::chat_model(config, &config.utility_model)?;

    let mut agent = Agent::new(0, chat, utility, prompts, control)
        .with_config(config.agent_config())
        .with_tools(Arc::new(zeroloop_tools::default_registry()))
        .with_event_bus(event_bus);

    let memory: Option<Arc<dyn MemoryBackend>> = match config.memory.backend {
        MemoryBackendKind::None => None,
        MemoryBackendKind::InMemory => Some(Arc::new(InMemoryBackend::new())),
        MemoryBackendKind::File => {
            let path = config.memory.path.clone().unwrap_or_else(FileBackend::default_path);
            Some(Arc::new(FileBackend::new(path)))
        }
    };
    if let Some(memory) = memory {
        agent = agent.with_memory(memory);
    }

    Ok(agent)
}

/// Read stdin lines on a dedicated task so they can arrive mid-turn.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(line).await.is_err() {
                break;
            }
        }
    });
    rx
}

/// Stream agent progress to stderr; the final answer goes to stdout.
async fn print_events(event_bus: Arc<EventBus>) {
    let mut rx = event_bus.subscribe();
    loop {
        let event = match rx.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                tracing::debug!(skipped = n, "Event printer lagged");
                continue;
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        match event.as_ref() {
            AgentEvent::StreamStarted { agent } => eprint!("\n  {agent} > "),
            AgentEvent::Chunk { content, .. } => eprint!("{content}"),
            AgentEvent::ToolCall { tool, .. } => eprintln!("\n  [tool] {tool}"),
            AgentEvent::Intervention { message, .. } => eprintln!("\n  [intervention] {message}"),
            AgentEvent::Warning { message, .. } => eprintln!("\n  [warning] {message}"),
            AgentEvent::Error { message, .. } => eprintln!("\n  [error] {message}"),
            AgentEvent::RateLimited { wait_ms, .. } => {
                eprintln!("\n  [rate limited] waiting {:.1}s", *wait_ms as f64 / 1000.0)
            }
            AgentEvent::Compacted { summarized, .. } => {
                eprintln!("\n  [history] summarized {summarized} messages")
            }
            AgentEvent::Adhoc { .. } | AgentEvent::ToolResult { .. } | AgentEvent::TurnComplete { .. } => {}
        }
        let _ = std::io::stderr().flush();
    }
}
