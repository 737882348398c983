//! End-to-end integration tests for the zeroloop agent loop.
//!
//! These tests assemble an agent the way the CLI does (config, built-in
//! prompts, default tools, memory backend) and drive full turns against a
//! scripted model.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use zeroloop_agent::{Agent, AgentControl, FilePromptLoader, Prompts};
use zeroloop_config::AppConfig;
use zeroloop_core::agent::RateLimitConfig;
use zeroloop_core::error::ProviderError;
use zeroloop_core::event::{AgentEvent, EventBus};
use zeroloop_core::memory::MemoryBackend;
use zeroloop_core::message::Role;
use zeroloop_core::provider::{ChatModel, ChunkStream, Provider, ProviderRequest, StreamChunk};
use zeroloop_memory::FileBackend;
use zeroloop_tools::default_registry;

// ── Mock Provider ────────────────────────────────────────────────────────

/// Plays back scripted replies, each split into the given chunks.
///
/// Chunks are sent from a spawned task with `delay` between them.
struct ScriptedProvider {
    replies: Mutex<VecDeque<Vec<String>>>,
    requests: Mutex<Vec<ProviderRequest>>,
    delay: Duration,
}

impl ScriptedProvider {
    fn new(replies: &[&[&str]]) -> Arc<Self> {
        Self::with_delay(replies, Duration::ZERO)
    }

    fn with_delay(replies: &[&[&str]], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .iter()
                    .map(|chunks| chunks.iter().map(|c| c.to_string()).collect())
                    .collect(),
            ),
            requests: Mutex::new(Vec::new()),
            delay,
        })
    }

    fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkStream, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let chunks = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider exhausted after {} calls", self.calls()));

        let (tx, rx) = mpsc::channel(1);
        let delay = self.delay;
        tokio::spawn(async move {
            for chunk in chunks {
                if tx.send(Ok(StreamChunk::text(chunk))).await.is_err() {
                    return;
                }
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        });
        Ok(rx)
    }
}

fn response(text: &str) -> String {
    serde_json::json!({
        "thoughts": ["answering"],
        "tool_name": "response",
        "tool_args": {"text": text},
    })
    .to_string()
}

fn unlimited_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.rate_limit = RateLimitConfig::unlimited();
    config.agent.auto_memory_count = 0;
    config
}

fn build_agent(
    config: &AppConfig,
    chat: &Arc<ScriptedProvider>,
    utility: &Arc<ScriptedProvider>,
    control: Arc<AgentControl>,
) -> Agent {
    let prompts = Prompts::load(&FilePromptLoader::builtin()).unwrap();
    Agent::new(
        0,
        ChatModel::new(chat.clone(), "chat-mock"),
        ChatModel::new(utility.clone(), "utility-mock"),
        prompts,
        control,
    )
    .with_config(config.agent_config())
    .with_tools(Arc::new(default_registry()))
}

// ── E2E: single turn ─────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_response_tool_ends_turn() {
    let reply = response("Hello there!");
    let chat = ScriptedProvider::new(&[&[&reply[..10], &reply[10..]]]);
    let utility = ScriptedProvider::new(&[]);
    let mut agent = build_agent(&unlimited_config(), &chat, &utility, Arc::new(AgentControl::new()));

    let answer = agent.message_loop("Say hello").await.unwrap();

    assert_eq!(answer, "Hello there!");
    assert_eq!(chat.calls(), 1);
    let messages = agent.history().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::Human);
    assert!(messages[0].content.contains("Say hello"));
    assert_eq!(messages[1].role, Role::Ai);

    let system = &chat.requests()[0].system;
    assert!(system.contains("Agent 0"));
    assert!(system.contains("memory_tool"));
}

#[tokio::test]
async fn e2e_prose_reply_gets_corrected() {
    let chat = ScriptedProvider::new(&[&["Sure, I can help with that."], &[&response("Fixed.")]]);
    let utility = ScriptedProvider::new(&[]);
    let mut agent = build_agent(&unlimited_config(), &chat, &utility, Arc::new(AgentControl::new()));

    let answer = agent.message_loop("Help").await.unwrap();

    assert_eq!(answer, "Fixed.");
    assert_eq!(chat.calls(), 2);
    // The misformat notice was merged into the history as a human message.
    let second = chat.requests()[1].messages.clone();
    assert_eq!(second.len(), 3);
    assert_eq!(second[2].role, Role::Human);
}

// ── E2E: memory round trip ───────────────────────────────────────────────

#[tokio::test]
async fn e2e_memorized_fact_is_recalled_next_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memories.jsonl");

    // Session one stores a fact through the memory tool.
    {
        let memorize = serde_json::json!({
            "tool_name": "memory_tool",
            "tool_args": {"memorize": "Deployments happen every Friday via kubectl"},
        })
        .to_string();
        let chat = ScriptedProvider::new(&[&[&memorize], &[&response("Noted.")]]);
        let utility = ScriptedProvider::new(&[]);
        let memory: Arc<dyn MemoryBackend> = Arc::new(FileBackend::new(path.clone()));
        let mut agent = build_agent(&unlimited_config(), &chat, &utility, Arc::new(AgentControl::new()))
            .with_memory(memory.clone());

        let answer = agent.message_loop("Remember that we deploy on Fridays").await.unwrap();
        assert_eq!(answer, "Noted.");
        assert_eq!(memory.count().await.unwrap(), 1);

        // The tool response was fed back before the second call.
        let second = chat.requests()[1].messages.clone();
        assert!(second.last().unwrap().content.contains("Memory saved with id"));
    }

    // Session two reopens the file; auto-recall cleans the hit through the
    // utility model and places it in the system prompt.
    let mut config = unlimited_config();
    config.agent.auto_memory_count = 3;
    let chat = ScriptedProvider::new(&[&[&response("On Friday.")]]);
    let utility = ScriptedProvider::new(&[&["The team deploys on Fridays."]]);
    let memory: Arc<dyn MemoryBackend> = Arc::new(FileBackend::new(path));
    let mut agent = build_agent(&config, &chat, &utility, Arc::new(AgentControl::new()))
        .with_memory(memory);

    let answer = agent.message_loop("When do deployments happen?").await.unwrap();

    assert_eq!(answer, "On Friday.");
    assert_eq!(utility.calls(), 1);
    assert!(utility.requests()[0].messages[0].content.contains("kubectl"));
    assert!(chat.requests()[0].system.contains("The team deploys on Fridays."));
}

// ── E2E: intervention from another task ──────────────────────────────────

#[tokio::test(start_paused = true)]
async fn e2e_intervention_redirects_streaming_turn() {
    let first = response("Deploying to production now.");
    let chunks: Vec<&str> = vec![&first[..15], &first[15..30], &first[30..]];
    let chat = ScriptedProvider::with_delay(
        &[&chunks, &[&response("Deploying to staging instead.")]],
        Duration::from_millis(50),
    );
    let utility = ScriptedProvider::new(&[]);
    let control = Arc::new(AgentControl::new());
    let event_bus = Arc::new(EventBus::new(64));
    let mut events = event_bus.subscribe();
    let mut agent = build_agent(&unlimited_config(), &chat, &utility, control.clone())
        .with_event_bus(event_bus);

    let user = {
        let control = control.clone();
        tokio::spawn(async move {
            while !control.intervene("Use staging, not production") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
    };

    let answer = agent.message_loop("Deploy the service").await.unwrap();
    user.await.unwrap();

    assert_eq!(answer, "Deploying to staging instead.");
    assert_eq!(chat.calls(), 2);
    assert!(control.streaming_agent().is_none());

    let retry = chat.requests()[1].messages.clone();
    let last = retry.last().unwrap();
    assert_eq!(last.role, Role::Human);
    assert!(last.content.contains("Use staging, not production"));

    let mut saw_intervention = false;
    while let Ok(event) = events.try_recv() {
        if let AgentEvent::Intervention { message, .. } = event.as_ref() {
            assert_eq!(message, "Use staging, not production");
            saw_intervention = true;
        }
    }
    assert!(saw_intervention);
}

#[tokio::test(start_paused = true)]
async fn e2e_paused_agent_holds_until_resumed() {
    let chat = ScriptedProvider::new(&[&[&response("Resumed fine.")]]);
    let utility = ScriptedProvider::new(&[]);
    let control = Arc::new(AgentControl::new());
    let mut agent = build_agent(&unlimited_config(), &chat, &utility, control.clone());

    control.pause();
    let resumer = {
        let control = control.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            control.resume();
        })
    };

    let started = tokio::time::Instant::now();
    let answer = agent.message_loop("Continue").await.unwrap();
    resumer.await.unwrap();

    assert_eq!(answer, "Resumed fine.");
    assert!(started.elapsed() >= Duration::from_millis(500));
}

// ── E2E: rate limiting ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn e2e_rate_limit_spaces_out_calls() {
    let mut config = unlimited_config();
    config.rate_limit = RateLimitConfig {
        seconds: 2,
        requests: 1,
        input_tokens: 0,
        output_tokens: 0,
    };
    let chat = ScriptedProvider::new(&[&["not json"], &[&response("Done.")]]);
    let utility = ScriptedProvider::new(&[]);
    let mut agent = build_agent(&config, &chat, &utility, Arc::new(AgentControl::new()));

    let started = tokio::time::Instant::now();
    let answer = agent.message_loop("Go").await.unwrap();

    assert_eq!(answer, "Done.");
    assert!(started.elapsed() >= Duration::from_secs(2));
}
