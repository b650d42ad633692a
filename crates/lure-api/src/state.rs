//! Application state wiring the provider, sink, and session registry.
//!
//! Shared by the CLI commands and the HTTP handlers. Agents are created on
//! demand and keyed by the caller's session id.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use lure_core::agent::{AgentSettings, HoneypotAgent};
use lure_core::finalize::BoxEvaluationSink;
use lure_core::llm::BoxLlmProvider;
use lure_infra::config::{load_config, resolve_api_key};
use lure_infra::filesystem::resolve_data_dir;
use lure_infra::llm::create_provider;
use lure_infra::sink::HttpEvaluationSink;
use lure_types::chat::{ChatMessage, SessionId};
use lure_types::config::LureConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<LureConfig>,
    pub provider: Arc<BoxLlmProvider>,
    pub sink: Arc<BoxEvaluationSink>,
    pub settings: AgentSettings,
    pub sessions: Arc<DashMap<SessionId, HoneypotAgent>>,
}

impl AppState {
    /// Load configuration and build the provider and sink.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        let config = load_config(&data_dir).await;

        let api_key = resolve_api_key(&config.provider)
            .map_err(|e| anyhow::anyhow!("{e}; export the inference API key before running lure"))?;
        let provider = create_provider(&config.provider, api_key)?;
        let sink = HttpEvaluationSink::from_settings(&config.evaluation)?;

        tracing::info!(
            data_dir = %data_dir.display(),
            model = %config.provider.model,
            reply_mode = ?config.reply_mode,
            "application state initialized"
        );

        Ok(Self::from_parts(
            config,
            provider,
            BoxEvaluationSink::new(sink),
        ))
    }

    pub fn from_parts(
        config: LureConfig,
        provider: BoxLlmProvider,
        sink: BoxEvaluationSink,
    ) -> Self {
        let settings = AgentSettings::from_config(&config);
        Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            sink: Arc::new(sink),
            settings,
            sessions: Arc::new(DashMap::new()),
        }
    }

    /// A new agent with a generated session id, not registered.
    pub fn new_agent(&self) -> HoneypotAgent {
        HoneypotAgent::new(self.provider.clone(), self.sink.clone(), self.settings.clone())
    }

    /// The registered agent for `session_id`, if any.
    pub fn agent(&self, session_id: &SessionId) -> Option<HoneypotAgent> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    /// The registered agent for `session_id`, creating it from `history`
    /// on first sight. Returns the agent and whether it was created.
    ///
    /// The agent is hydrated before it is registered. If another request
    /// registers the id first, that agent is returned instead.
    pub async fn agent_or_hydrate(
        &self,
        session_id: &SessionId,
        history: Vec<ChatMessage>,
    ) -> (HoneypotAgent, bool) {
        if let Some(agent) = self.agent(session_id) {
            return (agent, false);
        }

        let agent = HoneypotAgent::with_session_id(
            self.provider.clone(),
            self.sink.clone(),
            self.settings.clone(),
            session_id.clone(),
        );
        if !history.is_empty() {
            agent.restore(history).await;
        }

        match self.sessions.entry(session_id.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                entry.insert(agent.clone());
                (agent, true)
            }
        }
    }

    /// Drop a session. In-flight work for it is discarded on arrival.
    pub async fn remove(&self, session_id: &SessionId) -> bool {
        match self.sessions.remove(session_id) {
            Some((_, agent)) => {
                agent.reset().await;
                true
            }
            None => false,
        }
    }
}
