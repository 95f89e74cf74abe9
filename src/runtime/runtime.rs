//! AgentsRuntime - The agents API
//!
//! The runtime is responsible for:
//! - Opening the durable store at startup
//! - Keeping the registry of agent configurations
//! - Choosing the session store for each agent
//! - Handing out turn streams for create and resume requests

use std::sync::Arc;

use crate::agent::{
    AgentApis, AgentConfig, AgentTurnCreateRequest, AgentTurnResumeRequest, ChatAgent,
    TurnEventStream,
};
use crate::config::RuntimeConfig;
use crate::core::{AgentsError, AgentsResult};
use crate::keys;
use crate::kvstore::{kvstore_impl, InMemoryKvStore, KvStore};
use crate::registry::{Agent, AgentListing, AgentRegistry};
use crate::session::{Session, SessionListing, SessionStorage, Step, Turn};

/// Runtime serving the agents API
///
/// Cloning is cheap; clones share the stores and collaborators.
#[derive(Clone)]
pub struct AgentsRuntime {
    config: RuntimeConfig,
    persistence_store: Arc<dyn KvStore>,
    /// Holds sessions of agents created without session persistence
    in_memory_store: Arc<dyn KvStore>,
    registry: AgentRegistry,
    apis: AgentApis,
}

impl std::fmt::Debug for AgentsRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentsRuntime")
            .field("persistence_store", &self.persistence_store.kind())
            .field("apis", &self.apis)
            .finish()
    }
}

impl AgentsRuntime {
    /// Open the configured durable store and build the runtime
    ///
    /// Any failure to construct the backend is fatal.
    pub async fn initialize(config: RuntimeConfig, apis: AgentApis) -> AgentsResult<Self> {
        let persistence_store = kvstore_impl(&config.persistence_store)
            .await
            .map_err(|e| AgentsError::BackendFatal(e.to_string()))?;

        tracing::info!(
            "[AgentsRuntime] Initialized with {} persistence store",
            persistence_store.kind()
        );
        Ok(Self::from_parts(config, persistence_store, apis))
    }

    /// Build a runtime over an already opened durable store
    pub fn with_store(persistence_store: Arc<dyn KvStore>, apis: AgentApis) -> Self {
        Self::from_parts(RuntimeConfig::default(), persistence_store, apis)
    }

    fn from_parts(
        config: RuntimeConfig,
        persistence_store: Arc<dyn KvStore>,
        apis: AgentApis,
    ) -> Self {
        Self {
            config,
            registry: AgentRegistry::new(persistence_store.clone()),
            persistence_store,
            in_memory_store: Arc::new(InMemoryKvStore::new()),
            apis,
        }
    }

    /// Configuration the runtime was built with
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// The agent registry
    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    // ========================================================================
    // Agents
    // ========================================================================

    /// Register an agent and return its id
    pub async fn create_agent(&self, config: AgentConfig) -> AgentsResult<String> {
        self.registry.create_agent(config).await
    }

    pub async fn get_agent(&self, agent_id: &str) -> AgentsResult<Agent> {
        self.registry.get_agent(agent_id).await
    }

    pub async fn list_agents(&self) -> AgentsResult<AgentListing> {
        self.registry.list_agents().await
    }

    /// Delete an agent's configuration
    ///
    /// Its sessions and turns are left in their store.
    pub async fn delete_agent(&self, agent_id: &str) -> AgentsResult<()> {
        self.registry.delete_agent(agent_id).await
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Create a session for an existing agent
    pub async fn create_agent_session(
        &self,
        agent_id: &str,
        session_name: &str,
    ) -> AgentsResult<String> {
        let agent = self.chat_agent(agent_id).await?;
        agent.create_session(session_name).await
    }

    /// Get a session with its turns, optionally only those in `turn_ids`
    pub async fn get_agents_session(
        &self,
        agent_id: &str,
        session_id: &str,
        turn_ids: Option<&[String]>,
    ) -> AgentsResult<Session> {
        let agent = self.chat_agent(agent_id).await?;
        agent.storage().get_session(session_id, turn_ids).await
    }

    /// Delete a session's metadata
    ///
    /// Works for agents that no longer exist, in which case the durable
    /// store is assumed.
    pub async fn delete_agents_session(&self, agent_id: &str, session_id: &str) -> AgentsResult<()> {
        let storage = match self.registry.get_agent(agent_id).await {
            Ok(agent) => self.session_storage(agent_id, &agent.agent_config),
            Err(e) if e.is_not_found() => {
                SessionStorage::new(agent_id, self.persistence_store.clone())
            }
            Err(e) => return Err(e),
        };
        storage.delete_session(session_id).await
    }

    /// List an agent's sessions with their turns
    pub async fn list_agent_sessions(&self, agent_id: &str) -> AgentsResult<SessionListing> {
        let agent = self.chat_agent(agent_id).await?;
        agent.storage().list_sessions().await
    }

    // ========================================================================
    // Turns
    // ========================================================================

    /// Start a turn and return its event stream
    pub async fn create_agent_turn(
        &self,
        request: AgentTurnCreateRequest,
    ) -> AgentsResult<TurnEventStream> {
        request.require_stream()?;
        let agent = self.chat_agent(&request.agent_id).await?;
        agent.create_and_execute_turn(request).await
    }

    /// Resume a turn waiting for client tool results
    pub async fn resume_agent_turn(
        &self,
        request: AgentTurnResumeRequest,
    ) -> AgentsResult<TurnEventStream> {
        request.require_stream()?;
        let agent = self.chat_agent(&request.agent_id).await?;
        agent.resume_turn(request).await
    }

    pub async fn get_agents_turn(
        &self,
        agent_id: &str,
        session_id: &str,
        turn_id: &str,
    ) -> AgentsResult<Turn> {
        let agent = self.chat_agent(agent_id).await?;
        agent.storage().get_session_turn(session_id, turn_id).await
    }

    pub async fn get_agents_step(
        &self,
        agent_id: &str,
        session_id: &str,
        turn_id: &str,
        step_id: &str,
    ) -> AgentsResult<Step> {
        let turn = self.get_agents_turn(agent_id, session_id, turn_id).await?;
        turn.step(step_id).cloned().ok_or_else(|| {
            AgentsError::not_found(
                "Step",
                format!("{}:{}", keys::turn_key(agent_id, session_id, turn_id), step_id),
            )
        })
    }

    /// Stop serving
    ///
    /// Stores are released when the last clone is dropped.
    pub async fn shutdown(&self) -> AgentsResult<()> {
        tracing::info!("[AgentsRuntime] Shutting down");
        Ok(())
    }

    // ========================================================================
    // Internal
    // ========================================================================

    async fn chat_agent(&self, agent_id: &str) -> AgentsResult<ChatAgent> {
        let agent = self.registry.get_agent(agent_id).await?;
        let storage = self.session_storage(agent_id, &agent.agent_config);
        Ok(ChatAgent::new(agent_id, agent.agent_config, self.apis.clone(), storage))
    }

    fn session_storage(&self, agent_id: &str, config: &AgentConfig) -> SessionStorage {
        let store = if config.enable_session_persistence {
            self.persistence_store.clone()
        } else {
            self.in_memory_store.clone()
        };
        SessionStorage::new(agent_id, store)
    }
}
