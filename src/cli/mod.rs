//! Command-line inspection of stored agents, sessions and turns
//!
//! - `Cli` - Argument definitions (clap derive)
//! - `Console` - Colored rendering of records
//! - `run` - Executes a parsed command against the configured store

pub mod console;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::config::RuntimeConfig;
use crate::core::{AgentsError, AgentsResult};
use crate::kvstore::{kvstore_impl, KvStore};
use crate::registry::AgentRegistry;
use crate::session::SessionStorage;

pub use console::{describe_step, Console};

/// Inspect the agents store
#[derive(Debug, Parser)]
#[command(name = "shadow-agents", version, about)]
pub struct Cli {
    /// Runtime configuration file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage agents
    #[command(subcommand)]
    Agents(AgentsCommand),

    /// Manage an agent's sessions
    #[command(subcommand)]
    Sessions(SessionsCommand),

    /// Show one session
    #[command(subcommand)]
    Session(SessionCommand),

    /// Show one turn
    #[command(subcommand)]
    Turn(TurnCommand),
}

#[derive(Debug, Subcommand)]
pub enum AgentsCommand {
    /// List registered agents
    List,
    /// Show an agent's configuration
    Show { agent_id: String },
    /// Delete an agent (its sessions are kept)
    Delete { agent_id: String },
}

#[derive(Debug, Subcommand)]
pub enum SessionsCommand {
    /// List an agent's sessions
    List { agent_id: String },
}

#[derive(Debug, Subcommand)]
pub enum SessionCommand {
    /// Show a session with its turns
    Show {
        agent_id: String,
        session_id: String,
        /// Only these turns
        #[arg(long = "turn")]
        turn_ids: Vec<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TurnCommand {
    /// Show a turn with its steps
    Show {
        agent_id: String,
        session_id: String,
        turn_id: String,
    },
}

impl Cli {
    /// Load the configuration file, or defaults when none was given
    pub fn runtime_config(&self) -> AgentsResult<RuntimeConfig> {
        match &self.config {
            Some(path) => RuntimeConfig::load(path),
            None => Ok(RuntimeConfig::default()),
        }
    }
}

/// Run `command` against the durable store in `config`
pub async fn run(command: Command, config: &RuntimeConfig, console: &Console) -> AgentsResult<()> {
    let store = kvstore_impl(&config.persistence_store)
        .await
        .map_err(|e| AgentsError::BackendFatal(e.to_string()))?;
    let registry = AgentRegistry::new(store.clone());

    match command {
        Command::Agents(AgentsCommand::List) => {
            console.print_agents(&registry.list_agents().await?);
        }
        Command::Agents(AgentsCommand::Show { agent_id }) => {
            console.print_agent(&registry.get_agent(&agent_id).await?);
        }
        Command::Agents(AgentsCommand::Delete { agent_id }) => {
            registry.delete_agent(&agent_id).await?;
            console.print_system(&format!("Deleted agent {}", agent_id));
        }
        Command::Sessions(SessionsCommand::List { agent_id }) => {
            let storage = agent_storage(&registry, store, &agent_id).await?;
            console.print_sessions(&storage.list_sessions().await?);
        }
        Command::Session(SessionCommand::Show {
            agent_id,
            session_id,
            turn_ids,
        }) => {
            let storage = agent_storage(&registry, store, &agent_id).await?;
            let session = storage.get_session(&session_id, Some(turn_ids.as_slice())).await?;
            console.print_session(&session);
        }
        Command::Turn(TurnCommand::Show {
            agent_id,
            session_id,
            turn_id,
        }) => {
            let storage = agent_storage(&registry, store, &agent_id).await?;
            console.print_turn(&storage.get_session_turn(&session_id, &turn_id).await?);
        }
    }

    Ok(())
}

/// Session storage of an agent that must exist
async fn agent_storage(
    registry: &AgentRegistry,
    store: Arc<dyn KvStore>,
    agent_id: &str,
) -> AgentsResult<SessionStorage> {
    let agent = registry.get_agent(agent_id).await?;
    if !agent.agent_config.enable_session_persistence {
        tracing::warn!(
            "[Cli] Agent {} keeps sessions in memory; nothing is stored durably",
            agent_id
        );
    }
    Ok(SessionStorage::new(agent_id, store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentConfig;
    use crate::kvstore::KvStoreConfig;
    use tempfile::TempDir;

    #[test]
    fn test_parse_commands() {
        let cli = Cli::parse_from([
            "shadow-agents",
            "--config",
            "agents.json",
            "session",
            "show",
            "a1",
            "s1",
            "--turn",
            "t1",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("agents.json")));
        match cli.command {
            Command::Session(SessionCommand::Show { turn_ids, .. }) => {
                assert_eq!(turn_ids, vec!["t1".to_string()]);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["shadow-agents", "agents", "list"]);
        assert!(matches!(cli.command, Command::Agents(AgentsCommand::List)));
        assert_eq!(cli.runtime_config().unwrap(), RuntimeConfig::default());
    }

    #[tokio::test]
    async fn test_run_against_sqlite() {
        let temp_dir = TempDir::new().unwrap();
        let config = RuntimeConfig::new()
            .with_persistence_store(KvStoreConfig::sqlite(temp_dir.path().join("agents.db")));

        let store = kvstore_impl(&config.persistence_store).await.unwrap();
        let registry = AgentRegistry::new(store.clone());
        let agent_id = registry
            .create_agent(AgentConfig::new("llama-3", "Be brief."))
            .await
            .unwrap();
        let session_id = SessionStorage::new(&agent_id, store)
            .create_session("support")
            .await
            .unwrap();

        let console = Console::new();
        run(Command::Agents(AgentsCommand::List), &config, &console)
            .await
            .unwrap();
        run(
            Command::Session(SessionCommand::Show {
                agent_id: agent_id.clone(),
                session_id,
                turn_ids: vec![],
            }),
            &config,
            &console,
        )
        .await
        .unwrap();

        let err = run(
            Command::Sessions(SessionsCommand::List {
                agent_id: "ghost".into(),
            }),
            &config,
            &console,
        )
        .await
        .unwrap_err();
        assert!(err.is_not_found());

        run(
            Command::Agents(AgentsCommand::Delete {
                agent_id: agent_id.clone(),
            }),
            &config,
            &console,
        )
        .await
        .unwrap();
        assert!(registry.get_agent(&agent_id).await.unwrap_err().is_not_found());
    }
}
