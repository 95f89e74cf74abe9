//! Chat Agent
//!
//! Executes turns as a stream of events:
//! - Input shields → document retrieval → inference → tools → output shields
//! - Every step is written to the turn record before its event is yielded
//! - A call to a client tool suspends the turn (`awaiting_input`)
//! - Resuming continues from the persisted turn plus the supplied results
//!
//! Dropping a stream stops the turn where it is. The last persisted step is
//! the checkpoint, and the turn stays `in_progress`.

use std::collections::HashSet;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use uuid::Uuid;

use crate::core::{AgentsError, AgentsResult, TurnEvent, TurnStatus};
use crate::keys;
use crate::llm::{CompletionMessage, InferenceRequest, Message, ToolCall, ToolResponse};
use crate::safety::SafetyViolation;
use crate::session::{SessionStorage, Step, StepDetails, Turn};
use crate::tools::ToolRegistry;
use crate::vector_io::{session_vector_db_id, Document};

use super::apis::AgentApis;
use super::config::AgentConfig;
use super::executor::ToolExecutor;
use super::request::{AgentTurnCreateRequest, AgentTurnResumeRequest};

/// Ordered stream of turn events
pub type TurnEventStream = Pin<Box<dyn Stream<Item = AgentsResult<TurnEvent>> + Send>>;

/// Output used when a shield blocks without giving a message
const BLOCKED_MESSAGE: &str = "I can't answer that. Can I help with something else?";

/// An agent bound to its configuration, collaborators and session store
///
/// # Example
///
/// ```ignore
/// let agent = ChatAgent::new(agent_id, config, apis, storage);
/// let session_id = agent.create_session("support").await?;
///
/// let request = AgentTurnCreateRequest::new(agent.agent_id(), session_id, vec![Message::user("hi")]);
/// let mut events = agent.create_and_execute_turn(request).await?;
/// while let Some(event) = events.next().await {
///     println!("{:?}", event?);
/// }
/// ```
#[derive(Clone)]
pub struct ChatAgent {
    agent_id: String,
    config: Arc<AgentConfig>,
    apis: AgentApis,
    storage: SessionStorage,
}

impl ChatAgent {
    /// Create a chat agent
    pub fn new(
        agent_id: impl Into<String>,
        config: AgentConfig,
        apis: AgentApis,
        storage: SessionStorage,
    ) -> Self {
        Self {
            agent_id: agent_id.into(),
            config: Arc::new(config),
            apis,
            storage,
        }
    }

    /// Agent id
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Agent configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Session storage this agent writes to
    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    /// Create a session for this agent
    pub async fn create_session(&self, name: &str) -> AgentsResult<String> {
        self.storage.create_session(name).await
    }

    /// Start a turn
    ///
    /// The request is validated before returning. Nothing is written until
    /// the stream is polled.
    pub async fn create_and_execute_turn(
        &self,
        request: AgentTurnCreateRequest,
    ) -> AgentsResult<TurnEventStream> {
        request.validate_messages()?;
        if self.storage.get_session_info(&request.session_id).await?.is_none() {
            return Err(AgentsError::not_found(
                "Session",
                keys::session_key(&self.agent_id, &request.session_id),
            ));
        }

        let agent = self.clone();
        let stream = async_stream::try_stream! {
            let mut turn = Turn::new(Uuid::new_v4().to_string(), request.session_id, request.messages);
            turn.toolgroups = request.toolgroups;
            turn.tool_config = request.tool_config;
            agent.storage.save_turn(&turn).await?;

            tracing::info!(
                "[ChatAgent] Started turn {} in session {}",
                turn.turn_id,
                turn.session_id
            );
            yield TurnEvent::TurnStart { turn_id: turn.turn_id.clone() };

            if !agent.config.input_shields.is_empty() {
                let started_at = Utc::now();
                let violation = agent
                    .run_shields(&agent.config.input_shields, &turn.input_messages)
                    .await?;
                let blocked = violation.as_ref().filter(|v| v.is_blocking()).map(blocked_output);
                let step = agent
                    .record_step(&mut turn, started_at, StepDetails::ShieldCall { violation })
                    .await?;
                yield TurnEvent::StepComplete { step };

                if let Some(output) = blocked {
                    tracing::info!("[ChatAgent] Input blocked by shield in turn {}", turn.turn_id);
                    turn.complete(output);
                    agent.storage.save_turn(&turn).await?;
                    yield TurnEvent::TurnComplete { turn };
                    return;
                }
            }

            if !request.documents.is_empty() {
                let started_at = Utc::now();
                let details = agent.retrieve_documents(&turn, &request.documents).await?;
                let step = agent.record_step(&mut turn, started_at, details).await?;
                yield TurnEvent::StepComplete { step };
            }

            let mut events = agent.run_loop(turn);
            while let Some(event) = events.next().await {
                yield event?;
            }
        };

        Ok(Box::pin(stream))
    }

    /// Resume a turn that is waiting for client tool results
    ///
    /// The turn must be `awaiting_input` and the responses must answer
    /// exactly its pending calls.
    pub async fn resume_turn(
        &self,
        request: AgentTurnResumeRequest,
    ) -> AgentsResult<TurnEventStream> {
        let mut turn = self
            .storage
            .get_session_turn(&request.session_id, &request.turn_id)
            .await?;
        if turn.status != TurnStatus::AwaitingInput {
            return Err(AgentsError::TurnNotAwaiting {
                turn_id: turn.turn_id,
                status: turn.status.to_string(),
            });
        }
        let tool_responses = match_tool_responses(&turn.pending_tool_calls, request.tool_responses)?;

        let agent = self.clone();
        let stream = async_stream::try_stream! {
            tracing::info!("[ChatAgent] Resuming turn {}", turn.turn_id);
            yield TurnEvent::TurnStart { turn_id: turn.turn_id.clone() };

            let started_at = Utc::now();
            let tool_calls = std::mem::take(&mut turn.pending_tool_calls);
            turn.resume();
            let step = agent
                .record_step(
                    &mut turn,
                    started_at,
                    StepDetails::ToolExecution { tool_calls, tool_responses },
                )
                .await?;
            yield TurnEvent::StepComplete { step };

            let mut events = agent.run_loop(turn);
            while let Some(event) = events.next().await {
                yield event?;
            }
        };

        Ok(Box::pin(stream))
    }

    /// Inference and tool loop, driven only by the persisted turn
    fn run_loop(&self, mut turn: Turn) -> TurnEventStream {
        let agent = self.clone();
        let stream = async_stream::try_stream! {
            let toolgroups = turn
                .toolgroups
                .clone()
                .unwrap_or_else(|| agent.config.toolgroups.clone());
            let tools = ToolRegistry::resolve(
                agent.apis.tool_groups.as_ref(),
                &toolgroups,
                &agent.config.client_tools,
            )
            .await?;
            let tool_config = turn
                .tool_config
                .clone()
                .unwrap_or_else(|| agent.config.tool_config.clone());
            let max_iters = agent.config.max_infer_iters.max(1) as usize;

            loop {
                if turn.inference_count() >= max_iters {
                    tracing::warn!(
                        "[ChatAgent] Max inference iterations ({}) reached in turn {}",
                        max_iters,
                        turn.turn_id
                    );
                    let output = turn
                        .last_model_response()
                        .cloned()
                        .unwrap_or_else(|| CompletionMessage::text(""));
                    turn.complete(output);
                    agent.storage.save_turn(&turn).await?;
                    yield TurnEvent::TurnComplete { turn };
                    break;
                }

                let messages = agent.build_history(&turn).await?;
                tracing::info!(
                    "[ChatAgent] Calling inference with {} messages (iteration {})",
                    messages.len(),
                    turn.inference_count() + 1
                );

                let started_at = Utc::now();
                let response = agent
                    .apis
                    .inference
                    .chat_completion(InferenceRequest {
                        model: agent.config.model.clone(),
                        messages,
                        tools: tools.get_definitions(),
                        tool_config: tool_config.clone(),
                        sampling_params: agent.config.sampling_params.clone(),
                    })
                    .await?;
                let step = agent
                    .record_step(
                        &mut turn,
                        started_at,
                        StepDetails::Inference { model_response: response.clone() },
                    )
                    .await?;
                yield TurnEvent::StepComplete { step };

                if !response.has_tool_calls() {
                    let mut output = response;

                    if !agent.config.output_shields.is_empty() {
                        let started_at = Utc::now();
                        let checked = [Message::Assistant(output.clone())];
                        let violation = agent
                            .run_shields(&agent.config.output_shields, &checked)
                            .await?;
                        if let Some(blocked) = violation.as_ref().filter(|v| v.is_blocking()) {
                            tracing::info!("[ChatAgent] Output blocked by shield in turn {}", turn.turn_id);
                            output = blocked_output(blocked);
                        }
                        let step = agent
                            .record_step(&mut turn, started_at, StepDetails::ShieldCall { violation })
                            .await?;
                        yield TurnEvent::StepComplete { step };
                    }

                    turn.complete(output);
                    agent.storage.save_turn(&turn).await?;
                    tracing::info!("[ChatAgent] Completed turn {}", turn.turn_id);
                    yield TurnEvent::TurnComplete { turn };
                    break;
                }

                let (client_calls, server_calls): (Vec<ToolCall>, Vec<ToolCall>) = response
                    .tool_calls
                    .iter()
                    .cloned()
                    .partition(|call| tools.is_client_tool(&call.tool_name));

                if !server_calls.is_empty() {
                    let started_at = Utc::now();
                    let tool_responses = ToolExecutor::execute_all(
                        agent.apis.tool_runtime.as_ref(),
                        &tools,
                        &server_calls,
                    )
                    .await;
                    let step = agent
                        .record_step(
                            &mut turn,
                            started_at,
                            StepDetails::ToolExecution {
                                tool_calls: server_calls,
                                tool_responses,
                            },
                        )
                        .await?;
                    yield TurnEvent::StepComplete { step };
                }

                if !client_calls.is_empty() {
                    tracing::info!(
                        "[ChatAgent] Turn {} awaiting {} client tool results",
                        turn.turn_id,
                        client_calls.len()
                    );
                    turn.await_input(client_calls);
                    agent.storage.save_turn(&turn).await?;
                    yield TurnEvent::TurnAwaitingInput { turn };
                    break;
                }
            }
        };

        Box::pin(stream)
    }

    /// Append a step and persist the turn
    async fn record_step(
        &self,
        turn: &mut Turn,
        started_at: DateTime<Utc>,
        details: StepDetails,
    ) -> AgentsResult<Step> {
        let step = Step::new(&turn.turn_id, started_at, details);
        turn.push_step(step.clone());
        self.storage.save_turn(turn).await?;

        tracing::debug!(
            "[ChatAgent] Recorded {} step {} in turn {}",
            step.step_type(),
            step.step_id,
            turn.turn_id
        );
        Ok(step)
    }

    /// System instructions, earlier turns of the session, then this turn
    async fn build_history(&self, turn: &Turn) -> AgentsResult<Vec<Message>> {
        let mut messages = Vec::new();
        if !self.config.instructions.is_empty() {
            messages.push(Message::system(self.config.instructions.as_str()));
        }

        let earlier = self.storage.get_session_turns(&turn.session_id).await?;
        for previous in earlier
            .iter()
            .filter(|t| t.turn_id != turn.turn_id && t.started_at <= turn.started_at)
        {
            messages.extend(previous.messages());
        }

        messages.extend(turn.messages());
        Ok(messages)
    }

    /// Run `shields` in order, stopping at the first blocking violation
    async fn run_shields(
        &self,
        shields: &[String],
        messages: &[Message],
    ) -> AgentsResult<Option<SafetyViolation>> {
        let mut reported: Option<SafetyViolation> = None;
        for shield_id in shields {
            let response = self.apis.safety.run_shield(shield_id, messages).await?;
            let Some(violation) = response.violation else {
                continue;
            };

            tracing::info!(
                "[ChatAgent] Shield {} reported {:?} violation",
                shield_id,
                violation.violation_level
            );
            let blocking = violation.is_blocking();
            if blocking || reported.is_none() {
                reported = Some(violation);
            }
            if blocking {
                break;
            }
        }
        Ok(reported)
    }

    /// Insert `documents` into the session's vector DB and query it with the
    /// last user message
    async fn retrieve_documents(
        &self,
        turn: &Turn,
        documents: &[Document],
    ) -> AgentsResult<StepDetails> {
        let vector_db_id = session_vector_db_id(&turn.session_id);
        self.apis
            .vector_io
            .insert_documents(&vector_db_id, documents)
            .await?;

        let query = turn
            .input_messages
            .iter()
            .rev()
            .find_map(|m| match m {
                Message::User { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .unwrap_or_default();
        let chunks = self.apis.vector_io.query(&vector_db_id, query).await?;

        tracing::info!(
            "[ChatAgent] Retrieved {} chunks from {}",
            chunks.len(),
            vector_db_id
        );
        let inserted_context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Ok(StepDetails::MemoryRetrieval {
            vector_db_ids: vec![vector_db_id],
            inserted_context,
        })
    }
}

impl std::fmt::Debug for ChatAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatAgent")
            .field("agent_id", &self.agent_id)
            .field("model", &self.config.model)
            .field("storage", &self.storage)
            .finish()
    }
}

/// Output replacing a blocked message
fn blocked_output(violation: &SafetyViolation) -> CompletionMessage {
    CompletionMessage::text(
        violation
            .user_message
            .clone()
            .unwrap_or_else(|| BLOCKED_MESSAGE.to_string()),
    )
}

/// Order `responses` to match `pending`, requiring exactly one per call
fn match_tool_responses(
    pending: &[ToolCall],
    responses: Vec<ToolResponse>,
) -> AgentsResult<Vec<ToolResponse>> {
    let pending_ids: HashSet<&str> = pending.iter().map(|c| c.call_id.as_str()).collect();
    let mut seen = HashSet::new();
    for response in &responses {
        if !pending_ids.contains(response.call_id.as_str()) {
            return Err(AgentsError::InvalidRequest(format!(
                "no pending tool call with id {}",
                response.call_id
            )));
        }
        if !seen.insert(response.call_id.as_str()) {
            return Err(AgentsError::InvalidRequest(format!(
                "duplicate response for tool call {}",
                response.call_id
            )));
        }
    }

    let mut responses = responses;
    let mut ordered = Vec::with_capacity(pending.len());
    for call in pending {
        let position = responses
            .iter()
            .position(|r| r.call_id == call.call_id)
            .ok_or_else(|| {
                AgentsError::InvalidRequest(format!(
                    "missing response for tool call {}",
                    call.call_id
                ))
            })?;
        ordered.push(responses.swap_remove(position));
    }
    Ok(ordered)
}
