use colored::*;

use crate::core::TurnStatus;
use crate::llm::Message;
use crate::registry::{Agent, AgentListing};
use crate::session::{Session, SessionListing, Step, StepDetails, Turn};

/// Longest tool output shown before truncating
const MAX_OUTPUT_CHARS: usize = 500;

/// Console renders stored agents, sessions and turns with colored formatting
pub struct Console {
    id_color: Color,
    user_color: Color,
    assistant_color: Color,
    tool_color: Color,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            id_color: Color::BrightBlue,
            user_color: Color::Cyan,
            assistant_color: Color::Green,
            tool_color: Color::Magenta,
        }
    }

    /// Print a system message
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Print a separator line
    pub fn print_separator(&self) {
        println!("{}", "-".repeat(60).bright_black());
    }

    /// Print one line per agent
    pub fn print_agents(&self, listing: &AgentListing) {
        if listing.data.is_empty() {
            self.print_system("No agents");
        }
        for agent in &listing.data {
            println!(
                "{}  {}  {}  {}",
                agent.agent_id.color(self.id_color),
                agent.created_at.to_rfc3339().bright_black(),
                agent.agent_config.model,
                agent.agent_config.name.as_deref().unwrap_or("").bold()
            );
        }
        self.print_skipped(listing.skipped);
    }

    /// Print an agent's full configuration
    pub fn print_agent(&self, agent: &Agent) {
        println!("{} {}", "Agent:".bold(), agent.agent_id.color(self.id_color));
        println!("{} {}", "Created:".bold(), agent.created_at.to_rfc3339());
        match serde_json::to_string_pretty(&agent.agent_config) {
            Ok(json) => println!("{}", json),
            Err(e) => self.print_error(&e.to_string()),
        }
    }

    /// Print one line per session
    pub fn print_sessions(&self, listing: &SessionListing) {
        if listing.data.is_empty() {
            self.print_system("No sessions");
        }
        for session in &listing.data {
            println!(
                "{}  {}  {}  {} turn(s)",
                session.session_id.color(self.id_color),
                session.started_at.to_rfc3339().bright_black(),
                session.session_name.bold(),
                session.turns.len()
            );
        }
        self.print_skipped(listing.skipped);
    }

    /// Print a session and every turn in it
    pub fn print_session(&self, session: &Session) {
        println!(
            "{} {} ({})",
            "Session:".bold(),
            session.session_name.bold(),
            session.session_id.color(self.id_color)
        );
        for turn in &session.turns {
            self.print_separator();
            self.print_turn(turn);
        }
    }

    /// Print a turn with its input, steps and output
    pub fn print_turn(&self, turn: &Turn) {
        println!(
            "{} {} [{}]",
            "Turn:".bold(),
            turn.turn_id.color(self.id_color),
            status_label(turn.status)
        );

        for message in &turn.input_messages {
            self.print_message(message);
        }
        for step in &turn.steps {
            println!("  {}", describe_step(step).bright_black());
        }
        for call in &turn.pending_tool_calls {
            println!(
                "{} {} {}",
                "Waiting on:".yellow().bold(),
                format!("[{}]", call.tool_name).color(self.tool_color),
                call.call_id
            );
        }
        if let Some(output) = &turn.output_message {
            println!(
                "{} {}",
                "Assistant:".color(self.assistant_color).bold(),
                output.content.color(self.assistant_color)
            );
        }
    }

    fn print_message(&self, message: &Message) {
        match message {
            Message::User { content, .. } => {
                println!("{} {}", "User:".color(self.user_color).bold(), content);
            }
            Message::Tool(response) => {
                println!(
                    "{} {}",
                    format!("[{}]", response.tool_name).color(self.tool_color),
                    truncate(&response.content)
                );
            }
            Message::System { content } => self.print_system(content),
            Message::Assistant(completion) => {
                println!(
                    "{} {}",
                    "Assistant:".color(self.assistant_color).bold(),
                    completion.content
                );
            }
        }
    }

    fn print_skipped(&self, skipped: usize) {
        if skipped > 0 {
            println!("{}", format!("({} malformed record(s) skipped)", skipped).yellow());
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

fn status_label(status: TurnStatus) -> ColoredString {
    match status {
        TurnStatus::InProgress => status.as_str().yellow(),
        TurnStatus::AwaitingInput => status.as_str().magenta(),
        TurnStatus::Completed => status.as_str().green(),
    }
}

/// One-line summary of a step
pub fn describe_step(step: &Step) -> String {
    let summary = match &step.details {
        StepDetails::Inference { model_response } if model_response.has_tool_calls() => {
            let names: Vec<_> = model_response
                .tool_calls
                .iter()
                .map(|c| c.tool_name.as_str())
                .collect();
            format!("calls {}", names.join(", "))
        }
        StepDetails::Inference { model_response } => truncate(&model_response.content),
        StepDetails::ToolExecution { tool_responses, .. } => {
            let failed = tool_responses.iter().filter(|r| r.is_error).count();
            format!("{} response(s), {} failed", tool_responses.len(), failed)
        }
        StepDetails::ShieldCall { violation: None } => "passed".to_string(),
        StepDetails::ShieldCall {
            violation: Some(violation),
        } => format!(
            "{:?}: {}",
            violation.violation_level,
            violation.user_message.as_deref().unwrap_or("")
        ),
        StepDetails::MemoryRetrieval { vector_db_ids, .. } => {
            format!("from {}", vector_db_ids.join(", "))
        }
    };
    format!("{} {} {}", step.step_type(), step.step_id, summary)
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_OUTPUT_CHARS {
        let head: String = text.chars().take(MAX_OUTPUT_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
