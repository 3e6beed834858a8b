//! Command-line front end for Tether.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::TetherConfig;
use crate::error::Result;
use crate::llm::OpenAiCompatibleClient;
use crate::session::{ChatRequest, ChatResponse, ChatStatus, SessionService};
use crate::skills::SkillRegistry;

/// Tether agent CLI
#[derive(Parser, Debug)]
#[command(name = "tether", version, about = "Suspendable LLM task agent")]
pub struct Cli {
    /// Path to a TOML config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Chat with an agent; questions from the agent are answered inline
    Chat(ChatArgs),
    /// List skills discovered in the configured directory
    Skills,
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Session to continue (a new one is created when omitted)
    #[arg(short, long)]
    pub session: Option<String>,

    /// Send a single prompt and exit instead of starting a REPL
    pub prompt: Option<String>,
}

pub fn load_config(cli: &Cli) -> Result<TetherConfig> {
    TetherConfig::load(cli.config.as_deref())
}

/// Run the chat REPL (or a single prompt) against a fresh session service.
pub async fn handle_chat(config: &TetherConfig, args: ChatArgs) -> Result<()> {
    let client = Arc::new(OpenAiCompatibleClient::from_settings(&config.model)?);
    let service = SessionService::from_config(config, client);
    let mut session_id = args.session;

    if let Some(prompt) = args.prompt {
        let response = service.chat(request(prompt, session_id)).await;
        print_response(&response);
        service.shutdown().await;
        return Ok(());
    }

    eprintln!("Type a task and press enter. Ctrl-D to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt_marker(session_id.is_some());
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let response = service.chat(request(line, session_id.take())).await;
        print_response(&response);
        session_id = Some(response.session_id);
    }

    service.shutdown().await;
    Ok(())
}

/// Print discovered skills and any definitions that failed to parse.
pub fn handle_skills(config: &TetherConfig) -> Result<()> {
    let mut registry = SkillRegistry::new(config.skills.dir.clone());
    let report = registry.discover();

    if report.discovered.is_empty() {
        println!("No skills found in {}", config.skills.dir.display());
    }
    for (name, description) in registry.list() {
        println!("{name:<24} {description}");
    }
    for failure in &report.failures {
        eprintln!("skipped {}: {}", failure.path.display(), failure.message);
    }
    Ok(())
}

fn request(prompt: String, session_id: Option<String>) -> ChatRequest {
    let request = ChatRequest::new(prompt);
    match session_id {
        Some(id) => request.with_session(id),
        None => request,
    }
}

fn prompt_marker(in_session: bool) {
    let marker = if in_session { "> " } else { ">> " };
    eprint!("{marker}");
    let _ = std::io::stderr().flush();
}

fn print_response(response: &ChatResponse) {
    match response.status {
        ChatStatus::Completed => println!("{}", response.response),
        ChatStatus::Suspended => println!("[question] {}", response.response),
        ChatStatus::Error => eprintln!("{}", response.response),
    }
    eprintln!("[{} | session {}]", response.status, response.session_id);
}
