//! tars - AI-powered coding agent CLI

mod commands;
mod config;
mod ignore;
mod tools;
mod tree;
mod ui;
mod utils;

use clap::Parser;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tars_agent::{Agent, AgentConfig, AgentHandle, DEFAULT_MAX_TOKENS, Mode, TurnOutcome};
use tars_ai::GoogleGateway;
use tars_ai::providers::google::DEFAULT_MODEL;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::commands::CommandResult;
use crate::ignore::IgnoreRules;

/// tars - AI-powered coding agent
#[derive(Parser, Debug)]
#[command(name = "tars")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gemini model to use (default: gemini-2.5-flash)
    #[arg(short, long)]
    model: Option<String>,

    /// Starting mode (agent, planning, ask)
    #[arg(long)]
    mode: Option<Mode>,

    /// Run in non-interactive mode with a single prompt
    #[arg(short = 'c', long)]
    command: Option<String>,

    /// Working directory
    #[arg(short, long)]
    working_dir: Option<PathBuf>,

    /// Token budget for the recent-conversation window
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Stream the model's raw replies
    #[arg(long)]
    raw: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Initialize config file
    #[arg(long)]
    init_config: bool,
}

/// Workspace pieces the REPL needs besides the agent
struct Workspace {
    root: PathBuf,
    ignore: Arc<IgnoreRules>,
    raw: bool,
}

impl Workspace {
    /// Re-render the file tree into the agent; returns the entry count
    fn refresh(&self, agent: &mut Agent) -> usize {
        let snapshot = tree::render_tree(&self.root, &self.ignore);
        let entries = snapshot.lines().count().saturating_sub(1);
        agent.refresh_file_tree(snapshot);
        entries
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Setup tracing
    if args.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("tars=debug,tars_agent=debug,tars_ai=debug")
            .with_writer(io::stderr)
            .init();
    }

    // Initialize config and exit
    if args.init_config {
        match config::Config::init() {
            Ok(path) => {
                println!("Config file created at: {}", path.display());
                println!("\nExample config:\n{}", config::example_config());
            }
            Err(e) => {
                eprintln!("Error creating config: {}", e);
                std::process::exit(1);
            }
        }
        return Ok(());
    }

    let cfg = config::Config::load();

    if let Some(ref dir) = args.working_dir {
        std::env::set_current_dir(dir)?;
    }
    let root = std::env::current_dir()?.canonicalize()?;

    // CLI args take precedence over the config file
    let model = args
        .model
        .or(cfg.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    let max_tokens = args
        .max_tokens
        .or(cfg.max_context_tokens)
        .unwrap_or(DEFAULT_MAX_TOKENS);
    let shell_timeout = cfg.shell_timeout().unwrap_or(tools::DEFAULT_SHELL_TIMEOUT);

    let Some(api_key) = cfg.api_key() else {
        print_auth_help();
        std::process::exit(1);
    };

    let gateway = Arc::new(GoogleGateway::new(api_key).with_model(model.clone()));
    let config = AgentConfig {
        max_tokens,
        ..Default::default()
    };
    let mut agent = Agent::new(config, gateway, root.clone());

    let ignore = Arc::new(IgnoreRules::load(&root));
    agent.set_tools(tools::all_tools(&root, Arc::clone(&ignore), shell_timeout));

    let workspace = Workspace {
        root,
        ignore,
        raw: args.raw,
    };
    workspace.refresh(&mut agent);
    tracing::debug!(root = %workspace.root.display(), %model, max_tokens, "Workspace ready");

    // Non-interactive mode
    if let Some(command) = args.command {
        agent.set_mode(args.mode.or(cfg.mode).unwrap_or_default());
        return run_command(&mut agent, &command, &workspace).await;
    }

    let input = spawn_input_reader();
    run_interactive(&mut agent, args.mode.or(cfg.mode), &model, &workspace, input).await
}

fn print_auth_help() {
    eprintln!("Error: No API key found for Gemini");
    eprintln!();
    eprintln!("Set your API key with: export GEMINI_API_KEY=your-key");
    eprintln!("Or add it to config file: tars --init-config");
}

async fn run_command(agent: &mut Agent, command: &str, workspace: &Workspace) -> anyhow::Result<()> {
    println!("tars> {}", command);
    println!();

    let printer = ui::spawn_event_printer(agent.subscribe(), workspace.raw);
    let result = agent.process_query(command).await;
    printer.await.ok();

    match result {
        Ok(outcome) => {
            print_outcome(&outcome);
            Ok(())
        }
        Err(e) if e.is_auth() => {
            print_auth_help();
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

/// Lines from stdin, read on a background task so input keeps flowing
/// while a query runs
fn spawn_input_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

fn prompt_marker() {
    print!("❯ ");
    io::stdout().flush().ok();
}

/// Ask for the starting mode; blank input picks agent
async fn choose_mode(input: &mut mpsc::UnboundedReceiver<String>) -> Option<Mode> {
    println!("Choose a starting mode:");
    println!("  1) agent     read, edit and run commands");
    println!("  2) planning  read-only, produce a plan");
    println!("  3) ask       read-only, answer questions");
    loop {
        prompt_marker();
        let line = input.recv().await?;
        let choice = match line.trim() {
            "" | "1" => Ok(Mode::Agent),
            "2" => Ok(Mode::Planning),
            "3" => Ok(Mode::Ask),
            other => other.parse::<Mode>(),
        };
        match choice {
            Ok(mode) => return Some(mode),
            Err(e) => println!("✗ {}", e),
        }
    }
}

async fn run_interactive(
    agent: &mut Agent,
    mode: Option<Mode>,
    model: &str,
    workspace: &Workspace,
    mut input: mpsc::UnboundedReceiver<String>,
) -> anyhow::Result<()> {
    // Show minimal startup info (only if TTY)
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        eprintln!("tars ({}) in {}", model, workspace.root.display());
        eprintln!();
    }

    let mode = match mode {
        Some(mode) => mode,
        None => match choose_mode(&mut input).await {
            Some(mode) => mode,
            None => return Ok(()),
        },
    };
    agent.set_mode(mode);

    loop {
        println!();
        if let Some(list) = agent.task_list() {
            println!("{}", ui::render_task_list(list));
        }
        println!("{}", ui::status_bar(&agent.status()));
        prompt_marker();

        let line = tokio::select! {
            line = input.recv() => match line {
                Some(line) => line,
                // EOF
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nGoodbye!");
                return Ok(());
            }
        };

        let query = line.trim();
        if query.is_empty() {
            continue;
        }

        if let Some(result) = commands::execute_command(query, agent) {
            match result {
                CommandResult::Clear => {
                    agent.clear_history();
                    println!("Started a fresh conversation window.");
                }
                CommandResult::ChangeMode(mode) => {
                    agent.set_mode(mode);
                    println!("{}", commands::switched_message(mode));
                }
                CommandResult::Refresh => {
                    let entries = workspace.refresh(agent);
                    println!("Refreshed file tree ({} entries).", entries);
                }
                CommandResult::Message(msg) => {
                    println!("{}", msg);
                }
                CommandResult::Exit => {
                    println!("Goodbye!");
                    break;
                }
                CommandResult::Unknown(cmd) => {
                    println!("{}", commands::unknown_message(&cmd));
                }
            }
            continue;
        }

        println!();
        let printer = ui::spawn_event_printer(agent.subscribe(), workspace.raw);
        let handle = agent.handle();

        let result = {
            let running = agent.process_query(query);
            tokio::pin!(running);
            loop {
                tokio::select! {
                    result = &mut running => break Some(result),
                    Some(typed) = input.recv() => forward_input(&handle, &typed),
                    _ = tokio::signal::ctrl_c() => break None,
                }
            }
        };

        let Some(result) = result else {
            printer.abort();
            println!("\nGoodbye!");
            return Ok(());
        };
        printer.await.ok();

        match result {
            Ok(outcome) => print_outcome(&outcome),
            Err(e) if e.is_auth() => {
                print_auth_help();
                std::process::exit(1);
            }
            // already shown by the event printer
            Err(e) => tracing::debug!("Query failed: {}", e),
        }
    }

    Ok(())
}

/// Route a line typed while a query is running
fn forward_input(handle: &AgentHandle, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }

    if let Some(rest) = line.strip_prefix(':') {
        let mut parts = rest.split_whitespace();
        let command = parts.next().unwrap_or("").to_lowercase();
        let args = parts.next().unwrap_or("");
        if matches!(command.as_str(), "mode" | "m") && !args.is_empty() {
            match args.parse::<Mode>() {
                Ok(mode) => {
                    handle.set_mode(mode);
                    println!("{}", commands::switched_message(mode));
                }
                Err(e) => println!("✗ {}", e),
            }
        } else {
            println!("[Only :mode <name> works while the agent is busy]");
        }
        return;
    }

    handle.enqueue_message(line);
    println!("[Queued: the agent will see this after the current tool]");
}

fn print_outcome(outcome: &TurnOutcome) {
    if let TurnOutcome::TurnLimit = outcome {
        println!("[Stopped: turn limit reached without a final answer]");
    }
}
