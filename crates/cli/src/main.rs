mod config;
mod error;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, TimeZone};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use audit::{AuditLog, Record, RecordKind};
use host::{
    AnthropicCollaborator, Controller, ControllerConfig, EventBus, Gatekeeper, HostEvent,
    Pipeline, ToolOutcome, ToolRegistry, bridge_process_events,
};
use supervisor::Supervisor;

use config::Config;
use error::{Error, Result};

const SYSTEM_PROMPT: &str =
    "You are Warden, a careful assistant. Use the available tools when they help, \
     and answer concisely.";
const CONFIG_FILE: &str = "warden.toml";

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "A policy-gated tool execution host", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the config file
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive chat session
    Chat,
    /// List registered tools and their policy decisions
    Tools,
    /// Dry-run the policy gate for a tool name
    Check {
        /// Tool name to check
        tool: String,
    },
    /// Show recent audit records
    Log {
        /// Show only the last N records
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Filter by kind (verdict, process, protocol_error)
        #[arg(short, long)]
        kind: Option<String>,
        /// Show all records for one tool instead
        #[arg(short, long)]
        tool: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Some(Commands::Chat) | None => cmd_chat(config).await,
        Some(Commands::Tools) => cmd_tools(config),
        Some(Commands::Check { tool }) => cmd_check(config, &tool),
        Some(Commands::Log { limit, kind, tool }) => cmd_log(limit, kind.as_deref(), tool.as_deref()),
    }
}

async fn cmd_chat(config: Config) -> Result<()> {
    println!("warden v{}", env!("CARGO_PKG_VERSION"));

    let api_key = config.api_key().ok_or(Error::MissingApiKey)?;
    let model =
        std::env::var("WARDEN_MODEL").unwrap_or_else(|_| config.collaborator.model.clone());

    let registry = Arc::new(ToolRegistry::new(config.registered_tools())?);
    let store = Arc::new(config.policy_store()?);
    let supervisor = Arc::new(Supervisor::new(config.supervisor_config()));
    let grace = config.supervisor_config().grace_period;

    let data_dir = dirs_data_dir().unwrap_or_else(|| ".warden".into());
    std::fs::create_dir_all(&data_dir)?;
    let db_path = data_dir.join("audit.db");
    let log = Arc::new(AuditLog::open(&db_path)?);
    println!("Audit trail: {}", db_path.display());

    let events = EventBus::new();
    bridge_process_events(&supervisor, events.clone(), log.clone());
    spawn_event_printer(&events);

    let gatekeeper = Arc::new(Gatekeeper::new(
        store.clone(),
        registry.clone(),
        log.clone(),
        events.clone(),
    ));
    let pipeline = Arc::new(Pipeline::new(
        registry.clone(),
        gatekeeper,
        supervisor.clone(),
        log,
        events.clone(),
    ));

    let collaborator = AnthropicCollaborator::builder(api_key, &model).build();
    let mut controller = Controller::new(
        collaborator,
        pipeline,
        registry.clone(),
        events,
        ControllerConfig::default(),
    )
    .with_system(SYSTEM_PROMPT);

    println!("Model: {model}");
    println!("Tools: {}", registry.len());
    println!("Type 'quit' or Ctrl+D to exit, 'reload' to re-read the policy file.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            // EOF
            break;
        }

        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "quit" || input == "exit" {
            break;
        }
        if input == "reload" {
            if store.reload() {
                println!("Policy reloaded.\n");
            } else {
                println!("Policy not reloaded (no policy_file, or the file is invalid).\n");
            }
            continue;
        }

        match run_turn_interruptible(&mut controller, input).await {
            Ok(response) => {
                println!("\n{response}\n");
            }
            Err(host::Error::Cancelled) => {
                println!("\n(turn cancelled)\n");
            }
            Err(e) => {
                eprintln!("Error: {e}\n");
            }
        }
    }

    supervisor.shutdown(grace).await;
    println!("\nSession ended.");
    Ok(())
}

/// Run one turn, cancelling cleanly on Ctrl+C instead of exiting.
async fn run_turn_interruptible(
    controller: &mut Controller<AnthropicCollaborator>,
    input: &str,
) -> host::Result<String> {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();

    let turn = controller.run_turn(input, cancel);
    tokio::pin!(turn);

    tokio::select! {
        result = &mut turn => result,
        _ = tokio::signal::ctrl_c() => {
            trigger.cancel();
            // The controller reaps outstanding invocations before returning.
            turn.await
        }
    }
}

fn spawn_event_printer(events: &EventBus) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            match event {
                HostEvent::Verdict {
                    tool_name,
                    allowed: false,
                    reason,
                    ..
                } => println!("· denied {tool_name}: {reason}"),
                HostEvent::ToolRequested { tool_name, .. } => {
                    println!("· calling {tool_name}...");
                }
                HostEvent::ToolCompleted {
                    tool_name, outcome, ..
                } => match outcome {
                    ToolOutcome::Success { .. } => println!("· {tool_name} ok"),
                    other => println!("· {tool_name}: {}", other.describe()),
                },
                _ => {}
            }
        }
    });
}

fn cmd_tools(config: Config) -> Result<()> {
    let tools = config.registered_tools();
    if tools.is_empty() {
        println!("No tools registered in {CONFIG_FILE}.");
        return Ok(());
    }

    let policy = config.policy()?;

    println!("{:<24}  {:<8}  {:<20}  DESCRIPTION", "TOOL", "POLICY", "COMMAND");
    println!("{}", "-".repeat(80));

    for tool in tools {
        let (decision, _) = policy.decision_for(&tool.definition.name);
        let command = if tool.launch.args.is_empty() {
            tool.launch.command.clone()
        } else {
            format!("{} {}", tool.launch.command, tool.launch.args.join(" "))
        };
        println!(
            "{:<24}  {:<8}  {:<20}  {}",
            tool.definition.name,
            decision,
            command,
            tool.definition.description.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

fn cmd_check(config: Config, tool: &str) -> Result<()> {
    let registered = config.tools.iter().any(|t| t.name == tool);
    if !registered {
        println!("{tool}: DENY (not registered)");
        return Ok(());
    }

    let policy = config.policy()?;
    let (decision, source) = policy.decision_for(tool);
    println!("{tool}: {} (by {source})", decision.to_string().to_uppercase());
    Ok(())
}

fn cmd_log(limit: usize, kind: Option<&str>, tool: Option<&str>) -> Result<()> {
    let log = open_audit_log()?;

    let records = match tool {
        Some(tool) => log.for_tool(tool)?,
        None => log.recent(limit, kind)?,
    };

    if records.is_empty() {
        println!("No matching audit records.");
        return Ok(());
    }

    for record in records {
        print_record(&record);
    }

    Ok(())
}

fn print_record(record: &Record) {
    let time = Local
        .from_utc_datetime(&record.timestamp.naive_utc())
        .format("%Y-%m-%d %H:%M:%S");

    match &record.kind {
        RecordKind::Verdict {
            tool_name,
            decision,
            rule,
            reason,
            ..
        } => match reason {
            Some(reason) => println!("[{time}] VERDICT {decision} {tool_name} ({rule}): {reason}"),
            None => println!("[{time}] VERDICT {decision} {tool_name} ({rule})"),
        },
        RecordKind::Process {
            invocation,
            tool_name,
            phase,
            status,
        } => {
            let status = status.map(|s| format!(" status={s}")).unwrap_or_default();
            println!("[{time}] PROCESS #{invocation} {tool_name} {phase:?}{status}");
        }
        RecordKind::ProtocolError {
            tool_name,
            detail,
            raw,
            ..
        } => {
            let raw = truncate_display(raw, 120);
            println!("[{time}] PROTOCOL {tool_name}: {detail} raw={raw:?}");
        }
    }
}

/// Truncate for display. Raw protocol-error bytes go through lossy UTF-8
/// conversion and tools may emit any text, so the cut must land on a char
/// boundary, not a byte offset.
fn truncate_display(s: &str, max_bytes: usize) -> String {
    if s.len() <= max_bytes {
        return s.to_string();
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

fn open_audit_log() -> Result<AuditLog> {
    let data_dir = dirs_data_dir().unwrap_or_else(|| ".warden".into());
    let db_path = data_dir.join("audit.db");

    if !db_path.exists() {
        return Err(Error::AuditLogNotFound { path: db_path });
    }

    Ok(AuditLog::open(&db_path)?)
}

fn load_config(path: &PathBuf) -> Result<Config> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        Ok(Config::default_config())
    }
}

fn dirs_data_dir() -> Option<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share/warden"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local/share")))
            .map(|p| p.join("warden"))
    }
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|h| PathBuf::from(h).join("warden"))
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        None
    }
}
