//! Simulated agent run drawn with a live execution tree.
//!
//! Each phase issues a model request and then fans out concurrent tool calls,
//! one of which streams subprocess output.
//!
//! ```bash
//! RUST_LOG=livetree=debug cargo run --bin livetree-demo -- --mode verbose --stderr
//! ```

use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use livetree::{
    DisplayConfig, DisplayMode, EventEmitter, EventId, EventSink, ExecutionEvent, LiveDisplay,
    OutputTarget,
};
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const TOOLS: [&str; 4] = ["scan", "read_file", "run_tests", "search"];
const REPOS: [&str; 3] = ["os-core", "billing", "gateway"];

#[derive(Parser)]
#[command(
    name = "livetree-demo",
    version,
    about = "Simulated agent run drawn as a live execution tree"
)]
struct Cli {
    /// Rendering density: minimal, default or verbose.
    #[arg(short, long)]
    mode: Option<DisplayMode>,

    /// Erase the display when the run finishes.
    #[arg(short, long)]
    transient: bool,

    /// Number of reasoning phases to simulate.
    #[arg(short, long, default_value_t = 3)]
    phases: u32,

    /// Concurrent tool calls per phase.
    #[arg(long, default_value_t = 3)]
    tools: u32,

    /// Draw on stderr instead of stdout.
    #[arg(long)]
    stderr: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("livetree-demo: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so they never interleave with the live region on
/// stdout. Defaults to `warn` when `RUST_LOG` is unset.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

async fn run(cli: Cli) -> livetree::Result<()> {
    let mut config = DisplayConfig::from_env()?;
    if let Some(mode) = cli.mode {
        config = config.mode(mode);
    }
    if cli.transient {
        config = config.transient();
    }
    if cli.stderr {
        config = config.target(OutputTarget::Stderr);
    }

    let (emitter, queue) = EventEmitter::channel();
    emitter.set_interactive_mode(true, true);

    let mut display = LiveDisplay::new(queue, config);
    let started = Instant::now();
    display.run(simulate(emitter, cli.phases, cli.tools)).await?;

    let tools = display.inspect(|tree| tree.total_tool_calls()).await;
    info!(tools, elapsed_ms = started.elapsed().as_millis() as u64, "Demo finished");
    Ok(())
}

async fn simulate(emitter: EventEmitter, phases: u32, tools: u32) {
    for phase in 1..=phases {
        let request = EventId::new();
        emitter.emit(ExecutionEvent::model_request(request.clone(), phase * 2 + 1));
        sleep(Duration::from_millis(400)).await;
        emitter.emit(
            ExecutionEvent::model_response(request.clone())
                .with_duration(Duration::from_millis(400)),
        );

        let mut calls = JoinSet::new();
        for tool in 0..tools {
            calls.spawn(call_tool(emitter.clone(), request.clone(), phase, tool, tools));
        }
        while calls.join_next().await.is_some() {}
    }
}

async fn call_tool(emitter: EventEmitter, parent: EventId, phase: u32, tool: u32, tools: u32) {
    let id = EventId::new();
    let name = TOOLS[(phase + tool) as usize % TOOLS.len()];
    let started = Instant::now();

    emitter.emit(
        ExecutionEvent::tool_started(id.clone(), name)
            .with_parent(parent)
            .with_argument("repo", REPOS[tool as usize % REPOS.len()]),
    );

    if name == "run_tests" {
        let output = format!("{id}-out");
        for line in ["compiling", "running 12 tests", "test result: ok. 12 passed"] {
            emitter.emit(
                ExecutionEvent::subprocess_output(output.as_str(), "cargo test", line)
                    .with_parent(id.clone()),
            );
            sleep(Duration::from_millis(250)).await;
        }
    } else {
        sleep(Duration::from_millis(300 + 250 * u64::from(tool))).await;
    }

    let event = if phase == 2 && tool + 1 == tools {
        ExecutionEvent::tool_errored(id, "rate limited")
    } else {
        ExecutionEvent::tool_completed(id).with_summary(format!("{} results", 3 + tool))
    };
    emitter.emit(event.with_duration(started.elapsed()));
}
