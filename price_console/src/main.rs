//! Price Console — a terminal front end for the live price pipeline.
//!
//! The main thread is the presentation context: it owns the live view, runs
//! the merge jobs handed over by the pipeline workers and reacts to operator
//! input. Commands are typed on stdin (`start`, `stop`, `exit`, `show`, `dump`,
//! `clear`, `status`, `help`); Ctrl+C or end of input requests a close, which
//! stops the pipeline and exits once its workers are done.
//!
//! Usage example (CLI):
//! ```bash
//! price_console --settings ./pipeline.conf --autostart
//! price_console --use-message-queue true --replay ./session.csv --repeat
//! ```
//!
//! Settings are `key=value` lines; `PRICE_<Key>` environment variables override
//! them. See `price_common::settings` for the keys.
#![warn(missing_docs)]
mod args;
mod input;
mod render;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::Parser;
use crossbeam_channel::{TryRecvError, unbounded};
use log::{error, info, warn};
use price_common::settings::USE_MESSAGE_QUEUE;
use price_common::{PipelineError, Result, Settings};
use price_pipeline::{
    FeedConfig, LifecycleCommand, PipelineConfig, PipelineController, PresentationContext,
    PriceFeed, ReplayFeed, Shell, ShellFlow, SimulatedFeed,
};

use crate::args::Args;
use crate::input::{ConsoleCommand, HELP, Input, ViewCommand};

/// How long the loop waits for merge jobs before checking input.
const PUMP_INTERVAL: Duration = Duration::from_millis(50);
/// Minimum spacing of automatic table refreshes.
const RENDER_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> Result<(), PipelineError> {
    init_logger();
    let args = Args::parse();

    let settings = load_settings(&args)?;
    let pipeline_config = PipelineConfig::from_settings(&settings);
    let feed_config = FeedConfig::from_settings(&settings);
    let feed = build_feed(&args, &feed_config)?;
    info!(
        "Dispatch mode: {}, queue: {:?}",
        pipeline_config.mode, pipeline_config.queue_capacity
    );

    let ui = PresentationContext::new()?;
    let controller = PipelineController::new(feed, ui.dispatcher(), pipeline_config);
    let mut shell = Shell::new(controller);

    let (input_tx, input_rx) = unbounded::<Input>();
    input::install_close_handler(input_tx.clone())?;
    input::spawn_stdin_reader(input_tx)?;

    println!("{}", HELP);
    if args.autostart {
        shell.handle(LifecycleCommand::Start);
    }

    let mut rendered_revision = 0u64;
    let mut last_render = Instant::now();
    loop {
        ui.pump_timeout(PUMP_INTERVAL);

        loop {
            match input_rx.try_recv() {
                Ok(Input::Command(ConsoleCommand::Lifecycle(command))) => {
                    shell.handle(command);
                }
                Ok(Input::Command(ConsoleCommand::View(command))) => {
                    run_view_command(command, &ui, &shell);
                }
                Ok(Input::Close) => {
                    shell.request_close();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    shell.request_close();
                    break;
                }
            }
        }

        if shell.poll() == ShellFlow::Terminate {
            break;
        }

        let revision = ui.read(|view| view.revision())?;
        if revision != rendered_revision && last_render.elapsed() >= RENDER_INTERVAL {
            print_table(&ui);
            rendered_revision = revision;
            last_render = Instant::now();
        }
    }

    print_table(&ui);
    info!("Bye");
    Ok(())
}

fn init_logger() {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
}

/// Settings file (if any), then `PRICE_*` environment, then CLI flags.
fn load_settings(args: &Args) -> Result<Settings> {
    let settings = match &args.settings {
        Some(path) => {
            info!("Loading settings from {}", path.display());
            Settings::load(path)?
        }
        None => Settings::new(),
    };
    let mut settings = settings.with_env_overrides();
    if let Some(use_queue) = args.use_message_queue {
        settings.set(USE_MESSAGE_QUEUE, use_queue.to_string());
    }
    Ok(settings)
}

fn build_feed(args: &Args, config: &FeedConfig) -> Result<Arc<dyn PriceFeed>> {
    match &args.replay {
        Some(path) => {
            let feed = ReplayFeed::from_path(path)?
                .with_interval(config.interval)
                .with_repeat(args.repeat);
            info!("Replaying {} updates from {}", feed.len(), path.display());
            Ok(Arc::new(feed))
        }
        None => {
            info!("Simulating prices for {:?}", config.symbols);
            Ok(Arc::new(SimulatedFeed::new(config.symbols.clone(), config.interval)))
        }
    }
}

fn run_view_command(command: ViewCommand, ui: &PresentationContext, shell: &Shell) {
    match command {
        ViewCommand::Show => print_table(ui),
        ViewCommand::Dump => match ui.read(|view| view.to_json_bytes()) {
            Ok(Ok(json)) => println!("{}", String::from_utf8_lossy(&json)),
            Ok(Err(e)) | Err(e) => error!("Failed to dump view: {}", e),
        },
        ViewCommand::Clear => {
            if let Err(e) = ui.update(|view| view.clear()) {
                warn!("Failed to clear view: {}", e);
            }
        }
        ViewCommand::Status => println!("{}", render::status_line(shell.controller())),
        ViewCommand::Help => println!("{}", HELP),
    }
}

fn print_table(ui: &PresentationContext) {
    match ui.snapshot() {
        Ok(records) => print!("{}", render::price_table(&records, Utc::now())),
        Err(e) => warn!("Failed to read view: {}", e),
    }
}
