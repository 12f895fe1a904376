//! Operator input: typed commands from stdin and close requests from Ctrl+C.
//!
//! Both sources run off the presentation thread and forward `Input` values over
//! a `crossbeam_channel`; the main loop consumes them between view jobs.
use std::io::{self, BufRead};
use std::str::FromStr;
use std::thread;

use crossbeam_channel::Sender;
use log::{info, warn};
use price_common::{PipelineError, Result};
use price_pipeline::LifecycleCommand;
use strum::{Display, EnumString};

/// Console-only commands acting on the view rather than the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum ViewCommand {
    /// Print the price table.
    Show,
    /// Print the view as JSON.
    Dump,
    /// Forget every instrument.
    Clear,
    /// Print pipeline state and counters.
    Status,
    /// List commands.
    Help,
}

/// One line typed by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Start, stop or exit.
    Lifecycle(LifecycleCommand),
    /// View inspection.
    View(ViewCommand),
}

impl FromStr for ConsoleCommand {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let word = s.trim();
        if let Ok(command) = word.parse::<LifecycleCommand>() {
            return Ok(ConsoleCommand::Lifecycle(command));
        }
        if let Ok(command) = word.parse::<ViewCommand>() {
            return Ok(ConsoleCommand::View(command));
        }
        // `quit` is what people type.
        if word.eq_ignore_ascii_case("quit") {
            return Ok(ConsoleCommand::Lifecycle(LifecycleCommand::Exit));
        }
        Err(format!("unknown command '{}'", word))
    }
}

/// Message delivered to the presentation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A parsed command line.
    Command(ConsoleCommand),
    /// Window-close equivalent: Ctrl+C or end of stdin.
    Close,
}

/// Help text listing every command.
pub const HELP: &str = "commands: start | stop | exit | show | dump | clear | status | help";

/// Spawn a thread forwarding stdin commands to `tx`. End of input becomes `Close`.
pub fn spawn_stdin_reader(tx: Sender<Input>) -> Result<()> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(command) => {
                        if tx.send(Input::Command(command)).is_err() {
                            return;
                        }
                    }
                    Err(e) => warn!("{}. {}", e, HELP),
                }
            }
            info!("Input closed");
            let _ = tx.send(Input::Close);
        })?;
    Ok(())
}

/// Route Ctrl+C to `tx` as a close request.
pub fn install_close_handler(tx: Sender<Input>) -> Result<()> {
    ctrlc::set_handler(move || {
        info!("Ctrl+C received. Closing...");
        let _ = tx.send(Input::Close);
    })
    .map_err(|e| PipelineError::Format(format!("Error setting Ctrl+C handler: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_lifecycle_and_view_commands() {
        assert_eq!(
            " Start ".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Lifecycle(LifecycleCommand::Start)
        );
        assert_eq!(
            "DUMP".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::View(ViewCommand::Dump)
        );
        assert_eq!(
            "quit".parse::<ConsoleCommand>().unwrap(),
            ConsoleCommand::Lifecycle(LifecycleCommand::Exit)
        );
        assert!("launch".parse::<ConsoleCommand>().is_err());
    }
}
