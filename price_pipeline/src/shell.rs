//! User-facing lifecycle commands.
//!
//! The `Shell` runs on the presentation thread and turns Start, Stop, Exit and
//! window-close requests into controller transitions. Exit and close never end
//! the process on the spot: they stop the pipeline and report `Terminate` from
//! `poll` only once the controller's workers are gone, or the grace period has
//! run out. Repeated close requests while one is pending are ignored.
use std::time::{Duration, Instant};

use log::{info, warn};
use strum_macros::{Display, EnumString};

use crate::controller::PipelineController;

/// Longest wait for workers after a close request.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// Lifecycle trigger issued by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive, serialize_all = "lowercase")]
pub enum LifecycleCommand {
    /// Begin streaming prices.
    Start,
    /// Stop streaming; the view is kept.
    Stop,
    /// Stop, then terminate once cleanup is done.
    Exit,
}

/// What the presentation loop should do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellFlow {
    /// Keep running.
    Continue,
    /// Cleanup finished; the process may exit.
    Terminate,
}

/// Lifecycle command handler wrapping a controller.
pub struct Shell {
    controller: PipelineController,
    close_deadline: Option<Instant>,
    close_grace: Duration,
}

impl Shell {
    /// Wrap `controller` with the default close grace period.
    pub fn new(controller: PipelineController) -> Self {
        Self {
            controller,
            close_deadline: None,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    /// Change how long a close waits for workers before giving up on them.
    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }

    /// Apply a user command.
    pub fn handle(&mut self, command: LifecycleCommand) -> ShellFlow {
        match command {
            LifecycleCommand::Start => {
                if self.is_closing() {
                    info!("Start ignored, shutdown in progress");
                } else if let Err(e) = self.controller.start() {
                    warn!("Pipeline failed to start: {}", e);
                }
            }
            LifecycleCommand::Stop => self.controller.stop(),
            LifecycleCommand::Exit => {
                self.request_close();
            }
        }
        self.poll()
    }

    /// Begin an orderly shutdown. Returns `false` if one is already pending.
    pub fn request_close(&mut self) -> bool {
        if self.is_closing() {
            info!("Close already in progress");
            return false;
        }
        info!("Close requested, stopping pipeline");
        self.close_deadline = Some(Instant::now() + self.close_grace);
        self.controller.stop();
        true
    }

    /// Whether a close request is pending.
    pub fn is_closing(&self) -> bool {
        self.close_deadline.is_some()
    }

    /// `Terminate` once a pending close has finished its cleanup.
    pub fn poll(&self) -> ShellFlow {
        let Some(deadline) = self.close_deadline else {
            return ShellFlow::Continue;
        };
        if self.controller.is_idle() {
            info!("Pipeline workers finished, ready to exit");
            return ShellFlow::Terminate;
        }
        if Instant::now() >= deadline {
            warn!(
                "{} pipeline workers still running after {:?}, exiting anyway",
                self.controller.live_workers(),
                self.close_grace
            );
            return ShellFlow::Terminate;
        }
        ShellFlow::Continue
    }

    /// The wrapped controller.
    pub fn controller(&self) -> &PipelineController {
        &self.controller
    }
}
