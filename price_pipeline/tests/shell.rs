//! Lifecycle commands and deferred close.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{ManualFeed, WAIT, update};
use price_pipeline::{
    DispatchMode, LifecycleCommand, PipelineConfig, PipelineController, PipelineState,
    PresentationContext, Shell, ShellFlow,
};

fn shell(feed: Arc<ManualFeed>, ui: &PresentationContext) -> Shell {
    let config = PipelineConfig::default().with_mode(DispatchMode::Buffered);
    Shell::new(PipelineController::new(feed, ui.dispatcher(), config))
}

#[test]
fn commands_parse_case_insensitively() {
    assert_eq!("START".parse::<LifecycleCommand>().unwrap(), LifecycleCommand::Start);
    assert_eq!("exit".parse::<LifecycleCommand>().unwrap(), LifecycleCommand::Exit);
    assert!("restart".parse::<LifecycleCommand>().is_err());
}

#[test]
fn start_stop_leave_process_running() {
    let ui = PresentationContext::new().unwrap();
    let mut shell = shell(ManualFeed::new(), &ui);

    assert_eq!(shell.handle(LifecycleCommand::Start), ShellFlow::Continue);
    assert_eq!(shell.controller().state(), PipelineState::Running);
    assert_eq!(shell.handle(LifecycleCommand::Stop), ShellFlow::Continue);
    assert_eq!(shell.handle(LifecycleCommand::Stop), ShellFlow::Continue);
    assert_eq!(shell.controller().state(), PipelineState::Stopped);
    assert!(!shell.is_closing());
}

#[test]
fn exit_terminates_after_buffered_updates_are_applied() {
    let ui = PresentationContext::new().unwrap();
    let feed = ManualFeed::new();
    let mut shell = shell(Arc::clone(&feed), &ui);

    shell.handle(LifecycleCommand::Start);
    feed.emit(update("A", 9, 10, 11, 11));
    feed.emit(update("B", 9, 10, 11, 12));
    assert!(common::wait_for(|| shell.controller().stats().received == 2));

    shell.handle(LifecycleCommand::Exit);
    assert!(ui.pump_until(WAIT, |_| shell.poll() == ShellFlow::Terminate));
    assert_eq!(ui.snapshot().unwrap().len(), 2);
}

#[test]
fn second_close_request_is_ignored() {
    let ui = PresentationContext::new().unwrap();
    let mut shell = shell(ManualFeed::new(), &ui);
    shell.handle(LifecycleCommand::Start);

    assert!(shell.request_close());
    assert!(!shell.request_close());
    shell.handle(LifecycleCommand::Start);
    assert_eq!(shell.controller().state(), PipelineState::Stopped);
    assert_eq!(shell.controller().cycle(), 1);
    assert!(ui.pump_until(WAIT, |_| shell.poll() == ShellFlow::Terminate));
}

#[test]
fn close_gives_up_on_stuck_workers_after_grace() {
    let ui = PresentationContext::new().unwrap();
    let feed = ManualFeed::new();
    let mut shell = shell(Arc::clone(&feed), &ui).with_close_grace(Duration::from_millis(50));

    shell.handle(LifecycleCommand::Start);
    feed.emit(update("A", 9, 10, 11, 11));
    assert!(common::wait_for(|| shell.controller().stats().received == 1));

    // The consumer is blocked on the unpumped presentation thread.
    assert!(shell.request_close());
    assert_eq!(shell.poll(), ShellFlow::Continue);
    std::thread::sleep(Duration::from_millis(60));
    assert_eq!(shell.poll(), ShellFlow::Terminate);

    ui.pump();
}
