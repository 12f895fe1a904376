//! Single-writer handoff of live view mutations to the presentation thread.
//!
//! The `LiveView` is owned by exactly one thread, the presentation context. It
//! is stored in that thread's local storage and is only ever touched from
//! there, so no lock guards it. Other threads reach it through a cloneable
//! `Dispatcher` that submits jobs over a `crossbeam_channel`:
//!
//! - `Dispatcher::invoke` waits until the job ran and returns its value.
//! - `Dispatcher::post` returns immediately.
//!
//! Both run the job in place when called on the presentation thread itself.
//! Once the `PresentationContext` is dropped every submission fails with
//! `PipelineError::ContextClosed`, which callers log and swallow.
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};
use price_common::{PipelineError, PriceRecord, Result};

use crate::model::live_view::{LiveView, MergeOutcome};

/// Work executed against the live view on the presentation thread.
pub type ViewJob = Box<dyn FnOnce(&mut LiveView) + Send>;

thread_local! {
    static OWNED_VIEW: RefCell<Option<LiveView>> = const { RefCell::new(None) };
}

/// Runs `job` against this thread's view, handing it back if the view is
/// already borrowed by an outer job.
fn run_in_place(job: ViewJob) -> Result<Option<ViewJob>> {
    OWNED_VIEW
        .try_with(|slot| {
            let Ok(mut guard) = slot.try_borrow_mut() else {
                return Ok(Some(job));
            };
            match guard.as_mut() {
                Some(view) => {
                    job(view);
                    Ok(None)
                }
                None => Err(PipelineError::ContextClosed),
            }
        })
        .map_err(|_| PipelineError::ContextClosed)?
}

/// Owner of the live view. Lives on, and never leaves, the presentation thread.
pub struct PresentationContext {
    rx: Receiver<ViewJob>,
    dispatcher: Dispatcher,
    _owner_thread_only: PhantomData<Rc<()>>,
}

impl PresentationContext {
    /// Install an empty live view on the calling thread.
    ///
    /// Fails if the thread already hosts a presentation context.
    pub fn new() -> Result<Self> {
        Self::with_view(LiveView::new())
    }

    /// Install `view` on the calling thread.
    pub fn with_view(view: LiveView) -> Result<Self> {
        OWNED_VIEW.with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.is_some() {
                return Err(PipelineError::Format(
                    "presentation context already exists on this thread".to_string(),
                ));
            }
            *slot = Some(view);
            Ok(())
        })?;
        let (tx, rx) = unbounded();
        Ok(Self {
            rx,
            dispatcher: Dispatcher {
                tx,
                owner: thread::current().id(),
            },
            _owner_thread_only: PhantomData,
        })
    }

    /// Handle used by other threads to reach the view.
    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }

    /// Run every job already submitted. Returns how many ran.
    pub fn pump(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            self.execute(job);
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for a job, then run it and everything else pending.
    pub fn pump_timeout(&self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => {
                self.execute(job);
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Keep running jobs until `done` holds or `timeout` elapses.
    ///
    /// Returns whether `done` was satisfied.
    pub fn pump_until<F>(&self, timeout: Duration, mut done: F) -> bool
    where
        F: FnMut(&LiveView) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if self.read(&mut done).unwrap_or(false) {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.pump_timeout((deadline - now).min(Duration::from_millis(10)));
        }
    }

    /// Read the view.
    pub fn read<R>(&self, f: impl FnOnce(&LiveView) -> R) -> Result<R> {
        OWNED_VIEW.with(|slot| {
            let guard = slot.try_borrow().map_err(|e| PipelineError::Format(e.to_string()))?;
            guard.as_ref().map(f).ok_or(PipelineError::ContextClosed)
        })
    }

    /// Mutate the view directly, e.g. to clear it.
    pub fn update<R>(&self, f: impl FnOnce(&mut LiveView) -> R) -> Result<R> {
        OWNED_VIEW.with(|slot| {
            let mut guard = slot
                .try_borrow_mut()
                .map_err(|e| PipelineError::Format(e.to_string()))?;
            guard.as_mut().map(f).ok_or(PipelineError::ContextClosed)
        })
    }

    /// Copy of the records in presentation order.
    pub fn snapshot(&self) -> Result<Vec<PriceRecord>> {
        self.read(|view| view.records().to_vec())
    }

    fn execute(&self, job: ViewJob) {
        OWNED_VIEW.with(|slot| {
            if let Some(view) = slot.borrow_mut().as_mut() {
                job(view);
            }
        });
    }
}

impl Drop for PresentationContext {
    fn drop(&mut self) {
        let _ = OWNED_VIEW.try_with(|slot| {
            if let Ok(mut slot) = slot.try_borrow_mut() {
                slot.take();
            }
        });
    }
}

/// Cloneable, thread-safe route to the presentation thread.
#[derive(Clone)]
pub struct Dispatcher {
    tx: Sender<ViewJob>,
    owner: ThreadId,
}

impl Dispatcher {
    /// Whether the caller is already on the presentation thread.
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Run `f` against the view and wait for its result.
    ///
    /// On the presentation thread `f` runs directly; calling this from inside
    /// another job is an error.
    pub fn invoke<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut LiveView) -> R + Send + 'static,
        R: Send + 'static,
    {
        if self.is_owner_thread() {
            return OWNED_VIEW
                .try_with(|slot| {
                    let mut guard = slot.try_borrow_mut().map_err(|_| {
                        PipelineError::Format("re-entrant invoke on the presentation thread".to_string())
                    })?;
                    let view = guard.as_mut().ok_or(PipelineError::ContextClosed)?;
                    Ok(f(view))
                })
                .map_err(|_| PipelineError::ContextClosed)?;
        }

        let (reply_tx, reply_rx) = bounded(1);
        let job: ViewJob = Box::new(move |view| {
            let _ = reply_tx.send(f(view));
        });
        self.tx.send(job).map_err(|_| PipelineError::ContextClosed)?;
        reply_rx.recv().map_err(|_| PipelineError::ContextClosed)
    }

    /// Submit `f` without waiting.
    ///
    /// On the presentation thread `f` runs directly, or right after the
    /// current job when called from inside one.
    pub fn post<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut LiveView) + Send + 'static,
    {
        let mut job: ViewJob = Box::new(f);
        if self.is_owner_thread() {
            match run_in_place(job)? {
                None => return Ok(()),
                Some(deferred) => job = deferred,
            }
        }
        self.tx.send(job).map_err(|_| PipelineError::ContextClosed)
    }

    /// Merge `record` into the view on the presentation thread.
    pub fn merge(&self, record: PriceRecord) -> Result<MergeOutcome> {
        self.invoke(move |view| view.merge(record))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn record(symbol: &str, bid_qty: i64) -> PriceRecord {
        PriceRecord::new(
            symbol,
            Decimal::from(9),
            Decimal::from(10),
            Decimal::from(bid_qty),
            Decimal::from(11),
        )
    }

    #[test]
    fn owner_thread_merges_in_place() {
        let ui = PresentationContext::new().unwrap();
        let dispatcher = ui.dispatcher();
        assert!(dispatcher.is_owner_thread());
        assert_eq!(dispatcher.merge(record("A", 1)).unwrap(), MergeOutcome::Inserted(0));
        assert_eq!(ui.pump(), 0);
        assert_eq!(ui.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn worker_merge_waits_for_presentation_thread() {
        let ui = PresentationContext::new().unwrap();
        let dispatcher = ui.dispatcher();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&finished);

        let worker = thread::spawn(move || {
            assert!(!dispatcher.is_owner_thread());
            let outcome = dispatcher.merge(record("A", 1));
            flag.store(true, Ordering::SeqCst);
            outcome
        });

        assert!(ui.pump_until(Duration::from_secs(5), |view| view.len() == 1));
        assert_eq!(worker.join().unwrap().unwrap(), MergeOutcome::Inserted(0));
        assert!(finished.load(Ordering::SeqCst));
    }

    #[test]
    fn post_from_inside_job_runs_after_it() {
        let ui = PresentationContext::new().unwrap();
        let dispatcher = ui.dispatcher();
        let inner = dispatcher.clone();
        dispatcher
            .post(move |view| {
                view.merge(record("A", 1)).unwrap();
                inner
                    .post(|view| {
                        view.merge(record("B", 1)).unwrap();
                    })
                    .unwrap();
                assert_eq!(view.len(), 1);
            })
            .unwrap();
        assert_eq!(ui.pump(), 1);
        let symbols: Vec<String> = ui.snapshot().unwrap().into_iter().map(|r| r.symbol).collect();
        assert_eq!(symbols, vec!["A", "B"]);
    }

    #[test]
    fn second_context_on_same_thread_is_refused() {
        let _ui = PresentationContext::new().unwrap();
        assert!(PresentationContext::new().is_err());
    }

    #[test]
    fn dispatch_after_teardown_is_an_error() {
        let ui = PresentationContext::new().unwrap();
        let dispatcher = ui.dispatcher();
        drop(ui);

        let worker = dispatcher.clone();
        let remote = thread::spawn(move || worker.merge(record("A", 1))).join().unwrap();
        assert!(matches!(remote, Err(PipelineError::ContextClosed)));
        assert!(matches!(dispatcher.merge(record("A", 1)), Err(PipelineError::ContextClosed)));
        assert!(PresentationContext::new().is_ok());
    }
}
