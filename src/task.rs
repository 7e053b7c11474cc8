//! Task wrapping and the caller-side result handle.
//!
//! A [`Task`] is the unit the queue carries: an opaque callable plus an
//! optional cancel hook. Tasks created by `submit` resolve a one-shot result
//! channel exactly once, either from the worker that ran them or from the
//! pool code that rejected them; tasks created by `post` carry no channel.

use crate::error::TaskError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Extracts a printable message from a panic payload.
pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        String::from("unknown panic payload")
    }
}

/// An owned unit of work. Exactly one of [`execute`](Task::execute) or
/// [`cancel`](Task::cancel) consumes it.
pub(crate) struct Task {
    run: Box<dyn FnOnce() -> bool + Send + 'static>,
    cancel: Option<Box<dyn FnOnce(TaskError) + Send + 'static>>,
}

impl Task {
    /// Wraps a value-returning closure and pairs it with the handle that
    /// will observe its outcome.
    pub(crate) fn with_handle<F, T>(f: F) -> (Task, TaskHandle<T>)
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let reject_tx = tx.clone();
        let run = Box::new(move || {
            let outcome = panic::catch_unwind(AssertUnwindSafe(f));
            let ok = outcome.is_ok();
            // The handle may already be dropped; that is a legal way to
            // ignore a result.
            let _ = tx.send(outcome.map_err(|payload| TaskError::Panicked(panic_message(payload))));
            ok
        });
        let cancel = Box::new(move |err: TaskError| {
            let _ = reject_tx.send(Err(err));
        });
        (
            Task {
                run,
                cancel: Some(cancel),
            },
            TaskHandle { receiver: rx },
        )
    }

    /// Wraps a fire-and-forget closure. Rejections of such tasks are only
    /// visible through the pool counters.
    pub(crate) fn detached<F>(f: F) -> Task
    where
        F: FnOnce() + Send + 'static,
    {
        Task {
            run: Box::new(move || panic::catch_unwind(AssertUnwindSafe(f)).is_ok()),
            cancel: None,
        }
    }

    /// Runs the task, capturing any panic. Returns whether the closure
    /// completed without panicking.
    pub(crate) fn execute(self) -> bool {
        (self.run)()
    }

    /// Resolves the task's handle with a rejection without running it.
    pub(crate) fn cancel(self, err: TaskError) {
        if let Some(cancel) = self.cancel {
            cancel(err);
        }
    }
}

/// Caller-side handle to a submitted task's outcome.
///
/// The handle resolves exactly once: with the closure's value, with the
/// panic it raised, or with the rejection that kept it from running.
/// Dropping the handle discards the outcome.
///
/// # Example
///
/// ```no_run
/// use dynpool::ThreadPool;
///
/// let pool = ThreadPool::new(2, 64);
/// pool.start();
/// let handle = pool.submit(|| 7 + 5);
/// assert_eq!(handle.join().unwrap(), 12);
/// pool.stop(dynpool::StopMode::Graceful);
/// ```
pub struct TaskHandle<T> {
    receiver: Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    /// Builds a handle that is already resolved with `err`.
    pub(crate) fn rejected(err: TaskError) -> TaskHandle<T> {
        let (tx, rx) = mpsc::channel();
        let _ = tx.send(Err(err));
        TaskHandle { receiver: rx }
    }

    /// Blocks until the task resolves.
    pub fn join(self) -> Result<T, TaskError> {
        self.receiver
            .recv()
            .unwrap_or(Err(TaskError::Cancelled))
    }

    /// Returns the outcome if it is already available.
    pub fn try_join(&self) -> Option<Result<T, TaskError>> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(TaskError::Cancelled)),
        }
    }

    /// Waits up to `timeout` for the outcome.
    pub fn join_timeout(&self, timeout: Duration) -> Option<Result<T, TaskError>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => Some(Err(TaskError::Cancelled)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_resolves_handle() {
        let (task, handle) = Task::with_handle(|| 21 * 2);
        assert!(task.execute());
        assert_eq!(handle.join().unwrap(), 42);
    }

    #[test]
    fn test_panic_is_captured() {
        let (task, handle) = Task::with_handle(|| -> u32 { panic!("boom") });
        assert!(!task.execute());
        assert_eq!(handle.join(), Err(TaskError::Panicked("boom".into())));
    }

    #[test]
    fn test_cancel_resolves_handle() {
        let (task, handle) = Task::with_handle(|| 1);
        task.cancel(TaskError::Cancelled);
        assert_eq!(handle.join(), Err(TaskError::Cancelled));
    }

    #[test]
    fn test_dropped_handle_is_harmless() {
        let (task, handle) = Task::with_handle(|| 5);
        drop(handle);
        assert!(task.execute());
    }

    #[test]
    fn test_try_join_before_resolution() {
        let (task, handle) = Task::with_handle(|| 9);
        assert!(handle.try_join().is_none());
        assert!(task.execute());
        assert_eq!(handle.try_join(), Some(Ok(9)));
    }

    #[test]
    fn test_rejected_handle() {
        let handle = TaskHandle::<u32>::rejected(TaskError::Discarded);
        let err = handle.join().unwrap_err();
        assert_eq!(err, TaskError::Discarded);
        assert!(err.is_rejection());
        assert!(!TaskError::Panicked("x".into()).is_rejection());
    }
}
