use flume::{Receiver, RecvTimeoutError, Sender};
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Pending,
    Fired,
    Cancelled,
}

/// ScheduledTask is a deferred operation running on its own thread that can be cancelled at any
/// time before it fires. Firing and cancelling both have to claim the task through a single
/// compare-exchange on a shared flag, so exactly one of them wins:
/// * `cancel` succeeds only while the task is pending, after which the task never fires and its
/// remaining sleeps return immediately
/// * `TaskToken::claim` succeeds only while the task is pending, after which cancelling fails
#[derive(Debug)]
pub struct ScheduledTask {
    name: String,
    claim: Arc<AtomicU8>,
    wake_tx: Sender<()>,
}

/// TaskToken is handed to the body of a scheduled task. It provides cancellable sleeps and the
/// firing side of the claim.
#[derive(Debug)]
pub struct TaskToken {
    claim: Arc<AtomicU8>,
    wake_rx: Receiver<()>,
}

impl ScheduledTask {
    /// spawn starts the task body on a new named thread. The thread is detached: it ends when the
    /// body returns, which happens at the latest after the body's next sleep once the task is
    /// cancelled or its handle is dropped.
    pub fn spawn<F>(name: &str, body: F) -> io::Result<ScheduledTask>
    where
        F: FnOnce(TaskToken) + Send + 'static,
    {
        let claim = Arc::new(AtomicU8::new(PENDING));
        let (wake_tx, wake_rx) = flume::bounded(1);

        let token = TaskToken {
            claim: Arc::clone(&claim),
            wake_rx,
        };

        thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || body(token))?;

        Ok(ScheduledTask {
            name: name.to_owned(),
            claim,
            wake_tx,
        })
    }

    /// cancel returns true if the task was still pending. In that case it will never fire.
    pub fn cancel(&self) -> bool {
        let cancelled = self
            .claim
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();

        if cancelled {
            // wake the task if it is currently sleeping, a full channel means it is already woken
            self.wake_tx.try_send(()).ok();
        }
        cancelled
    }

    pub fn state(&self) -> TaskState {
        decode(self.claim.load(Ordering::Acquire))
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl TaskToken {
    /// sleep waits for the given duration and returns true if the task is still pending
    /// afterwards. It returns false as soon as the task is cancelled or its handle is dropped.
    pub fn sleep(&self, duration: Duration) -> bool {
        match self.wake_rx.recv_timeout(duration) {
            Err(RecvTimeoutError::Timeout) => self.is_pending(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.claim.load(Ordering::Acquire) == PENDING
    }

    /// claim marks the task as fired. It returns false if the task was cancelled before.
    pub fn claim(&self) -> bool {
        self.claim
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

fn decode(raw: u8) -> TaskState {
    match raw {
        PENDING => TaskState::Pending,
        FIRED => TaskState::Fired,
        _ => TaskState::Cancelled,
    }
}
