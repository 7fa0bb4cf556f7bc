//! FIFO of "read since" requests served one at a time.

use std::{collections::VecDeque, fmt, future::Future};

use parking_lot::Mutex;
use tracing::*;

use crate::reader::ResumePoint;

#[derive(Debug, Default)]
struct QueueState {
    running: bool,
    queued: VecDeque<ResumePoint>,
}

/// Result of a successful [`ReadQueue::request`] call.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// This caller drained the queue, running `processed` reads.
    Drained { processed: usize },

    /// A read is in flight; the request runs after the ones before it.
    Queued,

    /// A read is in flight and the source is caught up, so the request was
    /// dropped.
    Coalesced,
}

/// Serializes reads keyed by a resume point.
///
/// The caller that finds the queue idle becomes the drainer and runs every
/// queued request in order, including ones that arrive while it drains.
pub struct ReadQueue<F, C> {
    read: F,
    caught_up: C,
    state: Mutex<QueueState>,
}

impl<F, C> fmt::Debug for ReadQueue<F, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadQueue")
            .field("state", &*self.state.lock())
            .finish_non_exhaustive()
    }
}

impl<F, Fut, C, E> ReadQueue<F, C>
where
    F: Fn(ResumePoint) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    C: Fn() -> bool,
{
    /// `caught_up` reports whether the source has no block past the position.
    pub fn new(read: F, caught_up: C) -> Self {
        Self {
            read,
            caught_up,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Number of requests waiting to be read.
    pub fn pending(&self) -> usize {
        self.state.lock().queued.len()
    }

    /// Requests a read starting at `resume`.
    ///
    /// If the read fails the error is returned to the draining caller and the
    /// requests behind it stay queued for the next call.
    pub async fn request(&self, resume: ResumePoint) -> Result<RequestOutcome, E> {
        {
            let mut state = self.state.lock();
            if state.running {
                if (self.caught_up)() {
                    trace!(%resume, "source caught up, dropping read request");
                    return Ok(RequestOutcome::Coalesced);
                }
                state.queued.push_back(resume);
                trace!(%resume, queued = state.queued.len(), "read request queued");
                return Ok(RequestOutcome::Queued);
            }
            state.queued.push_back(resume);
            state.running = true;
        }

        let mut guard = RunningGuard::new(&self.state);
        let mut processed = 0;
        loop {
            // popping and releasing share one lock so no second drainer starts
            // while items remain
            let next = {
                let mut state = self.state.lock();
                match state.queued.pop_front() {
                    Some(next) => next,
                    None => {
                        state.running = false;
                        guard.disarm();
                        break;
                    }
                }
            };

            debug!(resume = %next, "serving read request");
            (self.read)(next).await?;
            processed += 1;
        }

        Ok(RequestOutcome::Drained { processed })
    }
}

struct RunningGuard<'a> {
    state: &'a Mutex<QueueState>,
    armed: bool,
}

impl<'a> RunningGuard<'a> {
    fn new(state: &'a Mutex<QueueState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.lock().running = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use futures::future::BoxFuture;
    use tokio::sync::Notify;

    use super::*;

    /// Records every resume point it reads, blocking on `gate` first.
    #[derive(Default)]
    struct Recorder {
        seen: parking_lot::Mutex<Vec<ResumePoint>>,
        started: Notify,
        gate: Notify,
        caught_up: AtomicBool,
        fail_on: Option<ResumePoint>,
    }

    impl Recorder {
        async fn read(&self, resume: ResumePoint) -> Result<(), String> {
            self.seen.lock().push(resume);
            self.started.notify_one();
            self.gate.notified().await;
            if self.fail_on == Some(resume) {
                return Err(format!("read {resume} failed"));
            }
            Ok(())
        }

        fn seen(&self) -> Vec<ResumePoint> {
            self.seen.lock().clone()
        }
    }

    type ReadFn = Box<dyn Fn(ResumePoint) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;
    type CaughtUpFn = Box<dyn Fn() -> bool + Send + Sync>;

    fn queue_for(rec: Arc<Recorder>) -> Arc<ReadQueue<ReadFn, CaughtUpFn>> {
        let read_rec = rec.clone();
        let read: ReadFn = Box::new(move |resume| -> BoxFuture<'static, Result<(), String>> {
            let rec = read_rec.clone();
            Box::pin(async move { rec.read(resume).await })
        });
        let caught_up: CaughtUpFn = Box::new(move || rec.caught_up.load(Ordering::SeqCst));
        Arc::new(ReadQueue::new(read, caught_up))
    }

    fn spawn_request(
        queue: &Arc<ReadQueue<ReadFn, CaughtUpFn>>,
        resume: ResumePoint,
    ) -> tokio::task::JoinHandle<Result<RequestOutcome, String>> {
        let queue = queue.clone();
        tokio::spawn(async move { queue.request(resume).await })
    }

    #[tokio::test]
    async fn test_idle_request_drains_itself() {
        let queue = ReadQueue::new(|_| async { Ok::<_, String>(()) }, || false);
        assert_eq!(
            queue.request(ResumePoint::Current).await,
            Ok(RequestOutcome::Drained { processed: 1 })
        );
        assert!(!queue.is_running());
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_requests_served_in_fifo_order() {
        // Scenario: p1 and p2 arrive while a read for p0 is running
        let rec = Arc::new(Recorder::default());
        let queue = queue_for(rec.clone());

        let drainer = spawn_request(&queue, ResumePoint::Height(10));
        rec.started.notified().await;

        assert_eq!(
            queue.request(ResumePoint::Height(20)).await,
            Ok(RequestOutcome::Queued)
        );
        assert_eq!(
            queue.request(ResumePoint::Height(30)).await,
            Ok(RequestOutcome::Queued)
        );
        assert_eq!(queue.pending(), 2);

        for _ in 0..2 {
            rec.gate.notify_one();
            rec.started.notified().await;
        }
        rec.gate.notify_one();

        assert_eq!(
            drainer.await.unwrap(),
            Ok(RequestOutcome::Drained { processed: 3 })
        );
        assert_eq!(
            rec.seen(),
            vec![
                ResumePoint::Height(10),
                ResumePoint::Height(20),
                ResumePoint::Height(30)
            ]
        );
        assert!(!queue.is_running());
    }

    #[tokio::test]
    async fn test_request_coalesced_when_caught_up() {
        let rec = Arc::new(Recorder::default());
        rec.caught_up.store(true, Ordering::SeqCst);
        let queue = queue_for(rec.clone());

        let drainer = spawn_request(&queue, ResumePoint::Current);
        rec.started.notified().await;

        assert_eq!(
            queue.request(ResumePoint::Height(5)).await,
            Ok(RequestOutcome::Coalesced)
        );
        assert_eq!(queue.pending(), 0);

        rec.gate.notify_one();
        assert_eq!(
            drainer.await.unwrap(),
            Ok(RequestOutcome::Drained { processed: 1 })
        );
        assert_eq!(rec.seen(), vec![ResumePoint::Current]);
    }

    #[tokio::test]
    async fn test_failure_keeps_remaining_requests() {
        let rec = Arc::new(Recorder {
            fail_on: Some(ResumePoint::Height(1)),
            ..Default::default()
        });
        let queue = queue_for(rec.clone());

        let drainer = spawn_request(&queue, ResumePoint::Height(1));
        rec.started.notified().await;
        assert_eq!(
            queue.request(ResumePoint::Height(2)).await,
            Ok(RequestOutcome::Queued)
        );

        rec.gate.notify_one();
        assert_eq!(drainer.await.unwrap(), Err("read height 1 failed".to_owned()));
        assert!(!queue.is_running());
        assert_eq!(queue.pending(), 1);

        // the next caller drains what was left, then its own request
        let drainer = spawn_request(&queue, ResumePoint::Height(3));
        for _ in 0..2 {
            rec.started.notified().await;
            rec.gate.notify_one();
        }
        assert_eq!(
            drainer.await.unwrap(),
            Ok(RequestOutcome::Drained { processed: 2 })
        );
        assert_eq!(
            rec.seen(),
            vec![
                ResumePoint::Height(1),
                ResumePoint::Height(2),
                ResumePoint::Height(3)
            ]
        );
    }
}
