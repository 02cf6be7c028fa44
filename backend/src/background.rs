use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Orbit, Rocket};
use shared::VoteError;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn, Instrument};

#[derive(Default)]
struct Tracker {
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Launcher for best-effort write-backs.
///
/// Spawned tasks run on the tokio runtime, not inside the request that
/// triggered them, so a dropped request never cancels them. Each task is
/// bounded by its own timeout and is never retried.
#[derive(Clone, Default)]
pub struct WriteBacks {
    tracker: Arc<Tracker>,
}

struct InFlight(Arc<Tracker>);

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

impl WriteBacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&self, kind: &'static str, limit: Duration, task: F)
    where
        F: Future<Output = Result<(), VoteError>> + Send + 'static,
    {
        self.tracker.in_flight.fetch_add(1, Ordering::AcqRel);
        let guard = InFlight(self.tracker.clone());

        tokio::spawn(
            async move {
                let _guard = guard;
                match tokio::time::timeout(limit, task).await {
                    Ok(Ok(())) => debug!(kind, "write-back complete"),
                    Ok(Err(e)) => error!(kind, "write-back failed: {}", e),
                    Err(_) => warn!(kind, "write-back abandoned after {:?}", limit),
                }
            }
            .instrument(tracing::Span::current()),
        );
    }

    pub fn in_flight(&self) -> usize {
        self.tracker.in_flight.load(Ordering::Acquire)
    }

    /// Resolves once no write-back is running.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.tracker.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Gives in-flight write-backs a grace period when Rocket shuts down.
pub struct DrainWriteBacks {
    pub write_backs: WriteBacks,
    pub grace: Duration,
}

#[rocket::async_trait]
impl Fairing for DrainWriteBacks {
    fn info(&self) -> Info {
        Info {
            name: "Drain write-backs",
            kind: Kind::Shutdown,
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        let pending = self.write_backs.in_flight();
        if pending == 0 {
            return;
        }

        info!("Waiting for {} write-backs", pending);
        if tokio::time::timeout(self.grace, self.write_backs.wait_idle()).await.is_err() {
            warn!("Shutting down with {} write-backs still running", self.write_backs.in_flight());
        }
    }
}
