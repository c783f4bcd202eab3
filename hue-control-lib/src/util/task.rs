use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::util::error::HubError;

/// A running light loop together with the signal that stops it.
#[derive(Debug)]
pub struct SweepTask {
    cancel: CancellationToken,
    handle: JoinHandle<Result<(), HubError>>,
}

impl SweepTask {
    /// Spawns `run` with a fresh cancellation token.
    pub fn spawn<F, Fut>(run: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), HubError>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(cancel.clone()));
        SweepTask { cancel, handle }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Signals the loop and waits for it to finish its current tick.
    pub async fn stop(self) -> Result<(), HubError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Waits for the loop to end on its own, which only happens on a fatal error or when the
    /// token is cancelled elsewhere.
    pub async fn join(self) -> Result<(), HubError> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }
}

/// Sleeps for `duration` unless cancelled first. Returns `false` when cancelled.
pub async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = sleep(duration) => true,
    }
}
