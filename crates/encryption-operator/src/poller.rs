//! Fixed-interval poll loop
//!
//! The provider assumes one caller and no concurrent invocations, so the loop
//! owns it exclusively and polls serially.

use std::time::Duration;

use tokio::task::JoinError;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use encryption_common::Error;
use encryption_provider::{EncryptionProvider, GroupResource};

/// Context of errors raised when the secret watch task stops
pub const SECRET_CACHE_TASK: &str = "secret-cache";

/// Run one synchronization pass
///
/// Returns `None` when the readiness gate holds the encryption controllers
/// back, otherwise the group-resources to manage this pass.
pub fn poll_once<P: EncryptionProvider>(provider: &mut P) -> Option<Vec<GroupResource>> {
    match provider.should_run_encryption_controllers() {
        Ok(true) => {}
        Ok(false) => {
            debug!("Encryption controllers not ready, skipping pass");
            return None;
        }
        Err(e) => {
            warn!(error = %e, "Readiness check failed, skipping pass");
            return None;
        }
    }

    let resources = provider.encrypted_group_resources();
    let names: Vec<String> = resources.iter().map(GroupResource::canonical).collect();
    debug!(resources = ?names, "Resolved encrypted group-resources");
    Some(resources)
}

/// Poll every `interval` until `shutdown` is cancelled
///
/// The first pass runs immediately. Returns the number of completed passes.
pub async fn run_poller<P: EncryptionProvider>(
    provider: &mut P,
    interval: Duration,
    shutdown: CancellationToken,
) -> u64 {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(interval_secs = interval.as_secs(), "Encryption provider poller started");

    let mut passes = 0;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                poll_once(provider);
                passes += 1;
            }
        }
    }

    info!(passes, "Encryption provider poller stopped");
    passes
}

/// Describe why the secret watch task stopped
///
/// The watch loop only returns if its stream ends, and it can panic. Either
/// way the cache stops following the coordination secret, so the caller must
/// stop polling.
pub fn cache_task_error(result: Result<(), JoinError>) -> Error {
    let message = match result {
        Ok(()) => "watch stream ended".to_string(),
        Err(e) if e.is_panic() => "watch task panicked".to_string(),
        Err(e) => format!("watch task aborted: {}", e),
    };
    Error::internal_with_context(SECRET_CACHE_TASK, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeProvider {
        ready: encryption_common::Result<bool>,
        calls: u64,
    }

    impl FakeProvider {
        fn ready() -> Self {
            Self {
                ready: Ok(true),
                calls: 0,
            }
        }
    }

    impl EncryptionProvider for FakeProvider {
        fn encrypted_group_resources(&mut self) -> Vec<GroupResource> {
            self.calls += 1;
            vec![GroupResource::new("", "secrets")]
        }

        fn should_run_encryption_controllers(&self) -> encryption_common::Result<bool> {
            match &self.ready {
                Ok(ready) => Ok(*ready),
                Err(_) => Err(Error::internal_with_context("gate", "failed")),
            }
        }
    }

    #[test]
    fn poll_once_returns_resolved_list_when_ready() {
        let mut provider = FakeProvider::ready();
        assert_eq!(
            poll_once(&mut provider),
            Some(vec![GroupResource::new("", "secrets")])
        );
        assert_eq!(provider.calls, 1);
    }

    #[test]
    fn poll_once_skips_when_gate_is_closed() {
        let mut provider = FakeProvider {
            ready: Ok(false),
            calls: 0,
        };
        assert_eq!(poll_once(&mut provider), None);
        assert_eq!(provider.calls, 0);
    }

    #[test]
    fn poll_once_skips_when_gate_errors() {
        let mut provider = FakeProvider {
            ready: Err(Error::internal_with_context("gate", "boom")),
            calls: 0,
        };
        assert_eq!(poll_once(&mut provider), None);
        assert_eq!(provider.calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn poller_runs_every_interval_until_cancelled() {
        let shutdown = CancellationToken::new();
        let canceller = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(2500)).await;
                shutdown.cancel();
            })
        };

        let mut provider = FakeProvider::ready();
        let passes = run_poller(&mut provider, Duration::from_secs(1), shutdown).await;
        canceller.await.unwrap();

        // Ticks at 0s, 1s, 2s
        assert_eq!(passes, 3);
        assert_eq!(provider.calls, 3);
    }

    #[tokio::test]
    async fn poller_stops_immediately_when_already_cancelled() {
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let mut provider = FakeProvider::ready();
        let passes = run_poller(&mut provider, Duration::from_secs(60), shutdown).await;

        // select! may pick either ready branch on the first iteration
        assert!(passes <= 1);
    }

    #[test]
    fn finished_watch_task_is_an_internal_error() {
        let err = cache_task_error(Ok(()));
        assert_eq!(err.context(), Some(SECRET_CACHE_TASK));
        assert!(err.to_string().contains("watch stream ended"));
    }

    #[tokio::test]
    async fn panicked_watch_task_is_reported() {
        let handle = tokio::spawn(async {
            panic!("watcher blew up");
        });
        let err = cache_task_error(handle.await);
        assert_eq!(err.context(), Some(SECRET_CACHE_TASK));
        assert_eq!(
            err.to_string(),
            "internal error [secret-cache]: watch task panicked"
        );
    }

    #[tokio::test]
    async fn aborted_watch_task_is_reported() {
        let handle = tokio::spawn(std::future::pending::<()>());
        handle.abort();
        let err = cache_task_error(handle.await);
        assert!(err.to_string().contains("watch task aborted"));
    }
}
