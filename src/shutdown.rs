//! Graceful Shutdown Handling
//!
//! Fans SIGTERM/SIGINT out to the HTTP server and background tasks, and
//! bounds how long the process waits for them to drain.

use crate::auth::SessionManager;
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Shutdown coordinator that manages graceful shutdown process
pub struct ShutdownCoordinator {
    /// Broadcast sender for shutdown signal
    shutdown_tx: broadcast::Sender<()>,
    /// Upper bound on draining after the signal
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            shutdown_tx,
            timeout,
        }
    }

    /// Get a shutdown receiver for components to listen for shutdown signals
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Future that resolves once shutdown has been triggered
    ///
    /// Suitable for `axum::serve(..).with_graceful_shutdown(..)`.
    pub fn signal(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut rx = self.subscribe();
        async move {
            let _ = rx.recv().await;
        }
    }

    /// Broadcast the shutdown signal to all subscribers
    pub fn trigger(&self) {
        if let Err(e) = self.shutdown_tx.send(()) {
            // No subscribers left; nothing to stop.
            debug!("Shutdown signal had no receivers: {}", e);
        }
    }

    /// Start listening for shutdown signals (SIGTERM, SIGINT)
    pub async fn listen_for_signals(&self) -> Result<()> {
        info!("Starting shutdown signal listener");

        #[cfg(unix)]
        {
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())?;

            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await?;
            info!("Received Ctrl+C, initiating graceful shutdown");
        }

        self.trigger();
        Ok(())
    }

    /// Drop every live session once the server has stopped
    pub fn close_sessions(&self, sessions: &SessionManager) {
        let closed = sessions.clear();
        if closed > 0 {
            info!("Closed {} sessions on shutdown", closed);
        }
    }
}

/// Shutdown-aware task handle that can be gracefully cancelled
pub struct ShutdownAwareTask {
    name: String,
    handle: tokio::task::JoinHandle<()>,
}

impl ShutdownAwareTask {
    /// Spawn a task that receives its own shutdown receiver
    pub fn spawn<F, Fut>(shutdown_coordinator: &ShutdownCoordinator, task_name: &str, task_fn: F) -> Self
    where
        F: FnOnce(broadcast::Receiver<()>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let shutdown_rx = shutdown_coordinator.subscribe();
        let name = task_name.to_string();
        let task_label = name.clone();

        let handle = tokio::spawn(async move {
            debug!("Starting shutdown-aware task: {}", task_label);
            task_fn(shutdown_rx).await;
            debug!("Shutdown-aware task completed: {}", task_label);
        });

        Self { name, handle }
    }

    /// Wait for the task to finish, aborting it after `timeout`
    pub async fn join(self, timeout: Duration) -> Result<()> {
        let Self { name, mut handle } = self;

        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) if e.is_cancelled() => {
                debug!("Task {} was cancelled", name);
                Ok(())
            }
            Ok(Err(e)) => {
                error!("Task {} failed: {}", name, e);
                Err(anyhow::anyhow!("Task {} failed: {}", name, e))
            }
            Err(_) => {
                warn!("Task {} did not stop within {:?}, aborting", name, timeout);
                handle.abort();
                Ok(())
            }
        }
    }
}

/// Periodically drop sessions past their idle timeout
pub fn spawn_session_purger(
    shutdown_coordinator: &ShutdownCoordinator,
    sessions: Arc<SessionManager>,
    interval: Duration,
) -> ShutdownAwareTask {
    ShutdownAwareTask::spawn(shutdown_coordinator, "session_purger", move |mut shutdown_rx| async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = sessions.purge_expired();
                    if purged > 0 {
                        info!("Purged {} idle sessions", purged);
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserId;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_shutdown_signal_broadcast() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let mut receiver = coordinator.subscribe();

        coordinator.trigger();

        assert!(receiver.recv().await.is_ok());
    }

    #[tokio::test]
    async fn test_signal_future_resolves() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let signal = coordinator.signal();

        coordinator.trigger();

        assert!(tokio::time::timeout(Duration::from_secs(1), signal).await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_aware_task() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));

        let task = ShutdownAwareTask::spawn(&coordinator, "test_task", |mut shutdown_rx| async move {
            tokio::select! {
                _ = sleep(Duration::from_secs(10)) => {}
                _ = shutdown_rx.recv() => {}
            }
        });

        sleep(Duration::from_millis(50)).await;
        coordinator.trigger();

        assert!(task.join(Duration::from_secs(1)).await.is_ok());
    }

    #[tokio::test]
    async fn test_session_purger_stops_on_shutdown() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let sessions = Arc::new(SessionManager::new(Some(Duration::from_millis(10))));
        sessions.create(UserId(1), "alice");

        let task = spawn_session_purger(&coordinator, Arc::clone(&sessions), Duration::from_millis(20));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(sessions.active_count(), 0);

        coordinator.trigger();
        assert!(task.join(Duration::from_secs(1)).await.is_ok());
    }

    #[test]
    fn test_close_sessions() {
        let coordinator = ShutdownCoordinator::new(Duration::from_secs(5));
        let sessions = SessionManager::new(None);
        sessions.create(UserId(1), "alice");
        sessions.create(UserId(2), "alice");

        coordinator.close_sessions(&sessions);
        assert_eq!(sessions.active_count(), 0);
    }
}
