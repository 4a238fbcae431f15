//! Admission control for browser sessions.
//!
//! Every session is a full browser process, so the number alive at once is
//! bounded by a semaphore, and launches are refused outright while host
//! memory is above the configured ceiling.

use std::{sync::Arc, time::Instant};

use {
    sysinfo::System,
    tokio::sync::{OwnedSemaphorePermit, Semaphore},
    tracing::{debug, warn},
};

use crate::{
    error::BrowserError, guard::SessionGuard, session::SessionLauncher, types::GateOptions,
};

/// Get current system memory usage as a percentage (0-100).
fn memory_usage_percent() -> u8 {
    let mut sys = System::new();
    sys.refresh_memory();

    let total = sys.total_memory();
    if total == 0 {
        return 0;
    }

    let used = sys.used_memory();
    let percent = (used as f64 / total as f64 * 100.0) as u8;
    percent.min(100)
}

/// A claimed session slot. The slot frees when this is dropped.
#[derive(Debug)]
pub struct SessionPermit {
    _permit: OwnedSemaphorePermit,
    /// Set once a browser is running under this slot; the active-sessions
    /// gauge goes back down when the permit is dropped, on every path.
    #[cfg(feature = "metrics")]
    active: bool,
}

impl SessionPermit {
    fn mark_active(&mut self) {
        #[cfg(feature = "metrics")]
        {
            self.active = true;
            nse_relay_metrics::gauge!(nse_relay_metrics::browser::SESSIONS_ACTIVE).increment(1.0);
        }
    }
}

#[cfg(feature = "metrics")]
impl Drop for SessionPermit {
    fn drop(&mut self) {
        if self.active {
            nse_relay_metrics::gauge!(nse_relay_metrics::browser::SESSIONS_ACTIVE).decrement(1.0);
        }
    }
}

/// Bounds how many browser sessions may be alive at once.
pub struct SessionGate {
    options: GateOptions,
    semaphore: Arc<Semaphore>,
    memory_usage: fn() -> u8,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new(GateOptions::default())
    }
}

impl SessionGate {
    #[must_use]
    pub fn new(options: GateOptions) -> Self {
        let max_sessions = options.max_sessions.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_sessions)),
            options: GateOptions {
                max_sessions,
                ..options
            },
            memory_usage: memory_usage_percent,
        }
    }

    #[cfg(test)]
    fn with_memory_usage(mut self, probe: fn() -> u8) -> Self {
        self.memory_usage = probe;
        self
    }

    /// Total number of slots.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.options.max_sessions
    }

    /// Slots currently free.
    #[must_use]
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free slot, up to the admission timeout.
    pub async fn admit(&self) -> Result<SessionPermit, BrowserError> {
        let started = Instant::now();
        let acquired = tokio::time::timeout(
            self.options.admission_timeout,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await;

        #[cfg(feature = "metrics")]
        nse_relay_metrics::histogram!(nse_relay_metrics::browser::ADMISSION_WAIT_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let permit = match acquired {
            Ok(Ok(permit)) => permit,
            Ok(Err(_closed)) => {
                return Err(self.reject("session gate is shut down".to_string()));
            },
            Err(_elapsed) => {
                return Err(self.reject(format!(
                    "all {} session slots busy for {}ms",
                    self.options.max_sessions,
                    self.options.admission_timeout.as_millis()
                )));
            },
        };

        if self.options.memory_limit_percent < 100 {
            let usage = (self.memory_usage)();
            if usage >= self.options.memory_limit_percent {
                warn!(
                    memory_usage = usage,
                    threshold = self.options.memory_limit_percent,
                    "refusing browser launch due to high memory usage"
                );
                return Err(self.reject(format!(
                    "host memory usage {usage}% at or above {}%",
                    self.options.memory_limit_percent
                )));
            }
        }

        debug!(
            waited_ms = started.elapsed().as_millis() as u64,
            available = self.available(),
            "session slot acquired"
        );
        Ok(SessionPermit {
            _permit: permit,
            #[cfg(feature = "metrics")]
            active: false,
        })
    }

    /// Admit, then launch a session owned by the returned guard.
    ///
    /// A launch failure returns the slot immediately.
    pub async fn open(&self, launcher: &dyn SessionLauncher) -> Result<SessionGuard, BrowserError> {
        let mut permit = self.admit().await?;

        match launcher.launch().await {
            Ok(session) => {
                #[cfg(feature = "metrics")]
                nse_relay_metrics::counter!(nse_relay_metrics::browser::SESSIONS_LAUNCHED_TOTAL)
                    .increment(1);
                permit.mark_active();
                Ok(SessionGuard::new(session, Some(permit))
                    .with_release_timeout(self.options.release_timeout))
            },
            Err(e) => {
                #[cfg(feature = "metrics")]
                nse_relay_metrics::counter!(nse_relay_metrics::browser::LAUNCH_FAILURES_TOTAL)
                    .increment(1);
                Err(e)
            },
        }
    }

    fn reject(&self, reason: String) -> BrowserError {
        #[cfg(feature = "metrics")]
        nse_relay_metrics::counter!(nse_relay_metrics::browser::ADMISSION_REJECTED_TOTAL)
            .increment(1);
        BrowserError::PoolExhausted(reason)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use std::time::Duration;

    use {
        super::*,
        crate::session::AutomationSession,
        async_trait::async_trait,
    };

    fn options(max_sessions: usize, admission_ms: u64) -> GateOptions {
        GateOptions {
            max_sessions,
            admission_timeout: Duration::from_millis(admission_ms),
            memory_limit_percent: 100,
            release_timeout: Duration::from_secs(5),
        }
    }

    fn gate(max_sessions: usize, admission_ms: u64) -> SessionGate {
        SessionGate::new(options(max_sessions, admission_ms))
    }

    struct FailingLauncher;

    #[async_trait]
    impl SessionLauncher for FailingLauncher {
        async fn launch(&self) -> Result<Box<dyn AutomationSession>, BrowserError> {
            Err(BrowserError::LaunchFailed("no chromium in test".into()))
        }
    }

    /// Sessions whose close never completes, like a browser stuck on exit.
    struct StuckLauncher;

    struct StuckSession;

    #[async_trait]
    impl SessionLauncher for StuckLauncher {
        async fn launch(&self) -> Result<Box<dyn AutomationSession>, BrowserError> {
            Ok(Box::new(StuckSession))
        }
    }

    #[async_trait]
    impl AutomationSession for StuckSession {
        fn id(&self) -> &str {
            "stuck"
        }

        async fn set_extra_headers(&mut self, _: &[(String, String)]) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn navigate(&mut self, _: &str) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn body_text(&mut self) -> Result<String, BrowserError> {
            Ok(String::new())
        }

        async fn close(&mut self) -> Result<(), BrowserError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn stuck_gate(release_ms: u64) -> SessionGate {
        SessionGate::new(GateOptions {
            release_timeout: Duration::from_millis(release_ms),
            ..options(1, 20)
        })
    }

    async fn wait_for_free_slot(gate: &SessionGate) -> bool {
        for _ in 0..100 {
            if gate.available() == gate.capacity() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[test]
    fn memory_usage_is_a_percentage() {
        assert!(memory_usage_percent() <= 100);
    }

    #[tokio::test]
    async fn admit_up_to_capacity_then_reject() {
        let gate = gate(2, 20);
        let a = gate.admit().await.unwrap();
        let _b = gate.admit().await.unwrap();
        assert_eq!(gate.available(), 0);

        let err = gate.admit().await.unwrap_err();
        assert!(matches!(err, BrowserError::PoolExhausted(_)));
        assert!(err.to_string().contains("2 session slots busy"));

        drop(a);
        assert_eq!(gate.available(), 1);
        assert!(gate.admit().await.is_ok());
    }

    #[tokio::test]
    async fn waiter_is_admitted_when_slot_frees() {
        let gate = Arc::new(gate(1, 1_000));
        let held = gate.admit().await.unwrap();

        let waiter = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.admit().await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        assert!(waiter.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn failed_launch_returns_slot() {
        let gate = gate(1, 20);
        let err = gate.open(&FailingLauncher).await.err().unwrap();
        assert!(err.is_launch_failure());
        assert_eq!(gate.available(), 1);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        assert_eq!(gate(0, 10).capacity(), 1);
    }

    #[tokio::test]
    async fn memory_ceiling_rejects_and_returns_slot() {
        let gate = SessionGate::new(GateOptions {
            memory_limit_percent: 90,
            ..options(1, 20)
        })
        .with_memory_usage(|| 95);

        let err = gate.admit().await.unwrap_err();
        assert!(matches!(err, BrowserError::PoolExhausted(_)));
        assert!(err.to_string().contains("host memory usage 95% at or above 90%"), "{err}");
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn memory_below_ceiling_is_admitted() {
        let gate = SessionGate::new(GateOptions {
            memory_limit_percent: 90,
            ..options(1, 20)
        })
        .with_memory_usage(|| 89);

        assert!(gate.admit().await.is_ok());
    }

    #[tokio::test]
    async fn stuck_close_gives_slot_back_after_release_ceiling() {
        let gate = stuck_gate(50);
        let guard = gate.open(&StuckLauncher).await.unwrap();
        assert_eq!(gate.available(), 0);

        tokio::time::timeout(Duration::from_secs(2), guard.release())
            .await
            .expect("release must finish once the ceiling passes");
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn stuck_close_on_drop_gives_slot_back() {
        let gate = stuck_gate(50);
        drop(gate.open(&StuckLauncher).await.unwrap());
        assert!(wait_for_free_slot(&gate).await);
    }

    #[tokio::test]
    async fn abandoned_release_gives_slot_back() {
        let gate = stuck_gate(60_000);
        let guard = gate.open(&StuckLauncher).await.unwrap();

        // The caller gives up on the release future itself.
        assert!(
            tokio::time::timeout(Duration::from_millis(20), guard.release())
                .await
                .is_err()
        );
        assert_eq!(gate.available(), 1);
    }
}
